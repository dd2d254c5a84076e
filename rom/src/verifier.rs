/*++

Licensed under the Apache-2.0 license.

File Name:

    verifier.rs

Abstract:

    Trust anchor, digest and RSA signature verification shared by every
    container type.

--*/

use constant_time_eq::constant_time_eq;
use fw_config::HashAlg;
use fw_error::{VerifyError, VerifyResult};
use ias_image::{
    PublicKeyRecord, SigType, SignatureRecordHeader, PUBKEY_MAGIC, RSA2048_MODULUS_SIZE,
    RSA_EXPONENT_SIZE, SIGNATURE_HEADER_SIZE, SIGNATURE_MAGIC,
};
use log::{debug, warn};
use sha2::{Digest, Sha256, Sha384};
use zerocopy::FromBytes;

pub const SHA256_DIGEST_SIZE: usize = 32;
pub const SHA384_DIGEST_SIZE: usize = 48;

/// Digest of a signed range or of a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageDigest {
    Sha256([u8; SHA256_DIGEST_SIZE]),
    Sha384([u8; SHA384_DIGEST_SIZE]),
}

impl Default for ImageDigest {
    fn default() -> Self {
        ImageDigest::Sha256([0u8; SHA256_DIGEST_SIZE])
    }
}

impl ImageDigest {
    /// Hashes `segments` in order as one message.
    pub fn compute(alg: HashAlg, segments: &[&[u8]]) -> Self {
        match alg {
            HashAlg::Sha256 => {
                let mut hasher = Sha256::new();
                for segment in segments {
                    hasher.update(segment);
                }
                let mut out = [0u8; SHA256_DIGEST_SIZE];
                out.copy_from_slice(&hasher.finalize());
                ImageDigest::Sha256(out)
            }
            HashAlg::Sha384 => {
                let mut hasher = Sha384::new();
                for segment in segments {
                    hasher.update(segment);
                }
                let mut out = [0u8; SHA384_DIGEST_SIZE];
                out.copy_from_slice(&hasher.finalize());
                ImageDigest::Sha384(out)
            }
        }
    }

    pub fn alg(&self) -> HashAlg {
        match self {
            ImageDigest::Sha256(_) => HashAlg::Sha256,
            ImageDigest::Sha384(_) => HashAlg::Sha384,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ImageDigest::Sha256(digest) => digest,
            ImageDigest::Sha384(digest) => digest,
        }
    }

    /// Constant-time comparison; digests of different algorithms never match.
    pub fn matches(&self, other: &ImageDigest) -> bool {
        self.alg() == other.alg() && constant_time_eq(self.as_bytes(), other.as_bytes())
    }
}

/// RSA public key with the exponent in verification-library order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub magic: u32,
    pub modulus: [u8; RSA2048_MODULUS_SIZE],
    pub exponent: [u8; RSA_EXPONENT_SIZE],
}

impl RsaPublicKey {
    /// Converts an on-disk key record, undoing the stored exponent byte order.
    pub fn from_record(record: &PublicKeyRecord) -> Self {
        RsaPublicKey {
            magic: record.magic.get(),
            modulus: record.modulus,
            exponent: record.library_exponent(),
        }
    }

    /// Hash of `modulus || exponent`, the value pinned by trust anchors.
    pub fn key_hash(&self, alg: HashAlg) -> ImageDigest {
        ImageDigest::compute(alg, &[&self.modulus, &self.exponent])
    }
}

/// Signature record borrowed from a container.
#[derive(Debug, Clone, Copy)]
pub struct SignatureRecord<'a> {
    pub header: SignatureRecordHeader,
    pub signature: &'a [u8],
}

impl<'a> SignatureRecord<'a> {
    /// Reads a signature record from the start of `bytes`, checking that the
    /// declared signature size fits.
    pub fn parse(bytes: &'a [u8]) -> VerifyResult<Self> {
        let (header, rest) =
            SignatureRecordHeader::read_from_prefix(bytes).map_err(|_| VerifyError::InvalidFormat)?;
        let sig_size = header.sig_size.get() as usize;
        let signature = rest.get(..sig_size).ok_or(VerifyError::InvalidFormat)?;
        Ok(SignatureRecord { header, signature })
    }

    /// Total bytes occupied by the record.
    pub fn len(&self) -> usize {
        SIGNATURE_HEADER_SIZE + self.signature.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signature.is_empty()
    }
}

/// Component class a key is trusted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyUsage {
    Master = 0,
    ConfigData = 1,
    FirmwareUpdate = 2,
    Container = 3,
    Payload = 4,
    OsBoot = 5,
}

/// Image Verification Environment
pub trait VerificationEnv {
    /// Perform RSA PKCS#1 v1.5 verification of `digest`
    fn rsa_verify_pkcs1_5(
        &self,
        pub_key: &RsaPublicKey,
        signature: &[u8],
        digest: &ImageDigest,
    ) -> VerifyResult<bool>;

    /// Get the pinned public key hash for a usage class
    fn trusted_key_hash(&self, usage: KeyUsage) -> Option<ImageDigest>;
}

impl<T: VerificationEnv + ?Sized> VerificationEnv for &T {
    fn rsa_verify_pkcs1_5(
        &self,
        pub_key: &RsaPublicKey,
        signature: &[u8],
        digest: &ImageDigest,
    ) -> VerifyResult<bool> {
        (**self).rsa_verify_pkcs1_5(pub_key, signature, digest)
    }

    fn trusted_key_hash(&self, usage: KeyUsage) -> Option<ImageDigest> {
        (**self).trusted_key_hash(usage)
    }
}

/// Key pinning and signature options for a single verification.
#[derive(Debug, Clone, Copy)]
pub struct KeyPolicy<'a> {
    /// Algorithm used to hash the public key.
    pub key_hash_alg: HashAlg,
    /// Explicit anchor overriding the usage-indexed trust table.
    pub pinned_key_hash: Option<&'a ImageDigest>,
}

/// Signature Verifier
pub struct SignatureVerifier<Env: VerificationEnv> {
    /// Verification Environment
    env: Env,
}

impl<Env: VerificationEnv> SignatureVerifier<Env> {
    /// Create a new instance `SignatureVerifier`
    ///
    /// # Arguments
    ///
    /// * `env` - Environment
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Verify signed data
    ///
    /// # Arguments
    ///
    /// * `segments`   - Signed bytes, hashed in order
    /// * `usage`      - Component class selecting the trust anchor
    /// * `signature`  - Signature record
    /// * `pub_key`    - Public key, exponent in library order
    /// * `policy`     - Key hash algorithm and optional explicit anchor
    /// * `digest_out` - Receives the digest before the signature is checked
    ///
    /// # Returns
    ///
    /// * `ImageDigest` - Digest of the signed data
    pub fn verify(
        &self,
        segments: &[&[u8]],
        usage: KeyUsage,
        signature: &SignatureRecord,
        pub_key: &RsaPublicKey,
        policy: KeyPolicy,
        digest_out: Option<&mut ImageDigest>,
    ) -> VerifyResult<ImageDigest> {
        if signature.header.magic.get() != SIGNATURE_MAGIC || pub_key.magic != PUBKEY_MAGIC {
            return Err(VerifyError::InvalidParameter);
        }

        self.verify_key_hash(usage, pub_key, &policy)?;

        let alg = HashAlg::try_from(signature.header.hash_alg)
            .map_err(|_| VerifyError::InvalidParameter)?;
        let digest = ImageDigest::compute(alg, segments);

        if let Some(out) = digest_out {
            *out = digest;
        }

        match SigType::try_from(signature.header.sig_type) {
            Ok(SigType::Pkcs1v15) => {}
            Ok(SigType::Pss) | Err(()) => {
                warn!(
                    "[fw-rom] Unsupported signature scheme {}",
                    signature.header.sig_type
                );
                return Err(VerifyError::Unsupported);
            }
        }

        match self
            .env
            .rsa_verify_pkcs1_5(pub_key, signature.signature, &digest)
        {
            Ok(true) => {
                debug!("[fw-rom] Signature verified for {:?}", usage);
                Ok(digest)
            }
            Ok(false) | Err(_) => {
                warn!("[fw-rom] Signature verification failed for {:?}", usage);
                Err(VerifyError::SecurityViolation)
            }
        }
    }

    /// Verify the public key against its trust anchor
    fn verify_key_hash(
        &self,
        usage: KeyUsage,
        pub_key: &RsaPublicKey,
        policy: &KeyPolicy,
    ) -> VerifyResult<()> {
        let expected = match policy.pinned_key_hash {
            Some(pinned) => *pinned,
            None => self.env.trusted_key_hash(usage).ok_or_else(|| {
                warn!("[fw-rom] No trust anchor for {:?}", usage);
                VerifyError::NotFound
            })?,
        };

        let actual = pub_key.key_hash(policy.key_hash_alg);
        if !actual.matches(&expected) {
            warn!("[fw-rom] Public key hash mismatch for {:?}", usage);
            return Err(VerifyError::SecurityViolation);
        }

        Ok(())
    }
}
