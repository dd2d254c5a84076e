// Licensed under the Apache-2.0 license

//! Stand-in RSA primitive.
//!
//! A "signature" is the digest repeated to the signature length and XORed
//! with the modulus, so it binds both the key and the signed data while
//! staying cheap to compute.

use fw_config::HashAlg;
use fw_error::{VerifyError, VerifyResult};
use fw_rom_common::{ImageDigest, KeyUsage, RsaPublicKey, VerificationEnv};
use ias_image::{PublicKeyRecord, PUBKEY_MAGIC, RSA2048_MODULUS_SIZE, RSA_EXPONENT_SIZE};
use rand::Rng;
use std::cell::Cell;
use zerocopy::byteorder::little_endian::U32;

pub const TEST_SIGNATURE_SIZE: usize = RSA2048_MODULUS_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestSigningKey {
    pub modulus: [u8; RSA2048_MODULUS_SIZE],
    /// Exponent in library (big-endian) order.
    pub exponent: [u8; RSA_EXPONENT_SIZE],
}

impl TestSigningKey {
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let mut modulus = [0u8; RSA2048_MODULUS_SIZE];
        rng.fill(&mut modulus[..]);
        // Keep the top bit set like a real 2048-bit modulus.
        modulus[0] |= 0x80;
        TestSigningKey {
            modulus,
            exponent: 65537u32.to_be_bytes(),
        }
    }

    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            magic: PUBKEY_MAGIC,
            modulus: self.modulus,
            exponent: self.exponent,
        }
    }

    /// On-disk record, with the exponent byte-reversed.
    pub fn record(&self) -> PublicKeyRecord {
        let mut exponent = self.exponent;
        exponent.reverse();
        PublicKeyRecord {
            magic: U32::new(PUBKEY_MAGIC),
            modulus: self.modulus,
            exponent,
        }
    }

    pub fn key_hash(&self, alg: HashAlg) -> ImageDigest {
        self.public_key().key_hash(alg)
    }

    pub fn sign(&self, digest: &ImageDigest, len: usize) -> Vec<u8> {
        fake_signature(&self.modulus, digest, len)
    }
}

fn fake_signature(modulus: &[u8], digest: &ImageDigest, len: usize) -> Vec<u8> {
    let digest = digest.as_bytes();
    (0..len)
        .map(|i| digest[i % digest.len()] ^ modulus[i % modulus.len()])
        .collect()
}

/// Verification environment with a usage-indexed trust table.
#[derive(Debug, Default)]
pub struct FakeCryptoEnv {
    trusted: Vec<(KeyUsage, ImageDigest)>,
    pub primitive_error: bool,
    rsa_calls: Cell<u32>,
}

impl FakeCryptoEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trust(mut self, usage: KeyUsage, key_hash: ImageDigest) -> Self {
        self.trusted.retain(|(u, _)| *u != usage);
        self.trusted.push((usage, key_hash));
        self
    }

    pub fn rsa_calls(&self) -> u32 {
        self.rsa_calls.get()
    }
}

impl VerificationEnv for FakeCryptoEnv {
    fn rsa_verify_pkcs1_5(
        &self,
        pub_key: &RsaPublicKey,
        signature: &[u8],
        digest: &ImageDigest,
    ) -> VerifyResult<bool> {
        self.rsa_calls.set(self.rsa_calls.get() + 1);
        if self.primitive_error {
            return Err(VerifyError::DeviceError);
        }
        if signature.len() != pub_key.modulus.len() {
            return Ok(false);
        }
        Ok(fake_signature(&pub_key.modulus, digest, signature.len()) == signature)
    }

    fn trusted_key_hash(&self, usage: KeyUsage) -> Option<ImageDigest> {
        self.trusted
            .iter()
            .find(|(u, _)| *u == usage)
            .map(|(_, hash)| *hash)
    }
}
