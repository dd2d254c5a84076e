/*++

Licensed under the Apache-2.0 license.

File Name:

    image_verifier.rs

Abstract:

    Structural validation of signed IAS containers and sub-image extraction.

--*/

use crate::verifier::{
    ImageDigest, KeyPolicy, KeyUsage, RsaPublicKey, SignatureRecord, SignatureVerifier,
    VerificationEnv,
};
use fw_config::HashAlg;
use fw_error::{VerifyError, VerifyResult};
use ias_image::{
    align_up, IasHeader, ImageTypeFlags, PublicKeyRecord, IAS_HEADER_SIZE, IAS_MAGIC,
    PUBKEY_RECORD_SIZE, SUB_IMAGE_ALIGNMENT,
};
use log::{debug, warn};
use zerocopy::FromBytes;

/// Location of one sub-image, as an absolute offset into the container buffer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SubImage {
    pub offset: usize,
    pub size: usize,
}

/// A container that passed every validation gate.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedImage<'a> {
    header: IasHeader,
    buffer: &'a [u8],
    ext_table: &'a [u8],
    digest: ImageDigest,
}

impl<'a> ValidatedImage<'a> {
    pub fn header(&self) -> &IasHeader {
        &self.header
    }

    /// Digest of the signed range, for measured-boot consumers.
    pub fn digest(&self) -> &ImageDigest {
        &self.digest
    }

    pub fn payload_offset(&self) -> usize {
        self.header.data_offset.get() as usize
    }

    pub fn payload(&self) -> &'a [u8] {
        let start = self.payload_offset();
        &self.buffer[start..start + self.header.data_length.get() as usize]
    }

    /// Number of entries in the extension table.
    pub fn sub_image_count(&self) -> usize {
        core::cmp::max(self.ext_table.len() / 4, 1)
    }

    /// Fills `out` with the sub-image layout and returns the entry count.
    ///
    /// Without an extension table the whole payload is a single entry.
    pub fn extract_sub_images(&self, out: &mut [SubImage]) -> VerifyResult<usize> {
        let count = self.sub_image_count();
        if out.len() < count {
            return Err(VerifyError::InvalidParameter);
        }

        if self.ext_table.is_empty() {
            out[0] = SubImage {
                offset: self.payload_offset(),
                size: self.header.data_length.get() as usize,
            };
            return Ok(1);
        }

        let mut cursor = self.payload_offset();
        for (entry, size) in out.iter_mut().zip(ext_table_entries(self.ext_table)) {
            *entry = SubImage {
                offset: cursor,
                size: size as usize,
            };
            cursor += align_up(size as u64, SUB_IMAGE_ALIGNMENT as u64) as usize;
        }
        Ok(count)
    }

    /// Bytes of `sub_image`, or `None` if it does not lie inside this container.
    pub fn sub_image_bytes(&self, sub_image: &SubImage) -> Option<&'a [u8]> {
        let end = sub_image.offset.checked_add(sub_image.size)?;
        self.buffer.get(sub_image.offset..end)
    }
}

fn ext_table_entries(table: &[u8]) -> impl Iterator<Item = u32> + '_ {
    table
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
}

/// Byte ranges of the records between the header and the payload.
struct ContainerLayout<'a> {
    ext_table: &'a [u8],
    pub_key: RsaPublicKey,
    signature: SignatureRecord<'a>,
    signature_start: usize,
}

impl<'a> ContainerLayout<'a> {
    fn parse(buffer: &'a [u8], header: &IasHeader) -> VerifyResult<Self> {
        let header_length = header.header_length.get() as usize;
        let data_offset = header.data_offset.get() as usize;
        let data_length = header.data_length.get() as u64;

        if header_length < IAS_HEADER_SIZE || header_length % 4 != 0 {
            warn!("[fw-rom] Invalid header length {:#x}", header_length);
            return Err(VerifyError::InvalidFormat);
        }

        let key_end = header_length
            .checked_add(PUBKEY_RECORD_SIZE)
            .filter(|end| *end <= data_offset)
            .ok_or(VerifyError::InvalidFormat)?;

        let ext_table = &buffer[IAS_HEADER_SIZE..header_length];
        let mut cursor = 0u64;
        for size in ext_table_entries(ext_table) {
            if cursor + size as u64 > data_length {
                warn!("[fw-rom] Sub-image table exceeds payload");
                return Err(VerifyError::InvalidFormat);
            }
            cursor += align_up(size as u64, SUB_IMAGE_ALIGNMENT as u64);
        }

        let key_record = PublicKeyRecord::read_from_bytes(&buffer[header_length..key_end])
            .map_err(|_| VerifyError::InvalidFormat)?;

        let signature = SignatureRecord::parse(&buffer[key_end..data_offset])?;

        Ok(ContainerLayout {
            ext_table,
            pub_key: RsaPublicKey::from_record(&key_record),
            signature,
            signature_start: key_end,
        })
    }
}

/// Container Validator
pub struct ContainerValidator<Env: VerificationEnv> {
    verifier: SignatureVerifier<Env>,
    key_hash_alg: HashAlg,
}

impl<Env: VerificationEnv> ContainerValidator<Env> {
    pub fn new(env: Env, key_hash_alg: HashAlg) -> Self {
        Self {
            verifier: SignatureVerifier::new(env),
            key_hash_alg,
        }
    }

    /// Validate a container against the trust anchor for `usage`.
    pub fn validate<'a>(
        &self,
        buffer: &'a [u8],
        usage: KeyUsage,
    ) -> VerifyResult<ValidatedImage<'a>> {
        self.validate_inner(buffer, usage, None)
    }

    /// Validate a container against an explicitly supplied key hash.
    pub fn validate_with_pin<'a>(
        &self,
        buffer: &'a [u8],
        usage: KeyUsage,
        pinned_key_hash: &ImageDigest,
    ) -> VerifyResult<ValidatedImage<'a>> {
        self.validate_inner(buffer, usage, Some(pinned_key_hash))
    }

    fn validate_inner<'a>(
        &self,
        buffer: &'a [u8],
        usage: KeyUsage,
        pinned_key_hash: Option<&ImageDigest>,
    ) -> VerifyResult<ValidatedImage<'a>> {
        let header = Self::check_header(buffer)?;
        let layout = ContainerLayout::parse(buffer, &header)?;

        // The signature record sits inside the signed range but cannot cover itself.
        let payload_end = header.payload_end().ok_or(VerifyError::InvalidFormat)?;
        let signature_end = layout.signature_start + layout.signature.len();
        let segments: [&[u8]; 2] = [
            &buffer[..layout.signature_start],
            &buffer[signature_end..payload_end],
        ];

        let policy = KeyPolicy {
            key_hash_alg: self.key_hash_alg,
            pinned_key_hash,
        };
        let digest = self.verifier.verify(
            &segments,
            usage,
            &layout.signature,
            &layout.pub_key,
            policy,
            None,
        )?;

        debug!(
            "[fw-rom] Container validated: {:#x} payload bytes at {:#x}",
            header.data_length.get(),
            header.data_offset.get()
        );

        Ok(ValidatedImage {
            header,
            buffer,
            ext_table: layout.ext_table,
            digest,
        })
    }

    /// Gates that only need the fixed header: magic, bounds, CRC and signed flag.
    fn check_header(buffer: &[u8]) -> VerifyResult<IasHeader> {
        let (header, _) =
            IasHeader::read_from_prefix(buffer).map_err(|_| VerifyError::InvalidFormat)?;

        if header.magic.get() != IAS_MAGIC {
            return Err(VerifyError::InvalidFormat);
        }

        if header.data_offset.get() as usize > buffer.len() {
            warn!("[fw-rom] Data offset beyond container");
            return Err(VerifyError::InvalidFormat);
        }

        match header.payload_end() {
            Some(end) if end <= buffer.len() => {}
            _ => {
                warn!("[fw-rom] Payload beyond container");
                return Err(VerifyError::InvalidFormat);
            }
        }

        if !header.verify_crc() {
            warn!("[fw-rom] Header CRC mismatch");
            return Err(VerifyError::Corrupt);
        }

        if !header.flags().contains(ImageTypeFlags::SIGNED) {
            warn!("[fw-rom] Container is not signed");
            return Err(VerifyError::Unsupported);
        }

        Ok(header)
    }
}
