// Licensed under the Apache-2.0 license

use crate::crypto::{TestSigningKey, TEST_SIGNATURE_SIZE};
use fw_config::HashAlg;
use fw_rom_common::ImageDigest;
use ias_image::{
    align_up, IasHeader, ImageTypeFlags, SigType, SignatureRecordHeader, IAS_HEADER_SIZE,
    IAS_MAGIC, PUBKEY_RECORD_SIZE, SIGNATURE_HEADER_SIZE, SIGNATURE_MAGIC, SUB_IMAGE_ALIGNMENT,
};
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::IntoBytes;

const PAYLOAD_ALIGNMENT: u64 = 16;

/// A serialized container and the offsets of its parts.
#[derive(Debug, Clone)]
pub struct BuiltImage {
    pub bytes: Vec<u8>,
    pub header_length: usize,
    pub signature_offset: usize,
    pub signature_len: usize,
    pub payload_offset: usize,
    pub payload_len: usize,
    pub digest: ImageDigest,
}

impl BuiltImage {
    /// Offset of the raw signature bytes inside the signature record.
    pub fn signature_bytes_offset(&self) -> usize {
        self.signature_offset + SIGNATURE_HEADER_SIZE
    }

    pub fn signature_end(&self) -> usize {
        self.signature_offset + self.signature_len
    }
}

/// Builds signed IAS containers the way the image signing tool lays them out.
pub struct IasImageBuilder {
    key: TestSigningKey,
    sub_images: Vec<Vec<u8>>,
    ext_table: bool,
    hash_alg: HashAlg,
    sig_type: u8,
    signed: bool,
    trailing_bytes: usize,
}

impl IasImageBuilder {
    pub fn new(key: TestSigningKey) -> Self {
        IasImageBuilder {
            key,
            sub_images: Vec::new(),
            ext_table: false,
            hash_alg: HashAlg::Sha256,
            sig_type: SigType::Pkcs1v15 as u8,
            signed: true,
            trailing_bytes: 0,
        }
    }

    /// Single payload without an extension table.
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.sub_images = vec![payload.to_vec()];
        self.ext_table = false;
        self
    }

    /// Payload made of `sub_images`, each aligned, described by an extension table.
    pub fn sub_images(mut self, sub_images: &[&[u8]]) -> Self {
        self.sub_images = sub_images.iter().map(|s| s.to_vec()).collect();
        self.ext_table = true;
        self
    }

    pub fn hash_alg(mut self, alg: HashAlg) -> Self {
        self.hash_alg = alg;
        self
    }

    pub fn sig_type(mut self, sig_type: u8) -> Self {
        self.sig_type = sig_type;
        self
    }

    pub fn signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    /// Unused bytes appended after the payload.
    pub fn trailing_bytes(mut self, len: usize) -> Self {
        self.trailing_bytes = len;
        self
    }

    fn payload_bytes(&self) -> Vec<u8> {
        let mut payload = Vec::new();
        let count = self.sub_images.len();
        for (i, sub_image) in self.sub_images.iter().enumerate() {
            payload.extend_from_slice(sub_image);
            if self.ext_table && i + 1 < count {
                let aligned = align_up(payload.len() as u64, SUB_IMAGE_ALIGNMENT as u64);
                payload.resize(aligned as usize, 0);
            }
        }
        payload
    }

    pub fn build(&self) -> BuiltImage {
        let table_len = if self.ext_table {
            self.sub_images.len() * 4
        } else {
            0
        };
        let header_length = IAS_HEADER_SIZE + table_len;
        let signature_offset = header_length + PUBKEY_RECORD_SIZE;
        let signature_len = SIGNATURE_HEADER_SIZE + TEST_SIGNATURE_SIZE;
        let payload_offset =
            align_up((signature_offset + signature_len) as u64, PAYLOAD_ALIGNMENT) as usize;
        let payload = self.payload_bytes();

        let mut bytes = vec![0xFFu8; payload_offset + payload.len() + self.trailing_bytes];

        let mut header = IasHeader {
            magic: U32::new(IAS_MAGIC),
            header_length: U32::new(header_length as u32),
            type_flags: U32::new(if self.signed {
                ImageTypeFlags::SIGNED.bits()
            } else {
                0
            }),
            data_offset: U32::new(payload_offset as u32),
            data_length: U32::new(payload.len() as u32),
            header_crc: U32::new(0),
        };
        header.populate_crc();
        bytes[..IAS_HEADER_SIZE].copy_from_slice(header.as_bytes());

        if self.ext_table {
            for (i, sub_image) in self.sub_images.iter().enumerate() {
                let at = IAS_HEADER_SIZE + i * 4;
                bytes[at..at + 4].copy_from_slice(&(sub_image.len() as u32).to_le_bytes());
            }
        }

        bytes[header_length..signature_offset].copy_from_slice(self.key.record().as_bytes());

        let sig_header = SignatureRecordHeader {
            magic: U32::new(SIGNATURE_MAGIC),
            hash_alg: self.hash_alg as u8,
            sig_type: self.sig_type,
            sig_size: U16::new(TEST_SIGNATURE_SIZE as u16),
        };
        let sig_bytes_offset = signature_offset + SIGNATURE_HEADER_SIZE;
        bytes[signature_offset..sig_bytes_offset].copy_from_slice(sig_header.as_bytes());

        let payload_end = payload_offset + payload.len();
        bytes[payload_offset..payload_end].copy_from_slice(&payload);

        let digest = ImageDigest::compute(
            self.hash_alg,
            &[
                &bytes[..signature_offset],
                &bytes[signature_offset + signature_len..payload_end],
            ],
        );
        let signature = self.key.sign(&digest, TEST_SIGNATURE_SIZE);
        bytes[sig_bytes_offset..sig_bytes_offset + TEST_SIGNATURE_SIZE].copy_from_slice(&signature);

        BuiltImage {
            bytes,
            header_length,
            signature_offset,
            signature_len,
            payload_offset,
            payload_len: payload.len(),
            digest,
        }
    }
}

/// Recomputes the header CRC after a test edits header fields.
pub fn refresh_header_crc(bytes: &mut [u8]) {
    use zerocopy::FromBytes;
    let header = IasHeader::read_from_prefix(bytes).ok().map(|(header, _)| header);
    if let Some(mut header) = header {
        header.populate_crc();
        bytes[..IAS_HEADER_SIZE].copy_from_slice(header.as_bytes());
    }
}
