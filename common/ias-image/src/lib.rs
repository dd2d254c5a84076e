// Licensed under the Apache-2.0 license
#![cfg_attr(not(test), no_std)]

//! Wire format of signed IAS firmware containers.
//!
//! ```text
//! +------------------+ 0
//! | IasHeader        |
//! +------------------+ 24
//! | extension table  |  (header_length - 24) / 4 sub-image sizes
//! +------------------+ header_length
//! | PublicKeyRecord  |
//! +------------------+
//! | SignatureRecord  |  header + signature[sig_size]
//! +------------------+
//! | padding          |
//! +------------------+ data_offset
//! | payload          |
//! +------------------+ data_offset + data_length
//! ```
//!
//! All integers are little-endian.

use bitflags::bitflags;
use core::mem::offset_of;
use crc::{Crc, CRC_32_ISCSI};
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

pub use fw_config::HashAlg;

pub const IAS_MAGIC: u32 = u32::from_le_bytes(*b"ipk.");
pub const PUBKEY_MAGIC: u32 = u32::from_le_bytes(*b"$PKY");
pub const SIGNATURE_MAGIC: u32 = u32::from_le_bytes(*b"$SIG");

pub const RSA2048_MODULUS_SIZE: usize = 256;
pub const RSA_EXPONENT_SIZE: usize = 4;

pub const IAS_HEADER_SIZE: usize = core::mem::size_of::<IasHeader>();
pub const PUBKEY_RECORD_SIZE: usize = core::mem::size_of::<PublicKeyRecord>();
pub const SIGNATURE_HEADER_SIZE: usize = core::mem::size_of::<SignatureRecordHeader>();

/// Sub-images inside the payload are placed on this alignment.
pub const SUB_IMAGE_ALIGNMENT: u32 = 4;

/// CRC32 with the Castagnoli polynomial.
pub const CRC32C: Crc<u32> = Crc::<u32>::new(&CRC_32_ISCSI);

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ImageTypeFlags: u32 {
        const SIGNED = 0x0000_0100;
    }
}

/// Signature scheme selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigType {
    Pkcs1v15 = 1,
    Pss = 2,
}

impl core::convert::TryFrom<u8> for SigType {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SigType::Pkcs1v15),
            2 => Ok(SigType::Pss),
            _ => Err(()),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct IasHeader {
    pub magic: U32,
    pub header_length: U32,
    pub type_flags: U32,
    pub data_offset: U32,
    pub data_length: U32,
    pub header_crc: U32,
}

impl IasHeader {
    pub fn flags(&self) -> ImageTypeFlags {
        ImageTypeFlags::from_bits_retain(self.type_flags.get())
    }

    /// CRC over every header byte preceding the CRC field.
    pub fn compute_crc(&self) -> u32 {
        CRC32C.checksum(&self.as_bytes()[..offset_of!(IasHeader, header_crc)])
    }

    pub fn populate_crc(&mut self) {
        self.header_crc = U32::new(self.compute_crc());
    }

    pub fn verify_crc(&self) -> bool {
        self.compute_crc() == self.header_crc.get()
    }

    /// Size in bytes of the extension table following the fixed header.
    pub fn ext_table_size(&self) -> Option<usize> {
        (self.header_length.get() as usize).checked_sub(IAS_HEADER_SIZE)
    }

    /// End of the payload, or `None` on arithmetic overflow.
    pub fn payload_end(&self) -> Option<usize> {
        (self.data_offset.get() as usize).checked_add(self.data_length.get() as usize)
    }
}

/// RSA public key as stored in the container.
///
/// The exponent is stored with its bytes reversed relative to the big-endian
/// order expected by the verification library. This matches what the image
/// signing tool emits and must be preserved on disk.
#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct PublicKeyRecord {
    pub magic: U32,
    pub modulus: [u8; RSA2048_MODULUS_SIZE],
    pub exponent: [u8; RSA_EXPONENT_SIZE],
}

impl PublicKeyRecord {
    /// Exponent in verification-library (big-endian) order.
    pub fn library_exponent(&self) -> [u8; RSA_EXPONENT_SIZE] {
        let mut exponent = self.exponent;
        exponent.reverse();
        exponent
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct SignatureRecordHeader {
    pub magic: U32,
    pub hash_alg: u8,
    pub sig_type: u8,
    pub sig_size: U16,
}

/// Rounds `value` up to the next multiple of `align`, a power of two.
pub const fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) & !(align - 1)
}
