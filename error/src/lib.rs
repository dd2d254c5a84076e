/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Error taxonomy shared by the firmware integrity and resiliency engine.

--*/

#![cfg_attr(not(test), no_std)]

use thiserror::Error;

/// Errors returned by image validation, persisted state access and the
/// failover logic.
///
/// Callers must treat every error coming out of image validation as
/// "do not trust this image".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// Container fields are malformed or point outside the buffer.
    #[error("malformed image or record format")]
    InvalidFormat,
    /// A checksum or an encoded state value does not match.
    #[error("integrity check failed")]
    Corrupt,
    /// Key hash or signature mismatch.
    #[error("security violation")]
    SecurityViolation,
    /// Unknown algorithm, signature scheme or unsigned image.
    #[error("unsupported algorithm or image type")]
    Unsupported,
    /// Missing trust anchor or persisted region.
    #[error("required item not found")]
    NotFound,
    /// The underlying register bus or flash device failed.
    #[error("device access failed")]
    DeviceError,
    /// Failover could not be completed.
    #[error("failover could not be completed; system halted")]
    Halted,
    /// A caller-supplied argument or record identifier is invalid.
    #[error("invalid parameter")]
    InvalidParameter,
}

impl VerifyError {
    /// Stable, non-zero code reported through the platform halt path.
    pub const fn code(self) -> u32 {
        match self {
            VerifyError::InvalidFormat => 0xE000_0001,
            VerifyError::Corrupt => 0xE000_0002,
            VerifyError::SecurityViolation => 0xE000_0003,
            VerifyError::Unsupported => 0xE000_0004,
            VerifyError::NotFound => 0xE000_0005,
            VerifyError::DeviceError => 0xE000_0006,
            VerifyError::Halted => 0xE000_0007,
            VerifyError::InvalidParameter => 0xE000_0008,
        }
    }
}

pub type VerifyResult<T> = Result<T, VerifyError>;
