// Licensed under the Apache-2.0 license

#![cfg_attr(not(test), no_std)]

pub mod boot;
pub mod update_status;

/// Hash algorithm selector shared by key pinning and image digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    Sha256 = 1,
    Sha384 = 2,
}

impl core::convert::TryFrom<u8> for HashAlg {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(HashAlg::Sha256),
            2 => Ok(HashAlg::Sha384),
            _ => Err(()),
        }
    }
}

/// Location of the boot partition bit behind the hidden sideband register set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidebandRegister {
    pub port_id: u8,
    pub offset: u16,
    pub bit: u8,
}

impl SidebandRegister {
    pub const fn mask(&self) -> u32 {
        1 << (self.bit as u32 & 0x1F)
    }
}

/// Platform configuration for the resiliency engine.
/// These are the defaults that can be overridden per platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResiliencyConfig {
    /// Consecutive watchdog resets tolerated before failing over.
    pub watchdog_threshold: u32,
    /// Register holding the boot partition bit.
    pub boot_partition_register: SidebandRegister,
    /// Signature used to locate the update status region.
    pub update_status_signature: u32,
    /// Offset of the boot scratch record within its NV partition.
    pub scratch_offset: usize,
    /// Algorithm used to hash public keys before comparing against anchors.
    pub key_hash_alg: HashAlg,
}

impl Default for ResiliencyConfig {
    fn default() -> Self {
        ResiliencyConfig {
            watchdog_threshold: 3,
            boot_partition_register: SidebandRegister {
                port_id: 0xC6,
                offset: 0x3414,
                bit: 0,
            },
            update_status_signature: update_status::FW_UPDATE_STATUS_SIGNATURE,
            scratch_offset: 0,
            key_hash_alg: HashAlg::Sha256,
        }
    }
}
