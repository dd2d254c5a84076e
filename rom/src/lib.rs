/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Firmware integrity and resilient update engine for early boot.

--*/

#![cfg_attr(not(test), no_std)]

pub mod boot_partition;
pub use boot_partition::{BootPartitionSelector, SidebandBus, SidebandWindow};
pub mod failover;
pub use failover::{
    recovery_required, BootPlatform, DetectorState, FailureDetector, UpdateInFlight,
};
pub mod flash;
pub use flash::*;
pub mod image_verifier;
pub use image_verifier::{ContainerValidator, SubImage, ValidatedImage};
pub mod scratch;
pub use scratch::BootScratch;
pub mod update_status;
pub use update_status::{ComponentRegionLocator, FlashRegion, UpdateStatusStore};
pub mod verifier;
pub use verifier::{
    ImageDigest, KeyPolicy, KeyUsage, RsaPublicKey, SignatureRecord, SignatureVerifier,
    VerificationEnv,
};

// Boot flow
mod fw_boot;
pub use fw_boot::{BootChecks, CheckedBoot, LoadedComponent};

#[cfg(test)]
mod test_support;

pub use fw_config::boot::{BootPartition, BootPartitionControl};
pub use fw_error::{VerifyError, VerifyResult};
