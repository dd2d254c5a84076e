/*++

Licensed under the Apache-2.0 license.

File Name:

    fw_boot.rs

Abstract:

    Early boot flow - Runs the failure checks before any component image is
    trusted.

--*/

use crate::failover::{BootPlatform, FailureDetector};
use crate::flash::FlashStorage;
use crate::image_verifier::{ContainerValidator, SubImage, ValidatedImage};
use crate::update_status::{ComponentRegionLocator, UpdateStatusStore};
use crate::verifier::{KeyUsage, VerificationEnv};
use fw_config::boot::{BootPartition, BootPartitionControl};
use fw_config::ResiliencyConfig;
use fw_error::VerifyResult;
use log::{info, warn};

pub struct BootChecks;

impl BootChecks {
    /// Runs the update consistency and watchdog checks for this boot.
    ///
    /// Does not return if the watchdog threshold is reached; the platform is
    /// reset into the other bank or halted instead.
    pub fn run<P: BootPlatform, C: BootPartitionControl>(
        detector: &mut FailureDetector<'_, P, C>,
        flash: &dyn FlashStorage,
        locator: &dyn ComponentRegionLocator,
        config: &ResiliencyConfig,
    ) -> VerifyResult<CheckedBoot> {
        info!("[fw-rom] Starting boot checks");

        let partition = detector.current_partition()?;
        let store =
            UpdateStatusStore::locate(flash, locator, config.update_status_signature, partition);
        // The watchdog check runs even when the consistency check fails, so a
        // bank with unusable state can still fail over.
        let consistency = detector.check_update_consistency(&store);
        if let Err(err) = &consistency {
            warn!("[fw-rom] Update consistency check failed: {}", err);
        }
        let watchdog = detector.check_watchdog_failures(config.watchdog_threshold);
        consistency?;
        watchdog?;

        let recovery_armed = detector.scratch().recovery_trigger()?;
        if recovery_armed {
            warn!("[fw-rom] Booting {:?} with recovery armed", partition);
        } else {
            info!("[fw-rom] Boot checks passed on {:?}", partition);
        }

        Ok(CheckedBoot {
            partition,
            recovery_armed,
        })
    }
}

/// Proof that the boot checks ran. Component images can only be loaded
/// through it.
#[derive(Debug)]
pub struct CheckedBoot {
    partition: BootPartition,
    recovery_armed: bool,
}

/// A validated component and the layout of its sub-images.
#[derive(Debug, Clone, Copy)]
pub struct LoadedComponent<'a> {
    pub image: ValidatedImage<'a>,
    pub sub_image_count: usize,
}

impl CheckedBoot {
    pub fn partition(&self) -> BootPartition {
        self.partition
    }

    pub fn recovery_armed(&self) -> bool {
        self.recovery_armed
    }

    /// Validates `buffer` and fills `sub_images` with its layout.
    pub fn load_component<'a, Env: VerificationEnv>(
        &self,
        validator: &ContainerValidator<Env>,
        buffer: &'a [u8],
        usage: KeyUsage,
        sub_images: &mut [SubImage],
    ) -> VerifyResult<LoadedComponent<'a>> {
        let image = validator.validate(buffer, usage).map_err(|err| {
            warn!("[fw-rom] Rejecting {:?} component: {}", usage, err);
            err
        })?;
        let sub_image_count = image.extract_sub_images(sub_images)?;
        Ok(LoadedComponent {
            image,
            sub_image_count,
        })
    }
}
