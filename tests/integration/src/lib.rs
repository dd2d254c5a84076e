// Licensed under the Apache-2.0 license

mod test_boot_flow;
mod test_component_corruption;
mod test_update_recovery;

#[cfg(test)]
mod test {
    use fw_config::update_status::FW_UPDATE_STATUS_SIGNATURE;
    use fw_config::ResiliencyConfig;
    use fw_error::VerifyError;
    use fw_rom_common::{
        BootChecks, BootPartition, BootPartitionSelector, BootScratch, ComponentRegionLocator,
        ContainerValidator, FailureDetector, FlashPartition, FlashRegion, ImageDigest, KeyUsage,
        SubImage,
    };
    use fw_testing_common::{
        run_to_terminal, BuiltImage, FakeCryptoEnv, FakePlatform, FakeSidebandBus,
        FixedRegionLocator, IasImageBuilder, InMemoryFlash, Terminal, TestSigningKey,
    };
    use log::LevelFilter;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use simple_logger::SimpleLogger;

    pub const STAGE2_SIGNATURE: u32 = u32::from_le_bytes(*b"SG02");

    const FLASH_SIZE: usize = 0x40000;
    const SCRATCH_PARTITION: FlashRegion = FlashRegion {
        offset: 0x0000,
        len: 0x1000,
    };
    pub const STATUS_REGION: FlashRegion = FlashRegion {
        offset: 0x1000,
        len: 0x1000,
    };
    const STAGE2_PRIMARY: usize = 0x10000;
    const STAGE2_BACKUP: usize = 0x20000;

    pub fn init_logger() {
        let _ = SimpleLogger::new().with_level(LevelFilter::Debug).init();
    }

    /// What one simulated boot attempt ended with.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum BootOutcome {
        Booted {
            partition: BootPartition,
            recovery_armed: bool,
            digest: ImageDigest,
            sub_images: Vec<SubImage>,
        },
        /// The checks passed but the component image was not trusted.
        Rejected {
            partition: BootPartition,
            error: VerifyError,
        },
        /// The checks themselves failed.
        Failed(VerifyError),
        Terminal(Terminal),
    }

    /// A board with A/B copies of a stage 2 container on flash.
    pub struct Board {
        pub flash: InMemoryFlash,
        pub bus: FakeSidebandBus,
        pub locator: FixedRegionLocator,
        pub config: ResiliencyConfig,
        pub key: TestSigningKey,
        pub stage2: BuiltImage,
        pub resets: u32,
    }

    impl Board {
        pub fn new(seed: u64) -> Self {
            init_logger();
            let key = TestSigningKey::generate(&mut StdRng::seed_from_u64(seed));
            let stage2 = IasImageBuilder::new(key)
                .sub_images(&[&[0x10; 0x123], &[0x20; 0x80], &[0x30; 0x41]])
                .build();

            let flash = InMemoryFlash::new(FLASH_SIZE);
            flash.load(STAGE2_PRIMARY, &stage2.bytes);
            flash.load(STAGE2_BACKUP, &stage2.bytes);

            let len = stage2.bytes.len();
            let locator = FixedRegionLocator::new()
                .shared(FW_UPDATE_STATUS_SIGNATURE, STATUS_REGION)
                .with(
                    STAGE2_SIGNATURE,
                    BootPartition::Primary,
                    FlashRegion {
                        offset: STAGE2_PRIMARY,
                        len,
                    },
                )
                .with(
                    STAGE2_SIGNATURE,
                    BootPartition::Backup,
                    FlashRegion {
                        offset: STAGE2_BACKUP,
                        len,
                    },
                );

            let config = ResiliencyConfig::default();
            let reg = config.boot_partition_register;
            Board {
                flash,
                bus: FakeSidebandBus::new().with_register(reg.port_id, reg.offset, 0),
                locator,
                config,
                key,
                stage2,
                resets: 0,
            }
        }

        pub fn partition(&self) -> BootPartition {
            let reg = self.config.boot_partition_register;
            BootPartition::from_bit(self.bus.register(reg.port_id, reg.offset) & reg.mask() != 0)
        }

        pub fn write_status(&self, bytes: &[u8]) {
            self.flash.load(STATUS_REGION.offset, bytes);
        }

        pub fn scratch(&self) -> BootScratch<'_> {
            let partition = FlashPartition::new(
                &self.flash,
                "boot_scratch",
                SCRATCH_PARTITION.offset,
                SCRATCH_PARTITION.len,
            )
            .unwrap();
            BootScratch::new(partition, self.config.scratch_offset).unwrap()
        }

        fn validator(&self) -> ContainerValidator<FakeCryptoEnv> {
            let env = FakeCryptoEnv::new().trust(
                KeyUsage::Payload,
                self.key.key_hash(self.config.key_hash_alg),
            );
            ContainerValidator::new(env, self.config.key_hash_alg)
        }

        /// Runs the early boot flow once. `watchdog` reports whether the
        /// previous boot ended in a watchdog timeout.
        pub fn boot(&mut self, watchdog: bool) -> BootOutcome {
            let validator = self.validator();
            let mut platform = FakePlatform {
                watchdog_fired: watchdog,
                ..Default::default()
            };
            let register = self.config.boot_partition_register;
            let config = self.config;
            let flash = &self.flash;
            let locator = &self.locator;
            let bus = &mut self.bus;

            let outcome = run_to_terminal(|| {
                let scratch = BootScratch::new(
                    FlashPartition::new(
                        flash,
                        "boot_scratch",
                        SCRATCH_PARTITION.offset,
                        SCRATCH_PARTITION.len,
                    )
                    .unwrap(),
                    config.scratch_offset,
                )
                .unwrap();
                let selector = BootPartitionSelector::new(&mut *bus, register);
                let mut detector = FailureDetector::new(&mut platform, selector, scratch);

                let checked = match BootChecks::run(&mut detector, flash, locator, &config) {
                    Ok(checked) => checked,
                    Err(err) => return BootOutcome::Failed(err),
                };

                let Some(region) = locator.locate(STAGE2_SIGNATURE, checked.partition()) else {
                    return BootOutcome::Failed(VerifyError::NotFound);
                };
                let image = flash.slice(region.offset, region.len);
                let mut sub_images = [SubImage::default(); 4];
                match checked.load_component(&validator, &image, KeyUsage::Payload, &mut sub_images)
                {
                    Ok(loaded) => BootOutcome::Booted {
                        partition: checked.partition(),
                        recovery_armed: checked.recovery_armed(),
                        digest: *loaded.image.digest(),
                        sub_images: sub_images[..loaded.sub_image_count].to_vec(),
                    },
                    Err(error) => BootOutcome::Rejected {
                        partition: checked.partition(),
                        error,
                    },
                }
            });

            assert_eq!(self.bus.reveal_count, self.bus.hide_count);
            match outcome {
                Ok(outcome) => outcome,
                Err(terminal) => {
                    if terminal == Terminal::ColdReset {
                        self.resets += 1;
                    }
                    BootOutcome::Terminal(terminal)
                }
            }
        }
    }
}
