// Licensed under the Apache-2.0 license

use fw_config::boot::BootPartition;
use fw_rom_common::{ComponentRegionLocator, FlashRegion};

/// Flash map with fixed regions per component signature and partition.
#[derive(Debug, Default, Clone)]
pub struct FixedRegionLocator {
    regions: Vec<(u32, BootPartition, FlashRegion)>,
}

impl FixedRegionLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, signature: u32, partition: BootPartition, region: FlashRegion) -> Self {
        self.regions.push((signature, partition, region));
        self
    }

    /// Same region on both partitions.
    pub fn shared(self, signature: u32, region: FlashRegion) -> Self {
        self.with(signature, BootPartition::Primary, region)
            .with(signature, BootPartition::Backup, region)
    }
}

impl ComponentRegionLocator for FixedRegionLocator {
    fn locate(&self, signature: u32, partition: BootPartition) -> Option<FlashRegion> {
        self.regions
            .iter()
            .find(|(sig, part, _)| *sig == signature && *part == partition)
            .map(|(_, _, region)| *region)
    }
}
