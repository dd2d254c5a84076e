// Licensed under the Apache-2.0 license

//! Injects single-byte corruption into a component stored on flash.

use fw_config::boot::BootPartition;
use fw_error::{VerifyError, VerifyResult};
use fw_rom_common::{ComponentRegionLocator, FlashStorage};
use rand::Rng;

pub const DEFAULT_BLOCK_SIZE: usize = 0x1000;

/// Where and how a component was corrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Corruption {
    /// Absolute flash offset of the changed byte.
    pub offset: usize,
    pub original: u8,
    pub replacement: u8,
}

pub struct ComponentCorruptor<'a, L: ComponentRegionLocator> {
    flash: &'a dyn FlashStorage,
    locator: &'a L,
    block_size: usize,
}

impl<'a, L: ComponentRegionLocator> ComponentCorruptor<'a, L> {
    pub fn new(flash: &'a dyn FlashStorage, locator: &'a L) -> Self {
        Self {
            flash,
            locator,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }

    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Picks a random byte of component `signature` on `partition` and
    /// rewrites its flash block with that byte changed.
    pub fn corrupt<R: Rng>(
        &self,
        rng: &mut R,
        signature: u32,
        partition: BootPartition,
    ) -> VerifyResult<Corruption> {
        let region = self
            .locator
            .locate(signature, partition)
            .ok_or(VerifyError::NotFound)?;
        if region.len == 0 || self.block_size == 0 {
            return Err(VerifyError::InvalidParameter);
        }
        let offset = region.offset + rng.gen_range(0..region.len);

        let block_start = offset - offset % self.block_size;
        let block_len = core::cmp::min(self.block_size, self.flash.capacity() - block_start);
        let mut block = vec![0u8; block_len];
        self.flash.read(&mut block, block_start)?;

        let index = offset - block_start;
        let original = block[index];
        let replacement = original ^ rng.gen_range(1..=u8::MAX);
        block[index] = replacement;

        self.flash.erase(block_start, block_len)?;
        self.flash.write(&block, block_start)?;

        Ok(Corruption {
            offset,
            original,
            replacement,
        })
    }
}
