// Licensed under the Apache-2.0 license

//! Read-only view of the persisted firmware update status region.

use crate::flash::{FlashPartition, FlashStorage};
use fw_config::boot::BootPartition;
use fw_config::update_status::{
    ComponentStatus, ComponentStatusRecord, FwUpdateStatusHeader, OverallState,
    MAX_FW_COMPONENTS,
};
use fw_error::{VerifyError, VerifyResult};
use log::warn;
use zerocopy::{FromBytes, FromZeros, IntoBytes};

const HEADER_SIZE: usize = core::mem::size_of::<FwUpdateStatusHeader>();
const RECORD_SIZE: usize = core::mem::size_of::<ComponentStatusRecord>();

/// A named region on flash, in absolute flash offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashRegion {
    pub offset: usize,
    pub len: usize,
}

/// Finds flash regions by component signature and boot partition.
pub trait ComponentRegionLocator {
    fn locate(&self, signature: u32, partition: BootPartition) -> Option<FlashRegion>;
}

impl<T: ComponentRegionLocator + ?Sized> ComponentRegionLocator for &T {
    fn locate(&self, signature: u32, partition: BootPartition) -> Option<FlashRegion> {
        (**self).locate(signature, partition)
    }
}

pub struct UpdateStatusStore<'a> {
    partition: Option<FlashPartition<'a>>,
}

impl<'a> UpdateStatusStore<'a> {
    /// Locates the status region for `partition`. A region that cannot be
    /// found, or does not fit the flash, yields an empty store.
    pub fn locate(
        flash: &'a dyn FlashStorage,
        locator: &dyn ComponentRegionLocator,
        signature: u32,
        partition: BootPartition,
    ) -> Self {
        let partition = locator
            .locate(signature, partition)
            .and_then(|region| {
                FlashPartition::new(flash, "fw_update_status", region.offset, region.len)
                    .map_err(|err| warn!("[fw-rom] Update status region unusable: {:?}", err))
                    .ok()
            });
        UpdateStatusStore { partition }
    }

    /// A store with no backing region.
    pub fn absent() -> Self {
        UpdateStatusStore { partition: None }
    }

    pub fn is_present(&self) -> bool {
        self.partition.is_some()
    }

    /// Reads the header, or `None` if the region is absent or was never
    /// initialized.
    fn header(&self) -> VerifyResult<Option<FwUpdateStatusHeader>> {
        let Some(partition) = &self.partition else {
            return Ok(None);
        };
        let mut header = FwUpdateStatusHeader::new_zeroed();
        partition.read(0, header.as_mut_bytes())?;
        if !header.is_valid() {
            warn!("[fw-rom] Update status header not initialized");
            return Ok(None);
        }
        Ok(Some(header))
    }

    pub fn overall_state(&self) -> VerifyResult<OverallState> {
        match self.header()? {
            None => Ok(OverallState::Uninitialized),
            Some(header) => header.overall_state().map_err(|_| {
                warn!(
                    "[fw-rom] Unknown overall update state {:#x}",
                    header.state_machine
                );
                VerifyError::Corrupt
            }),
        }
    }

    pub fn retry_count(&self) -> VerifyResult<u8> {
        Ok(self.header()?.map_or(0, |header| header.retry_count))
    }

    /// Iterates the component records. Each item fails with `Corrupt` if
    /// its state byte is not a known classification.
    pub fn components(&self) -> VerifyResult<ComponentIter<'_, 'a>> {
        let count = match (self.header()?, &self.partition) {
            (Some(header), Some(_)) => {
                core::cmp::min(header.component_count as usize, MAX_FW_COMPONENTS)
            }
            _ => 0,
        };
        Ok(ComponentIter {
            partition: self.partition.as_ref(),
            index: 0,
            count,
        })
    }

    /// First component whose update is in progress on either partition.
    pub fn first_in_flight_component(&self) -> VerifyResult<Option<ComponentStatus>> {
        for status in self.components()? {
            let status = status?;
            if status.state.is_in_flight() {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }

    pub fn component(&self, signature: u32) -> VerifyResult<Option<ComponentStatus>> {
        for status in self.components()? {
            let status = status?;
            if status.signature == signature {
                return Ok(Some(status));
            }
        }
        Ok(None)
    }
}

pub struct ComponentIter<'s, 'a> {
    partition: Option<&'s FlashPartition<'a>>,
    index: usize,
    count: usize,
}

impl Iterator for ComponentIter<'_, '_> {
    type Item = VerifyResult<ComponentStatus>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let partition = self.partition?;
        let offset = HEADER_SIZE + self.index * RECORD_SIZE;
        self.index += 1;

        let mut bytes = [0u8; RECORD_SIZE];
        if let Err(err) = partition.read(offset, &mut bytes) {
            // Stop after a read failure.
            self.index = self.count;
            return Some(Err(err.into()));
        }
        let status = ComponentStatusRecord::read_from_bytes(&bytes)
            .map_err(|_| VerifyError::Corrupt)
            .and_then(|record| {
                record.status().map_err(|_| {
                    warn!(
                        "[fw-rom] Unknown component state {:#x}",
                        record.update_pending
                    );
                    VerifyError::Corrupt
                })
            });
        Some(status)
    }
}
