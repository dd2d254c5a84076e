// Licensed under the Apache-2.0 license

//! Failed boot counter and recovery trigger kept in a boot scratch record.

use crate::flash::FlashPartition;
use fw_config::update_status::BootScratchRecord;
use fw_error::{VerifyError, VerifyResult};
use log::{info, warn};
use zerocopy::{FromZeros, IntoBytes};

const RECORD_SIZE: usize = core::mem::size_of::<BootScratchRecord>();
const COUNT_OFFSET: usize = core::mem::offset_of!(BootScratchRecord, failed_boot_count);
const TRIGGER_OFFSET: usize = core::mem::offset_of!(BootScratchRecord, recovery_trigger);

pub struct BootScratch<'a> {
    partition: FlashPartition<'a>,
    offset: usize,
}

impl<'a> BootScratch<'a> {
    /// Binds the scratch record at `offset` within `partition`.
    pub fn new(partition: FlashPartition<'a>, offset: usize) -> VerifyResult<Self> {
        match offset.checked_add(RECORD_SIZE) {
            Some(end) if end <= partition.len() => Ok(BootScratch { partition, offset }),
            _ => Err(VerifyError::InvalidParameter),
        }
    }

    fn load(&self) -> VerifyResult<BootScratchRecord> {
        let mut record = BootScratchRecord::new_zeroed();
        self.partition.read(self.offset, record.as_mut_bytes())?;
        Ok(record.or_default())
    }

    /// Rewrites the record. The marker and trigger words are programmed
    /// before the counter, so a failed counter write leaves the trigger in
    /// place and the counter erased. A failure between the erase and the
    /// first write still loses the whole record.
    fn store(&self, record: &BootScratchRecord) -> VerifyResult<()> {
        let bytes = record.as_bytes();
        self.partition.erase(self.offset, RECORD_SIZE)?;
        self.partition.write(self.offset, &bytes[..COUNT_OFFSET])?;
        self.partition
            .write(self.offset + TRIGGER_OFFSET, &bytes[TRIGGER_OFFSET..])?;
        self.partition.write(
            self.offset + COUNT_OFFSET,
            &bytes[COUNT_OFFSET..TRIGGER_OFFSET],
        )?;
        Ok(())
    }

    pub fn failed_boot_count(&self) -> VerifyResult<u32> {
        Ok(self.load()?.failed_boot_count.get())
    }

    /// Increments the counter and returns the value read back from storage.
    pub fn increment_failed_boot_count(&self) -> VerifyResult<u32> {
        let record = self.load()?;
        let count = record.failed_boot_count.get().saturating_add(1);
        self.store(&BootScratchRecord::new(
            count,
            record.recovery_trigger.get() != 0,
        ))?;

        let stored = self.failed_boot_count()?;
        if stored != count {
            warn!(
                "[fw-rom] Failed boot count readback mismatch: wrote {} read {}",
                count, stored
            );
            return Err(VerifyError::DeviceError);
        }
        Ok(stored)
    }

    pub fn reset_failed_boot_count(&self) -> VerifyResult<()> {
        let record = self.load()?;
        if record.failed_boot_count.get() == 0 {
            return Ok(());
        }
        self.store(&BootScratchRecord::new(0, record.recovery_trigger.get() != 0))
    }

    pub fn recovery_trigger(&self) -> VerifyResult<bool> {
        Ok(self.load()?.recovery_trigger.get() != 0)
    }

    /// Arms the recovery trigger consumed by a later boot stage.
    pub fn set_recovery_trigger(&self) -> VerifyResult<()> {
        let record = self.load()?;
        if record.recovery_trigger.get() != 0 {
            return Ok(());
        }
        info!("[fw-rom] Recovery trigger set");
        self.store(&BootScratchRecord::new(record.failed_boot_count.get(), true))
    }

    pub fn clear_recovery_trigger(&self) -> VerifyResult<()> {
        let record = self.load()?;
        if record.recovery_trigger.get() == 0 {
            return Ok(());
        }
        self.store(&BootScratchRecord::new(record.failed_boot_count.get(), false))
    }
}
