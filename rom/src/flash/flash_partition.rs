// Licensed under the Apache-2.0 license

use crate::flash::hil::{FlashDrvError, FlashStorage};

/// Represents a partition within the flash memory.
///
/// A `FlashPartition` provides a view into a contiguous region of the underlying
/// flash, allowing for read, write, and erase operations within the
/// specified bounds. All persisted engine state (update status, boot scratch)
/// is accessed through a partition, so every access is checked against the
/// partition's boundaries before it reaches the driver.
///
/// # Fields
/// - `driver`: Reference to the flash storage controller driver.
/// - `name`: Name of the partition (for debugging or identification).
/// - `base_offset`: The starting offset of the partition within the flash.
/// - `length`: The size of the partition in bytes.
pub struct FlashPartition<'a> {
    driver: &'a dyn FlashStorage,
    name: &'static str,
    base_offset: usize,
    length: usize,
}

impl<'a> FlashPartition<'a> {
    /// Creates a new `FlashPartition` instance.
    ///
    /// # Arguments
    ///
    /// * `driver` - Reference to the flash storage controller.
    /// * `name` - Static string slice representing the partition name.
    /// * `base_offset` - The starting offset of the partition within the flash.
    /// * `length` - The length of the partition in bytes.
    ///
    /// # Returns
    ///
    /// Returns `Ok(FlashPartition)` if the partition fits within the flash capacity,
    /// otherwise returns `Err(FlashDrvError::SIZE)`.
    pub fn new(
        driver: &'a dyn FlashStorage,
        name: &'static str,
        base_offset: usize,
        length: usize,
    ) -> Result<Self, FlashDrvError> {
        let end = base_offset
            .checked_add(length)
            .ok_or(FlashDrvError::SIZE)?;
        if end > driver.capacity() {
            return Err(FlashDrvError::SIZE);
        }
        Ok(FlashPartition {
            driver,
            name,
            base_offset,
            length,
        })
    }

    fn check_range(&self, partition_offset: usize, len: usize) -> Result<usize, FlashDrvError> {
        match partition_offset.checked_add(len) {
            Some(end) if end <= self.length => Ok(self.base_offset + partition_offset),
            _ => Err(FlashDrvError::SIZE),
        }
    }

    /// Reads data from the partition into `buf`, starting at `partition_offset`.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the requested range exceeds the
    /// partition, or propagates errors from the underlying flash controller.
    pub fn read(&self, partition_offset: usize, buf: &mut [u8]) -> Result<(), FlashDrvError> {
        let address = self.check_range(partition_offset, buf.len())?;
        self.driver.read(buf, address)
    }

    /// Writes `buf` to the partition, starting at `partition_offset`.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the write would exceed the
    /// partition, or propagates errors from the underlying flash controller.
    pub fn write(&self, partition_offset: usize, buf: &[u8]) -> Result<(), FlashDrvError> {
        let address = self.check_range(partition_offset, buf.len())?;
        self.driver.write(buf, address)
    }

    /// Erases `len` bytes of the partition, starting at `partition_offset`.
    pub fn erase(&self, partition_offset: usize, len: usize) -> Result<(), FlashDrvError> {
        let address = self.check_range(partition_offset, len)?;
        self.driver.erase(address, len)
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}
