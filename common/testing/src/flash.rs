// Licensed under the Apache-2.0 license

use fw_rom_common::flash::{FlashDrvError, FlashStorage};
use std::cell::{Cell, RefCell};

/// Flash device backed by a byte vector. Erased bytes read as `0xFF`.
pub struct InMemoryFlash {
    bytes: RefCell<Vec<u8>>,
    fail_reads: Cell<bool>,
    fail_writes: Cell<bool>,
    writes: Cell<u32>,
}

impl InMemoryFlash {
    pub fn new(capacity: usize) -> Self {
        InMemoryFlash {
            bytes: RefCell::new(vec![0xFF; capacity]),
            fail_reads: Cell::new(false),
            fail_writes: Cell::new(false),
            writes: Cell::new(0),
        }
    }

    /// Copies `data` into the device at `offset`, bypassing fault injection.
    pub fn load(&self, offset: usize, data: &[u8]) {
        self.bytes.borrow_mut()[offset..offset + data.len()].copy_from_slice(data);
    }

    pub fn contents(&self) -> Vec<u8> {
        self.bytes.borrow().clone()
    }

    pub fn slice(&self, offset: usize, len: usize) -> Vec<u8> {
        self.bytes.borrow()[offset..offset + len].to_vec()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.set(fail);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Number of successful writes issued through the driver interface.
    pub fn write_count(&self) -> u32 {
        self.writes.get()
    }

    fn check(&self, address: usize, len: usize) -> Result<(), FlashDrvError> {
        match address.checked_add(len) {
            Some(end) if end <= self.capacity() => Ok(()),
            _ => Err(FlashDrvError::SIZE),
        }
    }
}

impl FlashStorage for InMemoryFlash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        self.check(address, buffer.len())?;
        if self.fail_reads.get() {
            return Err(FlashDrvError::FAIL);
        }
        buffer.copy_from_slice(&self.bytes.borrow()[address..address + buffer.len()]);
        Ok(())
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        self.check(address, buffer.len())?;
        if self.fail_writes.get() {
            return Err(FlashDrvError::FAIL);
        }
        self.bytes.borrow_mut()[address..address + buffer.len()].copy_from_slice(buffer);
        self.writes.set(self.writes.get() + 1);
        Ok(())
    }

    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError> {
        self.check(address, length)?;
        if self.fail_writes.get() {
            return Err(FlashDrvError::FAIL);
        }
        self.bytes.borrow_mut()[address..address + length].fill(0xFF);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.borrow().len()
    }
}
