// Licensed under the Apache-2.0 license

//! Small collaborators shared by the unit tests of this crate.

use crate::failover::BootPlatform;
use crate::flash::{FlashDrvError, FlashStorage};
use core::cell::{Cell, RefCell};
use fw_config::boot::{BootPartition, BootPartitionControl};
use fw_error::{VerifyError, VerifyResult};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Byte-addressed flash backed by a `Vec`, with optional fault injection.
pub struct RamFlash {
    pub bytes: RefCell<Vec<u8>>,
    /// Reads overlapping `[start, end)` fail.
    pub bad_reads: Cell<Option<(usize, usize)>>,
    /// Writes overlapping `[start, end)` fail.
    pub bad_writes: Cell<Option<(usize, usize)>>,
    /// XOR mask applied to the byte at the given address whenever a write covers it.
    pub write_corruption: Cell<Option<(usize, u8)>>,
}

impl RamFlash {
    pub fn erased(size: usize) -> Self {
        Self::from_bytes(vec![0xFF; size])
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        RamFlash {
            bytes: RefCell::new(bytes),
            bad_reads: Cell::new(None),
            bad_writes: Cell::new(None),
            write_corruption: Cell::new(None),
        }
    }
}

fn overlaps(range: Option<(usize, usize)>, address: usize, len: usize) -> bool {
    range.is_some_and(|(start, end)| address < end && start < address + len)
}

impl FlashStorage for RamFlash {
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        if overlaps(self.bad_reads.get(), address, buffer.len()) {
            return Err(FlashDrvError::FAIL);
        }
        let bytes = self.bytes.borrow();
        let src = bytes
            .get(address..address + buffer.len())
            .ok_or(FlashDrvError::SIZE)?;
        buffer.copy_from_slice(src);
        Ok(())
    }

    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        if overlaps(self.bad_writes.get(), address, buffer.len()) {
            return Err(FlashDrvError::FAIL);
        }
        let mut bytes = self.bytes.borrow_mut();
        let dst = bytes
            .get_mut(address..address + buffer.len())
            .ok_or(FlashDrvError::SIZE)?;
        dst.copy_from_slice(buffer);
        if let Some((at, mask)) = self.write_corruption.get() {
            if overlaps(Some((at, at + 1)), address, buffer.len()) {
                bytes[at] ^= mask;
            }
        }
        Ok(())
    }

    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError> {
        let mut bytes = self.bytes.borrow_mut();
        let dst = bytes
            .get_mut(address..address + length)
            .ok_or(FlashDrvError::SIZE)?;
        dst.fill(0xFF);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.bytes.borrow().len()
    }
}

/// How a terminal platform call ended the test flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    ColdReset,
    Halt(u32),
}

#[derive(Default)]
pub struct TestPlatform {
    pub watchdog_fired: bool,
    pub clears: u32,
}

impl BootPlatform for TestPlatform {
    fn watchdog_timeout_occurred(&mut self) -> bool {
        self.watchdog_fired
    }

    fn clear_watchdog_status(&mut self) {
        self.watchdog_fired = false;
        self.clears += 1;
    }

    fn cold_reset(&mut self) -> ! {
        std::panic::panic_any(Terminal::ColdReset)
    }

    fn halt(&mut self, code: u32) -> ! {
        std::panic::panic_any(Terminal::Halt(code))
    }
}

/// Runs `f`, returning the terminal call it ended with, if any.
pub fn run_to_terminal<R>(f: impl FnOnce() -> R) -> Result<R, Terminal> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| match payload.downcast::<Terminal>() {
        Ok(terminal) => *terminal,
        Err(payload) => std::panic::resume_unwind(payload),
    })
}

pub struct TestPartitionControl {
    pub current: BootPartition,
    pub sets: Vec<BootPartition>,
    pub fail_get: bool,
    pub fail_set: bool,
}

impl TestPartitionControl {
    pub fn new(current: BootPartition) -> Self {
        TestPartitionControl {
            current,
            sets: Vec::new(),
            fail_get: false,
            fail_set: false,
        }
    }
}

impl BootPartitionControl for TestPartitionControl {
    fn get_boot_partition(&mut self) -> VerifyResult<BootPartition> {
        if self.fail_get {
            return Err(VerifyError::DeviceError);
        }
        Ok(self.current)
    }

    fn set_boot_partition(&mut self, partition: BootPartition) -> VerifyResult<()> {
        if self.fail_set {
            return Err(VerifyError::DeviceError);
        }
        self.sets.push(partition);
        self.current = partition;
        Ok(())
    }
}
