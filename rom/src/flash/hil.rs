// Licensed under the Apache-2.0 license

//! Generic interface for non-volatile storage access.

use core::result::Result;
use fw_error::VerifyError;

/// Simple interface for reading, writing and erasing arbitrary lengths of data on
/// non-volatile storage. Flash drivers, and the in-memory fakes used in tests,
/// implement this trait.
pub trait FlashStorage {
    /// Read from the storage, filling the provided buffer with data
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError>;

    /// Write the full contents of the buffer, starting at the specified address
    fn write(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError>;

    /// Erase `length` bytes starting at address `address`. The address must be
    /// in the address space of the physical storage.
    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError>;

    /// Returns the size of the storage in bytes.
    fn capacity(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum FlashDrvError {
    /// Generic failure condition
    FAIL = 1,
    /// Underlying system is busy
    BUSY = 2,
    /// The component is powered down
    OFF = 4,
    /// An invalid parameter was passed
    INVAL = 6,
    /// Request falls outside the storage or partition bounds
    SIZE = 7,
    /// Operation is not supported
    NOSUPPORT = 10,
    /// Device is not available
    NODEVICE = 11,
}

impl From<FlashDrvError> for usize {
    fn from(err: FlashDrvError) -> usize {
        err as usize
    }
}

impl From<FlashDrvError> for VerifyError {
    fn from(err: FlashDrvError) -> VerifyError {
        match err {
            FlashDrvError::SIZE | FlashDrvError::INVAL => VerifyError::InvalidParameter,
            FlashDrvError::FAIL
            | FlashDrvError::BUSY
            | FlashDrvError::OFF
            | FlashDrvError::NOSUPPORT
            | FlashDrvError::NODEVICE => VerifyError::DeviceError,
        }
    }
}
