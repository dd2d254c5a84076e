// Licensed under the Apache-2.0 license

//! Persisted firmware update progress and boot scratch layouts.
//!
//! State bytes are chosen so that every forward transition only clears bits,
//! which lets the update agent advance a record in place on NOR flash.

use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Maximum number of component records following the status header.
pub const MAX_FW_COMPONENTS: usize = 8;

pub const FW_UPDATE_STATUS_SIGNATURE: u32 = u32::from_le_bytes(*b"FWUS");
pub const FW_UPDATE_STATUS_VERSION: u16 = 0x0001;

/// Size in bytes of a full update status region.
pub const FW_UPDATE_STATUS_REGION_SIZE: usize = core::mem::size_of::<FwUpdateStatusHeader>()
    + MAX_FW_COMPONENTS * core::mem::size_of::<ComponentStatusRecord>();

/// Overall progress of a firmware update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverallState {
    /// The status region could not be located.
    Uninitialized,
    Idle = 0xFF,
    Recovery = 0x7F,
    UpdatingPrimary = 0x7E,
    UpdatingBackup = 0x7D,
    UpdatingBoth = 0x7C,
    Done = 0x77,
}

impl core::convert::TryFrom<u8> for OverallState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xFF => Ok(OverallState::Idle),
            0x7F => Ok(OverallState::Recovery),
            0x7E => Ok(OverallState::UpdatingPrimary),
            0x7D => Ok(OverallState::UpdatingBackup),
            0x7C => Ok(OverallState::UpdatingBoth),
            0x77 => Ok(OverallState::Done),
            _ => Err(()),
        }
    }
}

/// Update-pending classification of a single component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentState {
    None = 0xFF,
    InProgressOnPrimary = 0xFE,
    InProgressOnBackup = 0xFC,
    Done = 0xF8,
}

impl ComponentState {
    pub const fn is_in_flight(self) -> bool {
        matches!(
            self,
            ComponentState::InProgressOnPrimary | ComponentState::InProgressOnBackup
        )
    }
}

impl core::convert::TryFrom<u8> for ComponentState {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xFF => Ok(ComponentState::None),
            0xFE => Ok(ComponentState::InProgressOnPrimary),
            0xFC => Ok(ComponentState::InProgressOnBackup),
            0xF8 => Ok(ComponentState::Done),
            _ => Err(()),
        }
    }
}

/// Decoded component record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentStatus {
    pub signature: u32,
    pub state: ComponentState,
    pub last_status: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FwUpdateStatusHeader {
    pub signature: U32,
    pub version: U16,
    pub state_machine: u8,
    pub retry_count: u8,
    pub component_count: u8,
    pub reserved: [u8; 3],
}

impl FwUpdateStatusHeader {
    pub fn new(state: OverallState, retry_count: u8, component_count: u8) -> Self {
        FwUpdateStatusHeader {
            signature: U32::new(FW_UPDATE_STATUS_SIGNATURE),
            version: U16::new(FW_UPDATE_STATUS_VERSION),
            state_machine: state as u8,
            retry_count,
            component_count,
            reserved: [0xFF; 3],
        }
    }

    pub fn is_valid(&self) -> bool {
        self.signature.get() == FW_UPDATE_STATUS_SIGNATURE
            && self.version.get() == FW_UPDATE_STATUS_VERSION
    }

    pub fn overall_state(&self) -> Result<OverallState, ()> {
        OverallState::try_from(self.state_machine)
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct ComponentStatusRecord {
    pub signature: U32,
    pub update_pending: u8,
    pub reserved: [u8; 3],
    pub last_status: U32,
}

impl ComponentStatusRecord {
    pub fn new(signature: u32, state: ComponentState, last_status: u32) -> Self {
        ComponentStatusRecord {
            signature: U32::new(signature),
            update_pending: state as u8,
            reserved: [0xFF; 3],
            last_status: U32::new(last_status),
        }
    }

    pub fn status(&self) -> Result<ComponentStatus, ()> {
        Ok(ComponentStatus {
            signature: self.signature.get(),
            state: ComponentState::try_from(self.update_pending)?,
            last_status: self.last_status.get(),
        })
    }
}

pub const BOOT_SCRATCH_MARKER: u32 = u32::from_le_bytes(*b"BSCR");

/// Failed boot counter and recovery trigger, kept in a small NV cell.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct BootScratchRecord {
    pub marker: U32,
    pub failed_boot_count: U32,
    pub recovery_trigger: U32,
    pub reserved: U32,
}

impl BootScratchRecord {
    pub fn new(failed_boot_count: u32, recovery_trigger: bool) -> Self {
        BootScratchRecord {
            marker: U32::new(BOOT_SCRATCH_MARKER),
            failed_boot_count: U32::new(failed_boot_count),
            recovery_trigger: U32::new(recovery_trigger as u32),
            reserved: U32::new(0),
        }
    }

    /// Returns the record, or a zeroed one if the cell was never written.
    /// An erased counter word reads as zero.
    pub fn or_default(mut self) -> Self {
        if self.marker.get() != BOOT_SCRATCH_MARKER {
            return BootScratchRecord::new(0, false);
        }
        if self.failed_boot_count.get() == u32::MAX {
            self.failed_boot_count = U32::new(0);
        }
        self
    }
}
