// Licensed under the Apache-2.0 license

use fw_error::{VerifyError, VerifyResult};
use fw_rom_common::SidebandBus;
use std::collections::HashMap;

/// Sideband bus with a register file and access accounting.
#[derive(Debug, Default)]
pub struct FakeSidebandBus {
    pub registers: HashMap<(u8, u16), u32>,
    pub revealed: bool,
    pub reveal_count: u32,
    pub hide_count: u32,
    pub reads: u32,
    pub writes: Vec<(u8, u16, u32)>,
    pub fail_reveal: bool,
    pub fail_read: bool,
    pub fail_write: bool,
    /// Register accesses attempted while the window was hidden.
    pub hidden_accesses: u32,
}

impl FakeSidebandBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_register(mut self, port_id: u8, offset: u16, value: u32) -> Self {
        self.registers.insert((port_id, offset), value);
        self
    }

    pub fn register(&self, port_id: u8, offset: u16) -> u32 {
        self.registers
            .get(&(port_id, offset))
            .copied()
            .unwrap_or(0)
    }
}

impl SidebandBus for FakeSidebandBus {
    fn reveal(&mut self) -> VerifyResult<()> {
        self.reveal_count += 1;
        if self.fail_reveal {
            return Err(VerifyError::DeviceError);
        }
        self.revealed = true;
        Ok(())
    }

    fn hide(&mut self) {
        self.hide_count += 1;
        self.revealed = false;
    }

    fn read32(&mut self, port_id: u8, offset: u16) -> VerifyResult<u32> {
        if !self.revealed {
            self.hidden_accesses += 1;
            return Err(VerifyError::DeviceError);
        }
        if self.fail_read {
            return Err(VerifyError::DeviceError);
        }
        self.reads += 1;
        Ok(self.register(port_id, offset))
    }

    fn write32(&mut self, port_id: u8, offset: u16, value: u32) -> VerifyResult<()> {
        if !self.revealed {
            self.hidden_accesses += 1;
            return Err(VerifyError::DeviceError);
        }
        if self.fail_write {
            return Err(VerifyError::DeviceError);
        }
        self.writes.push((port_id, offset, value));
        self.registers.insert((port_id, offset), value);
        Ok(())
    }
}
