/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_partition.rs

Abstract:

    Boot partition bit access through the hidden sideband register set.

--*/

use fw_config::boot::{BootPartition, BootPartitionControl};
use fw_config::SidebandRegister;
use fw_error::{VerifyError, VerifyResult};
use log::{debug, info, warn};

/// Chipset sideband transport. Registers are only reachable while revealed.
pub trait SidebandBus {
    fn reveal(&mut self) -> VerifyResult<()>;
    fn hide(&mut self);
    fn read32(&mut self, port_id: u8, offset: u16) -> VerifyResult<u32>;
    fn write32(&mut self, port_id: u8, offset: u16, value: u32) -> VerifyResult<()>;
}

impl<T: SidebandBus + ?Sized> SidebandBus for &mut T {
    fn reveal(&mut self) -> VerifyResult<()> {
        (**self).reveal()
    }

    fn hide(&mut self) {
        (**self).hide()
    }

    fn read32(&mut self, port_id: u8, offset: u16) -> VerifyResult<u32> {
        (**self).read32(port_id, offset)
    }

    fn write32(&mut self, port_id: u8, offset: u16, value: u32) -> VerifyResult<()> {
        (**self).write32(port_id, offset, value)
    }
}

/// Revealed sideband register window. Hidden again when dropped.
pub struct SidebandWindow<'b, B: SidebandBus> {
    bus: &'b mut B,
}

impl<'b, B: SidebandBus> SidebandWindow<'b, B> {
    pub fn open(bus: &'b mut B) -> VerifyResult<Self> {
        if let Err(err) = bus.reveal() {
            bus.hide();
            warn!("[fw-rom] Sideband reveal failed: {:?}", err);
            return Err(err);
        }
        Ok(SidebandWindow { bus })
    }

    pub fn read32(&mut self, reg: &SidebandRegister) -> VerifyResult<u32> {
        self.bus.read32(reg.port_id, reg.offset)
    }

    pub fn write32(&mut self, reg: &SidebandRegister, value: u32) -> VerifyResult<()> {
        self.bus.write32(reg.port_id, reg.offset, value)
    }
}

impl<B: SidebandBus> Drop for SidebandWindow<'_, B> {
    fn drop(&mut self) {
        self.bus.hide();
    }
}

pub struct BootPartitionSelector<B: SidebandBus> {
    bus: B,
    register: SidebandRegister,
}

impl<B: SidebandBus> BootPartitionSelector<B> {
    pub fn new(bus: B, register: SidebandRegister) -> Self {
        Self { bus, register }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: SidebandBus> BootPartitionControl for BootPartitionSelector<B> {
    fn get_boot_partition(&mut self) -> VerifyResult<BootPartition> {
        let mut window = SidebandWindow::open(&mut self.bus).map_err(bus_error)?;
        let value = window.read32(&self.register).map_err(bus_error)?;
        let partition = BootPartition::from_bit(value & self.register.mask() != 0);
        debug!("[fw-rom] Boot partition is {:?}", partition);
        Ok(partition)
    }

    fn set_boot_partition(&mut self, partition: BootPartition) -> VerifyResult<()> {
        let mut window = SidebandWindow::open(&mut self.bus).map_err(bus_error)?;
        let value = window.read32(&self.register).map_err(bus_error)?;
        let value = if partition.bit() {
            value | self.register.mask()
        } else {
            value & !self.register.mask()
        };
        window.write32(&self.register, value).map_err(bus_error)?;
        info!("[fw-rom] Boot partition set to {:?}", partition);
        Ok(())
    }
}

fn bus_error(err: VerifyError) -> VerifyError {
    warn!("[fw-rom] Sideband access failed: {:?}", err);
    VerifyError::DeviceError
}
