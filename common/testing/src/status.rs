// Licensed under the Apache-2.0 license

use fw_config::update_status::{
    ComponentState, ComponentStatusRecord, FwUpdateStatusHeader, OverallState,
    FW_UPDATE_STATUS_REGION_SIZE,
};
use zerocopy::IntoBytes;

const HEADER_SIZE: usize = core::mem::size_of::<FwUpdateStatusHeader>();
const RECORD_SIZE: usize = core::mem::size_of::<ComponentStatusRecord>();

/// Builds an update status region image.
pub struct UpdateStatusBuilder {
    state: u8,
    retry_count: u8,
    component_count: Option<u8>,
    components: Vec<ComponentStatusRecord>,
}

impl UpdateStatusBuilder {
    pub fn new(state: OverallState) -> Self {
        UpdateStatusBuilder {
            state: state as u8,
            retry_count: 0,
            component_count: None,
            components: Vec::new(),
        }
    }

    pub fn retry_count(mut self, retry_count: u8) -> Self {
        self.retry_count = retry_count;
        self
    }

    pub fn component(mut self, signature: u32, state: ComponentState) -> Self {
        self.components
            .push(ComponentStatusRecord::new(signature, state, 0));
        self
    }

    /// Adds a record with an arbitrary classification byte.
    pub fn raw_component(mut self, signature: u32, update_pending: u8) -> Self {
        let mut record = ComponentStatusRecord::new(signature, ComponentState::None, 0);
        record.update_pending = update_pending;
        self.components.push(record);
        self
    }

    /// Overrides the stored component count.
    pub fn component_count(mut self, count: u8) -> Self {
        self.component_count = Some(count);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let count = self
            .component_count
            .unwrap_or(self.components.len() as u8);
        let mut header = FwUpdateStatusHeader::new(OverallState::Idle, self.retry_count, count);
        header.state_machine = self.state;

        let mut bytes = vec![0xFFu8; FW_UPDATE_STATUS_REGION_SIZE];
        bytes[..HEADER_SIZE].copy_from_slice(header.as_bytes());
        for (i, record) in self.components.iter().enumerate() {
            let at = HEADER_SIZE + i * RECORD_SIZE;
            bytes[at..at + RECORD_SIZE].copy_from_slice(record.as_bytes());
        }
        bytes
    }
}
