/*++

Licensed under the Apache-2.0 license.

File Name:

    failover.rs

Abstract:

    Boot failure detection and A/B failover.

--*/

use crate::scratch::BootScratch;
use crate::update_status::UpdateStatusStore;
use fw_config::boot::{BootPartition, BootPartitionControl};
use fw_config::update_status::ComponentState;
use fw_error::{VerifyError, VerifyResult};
use log::{error, info, warn};
use smlang::statemachine;

statemachine! {
    derive_states: [Clone, Copy, Debug],
    transitions: {
        *Normal + UpdateInconsistent = RecoveryArmed,
        Normal + WatchdogThresholdReached = RecoveryArmed,

        // armed until the platform resets
        RecoveryArmed + UpdateInconsistent = RecoveryArmed,
        RecoveryArmed + WatchdogThresholdReached = RecoveryArmed,

        Normal + FailoverFault = Halted,
        RecoveryArmed + FailoverFault = Halted,
    }
}

pub struct DetectorContext;

impl StateMachineContext for DetectorContext {}

/// Externally visible detector state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Normal,
    RecoveryArmed,
    Halted,
}

impl From<States> for DetectorState {
    fn from(state: States) -> Self {
        match state {
            States::Normal => DetectorState::Normal,
            States::RecoveryArmed => DetectorState::RecoveryArmed,
            States::Halted => DetectorState::Halted,
        }
    }
}

/// Platform services needed to detect and act on boot failures.
pub trait BootPlatform {
    /// Whether the previous boot ended in a watchdog timeout.
    fn watchdog_timeout_occurred(&mut self) -> bool;

    /// Clears the sticky watchdog timeout status.
    fn clear_watchdog_status(&mut self);

    fn cold_reset(&mut self) -> !;

    /// Stops the platform with `code`. Never resumes boot.
    fn halt(&mut self, code: u32) -> !;
}

impl<T: BootPlatform + ?Sized> BootPlatform for &mut T {
    fn watchdog_timeout_occurred(&mut self) -> bool {
        (**self).watchdog_timeout_occurred()
    }

    fn clear_watchdog_status(&mut self) {
        (**self).clear_watchdog_status()
    }

    fn cold_reset(&mut self) -> ! {
        (**self).cold_reset()
    }

    fn halt(&mut self, code: u32) -> ! {
        (**self).halt(code)
    }
}

/// Partition an in-progress component update is being written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateInFlight {
    Idle,
    OnPrimary,
    OnBackup,
}

impl From<ComponentState> for UpdateInFlight {
    fn from(state: ComponentState) -> Self {
        match state {
            ComponentState::InProgressOnPrimary => UpdateInFlight::OnPrimary,
            ComponentState::InProgressOnBackup => UpdateInFlight::OnBackup,
            ComponentState::None | ComponentState::Done => UpdateInFlight::Idle,
        }
    }
}

/// Whether booting from `current` while `in_flight` is pending requires recovery.
///
/// Booting the bank that is being written, or booting Backup with nothing
/// pending, means the previous attempt did not complete normally.
pub const fn recovery_required(in_flight: UpdateInFlight, current: BootPartition) -> bool {
    match (in_flight, current) {
        (UpdateInFlight::OnPrimary, BootPartition::Primary) => true,
        (UpdateInFlight::OnBackup, BootPartition::Backup) => true,
        (UpdateInFlight::Idle, BootPartition::Backup) => true,
        (UpdateInFlight::OnPrimary, BootPartition::Backup) => false,
        (UpdateInFlight::OnBackup, BootPartition::Primary) => false,
        (UpdateInFlight::Idle, BootPartition::Primary) => false,
    }
}

/// Failure Detector
pub struct FailureDetector<'a, P: BootPlatform, C: BootPartitionControl> {
    platform: P,
    partition_control: C,
    scratch: BootScratch<'a>,
    state_machine: StateMachine<DetectorContext>,
}

impl<'a, P: BootPlatform, C: BootPartitionControl> FailureDetector<'a, P, C> {
    pub fn new(platform: P, partition_control: C, scratch: BootScratch<'a>) -> Self {
        Self {
            platform,
            partition_control,
            scratch,
            state_machine: StateMachine::new(DetectorContext),
        }
    }

    pub fn state(&self) -> DetectorState {
        (*self.state_machine.state()).into()
    }

    pub fn scratch(&self) -> &BootScratch<'a> {
        &self.scratch
    }

    pub fn current_partition(&mut self) -> VerifyResult<BootPartition> {
        self.partition_control.get_boot_partition()
    }

    /// Arms the recovery trigger when the update status does not match the
    /// bank being booted, or cannot be read. Returns whether the trigger was
    /// armed.
    pub fn check_update_consistency(&mut self, store: &UpdateStatusStore) -> VerifyResult<bool> {
        let in_flight = match store.first_in_flight_component() {
            Ok(Some(status)) => {
                info!(
                    "[fw-rom] Component {:#x} update in flight: {:?}",
                    status.signature, status.state
                );
                Some(UpdateInFlight::from(status.state))
            }
            Ok(None) => Some(UpdateInFlight::Idle),
            Err(VerifyError::Corrupt) => {
                warn!("[fw-rom] Update status corrupt");
                None
            }
            Err(err) => {
                warn!("[fw-rom] Update status unreadable: {}", err);
                None
            }
        };

        let inconsistent = match in_flight {
            Some(in_flight) => recovery_required(in_flight, self.current_partition()?),
            None => true,
        };

        if inconsistent {
            warn!("[fw-rom] Update state inconsistent with boot partition");
            self.scratch.set_recovery_trigger()?;
            self.transition(Events::UpdateInconsistent);
        }
        Ok(inconsistent)
    }

    /// Counts watchdog resets and fails over to the other bank once
    /// `threshold` consecutive failures have been seen. Does not return if
    /// the threshold is reached.
    pub fn check_watchdog_failures(&mut self, threshold: u32) -> VerifyResult<()> {
        if !self.platform.watchdog_timeout_occurred() {
            return Ok(());
        }

        self.platform.clear_watchdog_status();
        let count = self.scratch.increment_failed_boot_count()?;
        warn!(
            "[fw-rom] Watchdog timeout detected, failed boot count {}",
            count
        );

        if count < threshold {
            return Ok(());
        }

        self.transition(Events::WatchdogThresholdReached);
        self.fail_over()
    }

    /// Called by a later stage once the boot is known to be good.
    pub fn acknowledge_boot_success(&mut self) -> VerifyResult<()> {
        self.scratch.reset_failed_boot_count()
    }

    fn transition(&mut self, event: Events) {
        if self.state_machine.process_event(event).is_err() {
            warn!("[fw-rom] Detector event ignored in state {:?}", self.state());
        }
    }

    fn switch_partition(&mut self) -> VerifyResult<BootPartition> {
        self.scratch.reset_failed_boot_count()?;
        self.scratch.set_recovery_trigger()?;
        let target = self.partition_control.get_boot_partition()?.other();
        self.partition_control.set_boot_partition(target)?;
        Ok(target)
    }

    fn fail_over(&mut self) -> ! {
        match self.switch_partition() {
            Ok(target) => {
                info!("[fw-rom] Failing over to {:?}, resetting", target);
                self.platform.cold_reset()
            }
            Err(err) => self.halt(err),
        }
    }

    fn halt(&mut self, cause: VerifyError) -> ! {
        self.transition(Events::FailoverFault);
        error!("[fw-rom] Failover failed: {}", cause);
        self.platform.halt(VerifyError::Halted.code())
    }
}
