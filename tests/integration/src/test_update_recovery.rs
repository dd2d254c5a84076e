// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{Board, BootOutcome};
    use fw_config::update_status::{ComponentState, OverallState};
    use fw_rom_common::{BootPartition, UpdateStatusStore};
    use fw_testing_common::{Terminal, UpdateStatusBuilder};

    const CFG_SIGNATURE: u32 = u32::from_le_bytes(*b"CNFG");
    const FW_SIGNATURE: u32 = u32::from_le_bytes(*b"SG02");

    fn recovery_armed(outcome: &BootOutcome) -> bool {
        match outcome {
            BootOutcome::Booted { recovery_armed, .. } => *recovery_armed,
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_backup_update_while_running_primary() {
        let mut board = Board::new(10);
        board.write_status(
            &UpdateStatusBuilder::new(OverallState::UpdatingBackup)
                .component(CFG_SIGNATURE, ComponentState::Done)
                .component(FW_SIGNATURE, ComponentState::InProgressOnBackup)
                .build(),
        );
        assert!(!recovery_armed(&board.boot(false)));
        assert_eq!(board.scratch().recovery_trigger(), Ok(false));
    }

    #[test]
    fn test_interrupted_update_of_running_bank_arms_recovery() {
        let mut board = Board::new(11);
        board.write_status(
            &UpdateStatusBuilder::new(OverallState::UpdatingPrimary)
                .retry_count(1)
                .component(FW_SIGNATURE, ComponentState::InProgressOnPrimary)
                .build(),
        );
        assert!(recovery_armed(&board.boot(false)));
        assert_eq!(board.partition(), BootPartition::Primary);
        assert!(board.bus.writes.is_empty());
    }

    #[test]
    fn test_corrupt_status_arms_recovery() {
        let mut board = Board::new(12);
        board.write_status(
            &UpdateStatusBuilder::new(OverallState::UpdatingBoth)
                .raw_component(FW_SIGNATURE, 0x00)
                .build(),
        );
        assert!(recovery_armed(&board.boot(false)));
    }

    #[test]
    fn test_store_reports_update_progress() {
        let board = Board::new(13);
        board.write_status(
            &UpdateStatusBuilder::new(OverallState::UpdatingBackup)
                .retry_count(2)
                .component(CFG_SIGNATURE, ComponentState::Done)
                .component(FW_SIGNATURE, ComponentState::InProgressOnBackup)
                .build(),
        );
        let store = UpdateStatusStore::locate(
            &board.flash,
            &board.locator,
            board.config.update_status_signature,
            BootPartition::Primary,
        );
        assert_eq!(store.overall_state(), Ok(OverallState::UpdatingBackup));
        assert_eq!(store.retry_count(), Ok(2));
        assert_eq!(
            store.component(CFG_SIGNATURE).unwrap().map(|c| c.state),
            Some(ComponentState::Done)
        );
        let in_flight = store.first_in_flight_component().unwrap().unwrap();
        assert_eq!(in_flight.signature, FW_SIGNATURE);
    }

    #[test]
    fn test_interrupted_primary_update_with_hangs_moves_to_backup() {
        let mut board = Board::new(14);
        board.write_status(
            &UpdateStatusBuilder::new(OverallState::UpdatingPrimary)
                .component(FW_SIGNATURE, ComponentState::InProgressOnPrimary)
                .build(),
        );
        board.config.watchdog_threshold = 2;

        // Primary is being rewritten while it is the boot bank; each boot
        // arms recovery and the second timeout moves to Backup.
        assert!(recovery_armed(&board.boot(true)));
        assert_eq!(board.boot(true), BootOutcome::Terminal(Terminal::ColdReset));
        assert_eq!(board.partition(), BootPartition::Backup);

        // The update still targets Primary, which is no longer the boot bank.
        let outcome = board.boot(false);
        assert!(matches!(
            outcome,
            BootOutcome::Booted {
                partition: BootPartition::Backup,
                ..
            }
        ));
    }
}
