// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{Board, BootOutcome};
    use fw_rom_common::{BootPartition, VerifyError};
    use fw_testing_common::Terminal;

    fn booted_partition(outcome: &BootOutcome) -> Option<BootPartition> {
        match outcome {
            BootOutcome::Booted { partition, .. } => Some(*partition),
            _ => None,
        }
    }

    #[test]
    fn test_clean_boot_loads_stage2() {
        let mut board = Board::new(1);
        let outcome = board.boot(false);

        let (partition, recovery_armed, digest, sub_images) = match outcome {
            BootOutcome::Booted {
                partition,
                recovery_armed,
                digest,
                sub_images,
            } => (partition, recovery_armed, digest, sub_images),
            other => panic!("unexpected outcome {:?}", other),
        };
        assert_eq!(partition, BootPartition::Primary);
        assert!(!recovery_armed);
        assert_eq!(
            hex::encode(digest.as_bytes()),
            hex::encode(board.stage2.digest.as_bytes())
        );
        assert_eq!(sub_images.len(), 3);
        assert_eq!(sub_images[0].offset, board.stage2.payload_offset);
        assert_eq!(
            sub_images.iter().map(|s| s.size).collect::<Vec<_>>(),
            vec![0x123, 0x80, 0x41]
        );
        assert!(sub_images.iter().all(|s| s.offset % 4 == 0));
    }

    #[test]
    fn test_third_watchdog_timeout_fails_over() {
        let mut board = Board::new(2);

        assert_eq!(
            booted_partition(&board.boot(true)),
            Some(BootPartition::Primary)
        );
        assert_eq!(
            booted_partition(&board.boot(true)),
            Some(BootPartition::Primary)
        );
        assert_eq!(board.scratch().failed_boot_count(), Ok(2));

        assert_eq!(board.boot(true), BootOutcome::Terminal(Terminal::ColdReset));
        assert_eq!(board.resets, 1);
        assert_eq!(board.partition(), BootPartition::Backup);
        assert_eq!(board.scratch().failed_boot_count(), Ok(0));
        assert_eq!(board.bus.writes.len(), 1);

        let outcome = board.boot(false);
        assert!(matches!(
            outcome,
            BootOutcome::Booted {
                partition: BootPartition::Backup,
                recovery_armed: true,
                ..
            }
        ));
    }

    #[test]
    fn test_threshold_one_fails_over_immediately() {
        let mut board = Board::new(3);
        board.config.watchdog_threshold = 1;

        assert_eq!(board.boot(true), BootOutcome::Terminal(Terminal::ColdReset));
        assert_eq!(board.bus.writes.len(), 1);
        assert_eq!(board.partition(), BootPartition::Backup);

        // A second failure on Backup goes back to Primary.
        assert_eq!(board.boot(true), BootOutcome::Terminal(Terminal::ColdReset));
        assert_eq!(board.partition(), BootPartition::Primary);
        assert_eq!(board.resets, 2);
    }

    #[test]
    fn test_acknowledged_boots_do_not_accumulate() {
        let mut board = Board::new(4);
        for _ in 0..5 {
            assert_eq!(
                booted_partition(&board.boot(true)),
                Some(BootPartition::Primary)
            );
            assert_eq!(board.scratch().failed_boot_count(), Ok(1));
            board.scratch().reset_failed_boot_count().unwrap();
        }
        assert!(board.bus.writes.is_empty());
    }

    #[test]
    fn test_broken_bus_fails_boot_checks() {
        let mut board = Board::new(5);
        board.bus.fail_read = true;
        assert_eq!(board.boot(false), BootOutcome::Failed(VerifyError::DeviceError));
    }

    #[test]
    fn test_failover_write_fault_halts() {
        let mut board = Board::new(6);
        board.config.watchdog_threshold = 1;
        board.bus.fail_write = true;
        assert_eq!(
            board.boot(true),
            BootOutcome::Terminal(Terminal::Halt(VerifyError::Halted.code()))
        );
        assert_eq!(board.partition(), BootPartition::Primary);
        assert_eq!(board.resets, 0);
    }
}
