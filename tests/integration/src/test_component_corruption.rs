// Licensed under the Apache-2.0 license

#[cfg(test)]
mod test {
    use crate::test::{Board, BootOutcome, STAGE2_SIGNATURE};
    use fw_rom_common::BootPartition;
    use fw_testing_common::{ComponentCorruptor, Terminal};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_corrupted_primary_is_rejected() {
        let mut rng = StdRng::seed_from_u64(0x5EED);
        for round in 0..16 {
            let mut board = Board::new(100 + round);
            let hit = ComponentCorruptor::new(&board.flash, &board.locator)
                .corrupt(&mut rng, STAGE2_SIGNATURE, BootPartition::Primary)
                .unwrap();
            match board.boot(false) {
                BootOutcome::Rejected { partition, .. } => {
                    assert_eq!(partition, BootPartition::Primary)
                }
                other => panic!("corruption at {:#x} not detected: {:?}", hit.offset, other),
            }
        }
    }

    #[test]
    fn test_repeated_hangs_recover_to_backup() {
        let mut board = Board::new(200);
        let mut rng = StdRng::seed_from_u64(1);
        ComponentCorruptor::new(&board.flash, &board.locator)
            .block_size(0x100)
            .corrupt(&mut rng, STAGE2_SIGNATURE, BootPartition::Primary)
            .unwrap();

        // The rejected stage hangs, so every following boot sees a watchdog timeout.
        assert!(matches!(board.boot(false), BootOutcome::Rejected { .. }));
        assert!(matches!(board.boot(true), BootOutcome::Rejected { .. }));
        assert!(matches!(board.boot(true), BootOutcome::Rejected { .. }));
        assert_eq!(board.boot(true), BootOutcome::Terminal(Terminal::ColdReset));
        assert_eq!(board.partition(), BootPartition::Backup);

        assert!(matches!(
            board.boot(false),
            BootOutcome::Booted {
                partition: BootPartition::Backup,
                recovery_armed: true,
                ..
            }
        ));
    }
}
