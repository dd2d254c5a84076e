// Licensed under the Apache-2.0 license

use fw_error::VerifyResult;

/// Access to the persisted active-bank selection.
///
/// Implementations must leave any hidden register window closed again before
/// returning, whether the access succeeded or not.
pub trait BootPartitionControl {
    /// Reads the bank the platform will boot from.
    ///
    /// # Returns
    /// * `BootPartition` - The currently selected bank.
    fn get_boot_partition(&mut self) -> VerifyResult<BootPartition>;

    /// Selects the bank the platform will boot from on the next reset.
    ///
    /// # Arguments
    /// * `partition` - The bank to select.
    fn set_boot_partition(&mut self, partition: BootPartition) -> VerifyResult<()>;
}

impl<T: BootPartitionControl + ?Sized> BootPartitionControl for &mut T {
    fn get_boot_partition(&mut self) -> VerifyResult<BootPartition> {
        (**self).get_boot_partition()
    }

    fn set_boot_partition(&mut self, partition: BootPartition) -> VerifyResult<()> {
        (**self).set_boot_partition(partition)
    }
}

/// One of the two redundant firmware banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootPartition {
    Primary = 0,
    Backup = 1,
}

impl BootPartition {
    /// The bank a failover switches to.
    pub const fn other(self) -> Self {
        match self {
            BootPartition::Primary => BootPartition::Backup,
            BootPartition::Backup => BootPartition::Primary,
        }
    }

    /// Value of the boot partition bit for this bank.
    pub const fn bit(self) -> bool {
        matches!(self, BootPartition::Backup)
    }

    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            BootPartition::Backup
        } else {
            BootPartition::Primary
        }
    }
}
