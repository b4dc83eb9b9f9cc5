use anyhow::Result;

use rmodbus::server::{context::ModbusContext, storage::ModbusStorageSmall};

/// Base address of the output holding-register block.
pub const OUTPUT_REGISTER_BASE: u16 = 0;
/// Number of holding registers mapped to output channels.
pub const OUTPUT_REGISTER_COUNT: u16 = 2;

/// Register store shared between the protocol endpoint and the output driver.
///
/// The two cells at [`OUTPUT_REGISTER_BASE`] are the functional surface; the
/// rest of the rmodbus storage context exists so that the library can answer
/// arbitrary in-range requests on its own. The driver never reads outside
/// the mapped block.
pub struct RegisterBank {
    storage: ModbusStorageSmall,
}

impl RegisterBank {
    /// Create a bank with every register zeroed.
    pub fn new() -> Self {
        Self {
            storage: ModbusStorageSmall::new(),
        }
    }

    /// Mutable access to the underlying storage context for frame processing.
    pub fn context_mut(&mut self) -> &mut ModbusStorageSmall {
        &mut self.storage
    }

    /// Read a single holding register.
    pub fn holding(&self, address: u16) -> Result<u16> {
        Ok(self.storage.get_holding(address)?)
    }

    /// Write a single holding register (tests and data seeding).
    pub fn set_holding(&mut self, address: u16, value: u16) -> Result<()> {
        self.storage.set_holding(address, value)?;
        Ok(())
    }

    /// Snapshot of the mapped output registers.
    pub fn output_values(&self) -> Result<Vec<u16>> {
        let mut values = Vec::with_capacity(OUTPUT_REGISTER_COUNT as usize);
        for i in 0..OUTPUT_REGISTER_COUNT {
            values.push(self.storage.get_holding(OUTPUT_REGISTER_BASE + i)?);
        }
        Ok(values)
    }
}

impl Default for RegisterBank {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bank_starts_zeroed() {
        let bank = RegisterBank::new();
        assert_eq!(bank.output_values().unwrap(), vec![0, 0]);
    }

    #[test]
    fn test_holding_write_read_roundtrip() {
        let mut bank = RegisterBank::new();
        bank.set_holding(0, 1).unwrap();
        bank.set_holding(1, 0xFF00).unwrap();
        assert_eq!(bank.holding(0).unwrap(), 1);
        assert_eq!(bank.holding(1).unwrap(), 0xFF00);
        assert_eq!(bank.output_values().unwrap(), vec![1, 0xFF00]);
    }

    #[test]
    fn test_unmapped_registers_do_not_leak_into_snapshot() {
        let mut bank = RegisterBank::new();
        bank.set_holding(5, 1234).unwrap();
        assert_eq!(bank.output_values().unwrap(), vec![0, 0]);
    }
}
