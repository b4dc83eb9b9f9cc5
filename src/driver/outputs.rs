use anyhow::{Context, Result};
use std::path::PathBuf;

/// A binary output line driven by the register sync loop.
///
/// Implementations must tolerate being written the same state every tick;
/// the driver never deduplicates pin writes.
pub trait DigitalOutput: Send {
    /// Drive the line to the requested logical state.
    fn set(&mut self, asserted: bool) -> Result<()>;

    /// Last state written to the line.
    fn is_asserted(&self) -> bool;

    /// Target description for logs ("gpio:/sys/...", "mem:ch1").
    fn describe(&self) -> String;
}

/// Output backed by a sysfs GPIO `value` attribute.
///
/// The line must already be exported and configured as an output; this
/// mirrors how the firmware expects its pins pre-assigned. Writes are "1"
/// or "0", one per sync.
pub struct SysfsOutput {
    value_path: PathBuf,
    asserted: bool,
}

impl SysfsOutput {
    pub fn new(value_path: impl Into<PathBuf>) -> Self {
        Self {
            value_path: value_path.into(),
            asserted: false,
        }
    }
}

impl DigitalOutput for SysfsOutput {
    fn set(&mut self, asserted: bool) -> Result<()> {
        let level = if asserted { "1" } else { "0" };
        std::fs::write(&self.value_path, level)
            .with_context(|| format!("Failed to write {} to {}", level, self.value_path.display()))?;
        self.asserted = asserted;
        Ok(())
    }

    fn is_asserted(&self) -> bool {
        self.asserted
    }

    fn describe(&self) -> String {
        format!("gpio:{}", self.value_path.display())
    }
}

/// In-memory output for tests and dry-run operation.
pub struct MemoryOutput {
    label: String,
    asserted: bool,
    write_count: usize,
}

impl MemoryOutput {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            asserted: false,
            write_count: 0,
        }
    }

    /// Total number of pin writes, including repeats of the same state.
    pub fn write_count(&self) -> usize {
        self.write_count
    }
}

impl DigitalOutput for MemoryOutput {
    fn set(&mut self, asserted: bool) -> Result<()> {
        self.asserted = asserted;
        self.write_count += 1;
        Ok(())
    }

    fn is_asserted(&self) -> bool {
        self.asserted
    }

    fn describe(&self) -> String {
        format!("mem:{}", self.label)
    }
}
