use crate::protocol::registers::RegisterBank;

use super::outputs::DigitalOutput;

/// One register-to-line binding.
pub struct OutputChannel {
    pub register_address: u16,
    output: Box<dyn DigitalOutput>,
}

impl OutputChannel {
    pub fn new(register_address: u16, output: Box<dyn DigitalOutput>) -> Self {
        Self {
            register_address,
            output,
        }
    }
}

/// A logical state change observed during a sync pass.
///
/// Transitions exist for observers only; the pin write itself happens every
/// tick whether or not the state changed.
#[derive(Debug, Clone)]
pub struct OutputTransition {
    pub channel: usize,
    pub register_address: u16,
    pub value: u16,
    pub asserted: bool,
}

/// Mirrors the mapped holding registers onto the output lines.
pub struct OutputDriver {
    channels: Vec<OutputChannel>,
    last_logical: Vec<Option<bool>>,
}

impl OutputDriver {
    pub fn new(channels: Vec<OutputChannel>) -> Self {
        let count = channels.len();
        Self {
            channels,
            last_logical: vec![None; count],
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Drive every line from its register: non-zero asserts, zero deasserts.
    ///
    /// Runs unconditionally each tick. No debouncing, no edge detection, no
    /// rate limiting; a line write failure is logged and retried naturally
    /// on the next tick. Returns the channels whose logical state changed.
    pub fn sync(&mut self, bank: &RegisterBank) -> Vec<OutputTransition> {
        let mut transitions = Vec::new();

        for (index, channel) in self.channels.iter_mut().enumerate() {
            let value = match bank.holding(channel.register_address) {
                Ok(value) => value,
                Err(err) => {
                    log::warn!(
                        "Failed to read register {} for {}: {err}",
                        channel.register_address,
                        channel.output.describe()
                    );
                    continue;
                }
            };

            let asserted = value != 0;
            if let Err(err) = channel.output.set(asserted) {
                log::warn!("Failed to drive {}: {err}", channel.output.describe());
                continue;
            }

            if self.last_logical[index] != Some(asserted) {
                self.last_logical[index] = Some(asserted);
                transitions.push(OutputTransition {
                    channel: index,
                    register_address: channel.register_address,
                    value,
                    asserted,
                });
            }
        }

        transitions
    }

    /// Force every line low and reset transition tracking.
    ///
    /// Called once at startup so the boot state (registers zeroed, outputs
    /// deasserted) does not surface as a transition on the first tick.
    pub fn deassert_all(&mut self) {
        for (index, channel) in self.channels.iter_mut().enumerate() {
            if let Err(err) = channel.output.set(false) {
                log::warn!("Failed to deassert {}: {err}", channel.output.describe());
            }
            self.last_logical[index] = Some(false);
        }
    }

    /// Current logical states, in channel order.
    pub fn channel_states(&self) -> Vec<bool> {
        self.channels
            .iter()
            .map(|channel| channel.output.is_asserted())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::outputs::{DigitalOutput, MemoryOutput};
    use anyhow::Result;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    struct CountingOutput {
        asserted: bool,
        writes: Arc<AtomicUsize>,
    }

    impl DigitalOutput for CountingOutput {
        fn set(&mut self, asserted: bool) -> Result<()> {
            self.asserted = asserted;
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn is_asserted(&self) -> bool {
            self.asserted
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn two_channel_driver() -> OutputDriver {
        OutputDriver::new(vec![
            OutputChannel::new(0, Box::new(MemoryOutput::new("ch1"))),
            OutputChannel::new(1, Box::new(MemoryOutput::new("ch2"))),
        ])
    }

    #[test]
    fn test_startup_all_deasserted_without_transitions() {
        let bank = RegisterBank::new();
        let mut driver = two_channel_driver();
        driver.deassert_all();

        let transitions = driver.sync(&bank);
        assert!(transitions.is_empty());
        assert_eq!(driver.channel_states(), vec![false, false]);
    }

    #[test]
    fn test_nonzero_register_asserts_channel() {
        let mut bank = RegisterBank::new();
        let mut driver = two_channel_driver();
        driver.deassert_all();

        bank.set_holding(0, 1).unwrap();
        bank.set_holding(1, 0xFF00).unwrap();

        let transitions = driver.sync(&bank);
        assert_eq!(transitions.len(), 2);
        assert!(transitions.iter().all(|t| t.asserted));
        assert_eq!(driver.channel_states(), vec![true, true]);
    }

    #[test]
    fn test_zero_register_deasserts_channel() {
        let mut bank = RegisterBank::new();
        let mut driver = two_channel_driver();
        driver.deassert_all();

        bank.set_holding(0, 7).unwrap();
        driver.sync(&bank);
        assert_eq!(driver.channel_states(), vec![true, false]);

        bank.set_holding(0, 0).unwrap();
        let transitions = driver.sync(&bank);
        assert_eq!(transitions.len(), 1);
        assert!(!transitions[0].asserted);
        assert_eq!(driver.channel_states(), vec![false, false]);
    }

    #[test]
    fn test_repeated_sync_is_idempotent_but_still_writes_pins() {
        let writes = Arc::new(AtomicUsize::new(0));
        let mut bank = RegisterBank::new();
        let mut driver = OutputDriver::new(vec![OutputChannel::new(
            0,
            Box::new(CountingOutput {
                asserted: false,
                writes: writes.clone(),
            }),
        )]);
        driver.deassert_all();
        let after_boot = writes.load(Ordering::SeqCst);

        bank.set_holding(0, 1).unwrap();
        assert_eq!(driver.sync(&bank).len(), 1);
        assert!(driver.sync(&bank).is_empty());
        assert!(driver.sync(&bank).is_empty());

        // Three sync passes, three pin writes: the line is driven every
        // tick even when nothing changed.
        assert_eq!(writes.load(Ordering::SeqCst), after_boot + 3);
        assert_eq!(driver.channel_states(), vec![true]);
    }

    #[test]
    fn test_unmapped_register_writes_have_no_effect() {
        let mut bank = RegisterBank::new();
        let mut driver = two_channel_driver();
        driver.deassert_all();

        bank.set_holding(5, 1).unwrap();
        assert!(driver.sync(&bank).is_empty());
        assert_eq!(driver.channel_states(), vec![false, false]);
    }
}
