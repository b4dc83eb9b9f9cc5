pub mod events;
pub mod slave;
#[doc(hidden)]
pub mod utils;

use anyhow::{anyhow, Result};
use std::sync::{atomic::AtomicBool, Arc};

use crate::driver::{DigitalOutput, OutputChannel, OutputDriver};

pub use crate::driver::{MemoryOutput, SysfsOutput};
pub use crate::protocol::{RequestSummary, OUTPUT_REGISTER_BASE, OUTPUT_REGISTER_COUNT};
pub use events::OutputEvent;
pub use slave::OutputSlave;

/// Runtime configuration for the device loop.
#[derive(Debug, Clone)]
pub struct SlaveConfig {
    pub port_name: String,
    pub baud_rate: u32,
    pub unit_id: u8,
    /// Serial read timeout, which is also the output sync tick interval.
    pub tick_interval_ms: u64,
    /// Pause after a servicing error to let both sides' buffers stabilize.
    pub error_recovery_delay_ms: u64,
}

/// Observer hooks around the device loop.
pub trait SlaveHook: Send + Sync {
    fn on_request(&self, _port: &str, _summary: &RequestSummary) -> Result<()> {
        Ok(())
    }
    fn on_output_change(&self, _port: &str, _event: &OutputEvent) -> Result<()> {
        Ok(())
    }
    fn on_error(&self, _port: &str, _error: &anyhow::Error) {}
}

/// Builder for configuring and starting the output slave.
pub struct SlaveBuilder {
    port_name: Option<String>,
    baud_rate: u32,
    unit_id: u8,
    tick_interval_ms: u64,
    error_recovery_delay_ms: u64,
    channels: Vec<OutputChannel>,
    hooks: Vec<Arc<dyn SlaveHook>>,
}

impl SlaveBuilder {
    pub fn new(unit_id: u8) -> Self {
        Self {
            port_name: None,
            baud_rate: 9600,
            unit_id,
            tick_interval_ms: 10,
            error_recovery_delay_ms: 300,
            channels: Vec::new(),
            hooks: Vec::new(),
        }
    }

    /// Set the serial port name.
    pub fn with_port(mut self, port_name: &str) -> Self {
        self.port_name = Some(port_name.to_string());
        self
    }

    /// Set the baud rate (framing is fixed at 8N1).
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the tick interval in milliseconds.
    pub fn with_tick_interval(mut self, interval_ms: u64) -> Self {
        self.tick_interval_ms = interval_ms;
        self
    }

    /// Set the error recovery delay in milliseconds.
    pub fn with_error_recovery_delay(mut self, delay_ms: u64) -> Self {
        self.error_recovery_delay_ms = delay_ms;
        self
    }

    /// Bind a holding register address to an output line. Channels are
    /// indexed in the order they are added.
    pub fn add_channel(mut self, register_address: u16, output: Box<dyn DigitalOutput>) -> Self {
        self.channels
            .push(OutputChannel::new(register_address, output));
        self
    }

    /// Add an observer hook (can be called multiple times; hooks run in
    /// the order they were added).
    pub fn add_hook(mut self, hook: Arc<dyn SlaveHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    fn into_parts(self) -> Result<(SlaveConfig, OutputDriver, Vec<Arc<dyn SlaveHook>>)> {
        let port_name = self
            .port_name
            .ok_or_else(|| anyhow!("Port name is required. Use with_port()"))?;
        if self.channels.is_empty() {
            return Err(anyhow!("At least one output channel is required"));
        }

        let config = SlaveConfig {
            port_name,
            baud_rate: self.baud_rate,
            unit_id: self.unit_id,
            tick_interval_ms: self.tick_interval_ms,
            error_recovery_delay_ms: self.error_recovery_delay_ms,
        };

        Ok((config, OutputDriver::new(self.channels), self.hooks))
    }

    /// Run the device loop on the calling thread until `shutdown` is raised.
    pub fn run(self, shutdown: Arc<AtomicBool>) -> Result<()> {
        let (config, mut driver, hooks) = self.into_parts()?;
        crate::core::runtime::run_device_loop(&config, &mut driver, &hooks, None, shutdown)
    }

    /// Start the device loop on a background thread and return a handle
    /// that receives [`OutputEvent`]s.
    pub fn start(self) -> Result<OutputSlave> {
        let (config, mut driver, hooks) = self.into_parts()?;
        let (sender, receiver) = flume::unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_shutdown = shutdown.clone();
        let handle = std::thread::spawn(move || {
            crate::core::runtime::run_device_loop(
                &config,
                &mut driver,
                &hooks,
                Some(sender),
                thread_shutdown,
            )
        });

        Ok(OutputSlave::new(receiver, shutdown, handle))
    }
}

/// Hook that logs requests and output changes at info level.
pub struct LoggingHook;

impl SlaveHook for LoggingHook {
    fn on_request(&self, port: &str, summary: &RequestSummary) -> Result<()> {
        log::info!(
            "Serviced {:?} on {port} (processed={}, wrote={}, responded={})",
            summary.func,
            summary.processed,
            summary.wrote_registers,
            summary.responded
        );
        Ok(())
    }

    fn on_output_change(&self, port: &str, event: &OutputEvent) -> Result<()> {
        log::info!(
            "Output change on {port}: channel {} => {}",
            event.channel + 1,
            if event.asserted { "on" } else { "off" }
        );
        Ok(())
    }
}
