use anyhow::{anyhow, Result};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use clap::{parser::ValueSource, ArgMatches};

use crate::{
    api::{OutputEvent, SlaveBuilder, SlaveHook},
    config::DeviceBootConfig,
    driver::{DigitalOutput, MemoryOutput, SysfsOutput},
    utils::ports::enumerate_ports,
};

/// Entry point after argument parsing.
pub fn dispatch(matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("list-ports") {
        return handle_list_ports(matches.get_flag("json"));
    }
    run_device(matches)
}

fn handle_list_ports(json: bool) -> Result<()> {
    let ports = enumerate_ports();
    if json {
        println!("{}", serde_json::to_string(&ports)?);
    } else if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for (name, port_type) in ports {
            println!("{name}\t{port_type}");
        }
    }
    Ok(())
}

/// Hook that prints output state changes as JSON lines (for `--json`).
struct JsonlHook;

impl SlaveHook for JsonlHook {
    fn on_output_change(&self, _port: &str, event: &OutputEvent) -> Result<()> {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}

fn resolve_config(matches: &ArgMatches) -> Result<DeviceBootConfig> {
    let mut config = if let Some(path) = matches.get_one::<String>("config") {
        DeviceBootConfig::from_file(path)?
    } else {
        let port = matches
            .get_one::<String>("port")
            .ok_or_else(|| anyhow!("Either --port or --config is required"))?;
        DeviceBootConfig::for_port(port)
    };

    // Explicit CLI arguments override the file; clap-supplied defaults do not.
    if let Some(port) = matches.get_one::<String>("port") {
        config.port_name = port.clone();
    }
    if matches.value_source("baud-rate") == Some(ValueSource::CommandLine) {
        config.baud_rate = *matches.get_one::<u32>("baud-rate").unwrap();
    }
    if matches.value_source("unit-id") == Some(ValueSource::CommandLine) {
        config.unit_id = *matches.get_one::<u8>("unit-id").unwrap();
    }

    if let Some(paths) = matches.get_many::<String>("gpio") {
        for (channel, path) in config.channels.iter_mut().zip(paths) {
            channel.gpio_value_path = Some(path.clone());
        }
    }

    Ok(config)
}

fn run_device(matches: &ArgMatches) -> Result<()> {
    let config = resolve_config(matches)?;
    let dry_run = matches.get_flag("dry-run");

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = shutdown.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })?;

    let mut builder = SlaveBuilder::new(config.unit_id)
        .with_port(&config.port_name)
        .with_baud_rate(config.baud_rate)
        .with_tick_interval(config.timing.tick_interval_ms)
        .with_error_recovery_delay(config.timing.error_recovery_delay_ms);

    for (index, channel) in config.channels.iter().enumerate() {
        let output: Box<dyn DigitalOutput> = match &channel.gpio_value_path {
            Some(path) if !dry_run => Box::new(SysfsOutput::new(path)),
            _ => {
                log::info!("Channel {} running on in-memory output", index + 1);
                Box::new(MemoryOutput::new(&format!("ch{}", index + 1)))
            }
        };
        builder = builder.add_channel(channel.register_address, output);
    }

    if matches.get_flag("json") {
        builder = builder.add_hook(Arc::new(JsonlHook));
    }

    builder.run(shutdown)
}
