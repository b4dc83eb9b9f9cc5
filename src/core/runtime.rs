use anyhow::Result;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use crate::{
    api::{events::OutputEvent, utils::open_serial_port, SlaveConfig, SlaveHook},
    driver::OutputDriver,
    protocol::{registers::RegisterBank, slave::service_once},
};

/// Run the device loop until the shutdown flag is raised.
///
/// One logical loop alternates between servicing the protocol endpoint and
/// syncing the outputs; both run on this single thread, so the register
/// bank needs no locking. The serial read timeout doubles as the tick
/// interval: a quiet link still produces a sync pass per tick.
pub fn run_device_loop(
    config: &SlaveConfig,
    driver: &mut OutputDriver,
    hooks: &[Arc<dyn SlaveHook>],
    events: Option<flume::Sender<OutputEvent>>,
    shutdown: Arc<AtomicBool>,
) -> Result<()> {
    log::info!(
        "Starting Modbus RTU output slave on {} (unit_id={}, baud={}, channels={})",
        config.port_name,
        config.unit_id,
        config.baud_rate,
        driver.channel_count()
    );

    let mut port = open_serial_port(
        &config.port_name,
        config.baud_rate,
        Duration::from_millis(config.tick_interval_ms),
    )?;

    let mut bank = RegisterBank::new();

    // Boot state: registers zeroed, both outputs low.
    driver.deassert_all();

    loop {
        if shutdown.load(Ordering::SeqCst) {
            log::info!("Shutdown requested, exiting device loop");
            break;
        }

        match service_once(&mut port, config.unit_id, &mut bank) {
            Ok(Some(summary)) => {
                for hook in hooks {
                    if let Err(err) = hook.on_request(&config.port_name, &summary) {
                        log::warn!("Hook on_request failed: {err}");
                    }
                }
            }
            Ok(None) => {
                // Quiet tick; fall through to the sync pass.
            }
            Err(err) => {
                log::warn!("Error servicing request on {}: {err}", config.port_name);
                for hook in hooks {
                    hook.on_error(&config.port_name, &err);
                }
                std::thread::sleep(Duration::from_millis(config.error_recovery_delay_ms));
            }
        }

        // Output driver: runs every iteration whether or not the registers
        // changed since the last tick.
        for transition in driver.sync(&bank) {
            let event = OutputEvent::from_transition(&transition);
            log::info!(
                "Channel {} {} (register {} = {})",
                event.channel + 1,
                if event.asserted { "asserted" } else { "deasserted" },
                event.register_address,
                event.value
            );

            for hook in hooks {
                if let Err(err) = hook.on_output_change(&config.port_name, &event) {
                    log::warn!("Hook on_output_change failed: {err}");
                }
            }

            if let Some(sender) = &events {
                if sender.send(event).is_err() {
                    log::warn!("Event receiver dropped, stopping device loop");
                    return Ok(());
                }
            }
        }
    }

    Ok(())
}
