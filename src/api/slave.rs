use anyhow::Result;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use super::events::OutputEvent;

/// Handle to a running output slave with an iterator-like event interface.
pub struct OutputSlave {
    receiver: flume::Receiver<OutputEvent>,
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<Result<()>>>,
}

impl OutputSlave {
    pub(crate) fn new(
        receiver: flume::Receiver<OutputEvent>,
        shutdown: Arc<AtomicBool>,
        handle: std::thread::JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            receiver,
            shutdown,
            handle: Some(handle),
        }
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<OutputEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive an event with timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<OutputEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Get the underlying receiver for advanced usage.
    pub fn receiver(&self) -> &flume::Receiver<OutputEvent> {
        &self.receiver
    }

    /// Raise the shutdown flag and wait for the device loop to exit.
    pub fn stop(mut self) -> Result<()> {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("Device loop thread panicked")),
            }
        } else {
            Ok(())
        }
    }
}

impl Drop for OutputSlave {
    fn drop(&mut self) {
        // A dropped handle still stops the loop; join is best-effort.
        self.shutdown.store(true, Ordering::SeqCst);
    }
}
