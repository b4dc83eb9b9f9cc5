use serde::{Deserialize, Serialize};

use crate::driver::OutputTransition;

/// A serializable record of one output channel changing logical state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputEvent {
    pub channel: usize,
    pub register_address: u16,
    pub value: u16,
    pub asserted: bool,
    pub timestamp: String,
}

impl OutputEvent {
    pub fn from_transition(transition: &OutputTransition) -> Self {
        Self {
            channel: transition.channel,
            register_address: transition.register_address,
            value: transition.value,
            asserted: transition.asserted,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
