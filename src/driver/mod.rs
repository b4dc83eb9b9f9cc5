pub mod outputs;
pub mod sync;

pub use outputs::{DigitalOutput, MemoryOutput, SysfsOutput};
pub use sync::{OutputChannel, OutputDriver, OutputTransition};
