pub mod registers;
pub mod slave;

pub use registers::{RegisterBank, OUTPUT_REGISTER_BASE, OUTPUT_REGISTER_COUNT};
pub use slave::{process_request, service_once, RequestSummary};
