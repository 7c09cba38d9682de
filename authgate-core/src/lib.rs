pub mod account;
pub mod config;
pub mod entry;
pub mod error;
pub mod log;
pub mod validate;

mod wire;

pub use config::ConsoleConfig;
pub use entry::{AllowlistEntry, EntryPatch, NewEntry};
pub use error::{GateError, ValidationError};
pub use log::{LogEntry, StreamMessage};
