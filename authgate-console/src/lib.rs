pub mod confirm;
pub mod event;
pub mod log_stream;
pub mod modal;
pub mod poller;
pub mod runtime;
pub mod state;
pub mod table;
pub mod toast;

pub use event::{ChannelEvent, DismissReason, Effect, Event, Intent, Mutation, MutationKind, MutationOutcome};
pub use log_stream::{LinkState, LogStream};
pub use runtime::Runtime;
pub use state::Console;
pub use table::TableView;
