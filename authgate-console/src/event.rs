use authgate_client::FeedItem;
use authgate_core::account::{PasswordChange, SessionInfo};
use authgate_core::entry::{ExportReceipt, ImportReport, ResetTarget};
use authgate_core::{AllowlistEntry, EntryPatch, GateError, LogEntry, NewEntry};
use std::path::PathBuf;
use std::time::Duration;

/// Everything the controller reacts to.
#[derive(Debug)]
pub enum Event {
    /// Console opened; triggers the session check.
    Start,
    /// Console closing.
    Shutdown,
    SessionChecked(Result<SessionInfo, GateError>),
    VisibilityChanged(bool),
    NetworkChanged(bool),
    PollTick,
    EntriesFetched {
        seq: u64,
        result: Result<Vec<AllowlistEntry>, GateError>,
    },
    LogSnapshotFetched(Result<Vec<LogEntry>, GateError>),
    Channel {
        generation: u64,
        event: ChannelEvent,
    },
    RetryElapsed {
        token: u64,
    },
    ToastElapsed {
        token: u64,
    },
    Intent(Intent),
    MutationFinished {
        kind: MutationKind,
        result: Result<MutationOutcome, GateError>,
    },
}

impl From<Intent> for Event {
    fn from(intent: Intent) -> Self {
        Event::Intent(intent)
    }
}

#[derive(Debug)]
pub enum ChannelEvent {
    Opened,
    Item(FeedItem),
    /// The channel ended. `None` when the server closed it cleanly.
    Closed(Option<GateError>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissReason {
    Escape,
    Backdrop,
    Cancel,
}

/// User actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    OpenAdd,
    OpenEdit(i64),
    OpenImport,
    OpenChangePassword,
    SubmitAdd {
        path: String,
        description: String,
        enabled: bool,
    },
    /// `enabled: None` keeps the entry's current flag.
    SubmitEdit {
        id: i64,
        path: String,
        description: String,
        enabled: Option<bool>,
    },
    SubmitImport(Option<PathBuf>),
    SubmitPasswordChange {
        current: String,
        new: String,
        confirm: String,
    },
    /// Flip the enabled flag of a cached entry.
    Toggle(i64),
    SetEnabled {
        id: i64,
        enabled: bool,
    },
    RequestDelete(i64),
    RequestClearLogs,
    RequestResetCount(i64),
    RequestResetAll,
    RequestLogout,
    Confirm,
    Dismiss(DismissReason),
    Export,
    Reconnect,
    Search(String),
    Refresh,
}

/// Server-side state changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add(NewEntry),
    Update { id: i64, patch: EntryPatch },
    Toggle { id: i64, enabled: bool },
    Delete(i64),
    ResetCallCount(ResetTarget),
    Import(PathBuf),
    Export,
    ClearLogs,
    ChangePassword(PasswordChange),
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Update,
    Toggle,
    Delete,
    ResetCallCount,
    Import,
    Export,
    ClearLogs,
    ChangePassword,
    Logout,
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Add(_) => MutationKind::Add,
            Mutation::Update { .. } => MutationKind::Update,
            Mutation::Toggle { .. } => MutationKind::Toggle,
            Mutation::Delete(_) => MutationKind::Delete,
            Mutation::ResetCallCount(_) => MutationKind::ResetCallCount,
            Mutation::Import(_) => MutationKind::Import,
            Mutation::Export => MutationKind::Export,
            Mutation::ClearLogs => MutationKind::ClearLogs,
            Mutation::ChangePassword(_) => MutationKind::ChangePassword,
            Mutation::Logout => MutationKind::Logout,
        }
    }
}

impl MutationKind {
    /// Shown when the server gives no usable message.
    pub fn fallback_message(&self) -> &'static str {
        match self {
            MutationKind::Add => "Failed to add API",
            MutationKind::Update => "Failed to update API",
            MutationKind::Toggle => "Failed to change API status",
            MutationKind::Delete => "Failed to delete API",
            MutationKind::ResetCallCount => "Failed to reset call count",
            MutationKind::Import => "Import failed",
            MutationKind::Export => "Export failed",
            MutationKind::ClearLogs => "Failed to clear logs",
            MutationKind::ChangePassword => "Failed to change password",
            MutationKind::Logout => "Logout failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Added(AllowlistEntry),
    Updated(AllowlistEntry),
    Deleted(i64),
    CallCountReset(ResetTarget),
    Imported(ImportReport),
    Exported(ExportReceipt),
    LogsCleared,
    PasswordChanged,
    LoggedOut,
}

/// Work the runtime performs on behalf of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    CheckSession,
    FetchEntries { seq: u64 },
    FetchLogSnapshot { limit: usize },
    OpenChannel { generation: u64, resume_after: Option<i64> },
    CloseChannel,
    ScheduleRetry { token: u64, after: Duration },
    CancelRetry,
    ScheduleToastExpiry { token: u64, after: Duration },
    Mutate(Mutation),
    Render,
    /// Session is gone; nothing else runs until it is re-established.
    RedirectToLogin,
    Exit,
}
