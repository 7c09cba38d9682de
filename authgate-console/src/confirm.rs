use tracing::debug;

/// Destructive actions that only run after explicit confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmAction {
    DeleteEntry(i64),
    ClearLogs,
    ResetCallCount(i64),
    ResetAllCallCounts,
    Logout,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonStyle {
    Primary,
    Danger,
}

impl ButtonStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            ButtonStyle::Primary => "btn-primary",
            ButtonStyle::Danger => "btn-danger",
        }
    }
}

impl ConfirmAction {
    pub fn message(&self) -> String {
        match self {
            ConfirmAction::DeleteEntry(id) => {
                format!("Delete API entry #{id}? This cannot be undone.")
            }
            ConfirmAction::ClearLogs => "Clear all operation logs? This cannot be undone.".into(),
            ConfirmAction::ResetCallCount(id) => {
                format!("Reset the call count of API entry #{id} to 0?")
            }
            ConfirmAction::ResetAllCallCounts => "Reset the call count of every API entry to 0?".into(),
            ConfirmAction::Logout => "Log out of the admin console?".into(),
        }
    }

    pub fn button_label(&self) -> &'static str {
        match self {
            ConfirmAction::DeleteEntry(_) => "Delete",
            ConfirmAction::ClearLogs => "Clear",
            ConfirmAction::ResetCallCount(_) | ConfirmAction::ResetAllCallCounts => "Reset",
            ConfirmAction::Logout => "Log out",
        }
    }

    pub fn style(&self) -> ButtonStyle {
        match self {
            ConfirmAction::DeleteEntry(_) | ConfirmAction::ClearLogs => ButtonStyle::Danger,
            _ => ButtonStyle::Primary,
        }
    }
}

/// Holds at most one staged action.
#[derive(Debug, Default)]
pub struct ConfirmGate {
    pending: Option<ConfirmAction>,
}

impl ConfirmGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage `action`, returning whatever it replaced.
    pub fn stage(&mut self, action: ConfirmAction) -> Option<ConfirmAction> {
        let replaced = self.pending.replace(action);
        if let Some(old) = replaced {
            debug!(?old, new = ?action, "Pending confirmation replaced");
        }
        replaced
    }

    /// Take the staged action for execution.
    pub fn confirm(&mut self) -> Option<ConfirmAction> {
        self.pending.take()
    }

    /// Discard the staged action without running it.
    pub fn dismiss(&mut self) -> Option<ConfirmAction> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<ConfirmAction> {
        self.pending
    }
}
