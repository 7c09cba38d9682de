use crate::confirm::ConfirmAction;
use authgate_core::AllowlistEntry;

/// Prefilled fields of the edit dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub id: i64,
    pub path: String,
    pub description: String,
    pub enabled: bool,
}

impl From<&AllowlistEntry> for EditDraft {
    fn from(entry: &AllowlistEntry) -> Self {
        Self {
            id: entry.id,
            path: entry.path.clone(),
            description: entry.description.clone(),
            enabled: entry.enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modal {
    Add,
    Edit(EditDraft),
    Import,
    ChangePassword,
    Confirm(ConfirmAction),
}

/// Field that receives focus when a dialog opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    PathField,
    FileField,
    CurrentPasswordField,
    ConfirmButton,
}

impl Modal {
    pub fn focus(&self) -> Focus {
        match self {
            Modal::Add | Modal::Edit(_) => Focus::PathField,
            Modal::Import => Focus::FileField,
            Modal::ChangePassword => Focus::CurrentPasswordField,
            Modal::Confirm(_) => Focus::ConfirmButton,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Modal::Add => "Add API",
            Modal::Edit(_) => "Edit API",
            Modal::Import => "Import configuration",
            Modal::ChangePassword => "Change password",
            Modal::Confirm(_) => "Confirm",
        }
    }
}

/// One active dialog at a time.
#[derive(Debug, Default)]
pub struct ModalController {
    active: Option<Modal>,
}

impl ModalController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `modal`, replacing any dialog already shown.
    pub fn open(&mut self, modal: Modal) -> Focus {
        let focus = modal.focus();
        self.active = Some(modal);
        focus
    }

    pub fn close(&mut self) -> Option<Modal> {
        self.active.take()
    }

    pub fn active(&self) -> Option<&Modal> {
        self.active.as_ref()
    }

    pub fn focus(&self) -> Option<Focus> {
        self.active.as_ref().map(Modal::focus)
    }

    pub fn is_add(&self) -> bool {
        matches!(self.active, Some(Modal::Add))
    }

    pub fn is_editing(&self, id: i64) -> bool {
        matches!(&self.active, Some(Modal::Edit(d)) if d.id == id)
    }

    pub fn is_import(&self) -> bool {
        matches!(self.active, Some(Modal::Import))
    }

    pub fn is_change_password(&self) -> bool {
        matches!(self.active, Some(Modal::ChangePassword))
    }

    pub fn is_confirm(&self) -> bool {
        matches!(self.active, Some(Modal::Confirm(_)))
    }
}
