use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

impl ToastLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToastLevel::Info => "info",
            ToastLevel::Success => "success",
            ToastLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    token: u64,
}

impl Toast {
    pub fn token(&self) -> u64 {
        self.token
    }
}

/// Transient feedback with one visible toast at a time.
///
/// Showing a toast replaces the current one. Each toast carries a token;
/// an expiry for an older token is ignored so a replaced toast never hides
/// its successor early. A separate pinned slot holds a message that stays
/// until explicitly cleared.
#[derive(Debug)]
pub struct Notifier {
    duration: Duration,
    current: Option<Toast>,
    pinned: Option<String>,
    next_token: u64,
}

impl Notifier {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            current: None,
            pinned: None,
            next_token: 0,
        }
    }

    /// Show `message`, returning the token and how long until it expires.
    pub fn show(&mut self, message: impl Into<String>, level: ToastLevel) -> (u64, Duration) {
        self.next_token += 1;
        let token = self.next_token;
        self.current = Some(Toast {
            message: message.into(),
            level,
            token,
        });
        (token, self.duration)
    }

    /// Hide the current toast if it is still the one `token` refers to.
    pub fn expire(&mut self, token: u64) -> bool {
        match &self.current {
            Some(t) if t.token == token => {
                self.current = None;
                true
            }
            _ => false,
        }
    }

    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    pub fn pin(&mut self, message: impl Into<String>) {
        self.pinned = Some(message.into());
    }

    pub fn unpin(&mut self) -> bool {
        self.pinned.take().is_some()
    }

    pub fn pinned(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.pinned = None;
    }
}
