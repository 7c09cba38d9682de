use async_trait::async_trait;
use authgate_core::account::{PasswordChange, PasswordHint, SessionInfo};
use authgate_core::entry::{
    ExportReceipt, ImportRecord, ImportReport, PathCheck, ResetTarget,
};
use authgate_core::{AllowlistEntry, EntryPatch, GateError, LogEntry, NewEntry, StreamMessage};
use futures_util::Stream;
use std::pin::Pin;

/// One decoded push-channel payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedItem {
    Message(StreamMessage),
    /// Payload that is not a heartbeat or log record. The channel stays open.
    Malformed { payload: String, reason: String },
}

impl FeedItem {
    pub fn decode(payload: String) -> Self {
        match StreamMessage::parse(&payload) {
            Ok(msg) => FeedItem::Message(msg),
            Err(e) => FeedItem::Malformed {
                payload,
                reason: e.to_string(),
            },
        }
    }
}

/// Open push channel. Ends when the server closes the connection; an `Err`
/// item means the transport failed.
pub type LogFeed = Pin<Box<dyn Stream<Item = Result<FeedItem, GateError>> + Send>>;

/// Operations the console needs from the allowlist backend.
///
/// Every call carries the session credential. A 401 surfaces as
/// [`GateError::Unauthorized`].
#[async_trait]
pub trait AllowlistApi: Send + Sync {
    async fn login(&self, password: &str) -> Result<(), GateError>;

    async fn check_session(&self) -> Result<SessionInfo, GateError>;

    async fn logout(&self) -> Result<(), GateError>;

    async fn password_hint(&self) -> Result<PasswordHint, GateError>;

    async fn change_password(&self, change: &PasswordChange) -> Result<(), GateError>;

    async fn list(&self) -> Result<Vec<AllowlistEntry>, GateError>;

    async fn add(&self, entry: &NewEntry) -> Result<AllowlistEntry, GateError>;

    async fn update(&self, id: i64, patch: &EntryPatch) -> Result<AllowlistEntry, GateError>;

    async fn remove(&self, id: i64) -> Result<(), GateError>;

    async fn toggle(&self, id: i64, enabled: bool) -> Result<AllowlistEntry, GateError> {
        self.update(id, &EntryPatch::toggle(enabled)).await
    }

    async fn reset_call_count(&self, target: ResetTarget) -> Result<(), GateError>;

    async fn import_bulk(&self, records: &[ImportRecord]) -> Result<ImportReport, GateError>;

    async fn export_snapshot(&self) -> Result<ExportReceipt, GateError>;

    async fn logs(&self, limit: usize) -> Result<Vec<LogEntry>, GateError>;

    async fn clear_logs(&self) -> Result<(), GateError>;

    async fn check_path(&self, path: &str) -> Result<PathCheck, GateError>;

    /// Open the push channel. `resume_after` is sent as a cursor hint; the
    /// caller still deduplicates.
    async fn open_log_stream(&self, resume_after: Option<i64>) -> Result<LogFeed, GateError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_heartbeat_and_garbage() {
        assert_eq!(
            FeedItem::decode(r#"{"type":"heartbeat","last_id":3}"#.into()),
            FeedItem::Message(StreamMessage::Heartbeat { last_id: Some(3) })
        );
        match FeedItem::decode("{{oops".into()) {
            FeedItem::Malformed { payload, .. } => assert_eq!(payload, "{{oops"),
            other => panic!("expected malformed, got {other:?}"),
        }
    }
}
