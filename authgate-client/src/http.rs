use crate::api::{AllowlistApi, FeedItem, LogFeed};
use crate::sse::SseDecoder;
use async_trait::async_trait;
use authgate_core::account::{PasswordChange, PasswordHint, SessionInfo};
use authgate_core::config::ServerConfig;
use authgate_core::entry::{ExportReceipt, ImportRecord, ImportReport, PathCheck, ResetTarget};
use authgate_core::{AllowlistEntry, EntryPatch, GateError, LogEntry, NewEntry};
use futures_util::{StreamExt, stream};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const API_PREFIX: &str = "/api/auth/";

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl From<&ServerConfig> for ClientConfig {
    fn from(cfg: &ServerConfig) -> Self {
        Self {
            base_url: cfg.base_url.clone(),
            timeout: cfg.request_timeout(),
        }
    }
}

/// Typed client for the allowlist admin API.
///
/// The session cookie set by `login` is kept in the client's cookie store
/// and sent on every later request, including the push channel.
#[derive(Debug, Clone)]
pub struct AllowlistClient {
    base: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl AllowlistClient {
    pub fn new(config: ClientConfig) -> Result<Self, GateError> {
        let parsed = Url::parse(&config.base_url)
            .map_err(|e| GateError::Config(format!("invalid base_url {}: {e}", config.base_url)))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(GateError::Config(format!(
                "base_url must use http:// or https://, got: {}",
                parsed.scheme()
            )));
        }

        // No overall timeout on the client itself: the push channel is a
        // long-lived body. Plain requests get a per-request timeout instead.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| GateError::Config(e.to_string()))?;

        Ok(Self {
            base: config.base_url.trim_end_matches('/').to_string(),
            timeout: config.timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}{}", self.base, API_PREFIX, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .timeout(self.timeout)
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response, GateError> {
        let resp = builder.send().await.map_err(network)?;
        check_status(resp).await
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GateError> {
        let resp = self.send(builder).await?;
        read_json(resp).await
    }

    /// Like `send`, except a 401 means "wrong password" rather than an
    /// expired session. Used by endpoints that verify a password.
    async fn send_credential_check(&self, builder: RequestBuilder) -> Result<Value, GateError> {
        let resp = builder.send().await.map_err(network)?;
        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            let body = resp.text().await.unwrap_or_default();
            return Err(GateError::Server {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        let resp = check_status(resp).await?;
        read_json(resp).await
    }

    async fn find_by_path(&self, path: &str) -> Result<AllowlistEntry, GateError> {
        self.list()
            .await?
            .into_iter()
            .find(|e| e.path == path)
            .ok_or_else(|| GateError::Decode(format!("entry {path} missing after add")))
    }

    async fn find_by_id(&self, id: i64) -> Result<AllowlistEntry, GateError> {
        self.list()
            .await?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| GateError::Decode(format!("entry {id} missing after update")))
    }
}

#[async_trait]
impl AllowlistApi for AllowlistClient {
    async fn login(&self, password: &str) -> Result<(), GateError> {
        self.send_credential_check(
            self.request(Method::POST, "login")
                .json(&json!({ "password": password })),
        )
        .await?;
        info!(base_url = %self.base, "Logged in");
        Ok(())
    }

    async fn check_session(&self) -> Result<SessionInfo, GateError> {
        self.send_json(self.request(Method::GET, "check-session")).await
    }

    async fn logout(&self) -> Result<(), GateError> {
        self.send(self.request(Method::POST, "logout")).await?;
        info!("Logged out");
        Ok(())
    }

    async fn password_hint(&self) -> Result<PasswordHint, GateError> {
        self.send_json(self.request(Method::GET, "password-hint")).await
    }

    async fn change_password(&self, change: &PasswordChange) -> Result<(), GateError> {
        let body = self
            .send_credential_check(self.request(Method::POST, "change-password").json(change))
            .await?;
        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(GateError::Server {
                status: 200,
                message: error_message(&body.to_string()),
            });
        }
        Ok(())
    }

    async fn list(&self) -> Result<Vec<AllowlistEntry>, GateError> {
        self.send_json(self.request(Method::GET, "list")).await
    }

    async fn add(&self, entry: &NewEntry) -> Result<AllowlistEntry, GateError> {
        authgate_core::validate::validate_path(&entry.api_path)?;
        let body: Value = self
            .send_json(self.request(Method::POST, "add").json(entry))
            .await?;
        debug!(path = %entry.api_path, "Entry added");

        // Some backends echo the created row, others only the path.
        if let Some(created) = embedded_entry(&body) {
            return Ok(created);
        }
        self.find_by_path(&entry.api_path).await
    }

    async fn update(&self, id: i64, patch: &EntryPatch) -> Result<AllowlistEntry, GateError> {
        patch.validate()?;
        let body: Value = self
            .send_json(self.request(Method::PUT, &format!("update/{id}")).json(patch))
            .await?;
        match embedded_entry(&body) {
            Some(updated) => Ok(updated),
            None => self.find_by_id(id).await,
        }
    }

    async fn remove(&self, id: i64) -> Result<(), GateError> {
        self.send(self.request(Method::DELETE, &format!("delete/{id}")))
            .await?;
        Ok(())
    }

    async fn reset_call_count(&self, target: ResetTarget) -> Result<(), GateError> {
        let path = match target {
            ResetTarget::One(id) => format!("reset-call-count/{id}"),
            ResetTarget::All => "reset-all-call-counts".to_string(),
        };
        self.send(self.request(Method::POST, &path)).await?;
        Ok(())
    }

    async fn import_bulk(&self, records: &[ImportRecord]) -> Result<ImportReport, GateError> {
        let report: ImportReport = self
            .send_json(self.request(Method::POST, "import").json(records))
            .await?;
        info!(
            imported = report.imported_count,
            failed = report.error_count,
            "Import finished"
        );
        Ok(report.bounded())
    }

    async fn export_snapshot(&self) -> Result<ExportReceipt, GateError> {
        self.send_json(self.request(Method::GET, "export")).await
    }

    async fn logs(&self, limit: usize) -> Result<Vec<LogEntry>, GateError> {
        let mut logs: Vec<LogEntry> = self
            .send_json(self.request(Method::GET, "logs").query(&[("limit", limit)]))
            .await?;
        logs.truncate(limit);
        Ok(logs)
    }

    async fn clear_logs(&self) -> Result<(), GateError> {
        self.send(self.request(Method::DELETE, "clear-logs")).await?;
        Ok(())
    }

    async fn check_path(&self, path: &str) -> Result<PathCheck, GateError> {
        self.send_json(self.request(Method::GET, "check/get").query(&[("path", path)]))
            .await
    }

    async fn open_log_stream(&self, resume_after: Option<i64>) -> Result<LogFeed, GateError> {
        let mut builder = self
            .http
            .get(self.endpoint("logs/stream"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache");
        if let Some(last_id) = resume_after {
            builder = builder.query(&[("last_id", last_id)]);
        }

        let resp = self.send(builder).await?;
        debug!(resume_after = ?resume_after, "Log stream opened");

        let mut decoder = SseDecoder::new();
        let feed = resp
            .bytes_stream()
            .map(move |chunk| match chunk {
                Ok(bytes) => Ok(decoder.push(&bytes)),
                Err(e) => Err(network(e)),
            })
            .flat_map(|batch| {
                let items: Vec<Result<FeedItem, GateError>> = match batch {
                    Ok(payloads) => payloads.into_iter().map(|p| Ok(FeedItem::decode(p))).collect(),
                    Err(e) => vec![Err(e)],
                };
                stream::iter(items)
            });

        Ok(Box::pin(feed))
    }
}

// ── Response helpers ──────────────────────────────────────────

fn network(e: reqwest::Error) -> GateError {
    GateError::Network(e.to_string())
}

async fn check_status(resp: Response) -> Result<Response, GateError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(GateError::Unauthorized);
    }
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(GateError::Server {
        status: status.as_u16(),
        message: error_message(&body),
    })
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, GateError> {
    let bytes = resp.bytes().await.map_err(network)?;
    serde_json::from_slice(&bytes).map_err(|e| GateError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an error body.
///
/// Looks at `detail` (string, or the first `msg` of a validation list),
/// then `error`, then `message`. Non-JSON bodies yield an empty string.
pub(crate) fn error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return String::new();
    };
    let detail = match value.get("detail") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(items)) => items
            .first()
            .and_then(|i| i.get("msg"))
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    detail
        .or_else(|| value.get("error").and_then(Value::as_str).map(str::to_string))
        .or_else(|| value.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default()
}

/// An entry carried in a mutation response, either under `api` or as the
/// body itself.
fn embedded_entry(body: &Value) -> Option<AllowlistEntry> {
    let candidate = match body.get("api") {
        Some(api) => api.clone(),
        None if body.get("id").is_some() => body.clone(),
        None => return None,
    };
    serde_json::from_value(candidate).ok()
}
