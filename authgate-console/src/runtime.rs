//! Tokio driver: feeds events into [`Console::handle`] and carries out the
//! effects it returns.

use crate::event::{ChannelEvent, Effect, Event, Mutation, MutationOutcome};
use crate::state::Console;
use authgate_client::AllowlistApi;
use authgate_core::validate::parse_import_records;
use authgate_core::{ConsoleConfig, GateError};
use futures_util::StreamExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval, sleep};
use tracing::{debug, info, warn};

/// Consecutive re-logins allowed before giving up on an expiring session.
const MAX_RELOGINS: u32 = 3;

const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

enum Flow {
    Continue,
    Exit,
}

pub struct Runtime {
    api: Arc<dyn AllowlistApi>,
    console: Console,
    tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
    poll_interval: Duration,
    password: Option<String>,
    relogins: u32,
    channel: Option<JoinHandle<()>>,
    retry: Option<JoinHandle<()>>,
}

impl Runtime {
    /// Build a driver. `Event::Start` is queued immediately.
    pub fn new(api: Arc<dyn AllowlistApi>, config: &ConsoleConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(Event::Start);
        Self {
            api,
            console: Console::new(config),
            tx,
            rx,
            poll_interval: config.console.poll_interval().max(MIN_POLL_INTERVAL),
            password: config.server.password.clone(),
            relogins: 0,
            channel: None,
            retry: None,
        }
    }

    /// Sender for input sources (keyboard, signals).
    pub fn events(&self) -> mpsc::UnboundedSender<Event> {
        self.tx.clone()
    }

    pub fn console(&self) -> &Console {
        &self.console
    }

    /// Run until the console exits. `render` is called whenever the view
    /// changed.
    ///
    /// Returns `Err(GateError::Unauthorized)` when the session is gone and
    /// cannot be re-established with the configured password.
    pub async fn run<R: FnMut(&Console)>(mut self, mut render: R) -> Result<(), GateError> {
        let result = self.event_loop(&mut render).await;
        self.abort_channel();
        self.abort_retry();
        result
    }

    async fn event_loop<R: FnMut(&Console)>(&mut self, render: &mut R) -> Result<(), GateError> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the initial fetch already
        // follows the session check.
        ticker.tick().await;

        loop {
            let event = tokio::select! {
                Some(event) = self.rx.recv() => event,
                _ = ticker.tick() => Event::PollTick,
            };

            if let Event::SessionChecked(Ok(info)) = &event {
                if info.logged_in {
                    self.relogins = 0;
                }
            }

            for effect in self.console.handle(event) {
                if let Flow::Exit = self.execute(effect, render).await? {
                    info!("Console closed");
                    return Ok(());
                }
            }
        }
    }

    async fn execute<R: FnMut(&Console)>(&mut self, effect: Effect, render: &mut R) -> Result<Flow, GateError> {
        match effect {
            Effect::CheckSession => {
                self.spawn_call(|api| async move { Event::SessionChecked(api.check_session().await) });
            }
            Effect::FetchEntries { seq } => {
                self.spawn_call(move |api| async move {
                    Event::EntriesFetched {
                        seq,
                        result: api.list().await,
                    }
                });
            }
            Effect::FetchLogSnapshot { limit } => {
                self.spawn_call(move |api| async move { Event::LogSnapshotFetched(api.logs(limit).await) });
            }
            Effect::OpenChannel {
                generation,
                resume_after,
            } => {
                self.abort_channel();
                let api = Arc::clone(&self.api);
                let tx = self.tx.clone();
                self.channel = Some(tokio::spawn(pump_channel(api, tx, generation, resume_after)));
            }
            Effect::CloseChannel => self.abort_channel(),
            Effect::ScheduleRetry { token, after } => {
                self.abort_retry();
                let tx = self.tx.clone();
                self.retry = Some(tokio::spawn(async move {
                    sleep(after).await;
                    let _ = tx.send(Event::RetryElapsed { token });
                }));
            }
            Effect::CancelRetry => self.abort_retry(),
            Effect::ScheduleToastExpiry { token, after } => {
                let tx = self.tx.clone();
                tokio::spawn(async move {
                    sleep(after).await;
                    let _ = tx.send(Event::ToastElapsed { token });
                });
            }
            Effect::Mutate(mutation) => {
                let kind = mutation.kind();
                debug!(?kind, "Dispatching mutation");
                self.spawn_call(move |api| async move {
                    Event::MutationFinished {
                        kind,
                        result: perform(api.as_ref(), mutation).await,
                    }
                });
            }
            Effect::Render => render(&self.console),
            Effect::RedirectToLogin => self.relogin().await?,
            Effect::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    /// Stand-in for the login page: sign in again with the configured
    /// password and restart from the session check.
    async fn relogin(&mut self) -> Result<(), GateError> {
        self.abort_channel();
        self.abort_retry();

        let Some(password) = self.password.clone() else {
            warn!("Session expired and no password is configured");
            return Err(GateError::Unauthorized);
        };
        if self.relogins >= MAX_RELOGINS {
            warn!(attempts = self.relogins, "Giving up on re-authentication");
            return Err(GateError::Unauthorized);
        }
        self.relogins += 1;
        info!(attempt = self.relogins, "Re-authenticating");
        self.api.login(&password).await?;
        let _ = self.tx.send(Event::Start);
        Ok(())
    }

    fn spawn_call<F, Fut>(&self, call: F)
    where
        F: FnOnce(Arc<dyn AllowlistApi>) -> Fut,
        Fut: Future<Output = Event> + Send + 'static,
    {
        let fut = call(Arc::clone(&self.api));
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn abort_channel(&mut self) {
        if let Some(handle) = self.channel.take() {
            handle.abort();
        }
    }

    fn abort_retry(&mut self) {
        if let Some(handle) = self.retry.take() {
            handle.abort();
        }
    }
}

/// Forward one push-channel generation into the event queue.
async fn pump_channel(
    api: Arc<dyn AllowlistApi>,
    tx: mpsc::UnboundedSender<Event>,
    generation: u64,
    resume_after: Option<i64>,
) {
    let send = |event: ChannelEvent| tx.send(Event::Channel { generation, event }).is_ok();

    let mut feed = match api.open_log_stream(resume_after).await {
        Ok(feed) => feed,
        Err(e) => {
            send(ChannelEvent::Closed(Some(e)));
            return;
        }
    };
    if !send(ChannelEvent::Opened) {
        return;
    }

    while let Some(item) = feed.next().await {
        match item {
            Ok(item) => {
                if !send(ChannelEvent::Item(item)) {
                    return;
                }
            }
            Err(e) => {
                send(ChannelEvent::Closed(Some(e)));
                return;
            }
        }
    }
    send(ChannelEvent::Closed(None));
}

async fn perform(api: &dyn AllowlistApi, mutation: Mutation) -> Result<MutationOutcome, GateError> {
    match mutation {
        Mutation::Add(entry) => api.add(&entry).await.map(MutationOutcome::Added),
        Mutation::Update { id, patch } => api.update(id, &patch).await.map(MutationOutcome::Updated),
        Mutation::Toggle { id, enabled } => api.toggle(id, enabled).await.map(MutationOutcome::Updated),
        Mutation::Delete(id) => {
            api.remove(id).await?;
            Ok(MutationOutcome::Deleted(id))
        }
        Mutation::ResetCallCount(target) => {
            api.reset_call_count(target).await?;
            Ok(MutationOutcome::CallCountReset(target))
        }
        Mutation::Import(path) => {
            let contents = tokio::fs::read_to_string(&path).await?;
            let records = parse_import_records(&contents)?;
            info!(path = %path.display(), records = records.len(), "Importing");
            api.import_bulk(&records).await.map(MutationOutcome::Imported)
        }
        Mutation::Export => api.export_snapshot().await.map(MutationOutcome::Exported),
        Mutation::ClearLogs => {
            api.clear_logs().await?;
            Ok(MutationOutcome::LogsCleared)
        }
        Mutation::ChangePassword(change) => {
            api.change_password(&change).await?;
            Ok(MutationOutcome::PasswordChanged)
        }
        Mutation::Logout => {
            api.logout().await?;
            Ok(MutationOutcome::LoggedOut)
        }
    }
}
