use crate::confirm::{ConfirmAction, ConfirmGate};
use crate::event::{
    ChannelEvent, Effect, Event, Intent, Mutation, MutationKind, MutationOutcome,
};
use crate::log_stream::{LinkState, LogStream, StreamEffect, payload_preview};
use crate::modal::{EditDraft, Modal, ModalController};
use crate::poller::PollingRefresher;
use crate::table::{self, TableView};
use crate::toast::{Notifier, ToastLevel};
use authgate_client::FeedItem;
use authgate_core::account::{PasswordChange, SessionInfo};
use authgate_core::entry::ResetTarget;
use authgate_core::validate::validate_import_file;
use authgate_core::{AllowlistEntry, ConsoleConfig, EntryPatch, GateError, LogEntry, NewEntry};
use tracing::{debug, info, warn};

/// The whole console state and its event handler.
///
/// `handle` never performs I/O. It updates state and returns the effects
/// the runtime must carry out; their results come back as further events.
#[derive(Debug)]
pub struct Console {
    authenticated: bool,
    user: Option<String>,
    visible: bool,
    online: bool,
    snapshot_limit: usize,

    entries: Vec<AllowlistEntry>,
    loaded: bool,
    filter: String,
    table: TableView,

    poller: PollingRefresher,
    logs: LogStream,
    modals: ModalController,
    confirm: ConfirmGate,
    notifier: Notifier,
}

impl Console {
    pub fn new(config: &ConsoleConfig) -> Self {
        Self {
            authenticated: false,
            user: None,
            visible: true,
            online: true,
            snapshot_limit: config.console.log_snapshot_limit,
            entries: Vec::new(),
            loaded: false,
            filter: String::new(),
            table: TableView::default(),
            poller: PollingRefresher::new(config.console.poll_interval()),
            logs: LogStream::new(&config.stream),
            modals: ModalController::new(),
            confirm: ConfirmGate::new(),
            notifier: Notifier::new(config.console.toast_duration()),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn entries(&self) -> &[AllowlistEntry] {
        &self.entries
    }

    pub fn entry(&self, id: i64) -> Option<&AllowlistEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn table(&self) -> &TableView {
        &self.table
    }

    pub fn logs(&self) -> &LogStream {
        &self.logs
    }

    pub fn link_state(&self) -> LinkState {
        self.logs.state()
    }

    pub fn modals(&self) -> &ModalController {
        &self.modals
    }

    pub fn pending_confirm(&self) -> Option<ConfirmAction> {
        self.confirm.pending()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn poller(&self) -> &PollingRefresher {
        &self.poller
    }

    // ── Dispatch ──────────────────────────────────────────────

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        let mut fx = Effects::default();
        match event {
            Event::Start => fx.push(Effect::CheckSession),
            Event::Shutdown => {
                let stream = self.logs.deactivate();
                self.apply_stream(stream, &mut fx);
                fx.push(Effect::Exit);
            }
            Event::SessionChecked(result) => self.on_session(result, &mut fx),
            Event::VisibilityChanged(visible) => self.on_visibility(visible, &mut fx),
            Event::NetworkChanged(online) => {
                self.online = online;
                let stream = self.logs.set_online(online);
                self.apply_stream(stream, &mut fx);
            }
            Event::PollTick => {
                if self.poller.should_poll(self.visible, self.authenticated) {
                    self.fetch_entries(&mut fx);
                }
            }
            Event::EntriesFetched { seq, result } => self.on_entries(seq, result, &mut fx),
            Event::LogSnapshotFetched(result) => self.on_snapshot(result, &mut fx),
            Event::Channel { generation, event } => self.on_channel(generation, event, &mut fx),
            Event::RetryElapsed { token } => {
                let stream = self.logs.on_retry_elapsed(token);
                self.apply_stream(stream, &mut fx);
            }
            Event::ToastElapsed { token } => {
                if self.notifier.expire(token) {
                    fx.render();
                }
            }
            Event::Intent(intent) => {
                if self.authenticated {
                    self.on_intent(intent, &mut fx);
                } else {
                    debug!(?intent, "Ignoring intent without a session");
                }
            }
            Event::MutationFinished { kind, result } => match result {
                Ok(outcome) => self.on_mutation_ok(outcome, &mut fx),
                Err(err) => self.on_mutation_err(kind, err, &mut fx),
            },
        }
        fx.finish()
    }

    // ── Session / visibility ──────────────────────────────────

    fn on_session(&mut self, result: Result<SessionInfo, GateError>, fx: &mut Effects) {
        match result {
            Ok(info) if info.logged_in => {
                info!(user = ?info.user, "Session active");
                self.authenticated = true;
                self.user = info.user;
                self.fetch_entries(fx);
                fx.push(Effect::FetchLogSnapshot {
                    limit: self.snapshot_limit,
                });
                fx.render();
            }
            Ok(_) | Err(GateError::Unauthorized) => self.redirect(fx),
            Err(err) => {
                warn!(error = %err, "Session check failed");
                self.toast(err.user_message("Failed to check session"), ToastLevel::Error, fx);
            }
        }
    }

    fn on_visibility(&mut self, visible: bool, fx: &mut Effects) {
        let was_visible = self.visible;
        self.visible = visible;
        let stream = self.logs.set_visible(visible);
        self.apply_stream(stream, fx);
        if visible && !was_visible && self.authenticated {
            self.fetch_entries(fx);
        }
    }

    /// A request came back 401. Only the first one after sign-in redirects;
    /// later 401s belong to the same expiry.
    fn expire_session(&mut self, fx: &mut Effects) {
        if !self.authenticated {
            debug!("Ignoring 401 for an already expired session");
            return;
        }
        warn!("Session expired, redirecting to login");
        self.redirect(fx);
    }

    /// Session lost: drop all local interaction state and stop every
    /// background activity.
    fn redirect(&mut self, fx: &mut Effects) {
        self.authenticated = false;
        self.modals.close();
        self.confirm.dismiss();
        self.notifier.clear();
        self.poller.supersede();
        let stream = self.logs.deactivate();
        for effect in stream {
            match effect {
                StreamEffect::Close => fx.push(Effect::CloseChannel),
                StreamEffect::CancelRetry => fx.push(Effect::CancelRetry),
                _ => {}
            }
        }
        fx.push(Effect::RedirectToLogin);
    }

    // ── Allowlist cache ───────────────────────────────────────

    fn fetch_entries(&mut self, fx: &mut Effects) {
        let seq = self.poller.issue();
        fx.push(Effect::FetchEntries { seq });
    }

    fn on_entries(&mut self, seq: u64, result: Result<Vec<AllowlistEntry>, GateError>, fx: &mut Effects) {
        match result {
            Ok(entries) => {
                if !self.authenticated || !self.poller.accept(seq) {
                    return;
                }
                self.loaded = true;
                if entries != self.entries {
                    debug!(seq, count = entries.len(), "Allowlist changed");
                    self.entries = entries;
                    self.rebuild_table();
                    fx.render();
                }
            }
            Err(_) if self.poller.is_stale(seq) => {}
            Err(GateError::Unauthorized) => self.expire_session(fx),
            Err(err) => {
                warn!(seq, error = %err, "Allowlist fetch failed");
                // Background poll failures stay in the log once data is shown.
                if !self.loaded {
                    self.toast(err.user_message("Failed to load API list"), ToastLevel::Error, fx);
                }
            }
        }
    }

    fn rebuild_table(&mut self) {
        self.table = table::render_filtered(&self.entries, &self.filter);
    }

    /// Apply a confirmed server change locally, then refetch.
    fn patch_entries(&mut self, fx: &mut Effects, patch: impl FnOnce(&mut Vec<AllowlistEntry>)) {
        patch(&mut self.entries);
        self.rebuild_table();
        self.poller.supersede();
        self.fetch_entries(fx);
        fx.render();
    }

    // ── Log stream ────────────────────────────────────────────

    fn on_snapshot(&mut self, result: Result<Vec<LogEntry>, GateError>, fx: &mut Effects) {
        if !self.authenticated {
            return;
        }
        match result {
            Ok(records) => {
                let stream = self.logs.load_snapshot(records);
                self.apply_stream(stream, fx);
            }
            Err(GateError::Unauthorized) => {
                self.expire_session(fx);
                return;
            }
            Err(err) => warn!(error = %err, "Log snapshot fetch failed"),
        }
        let stream = self.logs.activate();
        self.apply_stream(stream, fx);
    }

    fn on_channel(&mut self, generation: u64, event: ChannelEvent, fx: &mut Effects) {
        let stream = match event {
            ChannelEvent::Opened => self.logs.on_opened(generation),
            ChannelEvent::Item(FeedItem::Message(message)) => {
                self.logs.on_message(generation, message)
            }
            ChannelEvent::Item(FeedItem::Malformed { payload, reason }) => {
                warn!(generation, %reason, payload = %payload_preview(&payload), "Discarding malformed log message");
                Vec::new()
            }
            ChannelEvent::Closed(Some(GateError::Unauthorized)) => {
                if self.logs.state() != LinkState::Idle {
                    self.expire_session(fx);
                }
                return;
            }
            ChannelEvent::Closed(err) => {
                if let Some(err) = &err {
                    debug!(generation, error = %err, "Log stream closed with error");
                }
                self.logs.on_failed(generation)
            }
        };
        self.apply_stream(stream, fx);
    }

    fn apply_stream(&mut self, effects: Vec<StreamEffect>, fx: &mut Effects) {
        for effect in effects {
            match effect {
                StreamEffect::Open {
                    generation,
                    resume_after,
                } => fx.push(Effect::OpenChannel {
                    generation,
                    resume_after,
                }),
                StreamEffect::Close => fx.push(Effect::CloseChannel),
                StreamEffect::ScheduleRetry { token, after } => {
                    fx.push(Effect::ScheduleRetry { token, after })
                }
                StreamEffect::CancelRetry => fx.push(Effect::CancelRetry),
                StreamEffect::GaveUp { attempts } => {
                    self.notifier.pin(format!(
                        "Live log stream unavailable after {attempts} attempts. Use reconnect to try again."
                    ));
                    fx.render();
                }
                StreamEffect::Changed => fx.render(),
            }
        }
        if self.logs.state() != LinkState::Stopped && self.notifier.unpin() {
            fx.render();
        }
    }

    // ── Intents ───────────────────────────────────────────────

    fn on_intent(&mut self, intent: Intent, fx: &mut Effects) {
        match intent {
            Intent::OpenAdd => self.open_modal(Modal::Add, fx),
            Intent::OpenEdit(id) => match self.entry(id) {
                Some(entry) => {
                    let draft = EditDraft::from(entry);
                    self.open_modal(Modal::Edit(draft), fx);
                }
                None => self.toast(format!("API #{id} not found"), ToastLevel::Error, fx),
            },
            Intent::OpenImport => self.open_modal(Modal::Import, fx),
            Intent::OpenChangePassword => self.open_modal(Modal::ChangePassword, fx),

            Intent::SubmitAdd {
                path,
                description,
                enabled,
            } => match NewEntry::new(&path, &description, enabled) {
                Ok(entry) => fx.push(Effect::Mutate(Mutation::Add(entry))),
                Err(v) => self.toast(v.to_string(), ToastLevel::Error, fx),
            },
            Intent::SubmitEdit {
                id,
                path,
                description,
                enabled,
            } => {
                let enabled = enabled.or_else(|| self.entry(id).map(|e| e.enabled));
                match EntryPatch::edit(&path, &description, enabled) {
                    Ok(patch) => fx.push(Effect::Mutate(Mutation::Update { id, patch })),
                    Err(v) => self.toast(v.to_string(), ToastLevel::Error, fx),
                }
            }
            Intent::SubmitImport(file) => match validate_import_file(file.as_deref()) {
                Ok(()) => {
                    if let Some(path) = file {
                        fx.push(Effect::Mutate(Mutation::Import(path)));
                    }
                }
                Err(v) => self.toast(v.to_string(), ToastLevel::Error, fx),
            },
            Intent::SubmitPasswordChange {
                current,
                new,
                confirm,
            } => match PasswordChange::new(&current, &new, &confirm) {
                Ok(change) => fx.push(Effect::Mutate(Mutation::ChangePassword(change))),
                Err(v) => self.toast(v.to_string(), ToastLevel::Error, fx),
            },

            Intent::Toggle(id) => match self.entry(id) {
                Some(entry) => {
                    let enabled = !entry.enabled;
                    fx.push(Effect::Mutate(Mutation::Toggle { id, enabled }));
                }
                None => self.toast(format!("API #{id} not found"), ToastLevel::Error, fx),
            },
            Intent::SetEnabled { id, enabled } => {
                fx.push(Effect::Mutate(Mutation::Toggle { id, enabled }))
            }

            Intent::RequestDelete(id) => self.stage(ConfirmAction::DeleteEntry(id), fx),
            Intent::RequestClearLogs => self.stage(ConfirmAction::ClearLogs, fx),
            Intent::RequestResetCount(id) => self.stage(ConfirmAction::ResetCallCount(id), fx),
            Intent::RequestResetAll => self.stage(ConfirmAction::ResetAllCallCounts, fx),
            Intent::RequestLogout => self.stage(ConfirmAction::Logout, fx),
            Intent::Confirm => {
                if let Some(action) = self.confirm.confirm() {
                    self.modals.close();
                    fx.push(Effect::Mutate(confirmed_mutation(action)));
                    fx.render();
                }
            }
            Intent::Dismiss(reason) => {
                let discarded = self.confirm.dismiss();
                if let Some(modal) = self.modals.close() {
                    debug!(?reason, modal = modal.title(), ?discarded, "Dialog dismissed");
                    fx.render();
                }
            }

            Intent::Export => fx.push(Effect::Mutate(Mutation::Export)),
            Intent::Reconnect => {
                let stream = self.logs.manual_reconnect();
                self.apply_stream(stream, fx);
            }
            Intent::Search(filter) => {
                self.filter = filter;
                self.rebuild_table();
                fx.render();
            }
            Intent::Refresh => self.fetch_entries(fx),
        }
    }

    fn open_modal(&mut self, modal: Modal, fx: &mut Effects) {
        if !matches!(modal, Modal::Confirm(_)) {
            self.confirm.dismiss();
        }
        let focus = self.modals.open(modal);
        debug!(?focus, "Dialog opened");
        fx.render();
    }

    fn stage(&mut self, action: ConfirmAction, fx: &mut Effects) {
        self.confirm.stage(action);
        self.open_modal(Modal::Confirm(action), fx);
    }

    // ── Mutation results ──────────────────────────────────────

    fn on_mutation_ok(&mut self, outcome: MutationOutcome, fx: &mut Effects) {
        if !self.authenticated {
            return;
        }
        match outcome {
            MutationOutcome::Added(entry) => {
                if self.modals.is_add() {
                    self.modals.close();
                }
                info!(id = entry.id, path = %entry.path, "API added");
                self.patch_entries(fx, |entries| upsert(entries, entry));
                self.toast("API added successfully", ToastLevel::Success, fx);
            }
            MutationOutcome::Updated(entry) => {
                let message = if self.modals.is_editing(entry.id) {
                    self.modals.close();
                    "API updated successfully"
                } else if entry.enabled {
                    "API enabled"
                } else {
                    "API disabled"
                };
                self.patch_entries(fx, |entries| upsert(entries, entry));
                self.toast(message, ToastLevel::Success, fx);
            }
            MutationOutcome::Deleted(id) => {
                self.patch_entries(fx, |entries| entries.retain(|e| e.id != id));
                self.toast("API deleted", ToastLevel::Success, fx);
            }
            MutationOutcome::CallCountReset(target) => {
                self.patch_entries(fx, |entries| {
                    for e in entries.iter_mut() {
                        if target == ResetTarget::All || target == ResetTarget::One(e.id) {
                            e.call_count = 0;
                        }
                    }
                });
                let message = match target {
                    ResetTarget::One(_) => "Call count reset",
                    ResetTarget::All => "All call counts reset",
                };
                self.toast(message, ToastLevel::Success, fx);
            }
            MutationOutcome::Imported(report) => {
                if self.modals.is_import() {
                    self.modals.close();
                }
                self.poller.supersede();
                self.fetch_entries(fx);
                let (message, level) = if report.error_count == 0 {
                    (format!("Imported {} APIs", report.imported_count), ToastLevel::Success)
                } else {
                    let mut message = format!(
                        "Imported {} APIs, {} failed",
                        report.imported_count, report.error_count
                    );
                    if let Some(first) = report.errors.first() {
                        message.push_str(": ");
                        message.push_str(first);
                    }
                    (message, ToastLevel::Error)
                };
                self.toast(message, level, fx);
            }
            MutationOutcome::Exported(receipt) => {
                self.toast(
                    format!("Exported {} APIs to {}", receipt.api_count, receipt.export_path),
                    ToastLevel::Success,
                    fx,
                );
            }
            MutationOutcome::LogsCleared => {
                fx.push(Effect::FetchLogSnapshot {
                    limit: self.snapshot_limit,
                });
                self.toast("Logs cleared", ToastLevel::Success, fx);
            }
            MutationOutcome::PasswordChanged => {
                if self.modals.is_change_password() {
                    self.modals.close();
                }
                self.toast("Password changed successfully", ToastLevel::Success, fx);
            }
            MutationOutcome::LoggedOut => {
                info!("Logged out");
                self.authenticated = false;
                self.modals.close();
                self.confirm.dismiss();
                let stream = self.logs.deactivate();
                self.apply_stream(stream, fx);
                fx.push(Effect::Exit);
            }
        }
    }

    fn on_mutation_err(&mut self, kind: MutationKind, err: GateError, fx: &mut Effects) {
        if err.is_unauthorized() {
            self.expire_session(fx);
            return;
        }
        warn!(?kind, error = %err, "Mutation failed");
        self.toast(err.user_message(kind.fallback_message()), ToastLevel::Error, fx);
    }

    fn toast(&mut self, message: impl Into<String>, level: ToastLevel, fx: &mut Effects) {
        let (token, after) = self.notifier.show(message, level);
        fx.push(Effect::ScheduleToastExpiry { token, after });
        fx.render();
    }
}

fn confirmed_mutation(action: ConfirmAction) -> Mutation {
    match action {
        ConfirmAction::DeleteEntry(id) => Mutation::Delete(id),
        ConfirmAction::ClearLogs => Mutation::ClearLogs,
        ConfirmAction::ResetCallCount(id) => Mutation::ResetCallCount(ResetTarget::One(id)),
        ConfirmAction::ResetAllCallCounts => Mutation::ResetCallCount(ResetTarget::All),
        ConfirmAction::Logout => Mutation::Logout,
    }
}

fn upsert(entries: &mut Vec<AllowlistEntry>, entry: AllowlistEntry) {
    match entries.iter_mut().find(|e| e.id == entry.id) {
        Some(slot) => *slot = entry,
        None => entries.push(entry),
    }
}

/// Effect accumulator. Collapses repeated render requests into one,
/// emitted last.
#[derive(Default)]
struct Effects {
    list: Vec<Effect>,
    render: bool,
}

impl Effects {
    fn push(&mut self, effect: Effect) {
        if effect == Effect::Render {
            self.render = true;
        } else {
            self.list.push(effect);
        }
    }

    fn render(&mut self) {
        self.render = true;
    }

    fn finish(mut self) -> Vec<Effect> {
        if self.render {
            self.list.push(Effect::Render);
        }
        self.list
    }
}
