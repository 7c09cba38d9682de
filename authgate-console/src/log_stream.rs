//! Live operation log: deduplicated view plus the push-channel reconnect
//! state machine.
//!
//! ```text
//! Idle ──open──▶ Connecting ──opened──▶ Connected
//!                    ▲  │                   │
//!              retry │  └──failed──┐        │ failed / closed
//!                    │             ▼        ▼
//!                    └──────── Disconnected ──(attempts ≥ max)──▶ Stopped
//! ```
//!
//! Hidden or offline moves any state to Idle and closes the channel.
//! Stopped is left only by visible, online, or a manual reconnect.

use authgate_core::config::StreamConfig;
use authgate_core::{LogEntry, StreamMessage};
use std::collections::{BTreeSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    Connecting,
    Connected,
    Disconnected,
    Stopped,
}

impl LinkState {
    /// Connection indicator shown next to the log panel.
    pub fn indicator(&self) -> &'static str {
        match self {
            LinkState::Connected => "Live",
            _ => "Connecting…",
        }
    }
}

/// Characters of a malformed push payload kept in log lines.
pub const PAYLOAD_PREVIEW_CHARS: usize = 120;

/// Leading part of a malformed payload, cut on a char boundary.
pub fn payload_preview(payload: &str) -> &str {
    match payload.char_indices().nth(PAYLOAD_PREVIEW_CHARS) {
        Some((at, _)) => &payload[..at],
        None => payload,
    }
}

/// Side effects requested by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEffect {
    Open { generation: u64, resume_after: Option<i64> },
    Close,
    ScheduleRetry { token: u64, after: Duration },
    CancelRetry,
    /// Reconnect attempts exhausted.
    GaveUp { attempts: u32 },
    /// Display or indicator changed.
    Changed,
}

/// Ids already displayed.
///
/// Bounded: once `capacity` is exceeded the smallest ids are evicted and
/// the floor is raised to the largest evicted id. Any id at or below the
/// floor counts as seen.
#[derive(Debug)]
pub struct SeenSet {
    ids: BTreeSet<i64>,
    floor: Option<i64>,
    capacity: usize,
}

impl SeenSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: BTreeSet::new(),
            floor: None,
            capacity: capacity.max(1),
        }
    }

    pub fn contains(&self, id: i64) -> bool {
        self.floor.is_some_and(|f| id <= f) || self.ids.contains(&id)
    }

    /// Returns false if `id` was already seen.
    pub fn insert(&mut self, id: i64) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.insert(id);
        while self.ids.len() > self.capacity {
            if let Some(evicted) = self.ids.pop_first() {
                self.floor = Some(self.floor.map_or(evicted, |f| f.max(evicted)));
            }
        }
        true
    }

    /// Treat every id up to and including `floor` as seen.
    pub fn raise_floor(&mut self, floor: i64) {
        let floor = self.floor.map_or(floor, |f| f.max(floor));
        self.floor = Some(floor);
        self.ids = self.ids.split_off(&(floor.saturating_add(1)));
    }

    pub fn floor(&self) -> Option<i64> {
        self.floor
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.floor.is_none()
    }
}

#[derive(Debug)]
pub struct LogStream {
    state: LinkState,
    attempts: u32,
    max_attempts: u32,
    retry_delay: Duration,

    active: bool,
    visible: bool,
    online: bool,

    generation: u64,
    live_generation: Option<u64>,
    retry_token: u64,
    pending_retry: Option<u64>,

    seen: SeenSet,
    last_seen_id: Option<i64>,
    /// Pushed records, most recent first.
    live: VecDeque<LogEntry>,
    /// Snapshot records, oldest first.
    baseline: VecDeque<LogEntry>,
    display_cap: usize,
}

impl LogStream {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            state: LinkState::Idle,
            attempts: 0,
            max_attempts: config.max_reconnect_attempts.max(1),
            retry_delay: config.reconnect_delay(),
            active: false,
            visible: true,
            online: true,
            generation: 0,
            live_generation: None,
            retry_token: 0,
            pending_retry: None,
            seen: SeenSet::new(config.seen_capacity),
            last_seen_id: None,
            live: VecDeque::new(),
            baseline: VecDeque::new(),
            display_cap: config.display_cap.max(1),
        }
    }

    // ── Accessors ─────────────────────────────────────────────

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_seen_id(&self) -> Option<i64> {
        self.last_seen_id
    }

    pub fn seen(&self) -> &SeenSet {
        &self.seen
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Displayed records: live feed (most recent first) followed by the
    /// snapshot baseline (oldest first).
    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.live.iter().chain(self.baseline.iter())
    }

    pub fn len(&self) -> usize {
        self.live.len() + self.baseline.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Snapshot ──────────────────────────────────────────────

    /// Replace the display with a historical snapshot.
    ///
    /// `newest_first` is the order the logs endpoint returns. Every id is
    /// marked seen and everything older than the snapshot is treated as
    /// seen too, so a channel that replays history does not repeat it.
    pub fn load_snapshot(&mut self, newest_first: Vec<LogEntry>) -> Vec<StreamEffect> {
        let ids: Vec<i64> = newest_first.iter().filter_map(|e| e.id).collect();
        if let Some(min) = ids.iter().min() {
            self.seen.raise_floor(min.saturating_sub(1));
        }
        for id in &ids {
            self.seen.insert(*id);
            self.bump_last_seen(*id);
        }

        self.live.clear();
        self.baseline = newest_first.into_iter().rev().collect();
        self.enforce_cap();
        debug!(records = self.baseline.len(), floor = ?self.seen.floor(), "Log snapshot loaded");
        vec![StreamEffect::Changed]
    }

    // ── Lifecycle triggers ────────────────────────────────────

    /// Enable the channel once the session and snapshot are ready.
    pub fn activate(&mut self) -> Vec<StreamEffect> {
        if self.active {
            return Vec::new();
        }
        self.active = true;
        self.connect_if_ready()
    }

    /// Tear everything down, e.g. on logout or an expired session.
    pub fn deactivate(&mut self) -> Vec<StreamEffect> {
        self.active = false;
        self.suspend()
    }

    pub fn set_visible(&mut self, visible: bool) -> Vec<StreamEffect> {
        self.visible = visible;
        if visible { self.resume() } else { self.suspend() }
    }

    pub fn set_online(&mut self, online: bool) -> Vec<StreamEffect> {
        self.online = online;
        if online { self.resume() } else { self.suspend() }
    }

    /// Explicit reconnect. Always replaces the current channel.
    pub fn manual_reconnect(&mut self) -> Vec<StreamEffect> {
        if !self.ready() {
            return Vec::new();
        }
        info!(state = ?self.state, "Manual log stream reconnect");
        self.attempts = 0;
        self.open()
    }

    // ── Channel events ────────────────────────────────────────

    pub fn on_opened(&mut self, generation: u64) -> Vec<StreamEffect> {
        if !self.is_current(generation) || self.state != LinkState::Connecting {
            return Vec::new();
        }
        if self.attempts > 0 {
            info!(attempts = self.attempts, "Log stream reconnected");
        }
        self.state = LinkState::Connected;
        self.attempts = 0;
        vec![StreamEffect::Changed]
    }

    pub fn on_message(&mut self, generation: u64, message: StreamMessage) -> Vec<StreamEffect> {
        if !self.is_current(generation) || self.state != LinkState::Connected {
            return Vec::new();
        }
        match message {
            StreamMessage::Heartbeat { .. } => Vec::new(),
            StreamMessage::Record(entry) => {
                if self.ingest(entry) {
                    vec![StreamEffect::Changed]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Channel failed to open, errored, or was closed by the server.
    pub fn on_failed(&mut self, generation: u64) -> Vec<StreamEffect> {
        if !self.is_current(generation) {
            return Vec::new();
        }
        self.live_generation = None;
        self.attempts += 1;

        if self.attempts < self.max_attempts {
            self.state = LinkState::Disconnected;
            self.retry_token += 1;
            self.pending_retry = Some(self.retry_token);
            info!(
                attempt = self.attempts,
                max = self.max_attempts,
                delay_ms = self.retry_delay.as_millis() as u64,
                "Log stream disconnected, retry scheduled"
            );
            return vec![
                StreamEffect::Changed,
                StreamEffect::ScheduleRetry {
                    token: self.retry_token,
                    after: self.retry_delay,
                },
            ];
        }

        self.state = LinkState::Stopped;
        warn!(attempts = self.attempts, "Log stream stopped after repeated failures");
        vec![
            StreamEffect::Changed,
            StreamEffect::GaveUp {
                attempts: self.attempts,
            },
        ]
    }

    pub fn on_retry_elapsed(&mut self, token: u64) -> Vec<StreamEffect> {
        if self.pending_retry != Some(token) {
            return Vec::new();
        }
        self.pending_retry = None;
        if self.state != LinkState::Disconnected || !self.ready() {
            return Vec::new();
        }
        self.open()
    }

    // ── Internals ─────────────────────────────────────────────

    fn ready(&self) -> bool {
        self.active && self.visible && self.online
    }

    fn is_current(&self, generation: u64) -> bool {
        self.live_generation == Some(generation)
    }

    fn connect_if_ready(&mut self) -> Vec<StreamEffect> {
        if !self.ready() || matches!(self.state, LinkState::Connected | LinkState::Connecting) {
            return Vec::new();
        }
        self.open()
    }

    fn resume(&mut self) -> Vec<StreamEffect> {
        if !self.ready() || matches!(self.state, LinkState::Connected | LinkState::Connecting) {
            return Vec::new();
        }
        self.attempts = 0;
        self.open()
    }

    fn suspend(&mut self) -> Vec<StreamEffect> {
        let mut effects = Vec::new();
        if self.live_generation.take().is_some() {
            effects.push(StreamEffect::Close);
        }
        if self.pending_retry.take().is_some() {
            effects.push(StreamEffect::CancelRetry);
        }
        if self.state != LinkState::Idle {
            debug!(from = ?self.state, "Log stream suspended");
            self.state = LinkState::Idle;
            effects.push(StreamEffect::Changed);
        }
        effects
    }

    /// Close whatever is live, then open a new generation.
    fn open(&mut self) -> Vec<StreamEffect> {
        let mut effects = Vec::new();
        if self.live_generation.take().is_some() {
            effects.push(StreamEffect::Close);
        }
        if self.pending_retry.take().is_some() {
            effects.push(StreamEffect::CancelRetry);
        }
        self.generation += 1;
        self.live_generation = Some(self.generation);
        self.state = LinkState::Connecting;
        debug!(generation = self.generation, resume_after = ?self.last_seen_id, "Opening log stream");
        effects.push(StreamEffect::Open {
            generation: self.generation,
            resume_after: self.last_seen_id,
        });
        effects.push(StreamEffect::Changed);
        effects
    }

    fn ingest(&mut self, entry: LogEntry) -> bool {
        if let Some(id) = entry.id {
            if !self.seen.insert(id) {
                debug!(id, "Duplicate log record discarded");
                return false;
            }
            self.bump_last_seen(id);
        }
        self.live.push_front(entry);
        self.enforce_cap();
        true
    }

    fn bump_last_seen(&mut self, id: i64) {
        self.last_seen_id = Some(self.last_seen_id.map_or(id, |last| last.max(id)));
    }

    /// Drop the oldest records beyond the display cap.
    fn enforce_cap(&mut self) {
        while self.len() > self.display_cap {
            if self.baseline.pop_front().is_none() {
                self.live.pop_back();
            }
        }
    }
}
