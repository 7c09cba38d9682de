use authgate_client::FeedItem;
use authgate_console::confirm::{ButtonStyle, ConfirmAction};
use authgate_console::modal::{Focus, Modal};
use authgate_console::toast::ToastLevel;
use authgate_console::{
    ChannelEvent, Console, DismissReason, Effect, Event, Intent, LinkState, Mutation,
    MutationKind, MutationOutcome,
};
use authgate_core::account::SessionInfo;
use authgate_core::entry::ResetTarget;
use authgate_core::{AllowlistEntry, ConsoleConfig, GateError, LogEntry, StreamMessage};

// =============================================================================
// Helpers
// =============================================================================

fn entry(id: i64, path: &str, enabled: bool) -> AllowlistEntry {
    AllowlistEntry {
        id,
        path: path.into(),
        description: String::new(),
        enabled,
        call_count: 4,
        created_at: None,
    }
}

fn log(id: i64) -> LogEntry {
    LogEntry {
        id: Some(id),
        timestamp: "2024-05-01 10:00:00".into(),
        ip_address: "10.0.0.1".into(),
        action: "CHECK".into(),
        details: format!("record {id}"),
    }
}

fn fetch_seq(effects: &[Effect]) -> Option<u64> {
    effects.iter().find_map(|e| match e {
        Effect::FetchEntries { seq } => Some(*seq),
        _ => None,
    })
}

fn open_generation(effects: &[Effect]) -> Option<u64> {
    effects.iter().find_map(|e| match e {
        Effect::OpenChannel { generation, .. } => Some(*generation),
        _ => None,
    })
}

fn retry_token(effects: &[Effect]) -> Option<u64> {
    effects.iter().find_map(|e| match e {
        Effect::ScheduleRetry { token, .. } => Some(*token),
        _ => None,
    })
}

fn mutation(effects: &[Effect]) -> Option<&Mutation> {
    effects.iter().find_map(|e| match e {
        Effect::Mutate(m) => Some(m),
        _ => None,
    })
}

fn count<F: Fn(&Effect) -> bool>(effects: &[Effect], pred: F) -> usize {
    effects.iter().filter(|e| pred(e)).count()
}

struct Harness {
    console: Console,
    generation: u64,
}

impl Harness {
    /// Signed in, table loaded with `entries`, snapshot loaded, channel live.
    fn ready(entries: Vec<AllowlistEntry>) -> Self {
        let mut console = Console::new(&ConsoleConfig::default());
        console.handle(Event::Start);
        let effects = console.handle(Event::SessionChecked(Ok(SessionInfo {
            logged_in: true,
            user: Some("admin".into()),
            message: None,
        })));
        let seq = fetch_seq(&effects).unwrap();
        console.handle(Event::EntriesFetched {
            seq,
            result: Ok(entries),
        });
        let effects = console.handle(Event::LogSnapshotFetched(Ok(vec![log(2), log(1)])));
        let generation = open_generation(&effects).unwrap();
        console.handle(Event::Channel {
            generation,
            event: ChannelEvent::Opened,
        });
        assert_eq!(console.link_state(), LinkState::Connected);
        Self { console, generation }
    }

    fn send(&mut self, event: Event) -> Vec<Effect> {
        self.console.handle(event)
    }

    fn intent(&mut self, intent: Intent) -> Vec<Effect> {
        self.console.handle(Event::Intent(intent))
    }

    fn push(&mut self, id: i64) -> Vec<Effect> {
        let generation = self.generation;
        self.send(Event::Channel {
            generation,
            event: ChannelEvent::Item(FeedItem::Message(StreamMessage::Record(log(id)))),
        })
    }

    fn finish(&mut self, kind: MutationKind, result: Result<MutationOutcome, GateError>) -> Vec<Effect> {
        self.send(Event::MutationFinished { kind, result })
    }
}

// =============================================================================
// Table and summary
// =============================================================================

#[test]
fn test_summary_matches_cache() {
    let h = Harness::ready(vec![entry(1, "/a", true), entry(2, "/b", false)]);
    let s = h.console.table().summary;
    assert_eq!(s.total, 2);
    assert_eq!(s.enabled + s.disabled, s.total);
}

#[test]
fn test_empty_allowlist_shows_empty_state() {
    let h = Harness::ready(Vec::new());
    assert!(h.console.table().is_empty());
    assert!(h.console.table().to_text().contains("No API entries"));
}

#[test]
fn test_search_filters_rows_only() {
    let mut h = Harness::ready(vec![entry(1, "/v1/users", true), entry(2, "/v1/orders", true)]);
    let effects = h.intent(Intent::Search("ORDERS".into()));
    assert_eq!(effects, vec![Effect::Render]);
    assert_eq!(h.console.table().rows.len(), 1);
    assert_eq!(h.console.table().summary.total, 2);
}

// =============================================================================
// Local validation
// =============================================================================

#[test]
fn test_invalid_path_rejected_without_request() {
    let mut h = Harness::ready(Vec::new());
    h.intent(Intent::OpenAdd);
    let effects = h.intent(Intent::SubmitAdd {
        path: "v1/users".into(),
        description: String::new(),
        enabled: true,
    });
    assert!(mutation(&effects).is_none());
    assert!(h.console.modals().is_add());
    let toast = h.console.notifier().current().unwrap();
    assert_eq!(toast.level, ToastLevel::Error);

    let effects = h.intent(Intent::SubmitEdit {
        id: 1,
        path: "".into(),
        description: String::new(),
        enabled: None,
    });
    assert!(mutation(&effects).is_none());
}

#[test]
fn test_import_requires_json_file() {
    let mut h = Harness::ready(Vec::new());
    h.intent(Intent::OpenImport);
    assert!(mutation(&h.intent(Intent::SubmitImport(None))).is_none());
    assert!(mutation(&h.intent(Intent::SubmitImport(Some("apis.csv".into())))).is_none());
    assert!(h.console.modals().is_import());

    let effects = h.intent(Intent::SubmitImport(Some("apis.JSON".into())));
    assert_eq!(mutation(&effects), Some(&Mutation::Import("apis.JSON".into())));
}

#[test]
fn test_password_change_checked_locally() {
    let mut h = Harness::ready(Vec::new());
    assert_eq!(h.console.modals().focus(), None);
    h.intent(Intent::OpenChangePassword);
    assert_eq!(h.console.modals().focus(), Some(Focus::CurrentPasswordField));

    let effects = h.intent(Intent::SubmitPasswordChange {
        current: "admin123".into(),
        new: "abc".into(),
        confirm: "abc".into(),
    });
    assert!(mutation(&effects).is_none());
    assert!(h.console.modals().is_change_password());

    let effects = h.intent(Intent::SubmitPasswordChange {
        current: "admin123".into(),
        new: "s3cret".into(),
        confirm: "s3cret".into(),
    });
    assert!(matches!(mutation(&effects), Some(Mutation::ChangePassword(_))));
    h.finish(MutationKind::ChangePassword, Ok(MutationOutcome::PasswordChanged));
    assert!(h.console.modals().active().is_none());
}

// =============================================================================
// Mutations
// =============================================================================

#[test]
fn test_add_entry_scenario() {
    let mut h = Harness::ready(vec![entry(1, "/health", true)]);
    h.intent(Intent::OpenAdd);
    assert_eq!(h.console.modals().focus(), Some(Focus::PathField));

    let effects = h.intent(Intent::SubmitAdd {
        path: "/v1/users".into(),
        description: "list users".into(),
        enabled: true,
    });
    match mutation(&effects) {
        Some(Mutation::Add(new)) => {
            assert_eq!(new.api_path, "/v1/users");
            assert_eq!(new.description, "list users");
        }
        other => panic!("expected add, got {other:?}"),
    }

    let created = AllowlistEntry {
        id: 7,
        path: "/v1/users".into(),
        description: "list users".into(),
        enabled: true,
        call_count: 0,
        created_at: None,
    };
    let effects = h.finish(MutationKind::Add, Ok(MutationOutcome::Added(created)));

    let table = h.console.table();
    assert_eq!(table.summary.total, 2);
    let row = table.row(7).unwrap();
    assert_eq!(row.call_count, 0);
    assert_eq!(row.status(), "Enabled");
    assert!(h.console.modals().active().is_none());
    assert_eq!(h.console.notifier().current().unwrap().level, ToastLevel::Success);
    // Local patch is followed by a fresh fetch.
    assert!(fetch_seq(&effects).is_some());
}

#[test]
fn test_toggle_scenario_leaves_other_rows() {
    let mut h = Harness::ready(vec![entry(5, "/a", true), entry(7, "/v1/users", true), entry(9, "/b", false)]);
    let before: Vec<_> = h.console.table().rows.iter().filter(|r| r.id != 7).cloned().collect();

    let effects = h.intent(Intent::Toggle(7));
    assert_eq!(
        mutation(&effects),
        Some(&Mutation::Toggle { id: 7, enabled: false })
    );

    let mut updated = entry(7, "/v1/users", false);
    updated.call_count = 4;
    h.finish(MutationKind::Toggle, Ok(MutationOutcome::Updated(updated)));

    let table = h.console.table();
    assert_eq!(table.row(7).unwrap().status(), "Disabled");
    assert_eq!(table.row(7).unwrap().toggle_label(), "Enable");
    let after: Vec<_> = table.rows.iter().filter(|r| r.id != 7).cloned().collect();
    assert_eq!(before, after);
    assert_eq!(h.console.notifier().current().unwrap().message, "API disabled");
}

#[test]
fn test_edit_prefills_draft_and_closes_on_success() {
    let mut h = Harness::ready(vec![entry(3, "/old", true)]);
    h.intent(Intent::OpenEdit(3));
    match h.console.modals().active() {
        Some(Modal::Edit(draft)) => assert_eq!(draft.path, "/old"),
        other => panic!("expected edit dialog, got {other:?}"),
    }

    let effects = h.intent(Intent::SubmitEdit {
        id: 3,
        path: " /new ".into(),
        description: "renamed".into(),
        enabled: None,
    });
    match mutation(&effects) {
        Some(Mutation::Update { id, patch }) => {
            assert_eq!(*id, 3);
            assert_eq!(patch.api_path.as_deref(), Some("/new"));
        }
        other => panic!("expected update, got {other:?}"),
    }

    let mut renamed = entry(3, "/new", true);
    renamed.description = "renamed".into();
    h.finish(MutationKind::Update, Ok(MutationOutcome::Updated(renamed)));
    assert!(h.console.modals().active().is_none());
    assert_eq!(h.console.entry(3).unwrap().path, "/new");
}

#[test]
fn test_edit_without_status_keeps_server_flag() {
    let mut h = Harness::ready(vec![entry(3, "/old", false)]);

    // Cached entry: the dialog's current flag goes along.
    let effects = h.intent(Intent::SubmitEdit {
        id: 3,
        path: "/old".into(),
        description: String::new(),
        enabled: None,
    });
    match mutation(&effects) {
        Some(Mutation::Update { patch, .. }) => assert_eq!(patch.enabled, Some(false)),
        other => panic!("expected update, got {other:?}"),
    }

    // Unknown id: no guess, the server keeps whatever it has.
    let effects = h.intent(Intent::SubmitEdit {
        id: 99,
        path: "/x".into(),
        description: String::new(),
        enabled: None,
    });
    match mutation(&effects) {
        Some(Mutation::Update { id, patch }) => {
            assert_eq!(*id, 99);
            assert_eq!(patch.enabled, None);
            assert_eq!(patch.api_path.as_deref(), Some("/x"));
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn test_server_error_keeps_modal_and_shows_message() {
    let mut h = Harness::ready(Vec::new());
    h.intent(Intent::OpenAdd);
    h.intent(Intent::SubmitAdd {
        path: "/dup".into(),
        description: String::new(),
        enabled: true,
    });
    h.finish(
        MutationKind::Add,
        Err(GateError::Server {
            status: 400,
            message: "API path already exists".into(),
        }),
    );
    assert!(h.console.modals().is_add());
    assert_eq!(h.console.notifier().current().unwrap().message, "API path already exists");

    h.finish(MutationKind::Add, Err(GateError::Network("connection reset".into())));
    assert_eq!(h.console.notifier().current().unwrap().message, "Failed to add API");
}

#[test]
fn test_import_report_partial_failure() {
    let mut h = Harness::ready(Vec::new());
    h.intent(Intent::OpenImport);
    let report = authgate_core::entry::ImportReport {
        message: "Import completed".into(),
        imported_count: 3,
        error_count: 2,
        total_in_database: Some(3),
        errors: vec!["Item 2: API path must start with /".into()],
    };
    let effects = h.finish(MutationKind::Import, Ok(MutationOutcome::Imported(report)));
    assert!(fetch_seq(&effects).is_some());
    assert!(h.console.modals().active().is_none());
    let toast = h.console.notifier().current().unwrap();
    assert_eq!(toast.level, ToastLevel::Error);
    assert!(toast.message.contains("Imported 3 APIs, 2 failed"));
}

// =============================================================================
// Confirm gate
// =============================================================================

#[test]
fn test_dismissed_confirmation_has_no_effect() {
    let mut h = Harness::ready(vec![entry(7, "/v1/users", true)]);
    h.intent(Intent::RequestDelete(7));
    assert_eq!(h.console.pending_confirm(), Some(ConfirmAction::DeleteEntry(7)));
    assert_eq!(h.console.modals().focus(), Some(Focus::ConfirmButton));

    for reason in [DismissReason::Escape, DismissReason::Backdrop, DismissReason::Cancel] {
        h.intent(Intent::RequestDelete(7));
        let effects = h.intent(Intent::Dismiss(reason));
        assert!(mutation(&effects).is_none());
        assert!(h.console.pending_confirm().is_none());
        assert!(h.intent(Intent::Confirm).is_empty());
    }
    assert_eq!(h.console.table().summary.total, 1);
}

#[test]
fn test_confirmed_actions_map_to_mutations() {
    let mut h = Harness::ready(vec![entry(7, "/v1/users", true)]);
    let cases = [
        (Intent::RequestDelete(7), Mutation::Delete(7)),
        (Intent::RequestClearLogs, Mutation::ClearLogs),
        (Intent::RequestResetCount(7), Mutation::ResetCallCount(ResetTarget::One(7))),
        (Intent::RequestResetAll, Mutation::ResetCallCount(ResetTarget::All)),
        (Intent::RequestLogout, Mutation::Logout),
    ];
    for (request, expected) in cases {
        h.intent(request);
        let effects = h.intent(Intent::Confirm);
        assert_eq!(mutation(&effects), Some(&expected));
        assert!(h.console.modals().active().is_none());
    }
}

#[test]
fn test_staging_replaces_pending_action() {
    let mut h = Harness::ready(vec![entry(7, "/v1/users", true)]);
    h.intent(Intent::RequestDelete(7));
    h.intent(Intent::RequestResetAll);
    let pending = h.console.pending_confirm().unwrap();
    assert_eq!(pending, ConfirmAction::ResetAllCallCounts);
    assert_eq!(pending.style(), ButtonStyle::Primary);
    let effects = h.intent(Intent::Confirm);
    assert_eq!(
        mutation(&effects),
        Some(&Mutation::ResetCallCount(ResetTarget::All))
    );
}

#[test]
fn test_reset_all_zeroes_counts_locally() {
    let mut h = Harness::ready(vec![entry(1, "/a", true), entry(2, "/b", true)]);
    h.finish(
        MutationKind::ResetCallCount,
        Ok(MutationOutcome::CallCountReset(ResetTarget::All)),
    );
    assert!(h.console.entries().iter().all(|e| e.call_count == 0));
}

#[test]
fn test_logout_exits() {
    let mut h = Harness::ready(Vec::new());
    let effects = h.finish(MutationKind::Logout, Ok(MutationOutcome::LoggedOut));
    assert!(effects.contains(&Effect::CloseChannel));
    assert!(effects.contains(&Effect::Exit));
    assert!(!h.console.is_authenticated());
}

// =============================================================================
// Authentication boundary
// =============================================================================

#[test]
fn test_unauthorized_preempts_local_handling() {
    let mut h = Harness::ready(vec![entry(7, "/v1/users", true)]);
    h.intent(Intent::RequestDelete(7));
    h.intent(Intent::Confirm);
    h.intent(Intent::OpenAdd);

    let effects = h.finish(MutationKind::Delete, Err(GateError::Unauthorized));
    assert!(effects.contains(&Effect::RedirectToLogin));
    assert!(effects.contains(&Effect::CloseChannel));
    assert!(!effects.iter().any(|e| matches!(e, Effect::ScheduleToastExpiry { .. })));
    assert!(h.console.notifier().current().is_none());
    assert!(h.console.modals().active().is_none());
    assert!(!h.console.is_authenticated());

    // Nothing polls or reconnects afterwards.
    assert!(h.send(Event::PollTick).is_empty());
    assert!(h.intent(Intent::Reconnect).is_empty());
}

#[test]
fn test_one_expiry_redirects_once() {
    let mut h = Harness::ready(vec![entry(1, "/a", true)]);
    let seqs: Vec<u64> = (0..4)
        .map(|_| fetch_seq(&h.intent(Intent::Refresh)).unwrap())
        .collect();

    let mut redirects = 0;
    for seq in seqs {
        let effects = h.send(Event::EntriesFetched {
            seq,
            result: Err(GateError::Unauthorized),
        });
        redirects += count(&effects, |e| *e == Effect::RedirectToLogin);
    }
    assert_eq!(redirects, 1);

    // Late 401s from other requests belong to the same expiry.
    let effects = h.finish(MutationKind::Delete, Err(GateError::Unauthorized));
    assert_eq!(count(&effects, |e| *e == Effect::RedirectToLogin), 0);
    let effects = h.send(Event::LogSnapshotFetched(Err(GateError::Unauthorized)));
    assert_eq!(count(&effects, |e| *e == Effect::RedirectToLogin), 0);
    assert!(!h.console.is_authenticated());
}

// =============================================================================
// Polling
// =============================================================================

#[test]
fn test_stale_poll_response_dropped() {
    let mut h = Harness::ready(vec![entry(1, "/a", true)]);
    let slow = fetch_seq(&h.send(Event::PollTick)).unwrap();
    let fast = fetch_seq(&h.send(Event::PollTick)).unwrap();

    let fresh = vec![entry(1, "/a", true), entry(2, "/b", true)];
    let effects = h.send(Event::EntriesFetched {
        seq: fast,
        result: Ok(fresh),
    });
    assert_eq!(effects, vec![Effect::Render]);

    let effects = h.send(Event::EntriesFetched {
        seq: slow,
        result: Ok(vec![entry(1, "/a", true)]),
    });
    assert!(effects.is_empty());
    assert_eq!(h.console.table().summary.total, 2);
}

#[test]
fn test_unchanged_poll_does_not_render() {
    let mut h = Harness::ready(vec![entry(1, "/a", true)]);
    let seq = fetch_seq(&h.send(Event::PollTick)).unwrap();
    let effects = h.send(Event::EntriesFetched {
        seq,
        result: Ok(vec![entry(1, "/a", true)]),
    });
    assert!(effects.is_empty());
}

#[test]
fn test_local_patch_supersedes_in_flight_poll() {
    let mut h = Harness::ready(vec![entry(7, "/v1/users", true)]);
    let in_flight = fetch_seq(&h.send(Event::PollTick)).unwrap();
    h.finish(
        MutationKind::Toggle,
        Ok(MutationOutcome::Updated(entry(7, "/v1/users", false))),
    );

    // The poll was issued before the toggle landed; its data is older.
    h.send(Event::EntriesFetched {
        seq: in_flight,
        result: Ok(vec![entry(7, "/v1/users", true)]),
    });
    assert!(!h.console.entry(7).unwrap().enabled);
}

#[test]
fn test_background_poll_failure_is_quiet() {
    let mut h = Harness::ready(vec![entry(1, "/a", true)]);
    let seq = fetch_seq(&h.send(Event::PollTick)).unwrap();
    let effects = h.send(Event::EntriesFetched {
        seq,
        result: Err(GateError::Network("timeout".into())),
    });
    assert!(effects.is_empty());
    assert_eq!(h.console.table().summary.total, 1);
}

// =============================================================================
// Visibility and network gating
// =============================================================================

#[test]
fn test_hidden_console_neither_polls_nor_reconnects() {
    let mut h = Harness::ready(Vec::new());
    let generation = h.generation;
    let effects = h.send(Event::VisibilityChanged(false));
    assert!(effects.contains(&Effect::CloseChannel));
    assert_eq!(h.console.link_state(), LinkState::Idle);

    for _ in 0..5 {
        let effects = h.send(Event::PollTick);
        assert!(fetch_seq(&effects).is_none());
    }
    // A late failure from the closed channel schedules nothing.
    let effects = h.send(Event::Channel {
        generation,
        event: ChannelEvent::Closed(None),
    });
    assert!(open_generation(&effects).is_none());
    assert!(retry_token(&effects).is_none());

    let effects = h.send(Event::VisibilityChanged(true));
    assert_eq!(count(&effects, |e| matches!(e, Effect::OpenChannel { .. })), 1);
    assert_eq!(count(&effects, |e| matches!(e, Effect::FetchEntries { .. })), 1);
    assert_eq!(h.console.link_state(), LinkState::Connecting);
}

#[test]
fn test_offline_then_online_reconnects_once() {
    let mut h = Harness::ready(Vec::new());
    h.send(Event::NetworkChanged(false));
    assert_eq!(h.console.link_state(), LinkState::Idle);
    assert!(open_generation(&h.send(Event::VisibilityChanged(true))).is_none());
    let effects = h.send(Event::NetworkChanged(true));
    assert_eq!(count(&effects, |e| matches!(e, Effect::OpenChannel { .. })), 1);
}

// =============================================================================
// Log stream
// =============================================================================

#[test]
fn test_duplicate_push_record_shown_once() {
    let mut h = Harness::ready(Vec::new());
    assert_eq!(h.push(100), vec![Effect::Render]);
    assert!(h.push(100).is_empty());
    let shown: Vec<_> = h
        .console
        .logs()
        .entries()
        .filter(|e| e.id == Some(100))
        .collect();
    assert_eq!(shown.len(), 1);
}

#[test]
fn test_snapshot_ids_not_repeated_by_stream() {
    let mut h = Harness::ready(Vec::new());
    assert!(h.push(1).is_empty());
    assert!(h.push(2).is_empty());
    assert_eq!(h.console.logs().len(), 2);
}

#[test]
fn test_malformed_payload_keeps_channel_open() {
    let mut h = Harness::ready(Vec::new());
    let generation = h.generation;
    let effects = h.send(Event::Channel {
        generation,
        event: ChannelEvent::Item(FeedItem::Malformed {
            payload: "{oops".into(),
            reason: "expected value".into(),
        }),
    });
    assert!(effects.is_empty());
    assert_eq!(h.console.link_state(), LinkState::Connected);
    assert_eq!(h.push(50), vec![Effect::Render]);
}

#[test]
fn test_reconnect_gives_up_after_ten_failures() {
    let mut h = Harness::ready(Vec::new());
    let mut generation = h.generation;
    let mut timers = 0;
    let mut pinned_notices = 0;

    for attempt in 1..=10 {
        let had_pin = h.console.notifier().pinned().is_some();
        let effects = h.send(Event::Channel {
            generation,
            event: ChannelEvent::Closed(Some(GateError::Network("reset".into()))),
        });
        if !had_pin && h.console.notifier().pinned().is_some() {
            pinned_notices += 1;
        }
        match retry_token(&effects) {
            Some(token) => {
                timers += 1;
                let effects = h.send(Event::RetryElapsed { token });
                generation = open_generation(&effects).unwrap();
            }
            None => assert_eq!(attempt, 10),
        }
    }

    assert_eq!(h.console.link_state(), LinkState::Stopped);
    assert_eq!(timers, 9);
    assert_eq!(pinned_notices, 1);
    assert!(h.console.notifier().current().is_none());

    // An eleventh failure report changes nothing and schedules no timer.
    let effects = h.send(Event::Channel {
        generation,
        event: ChannelEvent::Closed(None),
    });
    assert!(retry_token(&effects).is_none());
    assert_eq!(h.console.link_state(), LinkState::Stopped);

    // Polling keeps running while the stream is stopped.
    assert!(fetch_seq(&h.send(Event::PollTick)).is_some());

    // Manual reconnect leaves Stopped and clears the notice.
    let effects = h.intent(Intent::Reconnect);
    assert!(open_generation(&effects).is_some());
    assert!(h.console.notifier().pinned().is_none());
    assert_eq!(h.console.logs().attempts(), 0);
}

#[test]
fn test_clear_logs_refetches_snapshot() {
    let mut h = Harness::ready(Vec::new());
    h.push(10);
    let effects = h.finish(MutationKind::ClearLogs, Ok(MutationOutcome::LogsCleared));
    assert!(effects.contains(&Effect::FetchLogSnapshot { limit: 20 }));

    let effects = h.send(Event::LogSnapshotFetched(Ok(Vec::new())));
    assert!(open_generation(&effects).is_none());
    assert!(h.console.logs().is_empty());
    // Already-seen records stay suppressed.
    assert!(h.push(10).is_empty());
}

#[test]
fn test_toast_expiry_uses_latest_token() {
    let mut h = Harness::ready(Vec::new());
    let first = h.finish(MutationKind::Export, Err(GateError::Network("x".into())));
    let second = h.finish(MutationKind::Export, Err(GateError::Network("y".into())));
    let token_of = |effects: &[Effect]| {
        effects.iter().find_map(|e| match e {
            Effect::ScheduleToastExpiry { token, .. } => Some(*token),
            _ => None,
        })
    };
    let (t1, t2) = (token_of(&first).unwrap(), token_of(&second).unwrap());
    assert!(h.send(Event::ToastElapsed { token: t1 }).is_empty());
    assert!(h.console.notifier().current().is_some());
    assert_eq!(h.send(Event::ToastElapsed { token: t2 }), vec![Effect::Render]);
    assert!(h.console.notifier().current().is_none());
}
