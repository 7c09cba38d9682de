//! One-shot subcommands. Each runs a single request sequence and exits.

use crate::Command;
use anyhow::{Context, bail};
use authgate_client::{AllowlistApi, AllowlistClient, ClientConfig, FeedItem, LogFeed};
use authgate_console::LogStream;
use authgate_console::confirm::ConfirmAction;
use authgate_console::log_stream::{StreamEffect, payload_preview};
use authgate_console::table::{self, escape_terminal};
use authgate_core::account::PasswordChange;
use authgate_core::entry::ResetTarget;
use authgate_core::validate::{parse_import_records, validate_import_file};
use authgate_core::{ConsoleConfig, EntryPatch, GateError, LogEntry, NewEntry};
use futures_util::StreamExt;
use std::collections::VecDeque;
use std::path::Path;
use tracing::{debug, info, warn};

pub async fn run(command: Command, config: &ConsoleConfig) -> anyhow::Result<()> {
    let client = AllowlistClient::new(ClientConfig::from(&config.server))?;

    // Public endpoints first; everything else needs a session.
    match command {
        Command::Hint => {
            let hint = client.password_hint().await?;
            println!("{}", hint.hint);
            return Ok(());
        }
        Command::Check { path } => {
            let check = client.check_path(&path).await?;
            let verdict = if check.authorized { "authorized" } else { "denied" };
            println!("{} {verdict}", check.api_path);
            if !check.message.is_empty() {
                println!("{}", check.message);
            }
            return Ok(());
        }
        _ => {}
    }

    sign_in(&client, config).await?;

    match command {
        Command::List { filter, json, html } => {
            let entries = client.list().await?;
            let filter = filter.as_deref().unwrap_or("");
            let view = table::render_filtered(&entries, filter);
            if json {
                let shown: Vec<_> = entries.iter().filter(|e| e.matches(filter)).collect();
                println!("{}", serde_json::to_string_pretty(&shown)?);
            } else if html {
                println!("{}", view.to_html());
            } else {
                print!("{}", view.to_text());
            }
        }
        Command::Add {
            path,
            description,
            disabled,
        } => {
            let new = NewEntry::new(&path, &description, !disabled)?;
            let created = client.add(&new).await?;
            println!("API added successfully (id {})", created.id);
        }
        Command::Update {
            id,
            path,
            description,
            enabled,
        } => {
            let patch = EntryPatch {
                api_path: path,
                description,
                enabled,
            };
            if patch.is_empty() {
                bail!("nothing to update: pass --path, --description or --enabled");
            }
            let updated = client.update(id, &patch).await?;
            println!("API updated successfully ({})", updated.path);
        }
        Command::Toggle { id } => {
            let entries = client.list().await?;
            let Some(current) = entries.iter().find(|e| e.id == id) else {
                bail!("no API with id {id}");
            };
            let updated = client.toggle(id, !current.enabled).await?;
            println!(
                "API {}",
                if updated.enabled { "enabled" } else { "disabled" }
            );
        }
        Command::Delete { id, yes } => {
            guard(yes, ConfirmAction::DeleteEntry(id))?;
            client.remove(id).await?;
            println!("API deleted successfully");
        }
        Command::ResetCount { id, all, yes } => {
            let (action, target) = match (all, id) {
                (true, _) | (false, None) => (ConfirmAction::ResetAllCallCounts, ResetTarget::All),
                (false, Some(id)) => (ConfirmAction::ResetCallCount(id), ResetTarget::One(id)),
            };
            guard(yes, action)?;
            client.reset_call_count(target).await?;
            println!("Call count reset");
        }
        Command::Import { file } => import(&client, &file).await?,
        Command::Export => {
            let receipt = client.export_snapshot().await?;
            println!("Exported {} APIs to {}", receipt.api_count, receipt.export_path);
        }
        Command::Logs { limit } => {
            let logs = client.logs(limit).await?;
            for entry in logs.iter().rev() {
                println!("{}", format_log_line(entry));
            }
        }
        Command::Tail { limit } => tail(&client, config, limit).await?,
        Command::ClearLogs { yes } => {
            guard(yes, ConfirmAction::ClearLogs)?;
            client.clear_logs().await?;
            println!("Logs cleared");
        }
        Command::ChangePassword {
            current,
            new,
            confirm,
        } => {
            let confirm = confirm.unwrap_or_else(|| new.clone());
            let change = PasswordChange::new(&current, &new, &confirm)?;
            client.change_password(&change).await?;
            println!("Password changed");
        }
        Command::Logout { yes } => {
            guard(yes, ConfirmAction::Logout)?;
            client.logout().await?;
            println!("Logged out");
        }
        Command::Console | Command::Hint | Command::Check { .. } => {}
    }
    Ok(())
}

/// Establish a session. The cookie jar lives only as long as this process,
/// so a configured password is required.
pub async fn sign_in(client: &AllowlistClient, config: &ConsoleConfig) -> anyhow::Result<()> {
    if let Some(password) = &config.server.password {
        client.login(password).await.context("login failed")?;
        debug!(base_url = client.base_url(), "Signed in");
        return Ok(());
    }
    let session = client.check_session().await?;
    if !session.logged_in {
        bail!("not signed in: set server.password or AUTHGATE_SERVER__PASSWORD");
    }
    Ok(())
}

/// Destructive commands run only with `--yes`.
fn guard(yes: bool, action: ConfirmAction) -> anyhow::Result<()> {
    if yes {
        return Ok(());
    }
    bail!(
        "{} Re-run with --yes to {}.",
        action.message(),
        action.button_label().to_lowercase()
    )
}

async fn import(client: &AllowlistClient, file: &Path) -> anyhow::Result<()> {
    validate_import_file(Some(file))?;
    let contents = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))?;
    let records = parse_import_records(&contents)?;
    info!(file = %file.display(), records = records.len(), "Importing");

    let report = client.import_bulk(&records).await?;
    println!(
        "Imported {} APIs, {} failed",
        report.imported_count, report.error_count
    );
    for error in &report.errors {
        println!("  {}", escape_terminal(error));
    }
    Ok(())
}

pub fn format_log_line(entry: &LogEntry) -> String {
    format!(
        "{}  {:<15}  {:<8}  {}",
        escape_terminal(&entry.timestamp),
        escape_terminal(&entry.ip_address),
        escape_terminal(&entry.action),
        escape_terminal(&entry.details)
    )
}

// ── tail ──────────────────────────────────────────────────────

/// Print the snapshot, then follow the push channel with the same dedup and
/// reconnect policy as the interactive console.
async fn tail(client: &AllowlistClient, config: &ConsoleConfig, limit: usize) -> anyhow::Result<()> {
    let mut logs = LogStream::new(&config.stream);
    let snapshot = client.logs(limit).await?;
    for entry in snapshot.iter().rev() {
        println!("{}", format_log_line(entry));
    }
    logs.load_snapshot(snapshot);

    let mut pending: VecDeque<StreamEffect> = logs.activate().into();
    let mut feed: Option<(u64, LogFeed)> = None;

    loop {
        while let Some(effect) = pending.pop_front() {
            match effect {
                StreamEffect::Open {
                    generation,
                    resume_after,
                } => match client.open_log_stream(resume_after).await {
                    Ok(opened) => {
                        pending.extend(logs.on_opened(generation));
                        feed = Some((generation, opened));
                    }
                    Err(GateError::Unauthorized) => bail!("session expired"),
                    Err(e) => {
                        warn!(error = %e, "Log stream failed to open");
                        pending.extend(logs.on_failed(generation));
                    }
                },
                StreamEffect::Close => feed = None,
                StreamEffect::ScheduleRetry { token, after } => {
                    tokio::select! {
                        _ = tokio::time::sleep(after) => {}
                        _ = tokio::signal::ctrl_c() => return Ok(()),
                    }
                    pending.extend(logs.on_retry_elapsed(token));
                }
                StreamEffect::GaveUp { attempts } => {
                    bail!("log stream stopped after {attempts} failed attempts")
                }
                StreamEffect::CancelRetry | StreamEffect::Changed => {}
            }
        }

        let Some((generation, open)) = feed.as_mut() else {
            return Ok(());
        };
        let generation = *generation;

        let item = tokio::select! {
            item = open.next() => item,
            _ = tokio::signal::ctrl_c() => return Ok(()),
        };
        match item {
            Some(Ok(FeedItem::Message(message))) => {
                let effects = logs.on_message(generation, message);
                if effects.contains(&StreamEffect::Changed) {
                    if let Some(entry) = logs.entries().next() {
                        println!("{}", format_log_line(entry));
                    }
                }
                pending.extend(effects);
            }
            Some(Ok(FeedItem::Malformed { payload, reason })) => {
                warn!(%reason, payload = %payload_preview(&payload), "Ignoring malformed log message");
            }
            Some(Err(GateError::Unauthorized)) => bail!("session expired"),
            Some(Err(e)) => {
                warn!(error = %e, "Log stream dropped");
                feed = None;
                pending.extend(logs.on_failed(generation));
            }
            None => {
                feed = None;
                pending.extend(logs.on_failed(generation));
            }
        }
    }
}
