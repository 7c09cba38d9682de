//! Line-oriented terminal front end for the console runtime.
//!
//! Each input line becomes one or more console events; every render prints
//! a fresh frame.

use crate::commands::format_log_line;
use anyhow::{Context, bail};
use authgate_client::{AllowlistApi, AllowlistClient, ClientConfig};
use authgate_console::modal::{Focus, Modal};
use authgate_console::{Console, DismissReason, Event, Intent, Runtime};
use authgate_core::{ConsoleConfig, GateError};
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

/// Log records shown under the table.
const LOG_PANEL_ROWS: usize = 15;

const HELP: &str = "\
commands:
  add <path> [description]       edit <id> <path> [description]
  toggle|enable|disable <id>     delete <id>
  reset <id> | reset-all         clear-logs
  import <file.json>             export
  passwd <current> <new> [confirm]
  search [text]                  refresh | reconnect
  yes | no | esc                 answer or close the open dialog
  hide | show | offline | online simulate visibility / network changes
  logout                         quit";

#[derive(Debug)]
pub enum Input {
    Events(Vec<Event>),
    Help,
    Nothing,
}

pub async fn run(mut config: ConsoleConfig) -> anyhow::Result<()> {
    let client = AllowlistClient::new(ClientConfig::from(&config.server))?;
    if config.server.password.is_none() {
        if let Ok(hint) = client.password_hint().await {
            if hint.is_default {
                println!("{}", hint.hint);
            }
        }
        // Read from the terminal with echo off.
        let password = tokio::task::spawn_blocking(|| rpassword::prompt_password("Password: ")).await??;
        if password.is_empty() {
            bail!("no password given");
        }
        config.server.password = Some(password);
    }
    if let Some(password) = &config.server.password {
        client.login(password).await.context("login failed")?;
    }

    let runtime = Runtime::new(Arc::new(client), &config);
    let events = runtime.events();

    let input = events.clone();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    tokio::spawn(async move {
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) | Err(_) => {
                    let _ = input.send(Event::Shutdown);
                    return;
                }
            };
            match parse_line(&line) {
                Ok(Input::Events(batch)) => {
                    for event in batch {
                        if input.send(event).is_err() {
                            return;
                        }
                    }
                }
                Ok(Input::Help) => println!("{HELP}"),
                Ok(Input::Nothing) => {}
                Err(message) => eprintln!("{message}"),
            }
        }
    });

    let signals = events.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received");
            let _ = signals.send(Event::Shutdown);
        }
    });

    match runtime.run(|console| print!("{}", render(console))).await {
        Ok(()) => Ok(()),
        Err(GateError::Unauthorized) => bail!("session expired and could not be re-established"),
        Err(e) => Err(e.into()),
    }
}

pub fn parse_line(line: &str) -> Result<Input, String> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(Input::Nothing);
    };
    let args: Vec<&str> = words.collect();
    debug!(command, args = args.len(), "Console input");

    let intents = match command {
        "help" | "?" => return Ok(Input::Help),
        "quit" | "exit" => return Ok(Input::Events(vec![Event::Shutdown])),
        "hide" => return Ok(Input::Events(vec![Event::VisibilityChanged(false)])),
        "show" => return Ok(Input::Events(vec![Event::VisibilityChanged(true)])),
        "offline" => return Ok(Input::Events(vec![Event::NetworkChanged(false)])),
        "online" => return Ok(Input::Events(vec![Event::NetworkChanged(true)])),

        "add" => {
            let (path, description) = path_and_description(&args)?;
            vec![
                Intent::OpenAdd,
                Intent::SubmitAdd {
                    path,
                    description,
                    enabled: true,
                },
            ]
        }
        "edit" => {
            let id = id_arg(&args)?;
            let (path, description) = path_and_description(&args[1..])?;
            vec![
                Intent::OpenEdit(id),
                Intent::SubmitEdit {
                    id,
                    path,
                    description,
                    enabled: None,
                },
            ]
        }
        "toggle" => vec![Intent::Toggle(id_arg(&args)?)],
        "enable" => vec![Intent::SetEnabled {
            id: id_arg(&args)?,
            enabled: true,
        }],
        "disable" => vec![Intent::SetEnabled {
            id: id_arg(&args)?,
            enabled: false,
        }],
        "delete" | "rm" => vec![Intent::RequestDelete(id_arg(&args)?)],
        "reset" => vec![Intent::RequestResetCount(id_arg(&args)?)],
        "reset-all" => vec![Intent::RequestResetAll],
        "clear-logs" => vec![Intent::RequestClearLogs],
        "import" => vec![
            Intent::OpenImport,
            Intent::SubmitImport(args.first().map(PathBuf::from)),
        ],
        "export" => vec![Intent::Export],
        "passwd" => {
            let [current, new, rest @ ..] = args.as_slice() else {
                return Err("usage: passwd <current> <new> [confirm]".into());
            };
            let confirm = rest.first().unwrap_or(new);
            vec![
                Intent::OpenChangePassword,
                Intent::SubmitPasswordChange {
                    current: current.to_string(),
                    new: new.to_string(),
                    confirm: confirm.to_string(),
                },
            ]
        }
        "search" => vec![Intent::Search(args.join(" "))],
        "refresh" => vec![Intent::Refresh],
        "reconnect" => vec![Intent::Reconnect],
        "yes" | "y" => vec![Intent::Confirm],
        "no" | "n" | "cancel" => vec![Intent::Dismiss(DismissReason::Cancel)],
        "esc" => vec![Intent::Dismiss(DismissReason::Escape)],
        "logout" => vec![Intent::RequestLogout],
        other => return Err(format!("unknown command `{other}`, try `help`")),
    };
    Ok(Input::Events(intents.into_iter().map(Event::from).collect()))
}

fn id_arg(args: &[&str]) -> Result<i64, String> {
    let raw = args.first().ok_or("missing <id>")?;
    raw.parse().map_err(|_| format!("`{raw}` is not an id"))
}

fn path_and_description(args: &[&str]) -> Result<(String, String), String> {
    let Some((path, rest)) = args.split_first() else {
        return Err("missing <path>".into());
    };
    Ok((path.to_string(), rest.join(" ")))
}

/// One full frame of the console.
pub fn render(console: &Console) -> String {
    let mut out = String::new();
    let user = console.user().unwrap_or("-");
    let mut status = console.link_state().indicator().to_string();
    if !console.is_visible() {
        status.push_str(" (paused)");
    } else if !console.is_online() {
        status.push_str(" (offline)");
    }
    let _ = writeln!(out, "\n━━ AuthGate ━━ user: {user} ━━ logs: {status}");

    out.push_str(&console.table().to_text());
    if !console.filter().is_empty() {
        let _ = writeln!(out, "search: {}", console.filter());
    }

    let logs = console.logs();
    let _ = writeln!(out, "── Operation log ({}) ──", logs.len());
    for entry in logs.entries().take(LOG_PANEL_ROWS) {
        let _ = writeln!(out, "{}", format_log_line(entry));
    }
    if logs.len() > LOG_PANEL_ROWS {
        let _ = writeln!(out, "… {} more", logs.len() - LOG_PANEL_ROWS);
    }

    let notifier = console.notifier();
    if let Some(notice) = notifier.pinned() {
        let _ = writeln!(out, "! {notice}");
    }
    if let Some(toast) = notifier.current() {
        let _ = writeln!(out, "[{}] {}", toast.level.as_str(), toast.message);
    }

    if let Some(modal) = console.modals().active() {
        let _ = writeln!(out, "{}", render_modal(modal));
    }
    out
}

fn render_modal(modal: &Modal) -> String {
    let field = match modal.focus() {
        Focus::PathField => "path",
        Focus::FileField => "file",
        Focus::CurrentPasswordField => "current password",
        Focus::ConfirmButton => "confirm",
    };
    match modal {
        Modal::Confirm(action) => format!(
            "? {} [{} ({})] yes / no",
            action.message(),
            action.button_label(),
            action.style().as_str()
        ),
        Modal::Edit(draft) => format!("▸ {} #{} {} (focus: {field})", modal.title(), draft.id, draft.path),
        _ => format!("▸ {} (focus: {field})", modal.title()),
    }
}
