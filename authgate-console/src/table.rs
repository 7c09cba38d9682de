//! Pure rendering of the allowlist into rows and summary counts.

use authgate_core::AllowlistEntry;
use std::fmt::Write as _;

pub const EMPTY_STATE: &str = "No API entries";

const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub enabled: usize,
    pub disabled: usize,
}

impl Summary {
    pub fn of(entries: &[AllowlistEntry]) -> Self {
        let total = entries.len();
        let enabled = entries.iter().filter(|e| e.enabled).count();
        Self {
            total,
            enabled,
            disabled: total - enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: i64,
    pub call_count: u64,
    pub path: String,
    pub description: String,
    pub enabled: bool,
    pub created: String,
}

impl Row {
    fn from_entry(entry: &AllowlistEntry) -> Self {
        let description = if entry.description.trim().is_empty() {
            "-".to_string()
        } else {
            entry.description.clone()
        };
        let created = entry
            .created_at
            .map(|t| t.format(CREATED_FORMAT).to_string())
            .unwrap_or_else(|| "-".to_string());
        Self {
            id: entry.id,
            call_count: entry.call_count,
            path: entry.path.clone(),
            description,
            enabled: entry.enabled,
            created,
        }
    }

    pub fn status(&self) -> &'static str {
        if self.enabled { "Enabled" } else { "Disabled" }
    }

    /// Label of the button that flips the entry.
    pub fn toggle_label(&self) -> &'static str {
        if self.enabled { "Disable" } else { "Enable" }
    }
}

/// Rendered table: rows for the visible subset, summary for everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    pub rows: Vec<Row>,
    pub summary: Summary,
}

/// Render every entry.
pub fn render(entries: &[AllowlistEntry]) -> TableView {
    TableView {
        rows: entries.iter().map(Row::from_entry).collect(),
        summary: Summary::of(entries),
    }
}

/// Render the entries matching `filter`; the summary still counts all of
/// `entries`.
pub fn render_filtered(entries: &[AllowlistEntry], filter: &str) -> TableView {
    TableView {
        rows: entries
            .iter()
            .filter(|e| e.matches(filter))
            .map(Row::from_entry)
            .collect(),
        summary: Summary::of(entries),
    }
}

impl TableView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, id: i64) -> Option<&Row> {
        self.rows.iter().find(|r| r.id == id)
    }

    /// HTML fragment: stats bar plus table. Entry content is entity-escaped.
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;
        let _ = write!(
            out,
            "<div class=\"stats\"><span class=\"total\">{}</span><span class=\"enabled\">{}</span><span class=\"disabled\">{}</span></div>",
            s.total, s.enabled, s.disabled
        );
        if self.is_empty() {
            let _ = write!(out, "<div class=\"empty-state\">{EMPTY_STATE}</div>");
            return out;
        }

        out.push_str("<table class=\"api-table\"><thead><tr><th>Calls</th><th>Path</th><th>Description</th><th>Status</th><th>Created</th><th>Actions</th></tr></thead><tbody>");
        for row in &self.rows {
            let status_class = if row.enabled { "status-enabled" } else { "status-disabled" };
            let action_class = if row.enabled { "disable" } else { "enable" };
            let _ = write!(
                out,
                "<tr data-id=\"{id}\"><td class=\"call-count\">{calls}</td><td><code>{path}</code></td><td>{desc}</td><td><span class=\"status-badge {status_class}\">{status}</span></td><td>{created}</td><td><button class=\"action-btn {action_class}\" data-id=\"{id}\">{toggle}</button><button class=\"action-btn edit\" data-id=\"{id}\">Edit</button><button class=\"action-btn delete\" data-id=\"{id}\">Delete</button></td></tr>",
                id = row.id,
                calls = row.call_count,
                path = escape_html(&row.path),
                desc = escape_html(&row.description),
                status = row.status(),
                created = escape_html(&row.created),
                toggle = row.toggle_label(),
            );
        }
        out.push_str("</tbody></table>");
        out
    }

    /// Plain-text table for a terminal. Control characters in entry content
    /// are shown escaped so they cannot drive the terminal.
    pub fn to_text(&self) -> String {
        let s = &self.summary;
        let mut out = format!(
            "Total: {}  Enabled: {}  Disabled: {}\n",
            s.total, s.enabled, s.disabled
        );
        if self.is_empty() {
            out.push_str(EMPTY_STATE);
            out.push('\n');
            return out;
        }

        let header = ["ID", "CALLS", "PATH", "DESCRIPTION", "STATUS", "CREATED", "ACTION"];
        let cells: Vec<[String; 7]> = self
            .rows
            .iter()
            .map(|r| {
                [
                    r.id.to_string(),
                    r.call_count.to_string(),
                    escape_terminal(&r.path),
                    escape_terminal(&r.description),
                    r.status().to_string(),
                    escape_terminal(&r.created),
                    r.toggle_label().to_string(),
                ]
            })
            .collect();

        let mut widths = header.map(|h| h.chars().count());
        for row in &cells {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.chars().count());
            }
        }

        let mut push_line = |fields: &[&str]| {
            let line: Vec<String> = fields
                .iter()
                .zip(widths.iter())
                .map(|(f, &w)| format!("{f:<w$}"))
                .collect();
            out.push_str(line.join("  ").trim_end());
            out.push('\n');
        };
        push_line(&header);
        for row in &cells {
            let fields: Vec<&str> = row.iter().map(String::as_str).collect();
            push_line(&fields);
        }
        out
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_terminal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_control() {
            out.extend(c.escape_default());
        } else {
            out.push(c);
        }
    }
    out
}
