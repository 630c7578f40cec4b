//! Output formatting: table, JSON, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! JSON uses serde, plain emits tab-separated lines for scripts.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use hanotify_core::{Priority, RenderedNotification};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

fn paint_priority(priority: Priority, text: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }
    match priority {
        Priority::Info => text.cyan().to_string(),
        Priority::Warning => text.yellow().bold().to_string(),
        Priority::Critical => text.red().bold().to_string(),
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, plain rendering uses `plain_fn`.
pub fn render_single<T>(
    format: OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json_pretty(data),
        OutputFormat::Plain => plain_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

pub(crate) fn render_json_pretty<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

/// Single-line JSON, one notification per line while streaming.
pub(crate) fn render_json_compact<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_json::to_string(data).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}

// ── Notifications ────────────────────────────────────────────────────

#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: &'static str,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ActionRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Icon")]
    icon: String,
}

fn flag(value: bool) -> String {
    if value { "yes".into() } else { "no".into() }
}

/// Detail view: field table, body text, then the action buttons.
pub fn notification_detail(n: &RenderedNotification, color: bool) -> String {
    let mut rows = vec![
        FieldRow {
            field: "Title",
            value: paint_priority(n.priority, &n.title, color),
        },
        FieldRow {
            field: "Id",
            value: n.id.to_string(),
        },
        FieldRow {
            field: "Channel",
            value: n.channel.clone(),
        },
        FieldRow {
            field: "Priority",
            value: format!("{} ({}, {})", n.priority, n.tier, n.category),
        },
        FieldRow {
            field: "Ongoing",
            value: flag(n.ongoing),
        },
        FieldRow {
            field: "Full screen",
            value: flag(n.full_screen),
        },
        FieldRow {
            field: "Received",
            value: n
                .received_at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
        },
    ];
    if let Some(summary) = &n.summary {
        rows.push(FieldRow {
            field: "Summary",
            value: summary.clone(),
        });
    }
    if let Some(group) = &n.group {
        rows.push(FieldRow {
            field: "Group",
            value: group.clone(),
        });
    }
    if let Some(timeout) = n.timeout_secs {
        rows.push(FieldRow {
            field: "Timeout",
            value: format!("{timeout}s"),
        });
    }
    if let Some(image) = &n.image {
        rows.push(FieldRow {
            field: "Image",
            value: format!("{} {}x{}", image.format, image.width, image.height),
        });
    }
    if n.require_ack {
        rows.push(FieldRow {
            field: "Ack",
            value: "required".into(),
        });
    }

    let mut out = render_table(&rows);

    let body = n.body_text();
    if !body.is_empty() {
        out.push_str("\n\n");
        out.push_str(&body);
        let links: Vec<&str> = n.body.iter().flat_map(|b| b.links()).collect();
        for link in links {
            out.push_str("\n  -> ");
            out.push_str(link);
        }
    }

    if !n.actions.is_empty() {
        let actions: Vec<ActionRow> = n
            .actions
            .iter()
            .map(|a| ActionRow {
                index: a.index,
                title: a.title.clone(),
                kind: a.action.kind.to_string(),
                icon: a.icon.to_string(),
            })
            .collect();
        out.push_str("\n\n");
        out.push_str(&render_table(&actions));
    }
    out
}

/// `id<TAB>channel<TAB>title<TAB>summary`
pub fn notification_plain(n: &RenderedNotification) -> String {
    format!(
        "{}\t{}\t{}\t{}",
        n.id,
        n.channel,
        n.title,
        n.summary.as_deref().unwrap_or_default()
    )
}
