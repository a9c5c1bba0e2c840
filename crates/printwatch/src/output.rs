//! Output formatting: fleet status as a table or JSON.
//!
//! Table rendering uses `tabled` with per-state coloring; JSON
//! serializes the status records with their wire field names so the
//! output can feed scripts and dashboards directly.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use printwatch_core::{PrinterState, PrinterStatus};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

// ── Table row ────────────────────────────────────────────────────────

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Backend")]
    backend: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Progress")]
    progress: String,
    #[tabled(rename = "Elapsed")]
    elapsed: String,
    #[tabled(rename = "ETA")]
    eta: String,
    #[tabled(rename = "Hotend")]
    hotend: String,
    #[tabled(rename = "Bed")]
    bed: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

impl StatusRow {
    fn from_status(s: &PrinterStatus, color: bool) -> Self {
        Self {
            name: s.name.clone(),
            backend: s.backend.to_string(),
            state: state_cell(s.state, color),
            file: dash_if_empty(&s.filename),
            progress: format!("{:.1}%", s.progress_pct),
            elapsed: dash_if_empty(&s.elapsed_hms),
            eta: dash_if_empty(&s.eta_hms),
            hotend: temp_cell(s.hotend, s.hotend_t),
            bed: temp_cell(s.bed, s.bed_t),
            updated: age_cell(s.last_update),
        }
    }
}

fn state_cell(state: PrinterState, color: bool) -> String {
    if !color {
        return state.to_string();
    }
    match state {
        PrinterState::Printing => state.to_string().green().to_string(),
        PrinterState::Paused => state.to_string().yellow().to_string(),
        PrinterState::Error | PrinterState::Offline => state.to_string().red().to_string(),
        PrinterState::Complete => state.to_string().cyan().to_string(),
        PrinterState::NoScanning => state.to_string().dimmed().to_string(),
        _ => state.to_string(),
    }
}

fn dash_if_empty(text: &str) -> String {
    if text.is_empty() {
        "-".into()
    } else {
        text.to_owned()
    }
}

/// `actual/target` in one cell; both sides are absent together on
/// no-scanning placeholders.
fn temp_cell(actual: Option<f64>, target: Option<f64>) -> String {
    match (actual, target) {
        (Some(a), Some(t)) => format!("{a:.1}/{t:.1}"),
        _ => "-".into(),
    }
}

/// Age of the record relative to now; placeholders carry no timestamp.
fn age_cell(last_update: i64) -> String {
    if last_update <= 0 {
        return "-".into();
    }
    let age = (chrono::Utc::now().timestamp() - last_update).max(0);
    if age < 60 {
        format!("{age}s ago")
    } else if age < 3600 {
        format!("{}m ago", age / 60)
    } else {
        format!("{}h ago", age / 3600)
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render the fleet in the chosen format.
pub fn render(format: &OutputFormat, statuses: &[PrinterStatus], color: bool) -> String {
    match format {
        OutputFormat::Table => {
            let rows: Vec<StatusRow> = statuses
                .iter()
                .map(|s| StatusRow::from_status(s, color))
                .collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => {
            serde_json::to_string_pretty(statuses).expect("serialization should not fail")
        }
        OutputFormat::JsonCompact => {
            serde_json::to_string(statuses).expect("serialization should not fail")
        }
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
