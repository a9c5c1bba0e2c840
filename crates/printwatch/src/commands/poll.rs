//! `printwatch poll`: one polling pass over the fleet, then print.

use futures_util::future::join_all;

use printwatch_core::{PrinterStatus, StatusStore, fetch_snapshot};

use crate::cli::GlobalOpts;
use crate::commands::fleet_path;
use crate::error::CliError;
use crate::output;

/// Poll every enabled printer concurrently and print the results.
pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let path = fleet_path(global);
    if !path.exists() {
        return Err(CliError::NoFleetFile {
            path: path.display().to_string(),
        });
    }
    let fleet = printwatch_config::load_fleet(&path)?;
    let settings = fleet.global_settings();

    let polls = fleet
        .printer_configs()
        .into_iter()
        .filter(|p| p.enabled)
        .map(|prn| async move {
            if prn.no_scanning {
                return PrinterStatus::no_scanning(&prn);
            }
            let poll_interval = prn.poll_interval.unwrap_or(settings.poll_interval);
            match fetch_snapshot(&prn, poll_interval).await {
                Ok(raw) => PrinterStatus::from_raw(&prn, &raw),
                Err(e) if e.is_unreachable() => PrinterStatus::offline(&prn, e.to_string()),
                Err(e) => PrinterStatus::protocol_error(&prn, e.to_string()),
            }
        });
    let statuses = join_all(polls).await;

    if statuses.is_empty() {
        if !global.quiet {
            eprintln!("no enabled printers in {}", path.display());
        }
        return Ok(());
    }

    // The store keys records by name, which also sorts the output.
    let store = StatusStore::new();
    for status in statuses {
        store.upsert(status.name.clone(), status);
    }

    let color = output::should_color(&global.color);
    let out = output::render(&global.output, &store.snapshot(), color);
    output::print_output(&out, global.quiet);
    Ok(())
}
