//! `printwatch run`: the long-running fleet monitor.

use std::sync::Arc;

use tracing::info;

use printwatch_config::FleetFileRegistry;
use printwatch_core::{FleetSupervisor, StatusStore};

use crate::cli::GlobalOpts;
use crate::commands::fleet_path;
use crate::error::CliError;

/// Supervise the fleet until ctrl-c.
///
/// The fleet file is re-read by the registry on every engine tick, so
/// edits apply live; the eager load here only front-loads the failure
/// when the file is broken at startup.
pub async fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let path = fleet_path(global);
    if !path.exists() {
        return Err(CliError::NoFleetFile {
            path: path.display().to_string(),
        });
    }
    printwatch_config::load_fleet(&path)?;

    let registry = Arc::new(FleetFileRegistry::new(&path));
    let store = Arc::new(StatusStore::new());
    let supervisor = FleetSupervisor::new(registry, store);
    let cancel = supervisor.cancel_token();

    info!(fleet = %path.display(), "printwatch running, ctrl-c to stop");
    let engine = tokio::spawn(supervisor.run());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cancel.cancel();
    let _ = engine.await;
    Ok(())
}
