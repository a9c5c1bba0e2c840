//! Command handlers: bridge CLI args to the engine and the fleet file.

pub mod init;
pub mod poll;
pub mod run;

use std::path::PathBuf;

use crate::cli::GlobalOpts;

/// The fleet file in effect: `--config` / `PRINTWATCH_CONFIG`, or the
/// platform default.
pub(crate) fn fleet_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(printwatch_config::default_fleet_path)
}
