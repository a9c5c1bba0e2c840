//! `printwatch init`: write a starter fleet file.

use crate::cli::{GlobalOpts, InitArgs};
use crate::commands::fleet_path;
use crate::error::CliError;

const TEMPLATE: &str = r#"# printwatch fleet file.
# Every printer is one [[printers]] entry; settings apply fleet-wide.

[settings]
poll_interval = 5.0           # seconds between polls
db_reload_interval = 30.0     # seconds between fleet file re-reads
error_report_interval = 30.0  # failure log throttle window, seconds

[[printers]]
id = 1
name = "voron"
backend = "moonraker"         # moonraker | octoprint | centauri
host = "192.168.1.50"
port = 7125
https = false
enabled = true
# token = "..."               # Moonraker bearer token
# api_key = "..."             # OctoPrint API key
# poll_interval = 2.5         # per-printer override, seconds
# error_report_interval = 60.0
# no_scanning = true          # park the printer without polling it
# tasmota_host = "192.168.1.51"
"#;

pub fn handle(args: &InitArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let path = fleet_path(global);
    if path.exists() && !args.force {
        return Err(CliError::FleetFileExists {
            path: path.display().to_string(),
        });
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, TEMPLATE)?;

    if !global.quiet {
        eprintln!("wrote {}", path.display());
    }
    Ok(())
}
