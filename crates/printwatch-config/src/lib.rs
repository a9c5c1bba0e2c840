//! Fleet configuration for printwatch.
//!
//! The fleet lives in one TOML file: a `[settings]` table of global
//! intervals and a `[[printers]]` array of devices. Loading merges
//! defaults, the file, and `PRINTWATCH_` environment overrides (double
//! underscore splits nesting, so `PRINTWATCH_SETTINGS__POLL_INTERVAL=2.5`
//! overrides `settings.poll_interval`), then validates the result.
//!
//! [`FleetFileRegistry`] adapts the file to `printwatch_core`'s
//! `DeviceRegistry` by re-reading it on every call, so edits apply on
//! the next engine tick without a restart.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use printwatch_core::{
    BackendKind, DeviceRegistry, GlobalSettings, PrinterConfig, PrinterId, RegistryError,
};

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize fleet file: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("fleet file loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML fleet file structs ─────────────────────────────────────────

/// Top-level fleet file: global settings plus the printer roster.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct FleetFile {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub printers: Vec<FleetPrinter>,
}

impl FleetFile {
    /// Global settings in the engine's own type.
    pub fn global_settings(&self) -> GlobalSettings {
        GlobalSettings {
            poll_interval: self.settings.poll_interval,
            db_reload_interval: self.settings.db_reload_interval,
            error_report_interval: self.settings.error_report_interval,
        }
    }

    /// Every printer row translated for the engine, enabled or not.
    pub fn printer_configs(&self) -> Vec<PrinterConfig> {
        self.printers
            .iter()
            .map(FleetPrinter::to_printer_config)
            .collect()
    }
}

/// `[settings]` table: fleet-wide intervals, all in seconds.
#[derive(Debug, Deserialize, Serialize)]
#[allow(clippy::struct_field_names)]
pub struct Settings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: f64,

    #[serde(default = "default_db_reload_interval")]
    pub db_reload_interval: f64,

    #[serde(default = "default_error_report_interval")]
    pub error_report_interval: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            db_reload_interval: default_db_reload_interval(),
            error_report_interval: default_error_report_interval(),
        }
    }
}

fn default_poll_interval() -> f64 {
    5.0
}
fn default_db_reload_interval() -> f64 {
    30.0
}
fn default_error_report_interval() -> f64 {
    30.0
}

/// One `[[printers]]` entry.
#[derive(Debug, Deserialize, Serialize)]
pub struct FleetPrinter {
    /// Stable identifier; monitors track their row by it across renames.
    pub id: i64,

    /// Display name, also the status store key.
    pub name: String,

    #[serde(default)]
    pub backend: BackendKind,

    /// Hostname or IP of the controller.
    pub host: String,

    pub port: u16,

    #[serde(default)]
    pub https: bool,

    /// Moonraker bearer token (plaintext in the fleet file).
    pub token: Option<String>,

    /// OctoPrint API key (plaintext in the fleet file).
    pub api_key: Option<String>,

    /// Per-printer poll cadence override, seconds.
    pub poll_interval: Option<f64>,

    /// Per-printer failure-log throttle override, seconds.
    pub error_report_interval: Option<f64>,

    /// Show a static placeholder instead of polling.
    #[serde(default)]
    pub no_scanning: bool,

    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Tasmota smart-plug host, passed through to status consumers.
    pub tasmota_host: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl FleetPrinter {
    /// Translate to the engine's config row.
    pub fn to_printer_config(&self) -> PrinterConfig {
        PrinterConfig {
            id: PrinterId(self.id),
            name: self.name.clone(),
            backend: self.backend,
            host: self.host.clone(),
            port: self.port,
            https: self.https,
            token: self.token.clone().map(SecretString::from),
            api_key: self.api_key.clone().map(SecretString::from),
            poll_interval: self.poll_interval,
            error_report_interval: self.error_report_interval,
            no_scanning: self.no_scanning,
            enabled: self.enabled,
            tasmota_host: self.tasmota_host.clone(),
        }
    }
}

// ── Fleet file path ─────────────────────────────────────────────────

/// Resolve the fleet file path via XDG / platform conventions.
pub fn default_fleet_path() -> PathBuf {
    ProjectDirs::from("com", "printwatch", "printwatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("fleet.toml");
            p
        },
        |dirs| dirs.config_dir().join("fleet.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("printwatch");
    p
}

// ── Loading and saving ──────────────────────────────────────────────

/// Load the fleet from `path`, merged with defaults and `PRINTWATCH_`
/// environment overrides, then validate it.
///
/// A missing file is not an error: the result is an empty, valid fleet.
pub fn load_fleet(path: &Path) -> Result<FleetFile, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(FleetFile::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("PRINTWATCH_").split("__"));

    let fleet: FleetFile = figment.extract()?;
    validate(&fleet)?;
    Ok(fleet)
}

/// Serialize the fleet to TOML and write it to `path`, creating parent
/// directories as needed.
pub fn save_fleet(path: &Path, fleet: &FleetFile) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(fleet)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation ──────────────────────────────────────────────────────

/// Reject fleets the engine cannot represent. Names must be unique
/// among enabled printers because the status store is keyed by name.
fn validate(fleet: &FleetFile) -> Result<(), ConfigError> {
    check_interval("settings.poll_interval", fleet.settings.poll_interval)?;
    check_interval(
        "settings.db_reload_interval",
        fleet.settings.db_reload_interval,
    )?;
    check_interval(
        "settings.error_report_interval",
        fleet.settings.error_report_interval,
    )?;

    let mut ids = HashSet::new();
    let mut enabled_names = HashSet::new();
    for (i, prn) in fleet.printers.iter().enumerate() {
        if prn.name.trim().is_empty() {
            return Err(invalid(i, "name", "must not be empty".into()));
        }
        if prn.host.trim().is_empty() {
            return Err(invalid(i, "host", "must not be empty".into()));
        }
        if prn.port == 0 {
            return Err(invalid(i, "port", "must be nonzero".into()));
        }
        if !ids.insert(prn.id) {
            return Err(invalid(i, "id", format!("duplicate id {}", prn.id)));
        }
        if prn.enabled && !enabled_names.insert(prn.name.as_str()) {
            return Err(invalid(
                i,
                "name",
                format!("duplicate name '{}' among enabled printers", prn.name),
            ));
        }
        if let Some(v) = prn.poll_interval {
            check_interval(&field_path(i, "poll_interval"), v)?;
        }
        if let Some(v) = prn.error_report_interval {
            check_interval(&field_path(i, "error_report_interval"), v)?;
        }
    }
    Ok(())
}

fn check_interval(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Validation {
            field: field.into(),
            reason: format!("must be a positive number of seconds, got {value}"),
        })
    }
}

fn field_path(index: usize, name: &str) -> String {
    format!("printers[{index}].{name}")
}

fn invalid(index: usize, name: &str, reason: String) -> ConfigError {
    ConfigError::Validation {
        field: field_path(index, name),
        reason,
    }
}

// ── File-backed registry ────────────────────────────────────────────

/// `DeviceRegistry` served straight from the fleet file.
///
/// Every call re-reads and re-validates the file, so external edits are
/// picked up on the engine's next tick. A read failure only skips that
/// tick; monitors keep running on their cached rows.
#[derive(Debug, Clone)]
pub struct FleetFileRegistry {
    path: PathBuf,
}

impl FleetFileRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<FleetFile, RegistryError> {
        load_fleet(&self.path).map_err(|e| match e {
            ConfigError::Io(io) => RegistryError::Io(io),
            other => RegistryError::Invalid(other.to_string()),
        })
    }
}

impl DeviceRegistry for FleetFileRegistry {
    fn enabled_printers(&self) -> Result<Vec<PrinterConfig>, RegistryError> {
        Ok(self
            .load()?
            .printers
            .iter()
            .filter(|p| p.enabled)
            .map(FleetPrinter::to_printer_config)
            .collect())
    }

    fn printer(&self, id: PrinterId) -> Result<Option<PrinterConfig>, RegistryError> {
        Ok(self
            .load()?
            .printers
            .iter()
            .find(|p| p.id == id.0)
            .map(FleetPrinter::to_printer_config))
    }

    fn settings(&self) -> Result<GlobalSettings, RegistryError> {
        Ok(self.load()?.global_settings())
    }
}
