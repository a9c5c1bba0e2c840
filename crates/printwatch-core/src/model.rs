// Domain model: printer registrations, global settings, and the
// canonical status record the whole fleet shares.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use printwatch_api::{PrinterState, RawStatus};

use crate::normalize;

/// Stable registry identifier for a printer.
///
/// Names are what humans see and what the status store keys on; the id
/// is what survives a rename.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PrinterId(pub i64);

impl std::fmt::Display for PrinterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Which protocol family a printer speaks.
///
/// The aliases cover spellings that have accumulated in fleet files over
/// time; they all parse to the SDCP backend.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum BackendKind {
    // Cleared values in hand-edited fleet files read as the default.
    #[default]
    #[serde(alias = "")]
    #[strum(to_string = "moonraker", serialize = "")]
    Moonraker,
    Octoprint,
    #[serde(alias = "centurio", alias = "centuri", alias = "elegoo")]
    #[strum(
        to_string = "centauri",
        serialize = "centurio",
        serialize = "centuri",
        serialize = "elegoo"
    )]
    Centauri,
}

/// One registry row: everything the engine needs to poll a printer.
///
/// Credentials stay wrapped in [`SecretString`] so they never leak
/// through `Debug` output or logs.
#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub id: PrinterId,
    pub name: String,
    pub backend: BackendKind,
    pub host: String,
    pub port: u16,
    pub https: bool,
    /// Moonraker API token, sent as a bearer header when present.
    pub token: Option<SecretString>,
    /// OctoPrint API key.
    pub api_key: Option<SecretString>,
    /// Per-printer poll interval override, in seconds.
    pub poll_interval: Option<f64>,
    /// Per-printer diagnostic throttle window override, in seconds.
    pub error_report_interval: Option<f64>,
    /// Registered but excluded from polling.
    pub no_scanning: bool,
    pub enabled: bool,
    /// Tasmota power plug wired to this printer, passed through to
    /// consumers untouched. The engine never calls it.
    pub tasmota_host: Option<String>,
}

impl PrinterConfig {
    /// URL scheme as dictated by the TLS flag.
    pub fn scheme(&self) -> &'static str {
        if self.https { "https" } else { "http" }
    }

    /// HTTP base URL for the REST backends.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host, self.port)
    }

    /// Browser link published in the status record.
    pub fn link(&self) -> String {
        format!("{}://{}:{}/", self.scheme(), self.host, self.port)
    }
}

/// Fleet-wide tunables. Monitors re-read these every cycle, so edits
/// apply live.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[allow(clippy::struct_field_names)]
pub struct GlobalSettings {
    /// Seconds between polls; a per-printer override wins.
    pub poll_interval: f64,
    /// Seconds between supervisor reconciliations, floored at 5.
    pub db_reload_interval: f64,
    /// Default diagnostic throttle window, in seconds.
    pub error_report_interval: f64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            poll_interval: 5.0,
            db_reload_interval: 30.0,
            error_report_interval: 30.0,
        }
    }
}

/// The canonical, protocol-agnostic status record: one per printer,
/// keyed by display name in the [`StatusStore`](crate::store::StatusStore).
///
/// Temperatures are `None` only on the static no-scanning placeholder;
/// every polled record carries numbers (zeroed when the device is
/// offline).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrinterStatus {
    pub id: PrinterId,
    pub name: String,
    pub backend: BackendKind,
    pub host: String,
    pub state: PrinterState,
    pub filename: String,
    /// 0-100, one decimal.
    pub progress_pct: f64,
    pub elapsed_s: f64,
    pub eta_s: f64,
    pub elapsed_hms: String,
    pub eta_hms: String,
    pub hotend: Option<f64>,
    pub hotend_t: Option<f64>,
    pub bed: Option<f64>,
    pub bed_t: Option<f64>,
    /// Epoch seconds of the poll that produced this record; 0 on the
    /// static no-scanning placeholder.
    pub last_update: i64,
    pub error: Option<String>,
    pub link: String,
    pub tasmota_host: Option<String>,
    pub no_scanning: bool,
}

impl PrinterStatus {
    /// Placeholder published when a monitor starts, before its first poll.
    pub fn initial(prn: &PrinterConfig) -> Self {
        Self {
            id: prn.id,
            name: prn.name.clone(),
            backend: prn.backend,
            host: prn.host.clone(),
            state: PrinterState::Standby,
            filename: String::new(),
            progress_pct: 0.0,
            elapsed_s: 0.0,
            eta_s: 0.0,
            elapsed_hms: "00:00 min".into(),
            eta_hms: "00:00 min".into(),
            hotend: Some(0.0),
            hotend_t: Some(0.0),
            bed: Some(0.0),
            bed_t: Some(0.0),
            last_update: now_epoch(),
            error: None,
            link: prn.link(),
            tasmota_host: prn.tasmota_host.clone(),
            no_scanning: false,
        }
    }

    /// Static record for a printer excluded from polling.
    pub fn no_scanning(prn: &PrinterConfig) -> Self {
        Self {
            state: PrinterState::NoScanning,
            elapsed_hms: String::new(),
            eta_hms: String::new(),
            hotend: None,
            hotend_t: None,
            bed: None,
            bed_t: None,
            last_update: 0,
            no_scanning: true,
            ..Self::initial(prn)
        }
    }

    /// Full record from a successful poll.
    pub fn from_raw(prn: &PrinterConfig, raw: &RawStatus) -> Self {
        let eta_s = normalize::eta_seconds(raw.progress, raw.elapsed_s);
        Self {
            id: prn.id,
            name: prn.name.clone(),
            backend: prn.backend,
            host: prn.host.clone(),
            state: raw.state,
            filename: raw.filename.clone(),
            progress_pct: normalize::progress_pct(raw.progress),
            elapsed_s: raw.elapsed_s,
            eta_s,
            elapsed_hms: normalize::fmt_hms(raw.elapsed_s),
            eta_hms: normalize::fmt_hms(eta_s),
            hotend: Some(normalize::round1(raw.hotend)),
            hotend_t: Some(normalize::round1(raw.hotend_t)),
            bed: Some(normalize::round1(raw.bed)),
            bed_t: Some(normalize::round1(raw.bed_t)),
            last_update: now_epoch(),
            error: None,
            link: prn.link(),
            tasmota_host: prn.tasmota_host.clone(),
            no_scanning: false,
        }
    }

    /// Record for a printer that failed to answer: identity preserved,
    /// job metrics zeroed.
    pub fn offline(prn: &PrinterConfig, error: String) -> Self {
        Self {
            state: PrinterState::Offline,
            error: Some(error),
            ..Self::initial(prn)
        }
    }

    /// Record for a printer that answered garbage: identity preserved,
    /// job metrics zeroed, state pinned to `error`.
    pub fn protocol_error(prn: &PrinterConfig, error: String) -> Self {
        Self {
            state: PrinterState::Error,
            error: Some(error),
            ..Self::initial(prn)
        }
    }

    /// Carry this snapshot through a transient protocol failure,
    /// refreshing only the error text and the timestamp.
    #[must_use]
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self.last_update = now_epoch();
        self
    }
}

fn now_epoch() -> i64 {
    chrono::Utc::now().timestamp()
}
