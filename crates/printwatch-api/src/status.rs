// Protocol-agnostic status types produced by all three clients.

use serde::{Deserialize, Serialize};

/// Canonical lifecycle state of a printer.
///
/// `Offline` means the device did not answer its last poll; `NoScanning`
/// marks a device that is registered but deliberately excluded from
/// polling. Every other variant comes from (or is derived from) what the
/// device reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrinterState {
    #[default]
    Standby,
    Printing,
    Paused,
    Cancelled,
    Complete,
    Error,
    Offline,
    NoScanning,
}

impl PrinterState {
    /// Lowercase wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standby => "standby",
            Self::Printing => "printing",
            Self::Paused => "paused",
            Self::Cancelled => "cancelled",
            Self::Complete => "complete",
            Self::Error => "error",
            Self::Offline => "offline",
            Self::NoScanning => "no_scanning",
        }
    }

    /// `true` for states that represent an active job.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Printing | Self::Paused)
    }
}

impl std::fmt::Display for PrinterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One status snapshot as reported by a printer, before fleet-level
/// normalization.
///
/// `progress` is a 0..=1 fraction, `elapsed_s` is wall-clock seconds of
/// the active job, temperatures are degrees Celsius. Adapters fill fields
/// the device omits with `0.0` instead of failing the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawStatus {
    pub state: PrinterState,
    pub filename: String,
    pub elapsed_s: f64,
    pub progress: f64,
    pub hotend: f64,
    pub hotend_t: f64,
    pub bed: f64,
    pub bed_t: f64,
}
