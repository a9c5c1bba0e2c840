// ── Device registry ─────────────────────────────────────────────────
//
// The engine does not own printer configuration; it reads whatever the
// surrounding application maintains (a fleet file, a database, a test
// fixture) through this trait. Reads happen once per poll per printer,
// which is what makes edits self-healing: there is no reload signal,
// the next cycle simply sees the new row.

use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::model::{GlobalSettings, PrinterConfig, PrinterId};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("registry data invalid: {0}")]
    Invalid(String),
}

/// Read access to printer registrations and global settings.
///
/// Implementations must tolerate one call per printer per poll cycle;
/// reads are expected to be cheap.
pub trait DeviceRegistry: Send + Sync + 'static {
    /// Every enabled printer.
    fn enabled_printers(&self) -> Result<Vec<PrinterConfig>, RegistryError>;

    /// One printer by id, enabled or not. `Ok(None)` when deleted.
    fn printer(&self, id: PrinterId) -> Result<Option<PrinterConfig>, RegistryError>;

    /// Current global settings.
    fn settings(&self) -> Result<GlobalSettings, RegistryError>;
}

#[derive(Debug, Clone, Default)]
struct Fleet {
    printers: Vec<PrinterConfig>,
    settings: GlobalSettings,
}

/// In-memory registry backed by an atomically swappable snapshot.
///
/// The owner replaces the whole fleet at once with
/// [`update`](Self::update); readers never block. This is the registry
/// used by embedders and tests; file-backed deployments use the
/// implementation in `printwatch-config`.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    inner: ArcSwap<Fleet>,
}

impl InMemoryRegistry {
    pub fn new(printers: Vec<PrinterConfig>, settings: GlobalSettings) -> Self {
        let registry = Self::default();
        registry.update(printers, settings);
        registry
    }

    /// Replace the whole fleet atomically.
    pub fn update(&self, printers: Vec<PrinterConfig>, settings: GlobalSettings) {
        self.inner.store(Arc::new(Fleet { printers, settings }));
    }
}

impl DeviceRegistry for InMemoryRegistry {
    fn enabled_printers(&self) -> Result<Vec<PrinterConfig>, RegistryError> {
        let fleet = self.inner.load();
        Ok(fleet.printers.iter().filter(|p| p.enabled).cloned().collect())
    }

    fn printer(&self, id: PrinterId) -> Result<Option<PrinterConfig>, RegistryError> {
        let fleet = self.inner.load();
        Ok(fleet.printers.iter().find(|p| p.id == id).cloned())
    }

    fn settings(&self) -> Result<GlobalSettings, RegistryError> {
        Ok(self.inner.load().settings)
    }
}
