// ── Fleet supervisor ────────────────────────────────────────────────
//
// Reconciles running monitor tasks against the registry on a fixed
// cadence. Spawn-only: a monitor that should stop discovers that on its
// own next cycle, so the supervisor never races a task over a record.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{PrinterId, PrinterStatus};
use crate::monitor::monitor_printer;
use crate::registry::DeviceRegistry;
use crate::store::StatusStore;

/// Reconciliation floor; the registry can ask for more, never less.
const MIN_RELOAD_SECS: f64 = 5.0;
/// Patience for monitors to notice cancellation on shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Keeps one monitor task alive per enabled printer and one static
/// placeholder per no-scanning printer.
///
/// All monitors share this supervisor's cancellation token; cancelling
/// it (or calling [`run`](Self::run) to completion) is the only process
/// shutdown path.
pub struct FleetSupervisor<R: DeviceRegistry> {
    registry: Arc<R>,
    store: Arc<StatusStore>,
    cancel: CancellationToken,
    tasks: HashMap<PrinterId, JoinHandle<()>>,
    /// Placeholders this supervisor published, id to name, so they can
    /// be dropped when the printer disappears or is renamed.
    placeholders: HashMap<PrinterId, String>,
}

impl<R: DeviceRegistry> FleetSupervisor<R> {
    pub fn new(registry: Arc<R>, store: Arc<StatusStore>) -> Self {
        Self {
            registry,
            store,
            cancel: CancellationToken::new(),
            tasks: HashMap::new(),
            placeholders: HashMap::new(),
        }
    }

    /// Token that stops this supervisor and every monitor it spawned.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Reconcile immediately, then on every reload tick until cancelled;
    /// joins the monitors on the way out.
    pub async fn run(mut self) {
        info!("fleet supervisor started");
        while !self.cancel.is_cancelled() {
            self.reconcile();

            let reload = self.reload_interval();
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(reload) => {}
            }
        }
        self.shutdown().await;
    }

    /// One reconciliation pass: prune finished tasks and stale
    /// placeholders, publish placeholders for no-scanning printers, and
    /// spawn monitors for enabled printers without a live task.
    pub fn reconcile(&mut self) {
        let printers = match self.registry.enabled_printers() {
            Ok(printers) => printers,
            Err(e) => {
                // Skip the tick; monitors keep running on cached rows.
                warn!(error = %e, "registry reload failed");
                return;
            }
        };

        self.tasks.retain(|_, handle| !handle.is_finished());

        // A placeholder goes stale when its printer vanished, was
        // renamed, was disabled, or went back to being scanned.
        self.placeholders.retain(|id, name| {
            let keep = printers
                .iter()
                .any(|p| p.id == *id && p.no_scanning && p.name == *name);
            if !keep {
                self.store.remove(name);
            }
            keep
        });

        for prn in printers {
            if prn.no_scanning {
                self.placeholders.insert(prn.id, prn.name.clone());
                self.store
                    .upsert(prn.name.clone(), PrinterStatus::no_scanning(&prn));
                continue;
            }

            if let Entry::Vacant(slot) = self.tasks.entry(prn.id) {
                debug!(printer = %prn.name, id = %prn.id, backend = %prn.backend, "spawning monitor");
                let handle = tokio::spawn(monitor_printer(
                    Arc::clone(&self.registry),
                    Arc::clone(&self.store),
                    prn,
                    self.cancel.clone(),
                ));
                slot.insert(handle);
            }
        }
    }

    /// Monitors currently believed alive (as of the last reconcile).
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    fn reload_interval(&self) -> Duration {
        let settings = self.registry.settings().unwrap_or_default();
        Duration::try_from_secs_f64(settings.db_reload_interval.max(MIN_RELOAD_SECS))
            .unwrap_or(Duration::from_secs(30))
    }

    /// Give every monitor a bounded window to finish its in-flight
    /// cycle. A task wedged in a hung request gets abandoned, not
    /// awaited forever.
    async fn shutdown(&mut self) {
        info!(tasks = self.tasks.len(), "fleet supervisor stopping");
        for (id, handle) in self.tasks.drain() {
            if tokio::time::timeout(JOIN_TIMEOUT, handle).await.is_err() {
                warn!(id = %id, "monitor did not stop within the join window");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{BackendKind, GlobalSettings, PrinterConfig};
    use crate::registry::InMemoryRegistry;

    fn no_scanning_printer(id: i64, name: &str) -> PrinterConfig {
        PrinterConfig {
            id: PrinterId(id),
            name: name.into(),
            backend: BackendKind::Moonraker,
            host: "127.0.0.1".into(),
            port: 7125,
            https: false,
            token: None,
            api_key: None,
            poll_interval: None,
            error_report_interval: None,
            no_scanning: true,
            enabled: true,
            tasmota_host: None,
        }
    }

    #[tokio::test]
    async fn reconcile_publishes_and_prunes_placeholders() {
        let registry = Arc::new(InMemoryRegistry::new(
            vec![no_scanning_printer(1, "shelf")],
            GlobalSettings::default(),
        ));
        let store = Arc::new(StatusStore::new());
        let mut supervisor = FleetSupervisor::new(Arc::clone(&registry), Arc::clone(&store));

        supervisor.reconcile();
        assert!(store.get("shelf").unwrap().no_scanning);
        assert_eq!(supervisor.task_count(), 0);

        // Renamed: the old key must not linger.
        registry.update(
            vec![no_scanning_printer(1, "attic")],
            GlobalSettings::default(),
        );
        supervisor.reconcile();
        assert!(store.get("shelf").is_none());
        assert!(store.get("attic").unwrap().no_scanning);

        // Deleted: the placeholder goes with it.
        registry.update(Vec::new(), GlobalSettings::default());
        supervisor.reconcile();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn reconcile_skips_a_tick_on_registry_failure() {
        // Registry that always fails.
        struct Broken;
        impl DeviceRegistry for Broken {
            fn enabled_printers(&self) -> Result<Vec<PrinterConfig>, crate::RegistryError> {
                Err(crate::RegistryError::Invalid("corrupt".into()))
            }
            fn printer(
                &self,
                _id: PrinterId,
            ) -> Result<Option<PrinterConfig>, crate::RegistryError> {
                Err(crate::RegistryError::Invalid("corrupt".into()))
            }
            fn settings(&self) -> Result<GlobalSettings, crate::RegistryError> {
                Err(crate::RegistryError::Invalid("corrupt".into()))
            }
        }

        let store = Arc::new(StatusStore::new());
        let mut supervisor = FleetSupervisor::new(Arc::new(Broken), Arc::clone(&store));

        supervisor.reconcile();
        assert_eq!(supervisor.task_count(), 0);
        assert!(store.is_empty());
    }
}
