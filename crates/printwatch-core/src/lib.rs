// printwatch-core: fleet monitoring engine between printwatch-api and
// whatever consumes the status records (CLI, dashboards, notifiers).

pub mod model;
pub mod monitor;
pub mod normalize;
pub mod registry;
pub mod store;
pub mod supervisor;

// ── Primary re-exports ──────────────────────────────────────────────
pub use model::{BackendKind, GlobalSettings, PrinterConfig, PrinterId, PrinterStatus};
pub use monitor::{fetch_snapshot, monitor_printer};
pub use printwatch_api::{Error as BackendError, PrinterState, RawStatus};
pub use registry::{DeviceRegistry, InMemoryRegistry, RegistryError};
pub use store::StatusStore;
pub use supervisor::FleetSupervisor;
