#![allow(clippy::unwrap_used)]
// Integration tests for the fleet supervisor: spawning, pruning, and
// shutdown across registry edits.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use printwatch_core::{
    BackendKind, FleetSupervisor, GlobalSettings, InMemoryRegistry, PrinterConfig, PrinterId,
    PrinterState, StatusStore,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn printer_at(id: i64, name: &str, addr: SocketAddr) -> PrinterConfig {
    PrinterConfig {
        id: PrinterId(id),
        name: name.into(),
        backend: BackendKind::Moonraker,
        host: addr.ip().to_string(),
        port: addr.port(),
        https: false,
        token: None,
        api_key: None,
        poll_interval: Some(0.2),
        error_report_interval: None,
        no_scanning: false,
        enabled: true,
        tasmota_host: None,
    }
}

fn no_scanning_printer(id: i64, name: &str) -> PrinterConfig {
    let mut prn = printer_at(id, name, ([127, 0, 0, 1], 7125).into());
    prn.no_scanning = true;
    prn
}

async fn mock_moonraker() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/printer/objects/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "result": {
                "status": {
                    "print_stats": { "state": "standby", "filename": "", "print_duration": 0.0 },
                    "virtual_sdcard": { "progress": 0.0 },
                    "extruder": { "temperature": 21.0, "target": 0.0 },
                    "heater_bed": { "temperature": 21.0, "target": 0.0 },
                }
            }
        })))
        .mount(&server)
        .await;
    server
}

async fn wait_for<F>(mut condition: F, what: &str)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

// ── Reconcile tests ─────────────────────────────────────────────────

#[tokio::test]
async fn reconcile_spawns_monitors_and_publishes_placeholders() {
    let server = mock_moonraker().await;

    let registry = Arc::new(InMemoryRegistry::new(
        vec![
            printer_at(1, "live", *server.address()),
            no_scanning_printer(2, "shelf"),
        ],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let mut supervisor = FleetSupervisor::new(Arc::clone(&registry), Arc::clone(&store));

    supervisor.reconcile();
    assert_eq!(supervisor.task_count(), 1);

    let shelf = store.get("shelf").unwrap();
    assert_eq!(shelf.state, PrinterState::NoScanning);
    assert!(shelf.no_scanning);

    wait_for(
        || {
            store
                .get("live")
                .is_some_and(|s| s.state == PrinterState::Standby)
        },
        "the monitored printer's record",
    )
    .await;

    // A second pass must not double-spawn.
    supervisor.reconcile();
    assert_eq!(supervisor.task_count(), 1);

    supervisor.cancel_token().cancel();
}

#[tokio::test]
async fn a_monitor_flipped_to_no_scanning_becomes_a_placeholder() {
    let server = mock_moonraker().await;

    let prn = printer_at(5, "flip", *server.address());
    let registry = Arc::new(InMemoryRegistry::new(
        vec![prn.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let mut supervisor = FleetSupervisor::new(Arc::clone(&registry), Arc::clone(&store));

    supervisor.reconcile();
    assert_eq!(supervisor.task_count(), 1);
    wait_for(|| store.get("flip").is_some(), "the initial record").await;

    let mut frozen = prn;
    frozen.no_scanning = true;
    registry.update(vec![frozen], GlobalSettings::default());

    // The monitor notices on its next cycle and exits; the supervisor
    // prunes the finished task and takes over with a placeholder.
    wait_for(|| store.get("flip").is_some_and(|s| s.no_scanning), "the frozen record").await;

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        supervisor.reconcile();
        if supervisor.task_count() == 0 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for the monitor task to be pruned"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(store.get("flip").unwrap().no_scanning);
    supervisor.cancel_token().cancel();
}

// ── Run-loop tests ──────────────────────────────────────────────────

#[tokio::test]
async fn run_reconciles_until_cancelled_then_stops() {
    let registry = Arc::new(InMemoryRegistry::new(
        vec![no_scanning_printer(1, "shelf")],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());

    let supervisor = FleetSupervisor::new(Arc::clone(&registry), Arc::clone(&store));
    let cancel = supervisor.cancel_token();
    let engine = tokio::spawn(supervisor.run());

    wait_for(|| store.get("shelf").is_some(), "the placeholder record").await;

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(3), engine)
        .await
        .expect("supervisor should stop promptly")
        .unwrap();
}
