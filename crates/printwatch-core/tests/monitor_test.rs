#![allow(clippy::unwrap_used)]
// Integration tests for the per-printer monitor loop, driven against
// mock Moonraker endpoints and a live registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use printwatch_core::{
    BackendKind, GlobalSettings, InMemoryRegistry, PrinterConfig, PrinterId, PrinterState,
    StatusStore, monitor_printer,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn moonraker_body(state: &str, filename: &str, progress: f64) -> serde_json::Value {
    serde_json::json!({
        "result": {
            "status": {
                "print_stats": {
                    "state": state,
                    "filename": filename,
                    "print_duration": 600.0,
                },
                "virtual_sdcard": { "progress": progress },
                "extruder": { "temperature": 215.4, "target": 220.0 },
                "heater_bed": { "temperature": 60.1, "target": 60.0 },
            }
        }
    })
}

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

async fn mock_moonraker(body: serde_json::Value) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/printer/objects/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
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

// ── Happy-path tests ────────────────────────────────────────────────

#[tokio::test]
async fn monitor_publishes_normalized_records() {
    let server = mock_moonraker(moonraker_body("printing", "benchy.gcode", 0.25)).await;
    let addr = *server.address();

    let prn = printer_at(7, "voron", addr);
    let registry = Arc::new(InMemoryRegistry::new(
        vec![prn.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        prn,
        cancel.clone(),
    ));

    wait_for(
        || {
            store
                .get("voron")
                .is_some_and(|s| s.state == PrinterState::Printing)
        },
        "a printing record",
    )
    .await;

    let status = store.get("voron").unwrap();
    assert_eq!(status.id, PrinterId(7));
    assert_eq!(status.backend, BackendKind::Moonraker);
    assert_eq!(status.filename, "benchy.gcode");
    assert!((status.progress_pct - 25.0).abs() < f64::EPSILON);
    assert_eq!(status.elapsed_hms, "10:00 min");
    assert_eq!(status.eta_hms, "30:00 min");
    assert!((status.hotend.unwrap() - 215.4).abs() < f64::EPSILON);
    assert!((status.hotend_t.unwrap() - 220.0).abs() < f64::EPSILON);
    assert!((status.bed_t.unwrap() - 60.0).abs() < f64::EPSILON);
    assert!(status.error.is_none());
    assert_eq!(status.link, format!("http://{}:{}/", addr.ip(), addr.port()));

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn renaming_a_printer_moves_its_record() {
    let server = mock_moonraker(moonraker_body("standby", "", 0.0)).await;
    let addr = *server.address();

    let prn = printer_at(4, "old-name", addr);
    let registry = Arc::new(InMemoryRegistry::new(
        vec![prn.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        prn.clone(),
        cancel.clone(),
    ));

    wait_for(|| store.get("old-name").is_some(), "the initial record").await;

    let mut renamed = prn;
    renamed.name = "new-name".into();
    registry.update(vec![renamed], GlobalSettings::default());

    wait_for(|| store.get("new-name").is_some(), "the renamed record").await;
    assert!(store.get("old-name").is_none());

    cancel.cancel();
    task.await.unwrap();
}

// ── Lifecycle tests ─────────────────────────────────────────────────

#[tokio::test]
async fn disabling_a_printer_removes_its_record_and_stops_the_monitor() {
    let server = mock_moonraker(moonraker_body("standby", "", 0.0)).await;
    let addr = *server.address();

    let prn = printer_at(1, "idle", addr);
    let registry = Arc::new(InMemoryRegistry::new(
        vec![prn.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        prn.clone(),
        cancel.clone(),
    ));

    wait_for(|| store.get("idle").is_some(), "the initial record").await;

    let mut disabled = prn;
    disabled.enabled = false;
    registry.update(vec![disabled], GlobalSettings::default());

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor should stop on its own")
        .unwrap();
    assert!(store.get("idle").is_none());
}

#[tokio::test]
async fn flagging_no_scanning_freezes_the_record_and_stops_the_monitor() {
    let server = mock_moonraker(moonraker_body("printing", "vase.gcode", 0.5)).await;
    let addr = *server.address();

    let prn = printer_at(9, "vault", addr);
    let registry = Arc::new(InMemoryRegistry::new(
        vec![prn.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        prn.clone(),
        cancel.clone(),
    ));

    wait_for(
        || {
            store
                .get("vault")
                .is_some_and(|s| s.state == PrinterState::Printing)
        },
        "a printing record",
    )
    .await;

    let mut frozen = prn;
    frozen.no_scanning = true;
    registry.update(vec![frozen], GlobalSettings::default());

    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("monitor should stop on its own")
        .unwrap();

    let status = store.get("vault").unwrap();
    assert_eq!(status.state, PrinterState::NoScanning);
    assert!(status.no_scanning);
    assert_eq!(status.hotend, None);
    assert_eq!(status.last_update, 0);
}

// ── Failure tests ───────────────────────────────────────────────────

#[tokio::test]
async fn unreachable_backend_publishes_an_offline_record() {
    // Start a server only to learn a port, then free it.
    let addr = {
        let server = MockServer::start().await;
        *server.address()
    };

    let prn = printer_at(3, "ghost", addr);
    let registry = Arc::new(InMemoryRegistry::new(
        vec![prn.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let cancel = CancellationToken::new();

    let task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        prn,
        cancel.clone(),
    ));

    wait_for(
        || {
            store
                .get("ghost")
                .is_some_and(|s| s.state == PrinterState::Offline)
        },
        "an offline record",
    )
    .await;

    let status = store.get("ghost").unwrap();
    assert_eq!(status.name, "ghost");
    assert_eq!(status.id, PrinterId(3));
    assert_eq!(status.filename, "");
    assert!(status.progress_pct.abs() < f64::EPSILON);
    assert!(status.error.is_some());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn a_stalled_backend_does_not_block_other_monitors() {
    let stalled = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/printer/objects/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_json(moonraker_body("standby", "", 0.0)),
        )
        .mount(&stalled)
        .await;
    let healthy = mock_moonraker(moonraker_body("printing", "benchy.gcode", 0.25)).await;

    let slow = printer_at(1, "slow", *stalled.address());
    let fast = printer_at(2, "fast", *healthy.address());
    let registry = Arc::new(InMemoryRegistry::new(
        vec![slow.clone(), fast.clone()],
        GlobalSettings::default(),
    ));
    let store = Arc::new(StatusStore::new());
    let cancel = CancellationToken::new();

    let slow_task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        slow,
        cancel.clone(),
    ));
    let fast_task = tokio::spawn(monitor_printer(
        Arc::clone(&registry),
        Arc::clone(&store),
        fast,
        cancel.clone(),
    ));

    wait_for(
        || {
            store
                .get("fast")
                .is_some_and(|s| s.state == PrinterState::Printing)
        },
        "the healthy printer's record",
    )
    .await;

    // The stalled request is still in flight; its neighbor already
    // delivered, and its own record is the untouched initial one.
    let status = store.get("slow").unwrap();
    assert_eq!(status.state, PrinterState::Standby);
    assert!(status.error.is_none());
    assert_eq!(store.snapshot().len(), 2);

    cancel.cancel();
    fast_task.await.unwrap();
    // Still waiting out its HTTP timeout; no need to sit through it.
    slow_task.abort();
}
