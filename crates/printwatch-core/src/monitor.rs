// ── Per-printer monitor task ────────────────────────────────────────
//
// One task per enabled printer. Every cycle re-reads the printer's
// registry row, polls the matching backend, normalizes the answer, and
// publishes one record to the shared store. A failing printer degrades
// only its own record; the cadence of the loop is also the retry
// cadence, so there is no separate backoff machinery.
//
// Monitors stop themselves: when the row disappears, is disabled, or is
// flagged no-scanning, the task removes (or freezes) its record and
// returns. The supervisor never kills a monitor, it only spawns them.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use printwatch_api::{
    Error, MoonrakerClient, OctoPrintClient, PrinterState, RawStatus, SdcpClient, TransportConfig,
};
use secrecy::SecretString;

use crate::model::{BackendKind, GlobalSettings, PrinterConfig, PrinterStatus};
use crate::registry::DeviceRegistry;
use crate::store::StatusStore;

/// Lower bound on the per-cycle sleep, whatever the configured interval.
const MIN_SLEEP: Duration = Duration::from_millis(200);
/// REST timeout: poll interval plus margin, floored.
const HTTP_TIMEOUT_FLOOR_SECS: f64 = 5.0;
const HTTP_TIMEOUT_MARGIN_SECS: f64 = 2.0;
/// SDCP round-trips are slower; two cycles, floored at 10s.
const SDCP_TIMEOUT_FLOOR_SECS: f64 = 10.0;
/// Throttle window used when the configured one cannot be represented.
const FALLBACK_REPORT_WINDOW: Duration = Duration::from_secs(30);

/// Run the polling loop for one printer until the row tells it to stop
/// or the process-wide token cancels.
///
/// `prn` is only the starting row. Connection fields, credentials, and
/// flags are re-read from the registry every cycle, so edits apply on
/// the next poll without restarting the task.
pub async fn monitor_printer<R: DeviceRegistry>(
    registry: Arc<R>,
    store: Arc<StatusStore>,
    prn: PrinterConfig,
    cancel: CancellationToken,
) {
    let id = prn.id;
    let mut row = prn;
    let mut published_name = row.name.clone();
    let mut last_status = PrinterStatus::initial(&row);
    let mut throttle = ReportThrottle::new();

    store.upsert(published_name.clone(), last_status.clone());

    while !cancel.is_cancelled() {
        // Fresh row first: a deleted or disabled printer ends the task.
        match registry.printer(id) {
            Ok(Some(current)) if current.enabled => {
                if current.name != published_name {
                    // Renamed: drop the record under the old key.
                    store.remove(&published_name);
                    published_name.clone_from(&current.name);
                }
                row = current;
            }
            Ok(_) => {
                debug!(printer = %published_name, "row deleted or disabled, monitor stopping");
                store.remove(&published_name);
                return;
            }
            Err(e) => {
                // Transient registry trouble: keep polling with the last
                // known row rather than killing the task.
                warn!(printer = %published_name, error = %e, "registry read failed");
            }
        }

        if row.no_scanning {
            store.upsert(published_name.clone(), PrinterStatus::no_scanning(&row));
            debug!(printer = %published_name, "no_scanning set, monitor stopping");
            return;
        }

        let settings = registry.settings().unwrap_or_default();
        let poll_interval = row.poll_interval.unwrap_or(settings.poll_interval);

        match fetch_snapshot(&row, poll_interval).await {
            Ok(raw) => {
                let mut status = PrinterStatus::from_raw(&row, &raw);
                if row.backend == BackendKind::Centauri {
                    status.state = hold_printing_through_warmup(&last_status, &raw, status.state);
                }
                throttle.reset();
                store.upsert(published_name.clone(), status.clone());
                last_status = status;
            }
            Err(e) => {
                let status = status_after_failure(&row, &last_status, &e);
                store.upsert(published_name.clone(), status.clone());
                last_status = status;

                let text = format!("{} error: {e}", row.backend);
                report_failure(&mut throttle, &row, &settings, &published_name, &text);
            }
        }

        let sleep = Duration::try_from_secs_f64(poll_interval)
            .unwrap_or(MIN_SLEEP)
            .max(MIN_SLEEP);
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(sleep) => {}
        }
    }
}

/// One poll of the backend named in the row, whatever the protocol.
///
/// Timeouts scale with the poll interval so a slow device cannot stack
/// requests: REST backends get the interval plus fixed headroom, SDCP
/// gets two intervals (its WebSocket round-trips are slow). Clients are
/// rebuilt per call because the timeout derives from a live-editable
/// interval.
pub async fn fetch_snapshot(
    prn: &PrinterConfig,
    poll_interval: f64,
) -> Result<RawStatus, Error> {
    match prn.backend {
        BackendKind::Moonraker => {
            let timeout = secs(
                HTTP_TIMEOUT_FLOOR_SECS.max(poll_interval + HTTP_TIMEOUT_MARGIN_SECS),
                HTTP_TIMEOUT_FLOOR_SECS,
            );
            let transport = TransportConfig::with_timeout(timeout);
            let client = MoonrakerClient::new(&prn.base_url(), prn.token.clone(), &transport)?;
            client.fetch_status().await
        }
        BackendKind::Octoprint => {
            let timeout = secs(
                HTTP_TIMEOUT_FLOOR_SECS.max(poll_interval + HTTP_TIMEOUT_MARGIN_SECS),
                HTTP_TIMEOUT_FLOOR_SECS,
            );
            let transport = TransportConfig::with_timeout(timeout);
            let api_key = prn
                .api_key
                .clone()
                .unwrap_or_else(|| SecretString::from(""));
            let client = OctoPrintClient::from_api_key(&prn.base_url(), &api_key, &transport)?;
            client.fetch_status().await
        }
        BackendKind::Centauri => {
            let timeout = secs(
                SDCP_TIMEOUT_FLOOR_SECS.max(poll_interval * 2.0),
                SDCP_TIMEOUT_FLOOR_SECS,
            );
            SdcpClient::new(prn.host.clone(), timeout).fetch_status().await
        }
    }
}

/// Centauri firmware reports standby briefly while re-heating between
/// phases of an active job. If the printer was just printing and still
/// shows signs of life, keep showing printing.
fn hold_printing_through_warmup(
    prev: &PrinterStatus,
    raw: &RawStatus,
    state: PrinterState,
) -> PrinterState {
    if prev.state == PrinterState::Printing
        && state == PrinterState::Standby
        && (raw.progress > 0.0 || raw.hotend_t > 0.0 || raw.bed_t > 0.0)
    {
        PrinterState::Printing
    } else {
        state
    }
}

/// Derive the record to publish when a poll fails.
///
/// Unreachable devices go offline with zeroed job metrics. SDCP reads
/// drop frames routinely, so a Centauri protocol error keeps the last
/// good snapshot on display with the error attached; a REST protocol
/// error replaces the record outright.
fn status_after_failure(row: &PrinterConfig, last: &PrinterStatus, err: &Error) -> PrinterStatus {
    if err.is_unreachable() {
        PrinterStatus::offline(row, err.to_string())
    } else if row.backend == BackendKind::Centauri {
        last.clone().with_error(err.to_string())
    } else {
        PrinterStatus::protocol_error(row, err.to_string())
    }
}

fn report_failure(
    throttle: &mut ReportThrottle,
    row: &PrinterConfig,
    settings: &GlobalSettings,
    name: &str,
    text: &str,
) {
    let window_secs = row
        .error_report_interval
        .unwrap_or(settings.error_report_interval);
    let window =
        Duration::try_from_secs_f64(window_secs).unwrap_or(FALLBACK_REPORT_WINDOW);

    if throttle.should_report(text, window) {
        warn!(printer = %name, attempt = throttle.consecutive(), "{text}");
    }
}

/// `Duration` from a configured float, falling back when the value is
/// not representable (negative, NaN, absurdly large).
fn secs(value: f64, fallback: f64) -> Duration {
    Duration::try_from_secs_f64(value)
        .or_else(|_| Duration::try_from_secs_f64(fallback))
        .unwrap_or(MIN_SLEEP)
}

/// Decides which failure diagnostics actually reach the log.
///
/// Emits on the first failure of a streak, whenever the message text
/// changes, and at most once per window while an identical failure
/// persists. The attempt counter stays out of the compared text; it is
/// attached as a log field instead, because folding it into the message
/// would make every message "new" and defeat the window.
#[derive(Debug, Default)]
pub struct ReportThrottle {
    consecutive: u64,
    last_text: Option<String>,
    last_emit: Option<Instant>,
}

impl ReportThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one failure; `true` means the caller should log it.
    pub fn should_report(&mut self, text: &str, window: Duration) -> bool {
        self.consecutive += 1;
        let now = Instant::now();

        let emit = self.consecutive == 1
            || self.last_text.as_deref() != Some(text)
            || self.last_emit.is_none_or(|at| now.duration_since(at) >= window);

        if emit {
            self.last_text = Some(text.to_owned());
            self.last_emit = Some(now);
        }
        emit
    }

    /// A successful poll clears the failure streak.
    pub fn reset(&mut self) {
        self.consecutive = 0;
        self.last_text = None;
        self.last_emit = None;
    }

    /// Failures since the last success.
    pub fn consecutive(&self) -> u64 {
        self.consecutive
    }
}
