// Elegoo SDCP WebSocket client (Centauri Carbon family).
//
// The device serves an unauthenticated WebSocket on port 3030. A text
// "ping" nudges current firmware into pushing a full report; the client
// then reads frames until one carries a top-level "Status" object.
// Sessions are deliberately short-lived: connect, ping, read, close —
// one per poll. Firmware drops idle sessions aggressively, so holding a
// socket open across cycles buys nothing.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, connect_async};
use tracing::debug;

use crate::error::Error;
use crate::json::{num, text};
use crate::status::{PrinterState, RawStatus};

/// Fixed SDCP service port on the device.
pub const SDCP_PORT: u16 = 3030;
/// WebSocket path served by the device.
const SDCP_PATH: &str = "/websocket";
/// Grace period for the closing handshake after the exchange.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// Client for one SDCP device.
pub struct SdcpClient {
    host: String,
    port: u16,
    timeout: Duration,
}

impl SdcpClient {
    /// Client for `host`, with `timeout` bounding the whole exchange
    /// (connect, ping, and status read together).
    pub fn new(host: impl Into<String>, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port: SDCP_PORT,
            timeout,
        }
    }

    /// Override the service port (port forwards, test rigs).
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Fetch the current status snapshot.
    ///
    /// The socket is closed before returning on every path; close errors
    /// are ignored because the firmware usually just drops the TCP stream.
    pub async fn fetch_status(&self) -> Result<RawStatus, Error> {
        let deadline = Instant::now() + self.timeout;
        let url = format!("ws://{}:{}{}", self.host, self.port, SDCP_PATH);
        debug!("SDCP connect {url}");

        let (mut ws, _response) =
            match tokio::time::timeout_at(deadline, connect_async(url.as_str())).await {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => return Err(Error::WebSocketConnect(e.to_string())),
                Err(_) => return Err(self.timeout_error()),
            };

        let result = self.status_exchange(&mut ws, deadline).await;
        let _ = tokio::time::timeout(CLOSE_GRACE, ws.close(None)).await;
        result
    }

    /// Drive the ping and read frames until a status report arrives.
    async fn status_exchange<S>(
        &self,
        ws: &mut WebSocketStream<S>,
        deadline: Instant,
    ) -> Result<RawStatus, Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        // Current firmware pushes reports on its own cadence; the ping
        // makes it answer immediately instead.
        match tokio::time::timeout_at(deadline, ws.send(Message::Text("ping".into()))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(Error::WebSocket(format!("ping failed: {e}"))),
            Err(_) => return Err(self.timeout_error()),
        }

        loop {
            let frame = match tokio::time::timeout_at(deadline, ws.next()).await {
                Ok(frame) => frame,
                Err(_) => return Err(self.timeout_error()),
            };

            match frame {
                Some(Ok(Message::Text(body))) => {
                    if let Some(snapshot) = parse_status_frame(body.as_str()) {
                        return Ok(snapshot);
                    }
                    // Ack frames and attribute pushes are normal traffic.
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(Error::WebSocket(
                        "connection closed before a status report".into(),
                    ));
                }
                Some(Ok(_)) => {
                    // Binary, Ping, Pong frames carry nothing we need.
                }
                Some(Err(e)) => return Err(Error::WebSocket(e.to_string())),
            }
        }
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            timeout_secs: self.timeout.as_secs(),
        }
    }
}

/// Parse one text frame. `None` means "not a status report" (non-JSON
/// keep-alives, command acks) and the caller keeps reading.
fn parse_status_frame(body: &str) -> Option<RawStatus> {
    let root: Value = serde_json::from_str(body).ok()?;
    let status = root.get("Status")?;
    Some(snapshot_from_status(status))
}

/// Build a [`RawStatus`] from the "Status" object of an SDCP report.
///
/// Temperatures live on the Status object itself; everything job-related
/// sits under PrintInfo. A report without PrintInfo is an idle printer.
fn snapshot_from_status(status: &Value) -> RawStatus {
    let info = &status["PrintInfo"];

    let elapsed = num(info.get("CurrentTicks"));
    let total = num(info.get("TotalTicks"));
    let raw_progress = num(info.get("Progress"));
    let progress = normalize_progress(raw_progress, elapsed, total);
    let filename = text(info.get("Filename"));

    let mut state = state_from_code(num(info.get("Status")));
    state = force_printing_when_mid_progress(state, progress);
    state = force_complete_when_done(state, progress, elapsed, total);
    state = force_printing_when_job_active(state, &filename, elapsed, raw_progress);

    RawStatus {
        state,
        filename,
        elapsed_s: elapsed,
        progress,
        hotend: num(status.get("TempOfNozzle")),
        hotend_t: num(status.get("TempTargetNozzle")),
        bed: num(status.get("TempOfHotbed")),
        bed_t: num(status.get("TempTargetHotbed")),
    }
}

/// Firmware revisions disagree about the Progress field: some send a
/// 0-100 percentage, some a 0-1 fraction, some omit it entirely. Fall
/// back to the tick counters when the field is unusable.
fn normalize_progress(raw: f64, elapsed: f64, total: f64) -> f64 {
    if raw > 1.0 {
        raw / 100.0
    } else if raw > 0.0 {
        raw
    } else if total > 0.0 {
        (elapsed / total).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Status codes observed on Centauri firmware. Code 3 is reported after
/// a user stop, shown to the fleet as cancelled.
fn state_from_code(code: f64) -> PrinterState {
    match code as i64 {
        1 => PrinterState::Printing,
        2 => PrinterState::Paused,
        3 => PrinterState::Cancelled,
        4 => PrinterState::Complete,
        _ => PrinterState::Standby,
    }
}

// ── State guards ────────────────────────────────────────────────────────
//
// The firmware frequently reports code 0 (standby) while a job is
// demonstrably running. Each guard is a narrow correction applied on top
// of the reported code, in this order.

/// A job between 0% and 100% means the printer is printing, whatever the
/// status code claims.
fn force_printing_when_mid_progress(state: PrinterState, progress: f64) -> PrinterState {
    if progress > 0.0 && progress < 1.0 {
        PrinterState::Printing
    } else {
        state
    }
}

/// Full progress, or elapsed ticks catching up with the total, means the
/// job finished even when the code has not caught up yet.
fn force_complete_when_done(
    state: PrinterState,
    progress: f64,
    elapsed: f64,
    total: f64,
) -> PrinterState {
    if progress >= 1.0 || (total > 0.0 && elapsed >= total) {
        PrinterState::Complete
    } else {
        state
    }
}

/// Standby with a loaded file plus any evidence of activity (elapsed
/// ticks or a raw progress value) is an under-reported active job.
fn force_printing_when_job_active(
    state: PrinterState,
    filename: &str,
    elapsed: f64,
    raw_progress: f64,
) -> PrinterState {
    if state == PrinterState::Standby
        && !filename.is_empty()
        && (elapsed > 0.0 || raw_progress > 0.0)
    {
        PrinterState::Printing
    } else {
        state
    }
}
