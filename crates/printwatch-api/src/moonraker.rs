// Moonraker (Klipper) REST client.
//
// A single object-query GET returns everything the fleet needs: job
// state, filename, elapsed time, SD-card progress, and both heaters.

use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::json::{num, text};
use crate::status::{PrinterState, RawStatus};
use crate::transport::TransportConfig;

/// Object query selecting exactly the fields the fleet consumes.
const OBJECTS_QUERY: &str = "/printer/objects/query\
    ?print_stats=state,filename,print_duration\
    &virtual_sdcard=progress\
    &extruder=temperature,target\
    &heater_bed=temperature,target";

/// Client for one Moonraker instance.
pub struct MoonrakerClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<SecretString>,
}

impl MoonrakerClient {
    /// Build a client for `base_url` (scheme, host, and port).
    ///
    /// `token` is the optional API token, sent as a bearer header on
    /// every request when present.
    pub fn new(
        base_url: &str,
        token: Option<SecretString>,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Url::parse(base_url)?;
        Ok(Self {
            http,
            base_url,
            token,
        })
    }

    /// Fetch the current status snapshot.
    pub async fn fetch_status(&self) -> Result<RawStatus, Error> {
        let url = self.base_url.join(OBJECTS_QUERY)?;
        debug!("GET {url}");

        let mut request = self.http.get(url);
        if let Some(ref token) = self.token {
            request = request.bearer_auth(token.expose_secret());
        }

        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        let root: Value = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })?;

        Ok(snapshot_from_query(&root))
    }
}

/// Extract a [`RawStatus`] from an object-query response.
///
/// Missing sections zero their fields rather than erroring: Klipper
/// omits objects that are not configured (a bedless printer has no
/// `heater_bed`), and a response without `result.status` entirely is
/// still a well-formed answer.
fn snapshot_from_query(root: &Value) -> RawStatus {
    let status = &root["result"]["status"];
    let stats = &status["print_stats"];
    let sdcard = &status["virtual_sdcard"];
    let extruder = &status["extruder"];
    let bed = &status["heater_bed"];

    RawStatus {
        state: map_state(stats["state"].as_str().unwrap_or("")),
        filename: text(stats.get("filename")),
        elapsed_s: num(stats.get("print_duration")),
        progress: num(sdcard.get("progress")),
        hotend: num(extruder.get("temperature")),
        hotend_t: num(extruder.get("target")),
        bed: num(bed.get("temperature")),
        bed_t: num(bed.get("target")),
    }
}

/// Klipper state strings map 1:1 onto the canonical enum; anything
/// unrecognized is treated as standby.
fn map_state(state: &str) -> PrinterState {
    match state {
        "printing" => PrinterState::Printing,
        "paused" => PrinterState::Paused,
        "complete" => PrinterState::Complete,
        "cancelled" => PrinterState::Cancelled,
        "error" => PrinterState::Error,
        _ => PrinterState::Standby,
    }
}
