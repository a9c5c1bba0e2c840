// OctoPrint REST client.
//
// Two GETs per poll: /api/job for state and progress, /api/printer for
// temperatures. Auth is the X-Api-Key header, sent on every request.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::json::{num, text};
use crate::status::{PrinterState, RawStatus};
use crate::transport::TransportConfig;

/// Client for one OctoPrint instance.
pub struct OctoPrintClient {
    http: reqwest::Client,
    base_url: Url,
}

impl OctoPrintClient {
    /// Build a client with `api_key` installed as a default header.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut key = HeaderValue::from_str(api_key.expose_secret())
            .map_err(|e| Error::InvalidApiKey(e.to_string()))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-Api-Key", key);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Url::parse(base_url)?;
        Ok(Self { http, base_url })
    }

    /// Fetch the current status snapshot.
    pub async fn fetch_status(&self) -> Result<RawStatus, Error> {
        let job = self.get_json("/api/job").await?;
        let printer = self.get_json("/api/printer").await?;
        Ok(snapshot_from_responses(&job, &printer))
    }

    async fn get_json(&self, path: &str) -> Result<Value, Error> {
        let url = self.base_url.join(path)?;
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
            });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }
}

/// Combine the `/api/job` and `/api/printer` responses into one snapshot.
fn snapshot_from_responses(job: &Value, printer: &Value) -> RawStatus {
    // completion is a 0-100 percentage, or null between jobs. Only a real
    // JSON number counts here; OctoPrint never stringifies it.
    let progress = job["progress"]["completion"].as_f64().unwrap_or(0.0) / 100.0;

    let tool0 = &printer["temperature"]["tool0"];
    let bed = &printer["temperature"]["bed"];

    RawStatus {
        state: map_state(job["state"].as_str().unwrap_or("")),
        filename: text(job["job"]["file"].get("name")),
        elapsed_s: num(job["progress"].get("printTime")),
        progress,
        hotend: num(tool0.get("actual")),
        hotend_t: num(tool0.get("target")),
        bed: num(bed.get("actual")),
        bed_t: num(bed.get("target")),
    }
}

/// Map OctoPrint's free-text state onto the canonical enum.
///
/// The text is human-facing prose ("Printing from SD", "Offline after
/// error"), so this is an ordered, case-insensitive substring match.
/// First hit wins.
fn map_state(state_text: &str) -> PrinterState {
    let t = state_text.to_lowercase();
    if t.contains("printing") || t.contains("in progress") {
        PrinterState::Printing
    } else if t.contains("paused") {
        PrinterState::Paused
    } else if t.contains("cancelling") || t.contains("cancelled") {
        PrinterState::Cancelled
    } else if ["complete", "finished", "done"].iter().any(|k| t.contains(k)) {
        PrinterState::Complete
    } else if ["error", "offline", "closed"].iter().any(|k| t.contains(k)) {
        PrinterState::Error
    } else {
        PrinterState::Standby
    }
}
