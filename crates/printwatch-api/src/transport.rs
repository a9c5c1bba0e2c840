// Shared transport configuration for the HTTP clients.

use std::time::Duration;

use crate::error::Error;

/// User-Agent string sent with all HTTP requests.
const USER_AGENT: &str = concat!("printwatch/", env!("CARGO_PKG_VERSION"));

/// Transport settings shared by the Moonraker and OctoPrint clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Per-request timeout, covering connect, write, and body read.
    pub timeout: Duration,
    /// Accept any TLS certificate. Printer web interfaces are almost
    /// universally self-signed, so this defaults to `true`.
    pub accept_invalid_certs: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            accept_invalid_certs: true,
        }
    }
}

impl TransportConfig {
    /// Default config with the given per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a `reqwest::Client` that sends `headers` on every request.
    ///
    /// Used by the OctoPrint client to inject its `X-Api-Key` header.
    pub fn build_client_with_headers(
        &self,
        headers: reqwest::header::HeaderMap,
    ) -> Result<reqwest::Client, Error> {
        self.builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    fn builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        if self.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }

        builder
    }
}
