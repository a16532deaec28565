//! Tunables for toolbox operations.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of IP analyses allowed in flight per batch.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 10;

/// Largest batch accepted by [`crate::ToolboxService::bulk_analyze_ips`].
pub const DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// ipinfo.io-compatible geolocation endpoint.
pub const DEFAULT_GEOLOCATION_URL: &str = "https://ipinfo.io";

/// Toolbox configuration.
///
/// Every field has a default, so an empty `[toolbox]` table (or none at all)
/// yields a working setup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolboxConfig {
    /// Maximum concurrent IP analyses in one batch.
    pub batch_concurrency: usize,
    /// Maximum number of IPs in one batch request.
    pub max_batch_size: usize,
    /// Base URL of the geolocation service; `/{ip}/json` is appended.
    pub geolocation_url: String,
    /// Timeout for a single outbound HTTP request, in seconds.
    pub http_timeout_secs: u64,
    /// Number of TCP connect probes per performance check.
    pub probe_count: u32,
    /// Port used for TCP connect probes.
    pub probe_port: u16,
    /// Timeout for one TCP connect probe, in milliseconds.
    pub probe_timeout_ms: u64,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            http_timeout_secs: 10,
            probe_count: 10,
            probe_port: 443,
            probe_timeout_ms: 2_000,
        }
    }
}

impl ToolboxConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}
