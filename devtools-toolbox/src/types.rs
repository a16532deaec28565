//! Public types returned by toolbox operations.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// DNS query type for lookup operations.
///
/// Includes the supported record types plus [`All`](Self::All), which fans
/// out over [`DnsQueryType::FAN_OUT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DnsQueryType {
    /// IPv4 address record.
    A,
    /// IPv6 address record.
    Aaaa,
    /// Mail exchange record.
    Mx,
    /// Name server record.
    Ns,
    /// Text record.
    Txt,
    /// Canonical name (alias) record.
    Cname,
    /// Pointer record (reverse DNS).
    Ptr,
    /// Query every type in [`DnsQueryType::FAN_OUT`].
    All,
}

impl DnsQueryType {
    /// Record types queried by [`DnsQueryType::All`].
    pub const FAN_OUT: [Self; 6] = [
        Self::A,
        Self::Aaaa,
        Self::Mx,
        Self::Ns,
        Self::Txt,
        Self::Cname,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Aaaa => "AAAA",
            Self::Mx => "MX",
            Self::Ns => "NS",
            Self::Txt => "TXT",
            Self::Cname => "CNAME",
            Self::Ptr => "PTR",
            Self::All => "ALL",
        }
    }
}

impl fmt::Display for DnsQueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DnsQueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "AAAA" => Ok(Self::Aaaa),
            "MX" => Ok(Self::Mx),
            "NS" => Ok(Self::Ns),
            "TXT" => Ok(Self::Txt),
            "CNAME" => Ok(Self::Cname),
            "PTR" => Ok(Self::Ptr),
            "ALL" => Ok(Self::All),
            _ => Err(format!("unsupported record type: {s}")),
        }
    }
}

/// A single DNS record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Owner name as queried.
    pub name: String,
    /// Record type (e.g. `"A"`, `"MX"`).
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record value.
    ///
    /// `MX` values are `"<preference> <exchange>"`; trailing dots are removed
    /// from domain names.
    pub value: String,
    /// Time-to-live in seconds, as reported by the resolver.
    pub ttl: u32,
}

/// Result of a DNS lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DnsLookupResult {
    /// The queried domain (IDNA-normalised).
    pub domain: String,
    /// Resolver used: the custom nameserver IP, or a label for the system configuration.
    pub nameserver: String,
    pub records: Vec<DnsRecord>,
    pub timestamp: DateTime<Utc>,
    pub query_time_ms: u64,
}

/// IP protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IpVersion {
    #[serde(rename = "IPv4")]
    V4,
    #[serde(rename = "IPv6")]
    V6,
}

/// Address classification, checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IpCategory {
    Private,
    Loopback,
    Multicast,
    LinkLocal,
    Public,
}

/// Geolocation section of [`IpInfo`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 code.
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub postal: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// IANA timezone identifier.
    pub timezone: Option<String>,
}

/// ISP / network section of [`IpInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IspInfo {
    pub provider: Option<String>,
    pub organization: Option<String>,
    /// Autonomous System Number (e.g. `"AS13335"`).
    pub asn: Option<String>,
    pub asn_name: Option<String>,
    /// Registrable part of the reverse hostname.
    pub domain: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reputation {
    Good,
    Neutral,
    Bad,
}

/// Basic security heuristics for an address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityInfo {
    pub is_proxy: bool,
    pub is_vpn: bool,
    pub is_tor: bool,
    pub is_threat: bool,
    /// 0-100.
    pub risk_score: u8,
    pub reputation: Reputation,
}

/// Reverse DNS section of [`IpInfo`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReverseDnsInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ptr: Vec<String>,
}

/// Analysis of a single IP address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpInfo {
    pub ip: String,
    pub version: IpVersion,
    #[serde(rename = "type")]
    pub category: IpCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geolocation: Option<GeoInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isp: Option<IspInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security: Option<SecurityInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dns: Option<ReverseDnsInfo>,
    pub timestamp: DateTime<Utc>,
}

const fn enabled() -> bool {
    true
}

/// Sections to include in each analysis. Omitted flags are on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisOptions {
    /// Geolocation and ISP lookup (one outbound HTTP call).
    #[serde(default = "enabled")]
    pub include_geolocation: bool,
    #[serde(default = "enabled")]
    pub include_security: bool,
    /// Reverse DNS lookup.
    #[serde(default = "enabled")]
    pub include_dns: bool,
    /// Accepted for compatibility; performance has its own endpoint.
    #[serde(default = "enabled")]
    pub include_performance: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            include_geolocation: true,
            include_security: true,
            include_dns: true,
            include_performance: true,
        }
    }
}

/// Request body for bulk IP analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkAnalysisRequest {
    pub ips: Vec<String>,
    #[serde(default)]
    pub options: AnalysisOptions,
}

/// Outcome of one target: a payload or the error that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ItemOutcome<T> {
    Success { data: T },
    Failed { error: String },
}

/// One target paired with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResult<T> {
    pub target: String,
    #[serde(flatten)]
    pub outcome: ItemOutcome<T>,
}

impl<T> ItemResult<T> {
    pub fn success(target: String, data: T) -> Self {
        Self {
            target,
            outcome: ItemOutcome::Success { data },
        }
    }

    pub fn failure(target: String, error: impl Into<String>) -> Self {
        Self {
            target,
            outcome: ItemOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ItemOutcome::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match &self.outcome {
            ItemOutcome::Success { data } => Some(data),
            ItemOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ItemOutcome::Success { .. } => None,
            ItemOutcome::Failed { error } => Some(error),
        }
    }
}

/// Counts and timing for an aggregate run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub duration_ms: f64,
}

/// Every per-target outcome of one aggregate run, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult<T> {
    pub results: Vec<ItemResult<T>>,
    pub summary: BatchSummary,
}

impl<T> AggregateResult<T> {
    /// Build the aggregate, deriving the summary from `results`.
    pub fn from_results(results: Vec<ItemResult<T>>, duration_ms: f64) -> Self {
        let successful = results.iter().filter(|r| r.is_success()).count();
        let total = results.len();
        Self {
            summary: BatchSummary {
                total,
                successful,
                failed: total - successful,
                duration_ms,
            },
            results,
        }
    }
}

/// Response body for bulk IP analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkAnalysisResult {
    pub results: Vec<ItemResult<IpInfo>>,
    pub summary: BatchSummary,
    pub timestamp: DateTime<Utc>,
}

/// Latency statistics for one host.
///
/// Ping figures come from TCP connect round trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub target: String,
    /// Address that was probed, when resolution succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    pub ping_min_ms: f64,
    pub ping_max_ms: f64,
    pub ping_avg_ms: f64,
    pub ping_stddev_ms: f64,
    pub packet_loss_percent: f64,
    pub jitter_ms: f64,
    /// `-1` when resolution failed.
    pub dns_resolution_ms: f64,
    pub timestamp: DateTime<Utc>,
}
