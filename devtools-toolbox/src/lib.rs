//! Network toolbox utilities for the devtools web service
//!
//! IP analysis (single and bounded bulk), DNS lookup, and latency probing.
//! Bulk operations go through [`aggregate`], which yields one outcome per
//! target and never fails as a whole.

pub mod aggregate;
pub mod config;
mod error;
mod services;
pub mod types;

pub use aggregate::{aggregate, Concurrency, ResolveContext, Resolver};
pub use config::ToolboxConfig;
pub use error::{ToolboxError, ToolboxResult};
pub use services::{IpAnalyzer, ToolboxService};
pub use types::{
    AggregateResult, AnalysisOptions, BatchSummary, BulkAnalysisRequest, BulkAnalysisResult,
    DnsLookupResult, DnsQueryType, DnsRecord, GeoInfo, IpCategory, IpInfo, IpVersion, IspInfo,
    ItemOutcome, ItemResult, PerformanceMetrics, Reputation, ReverseDnsInfo, SecurityInfo,
};
