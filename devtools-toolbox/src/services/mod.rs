//! Service façade exposing all toolbox operations.

mod dns;
mod ip;
mod performance;
mod resolver;

use std::sync::Arc;

use chrono::Utc;

pub use ip::IpAnalyzer;

use crate::aggregate::{aggregate, Concurrency, ResolveContext, Resolver};
use crate::config::ToolboxConfig;
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{
    AnalysisOptions, BulkAnalysisRequest, BulkAnalysisResult, DnsLookupResult, DnsQueryType,
    IpInfo, PerformanceMetrics,
};

/// Validate and normalise a domain name or IP address input.
///
/// Trims whitespace, passes through valid IP addresses unchanged, converts
/// internationalised domain names (IDN) to ASCII via IDNA 2008, and rejects
/// empty or overlong inputs.
fn validate_domain(domain: &str) -> ToolboxResult<String> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ToolboxError::ValidationError(
            "Domain name is required".to_string(),
        ));
    }
    // If it's a valid IP address, pass through without IDNA processing.
    if domain.parse::<std::net::IpAddr>().is_ok() {
        return Ok(domain.to_string());
    }
    // IDNA processing: converts Unicode labels to Punycode and validates.
    let ascii_domain = idna::domain_to_ascii_strict(domain)
        .map_err(|_| ToolboxError::ValidationError(format!("Invalid domain name: {domain}")))?;
    if ascii_domain.len() > 253 {
        return Err(ToolboxError::ValidationError(format!(
            "Domain name exceeds maximum length of 253 characters (got {})",
            ascii_domain.len()
        )));
    }
    Ok(ascii_domain)
}

/// Reject empty and oversized batches before any work is dispatched.
fn validate_batch(targets: &[String], max_batch_size: usize) -> ToolboxResult<()> {
    if targets.is_empty() {
        return Err(ToolboxError::ValidationError("No IPs provided".to_string()));
    }
    if targets.len() > max_batch_size {
        return Err(ToolboxError::ValidationError(format!(
            "Too many IPs (maximum {max_batch_size})"
        )));
    }
    Ok(())
}

/// Entry point for all network diagnostic operations.
///
/// ```rust,no_run
/// use devtools_toolbox::{ResolveContext, ToolboxConfig, ToolboxService};
/// # async fn demo() -> devtools_toolbox::ToolboxResult<()> {
/// let toolbox = ToolboxService::new(ToolboxConfig::default())?;
/// let dns = toolbox
///     .dns_lookup("example.com", "A", None, &ResolveContext::new())
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ToolboxService {
    config: ToolboxConfig,
    analyzer: IpAnalyzer,
}

impl ToolboxService {
    pub fn new(config: ToolboxConfig) -> ToolboxResult<Self> {
        let analyzer = IpAnalyzer::new(&config)?;
        Ok(Self { config, analyzer })
    }

    pub fn config(&self) -> &ToolboxConfig {
        &self.config
    }

    /// Analyse one IP address.
    ///
    /// Fails only for malformed input or when `ctx` is interrupted; missing
    /// enrichment leaves the corresponding section empty.
    pub async fn analyze_ip(
        &self,
        ip: &str,
        options: AnalysisOptions,
        ctx: &ResolveContext,
    ) -> ToolboxResult<IpInfo> {
        self.analyzer.with_options(options).analyze(ip, ctx).await
    }

    /// Analyse up to `max_batch_size` addresses concurrently.
    ///
    /// Every submitted entry, duplicates included, yields one item in
    /// submission order. Item failures never fail the batch.
    pub async fn bulk_analyze_ips(
        &self,
        request: BulkAnalysisRequest,
        ctx: &ResolveContext,
    ) -> ToolboxResult<BulkAnalysisResult> {
        validate_batch(&request.ips, self.config.max_batch_size)?;

        let resolver: Arc<dyn Resolver<IpInfo>> =
            Arc::new(self.analyzer.with_options(request.options));
        let outcome = aggregate(
            request.ips,
            Concurrency::Bounded(self.config.batch_concurrency),
            resolver,
            ctx,
        )
        .await;

        log::info!(
            "Bulk analysis finished: {}/{} succeeded in {:.1}ms",
            outcome.summary.successful,
            outcome.summary.total,
            outcome.summary.duration_ms
        );

        Ok(BulkAnalysisResult {
            results: outcome.results,
            summary: outcome.summary,
            timestamp: Utc::now(),
        })
    }

    /// Resolve DNS records for a domain.
    ///
    /// `record_type` can be `"A"`, `"AAAA"`, `"MX"`, `"NS"`, `"TXT"`, `"CNAME"`,
    /// `"PTR"`, or `"ALL"` (case-insensitive).
    ///
    /// Pass `None` for `nameserver` to use the system default resolver.
    pub async fn dns_lookup(
        &self,
        domain: &str,
        record_type: &str,
        nameserver: Option<&str>,
        ctx: &ResolveContext,
    ) -> ToolboxResult<DnsLookupResult> {
        let domain = validate_domain(domain)?;
        let record_type: DnsQueryType = record_type
            .trim()
            .parse()
            .map_err(ToolboxError::ValidationError)?;
        dns::dns_lookup(&domain, record_type, nameserver, ctx).await
    }

    /// Measure DNS resolution time and TCP connect latency to a host.
    pub async fn analyze_performance(
        &self,
        target: &str,
        ctx: &ResolveContext,
    ) -> ToolboxResult<PerformanceMetrics> {
        let target = validate_domain(target)?;
        performance::analyze_performance(&target, &self.config, ctx).await
    }
}
