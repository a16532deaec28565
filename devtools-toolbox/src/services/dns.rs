//! DNS 查询模块

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use hickory_resolver::{
    TokioResolver,
    lookup::Lookup,
    proto::rr::{RData, RecordType},
};

use super::resolver::resolver_for;
use crate::aggregate::{aggregate, Concurrency, ResolveContext, Resolver};
use crate::error::{ToolboxError, ToolboxResult};
use crate::types::{AggregateResult, DnsLookupResult, DnsQueryType, DnsRecord, ItemOutcome};

/// DNS 查询
///
/// `domain` must already be validated. `ALL` fans out over
/// [`DnsQueryType::FAN_OUT`]; a type that fails contributes no records.
pub async fn dns_lookup(
    domain: &str,
    record_type: DnsQueryType,
    nameserver: Option<&str>,
    ctx: &ResolveContext,
) -> ToolboxResult<DnsLookupResult> {
    let start = Instant::now();
    let timestamp = Utc::now();
    let (resolver, used_nameserver) = resolver_for(nameserver)?;

    let records = if record_type == DnsQueryType::All {
        let targets = DnsQueryType::FAN_OUT
            .iter()
            .map(ToString::to_string)
            .collect();
        let per_type: Arc<dyn Resolver<Vec<DnsRecord>>> = Arc::new(RecordTypeResolver {
            resolver,
            domain: domain.to_string(),
        });
        let outcome = aggregate(targets, Concurrency::Unbounded, per_type, ctx).await;
        merge_type_results(outcome, domain)
    } else {
        ctx.guard(lookup_records(&resolver, domain, record_type))
            .await?
    };

    Ok(DnsLookupResult {
        domain: domain.to_string(),
        nameserver: used_nameserver,
        records,
        timestamp,
        query_time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
    })
}

/// Union of the successful per-type lookups; failed types add nothing.
fn merge_type_results(outcome: AggregateResult<Vec<DnsRecord>>, domain: &str) -> Vec<DnsRecord> {
    outcome
        .results
        .into_iter()
        .filter_map(|item| match item.outcome {
            ItemOutcome::Success { data } => Some(data),
            ItemOutcome::Failed { error } => {
                log::debug!("{} lookup for {domain} skipped: {error}", item.target);
                None
            }
        })
        .flatten()
        .collect()
}

/// Resolves one record type (the target) for a fixed domain.
struct RecordTypeResolver {
    resolver: TokioResolver,
    domain: String,
}

#[async_trait]
impl Resolver<Vec<DnsRecord>> for RecordTypeResolver {
    async fn resolve(&self, target: &str, ctx: &ResolveContext) -> ToolboxResult<Vec<DnsRecord>> {
        let record_type: DnsQueryType = target.parse().map_err(ToolboxError::ValidationError)?;
        ctx.guard(lookup_records(&self.resolver, &self.domain, record_type))
            .await
    }
}

/// Query a single record type.
async fn lookup_records(
    resolver: &TokioResolver,
    domain: &str,
    record_type: DnsQueryType,
) -> ToolboxResult<Vec<DnsRecord>> {
    let (query_type, render): (RecordType, fn(&RData) -> Option<String>) = match record_type {
        DnsQueryType::A => (RecordType::A, |rdata| rdata.as_a().map(|a| a.0.to_string())),
        DnsQueryType::Aaaa => (RecordType::AAAA, |rdata| {
            rdata.as_aaaa().map(|aaaa| aaaa.0.to_string())
        }),
        DnsQueryType::Mx => (RecordType::MX, |rdata| {
            rdata
                .as_mx()
                .map(|mx| format!("{} {}", mx.preference(), trim_dot(&mx.exchange().to_string())))
        }),
        DnsQueryType::Ns => (RecordType::NS, |rdata| {
            rdata.as_ns().map(|ns| trim_dot(&ns.0.to_string()))
        }),
        DnsQueryType::Txt => (RecordType::TXT, |rdata| {
            rdata.as_txt().map(|txt| {
                txt.iter()
                    .map(|data| String::from_utf8_lossy(data).to_string())
                    .collect::<String>()
            })
        }),
        DnsQueryType::Cname => (RecordType::CNAME, |rdata| {
            rdata.as_cname().map(|cname| trim_dot(&cname.0.to_string()))
        }),
        DnsQueryType::Ptr => {
            if let Ok(ip) = domain.parse::<IpAddr>() {
                let lookup = resolver
                    .reverse_lookup(ip)
                    .await
                    .map_err(|e| lookup_failed(record_type, &e))?;
                return Ok(collect_records(lookup.as_lookup(), domain, record_type, |rdata| {
                    rdata.as_ptr().map(|ptr| trim_dot(&ptr.0.to_string()))
                }));
            }
            (RecordType::PTR, |rdata| {
                rdata.as_ptr().map(|ptr| trim_dot(&ptr.0.to_string()))
            })
        }
        DnsQueryType::All => {
            return Err(ToolboxError::ValidationError(
                "ALL cannot be queried as a single record type".to_string(),
            ));
        }
    };

    let lookup = resolver
        .lookup(domain, query_type)
        .await
        .map_err(|e| lookup_failed(record_type, &e))?;
    Ok(collect_records(&lookup, domain, record_type, render))
}

/// Reverse (PTR) names for an address, trailing dots removed.
pub(crate) async fn reverse_names(
    resolver: &TokioResolver,
    ip: IpAddr,
) -> ToolboxResult<Vec<String>> {
    let lookup = resolver
        .reverse_lookup(ip)
        .await
        .map_err(|e| lookup_failed(DnsQueryType::Ptr, &e))?;
    Ok(lookup
        .as_lookup()
        .record_iter()
        .filter_map(|record| record.data().as_ptr())
        .map(|ptr| trim_dot(&ptr.0.to_string()))
        .collect())
}

fn collect_records(
    lookup: &Lookup,
    domain: &str,
    record_type: DnsQueryType,
    render: fn(&RData) -> Option<String>,
) -> Vec<DnsRecord> {
    lookup
        .record_iter()
        .filter_map(|record| {
            render(record.data()).map(|value| DnsRecord {
                name: domain.to_string(),
                record_type: record_type.as_str().to_string(),
                value,
                ttl: record.ttl(),
            })
        })
        .collect()
}

fn lookup_failed(record_type: DnsQueryType, e: &impl std::fmt::Display) -> ToolboxError {
    ToolboxError::NetworkError(format!("DNS lookup failed ({record_type}): {e}"))
}

fn trim_dot(name: &str) -> String {
    name.trim_end_matches('.').to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::ItemResult;

    #[test]
    fn test_trim_dot() {
        assert_eq!(trim_dot("mail.example.com."), "mail.example.com");
        assert_eq!(trim_dot("example.com"), "example.com");
    }

    #[test]
    fn test_lookup_failed_names_type() {
        let err = lookup_failed(DnsQueryType::Mx, &"no records found");
        assert_eq!(
            err,
            ToolboxError::NetworkError("DNS lookup failed (MX): no records found".to_string())
        );
    }

    fn record(record_type: &str, value: &str) -> DnsRecord {
        DnsRecord {
            name: "example.com".to_string(),
            record_type: record_type.to_string(),
            value: value.to_string(),
            ttl: 300,
        }
    }

    #[test]
    fn test_merge_skips_failed_types() {
        let outcome = AggregateResult::from_results(
            vec![
                ItemResult::success("A".to_string(), vec![record("A", "93.184.216.34")]),
                ItemResult::failure("AAAA".to_string(), "Network error: no records found"),
                ItemResult::success(
                    "NS".to_string(),
                    vec![record("NS", "a.iana-servers.net"), record("NS", "b.iana-servers.net")],
                ),
                ItemResult::success("TXT".to_string(), Vec::new()),
            ],
            1.0,
        );

        let merged = merge_type_results(outcome, "example.com");
        let types: Vec<&str> = merged.iter().map(|r| r.record_type.as_str()).collect();
        assert_eq!(types, ["A", "NS", "NS"]);
    }

    #[tokio::test]
    async fn test_record_type_resolver_rejects_unknown_tag() {
        let per_type = RecordTypeResolver {
            resolver: crate::services::resolver::DEFAULT_RESOLVER.clone(),
            domain: "example.com".to_string(),
        };
        let result = per_type.resolve("SOA", &ResolveContext::new()).await;
        assert!(matches!(result, Err(ToolboxError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_cancelled_context_aborts_single_lookup() {
        let ctx = ResolveContext::new();
        ctx.cancel();
        let result = dns_lookup("example.com", DnsQueryType::A, Some("192.0.2.1"), &ctx).await;
        assert_eq!(result.unwrap_err(), ToolboxError::Cancelled);
    }

    #[tokio::test]
    async fn test_cancelled_context_yields_empty_all_lookup() {
        let ctx = ResolveContext::new();
        ctx.cancel();
        let result = dns_lookup("example.com", DnsQueryType::All, Some("192.0.2.1"), &ctx)
            .await
            .unwrap();
        assert!(result.records.is_empty());
        assert_eq!(result.nameserver, "192.0.2.1");
    }

    #[tokio::test]
    async fn test_invalid_nameserver_rejected() {
        let ctx = ResolveContext::new();
        let result = dns_lookup("example.com", DnsQueryType::A, Some("nope"), &ctx).await;
        assert!(matches!(result, Err(ToolboxError::ValidationError(_))));
    }

    // NOTE: These tests depend on live DNS; failures may be due to network issues

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_dns_lookup_all_real() {
        let ctx = ResolveContext::new();
        let result = dns_lookup("google.com", DnsQueryType::All, None, &ctx)
            .await
            .unwrap_or_else(|e| panic!("ALL lookup failed: {e}"));
        assert!(result.records.iter().any(|r| r.record_type == "A"));
        assert!(result.records.iter().any(|r| r.record_type == "NS"));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_dns_lookup_mx_real() {
        let ctx = ResolveContext::new();
        let result = dns_lookup("google.com", DnsQueryType::Mx, Some("8.8.8.8"), &ctx)
            .await
            .unwrap_or_else(|e| panic!("MX lookup failed: {e}"));
        assert!(!result.records.is_empty());
        assert!(result.records[0].value.contains(' '));
    }

    #[tokio::test]
    #[ignore = "requires network access"]
    async fn test_reverse_names_real() {
        let resolver = &crate::services::resolver::DEFAULT_RESOLVER;
        let names = reverse_names(resolver, "8.8.8.8".parse().unwrap())
            .await
            .unwrap_or_else(|e| panic!("reverse lookup failed: {e}"));
        assert!(names.iter().any(|n| n == "dns.google"));
    }
}
