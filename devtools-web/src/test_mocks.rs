use super::*;

use async_trait::async_trait;
use chrono::Utc;
use devtools_toolbox::{
    AggregateResult, DnsLookupResult, DnsRecord, IpCategory, IpInfo, IpVersion, ItemResult,
    PerformanceMetrics, ToolboxError,
};
use tokio::sync::Mutex;

pub fn ip_info(ip: &str) -> IpInfo {
    IpInfo {
        ip: ip.to_string(),
        version: IpVersion::V4,
        category: IpCategory::Public,
        geolocation: None,
        isp: None,
        security: None,
        dns: None,
        timestamp: Utc::now(),
    }
}

#[derive(Default)]
pub struct MockToolboxGateway {
    analyze_calls: Mutex<Vec<String>>,
    batch_calls: Mutex<Vec<BulkAnalysisRequest>>,
    dns_lookup_calls: Mutex<Vec<(String, String, Option<String>)>>,
    performance_calls: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
    error: Mutex<Option<ToolboxError>>,
}

impl MockToolboxGateway {
    pub async fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().await = delay;
    }

    pub async fn set_error(&self, error: Option<ToolboxError>) {
        *self.error.lock().await = error;
    }

    pub async fn analyze_calls(&self) -> Vec<String> {
        self.analyze_calls.lock().await.clone()
    }

    pub async fn batch_calls(&self) -> Vec<BulkAnalysisRequest> {
        self.batch_calls.lock().await.clone()
    }

    pub async fn dns_lookup_calls(&self) -> Vec<(String, String, Option<String>)> {
        self.dns_lookup_calls.lock().await.clone()
    }

    pub async fn performance_calls(&self) -> Vec<String> {
        self.performance_calls.lock().await.clone()
    }

    async fn settle(&self) -> ToolboxResult<()> {
        if let Some(delay) = *self.delay.lock().await {
            tokio::time::sleep(delay).await;
        }
        match self.error.lock().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ToolboxGateway for MockToolboxGateway {
    async fn analyze_ip(
        &self,
        ip: &str,
        _options: AnalysisOptions,
        _ctx: &ResolveContext,
    ) -> ToolboxResult<IpInfo> {
        self.analyze_calls.lock().await.push(ip.to_string());
        self.settle().await?;
        Ok(ip_info(ip))
    }

    async fn bulk_analyze_ips(
        &self,
        request: BulkAnalysisRequest,
        _ctx: &ResolveContext,
    ) -> ToolboxResult<devtools_toolbox::BulkAnalysisResult> {
        self.batch_calls.lock().await.push(request.clone());
        self.settle().await?;

        // Every item fails: the batch itself still succeeds.
        let results = request
            .ips
            .into_iter()
            .map(|ip| ItemResult::failure(ip, "Network error: unreachable"))
            .collect();
        let outcome = AggregateResult::from_results(results, 1.0);
        Ok(devtools_toolbox::BulkAnalysisResult {
            results: outcome.results,
            summary: outcome.summary,
            timestamp: Utc::now(),
        })
    }

    async fn dns_lookup(
        &self,
        domain: &str,
        record_type: &str,
        nameserver: Option<&str>,
        _ctx: &ResolveContext,
    ) -> ToolboxResult<DnsLookupResult> {
        self.dns_lookup_calls.lock().await.push((
            domain.to_string(),
            record_type.to_string(),
            nameserver.map(std::string::ToString::to_string),
        ));
        self.settle().await?;

        Ok(DnsLookupResult {
            domain: domain.to_string(),
            nameserver: nameserver.unwrap_or("system").to_string(),
            records: vec![DnsRecord {
                name: domain.to_string(),
                record_type: record_type.to_string(),
                value: "93.184.216.34".to_string(),
                ttl: 300,
            }],
            timestamp: Utc::now(),
            query_time_ms: 3,
        })
    }

    async fn analyze_performance(
        &self,
        target: &str,
        _ctx: &ResolveContext,
    ) -> ToolboxResult<PerformanceMetrics> {
        self.performance_calls.lock().await.push(target.to_string());
        self.settle().await?;

        Ok(PerformanceMetrics {
            target: target.to_string(),
            address: Some("93.184.216.34".to_string()),
            ping_min_ms: 10.0,
            ping_max_ms: 14.0,
            ping_avg_ms: 12.0,
            ping_stddev_ms: 1.5,
            packet_loss_percent: 0.0,
            jitter_ms: 2.0,
            dns_resolution_ms: 4.2,
            timestamp: Utc::now(),
        })
    }
}
