//! Seam between HTTP handlers and the toolbox.

use async_trait::async_trait;
use devtools_toolbox::{
    AnalysisOptions, BulkAnalysisRequest, BulkAnalysisResult, DnsLookupResult, IpInfo,
    PerformanceMetrics, ResolveContext, ToolboxResult, ToolboxService,
};

#[async_trait]
pub trait ToolboxGateway: Send + Sync {
    async fn analyze_ip(
        &self,
        ip: &str,
        options: AnalysisOptions,
        ctx: &ResolveContext,
    ) -> ToolboxResult<IpInfo>;

    async fn bulk_analyze_ips(
        &self,
        request: BulkAnalysisRequest,
        ctx: &ResolveContext,
    ) -> ToolboxResult<BulkAnalysisResult>;

    async fn dns_lookup(
        &self,
        domain: &str,
        record_type: &str,
        nameserver: Option<&str>,
        ctx: &ResolveContext,
    ) -> ToolboxResult<DnsLookupResult>;

    async fn analyze_performance(
        &self,
        target: &str,
        ctx: &ResolveContext,
    ) -> ToolboxResult<PerformanceMetrics>;
}

pub struct DefaultToolboxGateway {
    toolbox: ToolboxService,
}

impl DefaultToolboxGateway {
    pub fn new(toolbox: ToolboxService) -> Self {
        Self { toolbox }
    }
}

#[async_trait]
impl ToolboxGateway for DefaultToolboxGateway {
    async fn analyze_ip(
        &self,
        ip: &str,
        options: AnalysisOptions,
        ctx: &ResolveContext,
    ) -> ToolboxResult<IpInfo> {
        self.toolbox.analyze_ip(ip, options, ctx).await
    }

    async fn bulk_analyze_ips(
        &self,
        request: BulkAnalysisRequest,
        ctx: &ResolveContext,
    ) -> ToolboxResult<BulkAnalysisResult> {
        self.toolbox.bulk_analyze_ips(request, ctx).await
    }

    async fn dns_lookup(
        &self,
        domain: &str,
        record_type: &str,
        nameserver: Option<&str>,
        ctx: &ResolveContext,
    ) -> ToolboxResult<DnsLookupResult> {
        self.toolbox
            .dns_lookup(domain, record_type, nameserver, ctx)
            .await
    }

    async fn analyze_performance(
        &self,
        target: &str,
        ctx: &ResolveContext,
    ) -> ToolboxResult<PerformanceMetrics> {
        self.toolbox.analyze_performance(target, ctx).await
    }
}
