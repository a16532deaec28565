//! HTTP routes for IP analysis and DNS lookup.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::header::ContentType;
use actix_web::{web, HttpRequest, HttpResponse};
use devtools_toolbox::{AnalysisOptions, BulkAnalysisRequest, ResolveContext, ToolboxResult};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;

use crate::client_ip::client_ip;
use crate::config::TimeoutConfig;
use crate::error::{map_toolbox_error, sanitize_internal_error, ApiError};
use crate::gateway::ToolboxGateway;

/// Extra time the outer timeout allows past the context deadline, so that
/// batch items fail individually first.
const OUTER_GRACE_SECS: u64 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolTimeouts {
    pub ip_analysis: Duration,
    pub batch: Duration,
    pub dns_lookup: Duration,
    pub performance: Duration,
    /// Added on top of each budget for the outer timeout.
    pub grace: Duration,
}

impl From<&TimeoutConfig> for ToolTimeouts {
    fn from(config: &TimeoutConfig) -> Self {
        Self {
            ip_analysis: config.ip_analysis(),
            batch: config.batch(),
            dns_lookup: config.dns_lookup(),
            performance: config.performance(),
            grace: Duration::from_secs(OUTER_GRACE_SECS),
        }
    }
}

impl Default for ToolTimeouts {
    fn default() -> Self {
        Self::from(&TimeoutConfig::default())
    }
}

/// Shared handler state.
pub struct AppState {
    toolbox: Arc<dyn ToolboxGateway>,
    timeouts: ToolTimeouts,
}

impl AppState {
    pub fn new(toolbox: Arc<dyn ToolboxGateway>, timeouts: ToolTimeouts) -> Self {
        Self { toolbox, timeouts }
    }
}

/// DNS lookup parameters, from the query string or a JSON body.
#[derive(Debug, Deserialize)]
pub struct DnsLookupParams {
    #[serde(default)]
    domain: Option<String>,
    /// Defaults to `A`.
    #[serde(default, rename = "type")]
    record_type: Option<String>,
    #[serde(default)]
    nameserver: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthStatus {
    status: &'static str,
    version: &'static str,
}

/// Execute a toolbox operation with timeout, error mapping, and JSON serialization.
async fn run_toolbox_tool<T: Serialize>(
    duration: Duration,
    future: impl Future<Output = ToolboxResult<T>>,
    tool_name: &str,
) -> Result<HttpResponse, ApiError> {
    let result = timeout(duration, future)
        .await
        .map_err(|_| {
            tracing::warn!("{tool_name} exceeded {duration:?}");
            ApiError::Timeout(format!("{tool_name} timed out"))
        })?
        .map_err(|e| map_toolbox_error(tool_name, e))?;

    let json = serde_json::to_string(&result)
        .map_err(|e| sanitize_internal_error(e, &format!("Serialize {tool_name} result")))?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(json))
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn current_ip(
    req: HttpRequest,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let ip = client_ip(&req)
        .ok_or_else(|| ApiError::BadRequest("Unable to determine client IP".to_string()))?;

    let budget = state.timeouts.ip_analysis;
    let ctx = ResolveContext::with_timeout(budget);
    let _cancel = ctx.cancel_on_drop();
    run_toolbox_tool(
        budget + state.timeouts.grace,
        state
            .toolbox
            .analyze_ip(&ip, AnalysisOptions::default(), &ctx),
        "IP analysis",
    )
    .await
}

async fn analyze_ip(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let ip = path.into_inner();

    let budget = state.timeouts.ip_analysis;
    let ctx = ResolveContext::with_timeout(budget);
    let _cancel = ctx.cancel_on_drop();
    run_toolbox_tool(
        budget + state.timeouts.grace,
        state
            .toolbox
            .analyze_ip(&ip, AnalysisOptions::default(), &ctx),
        "IP analysis",
    )
    .await
}

async fn batch_analyze(
    body: web::Json<BulkAnalysisRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let request = body.into_inner();
    tracing::debug!("Bulk analysis of {} IP(s)", request.ips.len());

    let budget = state.timeouts.batch;
    let ctx = ResolveContext::with_timeout(budget);
    let _cancel = ctx.cancel_on_drop();
    run_toolbox_tool(
        budget + state.timeouts.grace,
        state.toolbox.bulk_analyze_ips(request, &ctx),
        "Bulk analysis",
    )
    .await
}

async fn analyze_performance(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    let target = path.into_inner();

    let budget = state.timeouts.performance;
    let ctx = ResolveContext::with_timeout(budget);
    let _cancel = ctx.cancel_on_drop();
    run_toolbox_tool(
        budget + state.timeouts.grace,
        state.toolbox.analyze_performance(&target, &ctx),
        "Performance analysis",
    )
    .await
}

async fn lookup(params: DnsLookupParams, state: &AppState) -> Result<HttpResponse, ApiError> {
    let domain = params
        .domain
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Domain required".to_string()))?;
    let record_type = params
        .record_type
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| "A".to_string());

    let budget = state.timeouts.dns_lookup;
    let ctx = ResolveContext::with_timeout(budget);
    let _cancel = ctx.cancel_on_drop();
    run_toolbox_tool(
        budget + state.timeouts.grace,
        state.toolbox.dns_lookup(
            &domain,
            &record_type,
            params.nameserver.as_deref(),
            &ctx,
        ),
        "DNS lookup",
    )
    .await
}

async fn dns_lookup_query(
    query: web::Query<DnsLookupParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    lookup(query.into_inner(), &state).await
}

async fn dns_lookup_body(
    body: web::Json<DnsLookupParams>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, ApiError> {
    lookup(body.into_inner(), &state).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        tracing::debug!("Rejected request body: {err}");
        ApiError::BadRequest("Invalid request body".to_string()).into()
    }))
    .route("/health", web::get().to(health))
    .service(
        web::scope("/api")
            .service(
                web::scope("/ip")
                    .route("/current", web::get().to(current_ip))
                    .route("/analyze/{ip}", web::get().to(analyze_ip))
                    .route("/batch", web::post().to(batch_analyze))
                    .route("/performance/{target}", web::get().to(analyze_performance)),
            )
            .service(
                web::resource("/dns/lookup")
                    .route(web::get().to(dns_lookup_query))
                    .route(web::post().to(dns_lookup_body)),
            ),
    );
}

#[cfg(test)]
#[path = "test_mocks.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
pub(crate) mod test_mocks;

#[cfg(test)]
#[path = "routes_tests.rs"]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests;
