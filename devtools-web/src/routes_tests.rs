use super::test_mocks::*;
use super::*;

use actix_web::http::StatusCode;
use actix_web::{test as actix_test, App};
use devtools_toolbox::ToolboxError;
use serde_json::{json, Value};

async fn send(
    toolbox: Arc<MockToolboxGateway>,
    timeouts: ToolTimeouts,
    req: actix_test::TestRequest,
) -> (StatusCode, Value) {
    let state = web::Data::new(AppState::new(toolbox, timeouts));
    let app = actix_test::init_service(App::new().app_data(state).configure(configure)).await;
    let resp = actix_test::call_service(&app, req.to_request()).await;
    let status = resp.status();
    let body = actix_test::read_body(resp).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn short_timeouts() -> ToolTimeouts {
    let budget = Duration::from_millis(20);
    ToolTimeouts {
        ip_analysis: budget,
        batch: budget,
        dns_lookup: budget,
        performance: budget,
        grace: budget,
    }
}

#[actix_web::test]
async fn health_reports_version() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        toolbox,
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/health"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[actix_web::test]
async fn analyze_ip_returns_info() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/ip/analyze/8.8.8.8"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ip"], "8.8.8.8");
    assert_eq!(body["version"], "IPv4");
    assert_eq!(body["type"], "public");
    assert_eq!(toolbox.analyze_calls().await, vec!["8.8.8.8".to_string()]);
}

#[actix_web::test]
async fn validation_error_maps_to_bad_request() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    toolbox
        .set_error(Some(ToolboxError::ValidationError(
            "Invalid IP address: nope".to_string(),
        )))
        .await;

    let (status, body) = send(
        toolbox,
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/ip/analyze/nope"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({ "code": "VALIDATION_ERROR", "message": "Invalid IP address: nope" })
    );
}

#[actix_web::test]
async fn network_error_maps_to_bad_gateway() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    toolbox
        .set_error(Some(ToolboxError::NetworkError(
            "DNS lookup failed (A): no records found".to_string(),
        )))
        .await;

    let (status, body) = send(
        toolbox,
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/dns/lookup?domain=example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "NETWORK_ERROR");
}

#[actix_web::test]
async fn internal_error_is_sanitized() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    toolbox
        .set_error(Some(ToolboxError::Internal("secret=abc123".to_string())))
        .await;

    let (status, body) = send(
        toolbox,
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/ip/performance/example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "INTERNAL_ERROR");
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("Performance analysis failed"));
    assert!(!message.contains("abc123"));
}

#[actix_web::test]
async fn slow_tool_returns_gateway_timeout() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    toolbox.set_delay(Some(Duration::from_millis(500))).await;

    let (status, body) = send(
        toolbox,
        short_timeouts(),
        actix_test::TestRequest::get().uri("/api/dns/lookup?domain=example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["message"], "DNS lookup timed out");
}

#[actix_web::test]
async fn batch_rejects_malformed_body() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::post()
            .uri("/api/ip/batch")
            .insert_header(("content-type", "application/json"))
            .set_payload("{\"ips\": [\"1.1.1.1\""),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid request body");
    assert!(toolbox.batch_calls().await.is_empty());
}

#[actix_web::test]
async fn batch_with_all_failures_is_still_ok() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::post().uri("/api/ip/batch").set_json(json!({
            "ips": ["192.0.2.1", "192.0.2.2", "192.0.2.1"],
            "options": { "include_geolocation": false }
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total"], 3);
    assert_eq!(body["summary"]["failed"], 3);
    assert_eq!(body["results"][0]["target"], "192.0.2.1");
    assert_eq!(body["results"][0]["status"], "failed");
    assert_eq!(body["results"][2]["target"], "192.0.2.1");

    let calls = toolbox.batch_calls().await;
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].options.include_geolocation);
    assert!(calls[0].options.include_dns);
}

#[actix_web::test]
async fn batch_validation_error_is_bad_request() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    toolbox
        .set_error(Some(ToolboxError::ValidationError(
            "No IPs provided".to_string(),
        )))
        .await;

    let (status, body) = send(
        toolbox,
        ToolTimeouts::default(),
        actix_test::TestRequest::post()
            .uri("/api/ip/batch")
            .set_json(json!({ "ips": [] })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "No IPs provided");
}

#[actix_web::test]
async fn dns_lookup_query_defaults_to_a() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/dns/lookup?domain=example.com&nameserver=1.1.1.1"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["nameserver"], "1.1.1.1");
    assert_eq!(body["records"][0]["type"], "A");
    assert_eq!(
        toolbox.dns_lookup_calls().await,
        vec![(
            "example.com".to_string(),
            "A".to_string(),
            Some("1.1.1.1".to_string())
        )]
    );
}

#[actix_web::test]
async fn dns_lookup_requires_domain() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/dns/lookup?type=MX"),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Domain required");
    assert!(toolbox.dns_lookup_calls().await.is_empty());
}

#[actix_web::test]
async fn dns_lookup_post_body() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, _body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::post()
            .uri("/api/dns/lookup")
            .set_json(json!({ "domain": "example.com", "type": "mx" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        toolbox.dns_lookup_calls().await,
        vec![("example.com".to_string(), "mx".to_string(), None)]
    );
}

#[actix_web::test]
async fn current_ip_prefers_proxy_headers() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::get()
            .uri("/api/ip/current")
            .insert_header(("X-Forwarded-For", "203.0.113.7, 10.0.0.1"))
            .peer_addr("192.0.2.10:40000".parse().unwrap()),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ip"], "203.0.113.7");
    assert_eq!(toolbox.analyze_calls().await, vec!["203.0.113.7".to_string()]);
}

#[actix_web::test]
async fn performance_passes_target() {
    let toolbox = Arc::new(MockToolboxGateway::default());
    let (status, body) = send(
        Arc::clone(&toolbox),
        ToolTimeouts::default(),
        actix_test::TestRequest::get().uri("/api/ip/performance/example.com"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["target"], "example.com");
    assert_eq!(
        toolbox.performance_calls().await,
        vec!["example.com".to_string()]
    );
}

#[test]
fn timeouts_follow_config() {
    let config = TimeoutConfig {
        batch_secs: 5,
        ..TimeoutConfig::default()
    };
    let timeouts = ToolTimeouts::from(&config);
    assert_eq!(timeouts.batch, Duration::from_secs(5));
    assert_eq!(timeouts.grace, Duration::from_secs(OUTER_GRACE_SECS));
}
