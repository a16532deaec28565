//! HTTP entry point for the developer toolbox.
//!
//! Serves IP analysis, bulk IP analysis, DNS lookup and latency probing
//! under `/api`, plus `/health`.

mod client_ip;
mod config;
mod error;
mod gateway;
mod logging;
mod routes;
mod tls;

use std::sync::Arc;

use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use devtools_toolbox::ToolboxService;

use config::AppConfig;
use gateway::{DefaultToolboxGateway, ToolboxGateway};
use routes::{AppState, ToolTimeouts};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    let _log_guard = logging::init(&config.logging)?;

    tracing::info!("Starting devtools-web v{}", env!("CARGO_PKG_VERSION"));

    let toolbox = ToolboxService::new(config.toolbox.clone())
        .context("Failed to initialize toolbox")?;
    let gateway: Arc<dyn ToolboxGateway> = Arc::new(DefaultToolboxGateway::new(toolbox));
    let state = web::Data::new(AppState::new(
        gateway,
        ToolTimeouts::from(&config.timeouts),
    ));

    let workers = config.server.workers.unwrap_or_else(num_cpus::get).max(1);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .workers(workers);

    let addr = (config.server.host.as_str(), config.server.port);
    let server = if let Some((cert, key)) = config.tls_files() {
        let tls = tls::load_server_config(cert, key)?;
        tracing::info!("Listening on https://{}:{}", addr.0, addr.1);
        server
            .bind_rustls_0_23(addr, tls)
            .with_context(|| format!("Failed to bind {}:{}", addr.0, addr.1))?
    } else {
        if config.server.dev_mode {
            tracing::info!("Development mode: serving plain HTTP");
        }
        tracing::info!("Listening on http://{}:{}", addr.0, addr.1);
        server
            .bind(addr)
            .with_context(|| format!("Failed to bind {}:{}", addr.0, addr.1))?
    };

    server.run().await.context("HTTP server error")
}
