//! Axum API server binary.

use std::net::SocketAddr;
use std::time::Duration;

use axum_server::tls_rustls::RustlsConfig;
use axum_server::Handle;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kidwatch_api::{create_router, metrics, ApiConfig, AppState};
use kidwatch_media::SamplerConfig;
use kidwatch_ml_client::DashScopeConfig;

/// Grace period for in-flight analyses on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        eprintln!("Failed to install rustls crypto provider");
        std::process::exit(1);
    }

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let mut env_filter = EnvFilter::from_default_env();
    if let Ok(directive) = "kidwatch=info".parse() {
        env_filter = env_filter.add_directive(directive);
    }

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting kidwatch-api");

    // Load configuration
    let config = ApiConfig::from_env();
    let sampler_config = SamplerConfig::from_env();
    let model_config = DashScopeConfig::from_env();
    info!(
        "API config: host={}, port={}, tls={}, model={}",
        config.host,
        config.port,
        config.tls.is_some(),
        model_config.model
    );

    if !model_config.has_api_key() {
        warn!("DASHSCOPE_API_KEY is not set; analysis requests will fail");
    }

    // Create application state
    let state = match AppState::new(config.clone(), sampler_config, model_config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create application state: {}", e);
            std::process::exit(1);
        }
    };

    // Initialize metrics
    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        match metrics::init_metrics() {
            Ok(handle) => {
                info!("Prometheus metrics enabled at /metrics");
                Some(handle)
            }
            Err(e) => {
                warn!("Failed to install metrics recorder: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Create router
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = match format!("{}:{}", config.host, config.port).parse() {
        Ok(addr) => addr,
        Err(e) => {
            error!("Invalid bind address {}:{}: {}", config.host, config.port, e);
            std::process::exit(1);
        }
    };

    let served = match &config.tls {
        Some(tls) => {
            let rustls_config = match RustlsConfig::from_pem_file(&tls.cert_path, &tls.key_path).await
            {
                Ok(c) => c,
                Err(e) => {
                    error!(
                        "Failed to load TLS certificate {} / key {}: {}",
                        tls.cert_path.display(),
                        tls.key_path.display(),
                        e
                    );
                    std::process::exit(1);
                }
            };

            let handle = Handle::new();
            tokio::spawn(graceful_tls_shutdown(handle.clone()));

            info!("Listening on https://{}", addr);
            axum_server::bind_rustls(addr, rustls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
        }
        None => {
            warn!("TLS disabled, serving plain HTTP");
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    error!("Failed to bind {}: {}", addr, e);
                    std::process::exit(1);
                }
            };

            info!("Listening on http://{}", addr);
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        }
    };

    if let Err(e) = served {
        error!("Server error: {}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to install CTRL+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}

async fn graceful_tls_shutdown(handle: Handle) {
    shutdown_signal().await;
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}
