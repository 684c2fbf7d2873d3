use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::HeaderValue;
use tokio::{signal, sync::mpsc};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};

use chargx_gateway as gateway;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = gateway::config::load_config()?;
    gateway::config::init_tracing(cfg.log_level(), cfg.log_json);

    let client = Arc::new(
        gateway::processor::ProcessorClient::from_config(&cfg)
            .context("failed to build processor client")?,
    );
    let relay = Arc::new(gateway::services::relay::MerchantValidationRelay::new(
        cfg.apple_pay.clone(),
        cfg.request_timeout(),
    ));

    if cfg.testmode {
        info!("running against the ChargX sandbox (test mode)");
    }
    if !relay.is_configured() {
        info!("Apple Pay merchant credentials not configured; merchant validation disabled");
    }

    // Gateway events drain into the operator log.
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = gateway::events::EventSender::new(event_tx);
    tokio::spawn(gateway::events::process_events(event_rx));

    let services = gateway::handlers::AppServices::new(client, relay, event_sender);
    let app_state = gateway::AppState {
        config: cfg.clone(),
        services,
    };

    // Build CORS layer from config
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    let cors_layer = if let Some(origins) = configured_origins {
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    } else if cfg.is_development() {
        info!("using permissive CORS (development environment)");
        CorsLayer::permissive()
    } else {
        error!("missing CORS configuration; set APP__CORS_ALLOWED_ORIGINS");
        anyhow::bail!("Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS");
    };

    let app = gateway::app_router()
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    info!("chargx-gateway listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
