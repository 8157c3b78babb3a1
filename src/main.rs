use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::{signal, sync::mpsc};
use tracing::{error, info};

use storefront_api as api;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = api::config::load_config().context("failed to load configuration")?;
    api::config::init_tracing(&cfg.log_level, cfg.log_json);

    // Init DB
    let db_pool = api::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        api::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }

    let db_arc = Arc::new(db_pool);
    let cfg = Arc::new(cfg);

    // Init events
    let (event_tx, event_rx) = mpsc::channel(1024);
    let event_sender = api::events::EventSender::new(event_tx);
    tokio::spawn(api::events::process_events(event_rx));

    // Collaborator clients
    let http = api::clients::build_http_client(cfg.collaborator_timeout_secs)?;
    let tokens = Arc::new(api::auth::TokenIssuer::new(
        cfg.jwt_secret.clone(),
        cfg.jwt_expiration,
    ));
    let cart = Arc::new(api::clients::HttpCartClient::new(
        http.clone(),
        cfg.cart_service_url.clone(),
        tokens,
    ));
    let gateway = Arc::new(api::clients::HttpPaymentGateway::new(
        http.clone(),
        cfg.payment_service_url.clone(),
    ));
    let inventory = Arc::new(api::clients::HttpInventoryClient::new(
        http,
        cfg.inventory_service_url.clone(),
    ));

    // Aggregate app services used by HTTP handlers
    let services = api::handlers::AppServices::new(
        db_arc.clone(),
        cfg.clone(),
        Arc::new(event_sender.clone()),
        cart,
        gateway,
        inventory,
    );

    let state = api::AppState {
        db: db_arc,
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = api::app_router(state);

    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .context("invalid host/port configuration")?;
    info!("listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("failed to install shutdown signal handler: {e}");
        return;
    }
    info!("shutdown signal received");
}
