use std::net::SocketAddr;

use dotenvy::dotenv;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use picomon_device::{DeviceClient, DeviceConfig};
use picomon_server::api::{self, AppState, Metrics};
use picomon_server::config::ServerConfig;
use picomon_server::service::DashboardService;
use picomon_server::store::{init_db, HistoryStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    let cfg = ServerConfig::from_env();

    let device_cfg = DeviceConfig::from_env();
    tracing::info!(url = %device_cfg.base_url, timeout_secs = device_cfg.timeout_secs, "Configuring device client");
    let device = DeviceClient::new(&device_cfg).expect("Failed to initialize device client");

    let db = init_db(&cfg.db_path).await.expect("failed to init db");
    let store = HistoryStore::new(db.clone());
    let service = DashboardService::new(device, store, cfg.log_interval_secs);
    let metrics = Metrics::new();
    let state = AppState {
        service,
        db,
        metrics,
        history_limit: cfg.history_limit,
    };

    let app = api::router(state);

    let addr: SocketAddr = cfg.http_addr.parse().expect("Invalid PICOMON_HTTP_ADDR");
    info!(%addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info,axum=info,hyper=info,sqlx=warn"))
        .unwrap();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
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
        let mut term = signal(SignalKind::terminate()).expect("failed to install signal handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
