use push_deploy::api::{WEBHOOK_PATH, router};
use push_deploy::logging::{FileLogger, setup_logging};
use push_deploy::{AppState, DeployConfig, ShellExecutor};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    let file_logger = std::env::var("LOG_DIR").ok().map(FileLogger::new);
    let _log_guard = match setup_logging(file_logger.as_ref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging setup error: {}", e);
            std::process::exit(1);
        }
    };

    let config = match DeployConfig::load() {
        Ok(cfg) => Arc::new(cfg),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    for repo in &config.repository {
        info!(
            "Watching '{}' (branch: {})",
            repo.full_name,
            repo.branch_filter().unwrap_or("any")
        );
    }
    match config.script_timeout() {
        Some(limit) => info!("Deploy scripts time out after {:?}", limit),
        None => info!("Deploy scripts run without a timeout"),
    }

    let executor = Arc::new(ShellExecutor::new().with_timeout(config.script_timeout()));
    let state = Arc::new(AppState::new(config.clone(), executor));
    let app = router(state);

    let bind_address = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
    let listener = match tokio::net::TcpListener::bind(bind_address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    info!("Listening on {} ({})", bind_address, WEBHOOK_PATH);
    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
