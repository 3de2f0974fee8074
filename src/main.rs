use std::process::ExitCode;

use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use payroll_engine::api::{AppState, create_router};
use payroll_engine::config::ConfigLoader;

const DEFAULT_CONFIG_DIR: &str = "./config/payroll";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("payroll_engine=debug,tower_http=info")),
        )
        .init();

    let config_dir =
        std::env::var("PAYROLL_CONFIG_DIR").unwrap_or_else(|_| DEFAULT_CONFIG_DIR.to_string());
    let config = match ConfigLoader::load(&config_dir) {
        Ok(config) => config,
        Err(err) => {
            error!(config_dir = %config_dir, error = %err, "Failed to load configuration");
            return ExitCode::FAILURE;
        }
    };

    let addr = config.settings().server.addr();
    info!(
        organisation = %config.settings().metadata.organisation,
        version = %config.settings().metadata.version,
        employees = config.seed().employees.len(),
        "Configuration loaded"
    );

    let app = create_router(AppState::new(config)).layer(TraceLayer::new_for_http());

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %addr, error = %err, "Failed to bind to address");
            return ExitCode::FAILURE;
        }
    };

    info!("Payroll engine listening on http://{}", addr);
    if let Err(err) = axum::serve(listener, app).await {
        error!(error = %err, "Server failed");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
