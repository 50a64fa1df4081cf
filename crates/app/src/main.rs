mod diag;
mod problem;
mod router;
mod signature;
mod telemetry;
mod webhook;

use std::net::SocketAddr;

use tracing::info;

use payrelay_line::LineClient;
use payrelay_util::{load_env_file, AppConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_env_file();
    let config = AppConfig::from_env()?;

    telemetry::init_tracing(&config)?;
    let metrics = telemetry::init_metrics()?;

    let http = reqwest::Client::builder().build()?;
    let line = LineClient::new(config.line_api_base.clone(), http);
    let state = router::AppState::new(metrics, line, &config);

    let addr: SocketAddr = config.bind_addr;
    info!(
        stage = "app",
        %addr,
        env = %config.environment.as_str(),
        mode = %config.mode.as_str(),
        "starting HTTP server"
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router::app_router(state))
        .await
        .map_err(|err| err.into())
}
