use std::pin::pin;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sqlagent_ui::api::ApiClient;
use sqlagent_ui::config::ClientConfig;
use sqlagent_ui::console::{self, ConsoleView, HELP};
use sqlagent_ui::controller::Controller;
use sqlagent_ui::http::ReqwestTransport;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();

    let config = ClientConfig::load()?;
    info!(
        backend = %config.backend_url,
        config = %config.config_path.display(),
        "sqlagent-ui starting"
    );

    let transport = ReqwestTransport::new()?;
    let controller = Controller::new(ApiClient::new(transport, config), ConsoleView::stdout());
    controller.load().await;
    controller.view().print(HELP);

    let stdin = BufReader::new(tokio::io::stdin()).lines();
    let lines = futures::stream::unfold(stdin, |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((Ok(line), lines)),
            Ok(None) => None,
            Err(err) => Some((Err(err), lines)),
        }
    });
    console::run(&controller, pin!(lines), shutdown_signal())
        .await
        .context("failed reading stdin")?;

    info!("sqlagent-ui exiting");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
