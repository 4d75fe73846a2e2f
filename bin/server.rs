// Case Docket - Web Server
// REST API with Axum

use anyhow::{Context, Result};
use case_docket::api::router;
use case_docket::config::{init_tracing, ServerArgs};
use case_docket::service::DocketService;
use clap::Parser;
use tracing::info;

#[derive(Parser)]
#[command(name = "docket-server", version, about = "Case docket REST API")]
struct Cli {
    #[command(flatten)]
    server: ServerArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(&cli.server.store.log_level);

    let db_path = &cli.server.store.db;
    let service = DocketService::open(db_path)
        .with_context(|| format!("opening {}", db_path.display()))?;

    let app = router(service);

    let listener = tokio::net::TcpListener::bind(cli.server.listen)
        .await
        .with_context(|| format!("binding {}", cli.server.listen))?;

    info!(addr = %cli.server.listen, db = %db_path.display(), "docket-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("docket-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
    }
}
