use clap::{Parser, Subcommand};
use perp_screener_core::ConfigLoader;
use perp_screener_screener::{run_periodic, RefreshOutcome, ScreenerService};
use perp_screener_web_api::ApiServer;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "perp-screener")]
#[command(about = "Binance perp futures screener with CoinGecko enrichment", long_about = None)]
struct Cli {
    /// Config directory containing Config.toml
    #[arg(short, long, default_value = "config", global = true)]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one screening pass, write the CSV snapshot, and exit
    Screen,
    /// Run the periodic scheduler and the web API
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match cli.command {
        Commands::Screen => run_screen(&cli.config_dir).await?,
        Commands::Serve => run_serve(&cli.config_dir).await?,
    }

    Ok(())
}

async fn run_screen(config_dir: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load_from_dir(config_dir)?;
    let service = ScreenerService::from_config(config)?;

    match service.refresh().await? {
        RefreshOutcome::Completed { rows } => {
            tracing::info!(rows, "Screening run complete");
        }
        RefreshOutcome::Skipped => {
            tracing::warn!("Screening run skipped, another run was in progress");
        }
    }

    Ok(())
}

async fn run_serve(config_dir: &str) -> anyhow::Result<()> {
    let config = ConfigLoader::load_from_dir(config_dir)?;
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let interval = Duration::from_secs(config.screener.refresh_interval_secs);

    let service = Arc::new(ScreenerService::from_config(config)?);

    let scheduler = tokio::spawn(run_periodic(Arc::clone(&service), interval));

    let server = ApiServer::new(Arc::clone(&service));
    let mut server_handle = tokio::spawn(async move {
        if let Err(e) = server.serve(&addr).await {
            tracing::error!("Server error: {}", e);
        }
    });

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = &mut server_handle => {
            tracing::error!("Web server exited unexpectedly");
        }
    }

    scheduler.abort();
    server_handle.abort();

    Ok(())
}
