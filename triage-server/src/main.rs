use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};
use triage_core::TriageConfig;

use triage_server::{http, router::TriageState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "triage.toml")]
    config: String,

    /// Validate the configuration and exit
    #[arg(long)]
    check_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience; production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config = match TriageConfig::load_validated(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging; RUST_LOG wins over [service] log_level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.service.log_level));
    fmt().with_env_filter(filter).init();

    if args.check_config {
        println!("✅ Config OK: {}", args.config);
        println!("   vocabulary {}", config.vocabulary.version);
        println!(
            "   persistence {}",
            if config.persistence.enabled {
                config.persistence.base_url.as_str()
            } else {
                "disabled (simulated)"
            }
        );
        return Ok(());
    }

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let state = TriageState::from_config(config)?;

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    http::start_http_server(&addr, state, tx.subscribe()).await?;

    Ok(())
}
