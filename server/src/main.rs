use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vitae::{db, load_config, Database};

use vitae_server::{create_router, AppState};

#[derive(Parser)]
#[command(name = "vitae-server")]
#[command(about = "Version and proposal reconciliation engine for resume documents")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, default_value = "vitae.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port for the HTTP API
        #[arg(short, long, default_value = "4780")]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Bridge `log` records from the engine into tracing.
    tracing_log::LogTracer::init()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "vitae=debug,vitae_server=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let port = match cli.command {
        Some(Commands::Serve { port }) => port,
        None => 4780,
    };

    let config = load_config(&cli.config)?;
    let db_path = config
        .database_path
        .clone()
        .or_else(db::default_database_path)
        .ok_or_else(|| anyhow::anyhow!("could not determine a database path"))?;
    let database = Database::open(&db_path)?;

    let state = AppState::from_config(&config, database);
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("vitae server listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}
