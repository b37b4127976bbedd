use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use serveme::{app, lan, AppState, Config};

#[derive(Parser, Debug)]
#[command(name = "serveme")]
#[command(about = "Serve a folder over HTTP with downloadable folders as ZIPs")]
#[command(version)]
struct Cli {
    /// Folder to serve
    #[arg(value_name = "FOLDER", env = "SERVEME_ROOT", default_value = ".")]
    folder: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "SERVEME_PORT", default_value = "8080")]
    port: u16,

    /// Address to bind to
    #[arg(short, long, env = "SERVEME_BIND", default_value = "0.0.0.0")]
    bind: String,

    /// Enable verbose logging
    #[arg(short, long, env = "SERVEME_VERBOSE")]
    verbose: bool,

    /// Config file path (optional)
    #[arg(short, long, env = "SERVEME_CONFIG")]
    config: Option<PathBuf>,

    /// Do not print the QR code
    #[arg(long, env = "SERVEME_NO_QR")]
    no_qr: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "serveme=debug,tower_http=debug"
    } else {
        "serveme=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load config from file if provided, otherwise use defaults
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        Config::default()
    };

    // Resolve root directory to absolute path
    let root_dir = cli.folder.canonicalize().unwrap_or_else(|_| cli.folder.clone());

    if !root_dir.exists() {
        return Err(format!("Root directory does not exist: {}", root_dir.display()).into());
    }

    if !root_dir.is_dir() {
        return Err(format!("Root path is not a directory: {}", root_dir.display()).into());
    }

    info!("Serving files from: {}", root_dir.display());

    let addr: SocketAddr = format!("{}:{}", cli.bind, cli.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let port = listener.local_addr()?.port();
    info!("Listening on {}", addr);

    let url = lan::lan_url(lan::local_ip(), port);

    println!("Serving {} at:", root_dir.display());
    println!("  {}\n", url);

    if !cli.no_qr {
        match lan::render_qr(&url) {
            Ok(code) => {
                println!("Scan this QR code to open on your mobile device:\n");
                println!("{}", code);
            }
            Err(e) => warn!("Could not render QR code: {}", e),
        }
    }

    let state = AppState::with_config(root_dir, config);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    println!("\nShutting down server...");
}
