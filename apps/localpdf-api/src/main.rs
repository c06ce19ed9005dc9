//! LocalPDF API server
//!
//! Serves one HTTP endpoint per PDF tool on the loopback interface. The
//! desktop shell starts this binary, reads the `API_PORT:` line it prints
//! on stdout and talks to it from a local page.
//!
//! Tools that lopdf can handle run in process; compression, encryption,
//! rendering, redaction, watermarking and image extraction are delegated to
//! Ghostscript, qpdf and the bundled helper executables.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use localpdf_core::{ToolConfig, Toolbox};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod api;
mod error;
mod state;
#[cfg(test)]
mod tests;

use state::AppState;

/// Command-line arguments for the LocalPDF API server
#[derive(Parser, Debug)]
#[command(name = "localpdf-api")]
#[command(about = "Local HTTP API for the LocalPDF Studio PDF tools")]
struct Args {
    /// Port to listen on (0 picks a free port)
    #[arg(short, long, env = "LOCALPDF_PORT", default_value = "5000")]
    port: u16,

    /// Host address to bind to
    #[arg(long, env = "LOCALPDF_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Directory holding the bundled helper executables
    #[arg(long, env = "LOCALPDF_SCRIPTS_DIR")]
    scripts_dir: Option<PathBuf>,

    /// Ghostscript executable (searched for when unset)
    #[arg(long, env = "LOCALPDF_GHOSTSCRIPT")]
    ghostscript: Option<PathBuf>,

    /// qpdf executable
    #[arg(long, env = "LOCALPDF_QPDF", default_value = "qpdf")]
    qpdf: PathBuf,

    /// Directory for intermediate files
    #[arg(long, env = "LOCALPDF_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Largest helper result accepted, in MiB
    #[arg(long, default_value = "256")]
    max_helper_output_mb: usize,

    /// Largest request body accepted, in MiB
    #[arg(long, default_value = "512")]
    max_upload_mb: usize,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn tool_config(&self) -> ToolConfig {
        let defaults = ToolConfig::default();
        ToolConfig {
            ghostscript: self.ghostscript.clone(),
            qpdf: self.qpdf.clone(),
            scripts_dir: self.scripts_dir.clone().unwrap_or_else(default_scripts_dir),
            temp_dir: self.temp_dir.clone().unwrap_or(defaults.temp_dir),
            max_output_bytes: self.max_helper_output_mb * 1024 * 1024,
        }
    }
}

/// `scripts/` next to the executable, where the installer puts the helpers.
fn default_scripts_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("scripts")))
        .unwrap_or_else(|| PathBuf::from("scripts"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(log_level.into())
                .add_directive(format!("localpdf_api={}", log_level).parse()?)
                .add_directive(format!("localpdf_core={}", log_level).parse()?)
                .add_directive("tower_http=debug".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.tool_config();
    info!(
        scripts = %config.scripts_dir.display(),
        temp = %config.temp_dir.display(),
        qpdf = %config.qpdf.display(),
        "tool configuration"
    );

    let state = AppState::new(Toolbox::new(config));

    // Configure CORS: the front end is a local page with no fixed origin
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    let app = api::router(state, args.max_upload_mb * 1024 * 1024)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound = listener.local_addr()?;

    // The desktop shell reads this line to find the server
    println!("API_PORT:{}", bound.port());
    info!("LocalPDF API listening on {}", bound);

    axum::serve(listener, app).await?;

    Ok(())
}
