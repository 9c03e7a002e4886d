//! # Aviary CLI Entry Point
//!
//! Main binary for the Aviary demo pair. Starts either the bird-serving
//! backend or the proxying frontend. Every setting resolves from its CLI
//! flag, then the matching environment variable, then a built-in default.
//!
//! ## Usage
//!
//! ```bash
//! # Start the backend on the default port with the canonical dataset
//! aviary backend
//!
//! # Start the backend with canaries and a span collector
//! aviary backend --dataset-version v2 --tracing-url http://127.0.0.1:9411
//!
//! # Start the frontend against a remote backend
//! aviary frontend --bind-addr 0.0.0.0:6060 --backend-url http://backend:7000
//! ```
//!
//! ## URL Format
//!
//! All URLs must include the `http://` or `https://` prefix:
//! - ✅ `http://127.0.0.1:9411`
//! - ❌ `127.0.0.1:9411`

use anyhow::Result;
use argh::FromArgs;

use aviary_backend::{BackendConfig, BackendServer};
use aviary_frontend::{FrontendConfig, FrontendServer};

/// Validates that a URL string starts with http:// or https://
///
/// # Arguments
///
/// * `url` - The URL string to validate
/// * `description` - Human-readable description of what the URL is for (e.g., "backend URL")
///
/// # Returns
///
/// `Ok(())` if the URL is valid, `Err` otherwise
fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow::anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Main CLI structure parsed from command-line arguments.
///
/// Uses `argh` for declarative argument parsing. The top-level command
/// dispatches to one of the two services: backend or frontend.
#[derive(FromArgs)]
/// Aviary - a tiny two-service bird demo
struct Cli {
    /// print version information and exit
    #[argh(switch)]
    version: bool,

    #[argh(subcommand)]
    command: Option<Commands>,
}

/// Available CLI subcommands.
///
/// - **Backend**: serve bird facts with caller-controlled fault injection
/// - **Frontend**: serve the demo UI and proxy `/shuffle` to a backend
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Backend(BackendArgs),
    Frontend(FrontendArgs),
}

/// Arguments for starting the backend service.
///
/// The backend serves one bird fact per request from an embedded dataset,
/// cycling through it in order, and honors the `delay` and `error-rate`
/// query params for fault injection.
#[derive(FromArgs)]
#[argh(subcommand, name = "backend")]
/// start the bird-serving backend
struct BackendArgs {
    /// address to bind the HTTP server to
    ///
    /// Falls back to $BIND_ADDR, then "0.0.0.0:7000".
    #[argh(option, long = "bind-addr")]
    bind_addr: Option<String>,

    /// embedded dataset to serve: "v1" (birds) or "v2" (canaries)
    ///
    /// Falls back to $VERSION, then "v1". Any other value is rejected
    /// at startup.
    #[argh(option, long = "dataset-version")]
    dataset_version: Option<String>,

    /// span collector base URL; tracing stays off without one
    ///
    /// Falls back to $TRACING_URL. Spans are POSTed to <url>/api/v2/spans.
    /// Must include the http:// or https:// prefix.
    #[argh(option, long = "tracing-url")]
    tracing_url: Option<String>,
}

/// Arguments for starting the frontend service.
///
/// The frontend serves the embedded demo UI and proxies `/shuffle` to the
/// configured backend, timing each call and reporting backend failures
/// inside its reply envelope.
#[derive(FromArgs)]
#[argh(subcommand, name = "frontend")]
/// start the UI and proxy frontend
struct FrontendArgs {
    /// address to bind the HTTP server to
    ///
    /// Falls back to $BIND_ADDR, then "0.0.0.0:6060".
    #[argh(option, long = "bind-addr")]
    bind_addr: Option<String>,

    /// base URL of the backend service
    ///
    /// Falls back to $BACKEND_URL, then "http://localhost:7000". A trailing
    /// slash is stripped. Must include the http:// or https:// prefix.
    #[argh(option, long = "backend-url")]
    backend_url: Option<String>,

    /// span collector base URL; tracing stays off without one
    ///
    /// Falls back to $TRACING_URL. Spans are POSTed to <url>/api/v2/spans.
    /// Must include the http:// or https:// prefix.
    #[argh(option, long = "tracing-url")]
    tracing_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    if cli.version {
        println!("aviary {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Set default log level to INFO, but allow RUST_LOG env var to override
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .init();

    match cli.command {
        Some(Commands::Backend(args)) => run_backend(args).await,
        Some(Commands::Frontend(args)) => run_frontend(args).await,
        None => Err(anyhow::anyhow!(
            "no subcommand given; run `aviary --help` for usage"
        )),
    }
}

/// Executes the `backend` subcommand.
async fn run_backend(args: BackendArgs) -> Result<()> {
    if let Some(url) = &args.tracing_url {
        validate_http_url(url, "tracing collector URL")?;
    }

    let config = BackendConfig::resolve(args.bind_addr, args.dataset_version, args.tracing_url)?;
    tracing::info!(
        "Starting backend version={} bind_addr={}",
        config.version,
        config.bind_addr
    );

    let server = BackendServer::new(config)?;
    server.run().await?;

    Ok(())
}

/// Executes the `frontend` subcommand.
async fn run_frontend(args: FrontendArgs) -> Result<()> {
    if let Some(url) = &args.backend_url {
        validate_http_url(url, "backend URL")?;
    }
    if let Some(url) = &args.tracing_url {
        validate_http_url(url, "tracing collector URL")?;
    }

    let config = FrontendConfig::resolve(args.bind_addr, args.backend_url, args.tracing_url);
    tracing::info!(
        "Starting frontend bind_addr={} backend_url={}",
        config.bind_addr,
        config.backend_url
    );

    let server = FrontendServer::new(config)?;
    server.run().await?;

    Ok(())
}
