//! balanced-fetch host binary.
//!
//! Builds a pool of HTTP backends from a TOML file, then either sends
//! requests through it (`fetch`) or keeps it alive behind the diagnostics
//! endpoint with hot-reloaded scoring tunables (`serve`).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use http::{HeaderName, HeaderValue, Method};

use balanced_fetch::config::{load_config, watcher};
use balanced_fetch::lifecycle::Shutdown;
use balanced_fetch::observability::{logging, metrics};
use balanced_fetch::{admin, FetchRequest, Pool, RequestInit};

#[derive(Parser)]
#[command(name = "balanced-fetch")]
#[command(about = "Score-ranked fetch pool with idempotent retries", long_about = None)]
struct Cli {
    /// Pool configuration file (TOML).
    #[arg(short, long, default_value = "pool.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send requests through the pool and print the backend records
    Fetch {
        /// Path or URL; only path and query reach the backends
        target: String,

        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Extra request header as `name: value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Number of sequential requests
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,

        /// Per-attempt deadline in milliseconds, overriding the config
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Serve backend diagnostics and watch the config for scoring changes
    Serve,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        path = %cli.config.display(),
        backends = config.backends.len(),
        attempt_timeout_ms = config.timeouts.attempt_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let pool = Arc::new(Pool::from_config(&config)?);

    match cli.command {
        Commands::Fetch {
            target,
            method,
            headers,
            count,
            timeout_ms,
        } => {
            let method = Method::from_bytes(method.as_bytes())?;
            let mut request = FetchRequest::get(&target)?;
            request.method = method;
            for header in &headers {
                let (name, value) = header
                    .split_once(':')
                    .ok_or_else(|| format!("header '{}' is not in 'name: value' form", header))?;
                request = request.with_header(
                    HeaderName::from_bytes(name.trim().as_bytes())?,
                    HeaderValue::from_str(value.trim())?,
                );
            }
            let init = timeout_ms.map(|ms| RequestInit {
                timeout: Some(Duration::from_millis(ms)),
                ..RequestInit::default()
            });

            for i in 0..count {
                let response = pool.fetch(request.clone(), init.clone()).await;
                println!("[{}] {} {}", i + 1, response.status, response.text());
            }
            println!("{}", serde_json::to_string_pretty(&pool.snapshot())?);
        }
        Commands::Serve => {
            let shutdown = Shutdown::new();

            let (config_watcher, updates) = watcher::ConfigWatcher::new(&cli.config);
            // dropping the handle stops the watch
            let _watch_handle = match config_watcher.run() {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(error = %e, "Config watcher unavailable; scoring will not hot reload");
                    None
                }
            };
            let updater = tokio::spawn(watcher::run_updates(pool.clone(), updates, shutdown.clone()));

            let signal_shutdown = shutdown.clone();
            tokio::spawn(async move {
                signal_shutdown.trigger_on_ctrl_c().await;
            });

            if config.admin.enabled {
                let listener = tokio::net::TcpListener::bind(&config.admin.bind_address).await?;
                admin::serve(listener, pool.clone(), &shutdown).await?;
            } else {
                tracing::info!("Diagnostics endpoint disabled; waiting for shutdown");
                shutdown.wait().await;
            }

            let _ = updater.await;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
