//! Quotable API server.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ request id / trace / panic recovery / timeout
//!                         │
//!                         ▼
//!                   ClientRegistry (rate limit) ──▶ 429
//!                         │
//!                         ▼
//!                   AuthGate (bearer token) ──▶ 401
//!                         │
//!                         ▼
//!                   handlers ──▶ QueryPlanner (reads) / ConcurrencyGuard (writes)
//!                         │
//!                         ▼
//!                   SQLite store (every call under a deadline)
//! ```
//!
//! Startup order: config → logging → metrics → store → sweeper, task pool,
//! config watcher → listener. Shutdown runs the other way: the server drains,
//! then the task pool, then the sweeper is joined and the store closed.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use quotable::config::loader::{load_config, ConfigError};
use quotable::config::validation::validate_config;
use quotable::config::watcher::ConfigWatcher;
use quotable::config::{AppConfig, LimiterConfig};
use quotable::data::Database;
use quotable::http::health::VERSION;
use quotable::http::{AppState, HttpServer};
use quotable::lifecycle::{signals, Shutdown, TaskPool};
use quotable::observability::{logging, metrics};
use quotable::security::ClientRegistry;

#[derive(Parser, Debug)]
#[command(name = "quotable", about = "Quote API server", disable_version_flag = true)]
struct Args {
    /// TOML configuration file. Its [limiter] section is reloaded on change.
    #[arg(short, long, env = "QUOTABLE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on, overriding the configured bind address port
    #[arg(long)]
    port: Option<u16>,

    /// Environment (development|staging|production)
    #[arg(long)]
    env: Option<String>,

    /// SQLite database file
    #[arg(long, env = "QUOTABLE_DB")]
    db_path: Option<String>,

    /// Rate limiter maximum requests per second
    #[arg(long, allow_negative_numbers = true)]
    limiter_rps: Option<f64>,

    /// Rate limiter maximum burst
    #[arg(long, allow_negative_numbers = true)]
    limiter_burst: Option<i64>,

    /// Enable the rate limiter
    #[arg(long)]
    limiter_enabled: Option<bool>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,

    /// Display version and exit
    #[arg(long)]
    version: bool,
}

/// Limiter values given on the command line. They survive config reloads.
#[derive(Debug, Clone, Copy)]
struct LimiterOverrides {
    rps: Option<f64>,
    burst: Option<i64>,
    enabled: Option<bool>,
}

impl LimiterOverrides {
    fn apply(&self, limiter: &mut LimiterConfig) {
        if let Some(rps) = self.rps {
            limiter.requests_per_second = rps;
        }
        if let Some(burst) = self.burst {
            limiter.burst = burst;
        }
        if let Some(enabled) = self.enabled {
            limiter.enabled = enabled;
        }
    }
}

impl Args {
    fn limiter_overrides(&self) -> LimiterOverrides {
        LimiterOverrides {
            rps: self.limiter_rps,
            burst: self.limiter_burst,
            enabled: self.limiter_enabled,
        }
    }

    fn apply(&self, config: &mut AppConfig) {
        if let Some(port) = self.port {
            let host = config
                .server
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host.to_string())
                .unwrap_or_else(|| "0.0.0.0".to_string());
            config.server.bind_address = format!("{host}:{port}");
        }
        if let Some(env) = &self.env {
            config.server.environment = env.clone();
        }
        if let Some(path) = &self.db_path {
            config.database.path = path.clone();
        }
        if self.log_json {
            config.observability.log_json = true;
        }
        self.limiter_overrides().apply(&mut config.limiter);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if args.version {
        println!("Version:\t{VERSION}");
        println!(
            "Build time:\t{}",
            option_env!("QUOTABLE_BUILD_TIME").unwrap_or("unknown")
        );
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = VERSION, environment = %config.server.environment, "quotable starting");

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let db = Database::open(&config.database).await?;
    let config = Arc::new(config);
    let shutdown = Shutdown::new();

    let limiter = Arc::new(ClientRegistry::new(config.limiter.clone()));
    let sweeper = limiter.clone().spawn_sweeper(shutdown.subscribe());
    let (tasks, task_pool) = TaskPool::start(&config.workers, shutdown.subscribe());

    // keeps the file watcher alive for the life of the process
    let _watcher = match &args.config {
        Some(path) => {
            let (watcher, mut updates) = ConfigWatcher::new(path);
            let watcher = watcher.run()?;
            let limiter = limiter.clone();
            let overrides = args.limiter_overrides();
            tokio::spawn(async move {
                while let Some(mut reloaded) = updates.recv().await {
                    overrides.apply(&mut reloaded.limiter);
                    limiter.reconfigure(reloaded.limiter);
                }
            });
            Some(watcher)
        }
        None => None,
    };

    let state = AppState::new(config.clone(), db.clone(), limiter, tasks);
    let server = HttpServer::new(state);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let mut server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let signalled = tokio::select! {
        _ = signals::wait_for_signal() => true,
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => tracing::warn!("HTTP server exited unexpectedly"),
                Ok(Err(e)) => tracing::error!(error = %e, "HTTP server failed"),
                Err(e) => tracing::error!(error = %e, "HTTP server task failed"),
            }
            false
        }
    };
    shutdown.trigger();

    if signalled {
        match tokio::time::timeout(grace, &mut server_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::error!(error = %e, "HTTP server failed while draining"),
            Ok(Err(e)) => tracing::error!(error = %e, "HTTP server task failed"),
            Err(_) => {
                tracing::warn!(?grace, "Shutdown grace period elapsed; dropping open connections");
                server_task.abort();
            }
        }
    }

    task_pool.drain(grace).await;
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Client bucket sweeper failed");
    }
    db.close().await;

    tracing::info!("Shutdown complete");
    Ok(())
}
