use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use masc_backend::Encryptor;
use masc_domain::clock::{SharedClock, SystemClock};
use masc_domain::config::{Config, ConfigSeverity};
use masc_gateway::api;
use masc_gateway::auth::AuthVerifier;
use masc_gateway::cancel::CancelMap;
use masc_gateway::cli::{Cli, Command, ConfigCommand};
use masc_gateway::metrics::Metrics;
use masc_gateway::rate_limit::RateLimiter;
use masc_gateway::shutdown::DrainTracker;
use masc_gateway::state::AppState;
use masc_gateway::supervisor;
use masc_gateway::tools::ToolRegistry;
use masc_room::RoomStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(Config::from_env());

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            init_tracing(&config);
            run_server(config).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            if !masc_gateway::cli::validate(&config) {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            masc_gateway::cli::show(&config);
            Ok(())
        }
        Some(Command::Version) => {
            println!("masc-server {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Structured JSON tracing for the serve path.
fn init_tracing(config: &Config) {
    let default = format!("{},masc_gateway=debug", config.server.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .json()
        .init();
}

async fn run_server(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("MASC starting");

    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Storage & room ───────────────────────────────────────────────
    let clock: SharedClock = Arc::new(SystemClock);
    let backend = masc_backend::from_config(&config.storage)
        .await
        .context("backend init")?;
    let encryptor = Encryptor::from_hex_key(config.storage.encryption_key.as_deref())
        .context("encryption init")?;
    if encryptor.enabled() {
        tracing::info!("at-rest encryption enabled");
    }
    let store = Arc::new(
        RoomStore::open(
            backend,
            clock.clone(),
            encryptor,
            config.storage.cluster_name(),
            config.storage.room.clone(),
            config.lifecycle.clone(),
        )
        .await
        .context("room store init")?,
    );
    tracing::info!(
        cluster = %store.cluster(),
        room = %store.room_id(),
        storage = ?config.storage.storage_type,
        "room store ready"
    );

    // ── Services ─────────────────────────────────────────────────────
    let registry = Arc::new(ToolRegistry::standard());
    tracing::info!(tools = registry.len(), "tool registry ready");

    let state = AppState {
        config: config.clone(),
        clock: clock.clone(),
        store: store.clone(),
        registry,
        cancels: Arc::new(CancelMap::new()),
        drain: DrainTracker::new(),
        auth: Arc::new(AuthVerifier::from_config(&config.server).context("auth init")?),
        limiter: Arc::new(RateLimiter::new(config.limits.clone(), clock.clone())),
        metrics: Arc::new(Metrics::new()),
        started_at: clock.now(),
    };

    // ── Supervisor ───────────────────────────────────────────────────
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let supervisor_handle = supervisor::spawn(state.clone(), shutdown_rx);

    // ── HTTP server ──────────────────────────────────────────────────
    let app = api::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "listening");

    let drain = state.drain.clone();
    let bus = store.bus().clone();
    let drain_timeout = Duration::from_secs_f64(config.lifecycle.drain_timeout.max(0.0));
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        wait_for_signal().await;
        tracing::info!("shutdown signal received; draining");

        // Stop admitting requests, wait for in-flight work, then tell
        // subscribers and the supervisor to wind down.
        let clean = drain.drain(drain_timeout).await;
        if !clean {
            tracing::warn!(
                in_flight = drain.in_flight(),
                "drain timeout expired with requests still running"
            );
        }
        let _ = shutdown_tx.send(true);
        bus.close_all();
    })
    .await
    .context("server error")?;

    supervisor_handle.abort();
    tracing::info!("MASC stopped");
    Ok(())
}

async fn wait_for_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
