//! dispatchd — the dispatcher daemon.
//!
//! Single binary that assembles the dispatcher:
//! - Live and dispatch registries
//! - Reconciler (live → dispatch, fixed interval)
//! - Selection scheduler + handoff channel
//! - Internal listener (workers) and external listener (clients)
//!
//! # Usage
//!
//! ```text
//! dispatchd --config /etc/dispatchd.toml
//! ```

use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info};

use dispatch_core::DispatcherConfig;
use dispatch_listener::{AccessList, ExternalListener, InternalListener};
use dispatch_registry::{DispatchContext, Reconciler};
use dispatch_scheduler::SelectionScheduler;

#[derive(Parser)]
#[command(name = "dispatchd", version, about = "Least-loaded worker dispatcher")]
struct Cli {
    /// Config file (TOML, or JSON with a `.json` extension). Defaults to
    /// `<executable>.toml`, then `<executable>.json`, when present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the worker-facing bind address.
    #[arg(long)]
    inter_addr: Option<String>,

    /// Override the client-facing bind address.
    #[arg(long)]
    outer_addr: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "dispatcher starting");
    run(config).await
}

fn load_config(cli: &Cli) -> anyhow::Result<DispatcherConfig> {
    let mut config = match &cli.config {
        Some(path) => DispatcherConfig::from_file(path)?,
        None => match default_config_path() {
            Some(path) => DispatcherConfig::from_file(&path)?,
            None => DispatcherConfig::default(),
        },
    };

    if let Some(addr) = &cli.inter_addr {
        config.inter_addr = addr.clone();
    }
    if let Some(addr) = &cli.outer_addr {
        config.outer_addr = addr.clone();
    }
    config.validate()?;
    Ok(config)
}

/// `<executable path>.toml`, or `<executable path>.json`, next to the binary.
fn default_config_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    existing_config_beside(&exe)
}

fn existing_config_beside(exe: &Path) -> Option<PathBuf> {
    ["toml", "json"]
        .into_iter()
        .map(|ext| with_appended_extension(exe, ext))
        .find(|path| path.exists())
}

fn with_appended_extension(path: &Path, ext: &str) -> PathBuf {
    let mut raw = path.as_os_str().to_owned();
    raw.push(".");
    raw.push(ext);
    PathBuf::from(raw)
}

async fn run(config: DispatcherConfig) -> anyhow::Result<()> {
    // ── Shared state ───────────────────────────────────────────

    let ctx = DispatchContext::new(config.page_capacity());
    let (handoff_tx, handoff) = dispatch_scheduler::channel(
        config.channel_capacity(),
        ctx.dispatch.clone(),
        config.handoff_wait(),
    );

    // ── Listeners ──────────────────────────────────────────────

    let internal = InternalListener::bind(
        config.inter_socket_addr()?,
        ctx.live.clone(),
        AccessList::new(config.allowed_ips()?),
        config.read_deadline(),
    )
    .await
    .inspect_err(|e| error!(error = %e, "internal listener failed to start"))?;

    let external = ExternalListener::bind(
        config.outer_socket_addr()?,
        handoff,
        AccessList::new(config.denied_ips()?),
    )
    .await
    .inspect_err(|e| error!(error = %e, "external listener failed to start"))?;

    // ── Background tasks ───────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let reconciler = Reconciler::new(&ctx, config.sync_interval());
    let reconcile_shutdown = shutdown_rx.clone();
    let reconcile_handle = tokio::spawn(async move {
        reconciler.run(reconcile_shutdown).await;
    });

    let scheduler = SelectionScheduler::new(&ctx, handoff_tx);
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx.clone()));

    let internal_handle = tokio::spawn(internal.run(shutdown_rx.clone()));
    let external_handle = tokio::spawn(external.run(shutdown_rx));

    // ── Shutdown ───────────────────────────────────────────────

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = tokio::join!(
        reconcile_handle,
        scheduler_handle,
        internal_handle,
        external_handle
    );

    for worker in ctx.live.snapshot().sorted_by_load() {
        if let Some(endpoint) = worker.endpoint() {
            info!(%endpoint, load = worker.load, "worker connected at shutdown");
        }
    }

    info!("dispatcher stopped");
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
