//! mtg-daemon entry point.
//!
//! Startup order: dotenv, tracing, config layers, secrets, terminal, engine,
//! audit sink, router. Handlers are in `routes.rs`, shared state in
//! `state.rs`.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use clap::Parser;
use mtg_audit::AuditWriter;
use mtg_broker_paper::{default_symbols, PaperTerminal};
use mtg_broker_remote::{RemoteSettings, RemoteTerminal};
use mtg_config::{
    load_layered_yaml, report_unknown_keys, resolve_secrets, GatewayConfig, LoadedConfig,
    ResolvedSecrets, Transport, UnknownKeyPolicy,
};
use mtg_daemon::{
    routes,
    state::{AppState, DynTerminal, Engine},
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "mtg-daemon")]
#[command(about = "Broker order-execution gateway", long_about = None)]
struct Args {
    /// Config layers in merge order (base -> overlay ...). Repeatable.
    #[arg(long = "config", env = "MTG_CONFIG", value_delimiter = ',')]
    config: Vec<PathBuf>,

    /// Listen address; overrides `server.addr`.
    #[arg(long, env = "MTG_DAEMON_ADDR")]
    addr: Option<SocketAddr>,

    /// Refuse configs carrying keys the gateway does not read.
    #[arg(long, default_value_t = false)]
    strict_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if the file does
    // not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let args = Args::parse();

    let loaded = load_config(&args.config)?;
    let policy = if args.strict_config {
        UnknownKeyPolicy::Fail
    } else {
        UnknownKeyPolicy::Warn
    };
    let report = report_unknown_keys(&loaded.config_json, policy)?;
    for pointer in &report.unknown_leaf_pointers {
        warn!(%pointer, "config key is not read by the gateway");
    }

    let cfg = GatewayConfig::from_json(&loaded.config_json)?;
    let secrets = resolve_secrets(&cfg)?;
    info!(
        config_hash = %loaded.config_hash,
        layers = args.config.len(),
        transport = ?cfg.terminal.transport,
        "configuration loaded"
    );

    let terminal = build_terminal(&cfg, &secrets)?;
    let engine = Engine::new(terminal, cfg.order_policy());

    let mut state = AppState::new(engine).with_config_hash(loaded.config_hash);
    if let Some(path) = &cfg.audit.path {
        let writer = AuditWriter::open(path, cfg.audit.hash_chain)
            .with_context(|| format!("open audit log {}", path.display()))?;
        info!(
            path = %path.display(),
            session_id = %writer.session_id(),
            resumed_at = writer.seq(),
            "audit log enabled"
        );
        state = state.with_audit(writer);
    }
    let shared = Arc::new(state);

    let app = routes::build_router(Arc::clone(&shared))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_from_config(&cfg.server.cors_origins));

    let addr = match args.addr {
        Some(addr) => addr,
        None => cfg.bind_addr()?,
    };
    info!("mtg-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server crashed")?;

    // The remote terminal owns a blocking HTTP client, which panics if its
    // internal runtime is dropped on an async worker.
    tokio::task::block_in_place(move || drop(shared));

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// No layers means an all-default configuration (paper terminal).
fn load_config(paths: &[PathBuf]) -> Result<LoadedConfig> {
    if paths.is_empty() {
        warn!("no --config given; running with built-in defaults");
    }
    load_layered_yaml(paths)
}

fn build_terminal(cfg: &GatewayConfig, secrets: &ResolvedSecrets) -> Result<DynTerminal> {
    match cfg.terminal.transport {
        Transport::Paper => {
            let paper = &cfg.terminal.paper;
            let terminal = if paper.symbols.is_empty() {
                PaperTerminal::with_symbols(paper.balance, default_symbols())
            } else {
                PaperTerminal::with_symbols(paper.balance, paper.symbols.iter().cloned())
            };
            info!(balance = paper.balance, "paper terminal ready");
            Ok(Box::new(terminal))
        }
        Transport::Remote => {
            let remote = &cfg.terminal.remote;
            let settings = RemoteSettings {
                base_url: remote.url.clone(),
                timeout: remote.timeout(),
                token: secrets.remote_token.clone(),
            };
            // The blocking HTTP client must not be built on a runtime worker.
            let terminal = tokio::task::block_in_place(|| RemoteTerminal::connect(&settings))
                .context("remote terminal setup failed")?;
            info!(url = %remote.url, timeout_ms = remote.timeout_ms, "remote terminal ready");
            Ok(Box::new(terminal))
        }
    }
}

fn cors_from_config(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "ctrl-c handler failed; shutting down");
        return;
    }
    info!("shutdown requested");
}
