// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use huntd::ai;
use huntd::config::Config;
use huntd::event::EventBus;
use huntd::gateway::{self, AppState};
use huntd::hunt::{parse_module, HuntModule};
use huntd::session::registry::SessionRegistry;

const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_STORE_ERROR: i32 = 3;
const EXIT_MODULES_ERROR: i32 = 4;
const EXIT_GATEWAY_ERROR: i32 = 5;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(err) = config.validate() {
        eprintln!("invalid configuration: {err:#}");
        std::process::exit(EXIT_CONFIG_ERROR);
    }

    init_tracing(&config);

    if let Err(code) = run(config).await {
        std::process::exit(code);
    }
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if config.log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(config: Config) -> Result<(), i32> {
    info!(port = config.port, host = config.host.as_str(), "starting huntd");

    let store = if config.db_path == ":memory:" {
        huntd_store::AsyncStore::open_in_memory()
    } else {
        huntd_store::AsyncStore::open(std::path::Path::new(&config.db_path))
    }
    .map_err(|err| {
        error!("failed to open intelligence store at {}: {err}", config.db_path);
        EXIT_STORE_ERROR
    })?;

    let modules = load_modules(&config).map_err(|err| {
        error!("failed to load hunt modules: {err:#}");
        EXIT_MODULES_ERROR
    })?;
    info!(count = modules.len(), "loaded hunt modules");

    let bus = Arc::new(EventBus::new(1024));
    let registry = Arc::new(SessionRegistry::new());
    let shutdown = CancellationToken::new();

    let driver = ai::build_driver(&config).map_err(|err| {
        error!("failed to build ai driver: {err:#}");
        EXIT_CONFIG_ERROR
    })?;

    let state = AppState::new(&config, registry.clone(), bus.clone(), store, driver, modules, shutdown.clone())
        .map_err(|err| {
            error!("failed to build gateway state: {err:#}");
            EXIT_CONFIG_ERROR
        })?;
    let router = gateway::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await.map_err(|err| {
        error!("failed to bind {addr}: {err}");
        EXIT_GATEWAY_ERROR
    })?;
    info!(%addr, "gateway listening");

    let server_shutdown = shutdown.clone();
    let server = tokio::spawn(async move {
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(server_shutdown.cancelled_owned())
            .await;
        if let Err(err) = result {
            error!("gateway server error: {err}");
        }
    });

    wait_for_shutdown_signal().await;
    shutdown.cancel();
    let _ = server.await;

    info!("draining sessions");
    for handle in registry.list() {
        handle.close().await;
    }

    info!("huntd shut down cleanly");
    Ok(())
}

fn load_modules(config: &Config) -> anyhow::Result<Vec<Arc<HuntModule>>> {
    let Some(dir) = &config.modules_dir else {
        return Ok(Vec::new());
    };

    let mut modules = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let is_module_file = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml") | Some("yml"));
        if !is_module_file {
            continue;
        }

        let source = std::fs::read_to_string(&path)?;
        match parse_module(&source) {
            Ok(module) => modules.push(Arc::new(module)),
            Err(err) => warn!(path = %path.display(), "skipping invalid hunt module: {err}"),
        }
    }
    Ok(modules)
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = match signal(SignalKind::terminate()) {
            Ok(s) => s,
            Err(err) => {
                warn!("failed to install SIGTERM handler: {err}, falling back to ctrl-c only");
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = sigterm.recv() => info!("received SIGTERM"),
            _ = tokio::signal::ctrl_c() => info!("received ctrl-c"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received ctrl-c");
    }
}
