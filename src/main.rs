//! RAILSCOPE: Rail scoring and corridor fee watch
//!
//! Entry point. Loads configuration, initialises structured logging, builds
//! the corridor store, starts the expiry scheduler and the HTTP API, and
//! logs corridor changes until Ctrl+C.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use railscope::api::{self, ApiState};
use railscope::clock::SystemClock;
use railscope::config;
use railscope::engine::QuoteEngine;
use railscope::rails::{RailCandidateSource, StaticRailSource};
use railscope::store::{scheduler, CorridorStore};
use railscope::types::CorridorEvent;

const BANNER: &str = r#"
 ____      _    ___ _     ____   ____ ___  ____  _____
|  _ \    / \  |_ _| |   / ___| / ___/ _ \|  _ \| ____|
| |_) |  / _ \  | || |   \___ \| |  | | | | |_) |  _|
|  _ <  / ___ \ | || |___ ___) | |__| |_| |  __/| |___
|_| \_\/_/   \_\___|_____|____/ \____\___/|_|   |_____|

  Rail scoring + corridor fee watch
  v0.1.0
"#;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    // Load configuration from TOML
    let config_path =
        std::env::var("RAILSCOPE_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let cfg = config::AppConfig::load(&config_path)?;

    // Initialise structured logging
    init_logging();

    println!("{BANNER}");
    info!(
        service = %cfg.service.name,
        corridors = cfg.corridors.len(),
        tick_interval_secs = cfg.service.tick_interval_secs,
        global_cap_bps = cfg.caps.global_max_adj_bps,
        "RAILSCOPE starting up"
    );

    // -- Initialise components -------------------------------------------

    let store = Arc::new(
        CorridorStore::from_config(&cfg, Arc::new(SystemClock::new()))
            .context("Failed to build corridor store")?,
    );
    for state in store.get_states().iter() {
        info!(corridor = %state.pair, "{state}");
    }

    let sources: Vec<Arc<dyn RailCandidateSource>> =
        vec![Arc::new(StaticRailSource::from_config(&cfg))];
    let mut quotes = QuoteEngine::new(sources, cfg.quotes.default_limit);
    if cfg.quotes.platform_fee_from_corridor {
        quotes = quotes.with_corridor_fees(Arc::clone(&store));
    }

    let mut events = store.subscribe();
    let ticker = scheduler::spawn(
        Arc::clone(&store),
        Duration::from_secs(cfg.service.tick_interval_secs),
    );

    let api_task = if cfg.api.enabled {
        let state = Arc::new(ApiState::new(Arc::clone(&store), quotes));
        Some(api::spawn_api(state, cfg.api.port))
    } else {
        info!("API disabled in config");
        None
    };

    // -- Main loop -------------------------------------------------------

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    info!("Watching corridors. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => log_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event log lagging, events skipped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            _ = &mut shutdown => {
                info!("Shutdown signal received.");
                break;
            }
        }
    }

    ticker.shutdown().await;
    if let Some(task) = api_task {
        task.abort();
    }

    let states = store.get_states();
    info!(
        corridors = states.len(),
        elevated = states.iter().filter(|s| s.suggested_adj_bps > 0).count(),
        "RAILSCOPE shut down cleanly."
    );

    Ok(())
}

fn log_event(event: &CorridorEvent) {
    match event {
        CorridorEvent::StatesUpdated { states, .. } => {
            for state in states.iter() {
                info!(
                    corridor = %state.pair,
                    total_fee_bps = state.total_fee_bps,
                    adj_bps = state.suggested_adj_bps,
                    risk = format!("{:.2}", state.risk_score),
                    sensitive = state.in_sensitive_window,
                    signals = state.active_signals.len(),
                    "Corridor state"
                );
            }
        }
        CorridorEvent::SignalsCleared { removed, .. } => info!(removed, "Signals cleared"),
        CorridorEvent::SignalIngested { .. }
        | CorridorEvent::Started { .. }
        | CorridorEvent::Stopped { .. } => {}
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("railscope=info"));

    let json_logging = std::env::var("RAILSCOPE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
