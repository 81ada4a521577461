//! Hubitat rule engine server
//!
//! Loads configuration, registers the configured automations and routes
//! newline-delimited JSON device events read from stdin.

mod automations;

use anyhow::{Context, Result};
use hubitat_config::{load_config, HubConfig};
use hubitat_core::Event;
use hubitat_event_router::{Dispatcher, EventRouter, SharedRouter};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Parse one input line, skipping blanks and malformed events
fn parse_event_line(line: &str) -> Option<Event> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "Skipping malformed event");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => {
            load_config(&path).with_context(|| format!("loading configuration from {path}"))?
        }
        None => HubConfig::default(),
    };

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .context("invalid log level")?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Hubitat rule engine");

    let mut router = EventRouter::with_config(config.router.clone());
    let automations = automations::register_all(&mut router, config.automations)?;
    let router: SharedRouter = Arc::new(RwLock::new(router));

    let dispatcher = Dispatcher::spawn(router, config.router.queue_capacity);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    info!("Reading events from stdin");

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(line) => {
                        if let Some(event) = parse_event_line(&line) {
                            dispatcher.send(event).await?;
                        }
                    }
                    None => break,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received shutdown signal");
                break;
            }
        }
    }

    info!("Shutting down...");
    let stats = dispatcher.shutdown().await;
    info!(
        events = stats.events,
        notified = stats.notified,
        failures = stats.failures,
        "Dispatcher drained"
    );
    for automation in &automations {
        info!(
            automation = %automation.id(),
            description = automation.description().unwrap_or_default(),
            fired = automation.fired(),
            "Automation summary"
        );
    }

    Ok(())
}
