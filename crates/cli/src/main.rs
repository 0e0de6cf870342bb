// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pulse: interactive client for a realtime WebSocket endpoint.
//!
//! Lines read from stdin are sent as envelopes; every event the connection
//! publishes is printed to stdout. Logs go to stderr. `/offline` and
//! `/online` drive the network status the connection follows.

mod input;
mod output;

use std::path::PathBuf;

use clap::Parser;
use pulse::event::{CONNECTED, DISCONNECTED, ERROR, MESSAGE, RECONNECT_EXHAUSTED};
use pulse::{NetworkMonitor, NetworkStatus, Realtime, RealtimeConfig};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use input::Input;

/// pulse: realtime connection client
#[derive(Parser, Debug)]
#[command(name = "pulse")]
#[command(about = "Interactive client for a realtime WebSocket endpoint")]
struct Args {
    /// WebSocket endpoint (overrides the config file)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Auth token appended to the connection target
    #[arg(short, long, env = "PULSE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Heartbeat interval in milliseconds (0 disables heartbeats)
    #[arg(long)]
    heartbeat_interval_ms: Option<u64>,

    /// Reconnect attempts before giving up (0 retries forever)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn realtime_config(&self) -> Result<RealtimeConfig, Box<dyn std::error::Error>> {
        let mut config = match (&self.config, &self.endpoint) {
            (Some(path), _) => RealtimeConfig::load(path)?,
            (None, Some(endpoint)) => RealtimeConfig::new(endpoint.clone()),
            (None, None) => return Err("either --endpoint or --config is required".into()),
        };
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(interval) = self.heartbeat_interval_ms {
            config.heartbeat_interval_ms = interval;
        }
        if let Some(max_attempts) = self.max_attempts {
            config.reconnect_max_attempts = max_attempts;
        }
        config.validate()?;
        Ok(config)
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Apply one input line. Returns false when the user asked to quit.
fn handle_input(realtime: &Realtime, network: &NetworkMonitor, line: &str) -> bool {
    match input::parse_line(line) {
        Ok(Input::Send { kind, payload }) => {
            if !realtime.send(kind, payload) {
                println!("  queued until connected");
            }
        }
        Ok(Input::Connect) => realtime.connect(),
        Ok(Input::Close) => realtime.close(),
        Ok(Input::Reconnect) => realtime.reconnect(),
        Ok(Input::ClearQueue) => realtime.clear_queue(),
        Ok(Input::Network(status)) => {
            if !network.set(status) {
                println!("  network already {}", status);
            }
        }
        Ok(Input::Info) => match serde_json::to_string_pretty(&realtime.connection_info()) {
            Ok(info) => println!("{}", info),
            Err(e) => eprintln!("error: {}", e),
        },
        Ok(Input::Help) => println!("{}", input::HELP),
        Ok(Input::Quit) => return false,
        Ok(Input::Blank) => {}
        Err(e) => eprintln!("error: {}", e),
    }
    true
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = args.realtime_config()?;
    info!(endpoint = %config.endpoint, "starting pulse");

    let network = NetworkMonitor::new(NetworkStatus::Online);
    let mut builder = Realtime::builder(config).network(network.subscribe());
    if let Some(token) = args.token.clone() {
        builder = builder.token(token);
    }
    let realtime = builder.spawn()?;

    for name in [CONNECTED, DISCONNECTED, ERROR, RECONNECT_EXHAUSTED, MESSAGE] {
        realtime.on(name, |event| println!("{}", output::format_event(event)));
    }
    realtime.connect();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_input(&realtime, &network, &line) {
                        break;
                    }
                }
                None => {
                    debug!("stdin closed");
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    realtime.close();
    realtime.shutdown().await;
    Ok(())
}
