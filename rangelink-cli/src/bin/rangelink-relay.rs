//! rangelink Relay - observing forwarder
//!
//! Receives samples from the sender, checks integrity, sequence and delay
//! on that hop, and forwards every valid sample to the receiver unchanged.

use anyhow::Context;
use clap::Parser;
use rangelink_cli::config::DEFAULT_CONFIG_PATH;
use rangelink_cli::{install_signal_handler, Config, RelayForwarder, ShutdownToken};
use rangelink_io::{TelemetrySocket, UdpLink};
use rangelink_protocol::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "rangelink-relay")]
#[command(about = "Forward distance samples from the sender to the receiver", long_about = None)]
struct Args {
    /// Configuration file: legacy five-tuple, or TOML when it ends in .toml
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    rangelink_cli::init_logging(args.verbose);

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config '{}'", args.config))?;

    let token = ShutdownToken::new();
    install_signal_handler(&token).context("Failed to install signal handler")?;

    let inbound_socket = TelemetrySocket::bind(config.endpoints.relay_listen())
        .context("Failed to bind relay listen socket")?
        .with_read_timeout(config.recv_timeout())?;
    let inbound = UdpLink::inbound(inbound_socket);

    let receiver = config.endpoints.receiver_listen();
    let outbound_socket = TelemetrySocket::bind(config.endpoints.relay_forward_bind())?
        .with_write_timeout(config.recv_timeout())?;
    let outbound = UdpLink::outbound(outbound_socket, receiver);

    tracing::info!("rangelink Relay starting...");
    tracing::info!("Listening on: {}", inbound.local_addr()?);
    tracing::info!("Forwarding to receiver at {}", receiver);

    let mut relay = RelayForwarder::new(inbound, outbound, SystemClock, config.monitor_config());
    relay.run(&token);
    Ok(())
}
