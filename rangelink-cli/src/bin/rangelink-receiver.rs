//! rangelink Receiver - end of the sample path
//!
//! Receives samples forwarded by the relay and reports integrity failures,
//! sequence gaps and delay anomalies on the relay to receiver hop.

use anyhow::Context;
use clap::Parser;
use rangelink_cli::config::DEFAULT_CONFIG_PATH;
use rangelink_cli::{install_signal_handler, Config, Receiver, ShutdownToken};
use rangelink_io::{TelemetrySocket, UdpLink};
use rangelink_protocol::SystemClock;

#[derive(Parser, Debug)]
#[command(name = "rangelink-receiver")]
#[command(about = "Receive and check distance samples from the relay", long_about = None)]
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

    let socket = TelemetrySocket::bind(config.endpoints.receiver_listen())
        .context("Failed to bind receiver socket")?
        .with_read_timeout(config.recv_timeout())?;
    let link = UdpLink::inbound(socket);

    tracing::info!("rangelink Receiver starting...");
    tracing::info!("Listening on: {}", link.local_addr()?);

    let mut receiver = Receiver::new(link, SystemClock, config.monitor_config(), "relay");
    receiver.run(&token);
    Ok(())
}
