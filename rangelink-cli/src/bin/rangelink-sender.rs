//! rangelink Sender - distance sample source
//!
//! Opens with a calibration burst of Sync samples, then sends one Data
//! sample per interval to the relay until interrupted.

use anyhow::Context;
use clap::Parser;
use rangelink_cli::config::DEFAULT_CONFIG_PATH;
use rangelink_cli::{install_signal_handler, Config, ConstantDistance, SampleSender, ShutdownToken};
use rangelink_io::{TelemetrySocket, UdpLink};
use rangelink_protocol::{SampleGenerator, SystemClock};

#[derive(Parser, Debug)]
#[command(name = "rangelink-sender")]
#[command(about = "Send timestamped distance samples to a relay", long_about = None)]
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

    let relay = config.endpoints.relay_listen();
    let socket = TelemetrySocket::bind(config.endpoints.sender_bind())?
        .with_write_timeout(config.recv_timeout())?;
    let link = UdpLink::outbound(socket, relay);
    tracing::info!("rangelink Sender starting...");
    tracing::info!("Sending from {} to relay at {}", link.local_addr()?, relay);

    let generator = SampleGenerator::new(config.session.sync_burst, config.integrity())
        .with_resync_every(config.session.recalibrate_every);
    let mut sender = SampleSender::new(
        link,
        SystemClock,
        ConstantDistance(config.session.distance),
        generator,
        config.send_interval(),
    );

    sender.run(&token);
    Ok(())
}
