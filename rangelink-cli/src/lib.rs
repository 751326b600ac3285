//! rangelink CLI Library
//!
//! The sender, relay and receiver roles, plus the configuration, shutdown
//! and reporting shared by the three command-line tools.

pub mod config;
mod intake;
pub mod receiver;
pub mod relay;
pub mod report;
pub mod sender;
pub mod shutdown;

pub use config::{Config, ConfigError, Endpoints, IntegrityMode, SessionConfig};
pub use intake::DropReason;
pub use receiver::{ReceiveResult, Receiver};
pub use relay::{ForwardResult, RelayForwarder, RelayStats};
pub use sender::{ConstantDistance, DistanceSource, SampleSender, SendOutcome, SenderStats};
pub use shutdown::{install_signal_handler, ShutdownToken};

/// Initialize console logging for a role binary
pub fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();
}
