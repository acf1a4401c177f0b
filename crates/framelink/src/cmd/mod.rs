use std::path::PathBuf;
use std::sync::mpsc;

use clap::builder::RangedU64ValueParser;
use clap::{ArgGroup, Args, Subcommand};
use framelink_peer::{ConnectionConfig, FrameConfig, HeaderReadMode, DEFAULT_MAX_FRAME_SIZE};

use crate::exit::{CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod echo;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start an echo server.
    Echo(EchoArgs),
    /// Send a single frame.
    Send(SendArgs),
    /// Listen and print received frames.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Echo(args) => echo::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Framing options shared by every command that opens a connection.
#[derive(Args, Debug, Clone)]
pub struct FrameArgs {
    /// Largest accepted payload in bytes, for both sending and receiving.
    #[arg(
        long,
        value_name = "BYTES",
        env = "FRAMELINK_MAX_FRAME_SIZE",
        default_value_t = DEFAULT_MAX_FRAME_SIZE,
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_frame_size: usize,
    /// Keep reading until the whole 4-byte header arrives instead of
    /// failing on a short header read.
    #[arg(long, env = "FRAMELINK_EXACT_HEADER")]
    pub exact_header: bool,
    /// Disable Nagle's algorithm on connections.
    #[arg(long)]
    pub nodelay: bool,
}

impl FrameArgs {
    pub fn connection_config(&self) -> ConnectionConfig {
        let header_read = if self.exact_header {
            HeaderReadMode::Exact
        } else {
            HeaderReadMode::SingleAttempt
        };
        ConnectionConfig {
            frame: FrameConfig {
                max_frame_size: self.max_frame_size,
                header_read,
            },
            nodelay: self.nodelay,
            ..ConnectionConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Address to bind (host:port).
    pub addr: String,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Maximum number of connections served at once.
    #[arg(
        long,
        value_name = "N",
        env = "FRAMELINK_MAX_IN_FLIGHT",
        value_parser = RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_in_flight: Option<usize>,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("payload")
        .required(true)
        .args(["json", "data", "file"])
))]
pub struct SendArgs {
    /// Address to connect to (host:port).
    pub addr: String,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// JSON payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to bind (host:port).
    pub addr: String,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Exit after receiving N frames.
    #[arg(long, value_parser = RangedU64ValueParser::<usize>::new().range(1..))]
    pub count: Option<usize>,
    /// Also store each payload as a file in DIR (created if missing).
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Route Ctrl-C into a channel as `signal`.
fn install_ctrlc_handler<T: Clone + Send + 'static>(
    tx: mpsc::Sender<T>,
    signal: T,
) -> CliResult<()> {
    ctrlc::set_handler(move || {
        let _ = tx.send(signal.clone());
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_args_build_connection_config() {
        let args = FrameArgs {
            max_frame_size: 512,
            exact_header: true,
            nodelay: true,
        };
        let config = args.connection_config();
        assert_eq!(config.frame.max_frame_size, 512);
        assert_eq!(config.frame.header_read, HeaderReadMode::Exact);
        assert!(config.nodelay);
        assert!(config.read_timeout.is_none());
    }

    #[test]
    fn default_frame_args_keep_single_attempt_header() {
        let args = FrameArgs {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            exact_header: false,
            nodelay: false,
        };
        assert_eq!(
            args.connection_config().frame.header_read,
            HeaderReadMode::SingleAttempt
        );
    }
}
