// Commandline argument parsers using clap for the kiosk and monitor binaries

use crate::config::DEFAULT_CONFIG_PATH;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct KioskArgs {
    #[command(subcommand)]
    /// Which kiosk to run
    pub command: FlowCommand,

    /// RON configuration file, defaults are used if it is missing
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// File or FIFO that the message bus client writes incoming messages to
    #[arg(short, long, global = true)]
    pub feed: Option<PathBuf>,

    /// File or FIFO to append outgoing messages to
    #[arg(short, long, global = true)]
    pub publish: Option<PathBuf>,

    /// Write the log here instead of stderr, so it does not garble the screen
    #[arg(short, long, global = true)]
    pub log: Option<PathBuf>,
}

#[derive(Debug, Subcommand, Clone, PartialEq)]
pub enum FlowCommand {
    /// Weighing display for the BLE scale
    #[command(about)]
    Scale(ScaleCommand),

    /// Recipe tablet that sends ingredient targets to the scale
    Recipe,

    /// Robot assistant walkthrough
    Robot,
}

#[derive(Debug, Args, Clone, PartialEq)]
pub struct ScaleCommand {
    /// Serial port of the BLE-UART bridge, otherwise one is picked
    #[arg(long)]
    pub port: Option<PathBuf>,

    /// Use a simulated scale instead of real hardware
    #[arg(long, conflicts_with = "port")]
    pub dummy: bool,
}

/// Connects to a scale and logs everything it says.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MonitorArgs {
    /// Serial port of the BLE-UART bridge, otherwise one is picked
    #[arg(long)]
    pub port: Option<PathBuf>,

    /// Use a simulated scale instead of real hardware
    #[arg(long, conflicts_with = "port")]
    pub dummy: bool,

    /// Line to send to the scale once connected
    #[arg(long)]
    pub send: Option<String>,

    /// RON configuration file, defaults are used if it is missing
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,
}
