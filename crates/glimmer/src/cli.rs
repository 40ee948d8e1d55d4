//! Clap derive structures for the `glimmer` CLI.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// glimmer -- drive an ELK-BLEDOM LED strip from the command line
#[derive(Debug, Parser)]
#[command(
    name = "glimmer",
    version,
    about = "Find, control, and stream colors to a BLE LED strip",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Strip identifier (overrides the configured device)
    #[arg(long, short = 'd', env = "GLIMMER_DEVICE", global = true)]
    pub device: Option<String>,

    /// Output format
    #[arg(long, short = 'o', default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    Text,
    /// Pretty-printed JSON
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Look for the strip among nearby BLE advertisements
    Scan(ScanArgs),

    /// Run the HTTP/WebSocket color server
    Serve(ServeArgs),

    /// Set a solid color once
    Color(ColorArgs),

    /// Switch the strip on or off
    Power(PowerArgs),

    /// Set brightness as a percentage
    Brightness(BrightnessArgs),
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Observation window in seconds
    #[arg(long, short = 'w')]
    pub window: Option<u64>,

    /// Refresh candidate signal strength on repeat advertisements
    #[arg(long)]
    pub relaxed: bool,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address (host:port)
    #[arg(long, short = 'l')]
    pub listen: Option<String>,
}

#[derive(Debug, Args)]
pub struct ColorArgs {
    /// Color as a hex triplet, e.g. "#ff8800" or "ff8800"
    pub color: String,
}

#[derive(Debug, Args)]
pub struct PowerArgs {
    /// Desired power state
    pub state: PowerState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PowerState {
    On,
    Off,
}

#[derive(Debug, Args)]
pub struct BrightnessArgs {
    /// Brightness percentage, 0-100
    pub level: u8,
}
