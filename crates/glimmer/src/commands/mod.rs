//! Command dispatch: bridges CLI args to core operations.

pub mod scan;
pub mod serve;
pub mod set;

use std::time::Duration;

use glimmer_config::Config;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// How long connection-bound commands wait for the strip to advertise.
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(15);

pub async fn dispatch(cmd: Command, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Scan(args) => scan::handle(args, config, global).await,
        Command::Serve(args) => serve::handle(args, config, global).await,
        Command::Color(args) => set::color(args, config, global).await,
        Command::Power(args) => set::power(args, config, global).await,
        Command::Brightness(args) => set::brightness(args, config, global).await,
    }
}

/// Resolve the target strip identifier from flag, env, or config.
pub fn target_device(config: &Config, global: &GlobalOpts) -> Result<String, CliError> {
    global
        .device
        .clone()
        .or_else(|| config.device.clone())
        .ok_or_else(|| CliError::NoDevice {
            path: glimmer_config::config_path().display().to_string(),
        })
}
