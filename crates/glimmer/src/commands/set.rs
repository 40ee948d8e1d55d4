//! One-shot state commands: color, power, brightness.

use std::sync::Arc;

use glimmer_ble::BledomStrip;
use glimmer_config::Config;
use glimmer_core::{Dispatcher, Intent, Outcome, Rgb};

use crate::cli::{BrightnessArgs, ColorArgs, GlobalOpts, PowerArgs, PowerState};
use crate::commands::{DISCOVERY_TIMEOUT, target_device};
use crate::error::CliError;

pub async fn color(args: ColorArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let color = Rgb::parse_hex(&args.color).ok_or_else(|| CliError::Validation {
        field: "color".into(),
        reason: format!("expected a hex triplet like '#ff8800', got '{}'", args.color),
    })?;
    submit_once(config, global, Intent::SetColor(color)).await
}

pub async fn power(args: PowerArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let on = args.state == PowerState::On;
    submit_once(config, global, Intent::SetPower { on }).await
}

pub async fn brightness(
    args: BrightnessArgs,
    config: &Config,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if args.level > 100 {
        return Err(CliError::Validation {
            field: "level".into(),
            reason: format!("expected 0-100, got {}", args.level),
        });
    }
    submit_once(config, global, Intent::SetBrightness { level: args.level }).await
}

async fn submit_once(
    config: &Config,
    global: &GlobalOpts,
    intent: Intent,
) -> Result<(), CliError> {
    let identifier = target_device(config, global)?;

    if !global.quiet {
        eprintln!("connecting to {identifier}...");
    }
    let strip = Arc::new(BledomStrip::connect(&identifier, DISCOVERY_TIMEOUT).await?);

    let dispatcher = Dispatcher::new(Arc::clone(&strip), config.dispatch_config());
    let result = dispatcher.submit(intent).await;
    strip.disconnect().await?;

    match result? {
        Outcome::Delivered => {
            if !global.quiet {
                eprintln!("delivered");
            }
            Ok(())
        }
        // Unreachable for a lone submission, but the outcome is part of
        // the dispatch contract.
        Outcome::Skipped => Err(CliError::Internal("command was skipped".into())),
    }
}
