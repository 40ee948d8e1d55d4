//! Strip discovery command.

use std::time::Duration;

use futures_util::StreamExt;

use glimmer_ble::Scanner;
use glimmer_config::Config;
use glimmer_core::{Advertisement, Matcher, MatcherConfig, ScanReport, run_scan};

use crate::cli::{GlobalOpts, OutputFormat, ScanArgs};
use crate::error::CliError;

pub async fn handle(args: ScanArgs, config: &Config, global: &GlobalOpts) -> Result<(), CliError> {
    let matcher_config = resolve_matcher_config(&args, config);

    if !global.quiet {
        eprintln!(
            "observing advertisements for up to {}s...",
            matcher_config.window.as_secs()
        );
    }

    let scanner = Scanner::new().await?;
    let advertisements = scanner
        .advertisements()
        .await?
        .map(|peripheral| Advertisement::from(&peripheral));

    let report = run_scan(Matcher::new(matcher_config), advertisements).await;
    render(&report, global)
}

/// Configured matching policy with CLI flag overrides applied.
fn resolve_matcher_config(args: &ScanArgs, config: &Config) -> MatcherConfig {
    let mut matcher_config = config.matcher_config();
    if let Some(window) = args.window {
        matcher_config.window = Duration::from_secs(window);
    }
    if args.relaxed {
        matcher_config.relaxed_duplicates = true;
    }
    matcher_config
}

fn render(report: &ScanReport, global: &GlobalOpts) -> Result<(), CliError> {
    if global.output == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match report {
        ScanReport::Definite { identifier } => {
            println!("found strip: {identifier}");
        }
        ScanReport::Candidates(candidates) if candidates.is_empty() => {
            if !global.quiet {
                eprintln!("no plausible strips seen");
            }
        }
        ScanReport::Candidates(candidates) => {
            if !global.quiet {
                eprintln!("no definite match; candidates by signal strength:");
            }
            for candidate in candidates {
                println!(
                    "{}\t{}\t{} dBm",
                    candidate.identifier,
                    candidate.display_name.as_deref().unwrap_or("(unnamed)"),
                    candidate.signal_strength
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_configured_scan_policy() {
        let config = Config::default();
        let args = ScanArgs {
            window: Some(3),
            relaxed: true,
        };

        let resolved = resolve_matcher_config(&args, &config);
        assert_eq!(resolved.window, Duration::from_secs(3));
        assert!(resolved.relaxed_duplicates);
    }

    #[test]
    fn absent_flags_keep_configured_scan_policy() {
        let config = Config::default();
        let args = ScanArgs {
            window: None,
            relaxed: false,
        };

        let resolved = resolve_matcher_config(&args, &config);
        assert_eq!(resolved.window, Duration::from_secs(10));
        assert!(!resolved.relaxed_duplicates);
    }
}
