//! Command handlers for wdctl

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;
use watchdogdev::{CardOptions, WatchdogDevice};

use crate::output;
use crate::{Commands, SetOptionsArgs};

/// `WDIOC_GETTEMP` units are driver-defined, so readings are shown as is.
pub const TEMPERATURE_UNIT: &str = " (raw)";

/// Run one subcommand against an open watchdog.
pub fn execute(watchdog: &mut WatchdogDevice, command: &Commands, json: bool) -> Result<()> {
    match command {
        Commands::Info => {
            let support = watchdog
                .get_support()
                .context("Failed to read driver support information")?;
            output::print_support(&support, json);
        }
        Commands::Status => {
            let status = watchdog.get_status().context("Failed to read status")?;
            output::print_flags("status", status, json);
        }
        Commands::BootStatus => {
            let status = watchdog
                .get_boot_status()
                .context("Failed to read boot status")?;
            output::print_flags("boot_status", status, json);
        }
        Commands::Temp => {
            let temperature = watchdog
                .get_temperature()
                .context("Failed to read temperature")?;
            output::print_value("temperature", temperature, TEMPERATURE_UNIT, json);
        }
        Commands::Timeout { set } => {
            let timeout = match set {
                Some(secs) => watchdog
                    .set_timeout(*secs)
                    .with_context(|| format!("Failed to set timeout to {secs}s"))?,
                None => watchdog.get_timeout().context("Failed to read timeout")?,
            };
            output::print_value("timeout", timeout, "s", json);
        }
        Commands::Pretimeout { set } => {
            let pretimeout = match set {
                Some(secs) => watchdog
                    .set_pretimeout(*secs)
                    .with_context(|| format!("Failed to set pretimeout to {secs}s"))?,
                None => watchdog
                    .get_pretimeout()
                    .context("Failed to read pretimeout")?,
            };
            output::print_value("pretimeout", pretimeout, "s", json);
        }
        Commands::TimeLeft => {
            let left = watchdog
                .get_time_left()
                .context("Failed to read time left")?;
            output::print_value("time_left", left, "s", json);
        }
        Commands::SetOptions(args) => {
            let word = options_word(args);
            watchdog
                .set_options(word)
                .with_context(|| format!("Failed to set options {word:#06x}"))?;
            output::print_done("set-options", Some(word), json);
        }
        Commands::Ping => {
            watchdog.keep_alive().context("Failed to ping watchdog")?;
            output::print_done("ping", None, json);
        }
        Commands::Disarm => {
            watchdog
                .magic_close()
                .context("Failed to disarm watchdog")?;
            output::print_done("disarm", None, json);
        }
        Commands::Completion { .. } => {}
    }
    Ok(())
}

/// Combine the raw word with the named card flags.
fn options_word(args: &SetOptionsArgs) -> u32 {
    let mut card = CardOptions::empty();
    card.set(CardOptions::DISABLECARD, args.disable);
    card.set(CardOptions::ENABLECARD, args.enable);
    card.set(CardOptions::TEMPPANIC, args.temp_panic);
    args.bits.unwrap_or(0) | card.bits()
}

/// Generate shell completion script
pub fn generate_completion<C: CommandFactory>(shell: Shell) {
    let mut cmd = C::command();
    generate(shell, &mut cmd, "wdctl", &mut io::stdout());
}
