//! wdctl - Linux watchdog control CLI
//!
//! One-shot access to every command of a `/dev/watchdog*` device. Opening the
//! device arms its timer, so unless `--leave-armed` is given every invocation
//! ends with a magic close that stops it again.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use watchdogdev::{DEFAULT_DEVICE_PATH, WatchdogDevice, WatchdogError};

#[derive(Parser)]
#[command(name = "wdctl")]
#[command(about = "Query and configure Linux watchdog devices")]
#[command(version)]
#[command(long_about = "
wdctl opens a watchdog device node, runs one command against it and closes it.

Opening a watchdog arms its timer. By default wdctl finishes with a magic
close, asking the driver to stop the timer again. Pass --leave-armed to keep
it running; the system will then reset unless something else pings it.
")]
struct Cli {
    /// Watchdog device node
    #[arg(
        short,
        long,
        global = true,
        env = "WDCTL_DEVICE",
        default_value = DEFAULT_DEVICE_PATH
    )]
    device: PathBuf,

    /// Output format (human-readable or JSON)
    #[arg(
        long,
        global = true,
        help = "Output in JSON format for machine parsing"
    )]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Close without the magic character, leaving the timer running
    #[arg(long, global = true)]
    leave_armed: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Commands {
    /// Show driver identity and capabilities
    Info,

    /// Show conditions currently asserted
    Status,

    /// Show what caused the last reboot
    BootStatus,

    /// Read the temperature sensor
    Temp,

    /// Show or set the timeout in seconds
    Timeout {
        /// New timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        set: Option<u32>,
    },

    /// Show or set the pretimeout in seconds (0 disables)
    Pretimeout {
        /// New pretimeout in seconds
        #[arg(long)]
        set: Option<u32>,
    },

    /// Show seconds left before the watchdog fires
    TimeLeft,

    /// Write the options word (WDIOC_SETOPTIONS)
    SetOptions(SetOptionsArgs),

    /// Send one keep-alive ping
    Ping,

    /// Stop the timer with a magic close
    Disarm,

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completion for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Args, Debug, PartialEq, Eq)]
#[command(group(
    clap::ArgGroup::new("word")
        .required(true)
        .multiple(true)
        .args(["bits", "disable", "enable", "temp_panic"])
))]
struct SetOptionsArgs {
    /// Raw options word, decimal or 0x-prefixed hex
    #[arg(value_parser = parse_bits)]
    bits: Option<u32>,

    /// Turn the watchdog off (WDIOS_DISABLECARD)
    #[arg(long)]
    disable: bool,

    /// Turn the watchdog on (WDIOS_ENABLECARD)
    #[arg(long)]
    enable: bool,

    /// Kernel panic on temperature trip (WDIOS_TEMPPANIC)
    #[arg(long)]
    temp_panic: bool,
}

fn parse_bits(value: &str) -> Result<u32, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid options word '{value}': {e}"))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("wdctl={log_level},watchdogdev={log_level}").into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.json {
                output::print_error_json(&e);
            } else {
                output::print_error_human(&e);
            }
            ExitCode::from(exit_code(&e))
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    if let Commands::Completion { shell } = &cli.command {
        commands::generate_completion::<Cli>(*shell);
        return Ok(());
    }

    let mut watchdog = WatchdogDevice::open(&cli.device)
        .with_context(|| format!("Failed to open {}", cli.device.display()))?;

    let result = commands::execute(&mut watchdog, &cli.command, cli.json);
    let finished = finish(&mut watchdog, cli.leave_armed);
    result.and(finished)
}

/// Disarm (or deliberately not) before exiting, whatever the command did.
fn finish(watchdog: &mut WatchdogDevice, leave_armed: bool) -> Result<()> {
    if watchdog.is_closed() {
        return Ok(());
    }
    if leave_armed {
        tracing::warn!(
            device = %watchdog.path().display(),
            "leaving watchdog armed; it must be pinged to avoid a reset"
        );
        watchdog.close();
        return Ok(());
    }
    watchdog
        .magic_close()
        .context("Failed to disarm the watchdog on exit")
}

/// Exit codes: 1 generic, 2 usage (clap), 3 not found, 4 permission denied,
/// 5 busy, 6 not supported.
fn exit_code(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<WatchdogError>() {
        Some(WatchdogError::NotFound { .. }) => 3,
        Some(WatchdogError::PermissionDenied { .. }) => 4,
        Some(WatchdogError::DeviceBusy { .. } | WatchdogError::AlreadyOpen { .. }) => 5,
        Some(WatchdogError::NotSupported { .. }) => 6,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn parse_defaults() -> TestResult {
        let cli = Cli::try_parse_from(["wdctl", "info"])?;
        assert_eq!(cli.device, PathBuf::from("/dev/watchdog"));
        assert!(!cli.json);
        assert!(!cli.leave_armed);
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.command, Commands::Info);
        Ok(())
    }

    #[test]
    fn parse_global_flags_after_subcommand() -> TestResult {
        let cli = Cli::try_parse_from([
            "wdctl",
            "ping",
            "--device",
            "/dev/watchdog1",
            "--json",
            "-vv",
            "--leave-armed",
        ])?;
        assert_eq!(cli.device, PathBuf::from("/dev/watchdog1"));
        assert!(cli.json);
        assert!(cli.leave_armed);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.command, Commands::Ping);
        Ok(())
    }

    #[test]
    fn parse_timeout_set() -> TestResult {
        let cli = Cli::try_parse_from(["wdctl", "timeout", "--set", "30"])?;
        assert_eq!(cli.command, Commands::Timeout { set: Some(30) });
        Ok(())
    }

    #[test]
    fn parse_timeout_zero_is_rejected() {
        let result = Cli::try_parse_from(["wdctl", "timeout", "--set", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_set_options_hex_and_flags() -> TestResult {
        let cli = Cli::try_parse_from(["wdctl", "set-options", "0x4", "--disable"])?;
        let Commands::SetOptions(args) = cli.command else {
            return Err("expected set-options".into());
        };
        assert_eq!(args.bits, Some(4));
        assert!(args.disable);
        assert!(!args.enable);
        Ok(())
    }

    #[test]
    fn parse_set_options_requires_a_word() {
        let result = Cli::try_parse_from(["wdctl", "set-options"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_bits_accepts_decimal_and_hex() {
        assert_eq!(parse_bits("17"), Ok(17));
        assert_eq!(parse_bits("0x11"), Ok(17));
        assert_eq!(parse_bits("0XFF"), Ok(255));
        assert!(parse_bits("0xZZ").is_err());
        assert!(parse_bits("-1").is_err());
    }

    #[test]
    fn exit_codes_follow_error_taxonomy() {
        let not_found: anyhow::Error = WatchdogError::from_open(
            std::path::Path::new("/dev/watchdog"),
            io::Error::from_raw_os_error(2),
        )
        .into();
        assert_eq!(exit_code(&not_found), 3);

        let unsupported: anyhow::Error = WatchdogError::from_operation(
            "WDIOC_GETTEMP",
            io::Error::from_raw_os_error(25),
        )
        .into();
        assert_eq!(exit_code(&unsupported.context("Failed to read temperature")), 6);

        assert_eq!(exit_code(&anyhow::anyhow!("other")), 1);
    }
}
