//! Output formatting for CLI responses

use anyhow::Error;
use colored::*;
use serde::Serialize;
use serde_json::json;
use std::fmt::Display;
use watchdogdev::{SupportInfo, WatchdogError, WatchdogOptions};

fn emit(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("Failed to format output as JSON: {}", e),
    }
}

fn success_with(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut output = serde_json::Map::new();
    output.insert("success".to_string(), json!(true));
    output.insert(key.to_string(), value);
    serde_json::Value::Object(output)
}

fn flags_json(flags: WatchdogOptions) -> serde_json::Value {
    json!({
        "bits": flags.bits(),
        "flags": flags.names().collect::<Vec<_>>(),
        "unknown_bits": flags.unknown_bits(),
    })
}

fn flags_human(flags: WatchdogOptions) -> String {
    let mut parts: Vec<String> = flags.names().map(str::to_string).collect();
    let unknown = flags.unknown_bits();
    if unknown != 0 {
        parts.push(format!("{unknown:#x}"));
    }
    if parts.is_empty() {
        "none".dimmed().to_string()
    } else {
        parts.join(" | ")
    }
}

/// Print error in JSON format
pub fn print_error_json(error: &Error) {
    emit(&json!({
        "success": false,
        "error": {
            "message": error.to_string(),
            "type": error_type_name(error),
            "errno": error.downcast_ref::<WatchdogError>().and_then(WatchdogError::raw_os_error),
        }
    }));
}

/// Print error in human-readable format
pub fn print_error_human(error: &Error) {
    eprintln!("{} {}", "Error:".red().bold(), error);

    let mut source = error.source();
    while let Some(err) = source {
        eprintln!("  {} {}", "Caused by:".yellow(), err);
        source = err.source();
    }
}

fn error_type_name(error: &Error) -> &'static str {
    match error.downcast_ref::<WatchdogError>() {
        Some(WatchdogError::NotFound { .. }) => "NotFound",
        Some(WatchdogError::PermissionDenied { .. }) => "PermissionDenied",
        Some(WatchdogError::DeviceBusy { .. }) => "DeviceBusy",
        Some(WatchdogError::AlreadyOpen { .. }) => "AlreadyOpen",
        Some(WatchdogError::InvalidConfiguration(_)) => "InvalidConfiguration",
        Some(WatchdogError::NotSupported { .. }) => "NotSupported",
        Some(WatchdogError::Io { .. }) => "Io",
        None => "Other",
    }
}

/// Print the `WDIOC_GETSUPPORT` result
pub fn print_support(support: &SupportInfo, json: bool) {
    if json {
        emit(&json!({
            "success": true,
            "identity": support.identity,
            "firmware_version": support.firmware_version,
            "options": flags_json(support.options),
        }));
    } else {
        println!("{}", "Watchdog:".bold());
        println!("  Identity: {}", support.identity.cyan());
        println!("  Firmware: {}", support.firmware_version);
        println!("  Options:  {}", flags_human(support.options));
    }
}

/// Print a status or boot-status word
pub fn print_flags(key: &str, flags: WatchdogOptions, json: bool) {
    if json {
        emit(&success_with(key, flags_json(flags)));
    } else {
        println!("{}: {}", key.replace('_', " ").bold(), flags_human(flags));
    }
}

/// Print a single numeric reading
pub fn print_value<T>(key: &str, value: T, unit: &str, json: bool)
where
    T: Display + Serialize,
{
    if json {
        emit(&success_with(key, json!(value)));
    } else {
        println!("{}", value_line(key, value, unit));
    }
}

fn value_line(key: &str, value: impl Display, unit: &str) -> String {
    format!("{}: {}{}", key.replace('_', " ").bold(), value, unit)
}

/// Print confirmation of a completed action
pub fn print_done(action: &str, word: Option<u32>, json: bool) {
    if json {
        emit(&json!({
            "success": true,
            "action": action,
            "options": word,
        }));
    } else {
        match word {
            Some(w) => println!("{} {} {:#06x}", "✓".green(), action, w),
            None => println!("{} {}", "✓".green(), action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_json_lists_names_and_unknown_bits() {
        let flags = WatchdogOptions::from_raw(0x0180 | 0x1000);
        let value = flags_json(flags);
        assert_eq!(
            value,
            json!({
                "bits": 0x1180,
                "flags": ["SETTIMEOUT", "MAGICCLOSE"],
                "unknown_bits": 0x1000,
            })
        );
    }

    #[test]
    fn flags_human_names_unknown_bits() {
        colored::control::set_override(false);
        assert_eq!(flags_human(WatchdogOptions::from_raw(0x8001)), "OVERHEAT | KEEPALIVEPING");
        assert_eq!(flags_human(WatchdogOptions::from_raw(0x1000)), "0x1000");
        assert_eq!(flags_human(WatchdogOptions::empty()), "none");
    }

    #[test]
    fn value_line_appends_unit() {
        colored::control::set_override(false);
        assert_eq!(value_line("time_left", 12, "s"), "time left: 12s");
        assert_eq!(
            value_line("temperature", 104, crate::commands::TEMPERATURE_UNIT),
            "temperature: 104 (raw)"
        );
    }

    #[test]
    fn success_with_keeps_the_key() {
        assert_eq!(
            success_with("timeout", json!(30)),
            json!({ "success": true, "timeout": 30 })
        );
    }

    #[test]
    fn error_type_names_watchdog_variants() {
        let err: Error = WatchdogError::closed("WDIOC_KEEPALIVE").into();
        assert_eq!(error_type_name(&err), "Io");
        assert_eq!(error_type_name(&anyhow::anyhow!("boom")), "Other");
    }
}
