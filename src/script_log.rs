//! Output from node scripts.
//!
//! `print(..)` and `debug(..)` in a node script end up here and are forwarded
//! to the `log` facade under the `script` target. A script stuck printing in a
//! loop is capped per evaluation pass.

use std::sync::atomic::{AtomicU32, Ordering};

/// Maximum number of script messages allowed per evaluation pass.
const MAX_LOGS_PER_PASS: u32 = 100;

/// Messages emitted in the current pass.
static LOG_COUNT: AtomicU32 = AtomicU32::new(0);

/// Whether the limit warning was already emitted this pass.
static WARNED_LIMIT: AtomicU32 = AtomicU32::new(0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Debug,
}

/// Reset the per-pass counter. Call at the start of each evaluation pass.
pub fn reset_pass_log_count() {
    LOG_COUNT.store(0, Ordering::Relaxed);
    WARNED_LIMIT.store(0, Ordering::Relaxed);
}

fn can_log() -> bool {
    let count = LOG_COUNT.fetch_add(1, Ordering::Relaxed);
    if count >= MAX_LOGS_PER_PASS {
        if WARNED_LIMIT.swap(1, Ordering::Relaxed) == 0 {
            log::warn!(
                target: "script",
                "Script log limit exceeded ({} messages/pass). Further output dropped.",
                MAX_LOGS_PER_PASS
            );
        }
        false
    } else {
        true
    }
}

/// Log a message from a script, respecting the per-pass limit.
pub fn script_log(level: LogLevel, node: &str, message: &str) {
    if !can_log() {
        return;
    }
    match level {
        LogLevel::Info => log::info!(target: "script", "[{node}] {message}"),
        LogLevel::Debug => log::debug!(target: "script", "[{node}] {message}"),
    }
}

/// Convert an engine value to a string for display. Never panics.
pub fn stringify_dynamic(value: &rhai::Dynamic) -> String {
    if let Ok(s) = value.clone().into_string() {
        return s;
    }

    if value.is_array() {
        if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
            let parts: Vec<String> = arr.iter().map(stringify_dynamic).collect();
            return parts.join(" ");
        }
    }

    if value.is_map() {
        if let Some(map) = value.clone().try_cast::<rhai::Map>() {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, stringify_dynamic(v)))
                .collect();
            return format!("{{{}}}", parts.join(", "));
        }
    }

    if value.is_unit() {
        return "()".to_string();
    }

    value.to_string()
}
