//! Structured script diagnostics.
//!
//! Engine errors (parse and runtime) and hook failures are wrapped into a
//! stable, JSON-serializable format that tooling can surface without access to
//! Rust logs.

use serde::Serialize;

use crate::error::HookError;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptDiagnosticKind {
    /// Syntax/parse errors (compile time).
    ParseError,
    /// Runtime errors in user code.
    RuntimeError,
    /// A `point`/`wireframe` call was used incorrectly.
    HookMisuse,
    /// A host invariant failed while servicing the script.
    HostError,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScriptPhase {
    Compile,
    Evaluate,
    Drag,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ScriptLocation {
    /// 1-based line number in the node script.
    pub line: u32,
    /// 1-based column number.
    pub column: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScriptDiagnostic {
    pub kind: ScriptDiagnosticKind,
    pub phase: ScriptPhase,
    /// Name of the node whose script failed.
    pub node: String,
    pub message: String,
    pub location: Option<ScriptLocation>,
    /// Raw engine error string (useful for bug reports).
    #[serde(default)]
    pub raw: Option<String>,
}

fn location_of(pos: rhai::Position) -> Option<ScriptLocation> {
    let line = pos.line()? as u32;
    if line == 0 {
        return None;
    }
    Some(ScriptLocation {
        line,
        column: (pos.position().unwrap_or(0) as u32).max(1),
    })
}

pub fn from_parse_error(node: &str, err: &rhai::ParseError) -> ScriptDiagnostic {
    let raw = err.to_string();
    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::ParseError,
        phase: ScriptPhase::Compile,
        node: node.to_string(),
        message: raw.clone(),
        location: location_of(err.position()),
        raw: Some(raw),
    }
}

/// Build a diagnostic from an engine error. `hook_error` is the failure the
/// hooks recorded while the script ran, if that is what aborted it; it takes
/// precedence since the engine only sees its message.
pub fn from_eval_error(
    node: &str,
    phase: ScriptPhase,
    err: &rhai::EvalAltResult,
    hook_error: Option<&HookError>,
) -> ScriptDiagnostic {
    let raw = err.to_string();
    let (kind, message) = match hook_error {
        Some(e) if e.is_internal() => (ScriptDiagnosticKind::HostError, e.to_string()),
        Some(e) => (ScriptDiagnosticKind::HookMisuse, e.to_string()),
        None => (ScriptDiagnosticKind::RuntimeError, raw.clone()),
    };

    ScriptDiagnostic {
        kind,
        phase,
        node: node.to_string(),
        message,
        location: location_of(err.position()),
        raw: Some(raw),
    }
}

/// Diagnostic for a failure outside script execution (e.g. a feedback routine
/// writing to a datum that cannot take it).
pub fn host_error(node: &str, phase: ScriptPhase, message: impl Into<String>) -> ScriptDiagnostic {
    ScriptDiagnostic {
        kind: ScriptDiagnosticKind::HostError,
        phase,
        node: node.to_string(),
        message: message.into(),
        location: None,
        raw: None,
    }
}
