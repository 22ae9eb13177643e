pub mod call_site;
pub mod config;
pub mod control;
pub mod drag;
pub mod error;
pub mod extract;
pub mod hooks;
pub mod hooks_rhai;
pub mod node;
pub mod script_diagnostics;
pub mod script_log;
pub mod script_value;
pub mod scripting;
pub mod viewport_scene;

pub mod cli;
