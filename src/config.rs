//! Engine configuration.
//!
//! Loaded from JSON. Every field has a default, so a file only needs to name
//! what it overrides.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::control::Color;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub limits: SandboxLimits,
    pub defaults: ControlDefaults,
}

/// Resource limits applied to every node script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self {
            max_operations: 100_000,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_string_size: 10_000,
            max_array_size: 10_000,
            max_map_size: 500,
        }
    }
}

/// Attributes given to a freshly created control before a call overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlDefaults {
    pub point_radius: f32,
    pub point_color: Color,
    pub point_relative: bool,
    pub wireframe_thickness: f32,
    pub wireframe_color: Color,
    pub wireframe_closed: bool,
}

impl Default for ControlDefaults {
    fn default() -> Self {
        Self {
            point_radius: 0.1,
            point_color: Color::WHITE,
            point_relative: true,
            wireframe_thickness: 1.0,
            wireframe_color: Color::WHITE,
            wireframe_closed: false,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse engine config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_json_str(&contents)
    }
}
