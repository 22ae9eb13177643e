//! Stable identity for control-creating calls.
//!
//! A script re-issues its `point`/`wireframe` calls on every evaluation pass.
//! The call site (the source line the call sits on) is what lets a pass find
//! the control the previous pass created at the same place.
//!
//! Two control calls on one line share a call site. Inside a loop every
//! iteration maps to the same control and the last call wins.

use std::fmt;

use rhai::Position;
use serde::Serialize;

use crate::error::{HookError, HookResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CallSite(u32);

impl CallSite {
    pub fn from_line(line: u32) -> Self {
        CallSite(line)
    }

    /// Identity of the call currently executing at `pos`.
    pub fn current(pos: Position) -> HookResult<Self> {
        pos.line()
            .map(|line| CallSite(line as u32))
            .ok_or_else(|| HookError::internal("control call has no source position"))
    }

    pub fn line(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}", self.0)
    }
}
