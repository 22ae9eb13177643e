//! Rhai scripting host for node scripts.
//!
//! Every node owns a script. Evaluating a node runs its script top to bottom
//! as one pass: `point(..)` and `wireframe(..)` calls create or refresh
//! controls, and controls the pass did not reach are retired.
//!
//! Available API:
//! - `node.<datum>`, `node["<datum>"]` - Read or write a node datum
//! - `<datum>` - Every datum is also bound as a plain variable
//! - `point(x, y, z, #{ r, color, drag, relative })` - Draggable point
//! - `wireframe(points, #{ t, color, close })` - Polyline through `points`
//!
//! Logging:
//! - `print(value)`, `info(value)` - Info message under the `script` target
//! - `debug(value)` - Debug message with the call position

use std::cell::{Ref, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use anyhow::{anyhow, bail, Result};
use glam::Vec3;
use rhai::{Dynamic, Engine, Scope, AST, FLOAT};

use crate::call_site::CallSite;
use crate::config::EngineConfig;
use crate::drag::Feedback;
use crate::hooks_rhai::{hook_misuse, register_hook_api, HookState, SharedHookState};
use crate::node::{register_node_api, Node, NodeHandle, NodeId};
use crate::script_diagnostics::{
    from_eval_error, from_parse_error, host_error, ScriptDiagnostic, ScriptPhase,
};
use crate::script_log::reset_pass_log_count;
use crate::script_value::ScriptValue;
use crate::viewport_scene::{ControlSnapshot, ViewportScene};

struct NodeScript {
    handle: NodeHandle,
    ast: Option<AST>,
}

/// Scripting engine that owns the nodes, their scripts and the viewport scene.
pub struct ScriptEngine {
    engine: Engine,
    hooks: SharedHookState,
    nodes: BTreeMap<NodeId, NodeScript>,
    next_id: u64,
    /// Last error message (for display/debugging)
    pub last_error: Option<String>,
    /// Structured diagnostics for tooling.
    diagnostics: Vec<ScriptDiagnostic>,
}

impl Default for ScriptEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptEngine {
    /// Create a new script engine with default sandbox settings.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut engine = Engine::new();

        // Sandbox settings
        let limits = &config.limits;
        engine.set_max_expr_depths(limits.max_expr_depth, limits.max_expr_depth);
        engine.set_max_call_levels(limits.max_call_levels);
        engine.set_max_operations(limits.max_operations);
        engine.set_max_string_size(limits.max_string_size);
        engine.set_max_array_size(limits.max_array_size);
        engine.set_max_map_size(limits.max_map_size);

        let hooks: SharedHookState = Rc::new(RefCell::new(HookState::new(config.defaults)));
        register_node_api(&mut engine);
        register_hook_api(&mut engine, &hooks);

        Self {
            engine,
            hooks,
            nodes: BTreeMap::new(),
            next_id: 1,
            last_error: None,
            diagnostics: Vec::new(),
        }
    }

    fn push_diagnostic(&mut self, diag: ScriptDiagnostic) {
        const MAX_DIAGNOSTICS: usize = 32;

        self.last_error = Some(diag.message.clone());
        self.diagnostics.push(diag);
        if self.diagnostics.len() > MAX_DIAGNOSTICS {
            let excess = self.diagnostics.len() - MAX_DIAGNOSTICS;
            self.diagnostics.drain(0..excess);
        }
    }

    fn node_name(&self, id: NodeId) -> String {
        self.nodes
            .get(&id)
            .map(|n| n.handle.borrow().name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    pub fn add_node(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeScript {
                handle: NodeHandle::new(Node::new(name)),
                ast: None,
            },
        );
        log::debug!("Added {} ({})", id, name);
        id
    }

    /// Remove a node together with all of its controls.
    pub fn remove_node(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_none() {
            return false;
        }
        let removed = self.hooks.borrow_mut().scene.remove_node(id);
        log::debug!("Removed {} and {} controls", id, removed);
        true
    }

    pub fn node(&self, id: NodeId) -> Option<NodeHandle> {
        self.nodes.get(&id).map(|n| n.handle.clone())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn set_datum(&mut self, id: NodeId, name: &str, value: impl Into<ScriptValue>) -> bool {
        match self.nodes.get(&id) {
            Some(n) => {
                n.handle.borrow_mut().set_datum(name, value.into());
                true
            }
            None => false,
        }
    }

    pub fn datum(&self, id: NodeId, name: &str) -> Option<ScriptValue> {
        let n = self.nodes.get(&id)?;
        let node = n.handle.borrow();
        node.datum(name).cloned()
    }

    /// Compile and attach a script to a node. Returns false on a parse error;
    /// the node is then left without a script.
    pub fn set_script(&mut self, id: NodeId, script: &str) -> bool {
        if !self.nodes.contains_key(&id) {
            return false;
        }
        let name = self.node_name(id);

        let compiled = self.engine.compile(script);
        let ok = compiled.is_ok();
        let ast = match compiled {
            Ok(ast) => Some(ast),
            Err(e) => {
                self.push_diagnostic(from_parse_error(&name, &e));
                None
            }
        };
        if let Some(n) = self.nodes.get_mut(&id) {
            n.ast = ast;
        }
        ok
    }

    /// Run one evaluation pass for a node.
    ///
    /// Controls the pass does not touch are retired, including when the
    /// script fails partway. Returns false if the script failed.
    pub fn evaluate(&mut self, id: NodeId) -> bool {
        let Some(entry) = self.nodes.get(&id) else {
            return false;
        };
        let handle = entry.handle.clone();
        let ast = entry.ast.clone();
        let name = handle.borrow().name().to_string();

        reset_pass_log_count();
        {
            let mut hooks = self.hooks.borrow_mut();
            hooks.scene.begin_pass(id);
            hooks.active = Some((id, handle.clone()));
            hooks.last_error = None;
        }

        let result = match &ast {
            Some(ast) => {
                let mut scope = Scope::new();
                handle.push_datums(&mut scope);
                scope.push("node", handle.clone());
                self.engine.run_ast_with_scope(&mut scope, ast)
            }
            None => Ok(()),
        };

        let (retired, hook_error) = {
            let mut hooks = self.hooks.borrow_mut();
            hooks.active = None;
            (hooks.scene.end_pass(id), hooks.last_error.take())
        };
        if !retired.is_empty() {
            log::debug!("{} retired {} controls", name, retired.len());
        }

        match result {
            Ok(()) => true,
            Err(e) => {
                let hook_error = hook_error.or_else(|| hook_misuse(&e));
                let diag = from_eval_error(&name, ScriptPhase::Evaluate, &e, hook_error.as_ref());
                log::warn!("Script for {} failed: {}", name, diag.message);
                self.push_diagnostic(diag);
                false
            }
        }
    }

    /// Evaluate every node in creation order. Returns the number that failed.
    pub fn evaluate_all(&mut self) -> usize {
        let ids: Vec<NodeId> = self.nodes.keys().copied().collect();
        ids.into_iter().filter(|id| !self.evaluate(*id)).count()
    }

    fn with_point<T>(
        &self,
        id: NodeId,
        site: CallSite,
        f: impl FnOnce(&mut crate::control::PointControl) -> T,
    ) -> Result<T> {
        let mut hooks = self.hooks.borrow_mut();
        let point = hooks
            .scene
            .get_mut(id, site)
            .and_then(|c| c.as_point_mut())
            .ok_or_else(|| anyhow!("no point control for {} at {}", id, site))?;
        Ok(f(point))
    }

    pub fn begin_drag(&mut self, id: NodeId, site: CallSite) -> Result<()> {
        self.with_point(id, site, |p| p.begin_drag())
    }

    pub fn end_drag(&mut self, id: NodeId, site: CallSite) -> Result<()> {
        self.with_point(id, site, |p| p.end_drag())
    }

    /// Drag a point by `delta`, run its feedback routine and re-evaluate the
    /// node. The point is marked as dragging until [`Self::end_drag`].
    pub fn drag(&mut self, id: NodeId, site: CallSite, delta: Vec3) -> Result<()> {
        let (values, feedback) = self.with_point(id, site, |p| {
            p.begin_drag();
            (p.drag_by(delta), p.feedback().clone())
        })?;

        let Some(entry) = self.nodes.get(&id) else {
            bail!("unknown node {}", id);
        };
        let handle = entry.handle.clone();
        let ast = entry.ast.clone();
        let name = handle.borrow().name().to_string();

        match feedback {
            // Plans always take the delta; relative mode is for script routines.
            Feedback::Synthesized(plan) => {
                let applied = plan.apply(&mut handle.borrow_mut(), delta);
                if let Err(e) = applied {
                    self.push_diagnostic(host_error(&name, ScriptPhase::Drag, e.to_string()));
                    return Err(e.into());
                }
            }
            Feedback::Script(f) => {
                let ast = ast.unwrap_or_default();
                let args = (
                    Dynamic::from(handle.clone()),
                    values.x as FLOAT,
                    values.y as FLOAT,
                    values.z as FLOAT,
                );
                if let Err(e) = f.call::<Dynamic>(&self.engine, &ast, args) {
                    let diag = from_eval_error(&name, ScriptPhase::Drag, &e, None);
                    let message = diag.message.clone();
                    self.push_diagnostic(diag);
                    bail!("drag routine for {} failed: {}", name, message);
                }
            }
        }

        if !self.evaluate(id) {
            bail!(
                "re-evaluating {} failed: {}",
                name,
                self.last_error.clone().unwrap_or_default()
            );
        }
        Ok(())
    }

    pub fn scene(&self) -> Ref<'_, ViewportScene> {
        Ref::map(self.hooks.borrow(), |h| &h.scene)
    }

    pub fn snapshot(&self) -> Vec<ControlSnapshot> {
        self.hooks.borrow().scene.snapshot()
    }

    /// Drain and return all pending diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<ScriptDiagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}
