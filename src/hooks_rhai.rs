//! Rhai registration for the control hooks.
//!
//! `point` and `wireframe` are registered for every arity up to
//! [`MAX_HOOK_ARGS`] so the hooks themselves report wrong argument counts.
//! Longer calls fail to resolve and are mapped to the same error by
//! [`hook_misuse`]. A trailing object map is the options map; everything
//! before it is positional.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Dynamic, Engine, EvalAltResult, NativeCallContext, Position};

use crate::call_site::CallSite;
use crate::config::ControlDefaults;
use crate::error::{HookError, HookResult};
use crate::hooks::{self, HookContext};
use crate::node::{NodeHandle, NodeId};
use crate::script_log::{script_log, stringify_dynamic, LogLevel};
use crate::script_value::{HookArg, Options, ScriptValue};
use crate::viewport_scene::ViewportScene;

/// State shared between the engine host and the registered hook functions.
#[derive(Debug, Default)]
pub struct HookState {
    pub scene: ViewportScene,
    pub defaults: ControlDefaults,
    /// Node whose script is currently being evaluated.
    pub active: Option<(NodeId, NodeHandle)>,
    /// Most recent hook failure, kept so diagnostics can classify it.
    pub last_error: Option<HookError>,
}

impl HookState {
    pub fn new(defaults: ControlDefaults) -> Self {
        Self {
            defaults,
            ..Self::default()
        }
    }

    fn active_name(&self) -> String {
        self.active
            .as_ref()
            .map(|(_, handle)| handle.borrow().name().to_string())
            .unwrap_or_default()
    }
}

pub type SharedHookState = Rc<RefCell<HookState>>;

#[derive(Debug, Clone, Copy)]
enum Hook {
    Point,
    Wireframe,
}

/// Split raw call arguments into positional arguments and options.
fn split_args(args: &[Dynamic]) -> (Vec<HookArg>, Options) {
    let (positional, options) = match args.split_last() {
        Some((last, rest)) if last.is_map() => (rest, ScriptValue::from_dynamic(last)),
        _ => (args, ScriptValue::Unit),
    };

    let options = match options {
        ScriptValue::Map(map) => map,
        _ => Options::new(),
    };
    (positional.iter().map(HookArg::from_dynamic).collect(), options)
}

fn run_hook(state: &SharedHookState, hook: Hook, pos: Position, args: &[Dynamic]) -> HookResult<()> {
    let site = CallSite::current(pos)?;
    let (positional, options) = split_args(args);

    let mut state = state.borrow_mut();
    let HookState {
        scene,
        defaults,
        active,
        ..
    } = &mut *state;
    let (node_id, handle) = active.as_ref().ok_or_else(|| {
        HookError::usage("controls can only be created while a node script is evaluated")
    })?;

    let node = handle.borrow();
    let mut ctx = HookContext {
        scene,
        datums: &*node,
        defaults,
        node: *node_id,
        site,
    };

    match hook {
        Hook::Point => hooks::point(&mut ctx, &positional, &options),
        Hook::Wireframe => hooks::wireframe(&mut ctx, &positional, &options),
    }
}

fn dispatch(
    state: &SharedHookState,
    hook: Hook,
    ctx: &NativeCallContext,
    args: &[Dynamic],
) -> Result<(), Box<EvalAltResult>> {
    let pos = ctx.call_position();
    run_hook(state, hook, pos, args).map_err(|err| {
        if err.is_internal() {
            log::error!("{:?} hook failed at {}: {}", hook, pos, err);
        }
        let message = err.to_string();
        state.borrow_mut().last_error = Some(err);
        EvalAltResult::ErrorRuntime(message.into(), pos).into()
    })
}

/// Highest argument count registered directly. Calls with more arguments are
/// caught by [`hook_misuse`] instead.
pub const MAX_HOOK_ARGS: usize = 12;

macro_rules! register_arity {
    ($engine:expr, $name:expr, $hook:expr, $state:expr; $($arg:ident),*) => {{
        let s = $state.clone();
        let hook = $hook;
        $engine.register_fn($name, move |ctx: NativeCallContext, $($arg: Dynamic),*| {
            dispatch(&s, hook, &ctx, &[$($arg),*])
        });
    }};
}

fn register_hook(engine: &mut Engine, name: &str, hook: Hook, state: &SharedHookState) {
    register_arity!(engine, name, hook, state;);
    register_arity!(engine, name, hook, state; a);
    register_arity!(engine, name, hook, state; a, b);
    register_arity!(engine, name, hook, state; a, b, c);
    register_arity!(engine, name, hook, state; a, b, c, d);
    register_arity!(engine, name, hook, state; a, b, c, d, e);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f, g);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f, g, h);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f, g, h, i);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f, g, h, i, j);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f, g, h, i, j, k);
    register_arity!(engine, name, hook, state; a, b, c, d, e, f, g, h, i, j, k, l);
}

/// The arity error a hook would have raised, for a call the engine could not
/// resolve because it had more than [`MAX_HOOK_ARGS`] arguments.
pub fn hook_misuse(err: &EvalAltResult) -> Option<HookError> {
    match err {
        EvalAltResult::ErrorFunctionNotFound(signature, _) => {
            let name = signature.split_whitespace().next()?;
            let message = match name {
                "point" => "Expected x, y, z as arguments",
                "wireframe" => "Expected list of 3-tuples as argument",
                _ => return None,
            };
            Some(HookError::usage(message))
        }
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => hook_misuse(inner),
        _ => None,
    }
}

/// Register `point`, `wireframe` and the script output functions.
pub fn register_hook_api(engine: &mut Engine, state: &SharedHookState) {
    register_hook(engine, "point", Hook::Point, state);
    register_hook(engine, "wireframe", Hook::Wireframe, state);

    let s = state.clone();
    engine.register_fn("info", move |value: Dynamic| {
        let node = s.try_borrow().map(|st| st.active_name()).unwrap_or_default();
        script_log(LogLevel::Info, &node, &stringify_dynamic(&value));
    });

    let s = state.clone();
    engine.on_print(move |text| {
        let node = s.try_borrow().map(|st| st.active_name()).unwrap_or_default();
        script_log(LogLevel::Info, &node, text);
    });

    let s = state.clone();
    engine.on_debug(move |text, _source, pos| {
        let node = s.try_borrow().map(|st| st.active_name()).unwrap_or_default();
        script_log(LogLevel::Debug, &node, &format!("{pos}: {text}"));
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_args_trailing_map_is_options() {
        let mut map = rhai::Map::new();
        map.insert("r".into(), Dynamic::from(2_i64));
        let args = vec![
            Dynamic::from(1_i64),
            Dynamic::from(2_i64),
            Dynamic::from(3_i64),
            Dynamic::from_map(map),
        ];

        let (positional, options) = split_args(&args);
        assert_eq!(positional.len(), 3);
        assert_eq!(options.get("r"), Some(&ScriptValue::Int(2)));
    }

    #[test]
    fn test_split_args_without_options() {
        let args = vec![Dynamic::from(1_i64)];
        let (positional, options) = split_args(&args);
        assert_eq!(positional.len(), 1);
        assert!(options.is_empty());

        let (positional, options) = split_args(&[]);
        assert!(positional.is_empty());
        assert!(options.is_empty());
    }

    #[test]
    fn test_unresolved_long_hook_call_is_misuse() {
        let err = EvalAltResult::ErrorFunctionNotFound(
            "point (i64, i64, i64, i64, i64, i64, i64, i64, i64, i64, i64, i64, i64)".into(),
            Position::new(1, 1),
        );
        assert_eq!(
            hook_misuse(&err).unwrap().message(),
            "Expected x, y, z as arguments"
        );

        let err = EvalAltResult::ErrorFunctionNotFound("wireframe (i64)".into(), Position::NONE);
        assert_eq!(
            hook_misuse(&err).unwrap().message(),
            "Expected list of 3-tuples as argument"
        );

        let err = EvalAltResult::ErrorFunctionNotFound("pointy (i64)".into(), Position::NONE);
        assert!(hook_misuse(&err).is_none());
    }

    #[test]
    fn test_hook_outside_pass_is_rejected() {
        let state: SharedHookState = Rc::new(RefCell::new(HookState::default()));
        let args = vec![Dynamic::from(1_i64), Dynamic::from(2_i64), Dynamic::from(3_i64)];
        let err = run_hook(&state, Hook::Point, Position::new(1, 1), &args).unwrap_err();
        assert!(!err.is_internal());
        assert!(state.borrow().scene.is_empty());
    }

    #[test]
    fn test_hook_registers_control_for_active_node() {
        let state: SharedHookState = Rc::new(RefCell::new(HookState::default()));
        let handle = NodeHandle::new(crate::node::Node::new("n"));
        state.borrow_mut().active = Some((NodeId(7), handle));

        let args = vec![Dynamic::from(1_i64), Dynamic::from(2_i64), Dynamic::from(3_i64)];
        run_hook(&state, Hook::Point, Position::new(4, 1), &args).unwrap();

        let st = state.borrow();
        assert!(st.scene.get(NodeId(7), CallSite::from_line(4)).is_some());
    }
}
