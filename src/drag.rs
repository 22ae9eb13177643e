//! Feedback routines for draggable points.
//!
//! A point either carries a script function supplied through `drag`, or a
//! [`DragPlan`] synthesized from which of its coordinates alias node datums.
//! The plan is plain data: a list of (axis, datum) pairs applied directly to
//! the node when the point is dragged.

use glam::Vec3;
use rhai::FnPtr;

use crate::error::{HookError, HookResult};
use crate::node::{DatumLookup, Node, NodeError};
use crate::script_value::{HookArg, Options, ScriptValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn component(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Increment each listed datum by the drag delta along its axis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DragPlan {
    steps: Vec<(Axis, String)>,
}

impl DragPlan {
    /// Build a plan from the x, y, z arguments of a `point` call. Axes whose
    /// argument does not alias a datum are left out.
    pub fn synthesize(coords: &[HookArg; 3], datums: &dyn DatumLookup) -> Self {
        let steps = Axis::ALL
            .iter()
            .zip(coords.iter())
            .filter_map(|(&axis, arg)| datums.datum_for(arg).map(|name| (axis, name)))
            .collect();
        Self { steps }
    }

    pub fn steps(&self) -> &[(Axis, String)] {
        &self.steps
    }

    /// A plan with no steps ignores drags entirely.
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn apply(&self, node: &mut Node, delta: Vec3) -> Result<(), NodeError> {
        for (axis, name) in &self.steps {
            node.increment(name, f64::from(axis.component(delta)))?;
        }
        Ok(())
    }
}

/// The routine a point runs when dragged. Owned by exactly one point.
#[derive(Debug, Clone)]
pub enum Feedback {
    /// Called as `f(node, x, y, z)` through the script engine.
    Script(FnPtr),
    Synthesized(DragPlan),
}

impl PartialEq for Feedback {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Feedback::Synthesized(a), Feedback::Synthesized(b)) => a == b,
            (Feedback::Script(a), Feedback::Script(b)) => {
                ScriptValue::Fn(a.clone()) == ScriptValue::Fn(b.clone())
            }
            _ => false,
        }
    }
}

/// Decide the feedback routine for a point being constructed.
///
/// An explicit `drag` option wins. Without one, `relative` is rejected and a
/// plan is synthesized from the coordinate aliases.
pub fn feedback_for(
    coords: &[HookArg; 3],
    options: &Options,
    datums: &dyn DatumLookup,
) -> HookResult<Feedback> {
    if let Some(drag) = options.get("drag") {
        return match drag {
            ScriptValue::Fn(f) => Ok(Feedback::Script(f.clone())),
            _ => Err(HookError::usage("drag value must be a function")),
        };
    }

    if options.contains_key("relative") {
        return Err(HookError::usage(
            "Can't provide 'relative' argument without drag function",
        ));
    }

    let plan = DragPlan::synthesize(coords, datums);
    if plan.is_noop() {
        log::debug!("No coordinate aliases a datum; point drags will be ignored");
    }
    Ok(Feedback::Synthesized(plan))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_with(values: &[(&str, f64)]) -> Node {
        let mut node = Node::new("n");
        for (name, v) in values {
            node.set_datum(name, ScriptValue::Float(*v));
        }
        node
    }

    #[test]
    fn test_synthesize_only_aliased_axes() {
        let node = node_with(&[("a", 1.0), ("b", 2.0)]);
        let coords = [node.read("a").unwrap(), HookArg::new(0.0), node.read("b").unwrap()];

        let plan = DragPlan::synthesize(&coords, &node);
        assert_eq!(
            plan.steps(),
            &[(Axis::X, "a".to_string()), (Axis::Z, "b".to_string())]
        );
    }

    #[test]
    fn test_apply_increments_by_delta() {
        let mut node = node_with(&[("a", 1.0), ("b", 2.0)]);
        let coords = [node.read("a").unwrap(), HookArg::new(0.0), HookArg::new(0.0)];
        let plan = DragPlan::synthesize(&coords, &node);

        plan.apply(&mut node, Vec3::new(2.0, 5.0, 5.0)).unwrap();
        assert_eq!(node.datum("a"), Some(&ScriptValue::Float(3.0)));
        assert_eq!(node.datum("b"), Some(&ScriptValue::Float(2.0)));
    }

    #[test]
    fn test_no_alias_is_noop() {
        let mut node = node_with(&[("a", 1.0)]);
        let coords = [HookArg::new(1.0), HookArg::new(0.0), HookArg::new(0.0)];
        let plan = DragPlan::synthesize(&coords, &node);
        assert!(plan.is_noop());
        plan.apply(&mut node, Vec3::ONE).unwrap();
        assert_eq!(node.datum("a"), Some(&ScriptValue::Float(1.0)));
    }

    #[test]
    fn test_relative_without_drag_is_rejected() {
        let node = node_with(&[]);
        let coords = [HookArg::new(0.0), HookArg::new(0.0), HookArg::new(0.0)];
        let mut options = Options::new();
        options.insert("relative".into(), ScriptValue::Bool(true));

        let err = feedback_for(&coords, &options, &node).unwrap_err();
        assert_eq!(
            err.message(),
            "Can't provide 'relative' argument without drag function"
        );
    }

    #[test]
    fn test_explicit_drag_wins() {
        let node = node_with(&[]);
        let coords = [HookArg::new(0.0), HookArg::new(0.0), HookArg::new(0.0)];
        let mut options = Options::new();
        options.insert("drag".into(), ScriptValue::Fn(FnPtr::new("on_drag").unwrap()));
        options.insert("relative".into(), ScriptValue::Bool(false));

        match feedback_for(&coords, &options, &node).unwrap() {
            Feedback::Script(f) => assert_eq!(f.fn_name(), "on_drag"),
            other => panic!("Expected script feedback, got {other:?}"),
        }

        options.insert("drag".into(), ScriptValue::Int(1));
        assert_eq!(
            feedback_for(&coords, &options, &node).unwrap_err().message(),
            "drag value must be a function"
        );
    }
}
