//! The `point` and `wireframe` hooks.
//!
//! Each call validates its arguments, finds the control created at the same
//! call site by an earlier pass (if any), decides whether to keep it or build a
//! new one, applies the call's attributes in one update and marks the control
//! touched for the current pass.
//!
//! Argument and option errors are detected before the scene is modified, so a
//! failing call leaves the registry as it was.

use glam::Vec3;

use crate::call_site::CallSite;
use crate::config::ControlDefaults;
use crate::control::{Color, Control, PointControl, WireframeControl};
use crate::drag::{feedback_for, Feedback};
use crate::error::{HookError, HookResult};
use crate::extract::{coordinate, extract_vectors, option_bool, option_color, option_f32};
use crate::node::{DatumLookup, NodeId};
use crate::script_value::{HookArg, Options};
use crate::viewport_scene::ViewportScene;

/// Everything a hook call needs besides its arguments.
pub struct HookContext<'a> {
    pub scene: &'a mut ViewportScene,
    pub datums: &'a dyn DatumLookup,
    pub defaults: &'a ControlDefaults,
    pub node: NodeId,
    pub site: CallSite,
}

/// What to do with the point found at this call site.
enum PointReuse {
    /// Being dragged: keep identity and feedback, refresh attributes from the
    /// point's current values.
    Dragging,
    /// Same feedback as before: refresh in place as if freshly created.
    Refresh,
    /// Missing, of another kind, or with different feedback: build anew.
    Replace(Feedback),
}

fn register_new<'s>(
    ctx: &'s mut HookContext<'_>,
    control: Control,
) -> HookResult<&'s mut Control> {
    if let Some(old) = ctx.scene.remove(ctx.node, ctx.site) {
        log::debug!(
            "Discarding {:?} for {} at {}",
            old.kind(),
            ctx.node,
            ctx.site
        );
    }
    ctx.scene
        .register(ctx.node, ctx.site, control)
        .map_err(|e| HookError::internal(e.to_string()))
}

fn note_if_reissued(control: &Control, node: NodeId, site: CallSite) {
    if control.is_touched() {
        log::debug!(
            "{} at {} was issued more than once in one pass; the last call wins",
            node,
            site
        );
    }
}

/// `point(x, y, z, #{ drag, relative, r, color })`
pub fn point(ctx: &mut HookContext<'_>, args: &[HookArg], options: &Options) -> HookResult<()> {
    let coords: &[HookArg; 3] = args
        .try_into()
        .map_err(|_| HookError::usage("Expected x, y, z as arguments"))?;

    let position = Vec3::new(
        coordinate(&coords[0].value, "x")?,
        coordinate(&coords[1].value, "y")?,
        coordinate(&coords[2].value, "z")?,
    );

    let reuse = match ctx.scene.get(ctx.node, ctx.site) {
        Some(Control::Point(p)) if p.is_dragging() => PointReuse::Dragging,
        Some(Control::Point(p)) => {
            let feedback = feedback_for(coords, options, ctx.datums)?;
            if *p.feedback() == feedback {
                PointReuse::Refresh
            } else {
                PointReuse::Replace(feedback)
            }
        }
        _ => PointReuse::Replace(feedback_for(coords, options, ctx.datums)?),
    };

    let (prior_radius, prior_color, prior_relative) = match (&reuse, ctx.scene.get(ctx.node, ctx.site)) {
        (PointReuse::Dragging, Some(Control::Point(p))) => (p.radius(), p.color(), p.relative()),
        _ => (
            ctx.defaults.point_radius,
            ctx.defaults.point_color,
            ctx.defaults.point_relative,
        ),
    };
    let radius = option_f32(options, "r", prior_radius)?;
    let color = option_color(options, prior_color)?;
    let relative = option_bool(options, "relative", prior_relative)?;

    let defaults = ctx.defaults;
    let control = match reuse {
        PointReuse::Dragging | PointReuse::Refresh => {
            let (node, site) = (ctx.node, ctx.site);
            let existing = ctx
                .scene
                .get_mut(node, site)
                .ok_or_else(|| HookError::internal("point vanished during reconciliation"))?;
            note_if_reissued(existing, node, site);
            existing
        }
        PointReuse::Replace(feedback) => {
            register_new(ctx, Control::Point(PointControl::new(feedback, defaults)))?
        }
    };

    control
        .as_point_mut()
        .ok_or_else(|| HookError::internal("control at point call site is not a point"))?
        .update(position, radius, color, relative);
    control.touch();
    Ok(())
}

/// `wireframe([[x, y, z], ...], #{ t, color, close })`
pub fn wireframe(ctx: &mut HookContext<'_>, args: &[HookArg], options: &Options) -> HookResult<()> {
    let [points] = args else {
        return Err(HookError::usage("Expected list of 3-tuples as argument"));
    };

    let points = extract_vectors(&points.value)?;
    if points.is_empty() {
        return Err(HookError::usage("Wireframe must have at least one point"));
    }

    let existing = ctx.scene.get(ctx.node, ctx.site).and_then(Control::as_wireframe);
    let (prior_t, prior_color, prior_closed): (f32, Color, bool) = match existing {
        Some(w) => (w.thickness(), w.color(), w.closed()),
        None => (
            ctx.defaults.wireframe_thickness,
            ctx.defaults.wireframe_color,
            ctx.defaults.wireframe_closed,
        ),
    };
    let reuse = existing.is_some();

    let thickness = option_f32(options, "t", prior_t)?;
    let color = option_color(options, prior_color)?;
    let closed = option_bool(options, "close", prior_closed)?;

    let control = if reuse {
        let (node, site) = (ctx.node, ctx.site);
        let existing = ctx
            .scene
            .get_mut(node, site)
            .ok_or_else(|| HookError::internal("wireframe vanished during reconciliation"))?;
        note_if_reissued(existing, node, site);
        existing
    } else {
        let defaults = ctx.defaults;
        register_new(ctx, Control::Wireframe(WireframeControl::new(defaults)))?
    };

    control
        .as_wireframe_mut()
        .ok_or_else(|| HookError::internal("control at wireframe call site is not a wireframe"))?
        .update(points, thickness, color, closed);
    control.touch();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::script_value::ScriptValue;

    struct Harness {
        scene: ViewportScene,
        node: Node,
        defaults: ControlDefaults,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                scene: ViewportScene::new(),
                node: Node::new("n"),
                defaults: ControlDefaults::default(),
            }
        }

        fn point(&mut self, line: u32, args: &[HookArg], options: &Options) -> HookResult<()> {
            let mut ctx = HookContext {
                scene: &mut self.scene,
                datums: &self.node,
                defaults: &self.defaults,
                node: NodeId(1),
                site: CallSite::from_line(line),
            };
            point(&mut ctx, args, options)
        }

        fn wireframe(&mut self, line: u32, args: &[HookArg], options: &Options) -> HookResult<()> {
            let mut ctx = HookContext {
                scene: &mut self.scene,
                datums: &self.node,
                defaults: &self.defaults,
                node: NodeId(1),
                site: CallSite::from_line(line),
            };
            wireframe(&mut ctx, args, options)
        }

        fn control(&self, line: u32) -> Option<&Control> {
            self.scene.get(NodeId(1), CallSite::from_line(line))
        }
    }

    fn xyz(x: f64, y: f64, z: f64) -> Vec<HookArg> {
        vec![HookArg::new(x), HookArg::new(y), HookArg::new(z)]
    }

    fn vectors(points: &[[i64; 3]]) -> HookArg {
        HookArg::new(ScriptValue::Tuple(
            points
                .iter()
                .map(|p| ScriptValue::Tuple(p.iter().map(|&c| ScriptValue::Int(c)).collect()))
                .collect(),
        ))
    }

    #[test]
    fn test_point_creates_and_touches() {
        let mut h = Harness::new();
        h.point(1, &xyz(1.0, 2.0, 3.0), &Options::new()).unwrap();

        let control = h.control(1).unwrap();
        assert!(control.is_touched());
        let p = control.as_point().unwrap();
        assert_eq!(p.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.radius(), h.defaults.point_radius);
    }

    #[test]
    fn test_point_arity() {
        let mut h = Harness::new();
        let err = h.point(1, &[HookArg::new(5.0)], &Options::new()).unwrap_err();
        assert_eq!(err, HookError::usage("Expected x, y, z as arguments"));
        assert!(h.scene.is_empty());
    }

    #[test]
    fn test_point_non_numeric_z() {
        let mut h = Harness::new();
        let args = vec![HookArg::new(1.0), HookArg::new(2.0), HookArg::new("a")];
        let err = h.point(1, &args, &Options::new()).unwrap_err();
        assert_eq!(err.message(), "z value must be a number");
    }

    #[test]
    fn test_point_relative_requires_drag() {
        let mut h = Harness::new();
        let mut options = Options::new();
        options.insert("relative".into(), ScriptValue::Bool(true));
        let err = h.point(1, &xyz(0.0, 0.0, 0.0), &options).unwrap_err();
        assert_eq!(
            err.message(),
            "Can't provide 'relative' argument without drag function"
        );
        assert!(h.scene.is_empty());
    }

    #[test]
    fn test_bad_option_leaves_scene_untouched() {
        let mut h = Harness::new();
        let mut options = Options::new();
        options.insert("r".into(), ScriptValue::Str("big".into()));
        let err = h.point(1, &xyz(0.0, 0.0, 0.0), &options).unwrap_err();
        assert_eq!(err.message(), "r value must be a number");
        assert!(h.scene.is_empty());
    }

    #[test]
    fn test_point_options_applied() {
        let mut h = Harness::new();
        let mut options = Options::new();
        options.insert("r".into(), ScriptValue::Float(0.5));
        options.insert(
            "color".into(),
            ScriptValue::List(vec![ScriptValue::Int(10), ScriptValue::Int(20), ScriptValue::Int(30)]),
        );
        h.point(1, &xyz(0.0, 0.0, 0.0), &options).unwrap();

        let p = h.control(1).unwrap().as_point().unwrap();
        assert_eq!(p.radius(), 0.5);
        assert_eq!(p.color(), Color::new(10, 20, 30));
    }

    #[test]
    fn test_repeat_call_is_idempotent() {
        let mut h = Harness::new();
        h.point(1, &xyz(1.0, 2.0, 3.0), &Options::new()).unwrap();
        let before = h.control(1).unwrap().as_point().unwrap().clone();

        h.scene.begin_pass(NodeId(1));
        h.point(1, &xyz(1.0, 2.0, 3.0), &Options::new()).unwrap();
        let after = h.control(1).unwrap().as_point().unwrap();

        assert_eq!(h.scene.len(), 1);
        assert_eq!(after.position(), before.position());
        assert_eq!(after.radius(), before.radius());
        assert_eq!(after.color(), before.color());
        assert_eq!(after.feedback(), before.feedback());
    }

    #[test]
    fn test_non_dragging_point_forgets_previous_options() {
        let mut h = Harness::new();
        let mut options = Options::new();
        options.insert("r".into(), ScriptValue::Float(0.5));
        h.point(1, &xyz(0.0, 0.0, 0.0), &options).unwrap();

        h.point(1, &xyz(0.0, 0.0, 0.0), &Options::new()).unwrap();
        let p = h.control(1).unwrap().as_point().unwrap();
        assert_eq!(p.radius(), h.defaults.point_radius);
    }

    #[test]
    fn test_dragging_point_keeps_feedback_and_prior_attributes() {
        let mut h = Harness::new();
        h.node.set_datum("a", ScriptValue::Float(1.0));
        let aliased = vec![h.node.read("a").unwrap(), HookArg::new(0.0), HookArg::new(0.0)];

        let mut options = Options::new();
        options.insert("r".into(), ScriptValue::Float(0.5));
        h.point(1, &aliased, &options).unwrap();
        let original = h.control(1).unwrap().as_point().unwrap().feedback().clone();

        h.scene
            .get_mut(NodeId(1), CallSite::from_line(1))
            .and_then(Control::as_point_mut)
            .unwrap()
            .begin_drag();

        // The alias is gone this pass, which would otherwise rebuild the point.
        h.point(1, &xyz(4.0, 0.0, 0.0), &Options::new()).unwrap();
        let p = h.control(1).unwrap().as_point().unwrap();
        assert!(p.is_dragging());
        assert_eq!(p.feedback(), &original);
        assert_eq!(p.position(), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(p.radius(), 0.5);
    }

    #[test]
    fn test_changed_alias_rebuilds_idle_point() {
        let mut h = Harness::new();
        h.node.set_datum("a", ScriptValue::Float(1.0));
        let aliased = vec![h.node.read("a").unwrap(), HookArg::new(0.0), HookArg::new(0.0)];
        h.point(1, &aliased, &Options::new()).unwrap();

        h.point(1, &xyz(1.0, 0.0, 0.0), &Options::new()).unwrap();
        match h.control(1).unwrap().as_point().unwrap().feedback() {
            Feedback::Synthesized(plan) => assert!(plan.is_noop()),
            other => panic!("Expected synthesized feedback, got {other:?}"),
        }
    }

    #[test]
    fn test_point_replaces_wireframe_at_same_site() {
        let mut h = Harness::new();
        h.wireframe(1, &[vectors(&[[0, 0, 0]])], &Options::new()).unwrap();
        h.point(1, &xyz(0.0, 0.0, 0.0), &Options::new()).unwrap();
        assert!(h.control(1).unwrap().as_point().is_some());
        assert_eq!(h.scene.len(), 1);
    }

    #[test]
    fn test_wireframe_single_point() {
        let mut h = Harness::new();
        h.wireframe(2, &[vectors(&[[0, 0, 0]])], &Options::new()).unwrap();
        let w = h.control(2).unwrap().as_wireframe().unwrap();
        assert_eq!(w.points(), &[Vec3::ZERO]);
        assert!(!w.closed());
    }

    #[test]
    fn test_wireframe_empty_fails() {
        let mut h = Harness::new();
        let err = h
            .wireframe(2, &[HookArg::new(ScriptValue::Tuple(vec![]))], &Options::new())
            .unwrap_err();
        assert_eq!(err.message(), "Wireframe must have at least one point");
        assert!(h.scene.is_empty());
    }

    #[test]
    fn test_wireframe_arity() {
        let mut h = Harness::new();
        let err = h.wireframe(2, &[], &Options::new()).unwrap_err();
        assert_eq!(err.message(), "Expected list of 3-tuples as argument");
    }

    #[test]
    fn test_wireframe_reused_with_prior_attributes() {
        let mut h = Harness::new();
        let mut options = Options::new();
        options.insert("t".into(), ScriptValue::Float(3.0));
        options.insert("close".into(), ScriptValue::Bool(true));
        h.wireframe(2, &[vectors(&[[0, 0, 0], [1, 0, 0]])], &options).unwrap();

        h.scene.begin_pass(NodeId(1));
        h.wireframe(2, &[vectors(&[[0, 0, 0], [0, 1, 0], [0, 0, 1]])], &Options::new())
            .unwrap();

        let control = h.control(2).unwrap();
        assert!(control.is_touched());
        let w = control.as_wireframe().unwrap();
        assert_eq!(w.points().len(), 3);
        assert_eq!(w.thickness(), 3.0);
        assert!(w.closed());
    }
}
