//! The viewport's registry of live controls.
//!
//! Controls are keyed by (node, call site). The hooks look controls up and
//! register new ones; the scene owns them and retires the ones a node's
//! evaluation pass did not touch.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::Serialize;
use thiserror::Error;

use crate::call_site::CallSite;
use crate::control::{Color, Control, ControlKind};
use crate::node::NodeId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error("a control is already registered for {node} at {site}")]
    AlreadyRegistered { node: NodeId, site: CallSite },
}

/// Registry key for a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ControlKey {
    pub node: NodeId,
    pub site: CallSite,
}

/// Serializable view of a control for tooling and the CLI.
#[derive(Debug, Clone, Serialize)]
pub struct ControlSnapshot {
    pub node: u64,
    pub line: CallSite,
    pub kind: ControlKind,
    pub color: Color,
    pub dragging: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<[f32; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub radius: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<Vec<[f32; 3]>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub closed: Option<bool>,
}

impl ControlSnapshot {
    fn new(key: ControlKey, control: &Control) -> Self {
        let mut snapshot = Self {
            node: key.node.0,
            line: key.site,
            kind: control.kind(),
            color: control.color(),
            dragging: control.is_dragging(),
            position: None,
            radius: None,
            relative: None,
            points: None,
            thickness: None,
            closed: None,
        };
        match control {
            Control::Point(p) => {
                snapshot.position = Some(p.position().to_array());
                snapshot.radius = Some(p.radius());
                snapshot.relative = Some(p.relative());
            }
            Control::Wireframe(w) => {
                snapshot.points = Some(w.points().iter().map(Vec3::to_array).collect());
                snapshot.thickness = Some(w.thickness());
                snapshot.closed = Some(w.closed());
            }
        }
        snapshot
    }
}

/// All live controls, for every node.
#[derive(Debug, Default)]
pub struct ViewportScene {
    controls: BTreeMap<ControlKey, Control>,
}

impl ViewportScene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId, site: CallSite) -> Option<&Control> {
        self.controls.get(&ControlKey { node, site })
    }

    pub fn get_mut(&mut self, node: NodeId, site: CallSite) -> Option<&mut Control> {
        self.controls.get_mut(&ControlKey { node, site })
    }

    /// Register a newly created control. Fails if the key is taken; callers
    /// remove the previous control first.
    pub fn register(
        &mut self,
        node: NodeId,
        site: CallSite,
        control: Control,
    ) -> Result<&mut Control, SceneError> {
        use std::collections::btree_map::Entry;

        match self.controls.entry(ControlKey { node, site }) {
            Entry::Occupied(_) => Err(SceneError::AlreadyRegistered { node, site }),
            Entry::Vacant(slot) => {
                log::debug!("Registered {:?} for {} at {}", control.kind(), node, site);
                Ok(slot.insert(control))
            }
        }
    }

    pub fn remove(&mut self, node: NodeId, site: CallSite) -> Option<Control> {
        self.controls.remove(&ControlKey { node, site })
    }

    /// Start an evaluation pass for `node`: nothing of it is touched yet.
    pub fn begin_pass(&mut self, node: NodeId) {
        for (_, control) in self.controls.iter_mut().filter(|(k, _)| k.node == node) {
            control.untouch();
        }
    }

    /// Finish an evaluation pass for `node`, retiring every control the pass
    /// did not touch. Returns the retired call sites.
    pub fn end_pass(&mut self, node: NodeId) -> Vec<CallSite> {
        let stale: Vec<ControlKey> = self
            .controls
            .iter()
            .filter(|(k, c)| k.node == node && !c.is_touched())
            .map(|(k, _)| *k)
            .collect();

        for key in &stale {
            self.controls.remove(key);
            log::debug!("Retired stale control for {} at {}", key.node, key.site);
        }
        stale.into_iter().map(|k| k.site).collect()
    }

    /// Drop every control belonging to `node`.
    pub fn remove_node(&mut self, node: NodeId) -> usize {
        let before = self.controls.len();
        self.controls.retain(|k, _| k.node != node);
        before - self.controls.len()
    }

    pub fn controls(&self) -> impl Iterator<Item = (ControlKey, &Control)> {
        self.controls.iter().map(|(k, c)| (*k, c))
    }

    pub fn controls_for(&self, node: NodeId) -> impl Iterator<Item = (CallSite, &Control)> {
        self.controls
            .iter()
            .filter(move |(k, _)| k.node == node)
            .map(|(k, c)| (k.site, c))
    }

    pub fn points(&self) -> impl Iterator<Item = (ControlKey, &Control)> {
        self.controls().filter(|(_, c)| c.kind() == ControlKind::Point)
    }

    pub fn wireframes(&self) -> impl Iterator<Item = (ControlKey, &Control)> {
        self.controls().filter(|(_, c)| c.kind() == ControlKind::Wireframe)
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn snapshot(&self) -> Vec<ControlSnapshot> {
        self.controls()
            .map(|(k, c)| ControlSnapshot::new(k, c))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControlDefaults;
    use crate::control::WireframeControl;

    fn wireframe() -> Control {
        Control::Wireframe(WireframeControl::new(&ControlDefaults::default()))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut scene = ViewportScene::new();
        let node = NodeId(1);
        let site = CallSite::from_line(3);

        scene.register(node, site, wireframe()).unwrap();
        assert!(scene.get(node, site).is_some());
        assert!(scene.get(NodeId(2), site).is_none());
        assert!(scene.get(node, CallSite::from_line(4)).is_none());
    }

    #[test]
    fn test_double_register_fails() {
        let mut scene = ViewportScene::new();
        let node = NodeId(1);
        let site = CallSite::from_line(3);

        scene.register(node, site, wireframe()).unwrap();
        assert_eq!(
            scene.register(node, site, wireframe()).unwrap_err(),
            SceneError::AlreadyRegistered { node, site }
        );
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn test_pass_retires_untouched() {
        let mut scene = ViewportScene::new();
        let node = NodeId(1);
        let other = NodeId(2);
        let kept = CallSite::from_line(1);
        let stale = CallSite::from_line(2);

        scene.register(node, kept, wireframe()).unwrap();
        scene.register(node, stale, wireframe()).unwrap();
        scene.register(other, stale, wireframe()).unwrap();

        scene.begin_pass(node);
        scene.get_mut(node, kept).unwrap().touch();
        let retired = scene.end_pass(node);

        assert_eq!(retired, vec![stale]);
        assert!(scene.get(node, kept).is_some());
        assert!(scene.get(node, stale).is_none());
        // Other nodes are untouched by this node's pass.
        assert!(scene.get(other, stale).is_some());
    }

    #[test]
    fn test_remove_node() {
        let mut scene = ViewportScene::new();
        scene.register(NodeId(1), CallSite::from_line(1), wireframe()).unwrap();
        scene.register(NodeId(1), CallSite::from_line(2), wireframe()).unwrap();
        scene.register(NodeId(2), CallSite::from_line(1), wireframe()).unwrap();

        assert_eq!(scene.remove_node(NodeId(1)), 2);
        assert_eq!(scene.len(), 1);
        assert_eq!(scene.wireframes().count(), 1);
        assert_eq!(scene.points().count(), 0);
    }
}
