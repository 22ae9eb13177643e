//! Nodes and their named datums.
//!
//! A node owns an ordered set of datums (named attribute values). Scripts read
//! them through a [`NodeHandle`]; every value handed out is tagged with the
//! datum slot it came from so hooks can later ask which datum an argument
//! aliases.

use std::cell::RefCell;
use std::rc::Rc;

use rhai::{Dynamic, Engine, EvalAltResult, ImmutableString, Position};
use thiserror::Error;

use crate::script_value::{DatumSlot, HookArg, ScriptValue};

/// Unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NodeError {
    #[error("node has no datum named '{0}'")]
    MissingDatum(String),
    #[error("datum '{name}' holds a {type_name}, not a number")]
    NotNumeric { name: String, type_name: String },
}

/// A named attribute on a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub name: String,
    pub value: ScriptValue,
}

/// Answers "which of my datums currently holds this argument?".
pub trait DatumLookup {
    fn datum_for(&self, arg: &HookArg) -> Option<String>;
}

#[derive(Debug, Clone, Default)]
pub struct Node {
    name: String,
    /// Append-only: a datum's index is its slot for the node's lifetime.
    datums: Vec<Datum>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            datums: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn slot_of(&self, name: &str) -> Option<DatumSlot> {
        self.datums
            .iter()
            .position(|d| d.name == name)
            .map(|i| DatumSlot(i as u32))
    }

    /// Set a datum, creating it if needed. Returns its slot.
    pub fn set_datum(&mut self, name: &str, value: ScriptValue) -> DatumSlot {
        match self.slot_of(name) {
            Some(slot) => {
                self.datums[slot.0 as usize].value = value;
                slot
            }
            None => {
                self.datums.push(Datum {
                    name: name.to_string(),
                    value,
                });
                DatumSlot(self.datums.len() as u32 - 1)
            }
        }
    }

    pub fn datum(&self, name: &str) -> Option<&ScriptValue> {
        self.datums.iter().find(|d| d.name == name).map(|d| &d.value)
    }

    pub fn datums(&self) -> &[Datum] {
        &self.datums
    }

    /// Read a datum as a hook argument carrying its slot.
    pub fn read(&self, name: &str) -> Option<HookArg> {
        let slot = self.slot_of(name)?;
        Some(HookArg::from_datum(self.datums[slot.0 as usize].value.clone(), slot))
    }

    /// Add `delta` to a numeric datum. Integers are promoted to floats.
    pub fn increment(&mut self, name: &str, delta: f64) -> Result<(), NodeError> {
        let datum = self
            .datums
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| NodeError::MissingDatum(name.to_string()))?;

        let current = datum.value.as_f64().ok_or_else(|| NodeError::NotNumeric {
            name: name.to_string(),
            type_name: datum.value.type_name().to_string(),
        })?;
        datum.value = ScriptValue::Float(current + delta);
        Ok(())
    }

    /// Engine value for a datum, tagged with its slot.
    fn tagged_value(&self, name: &str) -> Option<Dynamic> {
        let slot = self.slot_of(name)?;
        let mut value = self.datums[slot.0 as usize].value.to_dynamic();
        value.set_tag(slot.to_tag() as _);
        Some(value)
    }
}

impl DatumLookup for Node {
    fn datum_for(&self, arg: &HookArg) -> Option<String> {
        let slot = arg.origin?;
        let datum = self.datums.get(slot.0 as usize)?;
        // Floats reach scripts at engine precision.
        let current = datum.value == arg.value
            || ScriptValue::from_dynamic(&datum.value.to_dynamic()) == arg.value;
        current.then(|| datum.name.clone())
    }
}

/// Shared handle to a node, exposed to scripts as type `Node`.
#[derive(Debug, Clone, Default)]
pub struct NodeHandle(Rc<RefCell<Node>>);

impl NodeHandle {
    pub fn new(node: Node) -> Self {
        Self(Rc::new(RefCell::new(node)))
    }

    pub fn borrow(&self) -> std::cell::Ref<'_, Node> {
        self.0.borrow()
    }

    pub fn borrow_mut(&self) -> std::cell::RefMut<'_, Node> {
        self.0.borrow_mut()
    }

    /// Push every datum into `scope` as a variable, tagged like `node.<name>`.
    pub fn push_datums(&self, scope: &mut rhai::Scope<'_>) {
        let node = self.0.borrow();
        for datum in node.datums.iter().filter(|d| d.name != "node") {
            if let Some(value) = node.tagged_value(&datum.name) {
                scope.push_dynamic(datum.name.clone(), value);
            }
        }
    }
}

impl DatumLookup for NodeHandle {
    fn datum_for(&self, arg: &HookArg) -> Option<String> {
        self.0.borrow().datum_for(arg)
    }
}

/// Register the `Node` type. Datums are reached with `node.name` or
/// `node["name"]`; property access falls back to the string indexer.
pub fn register_node_api(engine: &mut Engine) {
    engine.register_type_with_name::<NodeHandle>("Node");

    engine.register_indexer_get(
        |node: &mut NodeHandle, name: ImmutableString| -> Result<Dynamic, Box<EvalAltResult>> {
            node.0.borrow().tagged_value(name.as_str()).ok_or_else(|| {
                EvalAltResult::ErrorPropertyNotFound(name.to_string(), Position::NONE).into()
            })
        },
    );

    engine.register_indexer_set(|node: &mut NodeHandle, name: ImmutableString, value: Dynamic| {
        node.0
            .borrow_mut()
            .set_datum(name.as_str(), ScriptValue::from_dynamic(&value));
    });

    engine.register_get("name", |node: &mut NodeHandle| -> ImmutableString {
        node.0.borrow().name.clone().into()
    });
}
