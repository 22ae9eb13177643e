//! Loosely-typed values crossing the script boundary.
//!
//! The hook layer never inspects `rhai::Dynamic` directly. Call arguments are
//! converted into [`ScriptValue`] first, and every typed extraction is an
//! explicit, fallible step on top of that (see `extract`).

use std::collections::BTreeMap;
use std::fmt;

use rhai::{Dynamic, FnPtr, FLOAT, INT};

/// A value produced by a node script.
#[derive(Clone)]
pub enum ScriptValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Fixed-size ordered group.
    Tuple(Vec<ScriptValue>),
    /// Variable-length ordered list.
    List(Vec<ScriptValue>),
    Map(BTreeMap<String, ScriptValue>),
    /// A callable handle owned by the script engine.
    Fn(FnPtr),
    /// Anything the hook layer has no representation for; keeps the type name
    /// for error messages.
    Opaque(String),
}

/// Keyed configuration passed alongside positional arguments.
pub type Options = BTreeMap<String, ScriptValue>;

/// Slot index of a datum inside its node, used to trace a value back to the
/// attribute it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DatumSlot(pub u32);

impl DatumSlot {
    /// Encode as a `Dynamic` tag. Zero is the engine's default tag, so slots are
    /// shifted by one.
    pub fn to_tag(self) -> i64 {
        i64::from(self.0) + 1
    }

    pub fn from_tag(tag: i64) -> Option<Self> {
        if tag > 0 && tag <= i64::from(u32::MAX) {
            Some(DatumSlot((tag - 1) as u32))
        } else {
            None
        }
    }
}

/// A positional hook argument: the value plus the datum slot it came from, if
/// it is still the exact value a node handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct HookArg {
    pub value: ScriptValue,
    pub origin: Option<DatumSlot>,
}

impl HookArg {
    pub fn new(value: impl Into<ScriptValue>) -> Self {
        Self {
            value: value.into(),
            origin: None,
        }
    }

    pub fn from_datum(value: ScriptValue, slot: DatumSlot) -> Self {
        Self {
            value,
            origin: Some(slot),
        }
    }

    /// Convert an engine value, recovering its datum origin from the value tag.
    pub fn from_dynamic(value: &Dynamic) -> Self {
        Self {
            value: ScriptValue::from_dynamic(value),
            origin: DatumSlot::from_tag(value.tag() as i64),
        }
    }
}

impl ScriptValue {
    /// Short type description used in diagnostics.
    pub fn type_name(&self) -> &str {
        match self {
            ScriptValue::Unit => "unit",
            ScriptValue::Bool(_) => "bool",
            ScriptValue::Int(_) => "int",
            ScriptValue::Float(_) => "float",
            ScriptValue::Str(_) => "string",
            ScriptValue::Tuple(_) => "tuple",
            ScriptValue::List(_) => "list",
            ScriptValue::Map(_) => "map",
            ScriptValue::Fn(_) => "function",
            ScriptValue::Opaque(name) => name.as_str(),
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, ScriptValue::Int(_) | ScriptValue::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Int(i) => Some(*i as f64),
            ScriptValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn from_dynamic(value: &Dynamic) -> Self {
        if value.is_unit() {
            return ScriptValue::Unit;
        }
        if let Ok(b) = value.as_bool() {
            return ScriptValue::Bool(b);
        }
        if let Ok(i) = value.as_int() {
            return ScriptValue::Int(i);
        }
        if let Ok(f) = value.as_float() {
            return ScriptValue::Float(f64::from(f));
        }
        if value.is_string() {
            if let Ok(s) = value.clone().into_immutable_string() {
                return ScriptValue::Str(s.to_string());
            }
        }
        if value.is_array() {
            if let Some(arr) = value.clone().try_cast::<rhai::Array>() {
                return ScriptValue::List(arr.iter().map(ScriptValue::from_dynamic).collect());
            }
        }
        if value.is_map() {
            if let Some(map) = value.clone().try_cast::<rhai::Map>() {
                return ScriptValue::Map(
                    map.iter()
                        .map(|(k, v)| (k.to_string(), ScriptValue::from_dynamic(v)))
                        .collect(),
                );
            }
        }
        if value.is::<FnPtr>() {
            if let Some(f) = value.clone().try_cast::<FnPtr>() {
                return ScriptValue::Fn(f);
            }
        }
        ScriptValue::Opaque(value.type_name().to_string())
    }

    /// Convert back into an engine value. Tuples become arrays since the
    /// engine has no fixed-size group type.
    pub fn to_dynamic(&self) -> Dynamic {
        match self {
            ScriptValue::Unit | ScriptValue::Opaque(_) => Dynamic::UNIT,
            ScriptValue::Bool(b) => Dynamic::from_bool(*b),
            ScriptValue::Int(i) => Dynamic::from_int(*i as INT),
            ScriptValue::Float(f) => Dynamic::from_float(*f as FLOAT),
            ScriptValue::Str(s) => Dynamic::from(s.clone()),
            ScriptValue::Tuple(items) | ScriptValue::List(items) => {
                let arr: rhai::Array = items.iter().map(ScriptValue::to_dynamic).collect();
                Dynamic::from_array(arr)
            }
            ScriptValue::Map(map) => {
                let mut out = rhai::Map::new();
                for (k, v) in map {
                    out.insert(k.as_str().into(), v.to_dynamic());
                }
                Dynamic::from_map(out)
            }
            ScriptValue::Fn(f) => Dynamic::from(f.clone()),
        }
    }

    /// Datum files are plain JSON; arrays load as lists.
    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => ScriptValue::Unit,
            Value::Bool(b) => ScriptValue::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => ScriptValue::Int(i),
                None => ScriptValue::Float(n.as_f64().unwrap_or(0.0)),
            },
            Value::String(s) => ScriptValue::Str(s.clone()),
            Value::Array(items) => ScriptValue::List(items.iter().map(ScriptValue::from_json).collect()),
            Value::Object(map) => ScriptValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), ScriptValue::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            ScriptValue::Unit => Value::Null,
            ScriptValue::Bool(b) => Value::Bool(*b),
            ScriptValue::Int(i) => Value::from(*i),
            ScriptValue::Float(f) => Value::from(*f),
            ScriptValue::Str(s) => Value::String(s.clone()),
            ScriptValue::Tuple(items) | ScriptValue::List(items) => {
                Value::Array(items.iter().map(ScriptValue::to_json).collect())
            }
            ScriptValue::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            ScriptValue::Fn(f) => Value::String(format!("Fn({})", f.fn_name())),
            ScriptValue::Opaque(name) => Value::String(format!("<{name}>")),
        }
    }
}

impl PartialEq for ScriptValue {
    fn eq(&self, other: &Self) -> bool {
        use ScriptValue::*;
        match (self, other) {
            (Unit, Unit) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a == b,
            (Str(a), Str(b)) => a == b,
            (Tuple(a), Tuple(b)) | (List(a), List(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            // Curried closures capture values we cannot compare.
            (Fn(a), Fn(b)) => {
                a.fn_name() == b.fn_name() && a.curry().is_empty() && b.curry().is_empty()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptValue::Unit => write!(f, "()"),
            ScriptValue::Bool(b) => write!(f, "{b}"),
            ScriptValue::Int(i) => write!(f, "{i}"),
            ScriptValue::Float(x) => write!(f, "{x:?}"),
            ScriptValue::Str(s) => write!(f, "{s:?}"),
            ScriptValue::Tuple(items) => {
                let mut t = f.debug_tuple("");
                for item in items {
                    t.field(item);
                }
                t.finish()
            }
            ScriptValue::List(items) => f.debug_list().entries(items).finish(),
            ScriptValue::Map(map) => f.debug_map().entries(map).finish(),
            ScriptValue::Fn(p) => write!(f, "Fn({})", p.fn_name()),
            ScriptValue::Opaque(name) => write!(f, "<{name}>"),
        }
    }
}

impl From<bool> for ScriptValue {
    fn from(v: bool) -> Self {
        ScriptValue::Bool(v)
    }
}

impl From<i64> for ScriptValue {
    fn from(v: i64) -> Self {
        ScriptValue::Int(v)
    }
}

impl From<f64> for ScriptValue {
    fn from(v: f64) -> Self {
        ScriptValue::Float(v)
    }
}

impl From<&str> for ScriptValue {
    fn from(v: &str) -> Self {
        ScriptValue::Str(v.to_string())
    }
}

impl From<FnPtr> for ScriptValue {
    fn from(v: FnPtr) -> Self {
        ScriptValue::Fn(v)
    }
}
