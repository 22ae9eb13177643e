//! Typed extraction from loosely-typed script values.
//!
//! Every function here either produces the requested type or fails with a
//! usage error naming what was wrong. Nothing is coerced beyond int -> float.

use glam::Vec3;

use crate::control::Color;
use crate::error::{HookError, HookResult};
use crate::script_value::{Options, ScriptValue};

/// Conversion of a single script value into a strict Rust type.
pub trait FromScriptValue: Sized {
    fn from_script_value(value: &ScriptValue) -> Option<Self>;
}

impl FromScriptValue for f32 {
    fn from_script_value(value: &ScriptValue) -> Option<Self> {
        value.as_f64().map(|f| f as f32)
    }
}

impl FromScriptValue for f64 {
    fn from_script_value(value: &ScriptValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromScriptValue for i64 {
    fn from_script_value(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Int(i) => Some(*i),
            _ => None,
        }
    }
}

impl FromScriptValue for bool {
    fn from_script_value(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// The items of a fixed-size group; only matches tuples.
#[derive(Debug, Clone, PartialEq)]
pub struct TupleItems(pub Vec<ScriptValue>);

impl FromScriptValue for TupleItems {
    fn from_script_value(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::Tuple(items) => Some(TupleItems(items.clone())),
            _ => None,
        }
    }
}

/// The items of a variable-length list; only matches lists.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItems(pub Vec<ScriptValue>);

impl FromScriptValue for ListItems {
    fn from_script_value(value: &ScriptValue) -> Option<Self> {
        match value {
            ScriptValue::List(items) => Some(ListItems(items.clone())),
            _ => None,
        }
    }
}

fn extract_items<T: FromScriptValue>(items: &[ScriptValue]) -> HookResult<Vec<T>> {
    items
        .iter()
        .map(|item| {
            T::from_script_value(item)
                .ok_or_else(|| HookError::usage("Failed to extract data from object"))
        })
        .collect()
}

/// Extract every element of a tuple or list as `T`.
pub fn extract_sequence<T: FromScriptValue>(value: &ScriptValue) -> HookResult<Vec<T>> {
    match value {
        ScriptValue::Tuple(items) | ScriptValue::List(items) => extract_items(items),
        _ => Err(HookError::usage("Input must be a list or a tuple")),
    }
}

fn vector_from_items(items: &[ScriptValue]) -> HookResult<Vec3> {
    let v: Vec<f32> = extract_items(items)?;
    if v.len() != 3 {
        return Err(HookError::usage("Position data must have three terms"));
    }
    Ok(Vec3::new(v[0], v[1], v[2]))
}

/// Extract a sequence of 3D positions.
///
/// The outer value is first read as a sequence of tuples, then as a sequence
/// of lists. Only a failure of the outer shape triggers the fallback: once a
/// shape matches, a non-numeric or wrongly sized entry is reported as is.
pub fn extract_vectors(value: &ScriptValue) -> HookResult<Vec<Vec3>> {
    if let Ok(tuples) = extract_sequence::<TupleItems>(value) {
        return tuples.iter().map(|t| vector_from_items(&t.0)).collect();
    }

    if let Ok(lists) = extract_sequence::<ListItems>(value) {
        return lists.iter().map(|l| vector_from_items(&l.0)).collect();
    }

    Err(HookError::usage(
        "Position data must be a list of 3-element lists",
    ))
}

/// Extract a positional coordinate, naming the axis on failure.
pub fn coordinate(value: &ScriptValue, axis: &str) -> HookResult<f32> {
    f32::from_script_value(value)
        .ok_or_else(|| HookError::usage(format!("{axis} value must be a number")))
}

/// Read an optional number from `options`, keeping `prior` when absent.
pub fn option_f32(options: &Options, key: &str, prior: f32) -> HookResult<f32> {
    match options.get(key) {
        Some(value) => f32::from_script_value(value)
            .ok_or_else(|| HookError::usage(format!("{key} value must be a number"))),
        None => Ok(prior),
    }
}

/// Read an optional boolean from `options`, keeping `prior` when absent.
pub fn option_bool(options: &Options, key: &str, prior: bool) -> HookResult<bool> {
    match options.get(key) {
        Some(value) => bool::from_script_value(value)
            .ok_or_else(|| HookError::usage(format!("{key} value must be a boolean"))),
        None => Ok(prior),
    }
}

/// Read an optional RGB triple under `color`, keeping `prior` when absent.
pub fn option_color(options: &Options, prior: Color) -> HookResult<Color> {
    let Some(value) = options.get("color") else {
        return Ok(prior);
    };

    let rgb: Vec<i64> = extract_sequence(value)?;
    if rgb.len() != 3 {
        return Err(HookError::usage("color tuple must have three values"));
    }

    let channel = |c: i64| {
        u8::try_from(c).map_err(|_| HookError::usage("color values must be between 0 and 255"))
    };
    Ok(Color::new(channel(rgb[0])?, channel(rgb[1])?, channel(rgb[2])?))
}
