/*!
Structural diff and patch over parsed document trees.

Both operations are pure functions over in-memory `serde_json::Value` trees;
they hold no state and need no synchronization. The delta format follows the
jsondiffpatch shape:

* `[new]` — a property or element that was added;
* `[old, new]` — a value that was replaced (type changes included);
* `[old, 0, 0]` — a property or element that was removed;
* `{ "<key>": <delta>, ... }` — an object with nested changes;
* `{ "_t": "a", "<i>": ..., "_<i>": ... }` — an array compared index-wise,
  with `"_<i>"` keys naming removals of base elements.

The `"_t"` property name is reserved: payload objects must not use it.

The engine guarantees `apply(base, diff(base, current)) == current` for every
pair of trees, and `diff(x, x)` is `None` (the "no update" signal).
Application is strict: every recorded old value is checked against the base,
and any mismatch or malformed delta fails with a patch error carrying the
document path — no partial result is ever returned.
*/

use serde_json::{Map, Value};

use crate::{ReliquaryError, Result};

/// Marker property identifying an array delta.
const ARRAY_MARKER: &str = "_t";

/// Compute the structural delta from `base` to `current`.
///
/// Returns `None` when the trees are semantically identical.
pub fn diff(base: &Value, current: &Value) -> Option<Value> {
    if base == current {
        return None;
    }
    Some(match (base, current) {
        (Value::Object(b), Value::Object(c)) => diff_objects(b, c),
        (Value::Array(b), Value::Array(c)) => diff_arrays(b, c),
        _ => Value::Array(vec![base.clone(), current.clone()]),
    })
}

fn diff_objects(base: &Map<String, Value>, current: &Map<String, Value>) -> Value {
    let mut delta = Map::new();
    for (key, base_value) in base {
        match current.get(key) {
            Some(current_value) => {
                if let Some(child) = diff(base_value, current_value) {
                    delta.insert(key.clone(), child);
                }
            }
            None => {
                delta.insert(key.clone(), deletion(base_value));
            }
        }
    }
    for (key, current_value) in current {
        if !base.contains_key(key) {
            delta.insert(key.clone(), Value::Array(vec![current_value.clone()]));
        }
    }
    Value::Object(delta)
}

// Index-wise comparison, no move detection: matching positions are diffed in
// place, surplus base elements become removals, surplus current elements
// become insertions.
fn diff_arrays(base: &[Value], current: &[Value]) -> Value {
    let mut delta = Map::new();
    delta.insert(ARRAY_MARKER.to_string(), Value::String("a".to_string()));
    let shared = base.len().min(current.len());
    for index in 0..shared {
        if let Some(child) = diff(&base[index], &current[index]) {
            delta.insert(index.to_string(), child);
        }
    }
    for (index, removed) in base.iter().enumerate().skip(shared) {
        delta.insert(format!("_{index}"), deletion(removed));
    }
    for (index, added) in current.iter().enumerate().skip(shared) {
        delta.insert(index.to_string(), Value::Array(vec![added.clone()]));
    }
    Value::Object(delta)
}

fn deletion(old: &Value) -> Value {
    Value::Array(vec![old.clone(), Value::from(0), Value::from(0)])
}

fn is_array_delta(delta: &Map<String, Value>) -> bool {
    matches!(delta.get(ARRAY_MARKER), Some(Value::String(t)) if t == "a")
}

fn is_zero(value: &Value) -> bool {
    matches!(value, Value::Number(n) if n.as_i64() == Some(0))
}

/// Deterministically reconstruct a document from `base` plus `patch`.
///
/// # Errors
/// `Patch` when the delta is malformed or does not match `base` (a recorded
/// old value differs, a removed key is absent, an added key already exists,
/// an index is out of range). No partial result is returned.
pub fn apply(base: &Value, patch: &Value) -> Result<Value> {
    apply_at(base, patch, "$")
}

fn apply_at(base: &Value, patch: &Value, path: &str) -> Result<Value> {
    match patch {
        Value::Object(delta) if is_array_delta(delta) => match base {
            Value::Array(items) => apply_array(items, delta, path),
            _ => Err(ReliquaryError::patch(path, "array delta against a non-array base")),
        },
        Value::Object(delta) => match base {
            Value::Object(map) => apply_object(map, delta, path),
            _ => Err(ReliquaryError::patch(
                path,
                "object delta against a non-object base",
            )),
        },
        Value::Array(parts) => replace_value(base, parts, path),
        _ => Err(ReliquaryError::patch(path, "malformed delta")),
    }
}

// A bare delta array at a position where the base already holds a value can
// only be a two-part replacement; additions and removals belong to the
// enclosing object or array delta.
fn replace_value(base: &Value, parts: &[Value], path: &str) -> Result<Value> {
    match parts {
        [old, new] => {
            if base != old {
                return Err(ReliquaryError::patch(
                    path,
                    "base value does not match the patch's recorded old value",
                ));
            }
            Ok(new.clone())
        }
        [_] => Err(ReliquaryError::patch(
            path,
            "addition delta where the base already holds a value",
        )),
        [_, _, _] => Err(ReliquaryError::patch(
            path,
            "removal delta outside an object or array context",
        )),
        _ => Err(ReliquaryError::patch(path, "malformed delta array")),
    }
}

fn apply_object(
    base: &Map<String, Value>,
    delta: &Map<String, Value>,
    path: &str,
) -> Result<Value> {
    let mut out = base.clone();
    for (key, child_delta) in delta {
        let child_path = format!("{path}/{key}");
        match child_delta {
            Value::Array(parts) => match parts.as_slice() {
                [new] => {
                    if out.contains_key(key) {
                        return Err(ReliquaryError::patch(
                            child_path,
                            "patch adds a property the base already has",
                        ));
                    }
                    out.insert(key.clone(), new.clone());
                }
                [old, new] => match out.get_mut(key) {
                    Some(slot) => {
                        if &*slot != old {
                            return Err(ReliquaryError::patch(
                                child_path,
                                "base value does not match the patch's recorded old value",
                            ));
                        }
                        *slot = new.clone();
                    }
                    None => {
                        return Err(ReliquaryError::patch(
                            child_path,
                            "patch replaces a property the base does not have",
                        ));
                    }
                },
                [old, z1, z2] => {
                    if !is_zero(z1) || !is_zero(z2) {
                        return Err(ReliquaryError::patch(child_path, "malformed removal delta"));
                    }
                    match out.remove(key) {
                        Some(previous) => {
                            if &previous != old {
                                return Err(ReliquaryError::patch(
                                    child_path,
                                    "base value does not match the patch's recorded old value",
                                ));
                            }
                        }
                        None => {
                            return Err(ReliquaryError::patch(
                                child_path,
                                "patch removes a property the base does not have",
                            ));
                        }
                    }
                }
                _ => return Err(ReliquaryError::patch(child_path, "malformed delta array")),
            },
            Value::Object(_) => match out.get_mut(key) {
                Some(child) => {
                    let replacement = apply_at(child, child_delta, &child_path)?;
                    *child = replacement;
                }
                None => {
                    return Err(ReliquaryError::patch(
                        child_path,
                        "nested delta for a property the base does not have",
                    ));
                }
            },
            _ => return Err(ReliquaryError::patch(child_path, "malformed delta")),
        }
    }
    Ok(Value::Object(out))
}

fn apply_array(base: &[Value], delta: &Map<String, Value>, path: &str) -> Result<Value> {
    let mut removals: Vec<(usize, &Value)> = Vec::new();
    let mut insertions: Vec<(usize, &Value)> = Vec::new();
    let mut changes: Vec<(usize, &Value)> = Vec::new();

    for (key, child_delta) in delta {
        if key == ARRAY_MARKER {
            continue;
        }
        if let Some(raw_index) = key.strip_prefix('_') {
            let index = parse_index(raw_index, path)?;
            let parts = child_delta.as_array();
            match parts.map(Vec::as_slice) {
                Some([old, z1, z2]) if is_zero(z1) && is_zero(z2) => {
                    removals.push((index, old));
                }
                _ => {
                    return Err(ReliquaryError::patch(
                        format!("{path}/{key}"),
                        "malformed array removal delta",
                    ));
                }
            }
        } else {
            let index = parse_index(key, path)?;
            match child_delta {
                Value::Array(parts) if parts.len() == 1 => insertions.push((index, &parts[0])),
                other => changes.push((index, other)),
            }
        }
    }

    let mut out = base.to_vec();

    // Removals run from the highest index down so earlier removals do not
    // shift the positions of later ones.
    removals.sort_by(|a, b| b.0.cmp(&a.0));
    for (index, old) in removals {
        let child_path = format!("{path}/_{index}");
        if index >= out.len() {
            return Err(ReliquaryError::patch(child_path, "removal index out of range"));
        }
        if &out[index] != old {
            return Err(ReliquaryError::patch(
                child_path,
                "base element does not match the patch's recorded old value",
            ));
        }
        out.remove(index);
    }

    for (index, child_delta) in changes {
        let child_path = format!("{path}/{index}");
        if index >= out.len() {
            return Err(ReliquaryError::patch(child_path, "change index out of range"));
        }
        out[index] = apply_at(&out[index], child_delta, &child_path)?;
    }

    insertions.sort_by_key(|(index, _)| *index);
    for (index, new) in insertions {
        let child_path = format!("{path}/{index}");
        if index > out.len() {
            return Err(ReliquaryError::patch(child_path, "insertion index out of range"));
        }
        out.insert(index, new.clone());
    }

    Ok(Value::Array(out))
}

fn parse_index(raw: &str, path: &str) -> Result<usize> {
    raw.parse::<usize>().map_err(|_| {
        ReliquaryError::patch(path, format!("malformed array delta key `{raw}`"))
    })
}
