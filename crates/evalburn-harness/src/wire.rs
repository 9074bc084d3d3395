//! JSON encoding of [`Value`]s exchanged with the submission driver.
//!
//! Plain data maps onto JSON directly. Values JSON cannot hold travel as a
//! single-key object whose key is a reserved tag:
//!
//! - `{"__tree__": [[val, left, right], ...]}`: a tree as a flat node table,
//!   rows in breadth-first order with the root at index 0 and child slots
//!   holding row indices or `null`. Neither side recurses on tree depth.
//! - `{"__float__": "inf" | "-inf" | "nan"}`: a non-finite float.
//! - `{"__map__": {...}}`: a plain map whose only key happens to be a tag.

use std::collections::VecDeque;

use evalburn_core::{TreeNode, Value};
use serde_json::{json, Map, Value as Json};
use thiserror::Error;

pub const TREE_TAG: &str = "__tree__";
pub const FLOAT_TAG: &str = "__float__";
pub const MAP_TAG: &str = "__map__";

const RESERVED_TAGS: [&str; 3] = [TREE_TAG, FLOAT_TAG, MAP_TAG];

#[derive(Debug, Error, PartialEq)]
pub enum WireError {
    #[error("malformed tree row {0}")]
    MalformedRow(usize),
    #[error("tree row {row} links to invalid child {child}")]
    InvalidChild { row: usize, child: usize },
    #[error("malformed {0} payload")]
    MalformedTag(&'static str),
}

pub fn to_wire(value: &Value) -> Json {
    match value {
        Value::Tree(Some(root)) => json!({ TREE_TAG: tree_to_table(root) }),
        Value::Tree(None) => Json::Null,
        Value::Float(f) if !f.is_finite() => json!({ FLOAT_TAG: special_float_name(*f) }),
        Value::List(items) => Json::Array(items.iter().map(to_wire).collect()),
        Value::Map(map) => {
            let object: Map<String, Json> = map
                .iter()
                .map(|(k, v)| (k.clone(), to_wire(v)))
                .collect();
            match reserved_key(&object) {
                Some(_) => json!({ MAP_TAG: object }),
                None => Json::Object(object),
            }
        }
        scalar => scalar.to_json(),
    }
}

pub fn from_wire(json: Json) -> Result<Value, WireError> {
    match json {
        Json::Object(mut map) => match reserved_key(&map) {
            Some(tag) => {
                let payload = map.remove(tag).unwrap_or(Json::Null);
                from_tagged(tag, payload)
            }
            None => map_from_wire(map),
        },
        Json::Array(items) => items
            .into_iter()
            .map(from_wire)
            .collect::<Result<_, _>>()
            .map(Value::List),
        scalar => Ok(Value::from(scalar)),
    }
}

/// The tag of a single-key object keyed by a reserved name.
fn reserved_key(map: &Map<String, Json>) -> Option<&'static str> {
    if map.len() != 1 {
        return None;
    }
    let key = map.keys().next()?;
    RESERVED_TAGS.into_iter().find(|tag| *tag == key.as_str())
}

fn from_tagged(tag: &'static str, payload: Json) -> Result<Value, WireError> {
    match (tag, payload) {
        (TREE_TAG, Json::Array(rows)) => Ok(Value::Tree(tree_from_table(rows)?)),
        (FLOAT_TAG, Json::String(name)) => parse_special_float(&name)
            .map(Value::Float)
            .ok_or(WireError::MalformedTag(FLOAT_TAG)),
        (MAP_TAG, Json::Object(map)) => map_from_wire(map),
        _ => Err(WireError::MalformedTag(tag)),
    }
}

fn map_from_wire(map: Map<String, Json>) -> Result<Value, WireError> {
    map.into_iter()
        .map(|(k, v)| Ok((k, from_wire(v)?)))
        .collect::<Result<_, _>>()
        .map(Value::Map)
}

fn special_float_name(f: f64) -> &'static str {
    if f.is_nan() {
        "nan"
    } else if f > 0.0 {
        "inf"
    } else {
        "-inf"
    }
}

fn parse_special_float(name: &str) -> Option<f64> {
    match name {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

fn tree_to_table(root: &TreeNode) -> Json {
    let mut rows = Vec::new();
    let mut queue = VecDeque::from([root]);
    let mut next_index = 1usize;

    while let Some(node) = queue.pop_front() {
        let mut row = vec![to_wire(&node.val)];
        for child in [node.left.as_deref(), node.right.as_deref()] {
            match child {
                Some(child) => {
                    row.push(json!(next_index));
                    next_index += 1;
                    queue.push_back(child);
                }
                None => row.push(Json::Null),
            }
        }
        rows.push(Json::Array(row));
    }

    Json::Array(rows)
}

/// Rebuild a tree from its node table. Children must come after their parent
/// and belong to exactly one parent, which rules out shared nodes and cycles.
fn tree_from_table(rows: Vec<Json>) -> Result<Option<Box<TreeNode>>, WireError> {
    let mut links = Vec::with_capacity(rows.len());
    let mut slots = Vec::with_capacity(rows.len());

    for (index, row) in rows.into_iter().enumerate() {
        let Json::Array(cells) = row else {
            return Err(WireError::MalformedRow(index));
        };
        let [val, left, right]: [Json; 3] = cells
            .try_into()
            .map_err(|_| WireError::MalformedRow(index))?;
        links.push((child_index(index, left)?, child_index(index, right)?));
        slots.push(Some(Box::new(TreeNode::new(from_wire(val)?))));
    }

    for index in (0..slots.len()).rev() {
        let (left, right) = links[index];
        let left = take_child(&mut slots, index, left)?;
        let right = take_child(&mut slots, index, right)?;
        if let Some(node) = slots[index].as_mut() {
            node.left = left;
            node.right = right;
        }
    }

    Ok(slots.first_mut().and_then(Option::take))
}

fn child_index(row: usize, cell: Json) -> Result<Option<usize>, WireError> {
    match cell {
        Json::Null => Ok(None),
        Json::Number(n) => n
            .as_u64()
            .map(|i| Some(i as usize))
            .ok_or(WireError::MalformedRow(row)),
        _ => Err(WireError::MalformedRow(row)),
    }
}

fn take_child(
    slots: &mut [Option<Box<TreeNode>>],
    row: usize,
    child: Option<usize>,
) -> Result<Option<Box<TreeNode>>, WireError> {
    let Some(child) = child else {
        return Ok(None);
    };
    if child <= row {
        return Err(WireError::InvalidChild { row, child });
    }
    slots
        .get_mut(child)
        .and_then(Option::take)
        .map(Some)
        .ok_or(WireError::InvalidChild { row, child })
}
