//! Path-by-path diff of two JSON snapshots.
//!
//! Rows come out in a deterministic order: object keys sorted, arrays by
//! index up to the longer side. Containers present on both sides with the
//! same shape are descended into; everything else is summarized in one row.

use std::collections::BTreeSet;

use serde_json::Map;
use serde_json::Value;

const MAX_STRING_SUMMARY: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonChange {
    Added,
    Removed,
    Changed,
    Unchanged,
}

impl JsonChange {
    pub fn label(self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Changed => "changed",
            Self::Unchanged => "unchanged",
        }
    }

    /// The classification seen from the other side of the diff.
    pub fn mirrored(self) -> Self {
        match self {
            Self::Added => Self::Removed,
            Self::Removed => Self::Added,
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonDiffRow {
    pub path: String,
    pub key: String,
    pub depth: usize,
    pub change: JsonChange,
    pub summary: String,
}

pub fn diff_json(before: Option<&Value>, after: Option<&Value>) -> Vec<JsonDiffRow> {
    let mut rows = Vec::new();
    match (before, after) {
        (None, None) => {}
        (Some(Value::Object(b)), Some(Value::Object(a))) => walk_object(&mut rows, "", 0, b, a),
        (Some(Value::Array(b)), Some(Value::Array(a))) => walk_array(&mut rows, "", 0, b, a),
        _ => visit(&mut rows, "$".to_string(), "$".to_string(), 0, before, after),
    }
    rows
}

fn walk_object(
    rows: &mut Vec<JsonDiffRow>,
    parent: &str,
    depth: usize,
    before: &Map<String, Value>,
    after: &Map<String, Value>,
) {
    let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    for key in keys {
        let path = if parent.is_empty() {
            key.clone()
        } else {
            format!("{parent}.{key}")
        };
        visit(rows, path, key.clone(), depth, before.get(key), after.get(key));
    }
}

fn walk_array(
    rows: &mut Vec<JsonDiffRow>,
    parent: &str,
    depth: usize,
    before: &[Value],
    after: &[Value],
) {
    for index in 0..before.len().max(after.len()) {
        let key = format!("[{index}]");
        let path = format!("{parent}{key}");
        visit(rows, path, key, depth, before.get(index), after.get(index));
    }
}

fn visit(
    rows: &mut Vec<JsonDiffRow>,
    path: String,
    key: String,
    depth: usize,
    before: Option<&Value>,
    after: Option<&Value>,
) {
    let (change, summary) = match (before, after) {
        (None, None) => return,
        (None, Some(value)) => (JsonChange::Added, summarize(value)),
        (Some(value), None) => (JsonChange::Removed, summarize(value)),
        (Some(b), Some(a)) if json_equal(b, a) => (JsonChange::Unchanged, summarize(a)),
        (Some(b), Some(a)) => (
            JsonChange::Changed,
            format!("{} → {}", summarize(b), summarize(a)),
        ),
    };
    rows.push(JsonDiffRow {
        path: path.clone(),
        key,
        depth,
        change,
        summary,
    });

    match (before, after) {
        (Some(Value::Object(b)), Some(Value::Object(a))) => {
            walk_object(rows, &path, depth + 1, b, a)
        }
        (Some(Value::Array(b)), Some(Value::Array(a))) => walk_array(rows, &path, depth + 1, b, a),
        _ => {}
    }
}

/// Key-order independent equality; numbers compare by value so `1` equals `1.0`.
pub fn json_equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(l), Value::Bool(r)) => l == r,
        (Value::String(l), Value::String(r)) => l == r,
        (Value::Number(l), Value::Number(r)) => {
            if l == r {
                return true;
            }
            match (l.as_f64(), r.as_f64()) {
                (Some(l), Some(r)) => l == r,
                _ => false,
            }
        }
        (Value::Array(l), Value::Array(r)) => {
            l.len() == r.len() && l.iter().zip(r).all(|(l, r)| json_equal(l, r))
        }
        (Value::Object(l), Value::Object(r)) => {
            l.len() == r.len()
                && l
                    .iter()
                    .all(|(key, value)| r.get(key).is_some_and(|other| json_equal(value, other)))
        }
        _ => false,
    }
}

/// Short display value: scalars verbatim, composites as counts.
pub fn summarize(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::String(text) => {
            if text.chars().count() > MAX_STRING_SUMMARY {
                let clipped: String = text.chars().take(MAX_STRING_SUMMARY).collect();
                format!("\"{clipped}…\"")
            } else {
                format!("\"{text}\"")
            }
        }
        Value::Array(items) => match items.len() {
            1 => "[1 item]".to_string(),
            count => format!("[{count} items]"),
        },
        Value::Object(map) => match map.len() {
            1 => "{1 key}".to_string(),
            count => format!("{{{count} keys}}"),
        },
    }
}
