//! Local mirror of the listened-to subtree.
//!
//! The stream describes changes as `put` (replace the node at a path) and
//! `patch` (replace several children of a path). Both are applied here so
//! the listener can hand out a complete snapshot after every event.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::warn;

/// Payload of `put` and `patch` events.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StreamPayload {
    /// Path relative to the listened-to location, `/` for the root.
    pub path: String,
    /// New value (`put`) or children to replace (`patch`).
    #[serde(default)]
    pub data: Value,
}

/// JSON tree rebuilt from stream events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemoteTree {
    root: Value,
}

impl RemoteTree {
    /// Empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current root value (`null` when empty).
    #[must_use]
    pub const fn root(&self) -> &Value {
        &self.root
    }

    /// Replace the node at `path`; `null` or `{}` deletes it.
    pub fn put(&mut self, path: &str, data: Value) {
        let segments = segments(path);
        if is_empty_node(&data) {
            remove_at(&mut self.root, &segments);
        } else {
            set_at(&mut self.root, &segments, data);
        }
    }

    /// Replace each child of `data` below `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            warn!(%path, "Ignoring patch whose data is not an object");
            return;
        };
        let base = path.trim_end_matches('/');
        for (key, value) in children {
            self.put(&format!("{base}/{key}"), value);
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}

fn is_empty_node(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn set_at(node: &mut Value, segments: &[&str], data: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = data;
        return;
    };
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let child = map.entry((*first).to_owned()).or_insert(Value::Null);
        set_at(child, rest, data);
    }
}

fn remove_at(node: &mut Value, segments: &[&str]) {
    let Some((first, rest)) = segments.split_first() else {
        *node = Value::Null;
        return;
    };
    let Value::Object(map) = node else {
        return;
    };
    if rest.is_empty() {
        map.remove(*first);
    } else if let Some(child) = map.get_mut(*first) {
        remove_at(child, rest);
        if is_empty_node(child) {
            map.remove(*first);
        }
    }
    if map.is_empty() {
        *node = Value::Null;
    }
}
