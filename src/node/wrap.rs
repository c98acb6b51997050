//! node/wrap — рекурсивное оборачивание JSON-значений в узлы.
//!
//! Вызывается в двух местах:
//! - при загрузке файла (весь декодированный корень);
//! - при присваивании (новое значение целиком, до вставки в дерево).
//! После этого в дереве не остаётся «сырых» массивов/объектов.

use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

use super::tracker::Tracker;
use super::{Entry, Node, NodeData};

pub(crate) fn wrap_value(tracker: &Arc<Tracker>, value: Value) -> Entry {
    match value {
        Value::Array(items) => {
            let items = items.into_iter().map(|v| wrap_value(tracker, v)).collect();
            Entry::Node(Node::from_data(tracker, NodeData::Sequence(items)))
        }
        Value::Object(map) => {
            let mut fields = IndexMap::with_capacity(map.len());
            for (k, v) in map {
                fields.insert(k, wrap_value(tracker, v));
            }
            Entry::Node(Node::from_data(tracker, NodeData::Record(fields)))
        }
        scalar => Entry::Scalar(scalar),
    }
}

/// Wrap a decoded root. Returns None for a scalar root.
pub(crate) fn wrap_root(tracker: &Arc<Tracker>, value: Value) -> Option<Node> {
    wrap_value(tracker, value).into_node()
}
