//! node/snapshot — узлы обратно в JSON.
//!
//! `Serialize` пишет напрямую из дерева (без промежуточного Value), его
//! использует saver под эксклюзивным gate. `node_to_json` — глубокая копия
//! для вызывающего кода и тестов.

use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use serde_json::{Map, Value};

use super::{Entry, Node, NodeData};

pub(super) fn node_to_json(node: &Node) -> Value {
    match &*node.lock() {
        NodeData::Record(m) => {
            let mut out = Map::with_capacity(m.len());
            for (k, e) in m {
                out.insert(k.clone(), e.to_json());
            }
            Value::Object(out)
        }
        NodeData::Sequence(v) => Value::Array(v.iter().map(Entry::to_json).collect()),
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Entry::Scalar(v) => v.serialize(serializer),
            Entry::Node(n) => n.serialize(serializer),
        }
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &*self.lock() {
            NodeData::Record(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, e) in m {
                    map.serialize_entry(k, e)?;
                }
                map.end()
            }
            NodeData::Sequence(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for e in v {
                    seq.serialize_element(e)?;
                }
                seq.end()
            }
        }
    }
}
