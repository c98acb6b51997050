//! node — инструментированное дерево данных (interception layer).
//!
//! Разделение по подмодулям:
//! - tracker.rs  — dirty flag сессии и gate для атомарного снимка
//! - wrap.rs     — рекурсивное оборачивание JSON в узлы (load / assign)
//! - snapshot.rs — обратное преобразование: to_json + Serialize для записи
//! - pointer.rs  — JSON Pointer (RFC 6901) для навигации
//!
//! A `Node` is a shared handle: clones point at the same storage, so a handle
//! obtained from the tree stays instrumented for as long as it lives. Every
//! structured value stored in a node is itself a `Node` created by `wrap`.

pub(crate) mod tracker;
pub(crate) mod wrap;
mod snapshot;
pub mod pointer;

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{CacheError, Result};
use tracker::Tracker;

/// Address of a child inside a node.
///
/// Records accept `Index(i)` as the field `"i"`; sequences accept a `Field`
/// only when it is a canonical decimal index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Field(String),
    Index(usize),
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Field(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Field(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Field(s.clone())
    }
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Field(s) => write!(f, "{s:?}"),
            Key::Index(i) => write!(f, "{i}"),
        }
    }
}

impl Key {
    fn as_index(&self) -> Option<usize> {
        match self {
            Key::Index(i) => Some(*i),
            Key::Field(s) => s.parse::<usize>().ok().filter(|i| i.to_string() == *s),
        }
    }

    fn into_field(self) -> String {
        match self {
            Key::Field(s) => s,
            Key::Index(i) => i.to_string(),
        }
    }

    fn field_ref(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Key::Field(s) => std::borrow::Cow::Borrowed(s.as_str()),
            Key::Index(i) => std::borrow::Cow::Owned(i.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Record,
    Sequence,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Record => "record",
            NodeKind::Sequence => "sequence",
        }
    }
}

/// A value stored in a node: a scalar (null/bool/number/string) or a child node.
#[derive(Clone)]
pub enum Entry {
    Scalar(Value),
    Node(Node),
}

impl Entry {
    pub fn is_node(&self) -> bool {
        matches!(self, Entry::Node(_))
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Entry::Node(n) => Some(n),
            Entry::Scalar(_) => None,
        }
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            Entry::Node(n) => Some(n),
            Entry::Scalar(_) => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Entry::Scalar(v) => Some(v),
            Entry::Node(_) => None,
        }
    }

    /// Deep copy as plain JSON.
    pub fn to_json(&self) -> Value {
        match self {
            Entry::Scalar(v) => v.clone(),
            Entry::Node(n) => n.to_json(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Scalar(v) => write!(f, "Scalar({v})"),
            Entry::Node(n) => write!(f, "Node({})", n.to_json()),
        }
    }
}

pub(crate) enum NodeData {
    Record(IndexMap<String, Entry>),
    Sequence(Vec<Entry>),
}

impl NodeData {
    fn kind(&self) -> NodeKind {
        match self {
            NodeData::Record(_) => NodeKind::Record,
            NodeData::Sequence(_) => NodeKind::Sequence,
        }
    }

    fn get(&self, key: &Key) -> Option<&Entry> {
        match self {
            NodeData::Record(m) => m.get(&*key.field_ref()),
            NodeData::Sequence(v) => key.as_index().and_then(|i| v.get(i)),
        }
    }

    fn set(&mut self, key: Key, entry: Entry) -> Result<()> {
        match self {
            NodeData::Record(m) => {
                m.insert(key.into_field(), entry);
            }
            NodeData::Sequence(v) => {
                let i = key.as_index().ok_or_else(|| key_kind(&key, NodeKind::Sequence))?;
                if i < v.len() {
                    v[i] = entry;
                } else {
                    pad_to(v, i).ok_or_else(|| key_kind(&key, NodeKind::Sequence))?;
                    v.push(entry);
                }
            }
        }
        Ok(())
    }

    fn remove(&mut self, key: &Key) -> Option<Entry> {
        match self {
            NodeData::Record(m) => m.shift_remove(&*key.field_ref()),
            NodeData::Sequence(v) => match key.as_index() {
                Some(i) if i < v.len() => Some(v.remove(i)),
                _ => None,
            },
        }
    }

    fn len(&self) -> usize {
        match self {
            NodeData::Record(m) => m.len(),
            NodeData::Sequence(v) => v.len(),
        }
    }
}

/// Most `null` slots a single write past the end of a sequence may add.
pub const MAX_SEQUENCE_GAP: usize = 1 << 20;

/// Grow `v` to `len` with nulls (holes serialize as null).
/// None if that would add more than `MAX_SEQUENCE_GAP` slots.
fn pad_to(v: &mut Vec<Entry>, len: usize) -> Option<()> {
    if len - v.len() > MAX_SEQUENCE_GAP {
        return None;
    }
    v.resize(len, Entry::Scalar(Value::Null));
    Some(())
}

fn key_kind(key: &Key, kind: NodeKind) -> CacheError {
    CacheError::KeyKind {
        key: key.to_string(),
        kind: kind.as_str(),
    }
}

struct NodeInner {
    kind: NodeKind,
    tracker: Arc<Tracker>,
    data: Mutex<NodeData>,
}

/// Shared, instrumented view over a record or a sequence.
#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub(crate) fn from_data(tracker: &Arc<Tracker>, data: NodeData) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                kind: data.kind(),
                tracker: tracker.clone(),
                data: Mutex::new(data),
            }),
        }
    }

    pub(crate) fn empty_record(tracker: &Arc<Tracker>) -> Self {
        Self::from_data(tracker, NodeData::Record(IndexMap::new()))
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, NodeData> {
        self.inner.data.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn kind(&self) -> NodeKind {
        self.inner.kind
    }

    pub fn is_record(&self) -> bool {
        self.inner.kind == NodeKind::Record
    }

    pub fn is_sequence(&self) -> bool {
        self.inner.kind == NodeKind::Sequence
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same storage (identity), not structural equality.
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------- reads --------

    pub fn get(&self, key: impl Into<Key>) -> Option<Entry> {
        self.lock().get(&key.into()).cloned()
    }

    /// Read a child and copy it out as plain JSON.
    pub fn get_json(&self, key: impl Into<Key>) -> Option<Value> {
        self.get(key).map(|e| e.to_json())
    }

    /// Read a child that is expected to be a node.
    pub fn child(&self, key: impl Into<Key>) -> Option<Node> {
        self.get(key).and_then(Entry::into_node)
    }

    pub fn contains(&self, key: impl Into<Key>) -> bool {
        self.lock().get(&key.into()).is_some()
    }

    pub fn keys(&self) -> Vec<Key> {
        match &*self.lock() {
            NodeData::Record(m) => m.keys().cloned().map(Key::Field).collect(),
            NodeData::Sequence(v) => (0..v.len()).map(Key::Index).collect(),
        }
    }

    /// Walk several levels down; the empty path yields this node.
    pub fn get_path(&self, path: &[Key]) -> Option<Entry> {
        let mut cur = Entry::Node(self.clone());
        for key in path {
            cur = cur.as_node()?.get(key.clone())?;
        }
        Some(cur)
    }

    /// Walk by JSON Pointer, e.g. `/a/0/b`.
    pub fn get_pointer(&self, pointer: &str) -> Result<Option<Entry>> {
        let path = pointer::parse_pointer(pointer)?;
        Ok(self.get_path(&path))
    }

    // -------- writes --------

    /// Store a value; arrays and objects are wrapped into nodes before they
    /// are attached. Sequences grow when `key` is past the end, by at most
    /// `MAX_SEQUENCE_GAP` nulls; a farther index is a `KeyKind` error.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        if self.is_sequence() && key.as_index().is_none() {
            return Err(key_kind(&key, NodeKind::Sequence));
        }
        let entry = wrap::wrap_value(&self.inner.tracker, value.into());
        self.inner.tracker.try_mutate(|| self.lock().set(key, entry))
    }

    /// Append to a sequence.
    pub fn push(&self, value: impl Into<Value>) -> Result<()> {
        if !self.is_sequence() {
            return Err(CacheError::KeyKind {
                key: "push".into(),
                kind: NodeKind::Record.as_str(),
            });
        }
        let entry = wrap::wrap_value(&self.inner.tracker, value.into());
        self.inner.tracker.mutate(|| {
            if let NodeData::Sequence(v) = &mut *self.lock() {
                v.push(entry);
            }
        });
        Ok(())
    }

    /// Insert into a sequence, shifting later elements up.
    pub fn insert(&self, index: usize, value: impl Into<Value>) -> Result<()> {
        if !self.is_sequence() {
            return Err(key_kind(&Key::Index(index), NodeKind::Record));
        }
        let entry = wrap::wrap_value(&self.inner.tracker, value.into());
        self.inner.tracker.try_mutate(|| -> Result<()> {
            if let NodeData::Sequence(v) = &mut *self.lock() {
                if index <= v.len() {
                    v.insert(index, entry);
                } else {
                    pad_to(v, index)
                        .ok_or_else(|| key_kind(&Key::Index(index), NodeKind::Sequence))?;
                    v.push(entry);
                }
            }
            Ok(())
        })
    }

    /// Delete a key, or a sequence element with later elements shifted down.
    /// Marks the session dirty even when nothing was there.
    pub fn remove(&self, key: impl Into<Key>) -> Option<Entry> {
        let key = key.into();
        self.inner.tracker.mutate(|| self.lock().remove(&key))
    }

    pub fn clear(&self) {
        self.inner.tracker.mutate(|| match &mut *self.lock() {
            NodeData::Record(m) => m.clear(),
            NodeData::Sequence(v) => v.clear(),
        })
    }

    /// Deep copy as plain JSON.
    pub fn to_json(&self) -> Value {
        snapshot::node_to_json(self)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn detached(v: Value) -> (Arc<Tracker>, Node) {
        let t = Tracker::new();
        let n = wrap::wrap_root(&t, v).expect("structured root");
        (t, n)
    }

    #[test]
    fn assigned_structures_come_back_as_nodes() {
        let (t, root) = detached(json!({}));
        root.set("a", json!([1, 2, {"b": 3}])).unwrap();
        assert!(t.is_dirty());

        let a = root.child("a").expect("a is a node");
        assert!(a.is_sequence());
        let inner = a.child(2usize).expect("nested record is a node");
        assert_eq!(inner.get_json("b"), Some(json!(3)));
        assert_eq!(root.to_json(), json!({"a": [1, 2, {"b": 3}]}));
    }

    #[test]
    fn handles_share_identity_with_the_tree() {
        let (t, root) = detached(json!({"list": [1]}));
        let first = root.child("list").unwrap();
        let second = root.child("list").unwrap();
        assert!(first.ptr_eq(&second));

        assert!(!t.is_dirty());
        first.push(2).unwrap();
        assert!(t.is_dirty());
        assert_eq!(root.get_json("list"), Some(json!([1, 2])));
    }

    #[test]
    fn sequence_remove_shifts_later_elements() {
        let (_t, root) = detached(json!(["a", "b", "c", "d"]));
        let removed = root.remove(1usize).unwrap();
        assert_eq!(removed.to_json(), json!("b"));
        assert_eq!(root.to_json(), json!(["a", "c", "d"]));
        assert!(root.remove(10usize).is_none());
    }

    #[test]
    fn record_remove_keeps_order_and_always_marks_dirty() {
        let (t, root) = detached(json!({"x": 1, "y": 2, "z": 3}));
        root.remove("y");
        assert_eq!(
            root.keys(),
            vec![Key::Field("x".into()), Key::Field("z".into())]
        );

        t.snapshot_if_dirty(|| ());
        assert!(root.remove("missing").is_none());
        assert!(t.is_dirty());
    }

    #[test]
    fn set_past_end_pads_with_null() {
        let (_t, root) = detached(json!([1]));
        root.set(3usize, "x").unwrap();
        assert_eq!(root.to_json(), json!([1, null, null, "x"]));
    }

    #[test]
    fn far_index_is_rejected_without_growing() {
        let (t, root) = detached(json!([]));
        let err = root.set("18446744073709551615", 1).unwrap_err();
        assert!(matches!(err, CacheError::KeyKind { .. }));
        assert!(root.set(1usize << 40, 1).is_err());
        assert!(root.insert(usize::MAX, 1).is_err());
        assert!(root.is_empty());
        assert!(!t.is_dirty());

        root.set(MAX_SEQUENCE_GAP, true).unwrap();
        assert_eq!(root.len(), MAX_SEQUENCE_GAP + 1);
        assert_eq!(root.get_json(0usize), Some(Value::Null));
    }

    #[test]
    fn key_kinds_are_normalized() {
        let (_t, root) = detached(json!({"0": "zero"}));
        assert_eq!(root.get_json(0usize), Some(json!("zero")));

        let (t, seq) = detached(json!([10, 20]));
        assert_eq!(seq.get_json("1"), Some(json!(20)));
        assert!(seq.get("01").is_none());
        assert!(seq.get("name").is_none());

        let err = seq.set("name", 1).unwrap_err();
        assert!(matches!(err, CacheError::KeyKind { .. }));
        assert!(!t.is_dirty(), "failed write must not mark dirty");
    }

    #[test]
    fn contains_reflects_current_state() {
        let (_t, root) = detached(json!({"k": null}));
        assert!(root.contains("k"));
        root.remove("k");
        assert!(!root.contains("k"));
    }

    #[test]
    fn pointer_navigation() {
        let (_t, root) = detached(json!({"a": [{"b/c": 5}]}));
        let e = root.get_pointer("/a/0/b~1c").unwrap().unwrap();
        assert_eq!(e.to_json(), json!(5));
        assert!(root.get_pointer("/a/1").unwrap().is_none());
        let whole = root.get_pointer("").unwrap().unwrap();
        assert!(whole.as_node().unwrap().ptr_eq(&root));
    }

    #[test]
    fn insert_and_clear() {
        let (_t, seq) = detached(json!([1, 3]));
        seq.insert(1, 2).unwrap();
        assert_eq!(seq.to_json(), json!([1, 2, 3]));
        seq.clear();
        assert!(seq.is_empty());

        let (_t, rec) = detached(json!({}));
        assert!(rec.push(1).is_err());
        assert!(rec.insert(0, 1).is_err());
    }

    #[test]
    fn removed_node_stays_instrumented() {
        let (t, root) = detached(json!({"sub": {"k": 1}}));
        let sub = root.remove("sub").and_then(Entry::into_node).unwrap();
        t.snapshot_if_dirty(|| ());
        sub.set("k", 2).unwrap();
        assert!(t.is_dirty());
        assert_eq!(root.to_json(), json!({}));
    }
}
