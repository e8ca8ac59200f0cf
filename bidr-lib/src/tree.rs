//! The decoded value tree.
//!
//! Nodes live in an arena owned by [Tree] and are addressed by [NodeId]. Each node keeps
//! a back-reference to its parent, while a parent refers to its children through its
//! container value ([Value::Fields] or [Value::Items]).
use std::borrow::Cow;
use std::fmt::Display;
use std::ops::Index;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::flatten::Plain;

/// Index of a node within its [Tree].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub fn as_usize(self) -> usize {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The byte range a decoded value occupied, relative to the start of the decode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Provenance {
    /// Offset of the first byte
    pub start: usize,
    /// Number of bytes consumed
    pub len: usize,
}

impl Provenance {
    /// Offset of the last byte consumed, or `None` for a zero-length field.
    #[must_use]
    pub fn end(&self) -> Option<usize> {
        (self.start + self.len).checked_sub(1).filter(|_| self.len > 0)
    }
}

/// How a node is addressed from its parent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Root,
    Name(Arc<str>),
    Index(usize),
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Root => Ok(()),
            Key::Name(name) => write!(f, "{name}"),
            Key::Index(idx) => write!(f, "{idx}"),
        }
    }
}

/// Value held by a tree node.
#[derive(Clone, Debug, PartialEq)]
pub enum Value<'a> {
    /// Created but not yet decoded
    Pending,
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    /// Named children of a group, in declaration order.
    Fields(IndexMap<Arc<str>, NodeId>),
    /// Positional children of a sequence.
    Items(Vec<NodeId>),
    /// A container produced by a custom decoder. Its contents are opaque to the engine.
    Opaque(Plain<'a>),
}

impl<'a> Value<'a> {
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Value::Pending)
    }

    /// Integer values as `u64`; negative values are `None`.
    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Unsigned(x) => Some(*x),
            Value::Signed(x) => u64::try_from(*x).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Unsigned(x) => i64::try_from(*x).ok(),
            Value::Signed(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_usize(&self) -> Option<usize> {
        self.as_u64().and_then(|x| usize::try_from(x).ok())
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }
}

/// A single decoded position.
#[derive(Clone, Debug)]
pub struct Node<'a> {
    value: Value<'a>,
    parent: Option<NodeId>,
    key: Key,
    structural: bool,
    provenance: Option<Provenance>,
}

impl<'a> Node<'a> {
    fn new(parent: Option<NodeId>, key: Key) -> Self {
        Node {
            value: Value::Pending,
            parent,
            key,
            structural: false,
            provenance: None,
        }
    }

    #[must_use]
    pub fn value(&self) -> &Value<'a> {
        &self.value
    }

    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    #[must_use]
    pub fn key(&self) -> &Key {
        &self.key
    }

    /// True if this node's container shape comes from a group or sequence descriptor.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        self.structural
    }

    /// Byte range consumed to produce this node's value. Only set for nodes filled by a
    /// byte-consuming decoder; see [Tree::extent] for groups and sequences.
    #[must_use]
    pub fn provenance(&self) -> Option<Provenance> {
        self.provenance
    }
}

/// Arena of decoded nodes rooted at [Tree::root].
#[derive(Clone, Debug)]
pub struct Tree<'a> {
    nodes: Vec<Node<'a>>,
}

impl<'a> Default for Tree<'a> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Index<NodeId> for Tree<'a> {
    type Output = Node<'a>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}

impl<'a> Tree<'a> {
    /// A tree with a single pending root node.
    #[must_use]
    pub fn new() -> Self {
        Tree {
            nodes: vec![Node::new(None, Key::Root)],
        }
    }

    /// A tree whose root holds `value`; useful for custom decoders and resolvers
    /// under test.
    #[must_use]
    pub fn with_value(value: Value<'a>) -> Self {
        let mut tree = Self::new();
        tree.nodes[0].value = value;
        tree
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes in the arena, never zero.
    #[allow(clippy::len_without_is_empty)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node<'a>> {
        self.nodes.get(id.0)
    }

    #[must_use]
    pub fn value(&self, id: NodeId) -> &Value<'a> {
        &self[id].value
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self[id].parent
    }

    #[must_use]
    pub fn provenance(&self, id: NodeId) -> Option<Provenance> {
        self[id].provenance
    }

    #[must_use]
    pub fn is_structural(&self, id: NodeId) -> bool {
        self[id].structural
    }

    /// The value of `id` if it was expanded from a group or sequence.
    fn expanded(&self, id: NodeId) -> Option<&Value<'a>> {
        let node = &self[id];
        node.structural.then_some(&node.value)
    }

    /// Child of a group node by field name.
    #[must_use]
    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        match self.expanded(id)? {
            Value::Fields(fields) => fields.get(name).copied(),
            _ => None,
        }
    }

    /// Child of a sequence node by position.
    #[must_use]
    pub fn item(&self, id: NodeId, index: usize) -> Option<NodeId> {
        match self.expanded(id)? {
            Value::Items(items) => items.get(index).copied(),
            _ => None,
        }
    }

    /// Direct children in declaration order; empty for non-structural nodes.
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let ids: Box<dyn Iterator<Item = NodeId> + '_> = match self.expanded(id) {
            Some(Value::Fields(fields)) => Box::new(fields.values().copied()),
            Some(Value::Items(items)) => Box::new(items.iter().copied()),
            _ => Box::new(std::iter::empty()),
        };
        ids
    }

    /// Navigate `path` starting at `from`.
    ///
    /// Segments are separated by `/`. A leading `/` starts at the root, `..` moves to the
    /// parent and `.` stays put. Numeric segments index sequences, anything else names a
    /// group field.
    ///
    /// # Errors
    /// [Error::UnresolvedReference] if any segment does not exist.
    pub fn lookup(&self, from: NodeId, path: &str) -> Result<NodeId> {
        let mut cur = if path.starts_with('/') {
            self.root()
        } else {
            from
        };
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            cur = match segment {
                "." => cur,
                ".." => self.parent(cur).ok_or_else(|| {
                    Error::UnresolvedReference(format!(
                        "{path}: {} has no parent",
                        self.path(cur)
                    ))
                })?,
                name => {
                    let next = match self.expanded(cur) {
                        Some(Value::Items(_)) => {
                            name.parse().ok().and_then(|idx| self.item(cur, idx))
                        }
                        _ => self.child(cur, name),
                    };
                    next.ok_or_else(|| {
                        Error::UnresolvedReference(format!(
                            "{path}: no {name} under {}",
                            self.path(cur)
                        ))
                    })?
                }
            };
        }
        Ok(cur)
    }

    /// The already-decoded value at `path` relative to `from`. See [Tree::lookup].
    ///
    /// # Errors
    /// [Error::UnresolvedReference] if the path does not exist or has not been decoded
    /// yet.
    pub fn resolve(&self, from: NodeId, path: &str) -> Result<Value<'a>> {
        let id = self.lookup(from, path)?;
        match &self[id].value {
            Value::Pending => Err(Error::UnresolvedReference(format!(
                "{path}: {} is not decoded yet",
                self.path(id)
            ))),
            value => Ok(value.clone()),
        }
    }

    /// Absolute path of a node, e.g., `/secondary_header/orbit_number`.
    #[must_use]
    pub fn path(&self, id: NodeId) -> String {
        let mut keys = Vec::new();
        let mut cur = Some(id);
        while let Some(node) = cur {
            let key = &self[node].key;
            if *key != Key::Root {
                keys.push(key.to_string());
            }
            cur = self[node].parent;
        }
        keys.reverse();
        format!("/{}", keys.join("/"))
    }

    /// Byte range covered by a node and all of its decoded descendants. `None` if
    /// nothing under the node has been decoded.
    #[must_use]
    pub fn extent(&self, id: NodeId) -> Option<Provenance> {
        let mut start: Option<usize> = None;
        let mut end = 0usize;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(p) = self[cur].provenance {
                start = Some(start.map_or(p.start, |s| s.min(p.start)));
                end = end.max(p.start + p.len);
            }
            stack.extend(self.children(cur));
        }
        start.map(|start| Provenance {
            start,
            len: end - start,
        })
    }

    /// All nodes with provenance, in arena (creation) order, with their paths.
    pub fn provenances(&self) -> impl Iterator<Item = (String, Provenance)> + '_ {
        self.nodes.iter().enumerate().filter_map(|(idx, node)| {
            node.provenance.map(|p| (self.path(NodeId(idx)), p))
        })
    }

    pub(crate) fn add_child(&mut self, parent: NodeId, key: Key) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::new(Some(parent), key));
        id
    }

    pub(crate) fn set_value(&mut self, id: NodeId, value: Value<'a>, structural: bool) {
        let node = &mut self.nodes[id.0];
        node.value = value;
        node.structural = structural;
    }

    pub(crate) fn set_provenance(&mut self, id: NodeId, provenance: Provenance) {
        self.nodes[id.0].provenance = Some(provenance);
    }

    /// Replace the node at `at` with the root of `subtree`. Subtree nodes are appended to
    /// this arena and their provenance shifted by `offset`.
    pub(crate) fn graft(&mut self, at: NodeId, subtree: Tree<'a>, offset: usize) {
        let base = self.nodes.len() - 1;
        let remap = |id: NodeId| -> NodeId {
            if id.0 == 0 {
                at
            } else {
                NodeId(base + id.0)
            }
        };
        let remap_value = |value: Value<'a>| -> Value<'a> {
            match value {
                Value::Fields(fields) => {
                    Value::Fields(fields.into_iter().map(|(k, v)| (k, remap(v))).collect())
                }
                Value::Items(items) => Value::Items(items.into_iter().map(remap).collect()),
                other => other,
            }
        };

        let mut nodes = subtree.nodes.into_iter();
        if let Some(root) = nodes.next() {
            let target = &mut self.nodes[at.0];
            target.value = remap_value(root.value);
            target.structural = root.structural;
        }
        for node in nodes {
            self.nodes.push(Node {
                value: remap_value(node.value),
                parent: node.parent.map(remap),
                key: node.key,
                structural: node.structural,
                provenance: node.provenance.map(|p| Provenance {
                    start: p.start + offset,
                    len: p.len,
                }),
            });
        }
    }
}
