//! The traversal engine.
//!
//! Decoding is driven by an explicit work stack rather than recursion, so the depth and
//! width of a schema are bounded only by memory. Nodes are decoded depth-first in
//! declaration order and the input is consumed strictly left to right.
use std::borrow::Cow;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::descriptor::{Decoded, Descriptor, Length};
use crate::error::{Error, Result};
use crate::float::{self, Precision};
use crate::scalar;
use crate::tree::{Key, NodeId, Provenance, Tree, Value};

/// Decode `buf` according to `descriptor`.
///
/// Returns the decoded tree along with the bytes that were not consumed. Provenance in
/// the returned tree is relative to the start of `buf`.
///
/// # Errors
/// Any failure aborts the decode and is returned as [Error::At], carrying the byte offset
/// and tree path of the node being decoded. Use [Error::kind] for the underlying error.
pub fn decode<'a>(buf: &'a [u8], descriptor: &Descriptor) -> Result<(Tree<'a>, &'a [u8])> {
    debug!(bytes = buf.len(), "decoding");
    let mut state = State {
        tree: Tree::new(),
        work: Vec::new(),
        rest: buf,
        cursor: 0,
    };
    state.work.push((descriptor.clone(), state.tree.root()));

    while let Some((desc, node)) = state.work.pop() {
        let cursor = state.cursor;
        state
            .step(desc, node)
            .map_err(|e| e.at(cursor, state.tree.path(node)))?;
    }

    debug!(
        consumed = state.cursor,
        remaining = state.rest.len(),
        nodes = state.tree.len(),
        "decoded"
    );
    Ok((state.tree, state.rest))
}

struct State<'a> {
    tree: Tree<'a>,
    work: Vec<(Descriptor, NodeId)>,
    rest: &'a [u8],
    cursor: usize,
}

impl<'a> State<'a> {
    /// The record being filled when decoding `node`.
    fn position(&self, node: NodeId) -> NodeId {
        self.tree.parent(node).unwrap_or(node)
    }

    fn step(&mut self, desc: Descriptor, node: NodeId) -> Result<()> {
        match desc {
            Descriptor::Group(fields) => {
                let mut children = IndexMap::with_capacity(fields.len());
                for (name, _) in fields.iter() {
                    if children.contains_key(name) {
                        return Err(Error::InvalidDescriptor(format!(
                            "duplicate field name {name:?}"
                        )));
                    }
                    let child = self.tree.add_child(node, Key::Name(name.clone()));
                    children.insert(name.clone(), child);
                }
                // reversed so the first field is popped first
                for ((_, desc), child) in fields.iter().zip(children.values()).rev() {
                    self.work.push((desc.clone(), *child));
                }
                self.tree.set_value(node, Value::Fields(children), true);
            }
            Descriptor::Sequence(items) => {
                let children: Vec<NodeId> = (0..items.len())
                    .map(|idx| self.tree.add_child(node, Key::Index(idx)))
                    .collect();
                for (desc, child) in items.iter().zip(&children).rev() {
                    self.work.push((desc.clone(), *child));
                }
                self.tree.set_value(node, Value::Items(children), true);
            }
            Descriptor::Conditional(cond) => {
                let at = self.position(node);
                let value = (cond.resolver)(&self.tree, at)?;
                if value.is_pending() {
                    return Err(Error::UnresolvedReference(format!(
                        "value for {} is not decoded yet",
                        self.tree.path(node)
                    )));
                }
                let next = (cond.selector)(&value)?;
                trace!(path = %self.tree.path(node), ?value, selected = ?next, "resolved conditional");
                self.work.push((next, node));
            }
            leaf => self.leaf(&leaf, node)?,
        }
        Ok(())
    }

    fn leaf(&mut self, desc: &Descriptor, node: NodeId) -> Result<()> {
        let buf = self.rest;
        let at = self.position(node);
        let (decoded, rest) = match desc {
            Descriptor::Unsigned(width) => {
                let (x, rest) = scalar::unsigned(buf, *width)?;
                (Decoded::Value(Value::Unsigned(x)), rest)
            }
            Descriptor::Signed(width) => {
                let (x, rest) = scalar::signed(buf, *width)?;
                (Decoded::Value(Value::Signed(x)), rest)
            }
            Descriptor::Ascii(width) => {
                let (x, rest) = scalar::ascii(buf, *width)?;
                (Decoded::Value(Value::Text(Cow::Borrowed(x))), rest)
            }
            Descriptor::AsciiInteger(width) => {
                let (x, rest) = scalar::ascii_integer(buf, *width)?;
                (Decoded::Value(Value::Signed(x)), rest)
            }
            Descriptor::Float(width) => {
                let (x, rest) = float::decode(buf, Precision::from_width(*width)?)?;
                (Decoded::Value(Value::Float(x)), rest)
            }
            Descriptor::Variable(length) => {
                let width = match length {
                    Length::Fixed(n) => *n,
                    Length::Rest => buf.len(),
                    Length::Computed(func) => func(&self.tree, at).map_err(|e| match e {
                        Error::UnresolvedReference(msg) => Error::LengthResolution(msg),
                        other => other,
                    })?,
                };
                let (x, rest) = scalar::bytes(buf, width)?;
                (Decoded::Value(Value::Bytes(Cow::Borrowed(x))), rest)
            }
            Descriptor::Custom(custom) => {
                let (decoded, rest) = (custom.0)(buf, &self.tree, at)?;
                if rest.len() > buf.len() {
                    return Err(Error::InvalidDescriptor(format!(
                        "custom decoder returned {} remaining bytes from {}",
                        rest.len(),
                        buf.len()
                    )));
                }
                (decoded, rest)
            }
            Descriptor::Group(_) | Descriptor::Sequence(_) | Descriptor::Conditional(_) => {
                return Err(Error::InvalidDescriptor(format!(
                    "{desc:?} is not a leaf descriptor"
                )));
            }
        };

        let consumed = buf.len() - rest.len();
        match decoded {
            Decoded::Value(Value::Fields(_) | Value::Items(_) | Value::Pending) => {
                return Err(Error::InvalidDescriptor(
                    "custom decoder returned a container or pending value; use Value::Opaque"
                        .to_string(),
                ));
            }
            Decoded::Value(value) => self.tree.set_value(node, value, false),
            Decoded::Tree(subtree) => self.tree.graft(node, subtree, self.cursor),
        }
        self.tree.set_provenance(
            node,
            Provenance {
                start: self.cursor,
                len: consumed,
            },
        );
        trace!(path = %self.tree.path(node), offset = self.cursor, consumed, "decoded field");
        self.cursor += consumed;
        self.rest = rest;
        Ok(())
    }
}
