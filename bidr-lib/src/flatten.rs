//! Conversion of a decoded [Tree] into plain nested values.
use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;

use crate::tree::{NodeId, Tree, Value};

/// A plain nested value with no tree bookkeeping.
///
/// Serializes to the natural JSON shape: maps keep field order and bytes become arrays
/// of numbers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Plain<'a> {
    /// A node that was never decoded
    Null,
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Text(Cow<'a, str>),
    Bytes(#[serde(serialize_with = "serde_bytes::serialize")] Cow<'a, [u8]>),
    Map(IndexMap<String, Plain<'a>>),
    List(Vec<Plain<'a>>),
}

impl<'a> Plain<'a> {
    /// Field `name` of a map.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Plain<'a>> {
        match self {
            Plain::Map(fields) => fields.get(name),
            _ => None,
        }
    }

    /// Element `index` of a list.
    #[must_use]
    pub fn item(&self, index: usize) -> Option<&Plain<'a>> {
        match self {
            Plain::List(items) => items.get(index),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Plain::Unsigned(x) => Some(*x),
            Plain::Signed(x) => u64::try_from(*x).ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Plain::Unsigned(x) => i64::try_from(*x).ok(),
            Plain::Signed(x) => Some(*x),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Plain::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Plain::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Copy any borrowed text or bytes so the value no longer borrows the input.
    #[must_use]
    pub fn into_owned(self) -> Plain<'static> {
        match self {
            Plain::Null => Plain::Null,
            Plain::Unsigned(x) => Plain::Unsigned(x),
            Plain::Signed(x) => Plain::Signed(x),
            Plain::Float(x) => Plain::Float(x),
            Plain::Text(s) => Plain::Text(Cow::Owned(s.into_owned())),
            Plain::Bytes(b) => Plain::Bytes(Cow::Owned(b.into_owned())),
            Plain::Map(fields) => Plain::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.into_owned()))
                    .collect(),
            ),
            Plain::List(items) => Plain::List(items.into_iter().map(Plain::into_owned).collect()),
        }
    }
}

/// Types that can be reduced to a [Plain] value.
pub trait Flatten<'a> {
    fn flatten(&self) -> Plain<'a>;
}

impl<'a> Flatten<'a> for Plain<'a> {
    /// Plain values are already flat.
    fn flatten(&self) -> Plain<'a> {
        self.clone()
    }
}

impl<'a> Flatten<'a> for Tree<'a> {
    fn flatten(&self) -> Plain<'a> {
        self.flatten_node(self.root())
    }
}

/// Flatten anything implementing [Flatten].
pub fn flatten<'a, F: Flatten<'a> + ?Sized>(value: &F) -> Plain<'a> {
    value.flatten()
}

impl<'a> Tree<'a> {
    /// Flatten the subtree rooted at `id`.
    ///
    /// Group and sequence nodes are expanded into maps and lists of their flattened
    /// children. Values produced directly by a decoder are returned unchanged, and only
    /// structural nodes are ever expanded.
    #[must_use]
    pub fn flatten_node(&self, id: NodeId) -> Plain<'a> {
        let structural = self.is_structural(id);
        match self.value(id) {
            Value::Fields(_) | Value::Items(_) if !structural => Plain::Null,
            Value::Fields(fields) => Plain::Map(
                fields
                    .iter()
                    .map(|(name, child)| (name.to_string(), self.flatten_node(*child)))
                    .collect(),
            ),
            Value::Items(items) => {
                Plain::List(items.iter().map(|child| self.flatten_node(*child)).collect())
            }
            Value::Pending => Plain::Null,
            Value::Unsigned(x) => Plain::Unsigned(*x),
            Value::Signed(x) => Plain::Signed(*x),
            Value::Float(x) => Plain::Float(*x),
            Value::Text(s) => Plain::Text(s.clone()),
            Value::Bytes(b) => Plain::Bytes(b.clone()),
            Value::Opaque(plain) => plain.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opaque() -> Plain<'static> {
        let mut fields = IndexMap::new();
        fields.insert("z".to_string(), Plain::Unsigned(1));
        fields.insert("a".to_string(), Plain::List(vec![Plain::Null]));
        Plain::Map(fields)
    }

    #[test]
    fn test_plain_flatten_is_identity() {
        let plain = opaque();
        assert_eq!(flatten(&plain), plain);
        assert_eq!(flatten(&flatten(&plain)), plain);
    }

    #[test]
    fn test_non_structural_containers_are_not_expanded() {
        let root = Tree::new().root();
        let tree = Tree::with_value(Value::Items(vec![root]));

        assert!(!tree.is_structural(root));
        assert_eq!(tree.children(root).count(), 0);
        assert_eq!(tree.item(root, 0), None);
        assert!(tree.lookup(root, "0").is_err());
        assert_eq!(tree.extent(root), None);
        assert_eq!(tree.flatten(), Plain::Null);
    }

    #[test]
    fn test_opaque_value_is_returned_as_is() {
        let tree = Tree::with_value(Value::Opaque(opaque()));
        assert_eq!(tree.flatten(), opaque());
    }

    #[test]
    fn test_pending_is_null() {
        assert_eq!(Tree::new().flatten(), Plain::Null);
    }

    #[test]
    fn test_serialize_preserves_order() {
        let json = serde_json::to_string(&opaque()).unwrap();
        assert_eq!(json, r#"{"z":1,"a":[null]}"#);

        let bytes = Plain::Bytes(Cow::Borrowed(&[1, 2, 3]));
        assert_eq!(serde_json::to_string(&bytes).unwrap(), "[1,2,3]");
    }

    #[test]
    fn test_into_owned() {
        let buf = b"abc".to_vec();
        let owned = {
            let plain = Plain::Text(Cow::Borrowed(std::str::from_utf8(&buf).unwrap()));
            plain.into_owned()
        };
        drop(buf);
        assert_eq!(owned.as_str(), Some("abc"));
    }
}
