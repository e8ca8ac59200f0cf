//! Schema descriptors.
//!
//! A [Descriptor] describes how to decode a region of bytes. Descriptors are built once
//! by a client and may be shared between any number of decodes; cloning is cheap.
use std::fmt::Debug;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::tree::{NodeId, Tree, Value};

type ResolveFn = dyn for<'t> Fn(&Tree<'t>, NodeId) -> Result<Value<'t>> + Send + Sync;
type SelectFn = dyn for<'v> Fn(&Value<'v>) -> Result<Descriptor> + Send + Sync;
type LengthFn = dyn for<'t> Fn(&Tree<'t>, NodeId) -> Result<usize> + Send + Sync;
type CustomFn =
    dyn for<'a> Fn(&'a [u8], &Tree<'a>, NodeId) -> Result<(Decoded<'a>, &'a [u8])> + Send + Sync;

/// Result of a custom decoder.
#[derive(Debug)]
pub enum Decoded<'a> {
    /// A value for the pending node.
    Value(Value<'a>),
    /// A subtree that replaces the pending node.
    Tree(Tree<'a>),
}

/// Width of a [Descriptor::Variable] field.
#[derive(Clone)]
pub enum Length {
    Fixed(usize),
    /// Everything remaining in the buffer.
    Rest,
    /// Computed from the partially decoded tree.
    Computed(Arc<LengthFn>),
}

impl Length {
    /// Length computed by `func` from the tree and the current position.
    pub fn computed<F>(func: F) -> Self
    where
        F: for<'t> Fn(&Tree<'t>, NodeId) -> Result<usize> + Send + Sync + 'static,
    {
        Length::Computed(Arc::new(func))
    }

    /// Length taken from the integer at `path`; see [Tree::lookup] for the syntax.
    pub fn field(path: impl Into<String>) -> Self {
        Self::field_less(path, 0)
    }

    /// Length taken from the integer at `path`, less `adjust` bytes.
    pub fn field_less(path: impl Into<String>, adjust: usize) -> Self {
        let path = path.into();
        Length::computed(move |tree, at| {
            let value = tree
                .resolve(at, &path)
                .map_err(|e| Error::LengthResolution(e.to_string()))?;
            let len = value.as_usize().ok_or_else(|| {
                Error::LengthResolution(format!("{path}: {value:?} is not a length"))
            })?;
            len.checked_sub(adjust).ok_or_else(|| {
                Error::LengthResolution(format!("{path}: {len} is less than {adjust}"))
            })
        })
    }
}

impl Debug for Length {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Length::Fixed(n) => write!(f, "Fixed({n})"),
            Length::Rest => write!(f, "Rest"),
            Length::Computed(_) => write!(f, "Computed"),
        }
    }
}

/// A resolver/selector pair; see [Descriptor::conditional].
#[derive(Clone)]
pub struct Conditional {
    pub(crate) resolver: Arc<ResolveFn>,
    pub(crate) selector: Arc<SelectFn>,
}

/// A client supplied decode function; see [Descriptor::custom].
#[derive(Clone)]
pub struct Custom(pub(crate) Arc<CustomFn>);

#[derive(Clone)]
pub enum Descriptor {
    /// Little-endian unsigned integer of the given byte width
    Unsigned(usize),
    /// Little-endian two's-complement integer of the given byte width
    Signed(usize),
    /// Fixed width ASCII text
    Ascii(usize),
    /// Fixed width ASCII decimal integer
    AsciiInteger(usize),
    /// Magellan float of 4 or 8 bytes
    Float(usize),
    /// Raw bytes
    Variable(Length),
    /// Ordered named fields
    Group(Arc<[(Arc<str>, Descriptor)]>),
    /// Ordered unnamed elements
    Sequence(Arc<[Descriptor]>),
    /// Replaced at decode time by a descriptor chosen from an earlier value
    Conditional(Conditional),
    Custom(Custom),
}

impl Descriptor {
    #[must_use]
    pub fn unsigned(width: usize) -> Self {
        Descriptor::Unsigned(width)
    }

    #[must_use]
    pub fn signed(width: usize) -> Self {
        Descriptor::Signed(width)
    }

    #[must_use]
    pub fn ascii(width: usize) -> Self {
        Descriptor::Ascii(width)
    }

    #[must_use]
    pub fn ascii_integer(width: usize) -> Self {
        Descriptor::AsciiInteger(width)
    }

    #[must_use]
    pub fn float(width: usize) -> Self {
        Descriptor::Float(width)
    }

    /// Exactly `width` raw bytes.
    #[must_use]
    pub fn bytes(width: usize) -> Self {
        Descriptor::Variable(Length::Fixed(width))
    }

    /// All remaining bytes.
    #[must_use]
    pub fn rest() -> Self {
        Descriptor::Variable(Length::Rest)
    }

    #[must_use]
    pub fn variable(length: Length) -> Self {
        Descriptor::Variable(length)
    }

    pub fn group<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Descriptor)>,
        S: Into<Arc<str>>,
    {
        Descriptor::Group(
            fields
                .into_iter()
                .map(|(name, desc)| (name.into(), desc))
                .collect(),
        )
    }

    pub fn sequence<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Descriptor>,
    {
        Descriptor::Sequence(items.into_iter().collect())
    }

    /// A sequence of `count` copies of `item`.
    #[must_use]
    pub fn repeat(item: &Descriptor, count: usize) -> Self {
        Descriptor::Sequence(std::iter::repeat(item).take(count).cloned().collect())
    }

    /// Choose the descriptor for a node at decode time.
    ///
    /// `resolver` receives the tree and the current position (the record being filled)
    /// and returns an already decoded value. `selector` maps that value to the descriptor
    /// that fills the node, or fails, typically with [Error::NoMatchingVariant].
    pub fn conditional<R, S>(resolver: R, selector: S) -> Self
    where
        R: for<'t> Fn(&Tree<'t>, NodeId) -> Result<Value<'t>> + Send + Sync + 'static,
        S: for<'v> Fn(&Value<'v>) -> Result<Descriptor> + Send + Sync + 'static,
    {
        Descriptor::Conditional(Conditional {
            resolver: Arc::new(resolver),
            selector: Arc::new(selector),
        })
    }

    /// A [Descriptor::conditional] whose resolver reads the value at `path`.
    pub fn switch<S>(path: impl Into<String>, selector: S) -> Self
    where
        S: for<'v> Fn(&Value<'v>) -> Result<Descriptor> + Send + Sync + 'static,
    {
        let path = path.into();
        Self::conditional(move |tree, at| tree.resolve(at, &path), selector)
    }

    /// Decode a node with a client function.
    ///
    /// `func` receives the remaining input, the tree and the current position, and
    /// returns what it decoded with the bytes it did not consume. It may call
    /// [crate::decode] on its input and return the resulting subtree.
    pub fn custom<F>(func: F) -> Self
    where
        F: for<'a> Fn(&'a [u8], &Tree<'a>, NodeId) -> Result<(Decoded<'a>, &'a [u8])>
            + Send
            + Sync
            + 'static,
    {
        Descriptor::Custom(Custom(Arc::new(func)))
    }

    /// True for descriptors that expand into child nodes.
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(self, Descriptor::Group(_) | Descriptor::Sequence(_))
    }
}

impl Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Descriptor::Unsigned(w) => write!(f, "Unsigned({w})"),
            Descriptor::Signed(w) => write!(f, "Signed({w})"),
            Descriptor::Ascii(w) => write!(f, "Ascii({w})"),
            Descriptor::AsciiInteger(w) => write!(f, "AsciiInteger({w})"),
            Descriptor::Float(w) => write!(f, "Float({w})"),
            Descriptor::Variable(len) => write!(f, "Variable({len:?})"),
            Descriptor::Group(fields) => f
                .debug_map()
                .entries(fields.iter().map(|(k, v)| (k, v)))
                .finish(),
            Descriptor::Sequence(items) => f.debug_list().entries(items.iter()).finish(),
            Descriptor::Conditional(_) => write!(f, "Conditional"),
            Descriptor::Custom(_) => write!(f, "Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_preserves_order() {
        let desc = Descriptor::group([
            ("b", Descriptor::unsigned(1)),
            ("a", Descriptor::ascii(2)),
        ]);
        let Descriptor::Group(fields) = &desc else {
            panic!("expected group, got {desc:?}");
        };
        let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_ref()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(desc.is_structural());
        assert_eq!(format!("{desc:?}"), r#"{"b": Unsigned(1), "a": Ascii(2)}"#);
    }

    #[test]
    fn test_repeat() {
        let desc = Descriptor::repeat(&Descriptor::bytes(3), 4);
        let Descriptor::Sequence(items) = &desc else {
            panic!("expected sequence, got {desc:?}");
        };
        assert_eq!(items.len(), 4);
        assert!(matches!(items[0], Descriptor::Variable(Length::Fixed(3))));
    }

    #[test]
    fn test_field_length() {
        let tree = Tree::with_value(Value::Unsigned(10));
        let root = tree.root();
        let Length::Computed(func) = Length::field_less("/", 4) else {
            panic!("expected computed length");
        };
        assert_eq!(func(&tree, root).unwrap(), 6);

        let Length::Computed(func) = Length::field_less(".", 11) else {
            panic!("expected computed length");
        };
        assert!(matches!(func(&tree, root), Err(Error::LengthResolution(_))));

        let Length::Computed(func) = Length::field("missing") else {
            panic!("expected computed length");
        };
        assert!(matches!(func(&tree, root), Err(Error::LengthResolution(_))));
    }
}
