#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Fewer bytes remain than a fixed-width field requires.
    #[error("Not enough bytes: needed {needed}, have {available}")]
    TruncatedInput { needed: usize, available: usize },

    /// A byte that must be ASCII is not.
    #[error("Non-ASCII byte {byte:#04x} at field index {index}")]
    Encoding { index: usize, byte: u8 },

    /// ASCII text that must be a decimal integer is not.
    #[error("Invalid ASCII integer: {0}")]
    Format(String),

    #[error("Could not resolve field length: {0}")]
    LengthResolution(String),

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    /// Raised by client selectors that have no case for an observed value.
    #[error("No matching variant for {0}")]
    NoMatchingVariant(String),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Wraps a failure with the byte cursor and tree path of the node being filled.
    #[error("decode failed at byte {offset} ({path}): {source}")]
    At {
        offset: usize,
        path: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Attach decode position to an error. An error that already carries a position,
    /// i.e., one raised by a nested decode, is rebased onto `offset` and its path is
    /// joined onto `path`.
    pub(crate) fn at(self, offset: usize, path: String) -> Self {
        match self {
            Error::At {
                offset: inner,
                path: inner_path,
                source,
            } => Error::At {
                offset: offset + inner,
                path: join_paths(&path, &inner_path),
                source,
            },
            other => Error::At {
                offset,
                path,
                source: Box::new(other),
            },
        }
    }

    /// The underlying error with any positional wrapping removed.
    #[must_use]
    pub fn kind(&self) -> &Error {
        match self {
            Error::At { source, .. } => source.kind(),
            other => other,
        }
    }

    /// Absolute byte cursor at the time of failure, if known.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        match self {
            Error::At { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Tree path of the node that was being filled, if known.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        match self {
            Error::At { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Convenience for selectors with no case for `value`.
    pub fn no_variant(value: impl std::fmt::Debug) -> Self {
        Error::NoMatchingVariant(format!("{value:?}"))
    }
}

fn join_paths(outer: &str, inner: &str) -> String {
    match (outer, inner) {
        (outer, "/") => outer.to_string(),
        ("/", inner) => inner.to_string(),
        (outer, inner) => format!("{outer}{inner}"),
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_position_is_rebased() {
        let err = Error::Format("x".into())
            .at(3, "/lines/2/pixels".into())
            .at(100, "/data_block".into());

        assert_eq!(err.offset(), Some(103));
        assert_eq!(err.path(), Some("/data_block/lines/2/pixels"));
        assert!(matches!(err.kind(), Error::Format(_)));
    }

    #[test]
    fn test_root_paths_are_not_doubled() {
        let err = Error::Format("x".into()).at(0, "/".into()).at(7, "/a".into());
        assert_eq!(err.path(), Some("/a"));
        assert_eq!(err.offset(), Some(7));
    }
}
