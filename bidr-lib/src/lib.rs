#![doc = include_str!("../README.md")]

mod descriptor;
mod engine;
mod error;
mod flatten;
mod records;
mod tree;

pub mod fbidr;
pub mod float;
pub mod scalar;

pub use descriptor::{Conditional, Custom, Decoded, Descriptor, Length};
pub use engine::decode;
pub use error::{Error, Result};
pub use flatten::{flatten, Flatten, Plain};
pub use records::{Record, RecordReader, Records};
pub use tree::{Key, Node, NodeId, Provenance, Tree, Value};
