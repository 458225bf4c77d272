//! Parsing of property sheet documents into an [`ObjectNode`] tree.
//!
//! A property sheet is a nested set of objects and properties:
//!
//! ```text
//! @import "common.props";
//! @alias platforms = configurations.platform.choices;
//!
//! nuget {
//!     #defines: { flatten = true };
//!     files {
//!         include += ${SRC}\include\*.h;
//!         lib[x86\debug] = { a.lib, b.lib };
//!     }
//! }
//! platforms: { x86, x64 };
//! ```
//!
//! Every textual write to a property is recorded as a [`Change`]; a property's value is
//! obtained by replaying its changes (see [`PropertyNode::result`]).

pub mod errors;
pub mod iterator;
pub mod loader;
pub mod node;
pub mod parser;
pub mod selector;
pub mod value;

#[cfg(test)]
mod tests;

pub use errors::{NodeError, ParseError, ParseErrorKind, ParseResult};
pub use loader::{FileSystemLoader, MemoryLoader, SourceLoader};
pub use node::{Change, Node, NodeKind, ObjectNode, Operation, PropertyNode};
pub use parser::{parse_file, parse_str, parse_with, Document, ParseOptions, ParseOptionsBuilder};
pub use selector::Selector;
pub use value::{IteratorValue, Value};
