//! Property sheets: a declarative configuration language for build and packaging tools.
//!
//! ```text
//! @import "common.props";
//!
//! SRC = c:\src\zlib;
//! nuget {
//!     version = 1.2.8;
//!     files {
//!         include += ${SRC}\*.h;
//!         lib[x86\debug] = { zlib.lib, zlib.pdb };
//!     }
//! }
//! configurations {
//!     platform { key: Platform; choices: { x86, x64 }; }
//! }
//! ```
//!
//! [`PropertySheet`] parses a sheet (following imports), answers queries with macros
//! expanded, binds the sheet onto host objects through a [`RouteTable`], and builds the
//! configuration [`Pivots`] used to turn expressions like `x86\debug` into MSBuild
//! conditions.

pub mod errors;
mod sheet;

pub use errors::{PropertySheetError, PropertySheetResult};
pub use sheet::PropertySheet;

pub use propsheet_lexer::{tokenize, Token, TokenKind};
pub use propsheet_pivots::{Choice, Pivot, PivotError, Pivots, Target};
pub use propsheet_syntax::{
    Change, Document, FileSystemLoader, MemoryLoader, Node, NodeError, ObjectNode, Operation,
    ParseError, ParseErrorKind, ParseOptions, ParseOptionsBuilder, PropertyNode, Selector,
    SourceLoader, Value,
};
pub use propsheet_util::expand::ExpandOptions;
pub use propsheet_view::{
    Accessor, DictionaryAccessor, EnumerableAccessor, ListAccessor, MapKind, Persistable,
    RouteTable, ValueAccessor, View, ViewError, Views,
};
