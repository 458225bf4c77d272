//! Configuration pivots and the condition expressions written over them.
//!
//! A property sheet declares its build axes under `configurations`:
//!
//! ```text
//! configurations {
//!     platform { choices: { x86, x64 }; }
//!     configuration { choices: { debug, release }; }
//! }
//! ```
//!
//! Expressions such as `x86\debug` or `!(x64 | release)` select a subset of those
//! configurations. [`Pivots`] parses them, reduces them to a canonical form (so that
//! `x86\debug` and `debug\x86` are the same configuration), and renders them as an output
//! path, a readable label, or an MSBuild condition.

pub mod errors;
mod expression;
mod mdd;
pub mod pivot;
mod pivots;
pub mod render;

#[cfg(test)]
mod tests;

pub use errors::{PivotError, PivotResult};
pub use pivot::{Choice, Pivot};
pub use pivots::Pivots;
pub use render::Target;
