//! Small string and collection helpers shared by the property sheet crates, plus the
//! `${...}` macro expansion engine.

pub mod expand;
pub mod split;
