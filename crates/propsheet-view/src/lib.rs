//! Views over a parsed property sheet.
//!
//! A [`Views`] tree lays the declarations of a document over a host object model. Each
//! view is bound to a backing through a [`RouteTable`]: a scalar slot, a list, a
//! dictionary, an element factory, or a nested object with routes of its own. Reading a
//! view expands `${...}` macros against its ancestors; [`View::copy_to_model`] writes the
//! declared values into the backings.
//!
//! ```ignore
//! let output = Rc::new(RefCell::new(String::new()));
//! let routes = RouteTable::new().value("output", ValueAccessor::cell(output.clone()));
//! let views = Views::new(&document.root, routes);
//! views.root().copy_to_model()?;
//! ```

pub mod errors;
mod map;
mod model;
pub mod route;
mod view;

#[cfg(test)]
mod tests;

pub use errors::{ViewError, ViewResult};
pub use map::MapKind;
pub use route::{
    Accessor, DictionaryAccessor, ElementFactory, EnumerableAccessor, ListAccessor,
    MacroHandler, Persistable, RouteFn, RouteTable, ValueAccessor,
};
pub use view::{View, Views};
