//! Host-side accessors and the route tables that publish them.

use indexmap::IndexMap;
use propsheet_syntax::Selector;
use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// Produces the accessor for a child; receives the selector that was asked for.
pub type RouteFn = Rc<dyn Fn(&Selector) -> Accessor>;

/// Produces the accessor for one keyed element (`target[Build]`).
pub type ElementFactory = Rc<dyn Fn(&str) -> Accessor>;

/// Answers a `${name}` lookup, or declines with `None`.
pub type MacroHandler = Rc<dyn Fn(&str) -> Option<String>>;

/// A scalar slot.
#[derive(Clone)]
pub struct ValueAccessor {
    get: Rc<dyn Fn() -> String>,
    set: Option<Rc<dyn Fn(String)>>,
}

impl ValueAccessor {
    pub fn new(get: impl Fn() -> String + 'static, set: impl Fn(String) + 'static) -> Self {
        ValueAccessor {
            get: Rc::new(get),
            set: Some(Rc::new(set)),
        }
    }

    pub fn read_only(get: impl Fn() -> String + 'static) -> Self {
        ValueAccessor {
            get: Rc::new(get),
            set: None,
        }
    }

    /// A slot stored in a shared cell.
    pub fn cell(cell: Rc<RefCell<String>>) -> Self {
        let reader = cell.clone();
        ValueAccessor::new(
            move || reader.borrow().clone(),
            move |v| *cell.borrow_mut() = v,
        )
    }

    pub fn get(&self) -> String {
        (self.get)()
    }

    pub fn is_writable(&self) -> bool {
        self.set.is_some()
    }

    /// Returns false when the slot is read-only.
    pub fn set(&self, value: String) -> bool {
        match &self.set {
            Some(set) => {
                set(value);
                true
            }
            None => false,
        }
    }
}

/// A list that can be replaced wholesale (`set`), appended to (`add`), both or neither.
#[derive(Clone)]
pub struct ListAccessor {
    get: Rc<dyn Fn() -> Vec<String>>,
    add: Option<Rc<dyn Fn(String)>>,
    set: Option<Rc<dyn Fn(Vec<String>)>>,
}

impl ListAccessor {
    pub fn new(get: impl Fn() -> Vec<String> + 'static) -> Self {
        ListAccessor {
            get: Rc::new(get),
            add: None,
            set: None,
        }
    }

    pub fn with_add(mut self, add: impl Fn(String) + 'static) -> Self {
        self.add = Some(Rc::new(add));
        self
    }

    pub fn with_set(mut self, set: impl Fn(Vec<String>) + 'static) -> Self {
        self.set = Some(Rc::new(set));
        self
    }

    /// A list stored in a shared cell, supporting both kinds of write.
    pub fn cell(cell: Rc<RefCell<Vec<String>>>) -> Self {
        let reader = cell.clone();
        let adder = cell.clone();
        ListAccessor::new(move || reader.borrow().clone())
            .with_add(move |v| adder.borrow_mut().push(v))
            .with_set(move |v| *cell.borrow_mut() = v)
    }

    pub fn get(&self) -> Vec<String> {
        (self.get)()
    }

    pub fn can_add(&self) -> bool {
        self.add.is_some()
    }

    pub fn can_set(&self) -> bool {
        self.set.is_some()
    }

    pub fn add(&self, value: String) -> bool {
        match &self.add {
            Some(add) => {
                add(value);
                true
            }
            None => false,
        }
    }

    pub fn set(&self, values: Vec<String>) -> bool {
        match &self.set {
            Some(set) => {
                set(values);
                true
            }
            None => false,
        }
    }
}

/// A string-keyed map; every child of a dictionary view is one entry.
#[derive(Clone)]
pub struct DictionaryAccessor {
    keys: Rc<dyn Fn() -> Vec<String>>,
    get: Rc<dyn Fn(&str) -> Option<String>>,
    set: Option<Rc<dyn Fn(&str, String)>>,
}

impl DictionaryAccessor {
    pub fn new(
        keys: impl Fn() -> Vec<String> + 'static,
        get: impl Fn(&str) -> Option<String> + 'static,
        set: impl Fn(&str, String) + 'static,
    ) -> Self {
        DictionaryAccessor {
            keys: Rc::new(keys),
            get: Rc::new(get),
            set: Some(Rc::new(set)),
        }
    }

    pub fn cell(cell: Rc<RefCell<IndexMap<String, String>>>) -> Self {
        let keys = cell.clone();
        let reader = cell.clone();
        DictionaryAccessor::new(
            move || keys.borrow().keys().cloned().collect(),
            move |k| reader.borrow().get(k).cloned(),
            move |k, v| {
                cell.borrow_mut().insert(k.to_string(), v);
            },
        )
    }

    pub fn keys(&self) -> Vec<String> {
        (self.keys)()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        (self.get)(key)
    }

    /// The slot for one entry.
    pub fn entry(&self, key: &str) -> ValueAccessor {
        let get = self.get.clone();
        let getter_key = key.to_string();
        let get = move || get(&getter_key).unwrap_or_default();
        match &self.set {
            Some(set) => {
                let set = set.clone();
                let key = key.to_string();
                ValueAccessor::new(get, move |v| set(&key, v))
            }
            None => ValueAccessor::read_only(get),
        }
    }
}

/// A read-only sequence.
#[derive(Clone)]
pub struct EnumerableAccessor(Rc<dyn Fn() -> Vec<String>>);

impl EnumerableAccessor {
    pub fn new(get: impl Fn() -> Vec<String> + 'static) -> Self {
        EnumerableAccessor(Rc::new(get))
    }

    pub fn get(&self) -> Vec<String> {
        (self.0)()
    }
}

/// Implemented by host objects that publish their own fields instead of being given an
/// explicit route table.
pub trait Persistable {
    fn fields(self: Rc<Self>) -> RouteTable;
}

/// What a route binds a name to.
#[derive(Clone)]
pub enum Accessor {
    /// A plain object; its children are found through the nested routes.
    Object(RouteTable),
    /// An object that publishes its fields itself.
    Persistable(Rc<dyn Persistable>),
    Value(ValueAccessor),
    List(ListAccessor),
    Dictionary(DictionaryAccessor),
    Enumerable(EnumerableAccessor),
    /// Keyed children: `name[key]` (or a child `key` of `name`) is produced by the factory.
    Element(ElementFactory),
}

impl Accessor {
    pub fn element(factory: impl Fn(&str) -> Accessor + 'static) -> Self {
        Accessor::Element(Rc::new(factory))
    }

    fn kind(&self) -> &'static str {
        match self {
            Accessor::Object(_) => "Object",
            Accessor::Persistable(_) => "Persistable",
            Accessor::Value(_) => "Value",
            Accessor::List(_) => "List",
            Accessor::Dictionary(_) => "Dictionary",
            Accessor::Enumerable(_) => "Enumerable",
            Accessor::Element(_) => "Element",
        }
    }
}

impl Debug for Accessor {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Accessor::Object(routes) => write!(f, "Object({routes:?})"),
            other => f.write_str(other.kind()),
        }
    }
}

const DEFAULT_ROUTE: &str = "*";

/// Named routes. Lookup order for a selector: the exact selector, then the same name
/// without its parameter (an element route is invoked with the parameter), then the `*`
/// default route.
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: IndexMap<Selector, RouteFn>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route<S: Into<Selector>>(
        mut self,
        name: S,
        route: impl Fn(&Selector) -> Accessor + 'static,
    ) -> Self {
        self.routes.insert(name.into(), Rc::new(route));
        self
    }

    fn fixed<S: Into<Selector>>(self, name: S, accessor: Accessor) -> Self {
        self.route(name, move |_| accessor.clone())
    }

    pub fn object<S: Into<Selector>>(self, name: S, routes: RouteTable) -> Self {
        self.fixed(name, Accessor::Object(routes))
    }

    pub fn persistable<S: Into<Selector>>(self, name: S, host: Rc<dyn Persistable>) -> Self {
        self.fixed(name, Accessor::Persistable(host))
    }

    pub fn value<S: Into<Selector>>(self, name: S, accessor: ValueAccessor) -> Self {
        self.fixed(name, Accessor::Value(accessor))
    }

    pub fn list<S: Into<Selector>>(self, name: S, accessor: ListAccessor) -> Self {
        self.fixed(name, Accessor::List(accessor))
    }

    pub fn dictionary<S: Into<Selector>>(self, name: S, accessor: DictionaryAccessor) -> Self {
        self.fixed(name, Accessor::Dictionary(accessor))
    }

    pub fn enumerable<S: Into<Selector>>(self, name: S, accessor: EnumerableAccessor) -> Self {
        self.fixed(name, Accessor::Enumerable(accessor))
    }

    pub fn element<S: Into<Selector>>(
        self,
        name: S,
        factory: impl Fn(&str) -> Accessor + 'static,
    ) -> Self {
        self.fixed(name, Accessor::element(factory))
    }

    /// The route used for any name without a route of its own.
    pub fn default_route(self, route: impl Fn(&Selector) -> Accessor + 'static) -> Self {
        self.route(DEFAULT_ROUTE, route)
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &Selector> {
        self.routes.keys()
    }

    /// The route registered under exactly `selector`, if any.
    pub fn lookup_named(&self, selector: &Selector) -> Option<Accessor> {
        self.routes.get(selector).map(|route| route(selector))
    }

    pub fn lookup(&self, selector: &Selector) -> Option<Accessor> {
        if let Some(route) = self.routes.get(selector) {
            return Some(route(selector));
        }

        if selector.has_parameter() {
            if let Some(route) = self.routes.get(&selector.without_parameter()) {
                return Some(match route(selector) {
                    Accessor::Element(factory) => {
                        factory(selector.parameter.as_deref().unwrap_or_default())
                    }
                    other => other,
                });
            }
        }

        self.routes
            .get(&Selector::new(DEFAULT_ROUTE))
            .map(|route| route(selector))
    }
}

impl Debug for RouteTable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.keys().map(|k| k.to_string()))
            .finish()
    }
}
