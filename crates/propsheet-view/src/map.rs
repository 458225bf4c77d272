use crate::route::{
    Accessor, DictionaryAccessor, ElementFactory, EnumerableAccessor, ListAccessor, Persistable,
    RouteTable, ValueAccessor,
};
use derive_more::Display;
use propsheet_syntax::Selector;
use std::rc::Rc;

/// The kind of backing a view is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum MapKind {
    #[display("an object")]
    Object,
    #[display("a value")]
    Value,
    #[display("a list")]
    List,
    #[display("a dictionary")]
    Dictionary,
    #[display("an enumerable")]
    Enumerable,
    #[display("an element factory")]
    Element,
    #[display("a placeholder")]
    Placeholder,
    #[display("parsed content only")]
    Node,
}

#[derive(Clone)]
pub(crate) enum Map {
    Object {
        routes: RouteTable,
        persistable: Option<Rc<dyn Persistable>>,
    },
    Value(ValueAccessor),
    List(ListAccessor),
    Dictionary(DictionaryAccessor),
    Enumerable(EnumerableAccessor),
    Element(ElementFactory),
    /// Stand-in created for the prefix of a dotted path before anything is bound to it.
    Placeholder,
    /// Parsed content with no backing route.
    Node,
}

impl From<Accessor> for Map {
    fn from(accessor: Accessor) -> Self {
        match accessor {
            Accessor::Object(routes) => Map::Object {
                routes,
                persistable: None,
            },
            Accessor::Persistable(host) => Map::Object {
                routes: RouteTable::default(),
                persistable: Some(host),
            },
            Accessor::Value(v) => Map::Value(v),
            Accessor::List(l) => Map::List(l),
            Accessor::Dictionary(d) => Map::Dictionary(d),
            Accessor::Enumerable(e) => Map::Enumerable(e),
            Accessor::Element(f) => Map::Element(f),
        }
    }
}

impl Map {
    pub(crate) fn kind(&self) -> MapKind {
        match self {
            Map::Object { .. } => MapKind::Object,
            Map::Value(_) => MapKind::Value,
            Map::List(_) => MapKind::List,
            Map::Dictionary(_) => MapKind::Dictionary,
            Map::Enumerable(_) => MapKind::Enumerable,
            Map::Element(_) => MapKind::Element,
            Map::Placeholder => MapKind::Placeholder,
            Map::Node => MapKind::Node,
        }
    }

    /// Not bound to a concrete backing yet; a route arriving later takes its place.
    pub(crate) fn is_replaceable(&self) -> bool {
        matches!(self, Map::Placeholder | Map::Node)
    }

    /// Whether the backing holds named children rather than a value.
    pub(crate) fn is_structured(&self) -> bool {
        matches!(
            self,
            Map::Object { .. } | Map::Dictionary(_) | Map::Element(_)
        )
    }

    pub(crate) fn is_scalar_like(&self) -> bool {
        matches!(self, Map::Value(_) | Map::List(_) | Map::Enumerable(_))
    }

    /// The accessor for a child: explicit routes first, then the fields a persistable host
    /// publishes. Dictionary children are entries, element children are keyed elements.
    pub(crate) fn route_for(&self, selector: &Selector) -> Option<Accessor> {
        match self {
            Map::Object {
                routes,
                persistable,
            } => routes.lookup(selector).or_else(|| {
                persistable
                    .as_ref()
                    .and_then(|host| host.clone().fields().lookup(selector))
            }),
            Map::Dictionary(d) => Some(Accessor::Value(d.entry(&selector.to_string()))),
            Map::Element(factory) => Some(factory(&selector.to_string())),
            _ => None,
        }
    }

    /// Like [`route_for`](Map::route_for), without asking factories or `*` routes: only
    /// routes registered under exactly `selector` and dictionary entries that exist.
    pub(crate) fn named_route_for(&self, selector: &Selector) -> Option<Accessor> {
        match self {
            Map::Object {
                routes,
                persistable,
            } => routes.lookup_named(selector).or_else(|| {
                persistable
                    .as_ref()
                    .and_then(|host| host.clone().fields().lookup_named(selector))
            }),
            Map::Dictionary(d) => {
                let key = selector.to_string();
                d.get(&key).map(|_| Accessor::Value(d.entry(&key)))
            }
            _ => None,
        }
    }

    /// The backing's current contents as text.
    pub(crate) fn current_values(&self) -> Vec<String> {
        match self {
            Map::Value(v) => {
                let v = v.get();
                if v.is_empty() {
                    vec![]
                } else {
                    vec![v]
                }
            }
            Map::List(l) => l.get(),
            Map::Enumerable(e) => e.get(),
            Map::Dictionary(d) => d.keys(),
            _ => vec![],
        }
    }
}
