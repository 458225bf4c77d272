use crate::errors::{ViewError, ViewResult};
use crate::map::{Map, MapKind};
use crate::route::{Accessor, MacroHandler, RouteTable};
use indexmap::{IndexMap, IndexSet};
use petgraph::stable_graph::{NodeIndex, StableGraph};
use petgraph::Direction;
use propsheet_syntax::iterator::{expand_iterator_with, template_texts, EachItems};
use propsheet_syntax::node::collapse;
use propsheet_syntax::{Node, NodeError, NodeKind, ObjectNode, PropertyNode, Selector, Value};
use propsheet_util::expand::{ExpandOptions, MacroExpander};
use scopeguard::defer;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use tracing::{debug, trace};

/// Something waiting to become (or be merged into) a child view.
pub(crate) enum Contribution {
    /// Parsed declarations for the child.
    Node(Node),
    /// A host binding for the child.
    Route(Accessor),
}

pub(crate) struct Initializer {
    name: Selector,
    contribution: Contribution,
    /// `name` was already redirected through any alias that applies to it.
    aliased: bool,
}

/// How far a child lookup may go to produce a child that does not exist yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Any route, including element factories, dictionary entries and `*`.
    Bind,
    /// Only routes the host names outright and dictionary keys that exist.
    Named,
}

pub(crate) struct ViewData {
    pub(crate) name: Selector,
    pub(crate) map: Map,
    /// Property declarations for this view, merged from every contribution.
    pub(crate) content: PropertyNode,
    pub(crate) aliases: IndexMap<String, Selector>,
    /// Aliases added by the host after parsing; the parser never saw these.
    host_aliases: IndexSet<String>,
    pub(crate) metadata: IndexMap<String, Value>,
    initializers: VecDeque<Initializer>,
    pub(crate) children: IndexMap<Selector, NodeIndex>,
    macro_handlers: Vec<MacroHandler>,
    active: bool,
    draining: bool,
    pub(crate) applied: bool,
}

impl ViewData {
    fn new(name: Selector, map: Map) -> Self {
        ViewData {
            name,
            map,
            content: PropertyNode::new(),
            aliases: IndexMap::new(),
            host_aliases: IndexSet::new(),
            metadata: IndexMap::new(),
            initializers: VecDeque::new(),
            children: IndexMap::new(),
            macro_handlers: vec![],
            active: false,
            draining: false,
            applied: false,
        }
    }

    fn absorb_object(&mut self, object: &ObjectNode) {
        for (name, child) in object.children() {
            self.initializers.push_back(Initializer {
                name: name.clone(),
                contribution: Contribution::Node(child.clone()),
                aliased: false,
            });
        }
        for (name, target) in object.aliases() {
            self.aliases
                .entry(name.clone())
                .or_insert_with(|| target.clone());
        }
        self.absorb_metadata(object.metadata());
    }

    fn absorb_property(&mut self, property: &PropertyNode) {
        self.content.insert_front(property.changes().iter().cloned());
        self.absorb_metadata(property.metadata());
    }

    fn absorb_metadata(&mut self, metadata: &IndexMap<String, Value>) {
        for (key, value) in metadata {
            self.metadata
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }
}

/// The view tree of one parsed document bound to one set of routes.
///
/// Views are created lazily: a view's pending children are only turned into views (and
/// merged with same-named siblings) when the view is first accessed.
pub struct Views {
    graph: RefCell<StableGraph<ViewData, ()>>,
    root: NodeIndex,
    expander: MacroExpander,
}

impl Views {
    pub fn new(root: &ObjectNode, routes: RouteTable) -> Views {
        Views::bind(root, Accessor::Object(routes), ExpandOptions::default())
    }

    /// Views over parsed content alone, with nothing bound behind them.
    pub fn from_node(root: &ObjectNode) -> Views {
        Views::new(root, RouteTable::default())
    }

    pub fn bind(root: &ObjectNode, accessor: Accessor, options: ExpandOptions) -> Views {
        let mut data = ViewData::new(Selector::new(""), accessor.into());
        data.absorb_object(root);

        let mut graph = StableGraph::new();
        let root = graph.add_node(data);
        Views {
            graph: RefCell::new(graph),
            root,
            expander: MacroExpander::new(options),
        }
    }

    pub fn root(&self) -> View<'_> {
        View {
            views: self,
            index: self.root,
        }
    }

    fn view(&self, index: NodeIndex) -> View<'_> {
        View { views: self, index }
    }

    pub(crate) fn with<R>(&self, index: NodeIndex, f: impl FnOnce(&ViewData) -> R) -> R {
        f(&self.graph.borrow()[index])
    }

    pub(crate) fn with_mut<R>(&self, index: NodeIndex, f: impl FnOnce(&mut ViewData) -> R) -> R {
        f(&mut self.graph.borrow_mut()[index])
    }

    fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .borrow()
            .neighbors_directed(index, Direction::Incoming)
            .next()
    }

    fn add_child(&self, parent: NodeIndex, name: Selector, map: Map) -> NodeIndex {
        trace!(view = %name, kind = %map.kind(), "new view");
        let mut graph = self.graph.borrow_mut();
        let child = graph.add_node(ViewData::new(name.clone(), map));
        graph.add_edge(parent, child, ());
        graph[parent].children.insert(name, child);
        child
    }

    /// Turn every pending initializer of `index` into child views. Nested access to the same
    /// view while it drains sees the children merged so far.
    pub(crate) fn drain(&self, index: NodeIndex) -> ViewResult<()> {
        let start = self.with_mut(index, |d| {
            d.active = true;
            if d.draining || d.initializers.is_empty() {
                false
            } else {
                d.draining = true;
                true
            }
        });
        if !start {
            return Ok(());
        }

        defer! {
            self.with_mut(index, |d| d.draining = false);
        }

        while let Some(initializer) = self.with_mut(index, |d| d.initializers.pop_front()) {
            let Initializer {
                name,
                contribution,
                aliased,
            } = initializer;

            // document paths were resolved by the parser; only host aliases are left
            let redirect = match contribution {
                Contribution::Node(_) if !aliased => self.find_alias(index, &name, true),
                _ => None,
            };
            match redirect {
                Some((anchor, target)) => self.merge_child(anchor, target, contribution)?,
                None => self.merge_child(index, name, contribution)?,
            }
        }
        Ok(())
    }

    fn merge_child(
        &self,
        index: NodeIndex,
        name: Selector,
        contribution: Contribution,
    ) -> ViewResult<()> {
        if let (Some(prefix), Some(suffix)) = (name.prefix(), name.suffix()) {
            let child = self.child_or_placeholder(index, prefix);
            self.with_mut(child, |d| {
                d.initializers.push_back(Initializer {
                    name: suffix,
                    contribution,
                    aliased: true,
                })
            });
            return Ok(());
        }

        let existing = self.with(index, |d| d.children.get(&name).copied());
        match (existing, contribution) {
            (Some(child), Contribution::Route(accessor)) => {
                let incoming = Map::from(accessor);
                let current = self.with(child, |d| d.map.kind());
                if !self.with(child, |d| d.map.is_replaceable()) {
                    return Err(ViewError::AmbiguousMerge {
                        name,
                        existing: current,
                        incoming: incoming.kind(),
                    });
                }
                debug!(view = %name, from = %current, to = %incoming.kind(), "replacing map");
                self.replace_map(child, incoming);
            }
            (Some(child), Contribution::Node(node)) => {
                trace!(view = %name, "merging into existing view");
                self.absorb(child, node)?;
            }
            (None, Contribution::Route(accessor)) => {
                self.add_child(index, name, accessor.into());
            }
            (None, Contribution::Node(node)) => {
                let map = self.with(index, |d| d.map.clone());
                let map = map.route_for(&name).map(Map::from).unwrap_or(Map::Node);
                let child = self.add_child(index, name, map);
                self.absorb(child, node)?;
            }
        }
        Ok(())
    }

    fn child_or_placeholder(&self, index: NodeIndex, name: Selector) -> NodeIndex {
        if let Some(child) = self.with(index, |d| d.children.get(&name).copied()) {
            return child;
        }
        let map = self.with(index, |d| d.map.clone());
        let map = map
            .route_for(&name)
            .map(Map::from)
            .unwrap_or(Map::Placeholder);
        self.add_child(index, name, map)
    }

    fn absorb(&self, child: NodeIndex, node: Node) -> ViewResult<()> {
        let (name, structured, scalar_like) = self.with(child, |d| {
            (d.name.clone(), d.map.is_structured(), d.map.is_scalar_like())
        });

        match &node {
            Node::Property(_) if structured => Err(NodeError::KindMismatch {
                selector: name,
                existing: NodeKind::Object,
                requested: NodeKind::Property,
            }
            .into()),
            Node::Object(_) if scalar_like => Err(NodeError::KindMismatch {
                selector: name,
                existing: NodeKind::Property,
                requested: NodeKind::Object,
            }
            .into()),
            Node::Property(p) => {
                self.with_mut(child, |d| d.absorb_property(p));
                Ok(())
            }
            Node::Object(o) => {
                self.with_mut(child, |d| d.absorb_object(o));
                Ok(())
            }
        }
    }

    /// Bind `index` to `map`; children that were still unbound get routes from it.
    fn replace_map(&self, index: NodeIndex, map: Map) {
        let children: Vec<(Selector, NodeIndex)> = self.with_mut(index, |d| {
            d.map = map.clone();
            d.children.iter().map(|(k, v)| (k.clone(), *v)).collect()
        });

        for (name, child) in children {
            if !self.with(child, |d| d.map.is_replaceable()) {
                continue;
            }
            if let Some(accessor) = map.route_for(&name) {
                self.replace_map(child, accessor.into());
            }
        }
    }

    /// The alias `name` goes through, searching the alias tables of `index` and its
    /// ancestors innermost first, together with the view that declared it. Alias targets
    /// are relative to that view.
    fn find_alias(
        &self,
        index: NodeIndex,
        name: &Selector,
        host_only: bool,
    ) -> Option<(NodeIndex, Selector)> {
        let mut current = Some(index);
        while let Some(at) = current {
            let found = self.with(at, |d| {
                let visible = |alias: &str| !host_only || d.host_aliases.contains(alias);

                if let Some(target) = d.aliases.get(&name.name).filter(|_| visible(&name.name)) {
                    let mut target = target.clone();
                    if target.parameter.is_none() {
                        target.parameter = name.parameter.clone();
                    }
                    if target.instruction.is_none() {
                        target.instruction = name.instruction.clone();
                    }
                    return Some(target);
                }
                let (prefix, suffix) = (name.prefix()?, name.suffix()?);
                d.aliases
                    .get(&prefix.name)
                    .filter(|_| visible(&prefix.name))
                    .map(|target| Selector::compose(target, &suffix))
            });

            if let Some(target) = found {
                trace!(alias = %name, %target, "alias resolved");
                return Some((at, target));
            }
            current = self.parent(at);
        }
        None
    }

    /// Rewrite `name` through the alias tables of `index` and its ancestors. A name no
    /// table knows comes back unchanged.
    fn resolve_alias(&self, index: NodeIndex, name: &Selector) -> Selector {
        self.find_alias(index, name, false)
            .map(|(_, target)| target)
            .unwrap_or_else(|| name.clone())
    }

    fn lookup_child(
        &self,
        index: NodeIndex,
        name: &Selector,
        lookup: Lookup,
    ) -> ViewResult<Option<NodeIndex>> {
        self.drain(index)?;
        match self.find_alias(index, name, false) {
            Some((anchor, target)) => self.find_child(anchor, &target, lookup),
            None => self.find_child(index, name, lookup),
        }
    }

    /// Find the child at `name`, binding it on demand when a route allows.
    fn find_child(
        &self,
        index: NodeIndex,
        name: &Selector,
        lookup: Lookup,
    ) -> ViewResult<Option<NodeIndex>> {
        self.drain(index)?;

        if let (Some(prefix), Some(suffix)) = (name.prefix(), name.suffix()) {
            return match self.find_child(index, &prefix, lookup)? {
                Some(child) => self.find_child(child, &suffix, lookup),
                None => Ok(None),
            };
        }

        if let Some(child) = self.with(index, |d| d.children.get(name).copied()) {
            return Ok(Some(child));
        }

        let map = self.with(index, |d| d.map.clone());
        let accessor = match lookup {
            Lookup::Bind => map.route_for(name),
            Lookup::Named => map.named_route_for(name),
        };
        Ok(accessor.map(|accessor| self.add_child(index, name.clone(), accessor.into())))
    }

    fn lookup_path(
        &self,
        index: NodeIndex,
        path: &[Selector],
        lookup: Lookup,
    ) -> ViewResult<Option<NodeIndex>> {
        let mut current = index;
        for segment in path {
            match self.lookup_child(current, segment, lookup)? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn provides_value(&self, index: NodeIndex) -> bool {
        let (has_content, map) = self.with(index, |d| (!d.content.is_empty(), d.map.clone()));
        has_content || (map.is_scalar_like() && !map.current_values().is_empty())
    }

    /// `${name}`: this view's macro handlers (last added first), then its own children,
    /// then the same on each ancestor up to the root. Host factories are not asked for
    /// children while looking.
    fn lookup_macro(&self, index: NodeIndex, name: &str) -> ViewResult<Option<String>> {
        let path = Selector::parse_path(name);

        let mut current = Some(index);
        while let Some(at) = current {
            let handlers = self.with(at, |d| d.macro_handlers.clone());
            for handler in handlers.iter().rev() {
                if let Some(value) = handler(name) {
                    return Ok(Some(value));
                }
            }

            if let Some(found) = self.lookup_path(at, &path, Lookup::Named)? {
                if self.provides_value(found) {
                    return self.value_of(found).map(Some);
                }
            }

            current = self.parent(at);
        }
        Ok(None)
    }

    fn expand_text(&self, index: NodeIndex, text: &str) -> ViewResult<String> {
        self.expander
            .try_expand(text, |name| self.lookup_macro(index, name))
    }

    pub(crate) fn expand_value(&self, index: NodeIndex, value: &Value) -> ViewResult<Value> {
        match value {
            Value::Iterator(iterator) => {
                let sources = iterator
                    .sources
                    .iter()
                    .map(|source| self.expand_value(index, source).map(|v| v.items()))
                    .collect::<ViewResult<Vec<_>>>()?;

                let mut ret = vec![];
                for template in template_texts(&iterator.template) {
                    ret.extend(expand_iterator_with(
                        &sources,
                        &template,
                        &self.expander,
                        |name| self.lookup_macro(index, name),
                    )?);
                }
                Ok(Value::Collection(ret.into_iter().map(Value::Scalar).collect()))
            }
            Value::Collection(items) => Ok(Value::Collection(
                items
                    .iter()
                    .map(|item| self.expand_value(index, item))
                    .collect::<ViewResult<_>>()?,
            )),
            other => other.try_map_text(&mut |text| self.expand_text(index, text)),
        }
    }

    /// The merged declarations, or the backing's current contents when nothing was declared.
    /// Declarations that start by appending build on the backing's current contents.
    pub(crate) fn raw_value(&self, index: NodeIndex) -> Value {
        let (content, map) = self.with(index, |d| (d.content.clone(), d.map.clone()));
        let current: Vec<Value> = map
            .current_values()
            .into_iter()
            .map(Value::Scalar)
            .collect();
        if content.is_empty() {
            return collapse(current);
        }
        if map.is_scalar_like() {
            content.resolve(Some(current))
        } else {
            content.result()
        }
    }

    fn resolved(&self, index: NodeIndex) -> ViewResult<Value> {
        self.drain(index)?;
        let raw = self.raw_value(index);
        self.expand_value(index, &raw)
    }

    fn value_of(&self, index: NodeIndex) -> ViewResult<String> {
        Ok(self.resolved(index)?.value())
    }
}

/// A handle to one view in a [`Views`] tree.
#[derive(Clone, Copy)]
pub struct View<'v> {
    views: &'v Views,
    index: NodeIndex,
}

impl<'v> View<'v> {
    pub(crate) fn index(&self) -> NodeIndex {
        self.index
    }

    pub(crate) fn views(&self) -> &'v Views {
        self.views
    }

    pub fn name(&self) -> Selector {
        self.views.with(self.index, |d| d.name.clone())
    }

    pub fn map_kind(&self) -> MapKind {
        self.views.with(self.index, |d| d.map.kind())
    }

    /// Whether the view has been accessed.
    pub fn is_active(&self) -> bool {
        self.views.with(self.index, |d| d.active)
    }

    /// Whether [`copy_to_model`](View::copy_to_model) already wrote this view.
    pub fn is_applied(&self) -> bool {
        self.views.with(self.index, |d| d.applied)
    }

    pub fn parent(&self) -> Option<View<'v>> {
        self.views.parent(self.index).map(|p| self.views.view(p))
    }

    /// The child at the dotted `path`, resolving aliases along the way.
    pub fn get(&self, path: &str) -> ViewResult<Option<View<'v>>> {
        Ok(self
            .views
            .lookup_path(self.index, &Selector::parse_path(path), Lookup::Bind)?
            .map(|i| self.views.view(i)))
    }

    pub fn child(&self, name: &Selector) -> ViewResult<Option<View<'v>>> {
        Ok(self
            .views
            .lookup_child(self.index, name, Lookup::Bind)?
            .map(|i| self.views.view(i)))
    }

    /// Every child, in the order they were first seen.
    pub fn children(&self) -> ViewResult<Vec<View<'v>>> {
        self.views.drain(self.index)?;
        Ok(self.views.with(self.index, |d| {
            d.children
                .values()
                .map(|&i| self.views.view(i))
                .collect()
        }))
    }

    /// Whether any property declaration was merged into this view.
    pub fn has_property(&self) -> bool {
        self.views.with(self.index, |d| !d.content.is_empty())
    }

    pub fn property(&self) -> PropertyNode {
        self.views.with(self.index, |d| d.content.clone())
    }

    /// The value with macros and iterators expanded.
    pub fn resolved(&self) -> ViewResult<Value> {
        self.views.resolved(self.index)
    }

    pub fn value(&self) -> ViewResult<String> {
        self.views.value_of(self.index)
    }

    pub fn values(&self) -> ViewResult<Vec<String>> {
        Ok(self.resolved()?.values())
    }

    pub fn metadata(&self) -> IndexMap<String, Value> {
        self.views.with(self.index, |d| d.metadata.clone())
    }

    pub fn metadata_value(&self, key: &str) -> ViewResult<Option<String>> {
        let Some(value) = self.views.with(self.index, |d| d.metadata.get(key).cloned()) else {
            return Ok(None);
        };
        Ok(Some(self.views.expand_value(self.index, &value)?.value()))
    }

    pub fn aliases(&self) -> IndexMap<String, Selector> {
        self.views.with(self.index, |d| d.aliases.clone())
    }

    /// Declare an alias on this view. Unlike aliases written in the document, these also
    /// redirect document declarations that have not been turned into views yet.
    pub fn add_alias<S: Into<String>>(&self, name: S, target: Selector) {
        let name = name.into();
        self.views.with_mut(self.index, |d| {
            d.host_aliases.insert(name.clone());
            d.aliases.insert(name, target);
        });
    }

    pub fn resolve_alias(&self, name: &str) -> Selector {
        self.views.resolve_alias(self.index, &Selector::new(name))
    }

    /// Bind `name` (possibly dotted) below this view. Takes effect on the next access.
    pub fn add_route<S: Into<Selector>>(&self, name: S, accessor: Accessor) {
        let name = name.into();
        debug!(view = %self.name(), route = %name, "route added");
        self.views.with_mut(self.index, |d| {
            d.initializers.push_back(Initializer {
                name,
                contribution: Contribution::Route(accessor),
                aliased: true,
            })
        });
    }

    /// Handlers added later are asked first.
    pub fn add_macro_handler(&self, handler: impl Fn(&str) -> Option<String> + 'static) {
        self.views
            .with_mut(self.index, |d| d.macro_handlers.push(Rc::new(handler)));
    }

    pub fn expand(&self, text: &str) -> ViewResult<String> {
        self.views.expand_text(self.index, text)
    }

    /// Expand `text` with `${each}`, `${0}`, `${1}`, ... bound to `items` for names no view
    /// resolves.
    pub fn expand_with_items(&self, text: &str, items: &[Value]) -> ViewResult<String> {
        let each = EachItems(items);
        self.views.expander.try_expand(text, |name| {
            match self.views.lookup_macro(self.index, name)? {
                Some(value) => Ok(Some(value)),
                None => Ok(each.resolve(name)),
            }
        })
    }
}

impl std::fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("name", &self.name().to_string())
            .field("map", &self.map_kind())
            .finish()
    }
}
