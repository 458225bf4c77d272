use crate::errors::NodeError;
use crate::selector::Selector;
use crate::value::Value;
use derive_more::{Display, From};
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `name = value`
    Assignment,
    /// `name += value`
    AddToCollection,
    /// `name: value`
    CollectionAssignment,
}

/// One textual write to a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub value: Value,
    pub operation: Operation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum NodeKind {
    #[display("an object")]
    Object,
    #[display("a property")]
    Property,
}

#[derive(Debug, Clone, PartialEq, Eq, From)]
pub enum Node {
    Object(ObjectNode),
    Property(PropertyNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Object(_) => NodeKind::Object,
            Node::Property(_) => NodeKind::Property,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectNode> {
        match self {
            Node::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_property(&self) -> Option<&PropertyNode> {
        match self {
            Node::Property(p) => Some(p),
            _ => None,
        }
    }
}

/// All declarations that wrote to one property, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyNode {
    changes: Vec<Change>,
    metadata: IndexMap<String, Value>,
}

impl PropertyNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: Value, operation: Operation) {
        self.changes.push(Change { value, operation });
    }

    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Put `changes` in front of the existing ones, keeping their relative order.
    pub fn insert_front(&mut self, changes: impl IntoIterator<Item = Change>) {
        let tail = std::mem::take(&mut self.changes);
        self.changes.extend(changes);
        self.changes.extend(tail);
    }

    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }

    pub fn set_metadata<S: Into<String>>(&mut self, key: S, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Whether resolving starts from the current contents of the target, i.e. the first
    /// recorded write is an append.
    pub fn appends_to_existing(&self) -> bool {
        matches!(
            self.changes.first(),
            Some(Change {
                operation: Operation::AddToCollection,
                ..
            })
        )
    }

    /// Every change appends; nothing resets what was there before.
    pub fn is_append_only(&self) -> bool {
        self.changes
            .iter()
            .all(|c| c.operation == Operation::AddToCollection)
    }

    /// Replay the changes into a value. See [`PropertyNode::resolve`].
    pub fn result(&self) -> Value {
        self.resolve(None)
    }

    /// Replay the changes against an accumulator. `seed` is used as the starting contents
    /// when the first change is an append; assignments clear the accumulator, appends add to
    /// it. No elements is an empty scalar, one element is returned as itself, more than one
    /// is a collection.
    pub fn resolve(&self, seed: Option<Vec<Value>>) -> Value {
        let mut acc: Vec<Value> = match seed {
            Some(seed) if self.appends_to_existing() => seed,
            _ => vec![],
        };

        for change in &self.changes {
            match change.operation {
                Operation::Assignment | Operation::CollectionAssignment => {
                    acc.clear();
                    push_value(&mut acc, &change.value);
                }
                Operation::AddToCollection => push_value(&mut acc, &change.value),
            }
        }

        collapse(acc)
    }
}

fn push_value(acc: &mut Vec<Value>, value: &Value) {
    match value {
        Value::Collection(items) => acc.extend(items.iter().cloned()),
        other => acc.push(other.clone()),
    }
}

/// Zero elements is an empty scalar, exactly one is unwrapped, more is a collection.
pub fn collapse(mut items: Vec<Value>) -> Value {
    match items.len() {
        0 => Value::empty(),
        1 => items.remove(0),
        _ => Value::Collection(items),
    }
}

/// An object in the parsed document: named children (objects or properties), aliases and
/// metadata. Children keep declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectNode {
    children: IndexMap<Selector, Node>,
    aliases: IndexMap<String, Selector>,
    metadata: IndexMap<String, Value>,
}

impl ObjectNode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn children(&self) -> impl Iterator<Item = (&Selector, &Node)> {
        self.children.iter()
    }

    pub fn child(&self, selector: &Selector) -> Option<&Node> {
        self.children.get(selector)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.aliases.is_empty() && self.metadata.is_empty()
    }

    /// Return the child object at `selector`, creating it if needed.
    pub fn object_mut(&mut self, selector: &Selector) -> Result<&mut ObjectNode, NodeError> {
        let node = self
            .children
            .entry(selector.clone())
            .or_insert_with(|| Node::Object(ObjectNode::new()));
        match node {
            Node::Object(o) => Ok(o),
            Node::Property(_) => Err(NodeError::KindMismatch {
                selector: selector.clone(),
                existing: NodeKind::Property,
                requested: NodeKind::Object,
            }),
        }
    }

    /// Return the property at `selector`, creating it if needed.
    pub fn property_mut(&mut self, selector: &Selector) -> Result<&mut PropertyNode, NodeError> {
        let node = self
            .children
            .entry(selector.clone())
            .or_insert_with(|| Node::Property(PropertyNode::new()));
        match node {
            Node::Property(p) => Ok(p),
            Node::Object(_) => Err(NodeError::KindMismatch {
                selector: selector.clone(),
                existing: NodeKind::Object,
                requested: NodeKind::Property,
            }),
        }
    }

    /// Walk (creating as needed) a chain of child objects.
    pub fn object_at_mut(&mut self, path: &[Selector]) -> Result<&mut ObjectNode, NodeError> {
        let mut current = self;
        for selector in path {
            current = current.object_mut(selector)?;
        }
        Ok(current)
    }

    pub fn get_path(&self, path: &[Selector]) -> Option<&Node> {
        let (last, init) = path.split_last()?;
        let mut current = self;
        for selector in init {
            current = current.children.get(selector)?.as_object()?;
        }
        current.children.get(last)
    }

    pub fn object_at(&self, path: &[Selector]) -> Option<&ObjectNode> {
        if path.is_empty() {
            return Some(self);
        }
        self.get_path(path)?.as_object()
    }

    /// Look up a dotted path such as `configurations.platform.choices`.
    pub fn get(&self, path: &str) -> Option<&Node> {
        self.get_path(&Selector::parse_path(path))
    }

    pub fn object(&self, path: &str) -> Option<&ObjectNode> {
        self.get(path)?.as_object()
    }

    pub fn property(&self, path: &str) -> Option<&PropertyNode> {
        self.get(path)?.as_property()
    }

    pub fn aliases(&self) -> &IndexMap<String, Selector> {
        &self.aliases
    }

    pub fn add_alias<S: Into<String>>(&mut self, name: S, target: Selector) {
        self.aliases.insert(name.into(), target);
    }

    pub fn alias(&self, name: &str) -> Option<&Selector> {
        self.aliases.get(name)
    }

    pub fn metadata(&self) -> &IndexMap<String, Value> {
        &self.metadata
    }

    pub fn set_metadata<S: Into<String>>(&mut self, key: S, value: Value) {
        self.metadata.insert(key.into(), value);
    }
}

#[cfg(test)]
mod test {
    use crate::errors::NodeError;
    use crate::node::{NodeKind, ObjectNode, Operation, PropertyNode};
    use crate::selector::Selector;
    use crate::value::Value;
    use pretty_assertions::assert_eq;

    #[test]
    fn assign_then_appends() {
        let mut p = PropertyNode::new();
        p.push("x".into(), Operation::Assignment);
        p.push("y".into(), Operation::AddToCollection);
        p.push("z".into(), Operation::AddToCollection);
        assert_eq!(p.result(), Value::collection(["x", "y", "z"]));
    }

    #[test]
    fn later_assignment_resets() {
        let mut p = PropertyNode::new();
        p.push("a".into(), Operation::AddToCollection);
        p.push("b".into(), Operation::Assignment);
        assert_eq!(p.result(), Value::scalar("b"));

        p.push(Value::collection(["c", "d"]), Operation::CollectionAssignment);
        assert_eq!(p.result(), Value::collection(["c", "d"]));
    }

    #[test]
    fn shapes() {
        assert_eq!(PropertyNode::new().result(), Value::empty());

        let mut single = PropertyNode::new();
        single.push(Value::collection(["only"]), Operation::CollectionAssignment);
        assert_eq!(single.result(), Value::scalar("only"));
    }

    #[test]
    fn seed_only_applies_to_leading_append() {
        let seed = vec![Value::scalar("existing")];

        let mut append = PropertyNode::new();
        append.push("new".into(), Operation::AddToCollection);
        assert_eq!(
            append.resolve(Some(seed.clone())),
            Value::collection(["existing", "new"])
        );

        let mut assign = PropertyNode::new();
        assign.push("new".into(), Operation::Assignment);
        assign.push("more".into(), Operation::AddToCollection);
        assert_eq!(assign.resolve(Some(seed)), Value::collection(["new", "more"]));
    }

    #[test]
    fn resolution_is_repeatable() {
        let mut p = PropertyNode::new();
        p.push("a".into(), Operation::AddToCollection);
        p.push("b".into(), Operation::AddToCollection);
        assert_eq!(p.result(), p.result());
    }

    #[test]
    fn insert_front_keeps_relative_order() {
        let mut p = PropertyNode::new();
        p.push("c".into(), Operation::AddToCollection);
        let mut earlier = PropertyNode::new();
        earlier.push("a".into(), Operation::AddToCollection);
        earlier.push("b".into(), Operation::AddToCollection);

        p.insert_front(earlier.changes().to_vec());
        assert_eq!(p.result(), Value::collection(["a", "b", "c"]));
    }

    #[test]
    fn kind_mismatch() {
        let mut root = ObjectNode::new();
        root.property_mut(&Selector::new("a")).unwrap();
        assert_eq!(
            root.object_mut(&Selector::new("a")).unwrap_err(),
            NodeError::KindMismatch {
                selector: Selector::new("a"),
                existing: NodeKind::Property,
                requested: NodeKind::Object,
            }
        );

        root.object_mut(&Selector::new("b")).unwrap();
        assert!(root.property_mut(&Selector::new("b")).is_err());
    }

    #[test]
    fn dotted_lookup() {
        let mut root = ObjectNode::new();
        root.object_at_mut(&Selector::parse_path("x.y"))
            .unwrap()
            .property_mut(&Selector::new("z"))
            .unwrap()
            .push("v".into(), Operation::Assignment);

        assert!(root.object("x.y").is_some());
        assert_eq!(root.property("x.y.z").unwrap().result(), Value::scalar("v"));
        assert!(root.property("x.y").is_none());
    }
}
