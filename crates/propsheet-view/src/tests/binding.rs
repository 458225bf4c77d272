use crate::tests::{value, views};
use crate::{
    Accessor, ListAccessor, MapKind, RouteTable, ValueAccessor, ViewError,
};
use pretty_assertions::assert_eq;
use propsheet_syntax::{NodeError, NodeKind, Operation, Selector, Value};
use std::cell::RefCell;
use std::rc::Rc;

fn slot() -> ValueAccessor {
    ValueAccessor::cell(Rc::new(RefCell::new(String::new())))
}

#[test_log::test]
fn views_follow_the_document() {
    let v = views(
        r#"
nuget {
    version = 1.0;
    files { include += a.h; include += b.h; }
}
"#,
        RouteTable::new(),
    );

    let root = v.root();
    let nuget = root.get("nuget").unwrap().unwrap();
    assert_eq!(nuget.map_kind(), MapKind::Node);
    assert_eq!(
        nuget
            .children()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>(),
        vec!["version", "files"]
    );
    assert_eq!(value(&v, "nuget.version"), "1.0");
    assert_eq!(
        root.get("nuget.files.include")
            .unwrap()
            .unwrap()
            .values()
            .unwrap(),
        vec!["a.h", "b.h"]
    );
    assert!(root.get("nuget.missing").unwrap().is_none());
}

#[test]
fn views_activate_on_access() {
    let v = views("a { b = 1; } c = 2;", RouteTable::new());
    let root = v.root();

    assert!(!root.is_active());
    let a = root.get("a").unwrap().unwrap();
    assert!(root.is_active());
    assert!(!a.is_active());

    a.children().unwrap();
    assert!(a.is_active());
    assert_eq!(a.parent().map(|p| p.name()), Some(Selector::new("")));
}

#[test_log::test]
fn later_contributions_are_merged_in_front() {
    let v = views("p = a;\nplatform += b;", RouteTable::new());
    v.root().add_alias("p", Selector::new("platform"));

    let platform = v.root().get("platform").unwrap().unwrap();
    let changes = platform
        .property()
        .changes()
        .iter()
        .map(|c| (c.value.clone(), c.operation))
        .collect::<Vec<_>>();
    assert_eq!(
        changes,
        vec![
            (Value::scalar("b"), Operation::AddToCollection),
            (Value::scalar("a"), Operation::Assignment),
        ]
    );
    assert_eq!(platform.value().unwrap(), "a");
    assert!(v.root().get("p").unwrap().is_some());
}

#[test_log::test]
fn document_node_is_rebound_by_a_later_route() {
    let cc = Rc::new(RefCell::new(String::new()));
    let v = views("tools { cc = gcc; }", RouteTable::new());
    v.root().add_route(
        "tools",
        Accessor::Object(RouteTable::new().value("cc", ValueAccessor::cell(cc.clone()))),
    );

    let tools = v.root().get("tools").unwrap().unwrap();
    assert_eq!(tools.map_kind(), MapKind::Object);
    assert_eq!(
        tools.get("cc").unwrap().unwrap().map_kind(),
        MapKind::Value
    );

    v.root().copy_to_model().unwrap();
    assert_eq!(*cc.borrow(), "gcc");
}

#[test_log::test]
fn placeholder_is_replaced_by_the_real_route() {
    let v = views("", RouteTable::new());
    let root = v.root();
    root.add_route("tools.cc", Accessor::Value(slot()));
    root.add_route(
        "tools",
        Accessor::Object(RouteTable::new().value("ld", slot())),
    );

    let tools = root.get("tools").unwrap().unwrap();
    assert_eq!(tools.map_kind(), MapKind::Object);
    assert_eq!(
        root.get("tools.cc").unwrap().unwrap().map_kind(),
        MapKind::Value
    );
    assert_eq!(
        root.get("tools.ld").unwrap().unwrap().map_kind(),
        MapKind::Value
    );
}

#[test]
fn placeholder_children_are_routed_once_bound() {
    let v = views("", RouteTable::new());
    let root = v.root();
    root.add_route("a.b.c", Accessor::Value(slot()));

    assert_eq!(
        root.get("a").unwrap().unwrap().map_kind(),
        MapKind::Placeholder
    );
    root.add_route(
        "a",
        Accessor::Object(RouteTable::new().object("b", RouteTable::new().value("d", slot()))),
    );

    assert_eq!(root.get("a").unwrap().unwrap().map_kind(), MapKind::Object);
    assert_eq!(root.get("a.b").unwrap().unwrap().map_kind(), MapKind::Object);
    assert_eq!(
        root.get("a.b.c").unwrap().unwrap().map_kind(),
        MapKind::Value
    );
    assert_eq!(
        root.get("a.b.d").unwrap().unwrap().map_kind(),
        MapKind::Value
    );
}

#[test]
fn two_concrete_routes_are_ambiguous() {
    let v = views("", RouteTable::new());
    v.root().add_route("x", Accessor::Value(slot()));
    v.root()
        .add_route("x", Accessor::List(ListAccessor::new(Vec::new)));

    let err = v.root().get("x").unwrap_err();
    assert_eq!(
        err,
        ViewError::AmbiguousMerge {
            name: Selector::new("x"),
            existing: MapKind::Value,
            incoming: MapKind::List,
        }
    );
    assert_eq!(
        err.to_string(),
        "`x` is bound to a value and to a list; neither can be replaced"
    );
}

#[test]
fn property_cannot_land_on_an_object_route() {
    let v = views("out = 1;", RouteTable::new().object("out", RouteTable::new()));

    assert_eq!(
        v.root().get("out").unwrap_err(),
        ViewError::Node(NodeError::KindMismatch {
            selector: Selector::new("out"),
            existing: NodeKind::Object,
            requested: NodeKind::Property,
        })
    );
}

#[test]
fn object_cannot_land_on_a_value_route() {
    let v = views("out { a = 1; }", RouteTable::new().value("out", slot()));

    assert!(matches!(
        v.root().get("out"),
        Err(ViewError::Node(NodeError::KindMismatch {
            existing: NodeKind::Property,
            requested: NodeKind::Object,
            ..
        }))
    ));
}

#[test_log::test]
fn aliases_resolve_through_the_parent_chain() {
    let v = views(
        r#"
@alias platforms = configurations.platform.choices;
configurations {
    platform { choices: { x86, x64 }; }
}
"#,
        RouteTable::new(),
    );
    let root = v.root();

    assert_eq!(
        root.get("platforms").unwrap().unwrap().values().unwrap(),
        vec!["x86", "x64"]
    );
    assert_eq!(
        root.resolve_alias("platforms"),
        "configurations.platform.choices".parse::<Selector>().unwrap()
    );

    let platform = root.get("configurations.platform").unwrap().unwrap();
    assert_eq!(
        platform.resolve_alias("platforms"),
        "configurations.platform.choices".parse::<Selector>().unwrap()
    );
}

#[test]
fn unknown_alias_is_a_literal_name() {
    let v = views("a { b = 1; }", RouteTable::new());
    let b = v.root().get("a.b").unwrap().unwrap();

    assert_eq!(b.resolve_alias("whatever"), Selector::new("whatever"));
}

#[test]
fn alias_prefix_keeps_the_rest_of_the_path() {
    let v = views("settings { debug { level = 3; } }", RouteTable::new());
    v.root().add_alias("s", Selector::new("settings"));

    assert_eq!(
        v.root().resolve_alias("s.debug"),
        "settings.debug".parse::<Selector>().unwrap()
    );
    assert_eq!(value(&v, "s.debug.level"), "3");
}

#[test]
fn metadata_is_carried_onto_views() {
    let v = views(
        r#"
nuget {
    #owner: someone;
    #tag = ${kind}-pkg;
}
kind = native;
"#,
        RouteTable::new(),
    );
    let nuget = v.root().get("nuget").unwrap().unwrap();

    assert_eq!(
        nuget.metadata().get("owner"),
        Some(&Value::scalar("someone"))
    );
    assert_eq!(
        nuget.metadata_value("tag").unwrap(),
        Some("native-pkg".to_string())
    );
    assert_eq!(nuget.metadata_value("missing").unwrap(), None);
}

#[test_log::test]
fn document_aliases_are_not_applied_twice() {
    let v = views(
        r#"
@alias platform = configurations.platform;
platform { choices: { x86, x64 }; }
"#,
        RouteTable::new(),
    );
    let root = v.root();

    let configurations = root.get("configurations").unwrap().unwrap();
    let names = |view: crate::View<'_>| {
        view.children()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(configurations), vec!["platform"]);

    let platform = configurations.get("platform").unwrap().unwrap();
    assert_eq!(names(platform), vec!["choices"]);
    assert_eq!(
        root.get("configurations.platform.choices")
            .unwrap()
            .unwrap()
            .values()
            .unwrap(),
        vec!["x86", "x64"]
    );
    // the alias is anchored where it was declared, so both spellings agree
    assert_eq!(
        root.get("platform.choices").unwrap().unwrap().index(),
        platform.get("choices").unwrap().unwrap().index()
    );
}

#[test]
fn ancestor_alias_targets_are_relative_to_the_declaring_view() {
    let v = views(
        r#"
@alias flags = build.settings.flags;
build { settings { flags += -O2; } }
tools { cc = gcc; }
"#,
        RouteTable::new(),
    );
    let tools = v.root().get("tools").unwrap().unwrap();

    let flags = tools.child(&Selector::new("flags")).unwrap().unwrap();
    assert_eq!(flags.value().unwrap(), "-O2");
    assert!(tools.get("build").unwrap().is_none());
}

#[test]
fn host_alias_into_a_nested_object_redirects_once() {
    let v = views("p = a; x { q = 1; }", RouteTable::new());
    v.root().add_alias("p", "x.p".parse::<Selector>().unwrap());

    let x = v.root().get("x").unwrap().unwrap();
    let mut names = x
        .children()
        .unwrap()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["p", "q"]);
    assert!(x.get("x").unwrap().is_none());
    assert_eq!(value(&v, "x.p"), "a");
}
