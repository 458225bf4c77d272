mod binding;

use crate::{RouteTable, Views};
use propsheet_syntax::parse_str;

pub(crate) fn views(text: &str, routes: RouteTable) -> Views {
    let document = parse_str(text).unwrap();
    Views::new(&document.root, routes)
}

pub(crate) fn value(views: &Views, path: &str) -> String {
    views.root().get(path).unwrap().unwrap().value().unwrap()
}
