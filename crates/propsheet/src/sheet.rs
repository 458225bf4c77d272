use crate::errors::{PropertySheetError, PropertySheetResult};
use propsheet_pivots::{Pivots, Target};
use propsheet_syntax::{parse_file, parse_with, Document, ObjectNode, ParseOptions, Value};
use propsheet_util::expand::ExpandOptions;
use propsheet_view::{Accessor, RouteTable, View, Views};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A parsed property sheet together with the options used to read it.
#[derive(Debug, Clone)]
pub struct PropertySheet {
    document: Document,
    expand: ExpandOptions,
}

impl PropertySheet {
    pub fn parse(text: &str) -> PropertySheetResult<PropertySheet> {
        Self::parse_with(text, None, &ParseOptions::default())
    }

    /// Parse `text` as if it were read from `file` (which anchors relative imports).
    pub fn parse_with(
        text: &str,
        file: Option<&Path>,
        options: &ParseOptions,
    ) -> PropertySheetResult<PropertySheet> {
        Ok(PropertySheet::from(parse_with(text, file, options)?))
    }

    pub fn load<P: AsRef<Path>>(path: P, options: &ParseOptions) -> PropertySheetResult<PropertySheet> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading property sheet");
        Ok(PropertySheet::from(parse_file(path, options)?))
    }

    pub fn with_expand_options(mut self, expand: ExpandOptions) -> Self {
        self.expand = expand;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn root(&self) -> &ObjectNode {
        &self.document.root
    }

    pub fn file(&self) -> Option<&Path> {
        self.document.file.as_deref()
    }

    /// Every document imported while parsing, in import order.
    pub fn imports(&self) -> &[PathBuf] {
        &self.document.imports
    }

    /// Views over the sheet with nothing bound behind them.
    pub fn views(&self) -> Views {
        self.bind(RouteTable::new())
    }

    /// Views over the sheet bound to the host through `routes`.
    pub fn bind(&self, routes: RouteTable) -> Views {
        Views::bind(&self.document.root, Accessor::Object(routes), self.expand)
    }

    /// Bind to `routes` and write every declared value into the host.
    pub fn apply(&self, routes: RouteTable) -> PropertySheetResult<()> {
        let views = self.bind(routes);
        views.root().copy_to_model()?;
        Ok(())
    }

    /// The value at `path` with macros expanded, or `None` when nothing is declared there.
    pub fn get(&self, path: &str) -> PropertySheetResult<Option<Value>> {
        let views = self.views();
        let view = views.root().get(path)?;
        match view {
            Some(view) if view.has_property() => Ok(Some(view.resolved()?)),
            _ => Ok(None),
        }
    }

    /// The values at `path` as a list; empty when nothing is declared there.
    pub fn values(&self, path: &str) -> PropertySheetResult<Vec<String>> {
        Ok(self.get(path)?.map(|v| v.values()).unwrap_or_default())
    }

    /// The pivots declared under `configurations`, for one package.
    pub fn pivots(&self, package: &str) -> PropertySheetResult<Pivots> {
        let views = self.views();
        Ok(Pivots::from_root(views.root(), package)?)
    }

    /// Compile one pivot expression for `target`.
    pub fn condition(
        &self,
        expression: &str,
        package: &str,
        target: Target,
    ) -> PropertySheetResult<String> {
        Ok(self.pivots(package)?.compile(expression, target)?)
    }

    /// One line per declaration: `@alias`, `#metadata` and `path = value`, with macros
    /// expanded.
    pub fn dump(&self) -> PropertySheetResult<Vec<String>> {
        let views = self.views();
        let mut lines = vec![];
        dump_view(views.root(), "", &mut lines)?;
        Ok(lines)
    }
}

impl From<Document> for PropertySheet {
    fn from(document: Document) -> Self {
        PropertySheet {
            document,
            expand: ExpandOptions::default(),
        }
    }
}

fn dump_view(view: View<'_>, path: &str, lines: &mut Vec<String>) -> Result<(), PropertySheetError> {
    for (name, target) in view.aliases() {
        lines.push(format!("{path}@{name} = {target}"));
    }
    for key in view.metadata().keys() {
        let value = view.metadata_value(key)?.unwrap_or_default();
        lines.push(format!("{path}#{key} = {value}"));
    }
    if view.has_property() {
        lines.push(format!("{path} = {}", view.resolved()?));
    }

    for child in view.children()? {
        let child_path = if path.is_empty() {
            child.name().to_string()
        } else {
            format!("{path}.{}", child.name())
        };
        dump_view(child, &child_path, lines)?;
    }
    Ok(())
}
