//! Writing view contents back into the host through each view's accessor.

use crate::errors::ViewResult;
use crate::map::Map;
use crate::view::{View, Views};
use itertools::Itertools;
use petgraph::stable_graph::NodeIndex;
use tracing::{debug, trace};

impl View<'_> {
    /// Write every declared value at or below this view into its backing. Each view is
    /// written at most once; views without declarations are left alone.
    pub fn copy_to_model(&self) -> ViewResult<()> {
        let views = self.views();
        let mut stack = vec![self.index()];

        while let Some(index) = stack.pop() {
            views.drain(index)?;
            write(views, index)?;

            let children: Vec<NodeIndex> =
                views.with(index, |d| d.children.values().copied().collect());
            stack.extend(children.into_iter().rev());
        }
        Ok(())
    }
}

fn write(views: &Views, index: NodeIndex) -> ViewResult<()> {
    let (name, map, content, applied) = views.with(index, |d| {
        (d.name.clone(), d.map.clone(), d.content.clone(), d.applied)
    });
    if applied || content.is_empty() {
        return Ok(());
    }

    match &map {
        Map::Value(accessor) => {
            let value = views.expand_value(index, &views.raw_value(index))?.value();
            trace!(view = %name, %value, "writing value");
            if !accessor.set(value) {
                debug!(view = %name, "value is read-only, not written");
            }
        }
        Map::List(accessor) => {
            let values = views.expand_value(index, &content.result())?.values();
            trace!(view = %name, values = %values.iter().join(", "), "writing list");

            if content.is_append_only() && accessor.can_add() {
                for value in values {
                    accessor.add(value);
                }
            } else if accessor.can_set() {
                let values = if content.is_append_only() {
                    accessor.get().into_iter().chain(values).collect()
                } else {
                    values
                };
                accessor.set(values);
            } else if accessor.can_add() {
                for value in values {
                    accessor.add(value);
                }
            } else {
                debug!(view = %name, "list is read-only, not written");
            }
        }
        other => {
            debug!(view = %name, kind = %other.kind(), "nothing to write for this backing");
        }
    }

    views.with_mut(index, |d| d.applied = true);
    Ok(())
}
