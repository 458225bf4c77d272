use crate::map::MapKind;
use propsheet_syntax::{NodeError, Selector};
use propsheet_util::expand::ExpandError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    #[error("`{name}` is bound to {existing} and to {incoming}; neither can be replaced")]
    AmbiguousMerge {
        name: Selector,
        existing: MapKind,
        incoming: MapKind,
    },

    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Expand(#[from] ExpandError),
}

pub type ViewResult<T> = Result<T, ViewError>;
