use propsheet_pivots::PivotError;
use propsheet_syntax::ParseError;
use propsheet_view::ViewError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PropertySheetError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    View(#[from] ViewError),

    #[error(transparent)]
    Pivot(#[from] PivotError),
}

impl PropertySheetError {
    /// Whether the message already names the file and position it refers to.
    pub fn is_located(&self) -> bool {
        matches!(self, PropertySheetError::Parse(_))
    }
}

pub type PropertySheetResult<T> = Result<T, PropertySheetError>;
