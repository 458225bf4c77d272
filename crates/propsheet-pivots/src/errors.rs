use propsheet_view::ViewError;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PivotError {
    #[error("unmatched configuration choice `{token}` in `{expression}`")]
    UnknownChoice { token: String, expression: String },

    #[error("unknown pivot `{name}`")]
    UnknownPivot { name: String },

    #[error("unbalanced parentheses in `{expression}`")]
    UnbalancedParentheses { expression: String },

    #[error("unexpected `{token}` in `{expression}`")]
    UnexpectedToken { token: String, expression: String },

    #[error("`{expression}` ends where a choice was expected")]
    UnexpectedEnd { expression: String },

    #[error("`{expression}` is a raw MSBuild condition and cannot be evaluated")]
    NotEvaluable { expression: String },

    #[error("no `configurations` object to build pivots from")]
    MissingConfigurations,

    #[error("choice `{choice}` is declared twice in pivot `{pivot}`")]
    DuplicateChoice { pivot: String, choice: String },

    #[error(transparent)]
    View(#[from] ViewError),
}

pub type PivotResult<T> = Result<T, PivotError>;
