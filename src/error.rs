//! Rule construction errors.

use thiserror::Error;

/// Reason a filter rule could not be built or was marked invalid.
#[derive(Error, Clone, Debug)]
pub enum RuleError {
    #[error("rule text is empty")]
    EmptyRule,

    #[error("rule text does not contain the expected mask")]
    MissingMask,

    #[error("unknown option {0:?}")]
    UnknownOption(String),

    #[error("invalid regex: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("malformed attribute filter {0:?}")]
    MalformedAttribute(String),
}
