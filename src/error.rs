//! Error types: fatal configuration mistakes and accumulated parse
//! diagnostics.

use thiserror::Error;

/// Raised by configuration methods. These are programming errors in the
/// caller's setup, not input problems, and fail the registration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("tag '{0}' is not in the allowed list")]
    UnknownTag(String),

    #[error("attribute '{attr}' is not allowed on tag '{tag}'")]
    UnknownAttr { tag: String, attr: String },

    #[error("invalid #regexp pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("'{0}' is not a recognized special character")]
    UnknownSpecialChar(char),
}

/// Markup diagnostics collected while parsing. They never abort the
/// parse; the output is always produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected closing tag '{tag}'")]
    UnexpectedCloseTag { tag: String },

    #[error("closing tag '{found}' does not match open tag '{expected}'")]
    MismatchedCloseTag { expected: String, found: String },

    #[error("invalid value '{value}' for attribute '{attr}' of tag '{tag}'")]
    InvalidAttrValue {
        tag: String,
        attr: String,
        value: String,
    },

    #[error("markup nested deeper than {limit} levels")]
    TooDeep { limit: usize },
}
