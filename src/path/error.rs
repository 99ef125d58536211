//! Error types for resource path parsing

use thiserror::Error;

/// Structural violation in a resource path. Always a client input error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Nothing addressable after stripping separators
    #[error("Resource path is empty")]
    EmptyPath,

    /// Double separator in the middle of the path
    #[error("Empty path segment at position {position}")]
    EmptySegment { position: usize },

    /// Quoted literal never closed
    #[error("Unterminated quote in '{segment}'")]
    UnterminatedQuote { segment: String },

    /// Key predicate entry without `name=value` shape
    #[error("Invalid key pair '{pair}'")]
    InvalidKeyPair { pair: String },

    /// Same key property named twice
    #[error("Duplicate key property '{name}'")]
    DuplicateKey { name: String },

    /// `Set()` with nothing between the parentheses
    #[error("Empty key predicate in '{segment}'")]
    EmptyKey { segment: String },

    /// Key predicate parentheses not closed at the end of the segment
    #[error("Unbalanced parentheses in '{segment}'")]
    UnbalancedParentheses { segment: String },

    /// Key predicate with no entity set in front of it
    #[error("Missing entity set name in '{segment}'")]
    MissingEntitySet { segment: String },

    /// Percent-encoding that does not decode to UTF-8
    #[error("Invalid percent-encoding in '{segment}'")]
    InvalidEncoding { segment: String },
}
