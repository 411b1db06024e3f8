//! Compile-time error taxonomy.
//!
//! Every error here is fatal and non-retryable: compilation is a pure
//! function from tree + dialect to text, and an inconsistent input tree is
//! a programming error on the caller's side, not a transient condition.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    /// An operator, function hook, or SQL feature has no rendering for the
    /// current dialect.
    #[error("Unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// The input tree is contradictory or ambiguous (duplicate unrelated
    /// CTE names, conflicting bind parameters, compound column mismatch).
    #[error("Structural conflict: {0}")]
    StructuralConflict(String),

    /// A required property is absent (unnamed constraint needing DROP,
    /// column with no assigned name).
    #[error("Missing requirement: {0}")]
    MissingRequirement(String),

    /// A correct construct the target dialect cannot express at all.
    #[error("Dialect '{dialect}' cannot express this statement: {message}")]
    CapabilityGap { dialect: String, message: String },

    /// Expression tree nesting exceeded the compiler's recursion guard.
    #[error("Expression tree exceeds maximum nesting depth of {0}")]
    NestingTooDeep(usize),
}

impl CompileError {
    /// Create an UnsupportedConstruct error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::UnsupportedConstruct(message.into())
    }

    /// Create a StructuralConflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::StructuralConflict(message.into())
    }

    /// Create a MissingRequirement error.
    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingRequirement(message.into())
    }

    /// Create a CapabilityGap error naming the dialect.
    pub fn capability(dialect: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CapabilityGap {
            dialect: dialect.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for compilation operations.
pub type CompileResult<T> = Result<T, CompileError>;
