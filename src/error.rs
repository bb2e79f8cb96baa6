// SPDX-License-Identifier: MIT

//! Typed error handling for steprule
//!
//! Only the loader and the registry can fail. Compilation and resolution
//! report their soft failures as diagnostics or as an absent value.

use thiserror::Error;

/// Top-level error type for steprule
#[derive(Debug, Error)]
pub enum FlowError {
    /// Root input is missing or is not a mapping of step definitions
    #[error("Invalid form definition")]
    InvalidDefinition,

    /// A step or selector could not be decoded
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// A rule names a predicate that was never registered
    #[error("Predicate '{name}' not registered")]
    UnknownPredicate { name: String },

    /// A selector names a key function that was never registered
    #[error("Key function '{name}' not registered")]
    UnknownKeyFunction { name: String },

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl FlowError {
    /// Create an unknown predicate error
    pub fn unknown_predicate(name: impl Into<String>) -> Self {
        Self::UnknownPredicate { name: name.into() }
    }

    /// Create an unknown key function error
    pub fn unknown_key_function(name: impl Into<String>) -> Self {
        Self::UnknownKeyFunction { name: name.into() }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
