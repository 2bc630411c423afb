// SPDX-License-Identifier: MIT OR Apache-2.0
//! Data model errors.

use crate::value::PropertyType;
use thiserror::Error;

/// Errors raised when reading or writing a data model
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataModelError {
    /// The path is empty or has empty segments
    #[error("Invalid data model path: '{0}'")]
    InvalidPath(String),

    /// Nothing is defined at the path
    #[error("Data model path not found: '{0}'")]
    PathNotFound(String),

    /// An intermediate segment is not an object
    #[error("Segment '{0}' is not an object")]
    NotAnObject(String),

    /// The property at the path is not an event
    #[error("Property '{0}' is not an event")]
    NotAnEvent(String),

    /// The value does not match the declared property type
    #[error("Type mismatch at '{path}': expected {expected}, got {actual}")]
    TypeMismatch {
        /// Property path
        path: String,
        /// Declared type
        expected: PropertyType,
        /// Type of the rejected value
        actual: PropertyType,
    },
}

/// Result type for data model operations
pub type Result<T> = std::result::Result<T, DataModelError>;
