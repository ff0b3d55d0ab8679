use thiserror::Error;

/// Errors that can occur when loading a schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// JSON deserialization failed.
    #[error("invalid schema JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The schema file could not be read.
    #[error("cannot read schema {path}: {source}")]
    Io {
        /// Path that was being read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Two tags share a short name (compared case-insensitively).
    #[error("duplicate tag name '{0}'")]
    DuplicateTag(String),

    /// A tag names a parent that does not exist.
    #[error("tag '{tag}' has unknown parent '{parent}'")]
    UnknownParent {
        /// The tag with the dangling reference.
        tag: String,
        /// The parent it names.
        parent: String,
    },

    /// A value tag (`#`) has no parent, or its parent already has one.
    #[error("misplaced value tag under '{0}'")]
    MisplacedValueTag(String),

    /// A tag references a unit class that does not exist.
    #[error("tag '{tag}' references unknown unit class '{class}'")]
    UnknownUnitClass {
        /// The referencing tag.
        tag: String,
        /// The missing class.
        class: String,
    },

    /// A tag references a value class that does not exist.
    #[error("tag '{tag}' references unknown value class '{class}'")]
    UnknownValueClass {
        /// The referencing tag.
        tag: String,
        /// The missing class.
        class: String,
    },

    /// A value class pattern failed to compile.
    #[error("value class '{class}' has an invalid pattern: {source}")]
    InvalidPattern {
        /// The value class.
        class: String,
        /// Compilation error.
        #[source]
        source: regex::Error,
    },

    /// The parent chain of a tag loops back on itself.
    #[error("tag '{0}' is its own ancestor")]
    Cycle(String),
}
