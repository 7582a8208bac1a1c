//! # Error Handling Module
//!
//! This module defines the error types used throughout the generator.
//! Every failure the pipeline can hit is funnelled into a single [`Error`]
//! enum so that the phases can propagate with `?`.
//!
//! ## Error Classes
//!
//! - **Fatal**: database/introspection failures and malformed association
//!   rows abort the build. No partial output is produced.
//! - **Recoverable**: unknown native column types are *not* errors. They are
//!   reported as [`crate::Diagnostic`] values and the build continues.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use bottle_orm_gen::{Error, Generator};
//!
//! match generator.build(&conn).await {
//!     Ok(output) => println!("{} models", output.artifacts.len()),
//!     Err(Error::InvalidAssociation { line, message }) => {
//!         eprintln!("associations file, line {}: {}", line, message)
//!     }
//!     Err(e) => eprintln!("generation failed: {}", e),
//! }
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// Error Enum Definition
// ============================================================================

/// The main error type for generator operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database driver error.
    ///
    /// Wraps connection failures and failed catalog queries coming from
    /// `sqlx`. Converted automatically through `#[from]`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A catalog row could not be normalized into column/table metadata.
    ///
    /// Raised by dialect adapters when a required catalog field is missing
    /// or has an unexpected shape. Always fatal.
    #[error("Introspection error ({dialect}): {message}")]
    Introspection { dialect: String, message: String },

    /// A line of the association specification is malformed.
    ///
    /// `line` is 1-based. The message names the offending field.
    #[error("Invalid association at line {line}: {message}")]
    InvalidAssociation { line: usize, message: String },

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The requested dialect cannot be served by the built-in connection.
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),

    /// File system error (association file, artifact writing).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON configuration could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The post-write linter reported a failure.
    #[error("Lint error: {0}")]
    Lint(String),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

// ============================================================================
// Helper Functions
// ============================================================================

impl Error {
    /// Creates a `Config` error from a string slice.
    pub fn config(msg: &str) -> Self {
        Error::Config(msg.to_string())
    }

    /// Creates an `Introspection` error for the given dialect.
    pub fn introspection(dialect: impl ToString, msg: impl Into<String>) -> Self {
        Error::Introspection { dialect: dialect.to_string(), message: msg.into() }
    }

    /// Creates an `InvalidAssociation` error for a 1-based line number.
    pub fn invalid_association(line: usize, msg: impl Into<String>) -> Self {
        Error::InvalidAssociation { line, message: msg.into() }
    }

    /// Creates a `Lint` error from a string slice.
    pub fn lint(msg: &str) -> Self {
        Error::Lint(msg.to_string())
    }
}
