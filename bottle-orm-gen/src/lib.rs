//! # Bottle ORM Generator
//!
//! Reads a live database schema and generates Bottle ORM model modules from
//! it: one `#[derive(Model)]` struct per table plus a `mod.rs` index.
//!
//! Supported dialects are PostgreSQL, MySQL, MariaDB and SQLite (through
//! `sqlx`) and SQL Server (through a caller-supplied [`Connection`]).

// Module declarations
pub mod associations;
pub mod case;
pub mod config;
pub mod connection;
pub mod dialects;
pub mod errors;
pub mod extractor;
pub mod generator;
pub mod inflect;
pub mod metadata;
pub mod synthesizer;
pub mod typemap;

// Re-exports for the public API
pub use associations::{AssociationCache, AssociationsParsed};
pub use case::{Case, CaseSpec, CaseTransform, IdentifierClass, IdentifierTransform};
pub use config::{ConnectionConfig, GeneratorConfig, MetadataConfig, OutputConfig};
pub use connection::{Connection, Dialect, Row, SqlxConnection, Value};
pub use dialects::DialectAdapter;
pub use errors::{Error, Result};
pub use extractor::MetadataExtractor;
pub use generator::{ArtifactWriter, BuildOutput, Generator, Linter};
pub use metadata::{
    AssociationKind, AssociationMetadata, ColumnMetadata, Diagnostic, ForeignKeyMetadata, IndexMetadata,
    TableMetadata, TableName,
};
pub use synthesizer::{Artifact, CodeSynthesizer, ORM_KEYS, SynthesisOptions};
pub use typemap::HostType;
