//! # Metadata Module
//!
//! Canonical, dialect-independent description of a database schema.
//!
//! Dialect adapters produce these structures, the association resolver and
//! the case transformer refine them, and the synthesizer renders them. Every
//! renamable entity keeps its `origin_name` (the catalog spelling) next to its
//! `name` (the spelling used in generated code).
//!
//! ## Overview
//!
//! ```text
//! TableMetadata
//!  ├── columns: IndexMap<origin_name, ColumnMetadata>
//!  │     ├── indices: Vec<IndexMetadata>
//!  │     └── foreign_key: Option<ForeignKeyMetadata>
//!  └── associations: Vec<AssociationMetadata>
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::typemap::HostType;

// ============================================================================
// Table Identity
// ============================================================================

/// A table as listed by the catalog, before its columns are loaded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableName {
    pub schema: Option<String>,
    pub name: String,
    /// `schema.name` when a schema is known, otherwise `name`.
    pub full_table_name: String,
    /// Table comment, when the catalog stores one.
    pub comment: Option<String>,
}

impl TableName {
    pub fn new(schema: Option<&str>, name: &str) -> Self {
        let schema = schema.filter(|s| !s.is_empty()).map(str::to_string);
        let full_table_name = match &schema {
            Some(s) => format!("{}.{}", s, name),
            None => name.to_string(),
        };
        Self { schema, name: name.to_string(), full_table_name, comment: None }
    }

    pub fn with_comment(mut self, comment: Option<String>) -> Self {
        self.comment = comment.filter(|c| !c.trim().is_empty());
        self
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_table_name)
    }
}

// ============================================================================
// Index Metadata
// ============================================================================

/// One index a column participates in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    pub name: String,
    pub unique: bool,
    /// Access method (`BTREE`, `HASH`, `btree`, `NONCLUSTERED`, ...).
    pub using: Option<String>,
    /// Sort order of this column inside the index (`ASC`/`DESC`).
    pub collation: Option<String>,
    /// 1-based position of the column inside the index.
    pub seq: Option<i64>,
}

// ============================================================================
// Relationship Metadata
// ============================================================================

/// A column-level reference to another table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyMetadata {
    /// Name of the referencing column.
    pub name: String,
    pub target_model: String,
    /// Referenced column on the target table, when known.
    pub target_key: Option<String>,
    /// Two or more foreign keys of the same table reference `target_model`.
    pub has_multiple_for_same_target: bool,
}

/// Relationship kinds understood by the target framework.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssociationKind {
    HasOne,
    HasMany,
    BelongsTo,
    BelongsToMany,
}

impl AssociationKind {
    /// Whether navigation through this association yields a collection.
    pub fn is_many(&self) -> bool {
        matches!(self, AssociationKind::HasMany | AssociationKind::BelongsToMany)
    }

    /// Name used when documenting the association in generated code.
    pub fn attribute(&self) -> &'static str {
        match self {
            AssociationKind::HasOne => "has_one",
            AssociationKind::HasMany => "has_many",
            AssociationKind::BelongsTo => "belongs_to",
            AssociationKind::BelongsToMany => "belongs_to_many",
        }
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AssociationKind::HasOne => "HasOne",
            AssociationKind::HasMany => "HasMany",
            AssociationKind::BelongsTo => "BelongsTo",
            AssociationKind::BelongsToMany => "BelongsToMany",
        };
        f.write_str(name)
    }
}

/// A table-level relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationMetadata {
    pub kind: AssociationKind,
    pub target_model: String,
    /// Join table, present iff `kind` is `BelongsToMany`.
    pub join_model: Option<String>,
    pub source_key: Option<String>,
    pub target_key: Option<String>,
    /// Column holding the reference (on the target for `Has*`, on this table
    /// for `BelongsTo`, on the join table for `BelongsToMany`).
    pub foreign_key: Option<String>,
    /// Join-table column pointing at the target (`BelongsToMany` only).
    pub other_key: Option<String>,
    pub target_alias: Option<String>,
    /// Explicit navigation field name.
    pub target_model_prop_name: Option<String>,
    pub has_multiple_for_same_target: bool,
}

impl AssociationMetadata {
    pub fn new(kind: AssociationKind, target_model: &str) -> Self {
        Self {
            kind,
            target_model: target_model.to_string(),
            join_model: None,
            source_key: None,
            target_key: None,
            foreign_key: None,
            other_key: None,
            target_alias: None,
            target_model_prop_name: None,
            has_multiple_for_same_target: false,
        }
    }

    /// Identity used for deduplication: everything except derived aliases.
    pub(crate) fn same_relationship(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.target_model == other.target_model
            && self.join_model == other.join_model
            && self.source_key == other.source_key
            && self.target_key == other.target_key
            && self.foreign_key == other.foreign_key
            && self.other_key == other.other_key
    }
}

// ============================================================================
// Column Metadata
// ============================================================================

/// Everything known about one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMetadata {
    /// Name as spelled in the catalog.
    pub origin_name: String,
    /// Name used in generated code (after case transformation).
    pub name: String,
    /// Catalog type name, lower-cased (`int4`, `varchar`, `enum`).
    pub native_type: String,
    /// Full type signature when the catalog has one (`enum('AA','BB')`).
    pub native_type_extended: String,
    /// Type token handed to the framework (`INTEGER`, `STRING(255)`).
    pub canonical_mapping_type: String,
    pub canonical_host_type: HostType,
    pub primary_key: bool,
    pub auto_increment: bool,
    pub allow_null: bool,
    pub unique: bool,
    pub default_value: Option<String>,
    pub comment: Option<String>,
    pub indices: Vec<IndexMetadata>,
    pub foreign_key: Option<ForeignKeyMetadata>,
}

impl ColumnMetadata {
    /// Creates a column with the flags cleared; adapters fill in the rest.
    pub fn new(origin_name: &str, native_type: &str, mapping_type: String, host_type: HostType) -> Self {
        Self {
            origin_name: origin_name.to_string(),
            name: origin_name.to_string(),
            native_type: native_type.to_lowercase(),
            native_type_extended: native_type.to_lowercase(),
            canonical_mapping_type: mapping_type,
            canonical_host_type: host_type,
            primary_key: false,
            auto_increment: false,
            allow_null: true,
            unique: false,
            default_value: None,
            comment: None,
            indices: Vec::new(),
            foreign_key: None,
        }
    }

    /// Enforces the cross-field invariants (a primary key is never nullable).
    pub(crate) fn normalized(mut self) -> Self {
        if self.primary_key {
            self.allow_null = false;
        }
        if self.auto_increment {
            // a sequence-generated value is not a user default
            self.default_value = None;
        }
        self.comment = self.comment.filter(|c| !c.trim().is_empty());
        self
    }

    /// Must the value be supplied when creating a row?
    pub fn is_required(&self) -> bool {
        !self.auto_increment && !self.allow_null && self.default_value.is_none()
    }
}

// ============================================================================
// Table Metadata
// ============================================================================

/// A fully extracted table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub origin_name: String,
    pub name: String,
    pub schema: Option<String>,
    pub timestamps: bool,
    pub comment: Option<String>,
    /// Ordered by native ordinal position, keyed by `origin_name`.
    pub columns: IndexMap<String, ColumnMetadata>,
    pub associations: Vec<AssociationMetadata>,
}

impl TableMetadata {
    pub fn new(table: &TableName, timestamps: bool) -> Self {
        Self {
            origin_name: table.name.clone(),
            name: table.name.clone(),
            schema: table.schema.clone(),
            timestamps,
            comment: table.comment.clone(),
            columns: IndexMap::new(),
            associations: Vec::new(),
        }
    }

    /// `schema.origin_name`, or `origin_name` without a schema.
    pub fn full_table_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", s, self.origin_name),
            None => self.origin_name.clone(),
        }
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKeyMetadata> {
        self.columns.values().filter_map(|c| c.foreign_key.as_ref())
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.values().filter(|c| c.primary_key)
    }
}

// ============================================================================
// Diagnostics
// ============================================================================

/// A non-fatal finding, reported to the user but never aborting the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub table: String,
    pub column: String,
    pub message: String,
}

impl Diagnostic {
    pub fn unknown_type(table: &TableName, column: &str, native_type: &str, action: &str) -> Self {
        let diagnostic = Self {
            table: table.full_table_name.clone(),
            column: column.to_string(),
            message: format!("unknown native type `{}`, {}", native_type, action),
        };
        log::warn!("{}", diagnostic);
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.table, self.column, self.message)
    }
}

// ============================================================================
// Tests
// ============================================================================
