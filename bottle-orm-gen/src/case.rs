//! # Case Transformation Module
//!
//! Renames identifiers of extracted metadata for code generation while the
//! catalog spelling stays available in every `origin_name`.
//!
//! A [`CaseTransform`] is one of:
//!
//! - a single [`Case`] applied to every identifier,
//! - a per-[`IdentifierClass`] pair (one case for tables, one for columns),
//! - a custom [`IdentifierTransform`] capability.
//!
//! Transformation always starts from the original identifier, never from an
//! already transformed one. Applying a transform twice to the same metadata
//! is the caller's mistake to avoid.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::{fmt, str::FromStr, sync::Arc};

use heck::{ToLowerCamelCase, ToShoutySnakeCase, ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    errors::{Error, Result},
    metadata::TableMetadata,
};

// ============================================================================
// Cases
// ============================================================================

/// A named identifier case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Case {
    Upper,
    Lower,
    #[serde(alias = "underscored")]
    Snake,
    Camel,
    Pascal,
    #[serde(alias = "constant")]
    Const,
}

impl Case {
    pub fn apply(&self, identifier: &str) -> String {
        match self {
            Case::Upper => identifier.to_uppercase(),
            Case::Lower => identifier.to_lowercase(),
            Case::Snake => identifier.to_snake_case(),
            Case::Camel => identifier.to_lower_camel_case(),
            Case::Pascal => identifier.to_upper_camel_case(),
            Case::Const => identifier.to_shouty_snake_case(),
        }
    }
}

impl FromStr for Case {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upper" => Ok(Case::Upper),
            "lower" => Ok(Case::Lower),
            "snake" | "underscored" => Ok(Case::Snake),
            "camel" => Ok(Case::Camel),
            "pascal" => Ok(Case::Pascal),
            "const" | "constant" => Ok(Case::Const),
            other => Err(Error::Config(format!("unknown case `{}`", other))),
        }
    }
}

/// Whether an identifier names a table ("model") or a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierClass {
    Model,
    Column,
}

// ============================================================================
// Transform Specification
// ============================================================================

/// Serializable form of a case transform, as read from configuration.
///
/// Accepts either `"pascal"` or `{ "model": "pascal", "column": "snake" }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CaseSpec {
    Uniform(Case),
    PerClass { model: Case, column: Case },
}

impl FromStr for CaseSpec {
    type Err = Error;

    /// Parses `case` or `modelCase:columnCase`.
    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((model, column)) => Ok(CaseSpec::PerClass { model: model.parse()?, column: column.parse()? }),
            None => Ok(CaseSpec::Uniform(s.parse()?)),
        }
    }
}

/// A user supplied renaming capability.
pub trait IdentifierTransform: Send + Sync {
    fn transform(&self, identifier: &str, class: IdentifierClass) -> String;
}

impl<F> IdentifierTransform for F
where
    F: Fn(&str, IdentifierClass) -> String + Send + Sync,
{
    fn transform(&self, identifier: &str, class: IdentifierClass) -> String {
        self(identifier, class)
    }
}

/// A resolved case transform.
#[derive(Clone)]
pub enum CaseTransform {
    Uniform(Case),
    PerClass { model: Case, column: Case },
    Custom(Arc<dyn IdentifierTransform>),
}

impl CaseTransform {
    pub fn custom<T: IdentifierTransform + 'static>(transform: T) -> Self {
        CaseTransform::Custom(Arc::new(transform))
    }

    /// Renames one identifier.
    pub fn apply(&self, identifier: &str, class: IdentifierClass) -> String {
        match self {
            CaseTransform::Uniform(case) => case.apply(identifier),
            CaseTransform::PerClass { model, column } => match class {
                IdentifierClass::Model => model.apply(identifier),
                IdentifierClass::Column => column.apply(identifier),
            },
            CaseTransform::Custom(transform) => transform.transform(identifier, class),
        }
    }

    /// Renames a table, its columns and every cross reference held by its
    /// foreign keys and associations. `origin_name` fields are untouched.
    pub fn transform_table(&self, mut table: TableMetadata) -> TableMetadata {
        let model = |id: &str| self.apply(id, IdentifierClass::Model);
        let column = |id: &str| self.apply(id, IdentifierClass::Column);
        let column_opt = |id: &Option<String>| id.as_deref().map(column);

        table.name = model(&table.origin_name);

        for col in table.columns.values_mut() {
            col.name = column(&col.origin_name);
            if let Some(fk) = col.foreign_key.as_mut() {
                fk.name = column(&fk.name);
                fk.target_model = model(&fk.target_model);
                fk.target_key = column_opt(&fk.target_key);
            }
        }

        for assoc in table.associations.iter_mut() {
            assoc.target_model = model(&assoc.target_model);
            assoc.join_model = assoc.join_model.as_deref().map(model);
            assoc.source_key = column_opt(&assoc.source_key);
            assoc.target_key = column_opt(&assoc.target_key);
            assoc.foreign_key = column_opt(&assoc.foreign_key);
            assoc.other_key = column_opt(&assoc.other_key);
            assoc.target_alias = column_opt(&assoc.target_alias);
            assoc.target_model_prop_name = column_opt(&assoc.target_model_prop_name);
        }

        table
    }
}

impl From<CaseSpec> for CaseTransform {
    fn from(spec: CaseSpec) -> Self {
        match spec {
            CaseSpec::Uniform(case) => CaseTransform::Uniform(case),
            CaseSpec::PerClass { model, column } => CaseTransform::PerClass { model, column },
        }
    }
}

impl Default for CaseTransform {
    /// Rust naming conventions: `PascalCase` models, `snake_case` fields.
    fn default() -> Self {
        CaseTransform::PerClass { model: Case::Pascal, column: Case::Snake }
    }
}

impl fmt::Debug for CaseTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaseTransform::Uniform(case) => f.debug_tuple("Uniform").field(case).finish(),
            CaseTransform::PerClass { model, column } => {
                f.debug_struct("PerClass").field("model", model).field("column", column).finish()
            }
            CaseTransform::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
