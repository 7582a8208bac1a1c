//! # Association Resolver Module
//!
//! Turns relationship rows into per-table associations and foreign keys.
//!
//! ## Association File Format
//!
//! One relationship per line, comma separated:
//!
//! ```text
//! # cardinality, leftKey, rightKey, leftTable, rightTable[, joinTable]
//! 1:N, race_id, race_id, races, units
//! 1:1, user_id, user_id, users, profiles
//! N:N, unit_id, battle_field_id, units, battle_fields, unit_battles
//! ```
//!
//! Blank lines and lines starting with `#` are ignored. Table tokens may be
//! schema qualified (`public.races`). A malformed line aborts the parse with
//! an error naming the line and the offending field.
//!
//! ## Resolution
//!
//! - `1:1` / `1:N`: the left table gets `HasOne` / `HasMany` towards the
//!   right table, the right table gets `BelongsTo` back plus a foreign key on
//!   `rightKey`.
//! - `N:N`: both tables get `BelongsToMany` through the join table, which
//!   receives one foreign key per side.
//!
//! Rows can also come from the catalog's foreign keys, see
//! [`rows_from_foreign_keys`].

// ============================================================================
// External Crate Imports
// ============================================================================

use std::{
    collections::HashMap,
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{Arc, Mutex, PoisonError},
};

use indexmap::IndexMap;
use serde::Serialize;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    errors::{Error, Result},
    extractor::CatalogForeignKey,
    inflect,
    metadata::{AssociationKind, AssociationMetadata, ForeignKeyMetadata, TableMetadata},
};

// ============================================================================
// Association Rows
// ============================================================================

/// Relationship multiplicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Cardinality {
    OneToOne,
    OneToMany,
    ManyToMany,
}

impl FromStr for Cardinality {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1:1" => Ok(Cardinality::OneToOne),
            "1:N" => Ok(Cardinality::OneToMany),
            "N:N" => Ok(Cardinality::ManyToMany),
            other => Err(format!("unrecognized cardinality `{}`", other)),
        }
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::OneToOne => f.write_str("1:1"),
            Cardinality::OneToMany => f.write_str("1:N"),
            Cardinality::ManyToMany => f.write_str("N:N"),
        }
    }
}

/// One validated relationship row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssociationRow {
    /// 1-based source line, 0 for rows derived from the catalog.
    pub line: usize,
    pub cardinality: Cardinality,
    pub left_key: String,
    pub right_key: String,
    pub left_table: String,
    pub right_table: String,
    pub join_table: Option<String>,
}

impl AssociationRow {
    /// Parses one non-blank line.
    pub fn parse(line: usize, text: &str) -> Result<Self> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        let field = |idx: usize| fields.get(idx).copied().unwrap_or("");

        let cardinality: Cardinality =
            field(0).parse().map_err(|msg: String| Error::invalid_association(line, msg))?;

        let required = |idx: usize, name: &str| -> Result<String> {
            match field(idx) {
                "" => Err(Error::invalid_association(line, format!("missing {}", name))),
                value => Ok(value.to_string()),
            }
        };

        let left_key = required(1, "leftKey")?;
        let right_key = required(2, "rightKey")?;
        let left_table = required(3, "leftTable")?;
        let right_table = required(4, "rightTable")?;
        let join_table = match (cardinality, field(5)) {
            (Cardinality::ManyToMany, "") => {
                return Err(Error::invalid_association(line, "missing joinTable for N:N"));
            }
            (_, "") => None,
            (_, join) => Some(join.to_string()),
        };

        Ok(Self { line, cardinality, left_key, right_key, left_table, right_table, join_table })
    }
}

/// Parses a whole association file. The first invalid line aborts the parse.
pub fn parse_rows(text: &str) -> Result<Vec<AssociationRow>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(idx, line)| AssociationRow::parse(idx + 1, line))
        .collect()
}

/// Derives relationship rows from catalog foreign keys.
///
/// A key becomes `1:1` when its column is unique or is the table's only
/// primary key column, `1:N` otherwise. A missing referenced column falls
/// back to the target table's single primary key.
pub fn rows_from_foreign_keys(keys: &[CatalogForeignKey], tables: &[TableMetadata]) -> Vec<AssociationRow> {
    keys.iter()
        .filter_map(|fk| {
            let source = tables.iter().find(|t| t.origin_name == fk.table.name && t.schema == fk.table.schema);
            let one_to_one = source.is_some_and(|table| {
                let pk_count = table.primary_keys().count();
                table
                    .columns
                    .get(&fk.key.column_name)
                    .is_some_and(|c| c.unique || (c.primary_key && pk_count == 1))
            });

            let target_key = fk.key.target_column.clone().or_else(|| {
                tables
                    .iter()
                    .find(|t| t.origin_name == fk.key.target_table)
                    .and_then(sole_primary_key)
            });
            let Some(target_key) = target_key else {
                log::warn!(
                    "{}.{}: cannot resolve the referenced column of {}, relationship skipped",
                    fk.table,
                    fk.key.column_name,
                    fk.key.target_table
                );
                return None;
            };

            let left_table = match &fk.key.target_schema {
                Some(schema) => format!("{}.{}", schema, fk.key.target_table),
                None => fk.key.target_table.clone(),
            };

            Some(AssociationRow {
                line: 0,
                cardinality: if one_to_one { Cardinality::OneToOne } else { Cardinality::OneToMany },
                left_key: target_key,
                right_key: fk.key.column_name.clone(),
                left_table,
                right_table: fk.table.full_table_name.clone(),
                join_table: None,
            })
        })
        .collect()
}

fn sole_primary_key(table: &TableMetadata) -> Option<String> {
    let mut keys = table.primary_keys();
    match (keys.next(), keys.next()) {
        (Some(pk), None) => Some(pk.origin_name.clone()),
        _ => None,
    }
}

// ============================================================================
// Resolved Associations
// ============================================================================

/// Relationships attached to one table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TableAssociations {
    pub foreign_keys: Vec<ForeignKeyMetadata>,
    pub associations: Vec<AssociationMetadata>,
}

impl TableAssociations {
    fn add_association(&mut self, association: AssociationMetadata) {
        if !self.associations.iter().any(|a| a.same_relationship(&association)) {
            self.associations.push(association);
        }
    }

    fn add_foreign_key(&mut self, key: ForeignKeyMetadata) {
        match self.foreign_keys.iter_mut().find(|k| k.name == key.name && k.target_model == key.target_model) {
            Some(existing) => {
                if existing.target_key.is_none() {
                    existing.target_key = key.target_key;
                }
            }
            None => self.foreign_keys.push(key),
        }
    }
}

/// Relationship graph keyed by table token (`schema.table` or `table`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AssociationsParsed {
    pub rows: Vec<AssociationRow>,
    pub tables: IndexMap<String, TableAssociations>,
}

impl AssociationsParsed {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(Self::from_rows(parse_rows(text)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let parsed = Self::parse(&text)?;
        log::info!("Parsed {} association rows from {}", parsed.rows.len(), path.display());
        Ok(parsed)
    }

    /// Resolves validated rows into per-table relationships.
    pub fn from_rows(rows: Vec<AssociationRow>) -> Self {
        let mut tables: IndexMap<String, TableAssociations> = IndexMap::new();

        for row in &rows {
            let left = bare_name(&row.left_table);
            let right = bare_name(&row.right_table);

            match row.cardinality {
                Cardinality::OneToOne | Cardinality::OneToMany => {
                    let kind = match row.cardinality {
                        Cardinality::OneToOne => AssociationKind::HasOne,
                        _ => AssociationKind::HasMany,
                    };
                    let mut has = AssociationMetadata::new(kind, right);
                    has.source_key = Some(row.left_key.clone());
                    has.foreign_key = Some(row.right_key.clone());
                    tables.entry(row.left_table.clone()).or_default().add_association(has);

                    let mut belongs = AssociationMetadata::new(AssociationKind::BelongsTo, left);
                    belongs.foreign_key = Some(row.right_key.clone());
                    belongs.target_key = Some(row.left_key.clone());
                    let right_entry = tables.entry(row.right_table.clone()).or_default();
                    right_entry.add_association(belongs);
                    right_entry.add_foreign_key(ForeignKeyMetadata {
                        name: row.right_key.clone(),
                        target_model: left.to_string(),
                        target_key: Some(row.left_key.clone()),
                        has_multiple_for_same_target: false,
                    });
                }
                Cardinality::ManyToMany => {
                    let Some(join_table) = row.join_table.as_deref() else { continue };
                    let join = bare_name(join_table);

                    let mut towards_right = AssociationMetadata::new(AssociationKind::BelongsToMany, right);
                    towards_right.join_model = Some(join.to_string());
                    towards_right.foreign_key = Some(row.left_key.clone());
                    towards_right.other_key = Some(row.right_key.clone());
                    tables.entry(row.left_table.clone()).or_default().add_association(towards_right);

                    let mut towards_left = AssociationMetadata::new(AssociationKind::BelongsToMany, left);
                    towards_left.join_model = Some(join.to_string());
                    towards_left.foreign_key = Some(row.right_key.clone());
                    towards_left.other_key = Some(row.left_key.clone());
                    tables.entry(row.right_table.clone()).or_default().add_association(towards_left);

                    let join_entry = tables.entry(join_table.to_string()).or_default();
                    for (key, target) in [(&row.left_key, left), (&row.right_key, right)] {
                        join_entry.add_foreign_key(ForeignKeyMetadata {
                            name: key.clone(),
                            target_model: target.to_string(),
                            target_key: None,
                            has_multiple_for_same_target: false,
                        });
                    }
                }
            }
        }

        for entry in tables.values_mut() {
            mark_associations(&mut entry.associations);
            mark_foreign_keys(entry.foreign_keys.iter_mut());
        }

        Self { rows, tables }
    }

    /// A new graph containing these rows followed by `extra`.
    pub fn extended(&self, extra: impl IntoIterator<Item = AssociationRow>) -> Self {
        Self::from_rows(self.rows.iter().cloned().chain(extra).collect())
    }

    /// Relationships recorded for `table` under its qualified or bare name.
    pub fn lookup(&self, table: &TableMetadata) -> Vec<&TableAssociations> {
        let full = table.full_table_name();
        let mut found: Vec<&TableAssociations> = self.tables.get(&full).into_iter().collect();
        if full != table.origin_name {
            found.extend(self.tables.get(&table.origin_name));
        }
        found
    }

    /// Attaches foreign keys to columns and associations to tables.
    ///
    /// Foreign keys without a target key receive the target table's single
    /// primary key when one exists. Keys naming an unknown column are
    /// logged and ignored.
    pub fn apply(&self, tables: &mut [TableMetadata]) {
        let primary_keys: HashMap<String, String> = tables
            .iter()
            .filter_map(|t| sole_primary_key(t).map(|pk| (t.origin_name.clone(), pk)))
            .collect();

        for table in tables.iter_mut() {
            let entries = self.lookup(table);
            if entries.is_empty() {
                continue;
            }

            for entry in &entries {
                for key in &entry.foreign_keys {
                    let mut key = key.clone();
                    if key.target_key.is_none() {
                        key.target_key = primary_keys.get(&key.target_model).cloned();
                    }
                    match table.columns.values_mut().find(|c| c.origin_name.eq_ignore_ascii_case(&key.name)) {
                        Some(column) => column.foreign_key = Some(key),
                        None => log::warn!(
                            "{}: foreign key column `{}` does not exist, ignored",
                            table.full_table_name(),
                            key.name
                        ),
                    }
                }
                for association in &entry.associations {
                    if !table.associations.iter().any(|a| a.same_relationship(association)) {
                        table.associations.push(association.clone());
                    }
                }
            }

            mark_associations(&mut table.associations);
            mark_foreign_keys(table.columns.values_mut().filter_map(|c| c.foreign_key.as_mut()));
        }
    }
}

fn bare_name(token: &str) -> &str {
    token.rsplit('.').next().unwrap_or(token).trim()
}

/// Strips a trailing `_id`, `Id` or `ID`.
fn key_stem(key: &str) -> &str {
    ["_id", "Id", "ID"]
        .iter()
        .find_map(|suffix| key.strip_suffix(suffix))
        .filter(|stem| !stem.is_empty())
        .unwrap_or(key)
}

fn alias_for(association: &AssociationMetadata) -> String {
    let stem = |key: &Option<String>| key_stem(key.as_deref().unwrap_or(&association.target_model)).to_string();
    match association.kind {
        AssociationKind::BelongsTo => stem(&association.foreign_key),
        AssociationKind::HasOne => {
            format!("{}_{}", stem(&association.foreign_key), inflect::singularize(&association.target_model))
        }
        AssociationKind::HasMany => format!("{}_{}", stem(&association.foreign_key), association.target_model),
        AssociationKind::BelongsToMany => inflect::pluralize(&stem(&association.other_key)),
    }
}

/// Flags and aliases associations sharing `(kind, target)` with another one.
///
/// A lone association loses the flag and any alias this function derived
/// for it earlier; explicitly chosen names are kept.
fn mark_associations(associations: &mut [AssociationMetadata]) {
    let mut groups: HashMap<(AssociationKind, String), usize> = HashMap::new();
    for association in associations.iter() {
        *groups.entry((association.kind, association.target_model.clone())).or_default() += 1;
    }

    for association in associations.iter_mut() {
        let count = groups.get(&(association.kind, association.target_model.clone())).copied().unwrap_or(0);
        let alias = alias_for(association);
        if count >= 2 {
            association.has_multiple_for_same_target = true;
            association.target_model_prop_name = Some(alias.clone());
            association.target_alias = Some(alias);
        } else {
            association.has_multiple_for_same_target = false;
            if association.target_alias.as_deref() == Some(alias.as_str()) {
                association.target_alias = None;
            }
            if association.target_model_prop_name.as_deref() == Some(alias.as_str()) {
                association.target_model_prop_name = None;
            }
        }
    }
}

fn mark_foreign_keys<'a>(keys: impl Iterator<Item = &'a mut ForeignKeyMetadata>) {
    let mut keys: Vec<&mut ForeignKeyMetadata> = keys.collect();
    let mut targets: HashMap<String, usize> = HashMap::new();
    for key in keys.iter() {
        *targets.entry(key.target_model.clone()).or_default() += 1;
    }
    for key in keys.iter_mut() {
        key.has_multiple_for_same_target = targets.get(&key.target_model).copied().unwrap_or(0) >= 2;
    }
}

// ============================================================================
// Association Cache
// ============================================================================

/// Parsed association files keyed by canonical path.
///
/// Owned by a [`Generator`](crate::Generator); repeated builds against the
/// same file share one parse. The lock is held while parsing, so concurrent
/// first-time requests for one path parse it once.
#[derive(Debug, Default)]
pub struct AssociationCache {
    entries: Mutex<HashMap<PathBuf, Arc<AssociationsParsed>>>,
}

impl AssociationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached parse of `path`, parsing it on first use.
    pub fn get_or_parse(&self, path: impl AsRef<Path>) -> Result<Arc<AssociationsParsed>> {
        let key = std::fs::canonicalize(path.as_ref())?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parsed) = entries.get(&key) {
            log::debug!("Association cache hit for {}", key.display());
            return Ok(Arc::clone(parsed));
        }

        let parsed = Arc::new(AssociationsParsed::from_file(&key)?);
        entries.insert(key, Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Drops the entry for `path`. Returns whether one existed.
    pub fn invalidate(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let key = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).remove(&key).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
