//! # Code Synthesizer Module
//!
//! Renders transformed [`TableMetadata`] into Bottle ORM model modules.
//!
//! ## Generated Module Layout
//!
//! ```rust,ignore
//! //! Model for table `public.units`.
//!
//! use bottle_orm::Model;
//!
//! use super::races::Races;
//!
//! /// Table `public.units`.
//! /// Associations: [`UnitsRelations`].
//! #[derive(Debug, Clone, Model)]
//! pub struct Units {
//!     /// Column `unit_id` INTEGER, auto increment.
//!     #[orm(primary_key)]
//!     pub unit_id: i32,
//!     /// Column `race_id` INTEGER.
//!     #[orm(foreign_key = "Races::race_id")]
//!     pub race_id: Option<i32>,
//! }
//!
//! /// Associations of [`Units`], loaded separately from the row.
//! #[derive(Debug, Clone, Default)]
//! pub struct UnitsRelations {
//!     /// belongs_to(target = "Races", target_key = "race_id", foreign_key = "race_id")
//!     pub race: Option<Box<Races>>,
//! }
//! ```
//!
//! The `Model` derive turns every field into a column and reads only the
//! [`ORM_KEYS`] inside `#[orm(...)]`. Everything else the catalog knows
//! (canonical type, default, comment, index details, original spelling)
//! is written as doc comments, and navigation fields live in the separate
//! `<Model>Relations` struct. An index `mod.rs` re-exports every model.
//!
//! The synthesizer never touches the file system.

// ============================================================================
// External Crate Imports
// ============================================================================

use std::collections::{BTreeMap, BTreeSet, HashSet};

use heck::{ToSnakeCase, ToUpperCamelCase};
use indexmap::IndexMap;
use serde::Serialize;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    config::MetadataConfig,
    inflect,
    metadata::{AssociationKind, AssociationMetadata, ColumnMetadata, IndexMetadata, TableMetadata},
    typemap::HostType,
};

/// Field attribute keys understood by Bottle ORM's `Model` derive.
pub const ORM_KEYS: &[&str] = &["primary_key", "size", "create_time", "update_time", "unique", "index", "foreign_key"];

// ============================================================================
// Public Types
// ============================================================================

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisOptions {
    /// Mark indexed columns and document every index participation.
    pub indices: bool,
    /// Emit a `<Model>Attributes` struct describing creation input.
    pub strict: bool,
}

impl From<&MetadataConfig> for SynthesisOptions {
    fn from(config: &MetadataConfig) -> Self {
        Self { indices: config.indices, strict: config.strict }
    }
}

/// One generated source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Rust module name (`unit_types`).
    pub module: String,
    /// File name relative to the output directory (`unit_types.rs`).
    pub file_name: String,
    pub contents: String,
}

/// Output of one synthesis run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Synthesis {
    /// Per-table artifacts keyed by (transformed) table name, in input order.
    pub artifacts: IndexMap<String, Artifact>,
    /// The `mod.rs` re-exporting every model.
    pub index: Artifact,
}

// ============================================================================
// Synthesizer
// ============================================================================

/// Pure renderer from metadata to source text.
#[derive(Debug, Clone, Default)]
pub struct CodeSynthesizer {
    options: SynthesisOptions,
}

/// A navigation field chosen for emission.
struct Navigation<'a> {
    field: String,
    association: &'a AssociationMetadata,
}

impl CodeSynthesizer {
    pub fn new(options: SynthesisOptions) -> Self {
        Self { options }
    }

    /// Renders every table plus the index module.
    pub fn synthesize(&self, tables: &[TableMetadata]) -> Synthesis {
        let models: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        let artifacts: IndexMap<String, Artifact> = tables
            .iter()
            .map(|table| {
                let module = module_name(&table.name);
                let artifact = Artifact {
                    file_name: format!("{}.rs", module),
                    contents: self.render_table(table, &models),
                    module,
                };
                (table.name.clone(), artifact)
            })
            .collect();

        let index = Artifact {
            module: "mod".to_string(),
            file_name: "mod.rs".to_string(),
            contents: render_index(tables),
        };

        log::info!("Synthesized {} model modules", artifacts.len());
        Synthesis { artifacts, index }
    }

    /// Renders one model module. `models` names every generated model;
    /// navigation towards any other table is left out.
    pub fn render_table(&self, table: &TableMetadata, models: &HashSet<&str>) -> String {
        let struct_name = rust_ident(&table.name);
        let navigations = self.navigations(table, models);

        let mut out = String::new();
        out.push_str(&format!("//! Model for table `{}`.\n", table.full_table_name()));
        out.push_str("//!\n//! Generated by bottle-gen. Regenerate instead of editing by hand.\n\n");
        out.push_str(&self.render_imports(table, &navigations));

        if self.options.strict {
            out.push_str(&render_attributes_struct(table, &struct_name));
            out.push('\n');
        }

        if let Some(comment) = &table.comment {
            push_doc(&mut out, "", comment);
            out.push_str("///\n");
        }
        out.push_str(&format!("/// Table `{}`.\n", table.full_table_name()));
        if self.options.strict {
            out.push_str(&format!("/// Creation input: [`{}`].\n", companion_name(&struct_name, "Attributes")));
        }
        if !navigations.is_empty() {
            out.push_str(&format!("/// Associations: [`{}`].\n", companion_name(&struct_name, "Relations")));
        }

        let fields: Vec<String> = table.columns.values().map(|c| rust_ident(&c.name)).collect();
        push_lint_allows(&mut out, &struct_name, &fields);
        out.push_str("#[derive(Debug, Clone, Model)]\n");
        out.push_str(&format!("pub struct {} {{\n", struct_name));

        for (column, field) in table.columns.values().zip(&fields) {
            out.push_str(&self.column_docs(column));
            let keys = self.orm_keys(table, column);
            if !keys.is_empty() {
                out.push_str(&format!("    #[orm({})]\n", keys.join(", ")));
            }
            out.push_str(&format!("    pub {}: {},\n", field, field_type(column, column.allow_null)));
        }
        out.push_str("}\n");

        if !navigations.is_empty() {
            out.push('\n');
            out.push_str(&render_relations_struct(&struct_name, &navigations));
        }
        out
    }

    /// Chooses the navigation fields of `table` in association order.
    ///
    /// An un-aliased association repeating the `(kind, target)` of an
    /// earlier un-aliased one is suppressed. Field names colliding with an
    /// earlier navigation get a numeric suffix.
    fn navigations<'a>(&self, table: &'a TableMetadata, models: &HashSet<&str>) -> Vec<Navigation<'a>> {
        let mut taken: HashSet<String> = HashSet::new();
        let mut unaliased: HashSet<(AssociationKind, &str)> = HashSet::new();
        let mut navigations = Vec::new();

        for association in &table.associations {
            if !models.contains(association.target_model.as_str()) {
                log::warn!(
                    "{}: {} target `{}` is not generated, navigation skipped",
                    table.full_table_name(),
                    association.kind,
                    association.target_model
                );
                continue;
            }
            if association.target_alias.is_none()
                && !unaliased.insert((association.kind, association.target_model.as_str()))
            {
                log::debug!(
                    "{}: duplicate {} to {} suppressed",
                    table.full_table_name(),
                    association.kind,
                    association.target_model
                );
                continue;
            }

            let base = rust_ident(&navigation_name(association));
            let mut field = base.clone();
            let mut suffix = 2;
            while taken.contains(&field) {
                field = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            taken.insert(field.clone());
            navigations.push(Navigation { field, association });
        }
        navigations
    }

    fn render_imports(&self, table: &TableMetadata, navigations: &[Navigation<'_>]) -> String {
        let mut external: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for column in table.columns.values() {
            for path in field_host_type(column).imports() {
                if let Some((module, item)) = path.rsplit_once("::") {
                    external.entry(module).or_default().insert(item);
                }
            }
        }

        let mut out = String::from("use bottle_orm::Model;\n");
        for (module, items) in &external {
            let items: Vec<&str> = items.iter().copied().collect();
            match items.as_slice() {
                [single] => out.push_str(&format!("use {}::{};\n", module, single)),
                many => out.push_str(&format!("use {}::{{{}}};\n", module, many.join(", "))),
            }
        }

        let siblings: BTreeSet<(String, String)> = navigations
            .iter()
            .map(|n| &n.association.target_model)
            .filter(|target| **target != table.name)
            .map(|target| (module_name(target), rust_ident(target)))
            .collect();
        if !siblings.is_empty() {
            out.push('\n');
        }
        for (module, model) in &siblings {
            out.push_str(&format!("use super::{}::{};\n", module, model));
        }

        out.push('\n');
        out
    }

    /// Doc lines above a column field: the column comment, then the catalog
    /// summary, then one line per index participation.
    fn column_docs(&self, column: &ColumnMetadata) -> String {
        let mut out = String::new();
        if let Some(comment) = &column.comment {
            push_doc(&mut out, "    ", comment);
            out.push_str("    ///\n");
        }

        let mut summary = format!("Column `{}` {}", column.origin_name, column.canonical_mapping_type);
        if column.auto_increment {
            summary.push_str(", auto increment");
        }
        if let Some(default) = &column.default_value {
            summary.push_str(&format!(", default `{}`", single_line(default)));
        }
        out.push_str(&format!("    /// {}.\n", summary));

        if self.options.indices {
            for index in &column.indices {
                out.push_str(&format!("    /// {}\n", index_doc(index)));
            }
        }
        out
    }

    /// `#[orm(...)]` keys for one column, limited to [`ORM_KEYS`].
    fn orm_keys(&self, table: &TableMetadata, column: &ColumnMetadata) -> Vec<String> {
        let mut keys = Vec::new();
        if column.primary_key {
            keys.push("primary_key".to_string());
        }
        if let Some(size) = varchar_size(column) {
            keys.push(format!("size = {}", size));
        }
        if column.unique {
            keys.push("unique".to_string());
        }
        if self.options.indices && !column.indices.is_empty() {
            keys.push("index".to_string());
        }
        if table.timestamps {
            match column.origin_name.to_snake_case().as_str() {
                "created_at" => keys.push("create_time".to_string()),
                "updated_at" => keys.push("update_time".to_string()),
                _ => {}
            }
        }
        if let Some(fk) = &column.foreign_key
            && let Some(key) = &fk.target_key
        {
            keys.push(format!("foreign_key = \"{}::{}\"", rust_ident(&fk.target_model), key));
        }
        keys
    }
}

// ============================================================================
// Rendering Helpers
// ============================================================================

fn render_index(tables: &[TableMetadata]) -> String {
    let mut out = String::from("//! Generated models. Regenerate instead of editing by hand.\n\n");
    for table in tables {
        out.push_str(&format!("pub mod {};\n", module_name(&table.name)));
    }
    if !tables.is_empty() {
        out.push('\n');
    }
    for table in tables {
        out.push_str(&format!("pub use {}::{};\n", module_name(&table.name), rust_ident(&table.name)));
    }
    out
}

/// `<Model>Attributes`: one field per column, optional unless the column
/// is required on insert.
fn render_attributes_struct(table: &TableMetadata, struct_name: &str) -> String {
    let name = companion_name(struct_name, "Attributes");
    let fields: Vec<String> = table.columns.values().map(|c| rust_ident(&c.name)).collect();

    let mut out = format!("/// Values accepted when creating a [`{}`].\n", struct_name);
    push_lint_allows(&mut out, &name, &fields);
    out.push_str("#[derive(Debug, Clone)]\n");
    out.push_str(&format!("pub struct {} {{\n", name));
    for (column, field) in table.columns.values().zip(&fields) {
        out.push_str(&format!("    pub {}: {},\n", field, field_type(column, !column.is_required())));
    }
    out.push_str("}\n");
    out
}

/// `<Model>Relations`: one navigation field per chosen association.
fn render_relations_struct(struct_name: &str, navigations: &[Navigation<'_>]) -> String {
    let name = companion_name(struct_name, "Relations");
    let fields: Vec<String> = navigations.iter().map(|n| n.field.clone()).collect();

    let mut out = format!("/// Associations of [`{}`], loaded separately from the row.\n", struct_name);
    push_lint_allows(&mut out, &name, &fields);
    out.push_str("#[derive(Debug, Clone, Default)]\n");
    out.push_str(&format!("pub struct {} {{\n", name));
    for navigation in navigations {
        let association = navigation.association;
        let target = rust_ident(&association.target_model);
        out.push_str(&format!("    /// {}\n", association_doc(association, &target)));
        let ty = if association.kind.is_many() { format!("Vec<{}>", target) } else { format!("Option<Box<{}>>", target) };
        out.push_str(&format!("    pub {}: {},\n", navigation.field, ty));
    }
    out.push_str("}\n");
    out
}

fn companion_name(struct_name: &str, suffix: &str) -> String {
    format!("{}{}", struct_name.trim_start_matches("r#"), suffix)
}

fn push_lint_allows(out: &mut String, struct_name: &str, fields: &[String]) {
    if struct_name.trim_start_matches("r#") != struct_name.to_upper_camel_case() {
        out.push_str("#[allow(non_camel_case_types)]\n");
    }
    if fields.iter().any(|f| !is_snake(f)) {
        out.push_str("#[allow(non_snake_case)]\n");
    }
}

fn push_doc(out: &mut String, indent: &str, text: &str) {
    for line in text.lines().map(str::trim) {
        if line.is_empty() {
            out.push_str(&format!("{}///\n", indent));
        } else {
            out.push_str(&format!("{}/// {}\n", indent, line));
        }
    }
}

fn single_line(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

fn index_doc(index: &IndexMetadata) -> String {
    let mut details = Vec::new();
    if index.unique {
        details.push("unique".to_string());
    }
    details.extend(index.using.iter().cloned());
    details.extend(index.collation.iter().cloned());
    if let Some(seq) = index.seq {
        details.push(format!("position {}", seq));
    }
    if details.is_empty() {
        format!("Index `{}`.", index.name)
    } else {
        format!("Index `{}` ({}).", index.name, details.join(", "))
    }
}

fn association_doc(association: &AssociationMetadata, target: &str) -> String {
    let mut args = vec![format!("target = {:?}", target)];
    let optional = [
        ("join", association.join_model.as_ref().map(|j| rust_ident(j))),
        ("source_key", association.source_key.clone()),
        ("target_key", association.target_key.clone()),
        ("foreign_key", association.foreign_key.clone()),
        ("other_key", association.other_key.clone()),
        ("alias", association.target_alias.clone()),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            args.push(format!("{} = {:?}", key, value));
        }
    }
    format!("{}({})", association.kind.attribute(), args.join(", "))
}

/// `size = N` for `VARCHAR(N)` string columns; Bottle ORM widens every
/// other string to `TEXT`.
fn varchar_size(column: &ColumnMetadata) -> Option<usize> {
    if column.canonical_host_type != HostType::String {
        return None;
    }
    column
        .canonical_mapping_type
        .strip_prefix("VARCHAR(")?
        .strip_suffix(')')?
        .trim()
        .parse()
        .ok()
}

/// Host type as rendered. Bottle ORM writes every field through `Display`;
/// byte strings and arrays are carried as text.
fn field_host_type(column: &ColumnMetadata) -> HostType {
    match &column.canonical_host_type {
        HostType::Bytes | HostType::Array(_) => HostType::String,
        other => other.clone(),
    }
}

fn field_type(column: &ColumnMetadata, optional: bool) -> String {
    let ty = field_host_type(column).rust_type();
    if optional { format!("Option<{}>", ty) } else { ty }
}

/// Navigation field name: the explicit property name, otherwise the target
/// in snake case, plural for collections and singular otherwise.
fn navigation_name(association: &AssociationMetadata) -> String {
    if let Some(prop) = &association.target_model_prop_name {
        return prop.clone();
    }
    let target = association.target_model.to_snake_case();
    if association.kind.is_many() { inflect::pluralize(&target) } else { inflect::singularize(&target) }
}

fn module_name(table_name: &str) -> String {
    let module = rust_ident(&table_name.to_snake_case());
    match module.as_str() {
        "mod" | "r#mod" => "mod_".to_string(),
        _ => module,
    }
}

fn is_snake(ident: &str) -> bool {
    let core = ident.trim_start_matches("r#").trim_start_matches('_');
    core == core.to_snake_case()
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false", "fn", "for",
    "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub", "ref", "return", "static",
    "struct", "trait", "true", "type", "unsafe", "use", "where", "while", "abstract", "become", "box", "do",
    "final", "macro", "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
];

/// Turns an arbitrary catalog identifier into a valid Rust identifier.
pub(crate) fn rust_ident(name: &str) -> String {
    let mut ident: String = name.chars().map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' }).collect();
    if ident.is_empty() {
        ident.push('_');
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    match ident.as_str() {
        "self" | "Self" | "super" | "crate" | "_" => format!("{}_", ident),
        other if KEYWORDS.contains(&other) => format!("r#{}", other),
        _ => ident,
    }
}

// ============================================================================
// Tests
// ============================================================================
