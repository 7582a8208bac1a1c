//! SQLite catalog adapter.
//!
//! SQLite has no information schema; everything comes from the table-valued
//! pragma functions. Declared types are free text, so a type without an
//! exact mapping falls back to SQLite's own affinity rules instead of being
//! skipped.
//!
//! The index pragmas are read once per table, together with the columns.

use std::collections::HashSet;

use super::{unquote_literal, ForeignKeyRow, IntrospectionConfig};
use crate::{
    connection::{Connection, Dialect, Row},
    errors::Result,
    metadata::{ColumnMetadata, Diagnostic, IndexMetadata, TableName},
    typemap::{self, TypeParams},
};

const TABLES_QUERY: &str = r#"
    SELECT name
    FROM sqlite_master
    WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
    ORDER BY name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT cid, name, type, "notnull" AS not_null, dflt_value, pk
    FROM pragma_table_info(?)
    ORDER BY cid
"#;

const INDEX_COLUMNS_QUERY: &str = r#"
    SELECT
        ii.name AS column_name,
        ii.seqno AS seqno,
        il.name AS index_name,
        il."unique" AS is_unique,
        il.origin AS origin,
        (SELECT COUNT(*) FROM pragma_index_info(il.name)) AS column_count
    FROM pragma_index_list(?) il, pragma_index_info(il.name) ii
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT "from" AS column_name, "table" AS target_table, "to" AS target_column, id
    FROM pragma_foreign_key_list(?)
    ORDER BY id, seq
"#;

pub async fn fetch_tables(conn: &dyn Connection, _cfg: &IntrospectionConfig) -> Result<Vec<TableName>> {
    let rows = conn.query(TABLES_QUERY, &[]).await?;
    rows.iter()
        .map(|row| Ok(TableName::new(None, &row.required_text("name", Dialect::Sqlite)?)))
        .collect()
}

pub async fn fetch_columns_metadata(
    conn: &dyn Connection,
    _cfg: &IntrospectionConfig,
    table: &TableName,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<ColumnMetadata>> {
    let rows = conn.query(COLUMNS_QUERY, &[&table.name]).await?;
    let index_rows = conn.query(INDEX_COLUMNS_QUERY, &[&table.name]).await?;

    let unique_columns: HashSet<String> = index_rows
        .iter()
        .filter(|r| r.flag("is_unique") && r.int("column_count") == Some(1))
        .filter(|r| r.text("origin").as_deref() != Some("pk"))
        .filter_map(|r| r.text("column_name"))
        .collect();
    let pk_count = rows.iter().filter(|r| r.int("pk").unwrap_or(0) > 0).count();

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        let name = row.required_text("name", Dialect::Sqlite)?;
        let declared = row.text("type").unwrap_or_default();
        let mut column = resolve_column(table, &name, &declared, diagnostics);

        column.primary_key = row.int("pk").unwrap_or(0) > 0;
        // only a lone INTEGER PRIMARY KEY aliases the rowid
        column.auto_increment = column.primary_key && pk_count == 1 && declared.trim().eq_ignore_ascii_case("INTEGER");
        column.allow_null = !row.flag("not_null");
        column.unique = unique_columns.contains(&name);
        column.default_value = row.text("dflt_value").and_then(|d| normalize_default(&d));
        column.indices = indices_for_column(&index_rows, &name);
        columns.push(column);
    }
    Ok(columns)
}

fn resolve_column(table: &TableName, name: &str, declared: &str, diagnostics: &mut Vec<Diagnostic>) -> ColumnMetadata {
    let (base, args) = typemap::split_declared_type(declared);
    let params = TypeParams {
        length: args.first().copied(),
        precision: args.first().copied(),
        scale: args.get(1).copied(),
        datetime_precision: None,
    };

    let (mapping, host) = match typemap::lookup(Dialect::Sqlite, &base) {
        Some(mapped) => (mapped.render(&params), mapped.host),
        None => {
            let mapped = typemap::sqlite_affinity(declared);
            if !base.is_empty() {
                let action = format!("mapped by affinity as {}", mapped.mapping);
                diagnostics.push(Diagnostic::unknown_type(table, name, &base, &action));
            }
            (mapped.mapping.to_string(), mapped.host)
        }
    };

    let mut column = ColumnMetadata::new(name, &base, mapping, host);
    column.native_type_extended = declared.trim().to_lowercase();
    column
}

fn normalize_default(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(unquote_literal(raw))
}

pub async fn fetch_column_index_metadata(
    conn: &dyn Connection,
    _cfg: &IntrospectionConfig,
    table: &TableName,
    column: &str,
) -> Result<Vec<IndexMetadata>> {
    let rows = conn.query(INDEX_COLUMNS_QUERY, &[&table.name]).await?;
    Ok(indices_for_column(&rows, column))
}

fn indices_for_column(rows: &[Row], column: &str) -> Vec<IndexMetadata> {
    rows.iter()
        .filter(|r| r.text("column_name").is_some_and(|c| c.eq_ignore_ascii_case(column)))
        .filter(|r| r.text("origin").as_deref() != Some("pk"))
        .filter_map(|r| {
            Some(IndexMetadata {
                name: r.text("index_name")?,
                unique: r.flag("is_unique"),
                using: None,
                collation: None,
                seq: r.int("seqno").map(|s| s + 1),
            })
        })
        .collect()
}

pub async fn fetch_foreign_keys(
    conn: &dyn Connection,
    _cfg: &IntrospectionConfig,
    table: &TableName,
) -> Result<Vec<ForeignKeyRow>> {
    let rows = conn.query(FOREIGN_KEYS_QUERY, &[&table.name]).await?;
    rows.iter()
        .map(|row| {
            Ok(ForeignKeyRow {
                column_name: row.required_text("column_name", Dialect::Sqlite)?,
                target_schema: None,
                target_table: row.required_text("target_table", Dialect::Sqlite)?,
                target_column: row.text("target_column"),
                constraint_name: None,
            })
        })
        .collect()
}
