//! MySQL catalog adapter.
//!
//! Reads `INFORMATION_SCHEMA`. String columns are cast to `CHAR` and numeric
//! ones to `SIGNED` because some server versions report catalog columns as
//! `VARBINARY`/`BIGINT UNSIGNED`, which the `Any` driver cannot decode.
//! Columns whose `DATA_TYPE` has no exact mapping are skipped.

use super::{sort_order, ForeignKeyRow, IntrospectionConfig};
use crate::{
    connection::{Connection, Dialect, Row},
    errors::Result,
    metadata::{ColumnMetadata, Diagnostic, IndexMetadata, TableName},
    typemap::{self, HostType, TypeParams},
};

const TABLES_QUERY: &str = r#"
    SELECT
        CAST(TABLE_SCHEMA AS CHAR(255)) AS table_schema,
        CAST(TABLE_NAME AS CHAR(255)) AS table_name,
        CAST(TABLE_COMMENT AS CHAR(2048)) AS table_comment,
        CAST(TABLE_TYPE AS CHAR(64)) AS table_type
    FROM INFORMATION_SCHEMA.TABLES
    WHERE TABLE_SCHEMA = ?
    ORDER BY TABLE_NAME
"#;

pub(crate) const COLUMNS_QUERY: &str = r#"
    SELECT
        CAST(ORDINAL_POSITION AS SIGNED) AS ordinal_position,
        CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
        CAST(DATA_TYPE AS CHAR(64)) AS data_type,
        CAST(COLUMN_TYPE AS CHAR(4096)) AS column_type,
        CAST(IS_NULLABLE AS CHAR(3)) AS is_nullable,
        CAST(COLUMN_KEY AS CHAR(3)) AS column_key,
        CAST(EXTRA AS CHAR(255)) AS extra,
        CAST(COLUMN_DEFAULT AS CHAR(4096)) AS column_default,
        CAST(COLUMN_COMMENT AS CHAR(2048)) AS column_comment,
        CAST(CASE
            WHEN CHARACTER_MAXIMUM_LENGTH IS NULL THEN NULL
            WHEN CHARACTER_MAXIMUM_LENGTH > 2147483647 THEN -1
            ELSE CHARACTER_MAXIMUM_LENGTH
        END AS SIGNED) AS character_maximum_length,
        CAST(NUMERIC_PRECISION AS SIGNED) AS numeric_precision,
        CAST(NUMERIC_SCALE AS SIGNED) AS numeric_scale,
        CAST(DATETIME_PRECISION AS SIGNED) AS datetime_precision
    FROM INFORMATION_SCHEMA.COLUMNS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
    ORDER BY ORDINAL_POSITION
"#;

const COLUMN_INDEX_QUERY: &str = r#"
    SELECT
        CAST(INDEX_NAME AS CHAR(255)) AS index_name,
        CAST(NON_UNIQUE AS SIGNED) AS non_unique,
        CAST(INDEX_TYPE AS CHAR(64)) AS index_type,
        CAST(COLLATION AS CHAR(1)) AS collation,
        CAST(SEQ_IN_INDEX AS SIGNED) AS seq_in_index
    FROM INFORMATION_SCHEMA.STATISTICS
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND COLUMN_NAME = ? AND INDEX_NAME <> 'PRIMARY'
    ORDER BY INDEX_NAME, SEQ_IN_INDEX
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        CAST(COLUMN_NAME AS CHAR(255)) AS column_name,
        CAST(REFERENCED_TABLE_SCHEMA AS CHAR(255)) AS target_schema,
        CAST(REFERENCED_TABLE_NAME AS CHAR(255)) AS target_table,
        CAST(REFERENCED_COLUMN_NAME AS CHAR(255)) AS target_column,
        CAST(CONSTRAINT_NAME AS CHAR(255)) AS constraint_name
    FROM INFORMATION_SCHEMA.KEY_COLUMN_USAGE
    WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? AND REFERENCED_TABLE_NAME IS NOT NULL
    ORDER BY ORDINAL_POSITION
"#;

pub async fn fetch_tables(conn: &dyn Connection, cfg: &IntrospectionConfig) -> Result<Vec<TableName>> {
    fetch_tables_as(conn, cfg, Dialect::Mysql).await
}

pub(crate) async fn fetch_tables_as(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    dialect: Dialect,
) -> Result<Vec<TableName>> {
    let schema = cfg.schema.as_deref().ok_or_else(|| {
        crate::errors::Error::introspection(dialect, "a database (schema) name is required")
    })?;
    let rows = conn.query(TABLES_QUERY, &[schema]).await?;

    let mut tables = Vec::with_capacity(rows.len());
    for row in &rows {
        let is_view = row.text("table_type").is_some_and(|t| t.eq_ignore_ascii_case("VIEW"));
        if cfg.no_views && is_view {
            continue;
        }
        let name = row.required_text("table_name", dialect)?;
        let schema = row.text("table_schema");
        tables.push(TableName::new(schema.as_deref(), &name).with_comment(row.text("table_comment")));
    }
    Ok(tables)
}

pub async fn fetch_columns_metadata(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<ColumnMetadata>> {
    let rows = query_columns(conn, cfg, table).await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(mut column) = column_from_row(Dialect::Mysql, table, row, diagnostics)? {
            column.default_value = row.text("column_default");
            columns.push(column);
        }
    }
    Ok(columns)
}

pub(crate) async fn query_columns(conn: &dyn Connection, cfg: &IntrospectionConfig, table: &TableName) -> Result<Vec<Row>> {
    let schema = table.schema.as_deref().or(cfg.schema.as_deref()).unwrap_or_default();
    conn.query(COLUMNS_QUERY, &[schema, &table.name]).await
}

/// Normalizes one `INFORMATION_SCHEMA.COLUMNS` row, except for the default
/// value whose encoding differs between MySQL and MariaDB.
///
/// Returns `None` (with a diagnostic) when the type has no mapping.
pub(crate) fn column_from_row(
    dialect: Dialect,
    table: &TableName,
    row: &Row,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<ColumnMetadata>> {
    let name = row.required_text("column_name", dialect)?;
    let data_type = row.required_text("data_type", dialect)?.to_lowercase();
    let column_type = row.text("column_type").unwrap_or_else(|| data_type.clone());
    let unsigned = column_type.to_lowercase().contains("unsigned");

    let Some(mapped) = typemap::lookup(dialect, &data_type) else {
        diagnostics.push(Diagnostic::unknown_type(table, &name, &data_type, "column skipped"));
        return Ok(None);
    };

    let params = TypeParams {
        length: row.int("character_maximum_length"),
        precision: row.int("numeric_precision"),
        scale: row.int("numeric_scale"),
        datetime_precision: row.int("datetime_precision"),
    };

    let (mapping, host) = match data_type.as_str() {
        "enum" | "set" => {
            let values = typemap::literal_values(&column_type).unwrap_or("()");
            (format!("{}{}", mapped.mapping, values), mapped.host)
        }
        "tinyint" if column_type.eq_ignore_ascii_case("tinyint(1)") => ("BOOLEAN".to_string(), HostType::Bool),
        "bit" if params.precision == Some(1) => ("BOOLEAN".to_string(), HostType::Bool),
        _ => (mapped.render(&params), widen_unsigned(mapped.host, unsigned)),
    };

    let mut column = ColumnMetadata::new(&name, &data_type, mapping, host);
    column.native_type_extended = column_type.clone();

    let key = row.text("column_key").unwrap_or_default().to_ascii_uppercase();
    column.primary_key = key == "PRI";
    column.unique = key == "UNI";
    column.auto_increment = row.text("extra").is_some_and(|e| e.to_lowercase().contains("auto_increment"));
    column.allow_null = row.flag("is_nullable");
    column.comment = row.text("column_comment");

    Ok(Some(column))
}

/// Unsigned integers move to the next wider signed host type.
fn widen_unsigned(host: HostType, unsigned: bool) -> HostType {
    if !unsigned {
        return host;
    }
    match host {
        HostType::I8 => HostType::I16,
        HostType::I16 => HostType::I32,
        HostType::I32 => HostType::I64,
        HostType::I64 => HostType::U64,
        other => other,
    }
}

pub async fn fetch_column_index_metadata(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
    column: &str,
) -> Result<Vec<IndexMetadata>> {
    let schema = table.schema.as_deref().or(cfg.schema.as_deref()).unwrap_or_default();
    let rows = conn.query(COLUMN_INDEX_QUERY, &[schema, &table.name, column]).await?;

    let mut indices: Vec<IndexMetadata> = Vec::new();
    for row in &rows {
        let Some(name) = row.text("index_name") else { continue };
        if indices.iter().any(|i| i.name == name) {
            continue;
        }
        indices.push(IndexMetadata {
            name,
            unique: row.int("non_unique") == Some(0),
            using: row.text("index_type"),
            collation: sort_order(row.text("collation")),
            seq: row.int("seq_in_index"),
        });
    }
    Ok(indices)
}

pub async fn fetch_foreign_keys(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
) -> Result<Vec<ForeignKeyRow>> {
    let schema = table.schema.as_deref().or(cfg.schema.as_deref()).unwrap_or_default();
    let rows = conn.query(FOREIGN_KEYS_QUERY, &[schema, &table.name]).await?;
    rows.iter()
        .map(|row| {
            Ok(ForeignKeyRow {
                column_name: row.required_text("column_name", Dialect::Mysql)?,
                target_schema: row.text("target_schema"),
                target_table: row.required_text("target_table", Dialect::Mysql)?,
                target_column: row.text("target_column"),
                constraint_name: row.text("constraint_name"),
            })
        })
        .collect()
}
