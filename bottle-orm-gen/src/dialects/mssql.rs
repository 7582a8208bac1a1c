//! SQL Server catalog adapter.
//!
//! Parameters use the `@P1` style. There is no sqlx driver for SQL Server,
//! so these queries run through a caller-supplied [`Connection`].

use super::{sort_order, strip_wrapping_parens, unquote_literal, ForeignKeyRow, IntrospectionConfig};
use crate::{
    connection::{Connection, Dialect, Row},
    errors::Result,
    metadata::{ColumnMetadata, Diagnostic, IndexMetadata, TableName},
    typemap::{self, TypeParams},
};

const TABLES_QUERY: &str = r#"
    SELECT
        t.TABLE_SCHEMA AS table_schema,
        t.TABLE_NAME AS table_name,
        CAST(ep.value AS NVARCHAR(4000)) AS table_comment
    FROM INFORMATION_SCHEMA.TABLES t
    LEFT JOIN sys.extended_properties ep
        ON ep.major_id = OBJECT_ID(t.TABLE_SCHEMA + '.' + t.TABLE_NAME)
        AND ep.minor_id = 0
        AND ep.name = 'MS_Description'
    WHERE t.TABLE_TYPE = 'BASE TABLE' AND t.TABLE_SCHEMA = @P1
    ORDER BY t.TABLE_NAME
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.ORDINAL_POSITION AS ordinal_position,
        c.COLUMN_NAME AS column_name,
        c.DATA_TYPE AS data_type,
        c.IS_NULLABLE AS is_nullable,
        c.COLUMN_DEFAULT AS column_default,
        CAST(c.CHARACTER_MAXIMUM_LENGTH AS INT) AS character_maximum_length,
        CAST(c.NUMERIC_PRECISION AS INT) AS numeric_precision,
        CAST(c.NUMERIC_SCALE AS INT) AS numeric_scale,
        CAST(c.DATETIME_PRECISION AS INT) AS datetime_precision,
        ISNULL(COLUMNPROPERTY(OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME), c.COLUMN_NAME, 'IsIdentity'), 0) AS is_identity,
        CASE WHEN pk.COLUMN_NAME IS NULL THEN 0 ELSE 1 END AS is_primary,
        CASE WHEN EXISTS (
            SELECT 1
            FROM sys.indexes i
            JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
            JOIN sys.columns sc ON sc.object_id = ic.object_id AND sc.column_id = ic.column_id
            WHERE i.object_id = OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME)
              AND i.is_unique = 1 AND i.is_primary_key = 0
              AND sc.name = c.COLUMN_NAME
              AND (SELECT COUNT(*) FROM sys.index_columns ic2
                   WHERE ic2.object_id = i.object_id AND ic2.index_id = i.index_id AND ic2.is_included_column = 0) = 1
        ) THEN 1 ELSE 0 END AS is_unique,
        CAST(ep.value AS NVARCHAR(4000)) AS column_comment
    FROM INFORMATION_SCHEMA.COLUMNS c
    LEFT JOIN (
        SELECT kcu.TABLE_SCHEMA, kcu.TABLE_NAME, kcu.COLUMN_NAME
        FROM INFORMATION_SCHEMA.TABLE_CONSTRAINTS tc
        JOIN INFORMATION_SCHEMA.KEY_COLUMN_USAGE kcu
            ON kcu.CONSTRAINT_NAME = tc.CONSTRAINT_NAME AND kcu.TABLE_SCHEMA = tc.TABLE_SCHEMA
        WHERE tc.CONSTRAINT_TYPE = 'PRIMARY KEY'
    ) pk ON pk.TABLE_SCHEMA = c.TABLE_SCHEMA AND pk.TABLE_NAME = c.TABLE_NAME AND pk.COLUMN_NAME = c.COLUMN_NAME
    LEFT JOIN sys.extended_properties ep
        ON ep.major_id = OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME)
        AND ep.minor_id = COLUMNPROPERTY(OBJECT_ID(c.TABLE_SCHEMA + '.' + c.TABLE_NAME), c.COLUMN_NAME, 'ColumnId')
        AND ep.name = 'MS_Description'
    WHERE c.TABLE_SCHEMA = @P1 AND c.TABLE_NAME = @P2
    ORDER BY c.ORDINAL_POSITION
"#;

const COLUMN_INDEX_QUERY: &str = r#"
    SELECT
        i.name AS index_name,
        CAST(i.is_unique AS INT) AS is_unique,
        i.type_desc AS index_type,
        CAST(ic.is_descending_key AS INT) AS is_descending,
        CAST(ic.key_ordinal AS INT) AS key_ordinal
    FROM sys.indexes i
    JOIN sys.index_columns ic ON ic.object_id = i.object_id AND ic.index_id = i.index_id
    JOIN sys.columns c ON c.object_id = ic.object_id AND c.column_id = ic.column_id
    JOIN sys.tables tb ON tb.object_id = i.object_id
    JOIN sys.schemas s ON s.schema_id = tb.schema_id
    WHERE s.name = @P1 AND tb.name = @P2 AND c.name = @P3
      AND i.is_primary_key = 0 AND i.type > 0 AND ic.is_included_column = 0
    ORDER BY i.name
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        pc.name AS column_name,
        rs.name AS target_schema,
        rt.name AS target_table,
        rc.name AS target_column,
        fk.name AS constraint_name
    FROM sys.foreign_keys fk
    JOIN sys.foreign_key_columns fkc ON fkc.constraint_object_id = fk.object_id
    JOIN sys.tables pt ON pt.object_id = fk.parent_object_id
    JOIN sys.schemas ps ON ps.schema_id = pt.schema_id
    JOIN sys.columns pc ON pc.object_id = fkc.parent_object_id AND pc.column_id = fkc.parent_column_id
    JOIN sys.tables rt ON rt.object_id = fk.referenced_object_id
    JOIN sys.schemas rs ON rs.schema_id = rt.schema_id
    JOIN sys.columns rc ON rc.object_id = fkc.referenced_object_id AND rc.column_id = fkc.referenced_column_id
    WHERE ps.name = @P1 AND pt.name = @P2
    ORDER BY fk.name, fkc.constraint_column_id
"#;

pub async fn fetch_tables(conn: &dyn Connection, cfg: &IntrospectionConfig) -> Result<Vec<TableName>> {
    let rows = conn.query(TABLES_QUERY, &[cfg.schema_or("dbo")]).await?;
    rows.iter()
        .map(|row| {
            let name = row.required_text("table_name", Dialect::Mssql)?;
            let schema = row.text("table_schema");
            Ok(TableName::new(schema.as_deref(), &name).with_comment(row.text("table_comment")))
        })
        .collect()
}

pub async fn fetch_columns_metadata(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<ColumnMetadata>> {
    let schema = table.schema.as_deref().unwrap_or(cfg.schema_or("dbo"));
    let rows = conn.query(COLUMNS_QUERY, &[schema, &table.name]).await?;

    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(column) = column_from_row(table, row, diagnostics)? {
            columns.push(column);
        }
    }
    Ok(columns)
}

fn column_from_row(table: &TableName, row: &Row, diagnostics: &mut Vec<Diagnostic>) -> Result<Option<ColumnMetadata>> {
    let name = row.required_text("column_name", Dialect::Mssql)?;
    let data_type = row.required_text("data_type", Dialect::Mssql)?.to_lowercase();

    let Some(mapped) = typemap::lookup(Dialect::Mssql, &data_type) else {
        diagnostics.push(Diagnostic::unknown_type(table, &name, &data_type, "column skipped"));
        return Ok(None);
    };

    let params = TypeParams {
        length: row.int("character_maximum_length"),
        precision: row.int("numeric_precision"),
        scale: row.int("numeric_scale"),
        datetime_precision: row.int("datetime_precision"),
    };

    let mut column = ColumnMetadata::new(&name, &data_type, mapped.render(&params), mapped.host);
    column.primary_key = row.flag("is_primary");
    column.auto_increment = row.flag("is_identity");
    column.allow_null = row.flag("is_nullable");
    column.unique = row.flag("is_unique") && !column.primary_key;
    column.default_value = row.text("column_default").and_then(|d| normalize_default(&d));
    column.comment = row.text("column_comment");
    Ok(Some(column))
}

/// SQL Server wraps every default in parentheses: `((0))`, `(N'abc')`,
/// `(getdate())`.
fn normalize_default(raw: &str) -> Option<String> {
    let inner = strip_wrapping_parens(raw);
    if inner.is_empty() || inner.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(unquote_literal(inner))
}

pub async fn fetch_column_index_metadata(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
    column: &str,
) -> Result<Vec<IndexMetadata>> {
    let schema = table.schema.as_deref().unwrap_or(cfg.schema_or("dbo"));
    let rows = conn.query(COLUMN_INDEX_QUERY, &[schema, &table.name, column]).await?;
    Ok(rows
        .iter()
        .filter_map(|row| {
            Some(IndexMetadata {
                name: row.text("index_name")?,
                unique: row.flag("is_unique"),
                using: row.text("index_type"),
                collation: sort_order(row.text("is_descending")),
                seq: row.int("key_ordinal"),
            })
        })
        .collect())
}

pub async fn fetch_foreign_keys(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
) -> Result<Vec<ForeignKeyRow>> {
    let schema = table.schema.as_deref().unwrap_or(cfg.schema_or("dbo"));
    let rows = conn.query(FOREIGN_KEYS_QUERY, &[schema, &table.name]).await?;
    rows.iter()
        .map(|row| {
            Ok(ForeignKeyRow {
                column_name: row.required_text("column_name", Dialect::Mssql)?,
                target_schema: row.text("target_schema"),
                target_table: row.required_text("target_table", Dialect::Mssql)?,
                target_column: row.text("target_column"),
                constraint_name: row.text("constraint_name"),
            })
        })
        .collect()
}
