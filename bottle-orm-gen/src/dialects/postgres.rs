//! PostgreSQL catalog adapter.
//!
//! Columns come from a single query joining `information_schema.columns`
//! with every index the column participates in. A column that belongs to
//! three indexes therefore appears in three rows; rows are grouped by
//! ordinal position and their index halves folded into one column.

use indexmap::IndexMap;

use super::{ForeignKeyRow, IntrospectionConfig};
use crate::{
    connection::{Connection, Dialect, Row},
    errors::Result,
    metadata::{ColumnMetadata, Diagnostic, IndexMetadata, TableName},
    typemap::{self, HostType, MappedType, TypeParams},
};

const TABLES_QUERY: &str = r#"
    SELECT
        t.table_schema::text AS table_schema,
        t.table_name::text AS table_name,
        obj_description(format('%I.%I', t.table_schema, t.table_name)::regclass, 'pg_class')::text AS table_comment
    FROM information_schema.tables t
    WHERE t.table_schema = $1 AND t.table_type = 'BASE TABLE'
    ORDER BY t.table_name
"#;

const COLUMNS_QUERY: &str = r#"
    SELECT
        c.ordinal_position::int8 AS ordinal_position,
        c.column_name::text AS column_name,
        c.data_type::text AS data_type,
        c.udt_name::text AS udt_name,
        c.is_nullable::text AS is_nullable,
        c.is_identity::text AS is_identity,
        c.column_default::text AS column_default,
        c.character_maximum_length::int8 AS character_maximum_length,
        c.numeric_precision::int8 AS numeric_precision,
        c.numeric_scale::int8 AS numeric_scale,
        c.datetime_precision::int8 AS datetime_precision,
        col_description(cls.oid, c.ordinal_position::int)::text AS column_comment,
        (
            SELECT string_agg(quote_literal(e.enumlabel), ',' ORDER BY e.enumsortorder)
            FROM pg_catalog.pg_type et
            JOIN pg_catalog.pg_namespace ens ON ens.oid = et.typnamespace
            JOIN pg_catalog.pg_enum e ON e.enumtypid = et.oid
            WHERE et.typname = c.udt_name AND ens.nspname = c.udt_schema
        )::text AS enum_values,
        ix.index_name,
        ix.is_primary,
        ix.is_unique,
        ix.index_method,
        ix.index_seq,
        ix.index_columns
    FROM information_schema.columns c
    JOIN pg_catalog.pg_namespace ns ON ns.nspname = c.table_schema
    JOIN pg_catalog.pg_class cls ON cls.relname = c.table_name AND cls.relnamespace = ns.oid
    JOIN pg_catalog.pg_attribute att ON att.attrelid = cls.oid AND att.attname = c.column_name
    LEFT JOIN LATERAL (
        SELECT
            ic.relname::text AS index_name,
            i.indisprimary AS is_primary,
            i.indisunique AS is_unique,
            am.amname::text AS index_method,
            (array_position(i.indkey::int2[], att.attnum) - array_lower(i.indkey::int2[], 1) + 1)::int8 AS index_seq,
            i.indnatts::int8 AS index_columns
        FROM pg_catalog.pg_index i
        JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid
        JOIN pg_catalog.pg_am am ON am.oid = ic.relam
        WHERE i.indrelid = cls.oid AND att.attnum = ANY(i.indkey)
    ) ix ON TRUE
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position, ix.index_name
"#;

const COLUMN_INDEX_QUERY: &str = r#"
    SELECT
        ic.relname::text AS index_name,
        i.indisunique AS is_unique,
        am.amname::text AS index_method,
        (array_position(i.indkey::int2[], att.attnum) - array_lower(i.indkey::int2[], 1) + 1)::int8 AS index_seq
    FROM pg_catalog.pg_index i
    JOIN pg_catalog.pg_class cls ON cls.oid = i.indrelid
    JOIN pg_catalog.pg_namespace ns ON ns.oid = cls.relnamespace
    JOIN pg_catalog.pg_class ic ON ic.oid = i.indexrelid
    JOIN pg_catalog.pg_am am ON am.oid = ic.relam
    JOIN pg_catalog.pg_attribute att ON att.attrelid = cls.oid AND att.attnum = ANY(i.indkey)
    WHERE ns.nspname = $1 AND cls.relname = $2 AND att.attname = $3 AND NOT i.indisprimary
    ORDER BY ic.relname
"#;

const FOREIGN_KEYS_QUERY: &str = r#"
    SELECT
        kcu.column_name::text AS column_name,
        ccu.table_schema::text AS target_schema,
        ccu.table_name::text AS target_table,
        ccu.column_name::text AS target_column,
        tc.constraint_name::text AS constraint_name
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
        ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    JOIN information_schema.constraint_column_usage ccu
        ON ccu.constraint_name = tc.constraint_name AND ccu.constraint_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1 AND tc.table_name = $2
    ORDER BY kcu.ordinal_position
"#;

pub async fn fetch_tables(conn: &dyn Connection, cfg: &IntrospectionConfig) -> Result<Vec<TableName>> {
    let schema = cfg.schema_or("public");
    let rows = conn.query(TABLES_QUERY, &[schema]).await?;
    rows.iter()
        .map(|row| {
            let name = row.required_text("table_name", Dialect::Postgres)?;
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
    let schema = table.schema.as_deref().unwrap_or(cfg.schema_or("public"));
    let rows = conn.query(COLUMNS_QUERY, &[schema, &table.name]).await?;

    group_by_ordinal(rows)
        .into_iter()
        .map(|(_, group)| fold_column(table, &group, diagnostics))
        .collect()
}

pub async fn fetch_column_index_metadata(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
    column: &str,
) -> Result<Vec<IndexMetadata>> {
    let schema = table.schema.as_deref().unwrap_or(cfg.schema_or("public"));
    let rows = conn.query(COLUMN_INDEX_QUERY, &[schema, &table.name, column]).await?;
    Ok(rows.iter().filter_map(index_from_row).collect())
}

pub async fn fetch_foreign_keys(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
) -> Result<Vec<ForeignKeyRow>> {
    let schema = table.schema.as_deref().unwrap_or(cfg.schema_or("public"));
    let rows = conn.query(FOREIGN_KEYS_QUERY, &[schema, &table.name]).await?;
    rows.iter()
        .map(|row| {
            Ok(ForeignKeyRow {
                column_name: row.required_text("column_name", Dialect::Postgres)?,
                target_schema: row.text("target_schema"),
                target_table: row.required_text("target_table", Dialect::Postgres)?,
                target_column: row.text("target_column"),
                constraint_name: row.text("constraint_name"),
            })
        })
        .collect()
}

// ============================================================================
// Row Folding
// ============================================================================

/// Groups the column×index product by ordinal position, keeping catalog
/// order.
pub(crate) fn group_by_ordinal(rows: Vec<Row>) -> IndexMap<i64, Vec<Row>> {
    let mut groups: IndexMap<i64, Vec<Row>> = IndexMap::new();
    for row in rows {
        let ordinal = row.int("ordinal_position").unwrap_or_default();
        groups.entry(ordinal).or_default().push(row);
    }
    groups
}

fn index_from_row(row: &Row) -> Option<IndexMetadata> {
    Some(IndexMetadata {
        name: row.text("index_name")?,
        unique: row.flag("is_unique"),
        using: row.text("index_method"),
        collation: None,
        seq: row.int("index_seq"),
    })
}

/// Builds one column from all rows sharing its ordinal position.
fn fold_column(table: &TableName, group: &[Row], diagnostics: &mut Vec<Diagnostic>) -> Result<ColumnMetadata> {
    let first = &group[0];
    let name = first.required_text("column_name", Dialect::Postgres)?;
    let data_type = first.text("data_type").unwrap_or_default();
    let udt_name = first.required_text("udt_name", Dialect::Postgres)?;

    let params = TypeParams {
        length: first.int("character_maximum_length"),
        precision: first.int("numeric_precision"),
        scale: first.int("numeric_scale"),
        datetime_precision: first.int("datetime_precision"),
    };

    let (mapping, host, extended) = resolve_type(table, &name, &data_type, &udt_name, first, &params, diagnostics);
    let mut column = ColumnMetadata::new(&name, &udt_name, mapping, host);
    column.native_type_extended = extended;

    let default = first.text("column_default");
    column.auto_increment = first.flag("is_identity")
        || default.as_deref().is_some_and(|d| d.starts_with("nextval("));
    column.default_value = default.as_deref().and_then(normalize_default);
    column.allow_null = first.flag("is_nullable");
    column.comment = first.text("column_comment");

    for row in group {
        let Some(index) = index_from_row(row) else { continue };
        let is_primary = row.flag("is_primary");
        column.primary_key |= is_primary;
        if is_primary {
            continue;
        }
        column.unique |= index.unique && row.int("index_columns") == Some(1);
        if !column.indices.iter().any(|i| i.name == index.name) {
            column.indices.push(index);
        }
    }

    Ok(column)
}

fn resolve_type(
    table: &TableName,
    column: &str,
    data_type: &str,
    udt_name: &str,
    row: &Row,
    params: &TypeParams,
    diagnostics: &mut Vec<Diagnostic>,
) -> (String, HostType, String) {
    if data_type.eq_ignore_ascii_case("USER-DEFINED")
        && let Some(values) = row.text("enum_values")
    {
        return (format!("ENUM({})", values), HostType::String, format!("enum({})", values));
    }

    if data_type.eq_ignore_ascii_case("ARRAY") {
        let element = udt_name.trim_start_matches('_');
        let mapped = lookup_or_text(table, column, element, diagnostics);
        return (
            format!("ARRAY({})", mapped.mapping),
            HostType::Array(Box::new(mapped.host)),
            format!("{}[]", element),
        );
    }

    let mapped = lookup_or_text(table, column, udt_name, diagnostics);
    (mapped.render(params), mapped.host, udt_name.to_lowercase())
}

fn lookup_or_text(table: &TableName, column: &str, native: &str, diagnostics: &mut Vec<Diagnostic>) -> MappedType {
    typemap::lookup(Dialect::Postgres, native).unwrap_or_else(|| {
        diagnostics.push(Diagnostic::unknown_type(table, column, native, "mapped as TEXT"));
        MappedType::text()
    })
}

/// Turns `'draft'::character varying` into `draft` and drops `NULL::...`
/// and sequence defaults.
fn normalize_default(raw: &str) -> Option<String> {
    if raw.starts_with("nextval(") {
        return None;
    }
    let raw = super::strip_wrapping_parens(raw);
    let value = match raw.rfind("::") {
        Some(pos) if raw.starts_with('\'') || raw.starts_with("NULL") => &raw[..pos],
        _ => raw,
    };
    let value = super::strip_wrapping_parens(value);
    if value.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(super::unquote_literal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_default() {
        assert_eq!(normalize_default("'draft'::character varying").as_deref(), Some("draft"));
        assert_eq!(normalize_default("NULL::character varying"), None);
        assert_eq!(normalize_default("nextval('users_id_seq'::regclass)"), None);
        assert_eq!(normalize_default("0").as_deref(), Some("0"));
        assert_eq!(normalize_default("now()").as_deref(), Some("now()"));
        assert_eq!(normalize_default("('{}'::jsonb)").as_deref(), Some("{}"));
    }

    #[test]
    fn test_group_by_ordinal_keeps_order() {
        let rows = vec![
            Row::new().with("ordinal_position", 1i64).with("index_name", "a"),
            Row::new().with("ordinal_position", 1i64).with("index_name", "b"),
            Row::new().with("ordinal_position", 2i64),
        ];
        let groups = group_by_ordinal(rows);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&1].len(), 2);
        assert_eq!(groups.keys().copied().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_catalog_queries_are_schema_aware() {
        // enum labels come from the type in the column's own schema
        assert!(COLUMNS_QUERY.contains("ens.nspname = c.udt_schema"));
        // int2vector subscripts start at 0, positions are reported from 1
        for query in [COLUMNS_QUERY, COLUMN_INDEX_QUERY] {
            assert!(query.contains("- array_lower(i.indkey::int2[], 1) + 1"));
        }
    }
}
