//! MariaDB catalog adapter.
//!
//! Shares the MySQL catalog queries. Since 10.2.7 MariaDB stores
//! `COLUMN_DEFAULT` as an SQL expression: string defaults arrive quoted and a
//! missing default is the literal text `NULL`.

use super::{mysql, unquote_literal, IntrospectionConfig};
use crate::{
    connection::{Connection, Dialect},
    errors::Result,
    metadata::{ColumnMetadata, Diagnostic, TableName},
};

pub async fn fetch_tables(conn: &dyn Connection, cfg: &IntrospectionConfig) -> Result<Vec<TableName>> {
    mysql::fetch_tables_as(conn, cfg, Dialect::Mariadb).await
}

pub async fn fetch_columns_metadata(
    conn: &dyn Connection,
    cfg: &IntrospectionConfig,
    table: &TableName,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Vec<ColumnMetadata>> {
    let rows = mysql::query_columns(conn, cfg, table).await?;
    let mut columns = Vec::with_capacity(rows.len());
    for row in &rows {
        if let Some(mut column) = mysql::column_from_row(Dialect::Mariadb, table, row, diagnostics)? {
            column.default_value = row.text("column_default").and_then(|d| normalize_default(&d));
            columns.push(column);
        }
    }
    Ok(columns)
}

fn normalize_default(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("NULL") {
        return None;
    }
    Some(unquote_literal(raw))
}
