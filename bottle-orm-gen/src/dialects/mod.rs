//! # Dialect Adapters
//!
//! One adapter per SQL dialect. Each runs read-only catalog queries through a
//! [`Connection`] and normalizes nullability, primary key, identity and
//! comment semantics into the common metadata shape.
//!
//! [`DialectAdapter`] is a plain tagged enum: the variant is picked from the
//! configured [`Dialect`] and every capability dispatches to the matching
//! module.
//!
//! | Capability | Purpose |
//! |------------|---------|
//! | `fetch_tables` | list tables (and views where applicable) of a schema |
//! | `fetch_columns_metadata` | columns in ordinal order |
//! | `fetch_column_index_metadata` | indexes one column participates in |
//! | `fetch_foreign_keys` | catalog foreign keys of a table |

// ============================================================================
// Module Declarations
// ============================================================================

pub mod mariadb;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;

// ============================================================================
// Imports
// ============================================================================

use crate::{
    connection::{Connection, Dialect},
    errors::Result,
    metadata::{ColumnMetadata, Diagnostic, IndexMetadata, TableName},
};

// ============================================================================
// Shared Types
// ============================================================================

/// Catalog settings needed by the adapters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntrospectionConfig {
    /// Schema (or MySQL database) to introspect. Ignored by SQLite.
    pub schema: Option<String>,
    /// Skip views (MySQL/MariaDB).
    pub no_views: bool,
}

impl IntrospectionConfig {
    pub(crate) fn schema_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.schema.as_deref().unwrap_or(fallback)
    }
}

/// A foreign key as found in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub column_name: String,
    pub target_schema: Option<String>,
    pub target_table: String,
    pub target_column: Option<String>,
    pub constraint_name: Option<String>,
}

// ============================================================================
// Adapter
// ============================================================================

/// Dialect-specific catalog access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialectAdapter {
    Postgres,
    Mysql,
    Mariadb,
    Sqlite,
    Mssql,
}

impl DialectAdapter {
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Postgres => DialectAdapter::Postgres,
            Dialect::Mysql => DialectAdapter::Mysql,
            Dialect::Mariadb => DialectAdapter::Mariadb,
            Dialect::Sqlite => DialectAdapter::Sqlite,
            Dialect::Mssql => DialectAdapter::Mssql,
        }
    }

    pub fn dialect(&self) -> Dialect {
        match self {
            DialectAdapter::Postgres => Dialect::Postgres,
            DialectAdapter::Mysql => Dialect::Mysql,
            DialectAdapter::Mariadb => Dialect::Mariadb,
            DialectAdapter::Sqlite => Dialect::Sqlite,
            DialectAdapter::Mssql => Dialect::Mssql,
        }
    }

    /// Whether `fetch_columns_metadata` already fills each column's indices,
    /// making per-column index queries redundant.
    pub fn indices_embedded(&self) -> bool {
        matches!(self, DialectAdapter::Postgres | DialectAdapter::Sqlite)
    }

    pub async fn fetch_tables(&self, conn: &dyn Connection, cfg: &IntrospectionConfig) -> Result<Vec<TableName>> {
        match self {
            DialectAdapter::Postgres => postgres::fetch_tables(conn, cfg).await,
            DialectAdapter::Mysql => mysql::fetch_tables(conn, cfg).await,
            DialectAdapter::Mariadb => mariadb::fetch_tables(conn, cfg).await,
            DialectAdapter::Sqlite => sqlite::fetch_tables(conn, cfg).await,
            DialectAdapter::Mssql => mssql::fetch_tables(conn, cfg).await,
        }
    }

    /// Columns of `table` in ordinal order. Unknown native types are reported
    /// through `diagnostics` and skipped or best-effort mapped.
    pub async fn fetch_columns_metadata(
        &self,
        conn: &dyn Connection,
        cfg: &IntrospectionConfig,
        table: &TableName,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Result<Vec<ColumnMetadata>> {
        let columns = match self {
            DialectAdapter::Postgres => postgres::fetch_columns_metadata(conn, cfg, table, diagnostics).await?,
            DialectAdapter::Mysql => mysql::fetch_columns_metadata(conn, cfg, table, diagnostics).await?,
            DialectAdapter::Mariadb => mariadb::fetch_columns_metadata(conn, cfg, table, diagnostics).await?,
            DialectAdapter::Sqlite => sqlite::fetch_columns_metadata(conn, cfg, table, diagnostics).await?,
            DialectAdapter::Mssql => mssql::fetch_columns_metadata(conn, cfg, table, diagnostics).await?,
        };
        Ok(columns.into_iter().map(ColumnMetadata::normalized).collect())
    }

    pub async fn fetch_column_index_metadata(
        &self,
        conn: &dyn Connection,
        cfg: &IntrospectionConfig,
        table: &TableName,
        column: &str,
    ) -> Result<Vec<IndexMetadata>> {
        match self {
            DialectAdapter::Postgres => postgres::fetch_column_index_metadata(conn, cfg, table, column).await,
            DialectAdapter::Mysql | DialectAdapter::Mariadb => {
                mysql::fetch_column_index_metadata(conn, cfg, table, column).await
            }
            DialectAdapter::Sqlite => sqlite::fetch_column_index_metadata(conn, cfg, table, column).await,
            DialectAdapter::Mssql => mssql::fetch_column_index_metadata(conn, cfg, table, column).await,
        }
    }

    pub async fn fetch_foreign_keys(
        &self,
        conn: &dyn Connection,
        cfg: &IntrospectionConfig,
        table: &TableName,
    ) -> Result<Vec<ForeignKeyRow>> {
        match self {
            DialectAdapter::Postgres => postgres::fetch_foreign_keys(conn, cfg, table).await,
            DialectAdapter::Mysql | DialectAdapter::Mariadb => mysql::fetch_foreign_keys(conn, cfg, table).await,
            DialectAdapter::Sqlite => sqlite::fetch_foreign_keys(conn, cfg, table).await,
            DialectAdapter::Mssql => mssql::fetch_foreign_keys(conn, cfg, table).await,
        }
    }
}

// ============================================================================
// Shared Helpers
// ============================================================================

/// Strips one level of single quotes from a SQL string literal, undoing
/// doubled quotes. Non-literals are returned unchanged.
pub(crate) fn unquote_literal(value: &str) -> String {
    let value = value.trim();
    let value = value.strip_prefix('N').filter(|v| v.starts_with('\'')).unwrap_or(value);
    if value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'') {
        value[1..value.len() - 1].replace("''", "'")
    } else {
        value.to_string()
    }
}

/// Removes parentheses that wrap the whole expression: `((0))` becomes `0`
/// while `now()` and `(a) + (b)` are left alone.
pub(crate) fn strip_wrapping_parens(value: &str) -> &str {
    let mut value = value.trim();
    while value.starts_with('(') && value.ends_with(')') {
        let mut depth = 0i32;
        let mut closes_early = false;
        for (idx, ch) in value.char_indices() {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth == 0 && idx < value.len() - 1 {
                closes_early = true;
                break;
            }
        }
        if closes_early {
            break;
        }
        value = value[1..value.len() - 1].trim();
    }
    value
}

/// Maps `ASC`/`DESC` style catalog spellings to a collation token.
pub(crate) fn sort_order(raw: Option<String>) -> Option<String> {
    match raw?.trim().to_ascii_uppercase().as_str() {
        "A" | "ASC" | "0" | "FALSE" => Some("ASC".to_string()),
        "D" | "DESC" | "1" | "TRUE" => Some("DESC".to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unquote_literal() {
        assert_eq!(unquote_literal("'abc'"), "abc");
        assert_eq!(unquote_literal("'it''s'"), "it's");
        assert_eq!(unquote_literal("N'text'"), "text");
        assert_eq!(unquote_literal("CURRENT_TIMESTAMP"), "CURRENT_TIMESTAMP");
        assert_eq!(unquote_literal("'"), "'");
        assert_eq!(unquote_literal("NOW()"), "NOW()");
    }

    #[test]
    fn test_strip_wrapping_parens() {
        assert_eq!(strip_wrapping_parens("((0))"), "0");
        assert_eq!(strip_wrapping_parens("(getdate())"), "getdate()");
        assert_eq!(strip_wrapping_parens("now()"), "now()");
        assert_eq!(strip_wrapping_parens("(a) + (b)"), "(a) + (b)");
        assert_eq!(strip_wrapping_parens("('x')"), "'x'");
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(sort_order(Some("A".to_string())).as_deref(), Some("ASC"));
        assert_eq!(sort_order(Some("D".to_string())).as_deref(), Some("DESC"));
        assert_eq!(sort_order(None), None);
    }

    #[test]
    fn test_adapter_round_trips_dialect() {
        for dialect in [Dialect::Postgres, Dialect::Mysql, Dialect::Mariadb, Dialect::Sqlite, Dialect::Mssql] {
            assert_eq!(DialectAdapter::for_dialect(dialect).dialect(), dialect);
        }
        assert!(DialectAdapter::Postgres.indices_embedded());
        assert!(DialectAdapter::Sqlite.indices_embedded());
        assert!(!DialectAdapter::Mysql.indices_embedded());
    }
}
