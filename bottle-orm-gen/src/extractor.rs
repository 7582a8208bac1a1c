//! # Metadata Extractor Module
//!
//! Drives a [`DialectAdapter`] over every accepted table and assembles one
//! [`TableMetadata`] per table.
//!
//! ## Flow
//!
//! 1. `fetch_tables` lists the schema, then the inclusion/exclusion filter
//!    drops unwanted tables.
//! 2. Per table: columns, then per-column index participation (unless the
//!    adapter already embeds it), then catalog foreign keys when discovery is
//!    enabled.
//!
//! Tables are processed concurrently, bounded by the connection's pool size.
//! Each table is assembled by a single task and only published once complete,
//! and results keep the catalog order. The first error aborts the whole
//! extraction.

// ============================================================================
// External Crate Imports
// ============================================================================

use futures::{StreamExt, TryStreamExt, stream};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    config::MetadataConfig,
    connection::Connection,
    dialects::{DialectAdapter, ForeignKeyRow, IntrospectionConfig},
    errors::Result,
    metadata::{Diagnostic, TableMetadata, TableName},
};

// ============================================================================
// Extraction Results
// ============================================================================

/// A foreign key found in the catalog, with the table that declares it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogForeignKey {
    pub table: TableName,
    pub key: ForeignKeyRow,
}

/// Everything the extraction phase produced.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// Accepted tables in catalog order.
    pub tables: Vec<TableMetadata>,
    /// Empty unless foreign-key discovery is enabled.
    pub foreign_keys: Vec<CatalogForeignKey>,
    pub diagnostics: Vec<Diagnostic>,
}

struct ExtractedTable {
    metadata: TableMetadata,
    foreign_keys: Vec<CatalogForeignKey>,
    diagnostics: Vec<Diagnostic>,
}

// ============================================================================
// Extractor
// ============================================================================

/// Builds table metadata from a live catalog.
///
/// # Example
///
/// ```rust,ignore
/// let extractor = MetadataExtractor::new(&conn, DialectAdapter::Sqlite, introspection, &config.metadata);
/// let extraction = extractor.extract().await?;
/// for table in &extraction.tables {
///     println!("{} ({} columns)", table.name, table.columns.len());
/// }
/// ```
pub struct MetadataExtractor<'a> {
    conn: &'a dyn Connection,
    adapter: DialectAdapter,
    introspection: IntrospectionConfig,
    config: &'a MetadataConfig,
}

impl<'a> MetadataExtractor<'a> {
    pub fn new(
        conn: &'a dyn Connection,
        adapter: DialectAdapter,
        introspection: IntrospectionConfig,
        config: &'a MetadataConfig,
    ) -> Self {
        Self { conn, adapter, introspection, config }
    }

    /// Tables that pass the inclusion/exclusion filter.
    pub async fn accepted_tables(&self) -> Result<Vec<TableName>> {
        let tables = self.adapter.fetch_tables(self.conn, &self.introspection).await?;
        let total = tables.len();
        let accepted: Vec<TableName> = tables.into_iter().filter(|t| self.config.accepts_table(&t.name)).collect();
        log::debug!("{} of {} tables accepted by the filter", accepted.len(), total);
        Ok(accepted)
    }

    /// Runs the full extraction.
    pub async fn extract(&self) -> Result<Extraction> {
        let tables = self.accepted_tables().await?;
        let workers = self.conn.pool_size().max(1);

        let extracted: Vec<ExtractedTable> = stream::iter(tables)
            .map(|table| self.extract_table(table))
            .buffered(workers)
            .try_collect()
            .await?;

        let mut extraction = Extraction::default();
        for table in extracted {
            extraction.tables.push(table.metadata);
            extraction.foreign_keys.extend(table.foreign_keys);
            extraction.diagnostics.extend(table.diagnostics);
        }

        log::info!(
            "Extracted {} tables from {} ({} diagnostics)",
            extraction.tables.len(),
            self.adapter.dialect(),
            extraction.diagnostics.len()
        );
        Ok(extraction)
    }

    async fn extract_table(&self, table: TableName) -> Result<ExtractedTable> {
        log::debug!("Extracting {}", table);

        let mut diagnostics = Vec::new();
        let columns = self
            .adapter
            .fetch_columns_metadata(self.conn, &self.introspection, &table, &mut diagnostics)
            .await?;

        let mut metadata = TableMetadata::new(&table, self.config.timestamps);
        for mut column in columns {
            if !self.adapter.indices_embedded() {
                column.indices = self
                    .adapter
                    .fetch_column_index_metadata(self.conn, &self.introspection, &table, &column.origin_name)
                    .await?;
            }
            metadata.columns.insert(column.origin_name.clone(), column);
        }

        let foreign_keys = if self.config.discover_foreign_keys {
            self.adapter
                .fetch_foreign_keys(self.conn, &self.introspection, &table)
                .await?
                .into_iter()
                .map(|key| CatalogForeignKey { table: table.clone(), key })
                .collect()
        } else {
            Vec::new()
        };

        Ok(ExtractedTable { metadata, foreign_keys, diagnostics })
    }
}
