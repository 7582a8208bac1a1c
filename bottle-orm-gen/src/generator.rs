//! # Generator Module
//!
//! The orchestrator. Sequences the pipeline phases for one build:
//!
//! 1. **Extraction**: tables, columns and indices through the dialect adapter
//! 2. **Associations**: association file (cached) and/or catalog foreign keys
//! 3. **Case transformation**: identifiers renamed, origin names kept
//! 4. **Synthesis**: one model module per table plus `mod.rs`
//!
//! [`Generator::generate`] additionally hands the artifacts to an
//! [`ArtifactWriter`] and, once every write has completed, to an optional
//! [`Linter`].
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use bottle_orm_gen::{Generator, GeneratorConfig, SqlxConnection};
//!
//! let config = GeneratorConfig::from_env()?;
//! let conn = SqlxConnection::connect(&config.connection.connection_url()?, Some(config.connection.dialect), 4).await?;
//!
//! let generator = Generator::new(config);
//! let output = generator.build(&conn).await?;
//! for (table, artifact) in &output.artifacts {
//!     println!("{} -> {}", table, artifact.file_name);
//! }
//! ```

// ============================================================================
// External Crate Imports
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use indexmap::IndexMap;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    associations::{self, AssociationCache, AssociationsParsed},
    case::CaseTransform,
    config::GeneratorConfig,
    connection::Connection,
    dialects::{DialectAdapter, IntrospectionConfig},
    errors::Result,
    extractor::MetadataExtractor,
    metadata::{Diagnostic, TableMetadata},
    synthesizer::{Artifact, CodeSynthesizer, SynthesisOptions},
};

// ============================================================================
// Output Collaborators
// ============================================================================

/// Persists one generated artifact.
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    async fn write(&self, artifact: &Artifact) -> Result<()>;
}

/// Post-processes the complete set of written artifacts.
#[async_trait]
pub trait Linter: Send + Sync {
    async fn lint(&self, artifacts: &[&Artifact]) -> Result<()>;
}

// ============================================================================
// Build Output
// ============================================================================

/// Result of one build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Final (associated and transformed) metadata.
    pub tables: Vec<TableMetadata>,
    /// Model modules keyed by table name.
    pub artifacts: IndexMap<String, Artifact>,
    /// The aggregate `mod.rs`.
    pub index: Artifact,
    /// Non-fatal findings, for display only.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildOutput {
    /// Every artifact, the index last.
    pub fn all_artifacts(&self) -> Vec<&Artifact> {
        self.artifacts.values().chain(std::iter::once(&self.index)).collect()
    }
}

// ============================================================================
// Generator
// ============================================================================

/// Runs builds for one configuration.
///
/// The generator owns the association cache, so repeated builds against the
/// same association file parse it once. Call
/// [`AssociationCache::invalidate`] through [`Generator::cache`] after
/// editing the file.
pub struct Generator {
    config: GeneratorConfig,
    case_transform: CaseTransform,
    cache: AssociationCache,
}

impl Generator {
    /// Creates a generator. Identifiers follow `config.metadata.case`, or
    /// Rust conventions when it is unset.
    pub fn new(config: GeneratorConfig) -> Self {
        let case_transform = config.metadata.case.map(CaseTransform::from).unwrap_or_default();
        Self { config, case_transform, cache: AssociationCache::new() }
    }

    /// Replaces the case transform, e.g. with a custom one.
    pub fn with_case_transform(mut self, case_transform: CaseTransform) -> Self {
        self.case_transform = case_transform;
        self
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn cache(&self) -> &AssociationCache {
        &self.cache
    }

    /// Runs every phase and returns the artifacts without writing them.
    ///
    /// Any database or association error aborts the build; no partial
    /// output is returned.
    pub async fn build(&self, conn: &dyn Connection) -> Result<BuildOutput> {
        let metadata = &self.config.metadata;
        let adapter = DialectAdapter::for_dialect(self.config.connection.dialect);
        let introspection = IntrospectionConfig {
            schema: self.config.connection.effective_schema(),
            no_views: metadata.no_views,
        };

        // ====================================================================
        // Phase 1: Extraction
        // ====================================================================
        let extraction = MetadataExtractor::new(conn, adapter, introspection, metadata).extract().await?;
        let mut tables = extraction.tables;

        // ====================================================================
        // Phase 2: Associations
        // ====================================================================
        let mut parsed = metadata.associations_file.as_ref().map(|path| self.cache.get_or_parse(path)).transpose()?;

        if metadata.discover_foreign_keys {
            let rows = associations::rows_from_foreign_keys(&extraction.foreign_keys, &tables);
            log::debug!("{} relationships discovered from foreign keys", rows.len());
            let merged = match parsed {
                Some(from_file) => from_file.extended(rows),
                None => AssociationsParsed::from_rows(rows),
            };
            parsed = Some(Arc::new(merged));
        }

        if let Some(parsed) = &parsed {
            parsed.apply(&mut tables);
        }

        // ====================================================================
        // Phase 3: Case Transformation
        // ====================================================================
        let tables: Vec<TableMetadata> =
            tables.into_iter().map(|table| self.case_transform.transform_table(table)).collect();

        // ====================================================================
        // Phase 4: Synthesis
        // ====================================================================
        let synthesis = CodeSynthesizer::new(SynthesisOptions::from(metadata)).synthesize(&tables);

        Ok(BuildOutput {
            tables,
            artifacts: synthesis.artifacts,
            index: synthesis.index,
            diagnostics: extraction.diagnostics,
        })
    }

    /// Builds, writes every artifact concurrently and lints once all writes
    /// have succeeded. The first failing write aborts before linting.
    pub async fn generate(
        &self,
        conn: &dyn Connection,
        writer: &dyn ArtifactWriter,
        linter: Option<&dyn Linter>,
    ) -> Result<BuildOutput> {
        let output = self.build(conn).await?;
        let artifacts = output.all_artifacts();

        try_join_all(artifacts.iter().map(|artifact| writer.write(artifact))).await?;
        log::info!("Wrote {} artifacts", artifacts.len());

        if let Some(linter) = linter {
            linter.lint(&artifacts).await?;
            log::info!("Lint finished");
        }

        Ok(output)
    }
}
