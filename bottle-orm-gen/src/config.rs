//! # Configuration Module
//!
//! Generator settings, loadable from a JSON file or from environment
//! variables (the `bottle-gen` binary loads a `.env` file first).
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `DB_DIALECT` | `connection.dialect` |
//! | `DATABASE_URL` | `connection.url` |
//! | `DB_HOST`, `DB_PORT`, `DB_USER`, `DB_PASSWORD`, `DB_NAME` | connection parts |
//! | `DB_SCHEMA` | `connection.schema` |
//! | `DB_MAX_CONNECTIONS` | `connection.max_connections` |
//! | `GEN_TABLES`, `GEN_SKIP_TABLES` | comma separated table filters |
//! | `GEN_CASE` | `upper`, `snake`, ... or `model:column` |
//! | `GEN_TIMESTAMPS`, `GEN_INDICES`, `GEN_NO_VIEWS`, `GEN_STRICT` | flags |
//! | `GEN_ASSOCIATIONS_FILE` | association specification path |
//! | `GEN_DISCOVER_FOREIGN_KEYS` | derive associations from catalog foreign keys |
//! | `GEN_OUT_DIR`, `GEN_CLEAN`, `GEN_LINT` | output settings |

// ============================================================================
// External Crate Imports
// ============================================================================

use std::{env, path::{Path, PathBuf}};

use serde::Deserialize;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    case::CaseSpec,
    connection::Dialect,
    errors::{Error, Result},
};

// ============================================================================
// Connection Settings
// ============================================================================

fn default_max_connections() -> u32 {
    5
}

/// How to reach the database.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    pub dialect: Dialect,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl ConnectionConfig {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            url: None,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            schema: None,
            max_connections: default_max_connections(),
        }
    }

    /// The configured schema, or the dialect's default.
    pub fn effective_schema(&self) -> Option<String> {
        self.schema.clone().or_else(|| self.dialect.default_schema(self.database.as_deref()))
    }

    /// The connection URL, assembled from parts when not given verbatim.
    pub fn connection_url(&self) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }

        let database = self
            .database
            .as_deref()
            .ok_or_else(|| Error::config("either a connection url or a database name is required"))?;

        if self.dialect == Dialect::Sqlite {
            return Ok(format!("sqlite://{}", database));
        }

        let host = self.host.as_deref().unwrap_or("localhost");
        let credentials = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{}:{}@", user, pass),
            (Some(user), None) => format!("{}@", user),
            _ => String::new(),
        };
        let port = self.port.map(|p| format!(":{}", p)).unwrap_or_default();

        Ok(format!("{}://{}{}{}/{}", self.dialect.url_scheme(), credentials, host, port, database))
    }
}

// ============================================================================
// Metadata Settings
// ============================================================================

/// What to extract and how to shape it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Only these tables (case-insensitive).
    pub tables: Option<Vec<String>>,
    /// Never these tables (case-insensitive).
    pub skip_tables: Option<Vec<String>>,
    pub case: Option<CaseSpec>,
    /// Mark generated models as managing `created_at`/`updated_at`.
    pub timestamps: bool,
    /// Emit one `index(...)` annotation per index participation.
    pub indices: bool,
    /// Skip views (MySQL/MariaDB).
    pub no_views: bool,
    /// Emit the attribute struct for each model.
    pub strict: bool,
    pub associations_file: Option<PathBuf>,
    /// Derive associations from the catalog's foreign keys.
    pub discover_foreign_keys: bool,
}

impl MetadataConfig {
    /// Inclusion/exclusion filter over catalog table names.
    pub fn accepts_table(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        let listed = |list: &Option<Vec<String>>| {
            list.as_ref().map(|l| l.iter().any(|t| t.trim().to_lowercase() == name))
        };
        if listed(&self.tables) == Some(false) {
            return false;
        }
        listed(&self.skip_tables) != Some(true)
    }
}

// ============================================================================
// Output Settings
// ============================================================================

/// Where the binary writes artifacts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Remove previously generated files before writing.
    pub clean: bool,
    /// Run `rustfmt` on the written files.
    pub lint: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { dir: PathBuf::from("models"), clean: false, lint: false }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Complete generator configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl GeneratorConfig {
    pub fn new(connection: ConnectionConfig) -> Self {
        Self { connection, metadata: MetadataConfig::default(), output: OutputConfig::default() }
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: GeneratorConfig = serde_json::from_str(&contents)?;
        Ok(config)
    }

    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from any key lookup; `from_env` uses the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str| {
            var(key).map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")).unwrap_or(false)
        };
        let list = |key: &str| {
            var(key).map(|v| v.split(',').map(|t| t.trim().to_string()).filter(|t| !t.is_empty()).collect::<Vec<_>>())
        };

        let url = var("DATABASE_URL");
        let dialect = match var("DB_DIALECT") {
            Some(d) => d.parse()?,
            None => url
                .as_deref()
                .and_then(Dialect::from_url)
                .ok_or_else(|| Error::config("DB_DIALECT is not defined"))?,
        };

        let mut connection = ConnectionConfig::new(dialect);
        connection.url = url;
        connection.host = var("DB_HOST");
        connection.port = var("DB_PORT")
            .map(|p| p.parse().map_err(|_| Error::Config(format!("DB_PORT `{}` is not a port number", p))))
            .transpose()?;
        connection.username = var("DB_USER");
        connection.password = var("DB_PASSWORD");
        connection.database = var("DB_NAME");
        connection.schema = var("DB_SCHEMA");
        if let Some(max) = var("DB_MAX_CONNECTIONS") {
            connection.max_connections = max
                .parse()
                .map_err(|_| Error::Config(format!("DB_MAX_CONNECTIONS `{}` is not a number", max)))?;
        }

        let metadata = MetadataConfig {
            tables: list("GEN_TABLES"),
            skip_tables: list("GEN_SKIP_TABLES"),
            case: var("GEN_CASE").map(|c| c.parse()).transpose()?,
            timestamps: flag("GEN_TIMESTAMPS"),
            indices: flag("GEN_INDICES"),
            no_views: flag("GEN_NO_VIEWS"),
            strict: flag("GEN_STRICT"),
            associations_file: var("GEN_ASSOCIATIONS_FILE").map(PathBuf::from),
            discover_foreign_keys: flag("GEN_DISCOVER_FOREIGN_KEYS"),
        };

        let mut output = OutputConfig::default();
        if let Some(dir) = var("GEN_OUT_DIR") {
            output.dir = PathBuf::from(dir);
        }
        output.clean = flag("GEN_CLEAN");
        output.lint = flag("GEN_LINT");

        Ok(Self { connection, metadata, output })
    }

    /// Rejects configurations that cannot produce a build.
    pub fn validate(&self) -> Result<()> {
        let conn = &self.connection;
        if conn.url.is_none() && conn.database.is_none() {
            return Err(Error::config("either a connection url or a database name is required"));
        }
        if conn.max_connections == 0 {
            return Err(Error::config("max_connections must be at least 1"));
        }
        if let Some(path) = &self.metadata.associations_file
            && !path.is_file()
        {
            return Err(Error::Config(format!("associations file `{}` does not exist", path.display())));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::case::Case;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_filter_inclusion_and_exclusion() {
        let config = MetadataConfig {
            tables: Some(vec!["Data_Types".to_string()]),
            skip_tables: Some(vec!["indices".to_string()]),
            ..Default::default()
        };
        assert!(config.accepts_table("data_types"));
        assert!(!config.accepts_table("indices"));
        assert!(!config.accepts_table("authors"));

        let skip_only = MetadataConfig { skip_tables: Some(vec!["INDICES".to_string()]), ..Default::default() };
        assert!(!skip_only.accepts_table("indices"));
        assert!(skip_only.accepts_table("authors"));
    }

    #[test]
    fn test_connection_url_from_parts() {
        let mut conn = ConnectionConfig::new(Dialect::Postgres);
        conn.host = Some("db".to_string());
        conn.port = Some(5432);
        conn.username = Some("app".to_string());
        conn.password = Some("secret".to_string());
        conn.database = Some("shop".to_string());
        assert_eq!(conn.connection_url().unwrap(), "postgres://app:secret@db:5432/shop");

        let mut maria = ConnectionConfig::new(Dialect::Mariadb);
        maria.database = Some("shop".to_string());
        assert_eq!(maria.connection_url().unwrap(), "mysql://localhost/shop");
        assert_eq!(maria.effective_schema().as_deref(), Some("shop"));
    }

    #[test]
    fn test_from_lookup() {
        let config = GeneratorConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("GEN_TABLES", "users, posts,"),
            ("GEN_CASE", "pascal:camel"),
            ("GEN_STRICT", "true"),
            ("GEN_INDICES", "1"),
        ]))
        .unwrap();

        assert_eq!(config.connection.dialect, Dialect::Postgres);
        assert_eq!(config.metadata.tables, Some(vec!["users".to_string(), "posts".to_string()]));
        assert_eq!(config.metadata.case, Some(CaseSpec::PerClass { model: Case::Pascal, column: Case::Camel }));
        assert!(config.metadata.strict);
        assert!(config.metadata.indices);
        assert!(!config.metadata.timestamps);
        assert_eq!(config.output.dir, PathBuf::from("models"));
    }

    #[test]
    fn test_from_lookup_requires_dialect() {
        let err = GeneratorConfig::from_lookup(lookup(&[("DB_NAME", "app")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_validate() {
        let config = GeneratorConfig::new(ConnectionConfig::new(Dialect::Mysql));
        assert!(config.validate().is_err());

        let mut config = GeneratorConfig::new(ConnectionConfig::new(Dialect::Sqlite));
        config.connection.url = Some("sqlite::memory:".to_string());
        assert!(config.validate().is_ok());

        config.metadata.associations_file = Some(PathBuf::from("/definitely/not/here.csv"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deserialize_json() {
        let json = r#"{
            "connection": { "dialect": "mariadb", "database": "shop" },
            "metadata": { "case": { "model": "pascal", "column": "snake" }, "no_views": true }
        }"#;
        let config: GeneratorConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.connection.dialect, Dialect::Mariadb);
        assert_eq!(config.connection.max_connections, 5);
        assert!(config.metadata.no_views);
        assert!(!config.output.lint);
    }
}
