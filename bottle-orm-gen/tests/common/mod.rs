#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use bottle_orm_gen::{
    Artifact, ArtifactWriter, Connection, ConnectionConfig, Dialect, Error, GeneratorConfig, Linter, ORM_KEYS,
    Result, Row, SqlxConnection,
};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A canned response: returned when the SQL contains `needle` and, if set,
/// one of the parameters equals `param`. Failing scripts return a database
/// error instead of rows.
struct Script {
    needle: String,
    param: Option<String>,
    rows: Vec<Row>,
    fails: bool,
}

/// Fake catalog connection for dialects without a local server.
pub struct ScriptedConnection {
    scripts: Vec<Script>,
    pool_size: usize,
    pub log: Mutex<Vec<(String, Vec<String>)>>,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self { scripts: Vec::new(), pool_size: 4, log: Mutex::new(Vec::new()) }
    }

    pub fn on(mut self, needle: &str, rows: Vec<Row>) -> Self {
        self.scripts.push(Script { needle: needle.to_string(), param: None, rows, fails: false });
        self
    }

    pub fn on_param(mut self, needle: &str, param: &str, rows: Vec<Row>) -> Self {
        self.scripts.push(Script { needle: needle.to_string(), param: Some(param.to_string()), rows, fails: false });
        self
    }

    /// Scripts placed before `fail_on_param` take precedence.
    pub fn fail_on_param(mut self, needle: &str, param: &str) -> Self {
        self.scripts.push(Script {
            needle: needle.to_string(),
            param: Some(param.to_string()),
            rows: Vec::new(),
            fails: true,
        });
        self
    }

    pub fn queries_containing(&self, needle: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|(sql, _)| sql.contains(needle)).count()
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn query(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        self.log.lock().unwrap().push((sql.to_string(), params.iter().map(|p| p.to_string()).collect()));
        let script = self.scripts.iter().find(|s| {
            sql.contains(&s.needle) && s.param.as_deref().is_none_or(|p| params.contains(&p))
        });
        match script {
            Some(script) if script.fails => Err(Error::Database(sqlx::Error::PoolTimedOut)),
            Some(script) => Ok(script.rows.clone()),
            None => Ok(Vec::new()),
        }
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}

/// Records written artifacts and what the linter saw.
#[derive(Default)]
pub struct RecordingOutput {
    pub written: Mutex<Vec<String>>,
    pub linted: Mutex<Option<(usize, usize)>>,
}

#[async_trait]
impl ArtifactWriter for RecordingOutput {
    async fn write(&self, artifact: &Artifact) -> Result<()> {
        tokio::task::yield_now().await;
        self.written.lock().unwrap().push(artifact.file_name.clone());
        Ok(())
    }
}

#[async_trait]
impl Linter for RecordingOutput {
    async fn lint(&self, artifacts: &[&Artifact]) -> Result<()> {
        let written = self.written.lock().unwrap().len();
        *self.linted.lock().unwrap() = Some((written, artifacts.len()));
        Ok(())
    }
}

/// Checks generated source against what Bottle ORM's `Model` derive
/// accepts: known `#[orm(...)]` keys only, and no navigation types among
/// the model's column fields.
pub fn assert_derive_compatible(src: &str) {
    for line in src.lines().map(str::trim).filter(|l| l.starts_with("#[orm(")) {
        let inner = line.trim_start_matches("#[orm(").trim_end_matches(")]");
        for key in inner.split(", ") {
            match key.split_once(" = ") {
                Some(("size", value)) => assert!(value.parse::<usize>().is_ok(), "{}", line),
                Some(("foreign_key", value)) => {
                    let target = value.trim_matches('"');
                    assert_eq!(target.split("::").count(), 2, "{}", line);
                }
                Some((name, _)) => panic!("`{}` takes no value in {}", name, line),
                None => assert!(ORM_KEYS.contains(&key), "unsupported key `{}` in {}", key, line),
            }
        }
    }
    assert!(!src.lines().any(|l| l.starts_with("#[orm(")), "struct level attribute in\n{}", src);

    let model = src.split("#[derive(Debug, Clone, Model)]\n").nth(1).expect("no model struct");
    let body = &model[..model.find("}\n").expect("unterminated model struct")];
    assert!(!body.contains("Vec<") && !body.contains("Box<"), "navigation inside model:\n{}", body);
}

pub fn config(dialect: Dialect, database: &str) -> GeneratorConfig {
    let mut connection = ConnectionConfig::new(dialect);
    connection.database = Some(database.to_string());
    GeneratorConfig::new(connection)
}

/// In-memory SQLite with one pooled connection, so every statement sees the
/// same database.
pub async fn sqlite(statements: &[&str]) -> SqlxConnection {
    let conn = SqlxConnection::connect("sqlite::memory:", None, 1).await.unwrap();
    for statement in statements {
        conn.query(statement, &[]).await.unwrap();
    }
    conn
}
