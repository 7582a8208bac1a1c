//! # Type Mapping Module
//!
//! Static tables mapping a dialect's native column type to
//!
//! 1. the **canonical mapping type**, the SQL token documented on each
//!    generated field (and the source of its `size = N`), and
//! 2. the **host type**, the Rust type of the generated struct field.
//!
//! ## Lookup Policy
//!
//! Lookups are exact matches on the lower-cased catalog type name. What
//! happens on a miss is decided by the dialect adapter:
//!
//! - PostgreSQL: best effort, mapped to `TEXT`/`String` with a diagnostic.
//! - MySQL/MariaDB/MSSQL: the column is skipped with a diagnostic.
//! - SQLite: falls back to SQLite's type affinity rules, which always
//!   succeed.
//!
//! ## Parameters
//!
//! Some tokens take parameters taken from catalog metadata:
//!
//! - `DECIMAL(p,s)` from numeric precision/scale
//! - `VARCHAR(n)`/`CHAR(n)` from character length
//! - `TIMESTAMP(fsp)`/`TIME(fsp)` from fractional-second precision
//!
//! ## Example
//!
//! ```rust,ignore
//! let mapped = lookup(Dialect::Postgres, "numeric").unwrap();
//! let params = TypeParams { precision: Some(10), scale: Some(2), ..Default::default() };
//! assert_eq!(mapped.render(&params), "DECIMAL(10,2)");
//! assert_eq!(mapped.host.rust_type(), "Decimal");
//! ```

use serde::{Deserialize, Serialize};

use crate::connection::Dialect;

// ============================================================================
// Host Types
// ============================================================================

/// Rust type of a generated field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U64,
    F32,
    F64,
    Decimal,
    String,
    Bytes,
    Uuid,
    Json,
    Date,
    Time,
    DateTime,
    DateTimeUtc,
    Array(Box<HostType>),
}

impl HostType {
    /// Type as written in generated code (without `Option`).
    pub fn rust_type(&self) -> String {
        match self {
            HostType::Bool => "bool".to_string(),
            HostType::I8 => "i8".to_string(),
            HostType::I16 => "i16".to_string(),
            HostType::I32 => "i32".to_string(),
            HostType::I64 => "i64".to_string(),
            HostType::U8 => "u8".to_string(),
            HostType::U64 => "u64".to_string(),
            HostType::F32 => "f32".to_string(),
            HostType::F64 => "f64".to_string(),
            HostType::Decimal => "Decimal".to_string(),
            HostType::String => "String".to_string(),
            HostType::Bytes => "Vec<u8>".to_string(),
            HostType::Uuid => "Uuid".to_string(),
            HostType::Json => "Value".to_string(),
            HostType::Date => "NaiveDate".to_string(),
            HostType::Time => "NaiveTime".to_string(),
            HostType::DateTime => "NaiveDateTime".to_string(),
            HostType::DateTimeUtc => "DateTime<Utc>".to_string(),
            HostType::Array(inner) => format!("Vec<{}>", inner.rust_type()),
        }
    }

    /// `use` paths the generated module needs for this type.
    pub fn imports(&self) -> Vec<&'static str> {
        match self {
            HostType::Decimal => vec!["rust_decimal::Decimal"],
            HostType::Uuid => vec!["uuid::Uuid"],
            HostType::Json => vec!["serde_json::Value"],
            HostType::Date => vec!["chrono::NaiveDate"],
            HostType::Time => vec!["chrono::NaiveTime"],
            HostType::DateTime => vec!["chrono::NaiveDateTime"],
            HostType::DateTimeUtc => vec!["chrono::DateTime", "chrono::Utc"],
            HostType::Array(inner) => inner.imports(),
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// Mapped Types
// ============================================================================

/// Which catalog parameters a canonical token accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    None,
    Length,
    PrecisionScale,
    FractionalSeconds,
}

/// The result of a successful lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedType {
    pub mapping: &'static str,
    pub host: HostType,
    pub params: ParamKind,
}

/// Size information exposed by the catalog for one column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypeParams {
    pub length: Option<i64>,
    pub precision: Option<i64>,
    pub scale: Option<i64>,
    pub datetime_precision: Option<i64>,
}

impl MappedType {
    fn new(mapping: &'static str, host: HostType) -> Self {
        Self { mapping, host, params: ParamKind::None }
    }

    /// Best-effort fallback for unknown types.
    pub(crate) fn text() -> Self {
        Self::new("TEXT", HostType::String)
    }

    fn sized(mapping: &'static str, host: HostType, params: ParamKind) -> Self {
        Self { mapping, host, params }
    }

    /// Renders the canonical token, appending a parenthesized parameter list
    /// when the catalog exposes one.
    pub fn render(&self, params: &TypeParams) -> String {
        let positive = |v: Option<i64>| v.filter(|v| *v > 0);
        match self.params {
            ParamKind::None => self.mapping.to_string(),
            ParamKind::Length => match positive(params.length) {
                Some(len) => format!("{}({})", self.mapping, len),
                None => self.mapping.to_string(),
            },
            ParamKind::PrecisionScale => match (positive(params.precision), params.scale) {
                (Some(p), Some(s)) if s > 0 => format!("{}({},{})", self.mapping, p, s),
                (Some(p), _) => format!("{}({})", self.mapping, p),
                (None, _) => self.mapping.to_string(),
            },
            ParamKind::FractionalSeconds => match positive(params.datetime_precision) {
                Some(fsp) => format!("{}({})", self.mapping, fsp),
                None => self.mapping.to_string(),
            },
        }
    }
}

// ============================================================================
// Lookup
// ============================================================================

/// Exact-match lookup of a native type for `dialect`.
pub fn lookup(dialect: Dialect, native_type: &str) -> Option<MappedType> {
    let native = native_type.trim().to_lowercase();
    match dialect {
        Dialect::Postgres => postgres(&native),
        Dialect::Mysql => mysql(&native),
        Dialect::Mariadb => mariadb(&native),
        Dialect::Sqlite => sqlite(&native),
        Dialect::Mssql => mssql(&native),
    }
}

fn postgres(native: &str) -> Option<MappedType> {
    use HostType as H;
    use ParamKind as P;

    let mapped = match native {
        // ------------------------------------------------------------
        // Integer Types
        // ------------------------------------------------------------
        "int2" | "smallint" | "smallserial" => MappedType::new("SMALLINT", H::I16),
        "int4" | "integer" | "int" | "serial" => MappedType::new("INTEGER", H::I32),
        "int8" | "bigint" | "bigserial" | "oid" => MappedType::new("BIGINT", H::I64),

        // ------------------------------------------------------------
        // Numeric Types
        // ------------------------------------------------------------
        "numeric" | "decimal" => MappedType::sized("DECIMAL", H::Decimal, P::PrecisionScale),
        "money" => MappedType::new("DECIMAL", H::Decimal),
        "float4" | "real" => MappedType::new("REAL", H::F32),
        "float8" | "double precision" => MappedType::new("DOUBLE PRECISION", H::F64),

        // ------------------------------------------------------------
        // Text Types
        // ------------------------------------------------------------
        "varchar" | "character varying" => MappedType::sized("VARCHAR", H::String, P::Length),
        "bpchar" | "char" | "character" => MappedType::sized("CHAR", H::String, P::Length),
        "text" | "citext" | "name" => MappedType::new("TEXT", H::String),

        // ------------------------------------------------------------
        // Other Scalars
        // ------------------------------------------------------------
        "bool" | "boolean" => MappedType::new("BOOLEAN", H::Bool),
        "uuid" => MappedType::new("UUID", H::Uuid),
        "json" => MappedType::new("JSON", H::Json),
        "jsonb" => MappedType::new("JSONB", H::Json),
        "bytea" => MappedType::new("BLOB", H::Bytes),
        "inet" => MappedType::new("INET", H::String),
        "cidr" => MappedType::new("CIDR", H::String),
        "macaddr" | "macaddr8" => MappedType::new("MACADDR", H::String),
        "xml" => MappedType::new("XML", H::String),
        "tsvector" => MappedType::new("TSVECTOR", H::String),
        "interval" => MappedType::new("INTERVAL", H::String),
        "point" | "line" | "lseg" | "box" | "path" | "polygon" | "circle" | "geometry" | "geography" => {
            MappedType::new("GEOMETRY", H::String)
        }

        // ------------------------------------------------------------
        // Date/Time Types
        // ------------------------------------------------------------
        "date" => MappedType::new("DATE", H::Date),
        "time" | "timetz" | "time without time zone" | "time with time zone" => {
            MappedType::sized("TIME", H::Time, P::FractionalSeconds)
        }
        "timestamp" | "timestamp without time zone" => {
            MappedType::sized("TIMESTAMP", H::DateTime, P::FractionalSeconds)
        }
        "timestamptz" | "timestamp with time zone" => {
            MappedType::sized("TIMESTAMPTZ", H::DateTimeUtc, P::FractionalSeconds)
        }

        _ => return None,
    };
    Some(mapped)
}

fn mysql(native: &str) -> Option<MappedType> {
    use HostType as H;
    use ParamKind as P;

    let mapped = match native {
        // ------------------------------------------------------------
        // Integer Types
        // ------------------------------------------------------------
        "tinyint" => MappedType::new("TINYINT", H::I8),
        "smallint" => MappedType::new("SMALLINT", H::I16),
        "mediumint" | "int" | "integer" => MappedType::new("INTEGER", H::I32),
        "bigint" => MappedType::new("BIGINT", H::I64),
        "bool" | "boolean" => MappedType::new("BOOLEAN", H::Bool),
        "bit" => MappedType::sized("BIT", H::Bytes, P::Length),
        "year" => MappedType::new("YEAR", H::I16),

        // ------------------------------------------------------------
        // Numeric Types
        // ------------------------------------------------------------
        "decimal" | "numeric" | "dec" | "fixed" => MappedType::sized("DECIMAL", H::Decimal, P::PrecisionScale),
        "float" => MappedType::new("FLOAT", H::F32),
        "double" | "real" | "double precision" => MappedType::new("DOUBLE PRECISION", H::F64),

        // ------------------------------------------------------------
        // Text Types
        // ------------------------------------------------------------
        "char" => MappedType::sized("CHAR", H::String, P::Length),
        "varchar" => MappedType::sized("VARCHAR", H::String, P::Length),
        "tinytext" | "text" | "mediumtext" | "longtext" => MappedType::new("TEXT", H::String),
        "enum" => MappedType::new("ENUM", H::String),
        "set" => MappedType::new("SET", H::String),
        "json" => MappedType::new("JSON", H::Json),

        // ------------------------------------------------------------
        // Binary Types
        // ------------------------------------------------------------
        "binary" | "varbinary" | "tinyblob" | "blob" | "mediumblob" | "longblob" => MappedType::new("BLOB", H::Bytes),
        "geometry" | "point" | "linestring" | "polygon" | "multipoint" | "multilinestring" | "multipolygon"
        | "geometrycollection" => MappedType::new("GEOMETRY", H::Bytes),

        // ------------------------------------------------------------
        // Date/Time Types
        // ------------------------------------------------------------
        "date" => MappedType::new("DATE", H::Date),
        "time" => MappedType::sized("TIME", H::Time, P::FractionalSeconds),
        "datetime" => MappedType::sized("TIMESTAMP", H::DateTime, P::FractionalSeconds),
        "timestamp" => MappedType::sized("TIMESTAMPTZ", H::DateTimeUtc, P::FractionalSeconds),

        _ => return None,
    };
    Some(mapped)
}

fn mariadb(native: &str) -> Option<MappedType> {
    match native {
        "uuid" => Some(MappedType::new("UUID", HostType::Uuid)),
        "inet4" | "inet6" => Some(MappedType::new("INET", HostType::String)),
        _ => mysql(native),
    }
}

fn sqlite(native: &str) -> Option<MappedType> {
    use HostType as H;
    use ParamKind as P;

    let mapped = match native {
        "integer" | "int" | "mediumint" | "int8" | "bigint" | "unsigned big int" => MappedType::new("INTEGER", H::I64),
        "tinyint" | "smallint" | "int2" => MappedType::new("SMALLINT", H::I16),
        "real" | "float" => MappedType::new("REAL", H::F64),
        "double" | "double precision" => MappedType::new("DOUBLE PRECISION", H::F64),
        "numeric" | "decimal" => MappedType::sized("DECIMAL", H::Decimal, P::PrecisionScale),
        "boolean" | "bool" => MappedType::new("BOOLEAN", H::Bool),
        "text" | "clob" => MappedType::new("TEXT", H::String),
        "varchar" | "nvarchar" | "varying character" | "character" | "nchar" | "native character" | "char" => {
            MappedType::sized("VARCHAR", H::String, P::Length)
        }
        "blob" => MappedType::new("BLOB", H::Bytes),
        "date" => MappedType::new("DATE", H::Date),
        "time" => MappedType::new("TIME", H::Time),
        "datetime" | "timestamp" => MappedType::new("TIMESTAMP", H::DateTime),
        "uuid" => MappedType::new("UUID", H::Uuid),
        "json" => MappedType::new("JSON", H::Json),
        _ => return None,
    };
    Some(mapped)
}

fn mssql(native: &str) -> Option<MappedType> {
    use HostType as H;
    use ParamKind as P;

    let mapped = match native {
        // ------------------------------------------------------------
        // Integer Types
        // ------------------------------------------------------------
        "bit" => MappedType::new("BOOLEAN", H::Bool),
        "tinyint" => MappedType::new("TINYINT", H::U8),
        "smallint" => MappedType::new("SMALLINT", H::I16),
        "int" => MappedType::new("INTEGER", H::I32),
        "bigint" => MappedType::new("BIGINT", H::I64),

        // ------------------------------------------------------------
        // Numeric Types
        // ------------------------------------------------------------
        "decimal" | "numeric" => MappedType::sized("DECIMAL", H::Decimal, P::PrecisionScale),
        "money" | "smallmoney" => MappedType::new("DECIMAL", H::Decimal),
        "float" => MappedType::new("DOUBLE PRECISION", H::F64),
        "real" => MappedType::new("REAL", H::F32),

        // ------------------------------------------------------------
        // Text Types
        // ------------------------------------------------------------
        "char" | "nchar" => MappedType::sized("CHAR", H::String, P::Length),
        "varchar" | "nvarchar" => MappedType::sized("VARCHAR", H::String, P::Length),
        "text" | "ntext" => MappedType::new("TEXT", H::String),
        "xml" => MappedType::new("XML", H::String),
        "uniqueidentifier" => MappedType::new("UUID", H::Uuid),

        // ------------------------------------------------------------
        // Binary Types
        // ------------------------------------------------------------
        "binary" | "varbinary" | "image" | "rowversion" | "timestamp" => MappedType::new("BLOB", H::Bytes),

        // ------------------------------------------------------------
        // Date/Time Types
        // ------------------------------------------------------------
        "date" => MappedType::new("DATE", H::Date),
        "time" => MappedType::sized("TIME", H::Time, P::FractionalSeconds),
        "datetime" | "smalldatetime" => MappedType::new("TIMESTAMP", H::DateTime),
        "datetime2" => MappedType::sized("TIMESTAMP", H::DateTime, P::FractionalSeconds),
        "datetimeoffset" => MappedType::sized("TIMESTAMPTZ", H::DateTimeUtc, P::FractionalSeconds),

        _ => return None,
    };
    Some(mapped)
}

/// SQLite's column affinity rules (section 3.1 of the SQLite datatype docs).
///
/// Never fails: every declared type has an affinity.
pub fn sqlite_affinity(declared: &str) -> MappedType {
    let upper = declared.to_ascii_uppercase();
    if upper.contains("INT") {
        MappedType::new("INTEGER", HostType::I64)
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        MappedType::new("TEXT", HostType::String)
    } else if upper.is_empty() || upper.contains("BLOB") {
        MappedType::new("BLOB", HostType::Bytes)
    } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
        MappedType::new("REAL", HostType::F64)
    } else {
        MappedType::new("DECIMAL", HostType::Decimal)
    }
}

/// Splits a declared type such as `VARCHAR(255)` or `decimal(10, 2)` into
/// its base name and numeric arguments.
pub fn split_declared_type(declared: &str) -> (String, Vec<i64>) {
    let declared = declared.trim();
    match declared.split_once('(') {
        Some((base, rest)) => {
            let args = rest
                .trim_end_matches(')')
                .split(',')
                .filter_map(|a| a.trim().parse::<i64>().ok())
                .collect();
            (base.trim().to_lowercase(), args)
        }
        None => (declared.to_lowercase(), Vec::new()),
    }
}

/// Extracts the parenthesized literal list of an `enum(...)`/`set(...)`
/// signature verbatim, including the parentheses.
pub fn literal_values(extended: &str) -> Option<&str> {
    let start = extended.find('(')?;
    let end = extended.rfind(')')?;
    (end > start).then(|| &extended[start..=end])
}

// ============================================================================
// Tests
// ============================================================================
