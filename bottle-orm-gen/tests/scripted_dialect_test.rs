mod common;

use bottle_orm_gen::{AssociationKind, Dialect, Error, Generator, HostType, Row, Value};
use common::ScriptedConnection;

// ============================================================================
// MySQL / MariaDB
// ============================================================================

fn mysql_catalog(status_default: &str, label_default: Value) -> ScriptedConnection {
    ScriptedConnection::new()
        .on(
            "INFORMATION_SCHEMA.TABLES",
            vec![
                Row::new()
                    .with("table_schema", "app")
                    .with("table_name", "run_stats")
                    .with("table_comment", "")
                    .with("table_type", "VIEW"),
                Row::new()
                    .with("table_schema", "app")
                    .with("table_name", "runs")
                    .with("table_comment", "")
                    .with("table_type", "BASE TABLE"),
            ],
        )
        .on_param(
            "INFORMATION_SCHEMA.COLUMNS",
            "runs",
            vec![
                Row::new()
                    .with("ordinal_position", 1i64)
                    .with("column_name", "id")
                    .with("data_type", "int")
                    .with("column_type", "int(10) unsigned")
                    .with("is_nullable", "NO")
                    .with("column_key", "PRI")
                    .with("extra", "auto_increment")
                    .with("column_default", Value::Null),
                Row::new()
                    .with("ordinal_position", 2i64)
                    .with("column_name", "status")
                    .with("data_type", "enum")
                    .with("column_type", "enum('AA','BB')")
                    .with("is_nullable", "NO")
                    .with("column_key", "")
                    .with("extra", "")
                    .with("column_default", status_default),
                Row::new()
                    .with("ordinal_position", 3i64)
                    .with("column_name", "embedding")
                    .with("data_type", "vector")
                    .with("column_type", "vector(3)")
                    .with("is_nullable", "YES"),
                Row::new()
                    .with("ordinal_position", 4i64)
                    .with("column_name", "label")
                    .with("data_type", "varchar")
                    .with("column_type", "varchar(64)")
                    .with("is_nullable", "YES")
                    .with("column_key", "UNI")
                    .with("extra", "")
                    .with("column_default", label_default)
                    .with("column_comment", "Display label")
                    .with("character_maximum_length", 64i64),
            ],
        )
        .on_param(
            "INFORMATION_SCHEMA.STATISTICS",
            "label",
            vec![
                Row::new()
                    .with("index_name", "label")
                    .with("non_unique", 0i64)
                    .with("index_type", "BTREE")
                    .with("collation", "A")
                    .with("seq_in_index", 1i64),
            ],
        )
}

#[tokio::test]
async fn test_mysql_enum_and_unknown_type() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = mysql_catalog("AA", Value::Null);
    let mut config = common::config(Dialect::Mysql, "app");
    config.metadata.no_views = true;
    config.metadata.indices = true;

    let output = Generator::new(config).build(&conn).await?;

    assert_eq!(output.tables.len(), 1);
    let runs = &output.tables[0];
    assert_eq!(runs.schema.as_deref(), Some("app"));
    assert_eq!(runs.columns.keys().map(String::as_str).collect::<Vec<_>>(), vec!["id", "status", "label"]);
    assert_eq!(runs.columns["id"].canonical_host_type, HostType::I64);

    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].table, "app.runs");
    assert_eq!(output.diagnostics[0].column, "embedding");

    let src = &output.artifacts["Runs"].contents;
    assert!(src.contains("/// Table `app.runs`.\n#[derive(Debug, Clone, Model)]\npub struct Runs {"));
    assert!(src.contains("    /// Column `id` INTEGER, auto increment.\n    #[orm(primary_key)]\n    pub id: i64,"));
    assert!(src.contains("    /// Column `status` ENUM('AA','BB'), default `AA`.\n    pub status: String,"));
    assert!(src.contains(
        "    /// Display label\n    ///\n    /// Column `label` VARCHAR(64).\n    \
         /// Index `label` (unique, BTREE, ASC, position 1).\n    #[orm(size = 64, unique, index)]\n    pub label: Option<String>,"
    ));
    common::assert_derive_compatible(src);
    assert!(!src.contains("embedding"));

    // one STATISTICS lookup per kept column
    assert_eq!(conn.queries_containing("INFORMATION_SCHEMA.STATISTICS"), 3);
    Ok(())
}

#[tokio::test]
async fn test_mariadb_defaults_are_expressions() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = mysql_catalog("'AA'", Value::from("NULL"));
    let output = Generator::new(common::config(Dialect::Mariadb, "app")).build(&conn).await?;

    // views are kept without no_views
    assert_eq!(output.tables.len(), 2);
    let runs = output.tables.iter().find(|t| t.origin_name == "runs").unwrap();
    assert_eq!(runs.columns["status"].default_value.as_deref(), Some("AA"));
    assert_eq!(runs.columns["label"].default_value, None);
    Ok(())
}

#[tokio::test]
async fn test_mysql_requires_database() {
    let conn = ScriptedConnection::new();
    let mut config = common::config(Dialect::Mysql, "app");
    config.connection.database = None;

    let err = Generator::new(config).build(&conn).await.unwrap_err();
    assert!(matches!(err, Error::Introspection { .. }));
}

// ============================================================================
// PostgreSQL
// ============================================================================

fn pg_column(ordinal: i64, name: &str, data_type: &str, udt: &str, nullable: &str) -> Row {
    Row::new()
        .with("ordinal_position", ordinal)
        .with("column_name", name)
        .with("data_type", data_type)
        .with("udt_name", udt)
        .with("is_nullable", nullable)
        .with("is_identity", "NO")
}

fn pg_index(row: Row, name: &str, primary: bool, unique: bool, seq: i64, columns: i64) -> Row {
    row.with("index_name", name)
        .with("is_primary", primary)
        .with("is_unique", unique)
        .with("index_method", "btree")
        .with("index_seq", seq)
        .with("index_columns", columns)
}

fn postgres_catalog() -> ScriptedConnection {
    let unit_id = pg_column(1, "unit_id", "integer", "int4", "NO").with("is_identity", "YES");
    let race_id = pg_column(2, "race_id", "integer", "int4", "YES");
    let name = pg_column(3, "name", "character varying", "varchar", "NO")
        .with("character_maximum_length", 50i64)
        .with("column_default", "'unnamed'::character varying");

    ScriptedConnection::new()
        .on(
            "information_schema.tables t",
            vec![
                Row::new().with("table_schema", "public").with("table_name", "races"),
                Row::new().with("table_schema", "public").with("table_name", "units"),
            ],
        )
        .on_param(
            "information_schema.columns c",
            "units",
            vec![
                pg_index(unit_id, "units_pkey", true, true, 1, 1),
                pg_index(race_id.clone(), "units_race_id_idx", false, false, 1, 1),
                pg_index(race_id, "units_race_name_key", false, true, 1, 2),
                pg_index(name, "units_race_name_key", false, true, 2, 2),
                pg_column(4, "stats", "USER-DEFINED", "hstore", "YES"),
            ],
        )
        .on_param(
            "information_schema.columns c",
            "races",
            vec![
                pg_index(pg_column(1, "race_id", "integer", "int4", "NO"), "races_pkey", true, true, 1, 1),
                pg_column(2, "name", "text", "text", "YES"),
            ],
        )
        .on_param(
            "constraint_column_usage",
            "units",
            vec![
                Row::new()
                    .with("column_name", "race_id")
                    .with("target_schema", "public")
                    .with("target_table", "races")
                    .with("target_column", "race_id")
                    .with("constraint_name", "units_race_id_fkey"),
            ],
        )
}

#[tokio::test]
async fn test_postgres_index_rows_fold_into_columns() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = postgres_catalog();
    let mut config = common::config(Dialect::Postgres, "game");
    config.metadata.indices = true;
    config.metadata.discover_foreign_keys = true;

    let output = Generator::new(config).build(&conn).await?;

    let units = output.tables.iter().find(|t| t.origin_name == "units").unwrap();
    assert_eq!(units.columns.len(), 4);

    let unit_id = &units.columns["unit_id"];
    assert!(unit_id.primary_key);
    assert!(unit_id.auto_increment);
    assert!(unit_id.indices.is_empty());

    let race_id = &units.columns["race_id"];
    assert!(!race_id.unique);
    let index_names: Vec<&str> = race_id.indices.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(index_names, vec!["units_race_id_idx", "units_race_name_key"]);
    // leading column of the composite key
    assert_eq!(race_id.indices[1].seq, Some(1));
    assert!(race_id.indices[1].unique);

    let name = &units.columns["name"];
    assert_eq!(name.default_value.as_deref(), Some("unnamed"));
    assert_eq!(name.indices[0].seq, Some(2));

    assert_eq!(units.columns["stats"].canonical_mapping_type, "TEXT");
    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].column, "stats");

    // indices come with the column query
    assert_eq!(conn.queries_containing("NOT i.indisprimary"), 0);

    let src = &output.artifacts["Units"].contents;
    assert!(src.starts_with("//! Model for table `public.units`."));
    assert!(src.contains("use super::races::Races;"));
    assert!(src.contains("/// Table `public.units`.\n/// Associations: [`UnitsRelations`].\n"));
    assert!(src.contains("    /// Column `unit_id` INTEGER, auto increment.\n    #[orm(primary_key)]\n    pub unit_id: i32,"));
    assert!(src.contains(
        "    /// Column `race_id` INTEGER.\n    \
         /// Index `units_race_id_idx` (btree, position 1).\n    \
         /// Index `units_race_name_key` (unique, btree, position 1).\n    \
         #[orm(index, foreign_key = \"Races::race_id\")]\n    pub race_id: Option<i32>,"
    ));
    assert!(src.contains(
        "    /// Column `name` VARCHAR(50), default `unnamed`.\n    \
         /// Index `units_race_name_key` (unique, btree, position 2).\n    #[orm(size = 50, index)]\n    pub name: String,"
    ));
    assert!(src.contains("    /// Column `stats` TEXT.\n    pub stats: Option<String>,"));
    assert!(src.contains(
        "    /// belongs_to(target = \"Races\", target_key = \"race_id\", foreign_key = \"race_id\")\n    pub race: Option<Box<Races>>,"
    ));
    common::assert_derive_compatible(src);

    let races = output.tables.iter().find(|t| t.origin_name == "races").unwrap();
    assert_eq!(races.associations[0].kind, AssociationKind::HasMany);
    assert!(output.artifacts["Races"].contents.contains("    pub units: Vec<Units>,"));
    Ok(())
}

// ============================================================================
// SQL Server
// ============================================================================

fn mssql_column(ordinal: i64, name: &str, data_type: &str, nullable: &str) -> Row {
    Row::new()
        .with("ordinal_position", ordinal)
        .with("column_name", name)
        .with("data_type", data_type)
        .with("is_nullable", nullable)
        .with("is_identity", 0i64)
        .with("is_primary", 0i64)
        .with("is_unique", 0i64)
}

#[tokio::test]
async fn test_mssql_defaults_and_descending_index() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = ScriptedConnection::new()
        .on(
            "INFORMATION_SCHEMA.TABLES t",
            vec![
                Row::new()
                    .with("table_schema", "dbo")
                    .with("table_name", "orders")
                    .with("table_comment", "Customer orders"),
            ],
        )
        .on(
            "INFORMATION_SCHEMA.COLUMNS c",
            vec![
                mssql_column(1, "order_id", "int", "NO").with("is_identity", 1i64).with("is_primary", 1i64),
                mssql_column(2, "total", "decimal", "NO")
                    .with("numeric_precision", 10i64)
                    .with("numeric_scale", 2i64)
                    .with("column_default", "((0))"),
                mssql_column(3, "note", "nvarchar", "YES")
                    .with("character_maximum_length", 200i64)
                    .with("column_default", "(N'none')")
                    .with("column_comment", "Free text"),
                mssql_column(4, "placed_at", "datetime2", "NO")
                    .with("datetime_precision", 7i64)
                    .with("column_default", "(getdate())"),
                mssql_column(5, "area", "geography", "YES"),
            ],
        )
        .on_param(
            "type_desc",
            "placed_at",
            vec![
                Row::new()
                    .with("index_name", "IX_orders_placed_at")
                    .with("is_unique", 0i64)
                    .with("index_type", "NONCLUSTERED")
                    .with("is_descending", 1i64)
                    .with("key_ordinal", 1i64),
            ],
        );

    let mut config = common::config(Dialect::Mssql, "shop");
    config.metadata.indices = true;
    let output = Generator::new(config).build(&conn).await?;

    assert_eq!(output.diagnostics.len(), 1);
    assert_eq!(output.diagnostics[0].table, "dbo.orders");

    let src = &output.artifacts["Orders"].contents;
    assert!(src.contains("use chrono::NaiveDateTime;\nuse rust_decimal::Decimal;\n"));
    assert!(src.contains("/// Customer orders\n///\n/// Table `dbo.orders`.\n#[derive(Debug, Clone, Model)]\npub struct Orders {"));
    assert!(src.contains("    /// Column `order_id` INTEGER, auto increment.\n    #[orm(primary_key)]\n    pub order_id: i32,"));
    assert!(src.contains("    /// Column `total` DECIMAL(10,2), default `0`.\n    pub total: Decimal,"));
    assert!(src.contains(
        "    /// Free text\n    ///\n    /// Column `note` VARCHAR(200), default `none`.\n    #[orm(size = 200)]\n    pub note: Option<String>,"
    ));
    assert!(src.contains(
        "    /// Column `placed_at` TIMESTAMP(7), default `getdate()`.\n    \
         /// Index `IX_orders_placed_at` (NONCLUSTERED, DESC, position 1).\n    #[orm(index)]\n    pub placed_at: NaiveDateTime,"
    ));
    common::assert_derive_compatible(src);
    Ok(())
}

// ============================================================================
// SQLite
// ============================================================================

fn sqlite_column(cid: i64, name: &str, declared: &str, not_null: i64, pk: i64) -> Row {
    Row::new()
        .with("cid", cid)
        .with("name", name)
        .with("type", declared)
        .with("not_null", not_null)
        .with("dflt_value", Value::Null)
        .with("pk", pk)
}

fn sqlite_index_row(column: &str, seqno: i64, index: &str, unique: i64, columns: i64) -> Row {
    Row::new()
        .with("column_name", column)
        .with("seqno", seqno)
        .with("index_name", index)
        .with("is_unique", unique)
        .with("origin", "c")
        .with("column_count", columns)
}

#[tokio::test]
async fn test_sqlite_reads_index_pragmas_once_per_table() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = ScriptedConnection::new()
        .on("sqlite_master", vec![Row::new().with("name", "tracks")])
        .on(
            "pragma_table_info",
            vec![
                sqlite_column(0, "id", "INTEGER", 1, 1),
                sqlite_column(1, "album", "TEXT", 1, 0),
                sqlite_column(2, "position", "INTEGER", 1, 0),
                sqlite_column(3, "isrc", "VARCHAR(12)", 0, 0),
            ],
        )
        .on(
            "pragma_index_list",
            vec![
                sqlite_index_row("album", 0, "tracks_album_position", 1, 2),
                sqlite_index_row("position", 1, "tracks_album_position", 1, 2),
                sqlite_index_row("isrc", 0, "tracks_isrc", 1, 1),
            ],
        );

    let mut config = common::config(Dialect::Sqlite, ":memory:");
    config.metadata.indices = true;
    let output = Generator::new(config).build(&conn).await?;

    assert_eq!(conn.queries_containing("pragma_index_list"), 1);

    let tracks = &output.tables[0];
    assert!(tracks.columns["id"].indices.is_empty());
    assert_eq!(tracks.columns["album"].indices[0].seq, Some(1));
    assert_eq!(tracks.columns["position"].indices[0].seq, Some(2));
    assert!(!tracks.columns["album"].unique);
    assert!(tracks.columns["isrc"].unique);

    let src = &output.artifacts["Tracks"].contents;
    assert!(src.contains(
        "    /// Column `isrc` VARCHAR(12).\n    /// Index `tracks_isrc` (unique, position 1).\n    \
         #[orm(size = 12, unique, index)]\n    pub isrc: Option<String>,"
    ));
    common::assert_derive_compatible(src);
    Ok(())
}
