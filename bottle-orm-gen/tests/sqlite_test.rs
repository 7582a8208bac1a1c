mod common;

use bottle_orm_gen::{
    AssociationKind, Case, CaseSpec, Connection, Dialect, DialectAdapter, Generator, HostType, MetadataExtractor,
    TableName, dialects::IntrospectionConfig,
};

const LIBRARY: &[&str] = &[
    "CREATE TABLE authors (
        id INTEGER PRIMARY KEY,
        name VARCHAR(120) NOT NULL,
        email TEXT UNIQUE
    )",
    "CREATE TABLE books (
        id INTEGER PRIMARY KEY,
        author_id INTEGER NOT NULL REFERENCES authors(id),
        title TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'draft',
        price DECIMAL(10, 2)
    )",
    "CREATE INDEX books_title_idx ON books (title)",
];

#[tokio::test]
async fn test_extracts_columns_in_ordinal_order() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = common::sqlite(LIBRARY).await;
    let config = common::config(Dialect::Sqlite, ":memory:");

    let extraction = MetadataExtractor::new(
        &conn,
        DialectAdapter::Sqlite,
        IntrospectionConfig::default(),
        &config.metadata,
    )
    .extract()
    .await?;

    let names: Vec<&str> = extraction.tables.iter().map(|t| t.origin_name.as_str()).collect();
    assert_eq!(names, vec!["authors", "books"]);

    let books = &extraction.tables[1];
    let columns: Vec<&str> = books.columns.keys().map(String::as_str).collect();
    assert_eq!(columns, vec!["id", "author_id", "title", "status", "price"]);

    let id = &books.columns["id"];
    assert!(id.primary_key);
    assert!(id.auto_increment);
    assert!(!id.allow_null);
    assert_eq!(id.canonical_mapping_type, "INTEGER");
    assert_eq!(id.canonical_host_type, HostType::I64);

    let status = &books.columns["status"];
    assert_eq!(status.default_value.as_deref(), Some("draft"));
    assert!(!status.is_required());

    let price = &books.columns["price"];
    assert_eq!(price.canonical_mapping_type, "DECIMAL(10,2)");
    assert!(price.allow_null);

    let authors = &extraction.tables[0];
    assert!(authors.columns["email"].unique);
    assert!(!authors.columns["name"].unique);
    assert_eq!(authors.columns["name"].canonical_mapping_type, "VARCHAR(120)");

    let title = &books.columns["title"];
    assert_eq!(title.indices.len(), 1);
    assert_eq!(title.indices[0].name, "books_title_idx");
    assert!(!title.indices[0].unique);
    assert_eq!(title.indices[0].seq, Some(1));

    // the per-column lookup agrees with the indices read alongside the columns
    let direct = DialectAdapter::Sqlite
        .fetch_column_index_metadata(&conn, &IntrospectionConfig::default(), &TableName::new(None, "books"), "title")
        .await?;
    assert_eq!(direct, title.indices);

    // discovery is off by default
    assert!(extraction.foreign_keys.is_empty());
    assert!(extraction.diagnostics.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_foreign_keys_become_associations() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = common::sqlite(LIBRARY).await;
    let mut config = common::config(Dialect::Sqlite, ":memory:");
    config.metadata.discover_foreign_keys = true;

    let output = Generator::new(config).build(&conn).await?;

    let books = output.tables.iter().find(|t| t.origin_name == "books").unwrap();
    assert_eq!(books.name, "Books");
    let fk = books.columns["author_id"].foreign_key.as_ref().unwrap();
    assert_eq!(fk.target_model, "Authors");
    assert_eq!(fk.target_key.as_deref(), Some("id"));
    assert_eq!(books.associations.len(), 1);
    assert_eq!(books.associations[0].kind, AssociationKind::BelongsTo);

    let authors = output.tables.iter().find(|t| t.origin_name == "authors").unwrap();
    assert_eq!(authors.associations.len(), 1);
    assert_eq!(authors.associations[0].kind, AssociationKind::HasMany);
    assert_eq!(authors.associations[0].target_model, "Books");

    let books_src = &output.artifacts["Books"].contents;
    assert!(books_src.contains("/// Table `books`.\n/// Associations: [`BooksRelations`].\n#[derive(Debug, Clone, Model)]\npub struct Books {"));
    assert!(books_src.contains("    /// Column `author_id` INTEGER.\n    #[orm(foreign_key = \"Authors::id\")]\n    pub author_id: i64,"));
    assert!(books_src.contains(
        "pub struct BooksRelations {\n    /// belongs_to(target = \"Authors\", target_key = \"id\", foreign_key = \"author_id\")\n    pub author: Option<Box<Authors>>,"
    ));
    assert!(books_src.contains("use rust_decimal::Decimal;"));
    assert!(books_src.contains("pub price: Option<Decimal>,"));

    let authors_src = &output.artifacts["Authors"].contents;
    assert!(authors_src.contains("use super::books::Books;"));
    assert!(authors_src.contains(
        "    /// has_many(target = \"Books\", source_key = \"id\", foreign_key = \"author_id\")\n    pub books: Vec<Books>,"
    ));
    assert!(authors_src.contains("    /// Column `email` TEXT.\n    #[orm(unique)]\n    pub email: Option<String>,"));
    assert!(authors_src.contains("    /// Column `name` VARCHAR(120).\n    #[orm(size = 120)]\n    pub name: String,"));
    common::assert_derive_compatible(books_src);
    common::assert_derive_compatible(authors_src);

    assert_eq!(output.artifacts["Authors"].file_name, "authors.rs");
    assert!(output.index.contents.contains("pub mod authors;\npub mod books;"));
    assert!(output.index.contents.contains("pub use books::Books;"));
    Ok(())
}

#[tokio::test]
async fn test_table_filter() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = common::sqlite(&[
        "CREATE TABLE data_types (id INTEGER PRIMARY KEY, flag BOOLEAN)",
        "CREATE TABLE indices (id INTEGER PRIMARY KEY)",
        "CREATE TABLE other (id INTEGER PRIMARY KEY)",
    ])
    .await;

    let mut config = common::config(Dialect::Sqlite, ":memory:");
    config.metadata.tables = Some(vec!["Data_Types".to_string(), "indices".to_string()]);
    config.metadata.skip_tables = Some(vec!["INDICES".to_string()]);

    let output = Generator::new(config).build(&conn).await?;
    let names: Vec<&str> = output.tables.iter().map(|t| t.origin_name.as_str()).collect();
    assert_eq!(names, vec!["data_types"]);
    assert_eq!(output.artifacts.len(), 1);
    assert!(output.artifacts["DataTypes"].contents.contains("pub flag: Option<bool>,"));
    Ok(())
}

#[tokio::test]
async fn test_strict_attributes_struct() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = common::sqlite(LIBRARY).await;
    let mut config = common::config(Dialect::Sqlite, ":memory:");
    config.metadata.strict = true;
    config.metadata.tables = Some(vec!["authors".to_string()]);

    let output = Generator::new(config).build(&conn).await?;
    let src = &output.artifacts["Authors"].contents;

    assert!(src.contains("/// Table `authors`.\n/// Creation input: [`AuthorsAttributes`].\n"));
    assert!(src.contains("pub struct AuthorsAttributes {"));
    // auto increment and nullable columns are optional on insert
    assert!(src.contains("    pub id: Option<i64>,\n    pub name: String,\n    pub email: Option<String>,\n}"));
    Ok(())
}

#[tokio::test]
async fn test_case_transform_keeps_origin_names() -> Result<(), Box<dyn std::error::Error>> {
    common::init_logger();
    let conn = common::sqlite(&[
        "CREATE TABLE user_profiles (profile_id INTEGER PRIMARY KEY, display_name TEXT, created_at DATETIME)",
    ])
    .await;

    let mut config = common::config(Dialect::Sqlite, ":memory:");
    config.metadata.case = Some(CaseSpec::PerClass { model: Case::Pascal, column: Case::Camel });
    config.metadata.timestamps = true;

    let output = Generator::new(config).build(&conn).await?;
    let table = &output.tables[0];
    assert_eq!(table.name, "UserProfiles");
    assert_eq!(table.origin_name, "user_profiles");
    assert_eq!(table.columns["display_name"].name, "displayName");
    assert_eq!(table.columns["display_name"].origin_name, "display_name");

    let artifact = &output.artifacts["UserProfiles"];
    assert_eq!(artifact.file_name, "user_profiles.rs");
    let src = &artifact.contents;
    assert!(src.contains("#[allow(non_snake_case)]"));
    assert!(src.contains("/// Table `user_profiles`.\n"));
    assert!(src.contains("    /// Column `display_name` TEXT.\n    pub displayName: Option<String>,"));
    assert!(src.contains("    /// Column `created_at` TIMESTAMP.\n    #[orm(create_time)]\n    pub createdAt: Option<NaiveDateTime>,"));
    common::assert_derive_compatible(src);
    assert!(src.contains("use chrono::NaiveDateTime;"));
    Ok(())
}

#[tokio::test]
async fn test_missing_table_yields_no_columns() -> Result<(), Box<dyn std::error::Error>> {
    let conn = common::sqlite(&[]).await;
    let rows = conn.query("SELECT name FROM pragma_table_info(?)", &["nope"]).await?;
    assert!(rows.is_empty());

    let output = Generator::new(common::config(Dialect::Sqlite, ":memory:")).build(&conn).await?;
    assert!(output.tables.is_empty());
    assert!(output.index.contents.starts_with("//! Generated models."));
    Ok(())
}
