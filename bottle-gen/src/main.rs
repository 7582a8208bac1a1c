mod output;

use bottle_orm_gen::{Generator, GeneratorConfig, Linter, SqlxConnection};
use dotenvy::dotenv;

use crate::output::{FsWriter, RustfmtLinter};

#[tokio::main]
async fn main() -> Result<(), bottle_orm_gen::Error> {
    dotenv().ok();
    env_logger::init();

    let config = GeneratorConfig::from_env()?;
    config.validate()?;

    let url = config.connection.connection_url()?;
    let conn =
        SqlxConnection::connect(&url, Some(config.connection.dialect), config.connection.max_connections).await?;

    let writer = FsWriter::prepare(&config.output.dir, config.output.clean).await?;
    let linter = config.output.lint.then(|| RustfmtLinter::new(&config.output.dir));

    let generator = Generator::new(config);
    let result = generator.generate(&conn, &writer, linter.as_ref().map(|l| l as &dyn Linter)).await;
    conn.close().await;
    let output = result?;

    for diagnostic in &output.diagnostics {
        eprintln!("warning: {}", diagnostic);
    }
    println!("Generated {} models in {}", output.artifacts.len(), generator.config().output.dir.display());
    Ok(())
}
