use crate::commands::Status;
use crate::config::CliConfig;
use crate::output::{render_json, OutputFormat};
use anyhow::{Context, Result};
use canopy_sqlite::{schema, SqlitePool};
use serde::Serialize;

#[derive(Serialize)]
struct InitReport {
    database: String,
    schema_version: i32,
}

/// Create the database, or bring an existing one up to the current schema
pub fn execute(config: &CliConfig, format: OutputFormat) -> Result<Status> {
    let pool = SqlitePool::new(config.database.clone()).with_context(|| {
        format!("Failed to open database: {}", config.database.path.display())
    })?;
    let schema_version = pool.with_connection(schema::current_version)?;

    let report = InitReport {
        database: config.database.path.display().to_string(),
        schema_version,
    };
    match format {
        OutputFormat::Json => println!("{}", render_json(&report)?),
        OutputFormat::Table => println!(
            "Database ready: {} (schema version {})",
            report.database, report.schema_version
        ),
    }
    Ok(Status::Success)
}
