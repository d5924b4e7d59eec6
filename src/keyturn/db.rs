//! Connection pool and schema bootstrap.

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::{debug, info_span, Instrument};

const SCHEMA: &str = include_str!("../../sql/schema.sql");

/// # Errors
/// Returns an error if the database cannot be reached.
pub async fn connect(dsn: &str) -> Result<PgPool> {
    PgPoolOptions::new()
        .min_connections(1)
        .max_connections(5)
        .max_lifetime(Duration::from_secs(60 * 2))
        .test_before_acquire(true)
        .connect(dsn)
        .await
        .context("Failed to connect to database")
}

/// Apply `sql/schema.sql`. Every statement is `IF NOT EXISTS`, so this is safe
/// on every start.
///
/// # Errors
/// Returns an error if a statement fails.
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    for statement in split_sql_statements(SCHEMA) {
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "DDL",
            db.statement = statement.as_str()
        );
        sqlx::query(&statement)
            .execute(pool)
            .instrument(span)
            .await
            .with_context(|| format!("Failed to apply schema statement: {statement}"))?;
    }
    debug!("schema applied");
    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}
