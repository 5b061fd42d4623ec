//! SQLite connection pool factory and schema bootstrap.

use std::str::FromStr;

use anyhow::Context;
use bookstore_kernel::settings::DatabaseSettings;
use bookstore_kernel::Migration;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open a pool against the configured database, creating the file if needed.
pub async fn connect(settings: &DatabaseSettings) -> anyhow::Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&settings.url)
        .with_context(|| format!("invalid database url '{}'", settings.url))?
        .create_if_missing(true)
        .foreign_keys(true);

    // In-memory databases live and die with their connection, so the pool
    // must never recycle it.
    let pool = SqlitePoolOptions::new()
        .max_connections(settings.max_connections.max(1))
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .with_context(|| format!("failed to open database '{}'", settings.url))?;

    tracing::info!(target: "bookstore-db", url = %settings.url, "database pool ready");
    Ok(pool)
}

/// Apply module migrations in the given order.
///
/// Each statement is expected to be create-if-missing; existing schemas are
/// left as they are.
pub async fn apply_migrations(
    pool: &SqlitePool,
    migrations: &[(String, Migration)],
) -> anyhow::Result<()> {
    for (module, migration) in migrations {
        tracing::info!(
            target: "bookstore-db",
            module = %module,
            migration = migration.id,
            "applying migration"
        );

        sqlx::raw_sql(migration.up)
            .execute(pool)
            .await
            .with_context(|| {
                format!(
                    "migration '{}' of module '{}' failed",
                    migration.id, module
                )
            })?;
    }

    Ok(())
}
