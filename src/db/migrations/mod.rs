//! Database schema migrations.
//!
//! Each migration is a pair of SQL files in this directory:
//! - `migration_NN_up.sql` moves the schema from version `NN-1` to `NN`
//! - `migration_NN_down.sql` moves the schema from version `NN` back to `NN-1`

use crate::error::Res;
use anyhow::{bail, Context};
use sqlx::{Executor, SqlitePool};
use tracing::debug;

/// The schema version this build of the crate expects.
pub(crate) const CURRENT_VERSION: i32 = 1;

/// A schema migration with up and down SQL.
struct Migration {
    /// The version reached by running `up_sql`.
    version: i32,
    up_sql: &'static str,
    down_sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    up_sql: include_str!("migration_01_up.sql"),
    down_sql: include_str!("migration_01_down.sql"),
}];

/// One SQL script to run and the schema version it leaves behind.
struct Step {
    sql: &'static str,
    resulting_version: i32,
}

/// Moves the schema from `current_ver` to `target_ver`, one version at a time, in either direction.
///
/// Every step runs in its own transaction together with its `schema_version` update. All required
/// migrations are checked for before the first step runs.
pub(crate) async fn run(pool: &SqlitePool, current_ver: i32, target_ver: i32) -> Res<()> {
    if current_ver == target_ver {
        debug!("Database already at schema version {target_ver}");
        return Ok(());
    }

    for step in plan(current_ver, target_ver)? {
        debug!("Migrating schema to version {:02}", step.resulting_version);
        run_step(pool, &step).await?;
    }

    debug!("Schema now at version {target_ver}");
    Ok(())
}

/// Reads the schema version recorded in the database.
pub(crate) async fn schema_version(pool: &SqlitePool) -> Res<i32> {
    let row: (i32,) = sqlx::query_as("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await
        .context("Failed to query the schema version")?;
    Ok(row.0)
}

/// Creates the `schema_version` table for a brand new database at version 0.
pub(crate) async fn bootstrap(pool: &SqlitePool) -> Res<()> {
    sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
        .execute(pool)
        .await
        .context("Failed to create the schema_version table")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
        .execute(pool)
        .await
        .context("Failed to record the initial schema version")?;
    Ok(())
}

fn find(version: i32) -> Res<&'static Migration> {
    match MIGRATIONS.iter().find(|m| m.version == version) {
        Some(m) => Ok(m),
        None => bail!("Migration {version} is missing"),
    }
}

/// Lists the steps needed to go from `current_ver` to `target_ver`.
fn plan(current_ver: i32, target_ver: i32) -> Res<Vec<Step>> {
    let mut steps = Vec::new();
    if current_ver < target_ver {
        for version in (current_ver + 1)..=target_ver {
            let migration = find(version).with_context(|| {
                format!("Unable to migrate from version {current_ver} to {target_ver}")
            })?;
            steps.push(Step {
                sql: migration.up_sql,
                resulting_version: version,
            });
        }
    } else {
        for version in ((target_ver + 1)..=current_ver).rev() {
            let migration = find(version).with_context(|| {
                format!("Unable to migrate from version {current_ver} to {target_ver}")
            })?;
            steps.push(Step {
                sql: migration.down_sql,
                resulting_version: version - 1,
            });
        }
    }
    Ok(steps)
}

async fn run_step(pool: &SqlitePool, step: &Step) -> Res<()> {
    let mut tx = pool
        .begin()
        .await
        .context("Failed to begin migration transaction")?;

    // The scripts hold several statements, so they go through the unprepared path.
    tx.execute(step.sql)
        .await
        .context("Failed to execute migration SQL")?;

    sqlx::query("DELETE FROM schema_version")
        .execute(&mut *tx)
        .await
        .context("Failed to clear schema_version")?;
    sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
        .bind(step.resulting_version)
        .execute(&mut *tx)
        .await
        .context("Failed to update schema_version")?;

    tx.commit()
        .await
        .context("Failed to commit migration transaction")?;
    Ok(())
}
