//! SQLite pool construction and the manual migration runner.

use anyhow::Result;
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use std::{fs, path::Path, sync::Arc};

/// Open a SQLite pool, creating the database file (and its parent
/// directory) first so a fresh deployment does not fail on connect.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<Arc<SqlitePool>> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("file:");

    if !database_url.contains(":memory:") {
        let db_path_obj = Path::new(db_path);
        if let Some(parent) = db_path_obj.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                tracing::info!("Created missing directory {:?}", parent);
            }
        }
        if !db_path_obj.exists() {
            fs::OpenOptions::new()
                .create(true)
                .write(true)
                .open(db_path)?;
        }
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(Arc::new(pool))
}

/// Execute a migration script statement by statement.
///
/// `--` line comments are stripped before splitting on `;` so prose in
/// comments (which may itself contain semicolons) never reaches SQLite.
pub async fn apply_sql(db: &SqlitePool, sql: &str) -> Result<()> {
    let without_comments = sql
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect::<Vec<_>>()
        .join("\n");
    let statements = without_comments
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    tracing::info!("Running {} migration statements...", statements.len());

    for stmt in statements {
        tracing::debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(())
}

/// Run SQLite migrations from the on-disk SQL file.
pub async fn run_migrations(db: &SqlitePool, path: &str) -> Result<()> {
    if !Path::new(path).exists() {
        anyhow::bail!("Migration file not found: {}", path);
    }
    let sql = fs::read_to_string(path)?;
    apply_sql(db, &sql).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn shipped_migration_applies_cleanly() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        apply_sql(&pool, include_str!("../migrations/0001_init.sql"))
            .await
            .unwrap();

        // Schema is actually usable afterwards.
        sqlx::query("INSERT INTO users (first_name, last_name, api_token) VALUES ('a', 'b', 't')")
            .execute(&*pool)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn comments_with_semicolons_do_not_break_the_runner() {
        let pool = connect("sqlite::memory:", 1).await.unwrap();
        let sql = "-- first; second; third\n\
                   CREATE TABLE t (id INTEGER PRIMARY KEY);\n\
                   -- trailing note; with punctuation\n\
                   INSERT INTO t (id) VALUES (1);";
        apply_sql(&pool, sql).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM t")
            .fetch_one(&*pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }
}
