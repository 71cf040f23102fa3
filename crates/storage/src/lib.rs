use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use thiserror::Error;
use tracing::debug;

use shared::domain::{Category, CategoryId};

/// Typed failures from the category store. The caller decides whether to
/// surface, ignore, or retry; nothing is swallowed at this layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open category database: {0}")]
    Open(#[source] sqlx::Error),
    #[error("failed to ensure categories table: {0}")]
    Schema(#[source] sqlx::Error),
    #[error("category read failed: {0}")]
    Read(#[source] sqlx::Error),
    #[error("category write failed: {0}")]
    Write(#[source] sqlx::Error),
    #[error("failed to create parent directory '{path}' for database url: {source}")]
    ParentDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Owns the SQLite handle for the categories table. Cloning shares the pool,
/// and the instance is injected into whoever needs it so tests can hand in an
/// in-memory database.
#[derive(Clone)]
pub struct CategoryStore {
    pool: Pool<Sqlite>,
}

impl CategoryStore {
    /// Opens (creating if missing) the database behind `database_url` and
    /// ensures the categories table exists.
    pub async fn open(database_url: &str) -> Result<Self, StoreError> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .map_err(StoreError::Open)?
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .map_err(StoreError::Open)?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Idempotent: repeat calls leave existing rows untouched.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS categories (
                id          INTEGER PRIMARY KEY NOT NULL,
                title       TEXT NOT NULL,
                description TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(StoreError::Schema)?;
        Ok(())
    }

    pub async fn health_check(&self) -> Result<(), StoreError> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Read)?;
        Ok(())
    }

    pub async fn insert(&self, title: &str, description: &str) -> Result<CategoryId, StoreError> {
        let rec = sqlx::query("INSERT INTO categories (title, description) VALUES (?, ?) RETURNING id")
            .bind(title)
            .bind(description)
            .fetch_one(&self.pool)
            .await
            .map_err(StoreError::Write)?;
        let id = CategoryId(rec.get::<i64, _>(0));
        debug!(id = id.0, "inserted category");
        Ok(id)
    }

    /// Full table contents. No ORDER BY: row order is storage-engine-defined
    /// and callers must not rely on it being stable across calls.
    pub async fn list_all(&self) -> Result<Vec<Category>, StoreError> {
        let rows = sqlx::query("SELECT id, title, description FROM categories")
            .fetch_all(&self.pool)
            .await
            .map_err(StoreError::Read)?;
        Ok(rows
            .into_iter()
            .map(|r| Category {
                id: CategoryId(r.get::<i64, _>(0)),
                title: r.get::<String, _>(1),
                description: r.get::<String, _>(2),
            })
            .collect())
    }

    /// Writes both fields of the matching row. Returns the number of rows
    /// touched; 0 means the id was absent and the call was a no-op.
    pub async fn update(
        &self,
        id: CategoryId,
        title: &str,
        description: &str,
    ) -> Result<u64, StoreError> {
        let updated = sqlx::query("UPDATE categories SET title = ?, description = ? WHERE id = ?")
            .bind(title)
            .bind(description)
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Write)?
            .rows_affected();
        debug!(id = id.0, updated, "updated category");
        Ok(updated)
    }

    /// Removes the matching row. 0 rows affected when the id was absent.
    pub async fn delete(&self, id: CategoryId) -> Result<u64, StoreError> {
        let deleted = sqlx::query("DELETE FROM categories WHERE id = ?")
            .bind(id.0)
            .execute(&self.pool)
            .await
            .map_err(StoreError::Write)?
            .rows_affected();
        debug!(id = id.0, deleted, "deleted category");
        Ok(deleted)
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<(), StoreError> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).map_err(|source| StoreError::ParentDir {
        path: parent.display().to_string(),
        source,
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == "sqlite::memory:" || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
