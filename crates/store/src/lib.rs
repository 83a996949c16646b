//! The document store: `documents(url TEXT PRIMARY KEY, content BLOB NOT
//! NULL)` in SQLite, keyed by final canonical URL. Writes are durable on
//! return; readers may race a writer freely (SQLite's own locking covers
//! it), and there is exactly one writer — the scheduler — by construction.

use anyhow::Result;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use tracing::info;

#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
}

impl Storage {
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite://{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new().max_connections(5).connect(&url).await?;
        let storage = Storage { pool };
        storage.run_migrations().await?;
        Ok(storage)
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::raw_sql(include_str!("../migrations/001_init.sql")).execute(&self.pool).await?;
        info!("document store schema ready");
        Ok(())
    }

    pub async fn exists(&self, url: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM documents WHERE url = ?").bind(url).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }

    pub async fn upsert(&self, url: &str, content: &[u8]) -> Result<()> {
        sqlx::query("INSERT INTO documents (url, content) VALUES (?, ?) ON CONFLICT(url) DO UPDATE SET content = excluded.content")
            .bind(url)
            .bind(content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents").fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>("n")?)
    }

    /// All stored rows, for reconstructing the frontier by re-extracting
    /// links from every document on a restart with no snapshot.
    pub async fn all_documents(&self) -> Result<Vec<(String, Vec<u8>)>> {
        let rows = sqlx::query("SELECT url, content FROM documents").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| (r.get::<String, _>("url"), r.get::<Vec<u8>, _>("content"))).collect())
    }
}

/// Collapses runs of consecutive newlines into a single `\n`, matching
/// `original_source/crawler/utils.py`'s `_NEWLINE_REGEX.sub(b"\n", ...)`
/// applied to serialized HTML before it is persisted.
pub fn collapse_newline_runs(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut in_run = false;
    for &b in content {
        if b == b'\n' {
            if !in_run {
                out.push(b);
            }
            in_run = true;
        } else {
            out.push(b);
            in_run = false;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_newline_runs() {
        assert_eq!(collapse_newline_runs(b"a\n\n\nb\nc"), b"a\nb\nc");
    }
}
