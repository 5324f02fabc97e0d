//! Postgres backend — relational persistence via sqlx.
//!
//! Two tables hold everything: `masc_kv` for keyed JSON documents and
//! `masc_log` for append-only logs.  CAS is a conditional UPDATE (or an
//! `ON CONFLICT DO NOTHING` insert for absent expectations); scope locks
//! use session-level advisory locks on a dedicated pooled connection.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use masc_domain::{Error, Result};

use crate::{Backend, ScopeGuard};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS masc_kv (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS masc_log (
    log_key TEXT NOT NULL,
    seq     BIGSERIAL,
    line    TEXT NOT NULL,
    PRIMARY KEY (log_key, seq)
);
"#;

pub struct PostgresBackend {
    pool: PgPool,
}

impl PostgresBackend {
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(url)
            .await
            .map_err(|e| Error::BackendTransient(format!("postgres connect: {e}")))?;
        let backend = Self { pool };
        backend.ensure_schema().await?;
        Ok(backend)
    }

    async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA.split(';').filter(|s| !s.trim().is_empty()) {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(map_err)?;
        }
        Ok(())
    }
}

fn map_err(e: sqlx::Error) -> Error {
    match e {
        sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut => {
            Error::BackendTransient(format!("postgres: {e}"))
        }
        other => Error::BackendFatal(format!("postgres: {other}")),
    }
}

/// Stable 64-bit advisory-lock id for a scope name.
fn advisory_id(scope: &str) -> i64 {
    let digest = Sha256::digest(scope.as_bytes());
    i64::from_be_bytes(digest[..8].try_into().expect("digest is 32 bytes"))
}

#[async_trait]
impl Backend for PostgresBackend {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM masc_kv WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.map(|r| r.get::<String, _>(0)))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO masc_kv (key, value) VALUES ($1, $2)
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(())
    }

    async fn cas(&self, key: &str, expected: Option<&str>, new: &str) -> Result<bool> {
        let affected = match expected {
            None => sqlx::query(
                "INSERT INTO masc_kv (key, value) VALUES ($1, $2)
                 ON CONFLICT (key) DO NOTHING",
            )
            .bind(key)
            .bind(new)
            .execute(&self.pool)
            .await
            .map_err(map_err)?
            .rows_affected(),
            Some(expected) => {
                sqlx::query("UPDATE masc_kv SET value = $1 WHERE key = $2 AND value = $3")
                    .bind(new)
                    .bind(key)
                    .bind(expected)
                    .execute(&self.pool)
                    .await
                    .map_err(map_err)?
                    .rows_affected()
            }
        };
        Ok(affected == 1)
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM masc_kv WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        // LIKE special characters in keys are escaped so a prefix is a
        // literal prefix.
        let escaped = prefix.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
        let rows = sqlx::query("SELECT key FROM masc_kv WHERE key LIKE $1 ESCAPE '\\'")
            .bind(format!("{escaped}%"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn append(&self, log_key: &str, line: &str) -> Result<()> {
        sqlx::query("INSERT INTO masc_log (log_key, line) VALUES ($1, $2)")
            .bind(log_key)
            .bind(line)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn read_log(&self, log_key: &str, offset: u64, limit: u64) -> Result<Vec<String>> {
        let limit = if limit == 0 { i64::MAX } else { limit as i64 };
        let rows = sqlx::query(
            "SELECT line FROM masc_log WHERE log_key = $1
             ORDER BY seq OFFSET $2 LIMIT $3",
        )
        .bind(log_key)
        .bind(offset as i64)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }

    async fn log_len(&self, log_key: &str) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) FROM masc_log WHERE log_key = $1")
            .bind(log_key)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(row.get::<i64, _>(0).max(0) as u64)
    }

    async fn rotate_log(&self, log_key: &str, archive_key: &str) -> Result<()> {
        sqlx::query("UPDATE masc_log SET log_key = $1 WHERE log_key = $2")
            .bind(archive_key)
            .bind(log_key)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn lock(&self, scope: &str) -> Result<ScopeGuard> {
        let id = advisory_id(scope);
        let mut conn = self.pool.acquire().await.map_err(map_err)?;
        sqlx::query("SELECT pg_advisory_lock($1)")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(map_err)?;
        Ok(Box::new(PgScopeGuard {
            conn: Some(conn),
            id,
        }))
    }
}

struct PgScopeGuard {
    conn: Option<sqlx::pool::PoolConnection<sqlx::Postgres>>,
    id: i64,
}

impl Drop for PgScopeGuard {
    fn drop(&mut self) {
        if let Some(mut conn) = self.conn.take() {
            let id = self.id;
            tokio::spawn(async move {
                if let Err(e) = sqlx::query("SELECT pg_advisory_unlock($1)")
                    .bind(id)
                    .execute(&mut *conn)
                    .await
                {
                    tracing::warn!(id, error = %e, "failed to release advisory lock");
                }
            });
        }
    }
}
