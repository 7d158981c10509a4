// src/repositories/platform_repository.rs
//
// Platform persistence

use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use crate::db::ConnectionPool;
use crate::domain::platform::{Platform, PlatformKind};
use crate::error::{AppError, AppResult};
use crate::repositories::{enum_column, timestamp_column};

pub trait PlatformRepository: Send + Sync {
    /// Insert or update name/kind/is_active. The id never changes.
    fn save(&self, platform: &Platform) -> AppResult<()>;
    fn get_by_id(&self, id: &str) -> AppResult<Option<Platform>>;
    fn list_all(&self) -> AppResult<Vec<Platform>>;
    fn list_active(&self) -> AppResult<Vec<Platform>>;
    /// Create a placeholder row if the id is unknown. Returns true when created.
    fn ensure_exists(&self, id: &str) -> AppResult<bool>;
}

pub struct SqlitePlatformRepository {
    pool: Arc<ConnectionPool>,
}

impl SqlitePlatformRepository {
    pub fn new(pool: Arc<ConnectionPool>) -> Self {
        Self { pool }
    }

    fn row_to_platform(row: &Row) -> Result<Platform, rusqlite::Error> {
        let kind_str: String = row.get("type")?;
        let updated_at_str: String = row.get("updated_at")?;

        Ok(Platform {
            id: row.get("id")?,
            name: row.get("name")?,
            kind: enum_column::<PlatformKind>(2, &kind_str)?,
            is_active: row.get("is_active")?,
            updated_at: timestamp_column(4, &updated_at_str)?,
        })
    }
}

impl PlatformRepository for SqlitePlatformRepository {
    fn save(&self, platform: &Platform) -> AppResult<()> {
        let conn = self.pool.get()?;

        conn.execute(
            "INSERT INTO platforms (id, name, type, is_active, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                type = excluded.type,
                is_active = excluded.is_active,
                updated_at = excluded.updated_at",
            params![
                platform.id,
                platform.name,
                platform.kind.to_string(),
                platform.is_active,
                platform.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn get_by_id(&self, id: &str) -> AppResult<Option<Platform>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, type, is_active, updated_at FROM platforms WHERE id = ?1",
        )?;

        match stmt.query_row(params![id], Self::row_to_platform) {
            Ok(platform) => Ok(Some(platform)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(AppError::Database(e)),
        }
    }

    fn list_all(&self) -> AppResult<Vec<Platform>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, type, is_active, updated_at FROM platforms ORDER BY id",
        )?;

        let platforms = stmt
            .query_map([], Self::row_to_platform)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(platforms)
    }

    fn list_active(&self) -> AppResult<Vec<Platform>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT id, name, type, is_active, updated_at FROM platforms
             WHERE is_active = 1
             ORDER BY id",
        )?;

        let platforms = stmt
            .query_map([], Self::row_to_platform)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(platforms)
    }

    fn ensure_exists(&self, id: &str) -> AppResult<bool> {
        let conn = self.pool.get()?;
        ensure_platform(&conn, id)
    }
}

/// Transactional variant of `ensure_exists`
pub(crate) fn ensure_platform(conn: &Connection, id: &str) -> AppResult<bool> {
    let placeholder = Platform::discovered(id);
    let inserted = conn.execute(
        "INSERT INTO platforms (id, name, type, is_active, updated_at)
         VALUES (?1, ?2, ?3, 1, ?4)
         ON CONFLICT(id) DO NOTHING",
        params![
            placeholder.id,
            placeholder.name,
            placeholder.kind.to_string(),
            Utc::now().to_rfc3339(),
        ],
    )?;
    Ok(inserted > 0)
}
