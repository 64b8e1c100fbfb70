use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Church, ChurchType};
use crate::utils::error::{AppError, AppResult};

const CHURCH_COLUMNS: &str =
    "id, name, church_type, parent_church_id, pastor_id, city, address, created_at, updated_at";

pub struct ChurchRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChurchRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta alla kyrkor, moderkyrkor först
    pub fn find_all(&self) -> AppResult<Vec<Church>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM churches
             ORDER BY COALESCE(parent_church_id, id), parent_church_id IS NOT NULL, name",
            CHURCH_COLUMNS
        ))?;

        let churches = stmt
            .query_map([], Self::row_to_church)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(churches)
    }

    /// Hämta alla fristående kyrkor
    pub fn find_independent(&self) -> AppResult<Vec<Church>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM churches WHERE church_type = 'church' ORDER BY name",
            CHURCH_COLUMNS
        ))?;

        let churches = stmt
            .query_map([], Self::row_to_church)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(churches)
    }

    /// Hämta kyrka via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Church>> {
        let conn = lock(&self.conn)?;
        Self::find_by_id_in(&conn, id)
    }

    pub(crate) fn find_by_id_in(conn: &Connection, id: i64) -> AppResult<Option<Church>> {
        let church = conn
            .query_row(
                &format!("SELECT {} FROM churches WHERE id = ?", CHURCH_COLUMNS),
                [id],
                Self::row_to_church,
            )
            .optional()?;

        Ok(church)
    }

    /// Direkta församlingar under en kyrka
    pub fn find_congregations(&self, parent_id: i64) -> AppResult<Vec<Church>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM churches WHERE parent_church_id = ? ORDER BY name, id",
            CHURCH_COLUMNS
        ))?;

        let churches = stmt
            .query_map([parent_id], Self::row_to_church)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(churches)
    }

    pub fn count_congregations(&self, parent_id: i64) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        Self::count_congregations_in(&conn, parent_id)
    }

    pub(crate) fn count_congregations_in(conn: &Connection, parent_id: i64) -> AppResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM churches WHERE parent_church_id = ?",
            [parent_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Församlingar vars moderkyrka har tagits bort direkt i databasen
    pub fn find_orphaned(&self) -> AppResult<Vec<Church>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM churches
             WHERE church_type != 'church' AND parent_church_id IS NULL
             ORDER BY name",
            CHURCH_COLUMNS
        ))?;

        let churches = stmt
            .query_map([], Self::row_to_church)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(churches)
    }

    pub(crate) fn count_members_in(conn: &Connection, church_id: i64) -> AppResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM members WHERE church_id = ?",
            [church_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count(&self) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM churches", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Antal kyrkor per typ
    pub fn count_by_type(&self) -> AppResult<Vec<(ChurchType, i64)>> {
        let conn = lock(&self.conn)?;
        let mut counts = Vec::new();

        for church_type in ChurchType::all() {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM churches WHERE church_type = ?",
                [church_type.to_string()],
                |row| row.get(0),
            )?;
            counts.push((*church_type, count));
        }

        Ok(counts)
    }

    pub(crate) fn insert_in(conn: &Connection, church: &Church) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO churches (name, church_type, parent_church_id, pastor_id, city, address)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                church.name,
                church.church_type.to_string(),
                church.parent_church_id,
                church.pastor_id,
                church.city,
                church.address,
            ],
        )
        .map_err(AppError::from_store)?;

        Ok(conn.last_insert_rowid())
    }

    pub(crate) fn update_in(conn: &Connection, id: i64, church: &Church) -> AppResult<()> {
        let rows = conn
            .execute(
                "UPDATE churches SET
                    name = ?1, church_type = ?2, parent_church_id = ?3, pastor_id = ?4,
                    city = ?5, address = ?6, updated_at = datetime('now')
                 WHERE id = ?7",
                params![
                    church.name,
                    church.church_type.to_string(),
                    church.parent_church_id,
                    church.pastor_id,
                    church.city,
                    church.address,
                    id,
                ],
            )
            .map_err(AppError::from_store)?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Kyrka med ID {}", id)));
        }

        Ok(())
    }

    pub(crate) fn delete_in(conn: &Connection, id: i64) -> AppResult<()> {
        let rows = conn
            .execute("DELETE FROM churches WHERE id = ?", [id])
            .map_err(AppError::from_store)?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Kyrka med ID {}", id)));
        }

        Ok(())
    }

    /// Koppla (eller koppla bort) pastor
    pub fn set_pastor(&self, church_id: i64, pastor_id: Option<i64>) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn
            .execute(
                "UPDATE churches SET pastor_id = ?, updated_at = datetime('now') WHERE id = ?",
                params![pastor_id, church_id],
            )
            .map_err(AppError::from_store)?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Kyrka med ID {}", church_id)));
        }

        Ok(())
    }

    fn row_to_church(row: &Row) -> rusqlite::Result<Church> {
        let type_str: String = row.get(2)?;
        let church_type = ChurchType::from_db_str(&type_str)
            .ok_or_else(|| rusqlite::Error::InvalidColumnType(2, "church_type".into(), Type::Text))?;

        Ok(Church {
            id: row.get(0)?,
            name: row.get(1)?,
            church_type,
            parent_church_id: row.get(3)?,
            pastor_id: row.get(4)?,
            city: row.get(5)?,
            address: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}
