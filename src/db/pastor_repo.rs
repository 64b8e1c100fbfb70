use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::Pastor;
use crate::utils::date::{format_date, parse_stored_date};
use crate::utils::error::{AppError, AppResult};

pub struct PastorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PastorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta alla pastorer
    pub fn find_all(&self) -> AppResult<Vec<Pastor>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, firstname, surname, title, email, phone, ordination_date, created_at, updated_at
             FROM pastors
             ORDER BY surname, firstname",
        )?;

        let pastors = stmt
            .query_map([], Self::row_to_pastor)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(pastors)
    }

    /// Hämta pastor via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Pastor>> {
        let conn = lock(&self.conn)?;
        let pastor = conn
            .query_row(
                "SELECT id, firstname, surname, title, email, phone, ordination_date, created_at, updated_at
                 FROM pastors WHERE id = ?",
                [id],
                Self::row_to_pastor,
            )
            .optional()?;

        Ok(pastor)
    }

    /// Skapa ny pastor
    pub fn create(&self, pastor: &mut Pastor) -> AppResult<i64> {
        pastor.validate().map_err(AppError::validation)?;

        let conn = lock(&self.conn)?;
        conn.execute(
            "INSERT INTO pastors (firstname, surname, title, email, phone, ordination_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                pastor.firstname,
                pastor.surname,
                pastor.title,
                pastor.email,
                pastor.phone,
                pastor.ordination_date.map(format_date),
            ],
        )
        .map_err(AppError::from_store)?;

        let id = conn.last_insert_rowid();
        pastor.id = Some(id);

        tracing::info!("Skapade pastor {} ({})", pastor.display_name(), id);
        Ok(id)
    }

    /// Uppdatera pastor
    pub fn update(&self, pastor: &Pastor) -> AppResult<()> {
        let id = pastor
            .id
            .ok_or_else(|| AppError::validation("Pastor har inget ID"))?;
        pastor.validate().map_err(AppError::validation)?;

        let conn = lock(&self.conn)?;
        let rows = conn.execute(
            "UPDATE pastors SET
                firstname = ?1, surname = ?2, title = ?3, email = ?4, phone = ?5,
                ordination_date = ?6, updated_at = datetime('now')
             WHERE id = ?7",
            params![
                pastor.firstname,
                pastor.surname,
                pastor.title,
                pastor.email,
                pastor.phone,
                pastor.ordination_date.map(format_date),
                id,
            ],
        )?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Pastor med ID {}", id)));
        }

        Ok(())
    }

    /// Ta bort pastor (kyrkornas koppling nollställs av databasen)
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM pastors WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Pastor med ID {}", id)));
        }

        Ok(())
    }

    pub fn count(&self) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pastors", [], |row| row.get(0))?;
        Ok(count)
    }

    fn row_to_pastor(row: &Row) -> rusqlite::Result<Pastor> {
        Ok(Pastor {
            id: row.get(0)?,
            firstname: row.get(1)?,
            surname: row.get(2)?,
            title: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            ordination_date: parse_stored_date(row.get(6)?),
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ChurchRepository, Database};
    use crate::models::Church;
    use chrono::NaiveDate;

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();

        let mut pastor = Pastor::new("Erik", Some("Holm".into()));
        pastor.ordination_date = NaiveDate::from_ymd_opt(2001, 6, 10);
        let id = db.pastors().create(&mut pastor).unwrap();

        let found = db.pastors().find_by_id(id).unwrap().unwrap();
        assert_eq!(found.display_name(), "Erik Holm");
        assert_eq!(found.ordination_date, NaiveDate::from_ymd_opt(2001, 6, 10));
    }

    #[test]
    fn test_delete_clears_church_link() {
        let db = Database::open_in_memory().unwrap();

        let mut pastor = Pastor::new("Erik", None);
        let pastor_id = db.pastors().create(&mut pastor).unwrap();
        let church_id = db
            .with_connection(|conn| {
                ChurchRepository::insert_in(conn, &Church::independent("Centrumkyrkan"))
            })
            .unwrap();
        db.churches().set_pastor(church_id, Some(pastor_id)).unwrap();

        db.pastors().delete(pastor_id).unwrap();

        let church = db.churches().find_by_id(church_id).unwrap().unwrap();
        assert_eq!(church.pastor_id, None);
    }

    #[test]
    fn test_update_missing() {
        let db = Database::open_in_memory().unwrap();
        let mut pastor = Pastor::new("Erik", None);
        pastor.id = Some(77);
        assert!(matches!(
            db.pastors().update(&pastor),
            Err(AppError::NotFound(_))
        ));
    }
}
