use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::lock;
use crate::models::{Gender, Member, MemberStatus, MembershipNumber};
use crate::utils::date::{format_date, parse_stored_date};
use crate::utils::error::{AppError, AppResult};

const MEMBER_COLUMNS: &str = "id, church_id, firstname, surname, national_id, email, phone, gender,
     birth_date, admission_date, membership_number, active, disciplined, pending_transfer,
     photo_path, created_at, updated_at";

/// Sökfilter för medlemslistan
#[derive(Debug, Default, Clone)]
pub struct MemberFilter {
    /// Fritextsökning (namn, personnummer, medlemsnummer)
    pub query: String,
    pub church_id: Option<i64>,
    pub status: Option<MemberStatus>,
}

impl MemberFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_church(church_id: i64) -> Self {
        Self {
            church_id: Some(church_id),
            ..Default::default()
        }
    }
}

pub struct MemberRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MemberRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta alla medlemmar
    pub fn find_all(&self) -> AppResult<Vec<Member>> {
        self.search(&MemberFilter::new())
    }

    /// Hämta medlem via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<Member>> {
        let conn = lock(&self.conn)?;
        Self::find_by_id_in(&conn, id)
    }

    pub(crate) fn find_by_id_in(conn: &Connection, id: i64) -> AppResult<Option<Member>> {
        let member = conn
            .query_row(
                &format!("SELECT {} FROM members WHERE id = ?", MEMBER_COLUMNS),
                [id],
                Self::row_to_member,
            )
            .optional()?;

        Ok(member)
    }

    /// Hämta medlemmar i en kyrka
    pub fn find_by_church(&self, church_id: i64) -> AppResult<Vec<Member>> {
        self.search(&MemberFilter::for_church(church_id))
    }

    /// Sökning med filterkriterier
    pub fn search(&self, filter: &MemberFilter) -> AppResult<Vec<Member>> {
        let conn = lock(&self.conn)?;

        let mut sql = format!("SELECT {} FROM members WHERE 1=1", MEMBER_COLUMNS);
        let mut params_vec: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if !filter.query.is_empty() {
            let index = params_vec.len() + 1;
            sql.push_str(&format!(
                " AND (firstname LIKE ?{0} OR surname LIKE ?{0} OR national_id LIKE ?{0}
                       OR membership_number LIKE ?{0})",
                index
            ));
            params_vec.push(Box::new(format!("%{}%", filter.query)));
        }

        if let Some(church_id) = filter.church_id {
            let index = params_vec.len() + 1;
            sql.push_str(&format!(" AND church_id = ?{}", index));
            params_vec.push(Box::new(church_id));
        }

        if let Some(status) = filter.status {
            sql.push_str(match status {
                MemberStatus::PendingTransfer => " AND pending_transfer = 1",
                MemberStatus::Disciplined => " AND pending_transfer = 0 AND disciplined = 1",
                MemberStatus::Active => {
                    " AND pending_transfer = 0 AND disciplined = 0 AND active = 1"
                }
                MemberStatus::Inactive => {
                    " AND pending_transfer = 0 AND disciplined = 0 AND active = 0"
                }
            });
        }

        sql.push_str(" ORDER BY surname, firstname, id");

        let mut stmt = conn.prepare(&sql)?;
        let members = stmt
            .query_map(
                rusqlite::params_from_iter(params_vec.iter().map(|p| p.as_ref())),
                Self::row_to_member,
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(members)
    }

    /// Räkna antal medlemmar
    pub fn count(&self) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM members", [], |row| row.get(0))?;
        Ok(count)
    }

    pub(crate) fn exists_in(conn: &Connection, id: i64) -> AppResult<bool> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM members WHERE id = ?)",
            [id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Alla tilldelade medlemsnummer för en kyrka och ett år
    pub(crate) fn numbers_for_year_in(
        conn: &Connection,
        church_id: i64,
        year: i32,
    ) -> AppResult<Vec<MembershipNumber>> {
        let mut stmt = conn.prepare(
            "SELECT membership_number FROM members
             WHERE church_id = ?1 AND membership_number IS NOT NULL
               AND substr(membership_number, 1, 4) = ?2",
        )?;

        let raw: Vec<String> = stmt
            .query_map(params![church_id, format!("{:04}", year)], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        raw.iter()
            .map(|s| {
                s.parse::<MembershipNumber>()
                    .map_err(|e| AppError::constraint(e.to_string()))
            })
            .collect()
    }

    /// Kontrollera om numret redan används i kyrkan
    pub(crate) fn number_taken_in(
        conn: &Connection,
        church_id: i64,
        number: &MembershipNumber,
        exclude_id: Option<i64>,
    ) -> AppResult<bool> {
        let taken: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM members
                           WHERE church_id = ?1 AND membership_number = ?2
                             AND (?3 IS NULL OR id != ?3))",
            params![church_id, number.to_string(), exclude_id],
            |row| row.get(0),
        )?;
        Ok(taken)
    }

    pub(crate) fn insert_in(conn: &Connection, member: &Member) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO members (church_id, firstname, surname, national_id, email, phone, gender,
                                  birth_date, admission_date, membership_number, active,
                                  disciplined, pending_transfer, photo_path)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                member.church_id,
                member.firstname,
                member.surname,
                member.national_id,
                member.email,
                member.phone,
                member.gender.map(|g| g.as_db_str()),
                member.birth_date.map(format_date),
                member.admission_date.map(format_date),
                member.membership_number.map(|n| n.to_string()),
                member.active,
                member.disciplined,
                member.pending_transfer,
                member.photo_path,
            ],
        )
        .map_err(AppError::from_store)?;

        Ok(conn.last_insert_rowid())
    }

    /// Uppdatera medlem. Medlemsnumret lämnas orört; det ändras endast
    /// via `set_membership_number_in`.
    pub fn update(&self, member: &Member) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        Self::update_in(&conn, member)
    }

    pub(crate) fn update_in(conn: &Connection, member: &Member) -> AppResult<()> {
        let id = member
            .id
            .ok_or_else(|| AppError::validation("Medlem har inget ID"))?;
        member.validate()?;

        let rows = conn
            .execute(
                "UPDATE members SET
                    church_id = ?1, firstname = ?2, surname = ?3, national_id = ?4, email = ?5,
                    phone = ?6, gender = ?7, birth_date = ?8, admission_date = ?9, active = ?10,
                    disciplined = ?11, pending_transfer = ?12, photo_path = ?13,
                    updated_at = datetime('now')
                 WHERE id = ?14",
                params![
                    member.church_id,
                    member.firstname,
                    member.surname,
                    member.national_id,
                    member.email,
                    member.phone,
                    member.gender.map(|g| g.as_db_str()),
                    member.birth_date.map(format_date),
                    member.admission_date.map(format_date),
                    member.active,
                    member.disciplined,
                    member.pending_transfer,
                    member.photo_path,
                    id,
                ],
            )
            .map_err(AppError::from_store)?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Medlem med ID {}", id)));
        }

        Ok(())
    }

    pub(crate) fn set_membership_number_in(
        conn: &Connection,
        id: i64,
        number: &MembershipNumber,
    ) -> AppResult<()> {
        let rows = conn
            .execute(
                "UPDATE members SET membership_number = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![number.to_string(), id],
            )
            .map_err(AppError::from_store)?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Medlem med ID {}", id)));
        }

        Ok(())
    }

    /// Ta bort medlem (relationerna tas bort av databasen)
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn
            .execute("DELETE FROM members WHERE id = ?", [id])
            .map_err(AppError::from_store)?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Medlem med ID {}", id)));
        }

        Ok(())
    }

    fn row_to_member(row: &Row) -> rusqlite::Result<Member> {
        let gender = match row.get::<_, Option<String>>(7)? {
            Some(s) => Some(
                Gender::from_db_str(&s)
                    .ok_or_else(|| rusqlite::Error::InvalidColumnType(7, "gender".into(), Type::Text))?,
            ),
            None => None,
        };

        let membership_number = match row.get::<_, Option<String>>(10)? {
            Some(s) => Some(s.parse::<MembershipNumber>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e))
            })?),
            None => None,
        };

        Ok(Member {
            id: row.get(0)?,
            church_id: row.get(1)?,
            firstname: row.get(2)?,
            surname: row.get(3)?,
            national_id: row.get(4)?,
            email: row.get(5)?,
            phone: row.get(6)?,
            gender,
            birth_date: parse_stored_date(row.get(8)?),
            admission_date: parse_stored_date(row.get(9)?),
            membership_number,
            active: row.get(11)?,
            disciplined: row.get(12)?,
            pending_transfer: row.get(13)?,
            photo_path: row.get(14)?,
            created_at: row.get(15)?,
            updated_at: row.get(16)?,
        })
    }
}
