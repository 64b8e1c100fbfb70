use rusqlite::{params, types::Type, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

use super::{lock, MemberRepository};
use crate::models::{FamilyMemberView, FamilyRelationship, MemberSummary, RelationshipType};
use crate::utils::error::{AppError, AppResult};

pub struct RelationshipRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RelationshipRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// Hämta alla kanter
    pub fn find_all(&self) -> AppResult<Vec<FamilyRelationship>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT id, member_id, related_member_id, relationship_type, created_at
             FROM family_relationships
             ORDER BY id",
        )?;

        let rels = stmt
            .query_map([], Self::row_to_relationship)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rels)
    }

    /// Räkna alla kanter
    pub fn count(&self) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM family_relationships",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Antal kanter per typ
    pub fn count_by_type(&self) -> AppResult<Vec<(RelationshipType, i64)>> {
        let conn = lock(&self.conn)?;
        let mut counts = Vec::new();

        for rel_type in RelationshipType::all() {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM family_relationships WHERE relationship_type = ?",
                [*rel_type as i32],
                |row| row.get(0),
            )?;
            counts.push((*rel_type, count));
        }

        Ok(counts)
    }

    /// Hämta kant via ID
    pub fn find_by_id(&self, id: i64) -> AppResult<Option<FamilyRelationship>> {
        let conn = lock(&self.conn)?;
        let rel = conn
            .query_row(
                "SELECT id, member_id, related_member_id, relationship_type, created_at
                 FROM family_relationships WHERE id = ?",
                [id],
                Self::row_to_relationship,
            )
            .optional()?;

        Ok(rel)
    }

    /// Familjen sedd från en medlem, sorterad efter relationstyp och namn
    pub fn find_family(&self, member_id: i64) -> AppResult<Vec<FamilyMemberView>> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn.prepare(
            "SELECT r.id, r.relationship_type, m.id, m.church_id, m.firstname, m.surname,
                    m.membership_number
             FROM family_relationships r
             JOIN members m ON m.id = r.related_member_id
             WHERE r.member_id = ?",
        )?;

        let mut views: Vec<FamilyMemberView> = stmt
            .query_map([member_id], |row| {
                let raw_type: i32 = row.get(1)?;
                let relationship_type = RelationshipType::from_i32(raw_type).ok_or_else(|| {
                    rusqlite::Error::InvalidColumnType(1, "relationship_type".into(), Type::Integer)
                })?;

                let firstname: String = row.get(4)?;
                let surname: Option<String> = row.get(5)?;
                let full_name = match surname {
                    Some(s) if !s.is_empty() => format!("{} {}", firstname, s),
                    _ => firstname,
                };

                let membership_number = row
                    .get::<_, Option<String>>(6)?
                    .and_then(|s| s.parse().ok());

                Ok(FamilyMemberView {
                    relationship_id: row.get(0)?,
                    related_member: MemberSummary {
                        id: row.get(2)?,
                        church_id: row.get(3)?,
                        full_name,
                        membership_number,
                    },
                    relationship_type,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        views.sort_by(|a, b| {
            a.relationship_type
                .display_priority()
                .cmp(&b.relationship_type.display_priority())
                .then_with(|| a.related_member.full_name.cmp(&b.related_member.full_name))
                .then_with(|| a.relationship_id.cmp(&b.relationship_id))
        });

        Ok(views)
    }

    pub(crate) fn find_edge_in(
        conn: &Connection,
        member_id: i64,
        related_member_id: i64,
        relationship_type: RelationshipType,
    ) -> AppResult<Option<i64>> {
        let id = conn
            .query_row(
                "SELECT id FROM family_relationships
                 WHERE member_id = ?1 AND related_member_id = ?2 AND relationship_type = ?3",
                params![member_id, related_member_id, relationship_type as i32],
                |row| row.get(0),
            )
            .optional()?;

        Ok(id)
    }

    /// Kontrollerar medlemmar, självreferens och dubbletter och lägger sedan
    /// in kanten. Ingen spegelkant skapas.
    pub(crate) fn insert_checked_in(conn: &Connection, rel: &FamilyRelationship) -> AppResult<i64> {
        for id in [rel.member_id, rel.related_member_id] {
            if !MemberRepository::exists_in(conn, id)? {
                return Err(AppError::not_found(format!("Medlem med ID {}", id)));
            }
        }

        if rel.is_self_loop() {
            return Err(AppError::invalid_operation(
                "En medlem kan inte ha en relation till sig själv",
            ));
        }

        if Self::find_edge_in(conn, rel.member_id, rel.related_member_id, rel.relationship_type)?
            .is_some()
        {
            return Err(AppError::duplicate_edge(format!(
                "{} -> {} ({})",
                rel.member_id,
                rel.related_member_id,
                rel.relationship_type.display_name()
            )));
        }

        Self::insert_in(conn, rel)
    }

    pub(crate) fn insert_in(conn: &Connection, rel: &FamilyRelationship) -> AppResult<i64> {
        conn.execute(
            "INSERT INTO family_relationships (member_id, related_member_id, relationship_type)
             VALUES (?1, ?2, ?3)",
            params![
                rel.member_id,
                rel.related_member_id,
                rel.relationship_type as i32
            ],
        )
        .map_err(AppError::from_store)?;

        Ok(conn.last_insert_rowid())
    }

    /// Lägg in en enstaka kant utan spegel (import av historiska data)
    pub fn insert_edge(&self, rel: &mut FamilyRelationship) -> AppResult<i64> {
        let conn = lock(&self.conn)?;
        let id = Self::insert_checked_in(&conn, rel)?;
        rel.id = Some(id);
        Ok(id)
    }

    /// Ta bort exakt en kant; spegeln lämnas kvar
    pub fn delete(&self, id: i64) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        let rows = conn.execute("DELETE FROM family_relationships WHERE id = ?", [id])?;

        if rows == 0 {
            return Err(AppError::not_found(format!("Relation med ID {}", id)));
        }

        Ok(())
    }

    fn row_to_relationship(row: &Row) -> rusqlite::Result<FamilyRelationship> {
        let raw_type: i32 = row.get(3)?;
        let relationship_type = RelationshipType::from_i32(raw_type).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(3, "relationship_type".into(), Type::Integer)
        })?;

        Ok(FamilyRelationship {
            id: row.get(0)?,
            member_id: row.get(1)?,
            related_member_id: row.get(2)?,
            relationship_type,
            created_at: row.get(4)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ChurchRepository, Database};
    use crate::models::{Church, Member};

    fn setup_db() -> (Database, i64, i64) {
        let db = Database::open_in_memory().unwrap();
        let (a, b) = db
            .with_connection(|conn| {
                let church = ChurchRepository::insert_in(conn, &Church::independent("Centrumkyrkan"))?;
                let a = MemberRepository::insert_in(conn, &Member::new(church, "Anna", Some("Lind".into())))?;
                let b = MemberRepository::insert_in(conn, &Member::new(church, "Per", Some("Lind".into())))?;
                Ok((a, b))
            })
            .unwrap();
        (db, a, b)
    }

    #[test]
    fn test_insert_edge_has_no_mirror() {
        let (db, a, b) = setup_db();

        let mut rel = FamilyRelationship::new(a, b, RelationshipType::Spouse);
        let id = db.relationships().insert_edge(&mut rel).unwrap();
        assert_eq!(rel.id, Some(id));

        assert_eq!(db.relationships().count().unwrap(), 1);
        assert!(db
            .relationships()
            .find_all()
            .unwrap()
            .iter()
            .all(|r| r.member_id == a));
    }

    #[test]
    fn test_insert_edge_rejects_duplicates_and_self_loops() {
        let (db, a, b) = setup_db();

        let mut rel = FamilyRelationship::new(a, b, RelationshipType::Sibling);
        db.relationships().insert_edge(&mut rel).unwrap();

        let mut again = FamilyRelationship::new(a, b, RelationshipType::Sibling);
        assert!(matches!(
            db.relationships().insert_edge(&mut again),
            Err(AppError::DuplicateEdge(_))
        ));

        let mut self_loop = FamilyRelationship::new(a, a, RelationshipType::Sibling);
        assert!(matches!(
            db.relationships().insert_edge(&mut self_loop),
            Err(AppError::InvalidOperation(_))
        ));

        let mut missing = FamilyRelationship::new(a, 999, RelationshipType::Sibling);
        assert!(matches!(
            db.relationships().insert_edge(&mut missing),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_store_rejects_raw_self_loop() {
        let (db, a, _) = setup_db();

        let result = db.with_connection(|conn| {
            RelationshipRepository::insert_in(
                conn,
                &FamilyRelationship::new(a, a, RelationshipType::Spouse),
            )
        });
        assert!(matches!(result, Err(AppError::ConstraintViolation(_))));
    }

    #[test]
    fn test_member_delete_cascades_edges() {
        let (db, a, b) = setup_db();

        let mut rel = FamilyRelationship::new(a, b, RelationshipType::Spouse);
        db.relationships().insert_edge(&mut rel).unwrap();

        db.members().delete(b).unwrap();
        assert_eq!(db.relationships().count().unwrap(), 0);
    }
}
