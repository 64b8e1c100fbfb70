//! Familjerelationer med spegelkanter
//!
//! `add_relationship` skapar både den begärda kanten och dess spegel i en
//! transaktion. `import_relationship` lägger in en enstaka kant utan spegel
//! och `remove_relationship` tar bara bort den angivna kanten.

use tracing::{debug, info};

use crate::db::{Database, MemberRepository, RelationshipRepository};
use crate::models::{FamilyMemberView, FamilyRelationship, RelationshipPair, RelationshipType};
use crate::utils::error::{AppError, AppResult};

pub struct FamilyService<'a> {
    db: &'a Database,
}

impl<'a> FamilyService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Skapa `member -> related` och spegelkanten `related -> member`.
    ///
    /// Finns spegeln redan lämnas den orörd och `mirror_edge_id` blir `None`.
    ///
    /// Spegeln till `Child` är `Father` eller `Mother` beroende på
    /// medlemmens kön. Saknas kön ger anropet `InvalidOperation` och ingen
    /// kant skrivs.
    pub fn add_relationship(
        &self,
        member_id: i64,
        related_member_id: i64,
        relationship_type: RelationshipType,
    ) -> AppResult<RelationshipPair> {
        let pair = self.db.with_transaction(|tx| {
            let edge = FamilyRelationship::new(member_id, related_member_id, relationship_type);
            let edge_id = RelationshipRepository::insert_checked_in(tx, &edge)?;

            let member = MemberRepository::find_by_id_in(tx, member_id)?
                .ok_or_else(|| AppError::not_found(format!("Medlem med ID {}", member_id)))?;
            let mirror_type = relationship_type.mirror(member.gender).ok_or_else(|| {
                AppError::invalid_operation(format!(
                    "Kön saknas för {}, kan inte avgöra om spegelrelationen är far eller mor",
                    member.full_name()
                ))
            })?;

            let mirror_edge_id = match RelationshipRepository::find_edge_in(
                tx,
                related_member_id,
                member_id,
                mirror_type,
            )? {
                Some(existing) => {
                    debug!("Spegelkant {} finns redan", existing);
                    None
                }
                None => Some(RelationshipRepository::insert_in(
                    tx,
                    &FamilyRelationship::new(related_member_id, member_id, mirror_type),
                )?),
            };

            Ok(RelationshipPair {
                edge_id,
                mirror_edge_id,
            })
        })?;

        info!(
            "Relation {} -> {} ({}) skapad",
            member_id,
            related_member_id,
            relationship_type.display_name()
        );
        Ok(pair)
    }

    /// Lägg in en enstaka kant utan spegel (import av historiska data)
    pub fn import_relationship(&self, edge: &mut FamilyRelationship) -> AppResult<i64> {
        let id = self.db.relationships().insert_edge(edge)?;
        debug!("Importerade relation {} utan spegel", id);
        Ok(id)
    }

    /// Ta bort en kant. Spegeln tas inte bort.
    pub fn remove_relationship(&self, edge_id: i64) -> AppResult<()> {
        self.db.relationships().delete(edge_id)?;
        info!("Relation {} borttagen", edge_id);
        Ok(())
    }

    /// Medlemmens familj i visningsordning
    pub fn get_family(&self, member_id: i64) -> AppResult<Vec<FamilyMemberView>> {
        if self.db.members().find_by_id(member_id)?.is_none() {
            return Err(AppError::not_found(format!("Medlem med ID {}", member_id)));
        }
        self.db.relationships().find_family(member_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Church, Gender, Member};
    use crate::services::{HierarchyService, MembershipService};

    struct Fixture {
        db: Database,
        church_id: i64,
    }

    impl Fixture {
        fn new() -> Self {
            let db = Database::open_in_memory().unwrap();
            let church_id = HierarchyService::new(&db)
                .create_church(&mut Church::independent("Centrumkyrkan"))
                .unwrap();
            Self { db, church_id }
        }

        fn member(&self, firstname: &str, gender: Option<Gender>) -> i64 {
            let mut member = Member::new(self.church_id, firstname, Some("Lind".into()));
            member.gender = gender;
            MembershipService::new(&self.db)
                .create_member(&mut member)
                .unwrap();
            member.id.unwrap()
        }

        fn edges(&self) -> Vec<(i64, i64, RelationshipType)> {
            let mut edges: Vec<_> = self
                .db
                .relationships()
                .find_all()
                .unwrap()
                .into_iter()
                .map(|r| (r.member_id, r.related_member_id, r.relationship_type))
                .collect();
            edges.sort_by_key(|(a, b, t)| (*a, *b, *t as i32));
            edges
        }
    }

    #[test]
    fn test_spouse_creates_both_directions() {
        let f = Fixture::new();
        let a = f.member("Anna", Some(Gender::Female));
        let b = f.member("Per", Some(Gender::Male));

        let pair = FamilyService::new(&f.db)
            .add_relationship(a, b, RelationshipType::Spouse)
            .unwrap();
        assert!(pair.mirror_edge_id.is_some());

        assert_eq!(
            f.edges(),
            vec![
                (a, b, RelationshipType::Spouse),
                (b, a, RelationshipType::Spouse)
            ]
        );
    }

    #[test]
    fn test_duplicate_leaves_graph_unchanged() {
        let f = Fixture::new();
        let a = f.member("Anna", None);
        let b = f.member("Per", None);
        let service = FamilyService::new(&f.db);

        service.add_relationship(a, b, RelationshipType::Spouse).unwrap();
        let before = f.edges();

        assert!(matches!(
            service.add_relationship(a, b, RelationshipType::Spouse),
            Err(AppError::DuplicateEdge(_))
        ));
        assert_eq!(f.edges(), before);
    }

    #[test]
    fn test_father_creates_child_mirror() {
        let f = Fixture::new();
        let child = f.member("Lisa", None);
        let father = f.member("Per", Some(Gender::Male));

        FamilyService::new(&f.db)
            .add_relationship(child, father, RelationshipType::Father)
            .unwrap();

        assert_eq!(
            f.edges(),
            vec![
                (child, father, RelationshipType::Father),
                (father, child, RelationshipType::Child)
            ]
        );
    }

    #[test]
    fn test_child_mirror_follows_gender() {
        let f = Fixture::new();
        let mother = f.member("Anna", Some(Gender::Female));
        let child = f.member("Lisa", None);
        let unknown = f.member("Kim", None);
        let service = FamilyService::new(&f.db);

        service
            .add_relationship(mother, child, RelationshipType::Child)
            .unwrap();
        assert!(f
            .edges()
            .contains(&(child, mother, RelationshipType::Mother)));

        let before = f.edges();
        assert!(matches!(
            service.add_relationship(unknown, child, RelationshipType::Child),
            Err(AppError::InvalidOperation(_))
        ));
        assert_eq!(f.edges(), before);
    }

    #[test]
    fn test_existing_mirror_is_reused() {
        let f = Fixture::new();
        let a = f.member("Anna", None);
        let b = f.member("Per", None);
        let service = FamilyService::new(&f.db);

        let mut imported = FamilyRelationship::new(b, a, RelationshipType::Sibling);
        service.import_relationship(&mut imported).unwrap();

        let pair = service
            .add_relationship(a, b, RelationshipType::Sibling)
            .unwrap();
        assert_eq!(pair.mirror_edge_id, None);
        assert_eq!(f.edges().len(), 2);
    }

    #[test]
    fn test_import_has_no_mirror() {
        let f = Fixture::new();
        let a = f.member("Anna", None);
        let b = f.member("Per", None);

        let mut edge = FamilyRelationship::new(a, b, RelationshipType::Spouse);
        FamilyService::new(&f.db).import_relationship(&mut edge).unwrap();

        assert_eq!(f.edges(), vec![(a, b, RelationshipType::Spouse)]);
    }

    #[test]
    fn test_remove_keeps_mirror() {
        let f = Fixture::new();
        let a = f.member("Anna", None);
        let b = f.member("Per", None);
        let service = FamilyService::new(&f.db);

        let pair = service.add_relationship(a, b, RelationshipType::Spouse).unwrap();
        service.remove_relationship(pair.edge_id).unwrap();

        assert_eq!(f.edges(), vec![(b, a, RelationshipType::Spouse)]);
        assert!(matches!(
            service.remove_relationship(pair.edge_id),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_requests() {
        let f = Fixture::new();
        let a = f.member("Anna", None);
        let service = FamilyService::new(&f.db);

        assert!(matches!(
            service.add_relationship(a, a, RelationshipType::Sibling),
            Err(AppError::InvalidOperation(_))
        ));
        assert!(matches!(
            service.add_relationship(a, 404, RelationshipType::Sibling),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.add_relationship(404, a, RelationshipType::Sibling),
            Err(AppError::NotFound(_))
        ));
        assert!(f.edges().is_empty());
    }

    #[test]
    fn test_get_family_order() {
        let f = Fixture::new();
        let me = f.member("Lisa", Some(Gender::Female));
        let father = f.member("Per", Some(Gender::Male));
        let mother = f.member("Anna", Some(Gender::Female));
        let spouse = f.member("Olof", Some(Gender::Male));
        let sibling = f.member("Erik", Some(Gender::Male));
        let child = f.member("Maja", None);
        let service = FamilyService::new(&f.db);

        service.add_relationship(me, child, RelationshipType::Child).unwrap();
        service.add_relationship(me, sibling, RelationshipType::Sibling).unwrap();
        service.add_relationship(me, spouse, RelationshipType::Spouse).unwrap();
        service.add_relationship(me, mother, RelationshipType::Mother).unwrap();
        service.add_relationship(me, father, RelationshipType::Father).unwrap();

        let family = service.get_family(me).unwrap();
        let order: Vec<(i64, RelationshipType)> = family
            .iter()
            .map(|v| (v.related_member.id, v.relationship_type))
            .collect();

        assert_eq!(
            order,
            vec![
                (father, RelationshipType::Father),
                (mother, RelationshipType::Mother),
                (spouse, RelationshipType::Spouse),
                (sibling, RelationshipType::Sibling),
                (child, RelationshipType::Child),
            ]
        );
        assert_eq!(family[0].related_member.full_name, "Per Lind");

        let child_view = service.get_family(child).unwrap();
        assert_eq!(child_view.len(), 1);
        assert_eq!(child_view[0].relationship_type, RelationshipType::Mother);
    }

    #[test]
    fn test_get_family_missing_member() {
        let f = Fixture::new();
        assert!(matches!(
            FamilyService::new(&f.db).get_family(12),
            Err(AppError::NotFound(_))
        ));
    }
}
