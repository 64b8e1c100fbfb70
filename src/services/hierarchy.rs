//! Hierarki för kyrkor och församlingar
//!
//! Kyrkorna bildar en skog med högst två nivåer: fristående kyrkor
//! (`ChurchType::Church`) utan förälder och beroende enheter (församling,
//! presbyterial församling, predikoplats) som pekar på exakt en fristående
//! kyrka.
//!
//! Policy vid borttagning: en kyrka som har församlingar kan inte tas bort
//! via tjänsten (`can_delete_church` returnerar `false`). Databasens
//! `ON DELETE SET NULL` gäller bara vid direkt borttagning i tabellen och
//! de församlingar det lämnar efter sig listas av
//! `find_orphaned_congregations`.

use rusqlite::Connection;
use tracing::{info, warn};

use crate::db::{ChurchRepository, Database};
use crate::models::{Church, ChurchPatch, ChurchShape, ChurchValidationError, IndependentId};
use crate::utils::error::{AppError, AppResult};

/// Kontrollera kyrkans form givet dess förälder och antal församlingar.
///
/// `parent` är den rad som `parent_church_id` pekar på (om någon) och
/// `dependent_count` antalet kyrkor som redan har denna kyrka som förälder.
pub fn check_shape(
    church: &Church,
    parent: Option<&Church>,
    dependent_count: i64,
) -> Result<ChurchShape, ChurchValidationError> {
    church.validate()?;

    if church.church_type.is_independent() {
        return Ok(ChurchShape::Independent);
    }

    if dependent_count > 0 {
        return Err(ChurchValidationError::DemotionWithDependents(dependent_count));
    }

    let parent_id = church
        .parent_church_id
        .ok_or(ChurchValidationError::DependentWithoutParent)?;

    match parent {
        Some(p) if p.church_type.is_independent() => Ok(ChurchShape::Dependent {
            kind: church.church_type,
            parent: IndependentId::verified(parent_id),
        }),
        _ => Err(ChurchValidationError::ParentNotIndependent(parent_id)),
    }
}

/// Läs förälder och församlingar och kontrollera formen
fn validate_in(conn: &Connection, church: &Church) -> AppResult<ChurchShape> {
    let parent = match church.parent_church_id {
        Some(parent_id) if Some(parent_id) != church.id => {
            let parent = ChurchRepository::find_by_id_in(conn, parent_id)?
                .ok_or_else(|| AppError::not_found(format!("Moderkyrka med ID {}", parent_id)))?;
            Some(parent)
        }
        _ => None,
    };

    let dependent_count = match church.id {
        Some(id) => ChurchRepository::count_congregations_in(conn, id)?,
        None => 0,
    };

    Ok(check_shape(church, parent.as_ref(), dependent_count)?)
}

pub struct HierarchyService<'a> {
    db: &'a Database,
}

impl<'a> HierarchyService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Skapa kyrka eller församling
    pub fn create_church(&self, church: &mut Church) -> AppResult<i64> {
        let id = self.db.with_transaction(|tx| {
            validate_in(tx, church)?;
            ChurchRepository::insert_in(tx, church)
        })?;

        church.id = Some(id);
        info!(
            "Skapade {} {} ({})",
            church.church_type.label().to_lowercase(),
            church.name,
            id
        );
        Ok(id)
    }

    /// Uppdatera kyrka, t.ex. byta moderkyrka eller typ
    pub fn update_church(&self, church: &Church) -> AppResult<ChurchShape> {
        let id = church
            .id
            .ok_or_else(|| AppError::validation("Kyrka har inget ID"))?;

        let shape = self.db.with_transaction(|tx| {
            if ChurchRepository::find_by_id_in(tx, id)?.is_none() {
                return Err(AppError::not_found(format!("Kyrka med ID {}", id)));
            }
            let shape = validate_in(tx, church)?;
            ChurchRepository::update_in(tx, id, church)?;
            Ok(shape)
        })?;

        info!("Uppdaterade kyrka {} ({})", church.name, id);
        Ok(shape)
    }

    /// Ändra enstaka fält. Typ och moderkyrka behålls om de inte anges.
    pub fn patch_church(&self, id: i64, patch: &ChurchPatch) -> AppResult<Church> {
        let church = self.db.with_transaction(|tx| {
            let mut church = ChurchRepository::find_by_id_in(tx, id)?
                .ok_or_else(|| AppError::not_found(format!("Kyrka med ID {}", id)))?;
            patch.apply(&mut church);
            validate_in(tx, &church)?;
            ChurchRepository::update_in(tx, id, &church)?;
            Ok(church)
        })?;

        info!("Uppdaterade kyrka {} ({})", church.name, id);
        Ok(church)
    }

    /// Ta bort kyrka. Nekas så länge den har församlingar eller medlemmar.
    pub fn delete_church(&self, id: i64) -> AppResult<()> {
        self.db.with_transaction(|tx| {
            if ChurchRepository::find_by_id_in(tx, id)?.is_none() {
                return Err(AppError::not_found(format!("Kyrka med ID {}", id)));
            }

            let congregations = ChurchRepository::count_congregations_in(tx, id)?;
            if congregations > 0 {
                warn!("Nekade borttagning av kyrka {} med {} församlingar", id, congregations);
                return Err(AppError::invalid_operation(format!(
                    "Kyrkan har {} församlingar och kan inte tas bort",
                    congregations
                )));
            }

            let members = ChurchRepository::count_members_in(tx, id)?;
            if members > 0 {
                return Err(AppError::invalid_operation(format!(
                    "Kyrkan har {} medlemmar och kan inte tas bort",
                    members
                )));
            }

            ChurchRepository::delete_in(tx, id)
        })?;

        info!("Kyrka {} borttagen", id);
        Ok(())
    }

    /// Direkta församlingar under en kyrka
    pub fn get_congregations(&self, church_id: i64) -> AppResult<Vec<Church>> {
        self.require_church(church_id)?;
        self.db.churches().find_congregations(church_id)
    }

    pub fn get_congregation_count(&self, church_id: i64) -> AppResult<i64> {
        self.require_church(church_id)?;
        self.db.churches().count_congregations(church_id)
    }

    /// Sant om kyrkan saknar församlingar
    pub fn can_delete_church(&self, church_id: i64) -> AppResult<bool> {
        Ok(self.get_congregation_count(church_id)? == 0)
    }

    /// Församlingar som saknar moderkyrka efter en direkt borttagning
    pub fn find_orphaned_congregations(&self) -> AppResult<Vec<Church>> {
        self.db.churches().find_orphaned()
    }

    /// Koppla pastor till kyrka (`None` kopplar bort)
    pub fn assign_pastor(&self, church_id: i64, pastor_id: Option<i64>) -> AppResult<()> {
        self.require_church(church_id)?;
        if let Some(pastor_id) = pastor_id {
            if self.db.pastors().find_by_id(pastor_id)?.is_none() {
                return Err(AppError::not_found(format!("Pastor med ID {}", pastor_id)));
            }
        }
        self.db.churches().set_pastor(church_id, pastor_id)
    }

    fn require_church(&self, church_id: i64) -> AppResult<Church> {
        self.db
            .churches()
            .find_by_id(church_id)?
            .ok_or_else(|| AppError::not_found(format!("Kyrka med ID {}", church_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChurchType, Member, Pastor};
    use crate::services::MembershipService;

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let id = HierarchyService::new(&db)
            .create_church(&mut Church::independent("Centrumkyrkan"))
            .unwrap();
        (db, id)
    }

    #[test]
    fn test_check_shape() {
        let mut parent = Church::independent("Centrumkyrkan");
        parent.id = Some(1);
        let mut congregation = Church::dependent("Norra", ChurchType::Congregation, 1);
        congregation.id = Some(2);

        assert_eq!(check_shape(&parent, None, 3).unwrap(), ChurchShape::Independent);

        let shape = check_shape(&congregation, Some(&parent), 0).unwrap();
        assert_eq!(shape.parent_id(), Some(1));

        let nested = Church::dependent("Predikoplats", ChurchType::PreachingPoint, 2);
        assert!(matches!(
            check_shape(&nested, Some(&congregation), 0),
            Err(ChurchValidationError::ParentNotIndependent(2))
        ));

        let mut demoted = parent.clone();
        demoted.church_type = ChurchType::Congregation;
        demoted.parent_church_id = Some(9);
        assert!(matches!(
            check_shape(&demoted, Some(&parent), 2),
            Err(ChurchValidationError::DemotionWithDependents(2))
        ));
    }

    #[test]
    fn test_rejects_church_with_parent() {
        let (db, parent) = setup();
        let mut church = Church::independent("Annexet");
        church.parent_church_id = Some(parent);

        assert!(matches!(
            HierarchyService::new(&db).create_church(&mut church),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_rejects_congregation_without_parent() {
        let (db, _) = setup();
        let mut church = Church::dependent("Norra", ChurchType::Congregation, 0);
        church.parent_church_id = None;

        assert!(matches!(
            HierarchyService::new(&db).create_church(&mut church),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_rejects_missing_parent() {
        let (db, _) = setup();
        let mut church = Church::dependent("Norra", ChurchType::Congregation, 404);

        assert!(matches!(
            HierarchyService::new(&db).create_church(&mut church),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_rejects_congregation_under_congregation() {
        let (db, parent) = setup();
        let service = HierarchyService::new(&db);

        let first = service
            .create_church(&mut Church::dependent("Norra", ChurchType::Congregation, parent))
            .unwrap();
        let mut second = Church::dependent("Södra", ChurchType::Congregation, parent);
        service.create_church(&mut second).unwrap();

        second.parent_church_id = Some(first);
        assert!(matches!(
            service.update_church(&second),
            Err(AppError::InvalidOperation(_))
        ));

        let stored = db.churches().find_by_id(second.id.unwrap()).unwrap().unwrap();
        assert_eq!(stored.parent_church_id, Some(parent));
    }

    #[test]
    fn test_rejects_self_parent() {
        let (db, parent) = setup();
        let service = HierarchyService::new(&db);

        let mut church = Church::dependent("Norra", ChurchType::Congregation, parent);
        let id = service.create_church(&mut church).unwrap();

        church.parent_church_id = Some(id);
        assert!(matches!(
            service.update_church(&church),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_rejects_demotion_with_dependents() {
        let (db, parent) = setup();
        let other = HierarchyService::new(&db)
            .create_church(&mut Church::independent("Södra kyrkan"))
            .unwrap();
        let service = HierarchyService::new(&db);
        service
            .create_church(&mut Church::dependent("Norra", ChurchType::Congregation, parent))
            .unwrap();

        let mut demoted = db.churches().find_by_id(parent).unwrap().unwrap();
        demoted.church_type = ChurchType::Congregation;
        demoted.parent_church_id = Some(other);

        assert!(matches!(
            service.update_church(&demoted),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_promotion_to_church() {
        let (db, parent) = setup();
        let service = HierarchyService::new(&db);

        let mut church = Church::dependent("Norra", ChurchType::PreachingPoint, parent);
        service.create_church(&mut church).unwrap();

        church.church_type = ChurchType::Church;
        church.parent_church_id = None;
        assert_eq!(service.update_church(&church).unwrap(), ChurchShape::Independent);
        assert_eq!(service.get_congregation_count(parent).unwrap(), 0);
    }

    #[test]
    fn test_end_to_end_congregations() {
        let db = Database::open_in_memory().unwrap();
        let service = HierarchyService::new(&db);

        let c1 = service
            .create_church(&mut Church::independent("C1"))
            .unwrap();
        let mut c2 = Church::dependent("C2", ChurchType::Congregation, c1);
        let c2_id = service.create_church(&mut c2).unwrap();

        let congregations = service.get_congregations(c1).unwrap();
        assert_eq!(congregations.len(), 1);
        assert_eq!(congregations[0].id, Some(c2_id));
        assert!(!service.can_delete_church(c1).unwrap());
        assert!(matches!(
            service.delete_church(c1),
            Err(AppError::InvalidOperation(_))
        ));

        // Flytta C2 till en annan moderkyrka
        let c3 = service
            .create_church(&mut Church::independent("C3"))
            .unwrap();
        c2.parent_church_id = Some(c3);
        service.update_church(&c2).unwrap();

        assert!(service.can_delete_church(c1).unwrap());
        assert_eq!(service.get_congregation_count(c3).unwrap(), 1);

        // Ta bort C2 och sedan C3
        service.delete_church(c2_id).unwrap();
        assert!(service.can_delete_church(c3).unwrap());
        service.delete_church(c3).unwrap();
        service.delete_church(c1).unwrap();
        assert_eq!(db.churches().count().unwrap(), 0);
    }

    #[test]
    fn test_can_delete_matches_count() {
        let (db, parent) = setup();
        let service = HierarchyService::new(&db);

        for name in ["Norra", "Södra", "Östra"] {
            service
                .create_church(&mut Church::dependent(name, ChurchType::Congregation, parent))
                .unwrap();
            let count = service.get_congregation_count(parent).unwrap();
            assert_eq!(service.can_delete_church(parent).unwrap(), count == 0);
        }
        assert_eq!(service.get_congregation_count(parent).unwrap(), 3);

        assert!(matches!(
            service.can_delete_church(999),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete_blocked_by_members() {
        let (db, church_id) = setup();
        MembershipService::new(&db)
            .create_member(&mut Member::new(church_id, "Anna", None))
            .unwrap();

        assert!(matches!(
            HierarchyService::new(&db).delete_church(church_id),
            Err(AppError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_assign_pastor() {
        let (db, church_id) = setup();
        let service = HierarchyService::new(&db);

        assert!(matches!(
            service.assign_pastor(church_id, Some(5)),
            Err(AppError::NotFound(_))
        ));

        let pastor_id = db.pastors().create(&mut Pastor::new("Erik", None)).unwrap();
        service.assign_pastor(church_id, Some(pastor_id)).unwrap();
        let church = db.churches().find_by_id(church_id).unwrap().unwrap();
        assert_eq!(church.pastor_id, Some(pastor_id));
    }

    #[test]
    fn test_rename_keeps_congregation_under_parent() {
        let (db, parent) = setup();
        let service = HierarchyService::new(&db);

        let mut norra = Church::dependent("Norra", ChurchType::Congregation, parent);
        norra.city = Some("Umeå".into());
        let norra_id = service.create_church(&mut norra).unwrap();

        let renamed = service
            .patch_church(
                norra_id,
                &ChurchPatch {
                    name: Some("Norra fors".into()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(renamed.church_type, ChurchType::Congregation);

        let congregations = service.get_congregations(parent).unwrap();
        assert_eq!(congregations.len(), 1);
        assert_eq!(congregations[0].name, "Norra fors");
        assert_eq!(congregations[0].city.as_deref(), Some("Umeå"));
        assert!(!service.can_delete_church(parent).unwrap());

        assert!(matches!(
            service.patch_church(404, &ChurchPatch::default()),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.patch_church(
                norra_id,
                &ChurchPatch {
                    parent_church_id: Some(norra_id),
                    ..Default::default()
                }
            ),
            Err(AppError::InvalidOperation(_))
        ));
    }
}
