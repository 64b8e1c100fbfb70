use serde::{Deserialize, Serialize};

use super::{Gender, MemberSummary};

/// Relationstyp; anger vad `related_member` är för `member`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum RelationshipType {
    Father = 1,
    Mother = 2,
    Spouse = 3,
    Sibling = 4,
    Child = 5,
}

impl RelationshipType {
    /// Typen på spegelkanten `related -> member`.
    ///
    /// För `Child` avgör medlemmens eget kön om spegeln blir `Father` eller
    /// `Mother`; utan känt kön finns ingen spegel.
    pub fn mirror(&self, member_gender: Option<Gender>) -> Option<Self> {
        match self {
            Self::Father | Self::Mother => Some(Self::Child),
            Self::Spouse => Some(Self::Spouse),
            Self::Sibling => Some(Self::Sibling),
            Self::Child => match member_gender {
                Some(Gender::Male) => Some(Self::Father),
                Some(Gender::Female) => Some(Self::Mother),
                None => None,
            },
        }
    }

    /// Visningsordning: föräldrar, make/maka, syskon, barn
    pub fn display_priority(&self) -> u8 {
        match self {
            Self::Father => 0,
            Self::Mother => 1,
            Self::Spouse => 2,
            Self::Sibling => 3,
            Self::Child => 4,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Father => "Far",
            Self::Mother => "Mor",
            Self::Spouse => "Make/Maka",
            Self::Sibling => "Syskon",
            Self::Child => "Barn",
        }
    }

    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            1 => Some(Self::Father),
            2 => Some(Self::Mother),
            3 => Some(Self::Spouse),
            4 => Some(Self::Sibling),
            5 => Some(Self::Child),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Father,
            Self::Mother,
            Self::Spouse,
            Self::Sibling,
            Self::Child,
        ]
    }
}

/// En riktad kant i familjegrafen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyRelationship {
    pub id: Option<i64>,
    pub member_id: i64,
    pub related_member_id: i64,
    pub relationship_type: RelationshipType,
    pub created_at: Option<String>,
}

impl FamilyRelationship {
    pub fn new(member_id: i64, related_member_id: i64, relationship_type: RelationshipType) -> Self {
        Self {
            id: None,
            member_id,
            related_member_id,
            relationship_type,
            created_at: None,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.member_id == self.related_member_id
    }
}

/// Resultat av `add_relationship`: den begärda kanten och spegelkanten.
/// `mirror_edge_id` är `None` när spegeln redan fanns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationshipPair {
    pub edge_id: i64,
    pub mirror_edge_id: Option<i64>,
}

/// En relation sedd från en viss medlems perspektiv
#[derive(Debug, Clone, Serialize)]
pub struct FamilyMemberView {
    pub relationship_id: i64,
    pub related_member: MemberSummary,
    pub relationship_type: RelationshipType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mirror() {
        assert_eq!(RelationshipType::Father.mirror(None), Some(RelationshipType::Child));
        assert_eq!(RelationshipType::Mother.mirror(None), Some(RelationshipType::Child));
        assert_eq!(RelationshipType::Spouse.mirror(None), Some(RelationshipType::Spouse));
        assert_eq!(RelationshipType::Sibling.mirror(None), Some(RelationshipType::Sibling));
        assert_eq!(
            RelationshipType::Child.mirror(Some(Gender::Male)),
            Some(RelationshipType::Father)
        );
        assert_eq!(
            RelationshipType::Child.mirror(Some(Gender::Female)),
            Some(RelationshipType::Mother)
        );
        assert_eq!(RelationshipType::Child.mirror(None), None);
    }

    #[test]
    fn test_display_priority_order() {
        let mut types = vec![
            RelationshipType::Child,
            RelationshipType::Sibling,
            RelationshipType::Mother,
            RelationshipType::Spouse,
            RelationshipType::Father,
        ];
        types.sort_by_key(|t| t.display_priority());
        assert_eq!(types, RelationshipType::all());
    }
}
