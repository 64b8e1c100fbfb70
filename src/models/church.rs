use std::fmt;

use serde::{Deserialize, Serialize};

/// Kyrkotyp; allt utom `Church` är en beroende enhet under en moderkyrka
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChurchType {
    Church,
    Congregation,
    PresbyterialCongregation,
    PreachingPoint,
}

impl ChurchType {
    pub fn is_independent(&self) -> bool {
        matches!(self, Self::Church)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Church => "Kyrka",
            Self::Congregation => "Församling",
            Self::PresbyterialCongregation => "Presbyterial församling",
            Self::PreachingPoint => "Predikoplats",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "church" => Some(Self::Church),
            "congregation" => Some(Self::Congregation),
            "presbyterial_congregation" => Some(Self::PresbyterialCongregation),
            "preaching_point" => Some(Self::PreachingPoint),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Church,
            Self::Congregation,
            Self::PresbyterialCongregation,
            Self::PreachingPoint,
        ]
    }
}

impl fmt::Display for ChurchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Church => write!(f, "church"),
            Self::Congregation => write!(f, "congregation"),
            Self::PresbyterialCongregation => write!(f, "presbyterial_congregation"),
            Self::PreachingPoint => write!(f, "preaching_point"),
        }
    }
}

/// Id för en kyrka som verifierats vara av typen `Church`.
/// Skapas endast av hierarkivalideringen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct IndependentId(i64);

impl IndependentId {
    pub(crate) fn verified(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

/// Kyrkans plats i tvånivåskogen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChurchShape {
    Independent,
    Dependent {
        kind: ChurchType,
        parent: IndependentId,
    },
}

impl ChurchShape {
    pub fn parent_id(&self) -> Option<i64> {
        match self {
            Self::Independent => None,
            Self::Dependent { parent, .. } => Some(parent.get()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Church {
    pub id: Option<i64>,
    pub name: String,
    pub church_type: ChurchType,
    pub parent_church_id: Option<i64>,
    pub pastor_id: Option<i64>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Church {
    pub fn independent(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            church_type: ChurchType::Church,
            parent_church_id: None,
            pastor_id: None,
            city: None,
            address: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn dependent(name: impl Into<String>, church_type: ChurchType, parent_church_id: i64) -> Self {
        Self {
            church_type,
            parent_church_id: Some(parent_church_id),
            ..Self::independent(name)
        }
    }

    /// Radlokala regler: namn, typ mot förälder och självreferens.
    /// Förälderns typ kontrolleras av hierarkivalideringen.
    pub fn validate(&self) -> Result<(), ChurchValidationError> {
        if self.name.trim().is_empty() {
            return Err(ChurchValidationError::MissingName);
        }

        match (self.church_type.is_independent(), self.parent_church_id) {
            (true, Some(_)) => return Err(ChurchValidationError::IndependentWithParent),
            (false, None) => return Err(ChurchValidationError::DependentWithoutParent),
            _ => {}
        }

        if self.id.is_some() && self.id == self.parent_church_id {
            return Err(ChurchValidationError::SelfParent);
        }

        Ok(())
    }
}

/// Delvis ändring av en kyrka. Fält som är `None` lämnas orörda.
///
/// Blir typen `Church` utan att ny moderkyrka anges tas den gamla bort.
#[derive(Debug, Clone, Default)]
pub struct ChurchPatch {
    pub name: Option<String>,
    pub church_type: Option<ChurchType>,
    pub parent_church_id: Option<i64>,
    pub city: Option<String>,
    pub address: Option<String>,
}

impl ChurchPatch {
    pub fn apply(&self, church: &mut Church) {
        if let Some(name) = &self.name {
            church.name = name.clone();
        }
        if let Some(church_type) = self.church_type {
            church.church_type = church_type;
            if church_type.is_independent() && self.parent_church_id.is_none() {
                church.parent_church_id = None;
            }
        }
        if let Some(parent) = self.parent_church_id {
            church.parent_church_id = Some(parent);
        }
        if self.city.is_some() {
            church.city = self.city.clone();
        }
        if self.address.is_some() {
            church.address = self.address.clone();
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ChurchValidationError {
    #[error("Namn krävs")]
    MissingName,
    #[error("En kyrka kan inte ha en moderkyrka")]
    IndependentWithParent,
    #[error("En församling måste ha en moderkyrka")]
    DependentWithoutParent,
    #[error("En kyrka kan inte vara sin egen moderkyrka")]
    SelfParent,
    #[error("Moderkyrkan ({0}) är själv en församling")]
    ParentNotIndependent(i64),
    #[error("Kyrkan har {0} församlingar och kan inte göras om till församling")]
    DemotionWithDependents(i64),
}
