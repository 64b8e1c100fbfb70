use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Kön, behövs för att härleda förälderrollen (far/mor) i spegelrelationer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "M" | "m" => Some(Self::Male),
            "F" | "f" | "K" | "k" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Male => "Man",
            Self::Female => "Kvinna",
        }
    }
}

/// Medlemsnummer i formatet `YYYYNNNN` (år + löpnummer)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MembershipNumber {
    year: i32,
    sequence: u16,
}

impl MembershipNumber {
    pub const MAX_SEQUENCE: u16 = 9999;

    pub fn new(year: i32, sequence: u16) -> Result<Self, MemberValidationError> {
        if !(1000..=9999).contains(&year) {
            return Err(MemberValidationError::InvalidYear(year));
        }
        if sequence == 0 || sequence > Self::MAX_SEQUENCE {
            return Err(MemberValidationError::MalformedMembershipNumber(format!(
                "{:04}{:04}",
                year, sequence
            )));
        }
        Ok(Self { year, sequence })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn sequence(&self) -> u16 {
        self.sequence
    }
}

impl fmt::Display for MembershipNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:04}", self.year, self.sequence)
    }
}

impl FromStr for MembershipNumber {
    type Err = MemberValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let malformed = || MemberValidationError::MalformedMembershipNumber(s.to_string());

        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }

        let year: i32 = s[..4].parse().map_err(|_| malformed())?;
        let sequence: u16 = s[4..].parse().map_err(|_| malformed())?;
        Self::new(year, sequence)
    }
}

impl Serialize for MembershipNumber {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MembershipNumber {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Sammanfattad status för visning, härledd från statusflaggorna
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberStatus {
    Active,
    Inactive,
    Disciplined,
    PendingTransfer,
}

impl MemberStatus {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Active => "Aktiv",
            Self::Inactive => "Inaktiv",
            Self::Disciplined => "Under kyrkotukt",
            Self::PendingTransfer => "Flytt pågår",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Active,
            Self::Inactive,
            Self::Disciplined,
            Self::PendingTransfer,
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub id: Option<i64>,
    pub church_id: i64,
    pub firstname: String,
    pub surname: Option<String>,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gender: Option<Gender>,
    pub birth_date: Option<NaiveDate>,
    pub admission_date: Option<NaiveDate>,
    pub membership_number: Option<MembershipNumber>,
    pub active: bool,
    pub disciplined: bool,
    pub pending_transfer: bool,
    pub photo_path: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Default for Member {
    fn default() -> Self {
        Self {
            id: None,
            church_id: 0,
            firstname: String::new(),
            surname: None,
            national_id: None,
            email: None,
            phone: None,
            gender: None,
            birth_date: None,
            admission_date: None,
            membership_number: None,
            active: true,
            disciplined: false,
            pending_transfer: false,
            photo_path: None,
            created_at: None,
            updated_at: None,
        }
    }
}

impl Member {
    pub fn new(church_id: i64, firstname: impl Into<String>, surname: Option<String>) -> Self {
        Self {
            church_id,
            firstname: firstname.into(),
            surname,
            ..Default::default()
        }
    }

    pub fn full_name(&self) -> String {
        match &self.surname {
            Some(s) if !s.is_empty() => format!("{} {}", self.firstname, s),
            _ => self.firstname.clone(),
        }
    }

    /// Året som styr medlemsnumret; utan inträdesdatum används `today`
    pub fn admission_year(&self, today: NaiveDate) -> i32 {
        self.admission_date.unwrap_or(today).year()
    }

    pub fn status(&self) -> MemberStatus {
        if self.pending_transfer {
            MemberStatus::PendingTransfer
        } else if self.disciplined {
            MemberStatus::Disciplined
        } else if self.active {
            MemberStatus::Active
        } else {
            MemberStatus::Inactive
        }
    }

    pub fn validate(&self) -> Result<(), MemberValidationError> {
        if self.firstname.trim().is_empty() {
            return Err(MemberValidationError::MissingName);
        }

        if self.church_id <= 0 {
            return Err(MemberValidationError::MissingChurch);
        }

        if let Some(national_id) = &self.national_id {
            let digits = national_id.chars().filter(|c| c.is_ascii_digit()).count();
            let valid_chars = national_id
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, '-' | '.' | ' '));
            if digits == 0 || !valid_chars {
                return Err(MemberValidationError::InvalidNationalId(national_id.clone()));
            }
        }

        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(MemberValidationError::InvalidEmail(email.clone()));
            }
        }

        if let (Some(birth), Some(admission)) = (self.birth_date, self.admission_date) {
            if admission < birth {
                return Err(MemberValidationError::AdmissionBeforeBirth);
            }
        }

        Ok(())
    }
}

/// Kortform av en medlem för listor och familjevyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberSummary {
    pub id: i64,
    pub church_id: i64,
    pub full_name: String,
    pub membership_number: Option<MembershipNumber>,
}

#[derive(Debug, thiserror::Error)]
pub enum MemberValidationError {
    #[error("Förnamn krävs")]
    MissingName,
    #[error("Medlem måste tillhöra en kyrka")]
    MissingChurch,
    #[error("Ogiltigt personnummer: {0}")]
    InvalidNationalId(String),
    #[error("Ogiltig e-postadress: {0}")]
    InvalidEmail(String),
    #[error("Inträdesdatum kan inte vara före födelsedatum")]
    AdmissionBeforeBirth,
    #[error("Felaktigt medlemsnummer: {0}")]
    MalformedMembershipNumber(String),
    #[error("Ogiltigt år för medlemsnummer: {0}")]
    InvalidYear(i32),
}
