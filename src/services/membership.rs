//! Medlemsnummer och registrering av nya medlemmar
//!
//! Numret har formatet `YYYYNNNN` där `NNNN` är ett jämnt löpnummer per
//! kyrka och inträdesår. Udda nummer tilldelas aldrig här.

use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::db::{ChurchRepository, Database, MemberRepository};
use crate::models::{Member, MembershipNumber};
use crate::utils::error::{AppError, AppResult};

/// Högsta löpnummer som kan tilldelas (ger 4 999 medlemmar per kyrka och år)
pub const SEQUENCE_CEILING: u16 = 9998;

/// Första löpnumret för ett nytt år
pub const FIRST_SEQUENCE: u16 = 2;

/// Serien för ett år är full
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("inga fler medlemsnummer för {year} (tak {ceiling:04})")]
pub struct SequenceExhausted {
    pub year: i32,
    pub ceiling: u16,
}

impl From<SequenceExhausted> for AppError {
    fn from(err: SequenceExhausted) -> Self {
        AppError::exhausted_sequence(err.to_string())
    }
}

/// Nästa lediga medlemsnummer för `year` givet redan tilldelade nummer.
///
/// Nummer från andra år ignoreras. Nästa nummer är det minsta jämna talet
/// över det högsta befintliga löpnumret, vilket ger `max + 2` så länge
/// serien bara innehåller jämna nummer.
pub fn allocate<'a, I>(existing: I, year: i32, ceiling: u16) -> Result<MembershipNumber, SequenceExhausted>
where
    I: IntoIterator<Item = &'a MembershipNumber>,
{
    let max = existing
        .into_iter()
        .filter(|n| n.year() == year)
        .map(|n| n.sequence())
        .max();

    let next = match max {
        None => FIRST_SEQUENCE as u32,
        Some(max) => (max as u32 / 2 + 1) * 2,
    };

    if next > ceiling as u32 {
        return Err(SequenceExhausted { year, ceiling });
    }

    MembershipNumber::new(year, next as u16).map_err(|_| SequenceExhausted { year, ceiling })
}

/// Tjänst för att registrera medlemmar och hantera medlemsnummer
pub struct MembershipService<'a> {
    db: &'a Database,
    ceiling: u16,
}

impl<'a> MembershipService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            ceiling: SEQUENCE_CEILING,
        }
    }

    pub fn with_ceiling(db: &'a Database, ceiling: u16) -> Self {
        Self { db, ceiling }
    }

    /// Registrera en ny medlem.
    ///
    /// Saknar medlemmen nummer tilldelas ett inom samma skrivtransaktion som
    /// raden skapas i. Ett medskickat nummer godtas om det är välformat,
    /// hör till inträdesåret och inte redan används i kyrkan.
    pub fn create_member(&self, member: &mut Member) -> AppResult<MembershipNumber> {
        self.create_member_on(member, Utc::now().date_naive())
    }

    /// Som `create_member` men med ett givet dagens datum (år när
    /// inträdesdatum saknas)
    pub fn create_member_on(&self, member: &mut Member, today: NaiveDate) -> AppResult<MembershipNumber> {
        member.validate()?;
        let year = member.admission_year(today);
        if !(1000..=9999).contains(&year) {
            return Err(AppError::constraint(format!(
                "Inträdesåret {} ryms inte i ett medlemsnummer",
                year
            )));
        }

        let (id, number) = self.db.with_transaction(|tx| {
            if ChurchRepository::find_by_id_in(tx, member.church_id)?.is_none() {
                return Err(AppError::not_found(format!("Kyrka med ID {}", member.church_id)));
            }

            let number = match member.membership_number {
                Some(supplied) => {
                    if supplied.year() != year {
                        return Err(AppError::constraint(format!(
                            "Medlemsnummer {} hör inte till inträdesåret {}",
                            supplied, year
                        )));
                    }
                    if MemberRepository::number_taken_in(tx, member.church_id, &supplied, None)? {
                        return Err(AppError::constraint(format!(
                            "Medlemsnummer {} används redan i kyrkan",
                            supplied
                        )));
                    }
                    debug!("Använder angivet medlemsnummer {}", supplied);
                    supplied
                }
                None => {
                    let existing = MemberRepository::numbers_for_year_in(tx, member.church_id, year)?;
                    allocate(&existing, year, self.ceiling)?
                }
            };

            let mut row = member.clone();
            row.membership_number = Some(number);
            let id = MemberRepository::insert_in(tx, &row)?;
            Ok((id, number))
        })?;

        member.id = Some(id);
        member.membership_number = Some(number);

        info!(
            "Registrerade medlem {} ({}) med nummer {}",
            member.full_name(),
            id,
            number
        );
        Ok(number)
    }

    /// Manuell ändring av medlemsnummer (administrativ åtgärd)
    pub fn set_membership_number(&self, member_id: i64, number: MembershipNumber) -> AppResult<()> {
        self.db.with_transaction(|tx| {
            let member = MemberRepository::find_by_id_in(tx, member_id)?
                .ok_or_else(|| AppError::not_found(format!("Medlem med ID {}", member_id)))?;

            if MemberRepository::number_taken_in(tx, member.church_id, &number, Some(member_id))? {
                return Err(AppError::constraint(format!(
                    "Medlemsnummer {} används redan i kyrkan",
                    number
                )));
            }

            MemberRepository::set_membership_number_in(tx, member_id, &number)
        })?;

        info!("Medlemsnummer för {} satt till {}", member_id, number);
        Ok(())
    }

    /// Uppdatera en befintlig medlem.
    ///
    /// Medlemsnumret följer med vid byte av kyrka och får då inte redan
    /// användas i den nya kyrkan.
    pub fn update_member(&self, member: &Member) -> AppResult<()> {
        let id = member
            .id
            .ok_or_else(|| AppError::validation("Medlem har inget ID"))?;

        self.db.with_transaction(|tx| {
            let stored = MemberRepository::find_by_id_in(tx, id)?
                .ok_or_else(|| AppError::not_found(format!("Medlem med ID {}", id)))?;

            if stored.church_id != member.church_id {
                if ChurchRepository::find_by_id_in(tx, member.church_id)?.is_none() {
                    return Err(AppError::not_found(format!("Kyrka med ID {}", member.church_id)));
                }
                if let Some(number) = stored.membership_number {
                    if MemberRepository::number_taken_in(tx, member.church_id, &number, Some(id))? {
                        return Err(AppError::constraint(format!(
                            "Medlemsnummer {} används redan i kyrka {}",
                            number, member.church_id
                        )));
                    }
                }
            }

            MemberRepository::update_in(tx, member)
        })?;

        info!("Uppdaterade medlem {} ({})", member.full_name(), id);
        Ok(())
    }
}
