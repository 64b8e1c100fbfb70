use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Pastor {
    pub id: Option<i64>,
    pub firstname: String,
    pub surname: Option<String>,
    pub title: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub ordination_date: Option<NaiveDate>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

impl Pastor {
    pub fn new(firstname: impl Into<String>, surname: Option<String>) -> Self {
        Self {
            firstname: firstname.into(),
            surname,
            ..Default::default()
        }
    }

    /// Namn med eventuell titel, t.ex. "Past. Erik Holm"
    pub fn display_name(&self) -> String {
        let name = match &self.surname {
            Some(s) if !s.is_empty() => format!("{} {}", self.firstname, s),
            _ => self.firstname.clone(),
        };
        match &self.title {
            Some(t) if !t.is_empty() => format!("{} {}", t, name),
            _ => name,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.firstname.trim().is_empty() {
            return Err("Förnamn krävs".into());
        }
        if let Some(email) = &self.email {
            if !email.contains('@') {
                return Err(format!("Ogiltig e-postadress: {}", email));
            }
        }
        Ok(())
    }
}
