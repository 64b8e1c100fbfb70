//! Export-tjänst för medlemsregister och kyrkohierarki (JSON, CSV)

use chrono::Utc;
use serde::Serialize;
use std::path::Path;

use crate::db::Database;
use crate::models::{Church, Member};
use crate::utils::error::{AppError, AppResult};

/// Exportformat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }
}

/// Typ av rapport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportType {
    /// Medlemsregister
    Members,
    /// Kyrkor och församlingar
    Churches,
    /// Statistiksammanfattning
    Statistics,
}

impl ReportType {
    pub fn display_name(&self) -> &'static str {
        match self {
            ReportType::Members => "Medlemsregister",
            ReportType::Churches => "Kyrkor",
            ReportType::Statistics => "Statistik",
        }
    }

    pub fn filename_prefix(&self) -> &'static str {
        match self {
            ReportType::Members => "medlemmar",
            ReportType::Churches => "kyrkor",
            ReportType::Statistics => "statistik",
        }
    }
}

/// Exporterbar medlemsdata
#[derive(Debug, Serialize)]
pub struct MemberExport {
    pub id: i64,
    pub church_id: i64,
    pub church_name: String,
    pub membership_number: Option<String>,
    pub full_name: String,
    pub national_id: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub admission_date: Option<String>,
    pub status: String,
}

impl MemberExport {
    fn new(m: &Member, church_name: &str) -> Self {
        Self {
            id: m.id.unwrap_or(0),
            church_id: m.church_id,
            church_name: church_name.to_string(),
            membership_number: m.membership_number.map(|n| n.to_string()),
            full_name: m.full_name(),
            national_id: m.national_id.clone(),
            email: m.email.clone(),
            phone: m.phone.clone(),
            admission_date: m.admission_date.map(|d| d.format("%Y-%m-%d").to_string()),
            status: m.status().display_name().to_string(),
        }
    }
}

/// Exporterbar kyrkodata
#[derive(Debug, Serialize)]
pub struct ChurchExport {
    pub id: i64,
    pub name: String,
    pub church_type: String,
    pub parent_church_id: Option<i64>,
    pub parent_name: Option<String>,
    pub city: Option<String>,
    pub member_count: usize,
}

/// Statistikexport
#[derive(Debug, Serialize)]
pub struct StatisticsExport {
    pub generated_at: String,
    pub total_churches: i64,
    pub churches_by_type: Vec<LabelCount>,
    pub total_members: i64,
    pub members_by_status: Vec<LabelCount>,
    pub total_pastors: i64,
    pub total_relationships: i64,
    pub relationships_by_type: Vec<LabelCount>,
}

#[derive(Debug, Serialize)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

/// Resultat av export
#[derive(Debug)]
pub struct ExportResult {
    pub report_type: ReportType,
    pub format: ExportFormat,
    pub row_count: usize,
    pub file_size: usize,
}

impl ExportResult {
    pub fn summary(&self) -> String {
        format!(
            "{} exporterad: {} rader, {} bytes",
            self.report_type.display_name(),
            self.row_count,
            self.file_size
        )
    }
}

/// Export-tjänst
pub struct ExportService<'a> {
    db: &'a Database,
}

impl<'a> ExportService<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Generera filnamn för export
    pub fn generate_filename(report_type: ReportType, format: ExportFormat) -> String {
        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        format!(
            "churchlib_{}_{}.{}",
            report_type.filename_prefix(),
            timestamp,
            format.extension()
        )
    }

    /// Exportera rapport till fil
    pub fn export_to_file(
        &self,
        report_type: ReportType,
        format: ExportFormat,
        path: &Path,
    ) -> AppResult<ExportResult> {
        let (content, row_count) = self.render(report_type, format)?;
        std::fs::write(path, &content)?;

        tracing::info!("Exporterade {} till {}", report_type.display_name(), path.display());

        Ok(ExportResult {
            report_type,
            format,
            row_count,
            file_size: content.len(),
        })
    }

    /// Rendera rapport till sträng, returnerar innehåll och antal rader
    pub fn render(&self, report_type: ReportType, format: ExportFormat) -> AppResult<(String, usize)> {
        match report_type {
            ReportType::Members => {
                let rows = self.member_rows()?;
                let content = match format {
                    ExportFormat::Json => to_json(&rows)?,
                    ExportFormat::Csv => Self::members_csv(&rows),
                };
                Ok((content, rows.len()))
            }
            ReportType::Churches => {
                let rows = self.church_rows()?;
                let content = match format {
                    ExportFormat::Json => to_json(&rows)?,
                    ExportFormat::Csv => Self::churches_csv(&rows),
                };
                Ok((content, rows.len()))
            }
            ReportType::Statistics => {
                let stats = self.statistics()?;
                let content = match format {
                    ExportFormat::Json => to_json(&stats)?,
                    ExportFormat::Csv => Self::statistics_csv(&stats),
                };
                Ok((content, 1))
            }
        }
    }

    /// Sammanställ statistik
    pub fn statistics(&self) -> AppResult<StatisticsExport> {
        let members = self.db.members().find_all()?;

        let members_by_status = crate::models::MemberStatus::all()
            .iter()
            .map(|status| LabelCount {
                label: status.display_name().to_string(),
                count: members.iter().filter(|m| m.status() == *status).count() as i64,
            })
            .collect();

        let churches_by_type = self
            .db
            .churches()
            .count_by_type()?
            .into_iter()
            .map(|(t, count)| LabelCount {
                label: t.label().to_string(),
                count,
            })
            .collect();

        let relationships_by_type = self
            .db
            .relationships()
            .count_by_type()?
            .into_iter()
            .map(|(t, count)| LabelCount {
                label: t.display_name().to_string(),
                count,
            })
            .collect();

        Ok(StatisticsExport {
            generated_at: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_churches: self.db.churches().count()?,
            churches_by_type,
            total_members: members.len() as i64,
            members_by_status,
            total_pastors: self.db.pastors().count()?,
            total_relationships: self.db.relationships().count()?,
            relationships_by_type,
        })
    }

    fn member_rows(&self) -> AppResult<Vec<MemberExport>> {
        let churches = self.db.churches().find_all()?;
        let members = self.db.members().find_all()?;

        Ok(members
            .iter()
            .map(|m| MemberExport::new(m, church_name(&churches, Some(m.church_id)).unwrap_or("")))
            .collect())
    }

    fn church_rows(&self) -> AppResult<Vec<ChurchExport>> {
        let churches = self.db.churches().find_all()?;
        let members = self.db.members().find_all()?;

        Ok(churches
            .iter()
            .map(|c| {
                let id = c.id.unwrap_or(0);
                ChurchExport {
                    id,
                    name: c.name.clone(),
                    church_type: c.church_type.label().to_string(),
                    parent_church_id: c.parent_church_id,
                    parent_name: church_name(&churches, c.parent_church_id).map(str::to_string),
                    city: c.city.clone(),
                    member_count: members.iter().filter(|m| m.church_id == id).count(),
                }
            })
            .collect())
    }

    fn members_csv(rows: &[MemberExport]) -> String {
        let mut csv = String::from(
            "ID,Kyrka,Medlemsnummer,Namn,Personnummer,E-post,Telefon,Inträdesdatum,Status\n",
        );

        for r in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{}\n",
                r.id,
                Self::csv_escape(&r.church_name),
                r.membership_number.as_deref().unwrap_or(""),
                Self::csv_escape(&r.full_name),
                Self::csv_escape(r.national_id.as_deref().unwrap_or("")),
                Self::csv_escape(r.email.as_deref().unwrap_or("")),
                Self::csv_escape(r.phone.as_deref().unwrap_or("")),
                r.admission_date.as_deref().unwrap_or(""),
                Self::csv_escape(&r.status),
            ));
        }

        csv
    }

    fn churches_csv(rows: &[ChurchExport]) -> String {
        let mut csv = String::from("ID,Namn,Typ,Moderkyrka,Ort,Medlemmar\n");

        for r in rows {
            csv.push_str(&format!(
                "{},{},{},{},{},{}\n",
                r.id,
                Self::csv_escape(&r.name),
                Self::csv_escape(&r.church_type),
                Self::csv_escape(r.parent_name.as_deref().unwrap_or("")),
                Self::csv_escape(r.city.as_deref().unwrap_or("")),
                r.member_count,
            ));
        }

        csv
    }

    fn statistics_csv(stats: &StatisticsExport) -> String {
        let mut csv = String::from("Kategori,Värde,Antal\n");
        csv.push_str(&format!("Kyrkor,Totalt,{}\n", stats.total_churches));
        for c in &stats.churches_by_type {
            csv.push_str(&format!("Kyrkor,{},{}\n", Self::csv_escape(&c.label), c.count));
        }
        csv.push_str(&format!("Medlemmar,Totalt,{}\n", stats.total_members));
        for c in &stats.members_by_status {
            csv.push_str(&format!("Medlemmar,{},{}\n", Self::csv_escape(&c.label), c.count));
        }
        csv.push_str(&format!("Pastorer,Totalt,{}\n", stats.total_pastors));
        csv.push_str(&format!("Relationer,Totalt,{}\n", stats.total_relationships));
        for c in &stats.relationships_by_type {
            csv.push_str(&format!("Relationer,{},{}\n", Self::csv_escape(&c.label), c.count));
        }
        csv
    }

    /// Escape:a CSV-fält
    fn csv_escape(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

fn church_name(churches: &[Church], id: Option<i64>) -> Option<&str> {
    let id = id?;
    churches
        .iter()
        .find(|c| c.id == Some(id))
        .map(|c| c.name.as_str())
}

fn to_json<T: Serialize>(value: &T) -> AppResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| AppError::other(format!("JSON-fel: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChurchType, RelationshipType};
    use crate::services::{FamilyService, HierarchyService, MembershipService};
    use chrono::NaiveDate;

    fn populated_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let hierarchy = HierarchyService::new(&db);
        let parent = hierarchy
            .create_church(&mut Church::independent("Centrumkyrkan"))
            .unwrap();
        let congregation = hierarchy
            .create_church(&mut Church::dependent("Norra, annex", ChurchType::Congregation, parent))
            .unwrap();

        let membership = MembershipService::new(&db);
        let mut anna = Member::new(parent, "Anna", Some("Lind".into()));
        anna.admission_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        membership.create_member(&mut anna).unwrap();
        let mut per = Member::new(congregation, "Per", Some("Lind".into()));
        per.admission_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        per.active = false;
        membership.create_member(&mut per).unwrap();

        FamilyService::new(&db)
            .add_relationship(anna.id.unwrap(), per.id.unwrap(), RelationshipType::Spouse)
            .unwrap();
        db
    }

    #[test]
    fn test_csv_escape() {
        assert_eq!(ExportService::csv_escape("hello"), "hello");
        assert_eq!(ExportService::csv_escape("hello,world"), "\"hello,world\"");
        assert_eq!(
            ExportService::csv_escape("say \"hello\""),
            "\"say \"\"hello\"\"\""
        );
    }

    #[test]
    fn test_generate_filename() {
        let filename = ExportService::generate_filename(ReportType::Members, ExportFormat::Json);
        assert!(filename.starts_with("churchlib_medlemmar_"));
        assert!(filename.ends_with(".json"));
    }

    #[test]
    fn test_members_csv() {
        let db = populated_db();
        let (csv, rows) = ExportService::new(&db)
            .render(ReportType::Members, ExportFormat::Csv)
            .unwrap();

        assert_eq!(rows, 2);
        assert!(csv.contains("Centrumkyrkan,20240002,Anna Lind"));
        assert!(csv.contains("\"Norra, annex\",20240002,Per Lind"));
        assert!(csv.contains("Inaktiv"));
    }

    #[test]
    fn test_churches_json() {
        let db = populated_db();
        let (json, rows) = ExportService::new(&db)
            .render(ReportType::Churches, ExportFormat::Json)
            .unwrap();
        assert_eq!(rows, 2);

        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], "Centrumkyrkan");
        assert_eq!(parsed[1]["parent_name"], "Centrumkyrkan");
        assert_eq!(parsed[1]["member_count"], 1);
    }

    #[test]
    fn test_statistics() {
        let db = populated_db();
        let stats = ExportService::new(&db).statistics().unwrap();

        assert_eq!(stats.total_churches, 2);
        assert_eq!(stats.total_members, 2);
        assert_eq!(stats.total_relationships, 2);
        let spouses = stats
            .relationships_by_type
            .iter()
            .find(|c| c.label == RelationshipType::Spouse.display_name())
            .unwrap();
        assert_eq!(spouses.count, 2);
    }

    #[test]
    fn test_export_to_file() {
        let db = populated_db();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stat.json");

        let result = ExportService::new(&db)
            .export_to_file(ReportType::Statistics, ExportFormat::Json, &path)
            .unwrap();

        assert_eq!(result.row_count, 1);
        assert_eq!(result.file_size as u64, std::fs::metadata(&path).unwrap().len());
    }
}
