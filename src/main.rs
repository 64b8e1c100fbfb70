//! Churchlib - Entry Point
//!
//! Kommandoradsgränssnitt mot medlemsregistret.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use churchlib::db::MemberFilter;
use churchlib::models::{
    Church, ChurchPatch, ChurchType, FamilyRelationship, Gender, Member, MembershipNumber, Pastor,
    RelationshipType, Settings,
};
use churchlib::services::{
    ExportFormat, ExportService, FamilyService, HierarchyService, MembershipService, ReportType,
};
use churchlib::utils::date::parse_date;
use churchlib::utils::path::get_extension;
use churchlib::Database;

#[derive(Parser)]
#[command(name = "churchlib", version, about = "Medlemsregister för kyrkor och församlingar")]
struct Cli {
    /// Sökväg till config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Sökväg till databasen (går före config.toml)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Kyrkor och församlingar
    #[command(subcommand)]
    Church(ChurchCommand),
    /// Medlemmar
    #[command(subcommand)]
    Member(MemberCommand),
    /// Familjerelationer
    #[command(subcommand)]
    Family(FamilyCommand),
    /// Pastorer
    #[command(subcommand)]
    Pastor(PastorCommand),
    /// Exportera rapport
    Export {
        #[arg(long, value_enum)]
        report: ReportArg,
        /// Standard: från utfilens ändelse, annars json
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
        /// Utfil (standard: genererat namn i exportkatalogen)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ChurchCommand {
    Add(ChurchArgs),
    /// Ändra angivna fält, övriga lämnas orörda
    Update {
        id: i64,
        #[command(flatten)]
        fields: ChurchUpdateArgs,
    },
    Delete { id: i64 },
    List {
        /// Bara självständiga kyrkor
        #[arg(long)]
        independent: bool,
    },
    Congregations { id: i64 },
    Orphans,
}

#[derive(Args)]
struct ChurchArgs {
    #[arg(long)]
    name: String,
    #[arg(long = "type", value_enum, default_value = "church")]
    church_type: ChurchTypeArg,
    #[arg(long)]
    parent: Option<i64>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

#[derive(Args)]
struct ChurchUpdateArgs {
    #[arg(long)]
    name: Option<String>,
    /// Byte till `church` tar bort moderkyrkan om ingen ny anges
    #[arg(long = "type", value_enum)]
    church_type: Option<ChurchTypeArg>,
    #[arg(long)]
    parent: Option<i64>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long)]
    address: Option<String>,
}

impl From<ChurchUpdateArgs> for ChurchPatch {
    fn from(args: ChurchUpdateArgs) -> Self {
        Self {
            name: args.name,
            church_type: args.church_type.map(ChurchType::from),
            parent_church_id: args.parent,
            city: args.city,
            address: args.address,
        }
    }
}

#[derive(Subcommand)]
enum MemberCommand {
    Add(MemberArgs),
    Show { id: i64 },
    /// Uppdatera uppgifter (medlemsnumret ändras med set-number)
    Update {
        id: i64,
        #[command(flatten)]
        fields: MemberUpdateArgs,
    },
    List {
        #[arg(long)]
        church: Option<i64>,
        #[arg(long, default_value = "")]
        query: String,
    },
    /// Sätt medlemsnummer manuellt
    SetNumber { id: i64, number: String },
    Delete { id: i64 },
}

#[derive(Args)]
struct MemberArgs {
    #[arg(long)]
    church: i64,
    #[arg(long)]
    firstname: String,
    #[arg(long)]
    surname: Option<String>,
    #[arg(long)]
    national_id: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, value_enum)]
    gender: Option<GenderArg>,
    #[arg(long)]
    birth_date: Option<String>,
    #[arg(long)]
    admission_date: Option<String>,
    /// Befintligt medlemsnummer (import)
    #[arg(long)]
    number: Option<String>,
}

#[derive(Args)]
struct MemberUpdateArgs {
    #[arg(long)]
    church: Option<i64>,
    #[arg(long)]
    firstname: Option<String>,
    #[arg(long)]
    surname: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, value_enum)]
    gender: Option<GenderArg>,
    #[arg(long)]
    active: Option<bool>,
    #[arg(long)]
    disciplined: Option<bool>,
    #[arg(long)]
    pending_transfer: Option<bool>,
}

#[derive(Subcommand)]
enum FamilyCommand {
    /// Skapa relation och spegelrelation
    Add {
        member: i64,
        related: i64,
        #[arg(value_enum)]
        relationship: RelationshipArg,
    },
    /// Lägg in en enstaka relation utan spegel
    Import {
        member: i64,
        related: i64,
        #[arg(value_enum)]
        relationship: RelationshipArg,
    },
    Remove { edge_id: i64 },
    Show { member: i64 },
}

#[derive(Subcommand)]
enum PastorCommand {
    Add {
        #[arg(long)]
        firstname: String,
        #[arg(long)]
        surname: Option<String>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        ordained: Option<String>,
    },
    List,
    /// Koppla pastor till kyrka
    Assign {
        church: i64,
        /// Utelämna för att koppla bort pastorn
        #[arg(long)]
        pastor: Option<i64>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ChurchTypeArg {
    Church,
    Congregation,
    PresbyterialCongregation,
    PreachingPoint,
}

impl From<ChurchTypeArg> for ChurchType {
    fn from(arg: ChurchTypeArg) -> Self {
        match arg {
            ChurchTypeArg::Church => ChurchType::Church,
            ChurchTypeArg::Congregation => ChurchType::Congregation,
            ChurchTypeArg::PresbyterialCongregation => ChurchType::PresbyterialCongregation,
            ChurchTypeArg::PreachingPoint => ChurchType::PreachingPoint,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum GenderArg {
    M,
    F,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::M => Gender::Male,
            GenderArg::F => Gender::Female,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum RelationshipArg {
    Father,
    Mother,
    Spouse,
    Sibling,
    Child,
}

impl From<RelationshipArg> for RelationshipType {
    fn from(arg: RelationshipArg) -> Self {
        match arg {
            RelationshipArg::Father => RelationshipType::Father,
            RelationshipArg::Mother => RelationshipType::Mother,
            RelationshipArg::Spouse => RelationshipType::Spouse,
            RelationshipArg::Sibling => RelationshipType::Sibling,
            RelationshipArg::Child => RelationshipType::Child,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportArg {
    Members,
    Churches,
    Statistics,
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Csv,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Kunde inte läsa {}", path.display()))?,
        None => Settings::load(),
    };
    if let Some(database) = &cli.database {
        settings.database_path = database.clone();
    }

    // Initiera logging
    tracing_subscriber::fmt()
        .with_max_level(settings.tracing_level())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Startar Churchlib v{}", env!("CARGO_PKG_VERSION"));

    let db = Database::open(&settings.database_path)
        .with_context(|| format!("Kunde inte öppna {}", settings.database_path.display()))?;
    db.migrate().context("Databasmigrering misslyckades")?;

    match cli.command {
        Command::Church(cmd) => run_church(&db, cmd),
        Command::Member(cmd) => run_member(&db, cmd),
        Command::Family(cmd) => run_family(&db, cmd),
        Command::Pastor(cmd) => run_pastor(&db, cmd),
        Command::Export {
            report,
            format,
            output,
        } => run_export(&db, &settings, report, format, output),
    }
}

fn optional_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>> {
    match value {
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| anyhow!("Ogiltigt datum för {}: {}", field, s)),
        None => Ok(None),
    }
}

fn print_church(church: &Church) {
    let parent = church
        .parent_church_id
        .map(|p| format!(" under {}", p))
        .unwrap_or_default();
    println!(
        "{:>5}  {} [{}]{}",
        church.id.unwrap_or(0),
        church.name,
        church.church_type.label(),
        parent
    );
}

fn run_church(db: &Database, cmd: ChurchCommand) -> Result<()> {
    let service = HierarchyService::new(db);

    match cmd {
        ChurchCommand::Add(args) => {
            let mut church = church_from_args(args);
            let id = service.create_church(&mut church)?;
            println!("Skapade {} ({})", church.name, id);
        }
        ChurchCommand::Update { id, fields } => {
            let church = service.patch_church(id, &fields.into())?;
            println!("Uppdaterade {} ({}) [{}]", church.name, id, church.church_type.label());
        }
        ChurchCommand::Delete { id } => {
            service.delete_church(id)?;
            println!("Kyrka {} borttagen", id);
        }
        ChurchCommand::List { independent } => {
            let churches = if independent {
                db.churches().find_independent()?
            } else {
                db.churches().find_all()?
            };
            for church in &churches {
                print_church(church);
            }
        }
        ChurchCommand::Congregations { id } => {
            let congregations = service.get_congregations(id)?;
            println!(
                "{} församlingar (kan tas bort: {})",
                congregations.len(),
                if service.can_delete_church(id)? { "ja" } else { "nej" }
            );
            for church in &congregations {
                print_church(church);
            }
        }
        ChurchCommand::Orphans => {
            for church in service.find_orphaned_congregations()? {
                print_church(&church);
            }
        }
    }

    Ok(())
}

fn church_from_args(args: ChurchArgs) -> Church {
    let church_type: ChurchType = args.church_type.into();
    let mut church = Church::independent(args.name);
    church.church_type = church_type;
    church.parent_church_id = args.parent;
    church.city = args.city;
    church.address = args.address;
    church
}

fn run_member(db: &Database, cmd: MemberCommand) -> Result<()> {
    match cmd {
        MemberCommand::Add(args) => {
            let mut member = Member::new(args.church, args.firstname, args.surname);
            member.national_id = args.national_id;
            member.email = args.email;
            member.phone = args.phone;
            member.gender = args.gender.map(Gender::from);
            member.birth_date = optional_date(args.birth_date.as_deref(), "födelsedatum")?;
            member.admission_date = optional_date(args.admission_date.as_deref(), "inträdesdatum")?;
            member.membership_number = args
                .number
                .as_deref()
                .map(str::parse::<MembershipNumber>)
                .transpose()?;

            let number = MembershipService::new(db).create_member(&mut member)?;
            println!(
                "Registrerade {} ({}) med medlemsnummer {}",
                member.full_name(),
                member.id.unwrap_or(0),
                number
            );
        }
        MemberCommand::Show { id } => {
            let member = db
                .members()
                .find_by_id(id)?
                .ok_or_else(|| anyhow!("Medlem med ID {} hittades inte", id))?;
            println!("{}", serde_json::to_string_pretty(&member)?);
        }
        MemberCommand::Update { id, fields } => {
            let mut member = db
                .members()
                .find_by_id(id)?
                .ok_or_else(|| anyhow!("Medlem med ID {} hittades inte", id))?;
            if let Some(church) = fields.church {
                member.church_id = church;
            }
            if let Some(firstname) = fields.firstname {
                member.firstname = firstname;
            }
            if fields.surname.is_some() {
                member.surname = fields.surname;
            }
            if fields.email.is_some() {
                member.email = fields.email;
            }
            if fields.phone.is_some() {
                member.phone = fields.phone;
            }
            if let Some(gender) = fields.gender {
                member.gender = Some(gender.into());
            }
            if let Some(active) = fields.active {
                member.active = active;
            }
            if let Some(disciplined) = fields.disciplined {
                member.disciplined = disciplined;
            }
            if let Some(pending) = fields.pending_transfer {
                member.pending_transfer = pending;
            }

            MembershipService::new(db).update_member(&member)?;
            println!("Uppdaterade {} ({})", member.full_name(), member.status().display_name());
        }
        MemberCommand::List { church, query } => {
            let filter = MemberFilter {
                query,
                church_id: church,
                ..Default::default()
            };
            for member in db.members().search(&filter)? {
                println!(
                    "{:>5}  {}  {} ({})",
                    member.id.unwrap_or(0),
                    member
                        .membership_number
                        .map(|n| n.to_string())
                        .unwrap_or_else(|| "--------".into()),
                    member.full_name(),
                    member.status().display_name()
                );
            }
        }
        MemberCommand::SetNumber { id, number } => {
            let number: MembershipNumber = number.parse()?;
            MembershipService::new(db).set_membership_number(id, number)?;
            println!("Medlem {} har nu nummer {}", id, number);
        }
        MemberCommand::Delete { id } => {
            db.members().delete(id)?;
            println!("Medlem {} borttagen", id);
        }
    }

    Ok(())
}

fn run_family(db: &Database, cmd: FamilyCommand) -> Result<()> {
    let service = FamilyService::new(db);

    match cmd {
        FamilyCommand::Add {
            member,
            related,
            relationship,
        } => {
            let pair = service.add_relationship(member, related, relationship.into())?;
            match pair.mirror_edge_id {
                Some(mirror) => println!("Skapade relation {} och spegel {}", pair.edge_id, mirror),
                None => println!("Skapade relation {} (spegeln fanns redan)", pair.edge_id),
            }
        }
        FamilyCommand::Import {
            member,
            related,
            relationship,
        } => {
            let mut edge = FamilyRelationship::new(member, related, relationship.into());
            let id = service.import_relationship(&mut edge)?;
            println!("Importerade relation {}", id);
        }
        FamilyCommand::Remove { edge_id } => {
            service.remove_relationship(edge_id)?;
            println!("Relation {} borttagen", edge_id);
        }
        FamilyCommand::Show { member } => {
            for view in service.get_family(member)? {
                println!(
                    "{:>5}  {:<10} {} ({})",
                    view.relationship_id,
                    view.relationship_type.display_name(),
                    view.related_member.full_name,
                    view.related_member.id
                );
            }
        }
    }

    Ok(())
}

fn run_pastor(db: &Database, cmd: PastorCommand) -> Result<()> {
    match cmd {
        PastorCommand::Add {
            firstname,
            surname,
            title,
            email,
            phone,
            ordained,
        } => {
            let mut pastor = Pastor::new(firstname, surname);
            pastor.title = title;
            pastor.email = email;
            pastor.phone = phone;
            pastor.ordination_date = optional_date(ordained.as_deref(), "ordinationsdatum")?;
            let id = db.pastors().create(&mut pastor)?;
            println!("Skapade pastor {} ({})", pastor.display_name(), id);
        }
        PastorCommand::List => {
            for pastor in db.pastors().find_all()? {
                println!("{:>5}  {}", pastor.id.unwrap_or(0), pastor.display_name());
            }
        }
        PastorCommand::Assign { church, pastor } => {
            HierarchyService::new(db).assign_pastor(church, pastor)?;
            match pastor {
                Some(pastor) => println!("Pastor {} kopplad till kyrka {}", pastor, church),
                None => println!("Pastor bortkopplad från kyrka {}", church),
            }
        }
    }

    Ok(())
}

fn run_export(
    db: &Database,
    settings: &Settings,
    report: ReportArg,
    format: Option<FormatArg>,
    output: Option<PathBuf>,
) -> Result<()> {
    let report_type = match report {
        ReportArg::Members => ReportType::Members,
        ReportArg::Churches => ReportType::Churches,
        ReportArg::Statistics => ReportType::Statistics,
    };
    let format = match format {
        Some(FormatArg::Json) => ExportFormat::Json,
        Some(FormatArg::Csv) => ExportFormat::Csv,
        None => output
            .as_deref()
            .and_then(get_extension)
            .and_then(|ext| ExportFormat::from_extension(&ext))
            .unwrap_or(ExportFormat::Json),
    };

    let path = output.unwrap_or_else(|| {
        settings
            .export_directory
            .join(ExportService::generate_filename(report_type, format))
    });

    let result = ExportService::new(db).export_to_file(report_type, format, &path)?;
    println!("{} -> {}", result.summary(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_church_update_only_sets_given_fields() {
        let cli = Cli::try_parse_from(["churchlib", "church", "update", "2", "--name", "Norra fors"])
            .unwrap();
        let Command::Church(ChurchCommand::Update { id, fields }) = cli.command else {
            panic!("fel kommando");
        };
        assert_eq!(id, 2);

        let patch: ChurchPatch = fields.into();
        assert_eq!(patch.name.as_deref(), Some("Norra fors"));
        assert!(patch.church_type.is_none());
        assert!(patch.parent_church_id.is_none());
        assert!(patch.city.is_none());
    }
}
