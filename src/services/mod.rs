//! Tjänster för Churchlib
//!
//! Innehåller affärsreglerna: medlemsnummer, familjerelationer och
//! kyrkohierarkin, samt export.

pub mod export;
pub mod family;
pub mod hierarchy;
pub mod membership;

pub use export::{ExportFormat, ExportResult, ExportService, ReportType};
pub use family::FamilyService;
pub use hierarchy::{check_shape, HierarchyService};
pub use membership::{allocate, MembershipService, SequenceExhausted, SEQUENCE_CEILING};
