//! Churchlib - medlemsregister för kyrkor och församlingar
//!
//! Kärnan består av tre delar ovanpå en SQLite-databas:
//! tilldelning av medlemsnummer, familjerelationer med spegelkanter och
//! tvånivåhierarkin mellan kyrkor och församlingar.

pub mod db;
pub mod models;
pub mod services;
pub mod utils;

// Re-exports
pub use db::Database;
pub use models::*;
pub use utils::error::{AppError, AppResult};
