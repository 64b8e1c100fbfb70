pub mod schema;
pub mod migrations;
pub mod church_repo;
pub mod member_repo;
pub mod pastor_repo;
pub mod relationship_repo;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::utils::error::{AppError, AppResult};

pub use church_repo::ChurchRepository;
pub use member_repo::{MemberFilter, MemberRepository};
pub use pastor_repo::PastorRepository;
pub use relationship_repo::RelationshipRepository;

/// Lås den delade anslutningen; ett förgiftat lås blir ett fel
pub(crate) fn lock(conn: &Mutex<Connection>) -> AppResult<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| AppError::other("Databasanslutningen är låst av en kraschad tråd"))
}

/// Huvuddatabas-wrapper med thread-safe access
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Öppna eller skapa databas
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "
        )?;

        tracing::debug!("Öppnade databas {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Öppna in-memory databas (för tester)
    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.migrate()?;
        Ok(db)
    }

    /// Kör databasmigrationer
    pub fn migrate(&self) -> AppResult<()> {
        let conn = lock(&self.conn)?;
        migrations::run_migrations(&conn)
    }

    /// Hämta kyrko-repository
    pub fn churches(&self) -> ChurchRepository {
        ChurchRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta medlems-repository
    pub fn members(&self) -> MemberRepository {
        MemberRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta relations-repository
    pub fn relationships(&self) -> RelationshipRepository {
        RelationshipRepository::new(Arc::clone(&self.conn))
    }

    /// Hämta pastors-repository
    pub fn pastors(&self) -> PastorRepository {
        PastorRepository::new(Arc::clone(&self.conn))
    }

    /// Direkt tillgång till connection (för avancerade operationer)
    pub fn with_connection<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = lock(&self.conn)?;
        f(&conn)
    }

    /// Kör `f` i en skrivtransaktion (`BEGIN IMMEDIATE`).
    ///
    /// Skrivlåset tas innan första läsningen, så läs-sedan-skriv inne i `f`
    /// serialiseras även mot andra anslutningar till samma fil. Vid fel
    /// rullas allt tillbaka.
    pub fn with_transaction<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T>,
    {
        let mut conn = lock(&self.conn)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let db = Database::open_in_memory().unwrap();

        let result: AppResult<()> = db.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO churches (name, church_type) VALUES ('Centrumkyrkan', 'church')",
                [],
            )?;
            Err(AppError::other("avbryt"))
        });
        assert!(result.is_err());

        let count: i64 = db
            .with_connection(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM churches", [], |row| row.get(0))?)
            })
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("kyrka.db");

        let db = Database::open(&path).unwrap();
        db.migrate().unwrap();

        assert!(path.exists());
    }
}
