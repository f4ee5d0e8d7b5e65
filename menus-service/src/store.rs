use std::sync::Arc;

use diesel::{connection::SimpleConnection, Connection, SqliteConnection};
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

pub const IN_MEMORY: &str = ":memory:";

pub type DbConnection = SyncConnectionWrapper<SqliteConnection>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} {key} not found")]
    NotFound { entity: &'static str, key: String },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("store unavailable: {0}")]
    Unavailable(#[from] diesel::ConnectionError),
    #[error("migration failed: {0}")]
    Migration(String),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Process-wide handle on the single SQLite connection.
///
/// Every operation locks the connection for its duration, so concurrent
/// callers are serialized through one physical store.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<DbConnection>>,
}

impl Store {
    pub fn open(database_url: &str) -> Result<Self, StoreError> {
        let mut conn = SqliteConnection::establish(database_url)?;
        conn.batch_execute("PRAGMA foreign_keys = ON")?;
        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|err| StoreError::Migration(err.to_string()))?;
        info!(database_url, migrations = applied.len(), "store opened");

        Ok(Self {
            conn: Arc::new(Mutex::new(SyncConnectionWrapper::new(conn))),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open(IN_MEMORY)
    }

    pub async fn connection(&self) -> MutexGuard<'_, DbConnection> {
        self.conn.lock().await
    }

    pub fn close(self) {
        if Arc::strong_count(&self.conn) > 1 {
            debug!("store still shared, connection closes with the last handle");
        }
        drop(self.conn);
        info!("store closed");
    }
}
