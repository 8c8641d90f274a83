//! Demo database access
//!
//! Read-only query handle over the SQLite demo database. Every caller
//! borrows its own pooled connection, so parallel dispatches never share
//! a cursor.

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

pub mod query;
pub mod seed;

pub use query::{ColumnInfo, JoinOn, JoinRows, TableRows};
pub use seed::{reset_and_seed, SeedOptions, SeedSummary};

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("DATABASE UNAVAILABLE: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("QUERY FAILED: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("STORAGE IO ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("TABLE '{0}' DOES NOT EXIST")]
    TableNotFound(String),

    #[error("COLUMN '{column}' DOES NOT EXIST IN TABLE '{table}'")]
    ColumnNotFound { table: String, column: String },
}

impl StorageError {
    /// Faults caused by the caller's arguments rather than the database
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            StorageError::TableNotFound(_) | StorageError::ColumnNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Pool tuning
#[derive(Debug, Clone)]
pub struct StorageOptions {
    pub pool_size: u32,
    pub connection_timeout: Duration,
}

impl Default for StorageOptions {
    fn default() -> Self {
        Self {
            pool_size: 8,
            connection_timeout: Duration::from_secs(5),
        }
    }
}

/// Shared read-only handle to the demo database
#[derive(Clone)]
pub struct Storage {
    pool: Pool<SqliteConnectionManager>,
    path: PathBuf,
}

impl Storage {
    /// Create a handle; no connection is opened until first use
    pub fn open(path: impl AsRef<Path>, options: StorageOptions) -> Self {
        let path = path.as_ref().to_path_buf();
        let manager = SqliteConnectionManager::file(&path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX);

        let pool = Pool::builder()
            .max_size(options.pool_size.max(1))
            .min_idle(Some(0))
            .connection_timeout(options.connection_timeout)
            .build_unchecked(manager);

        debug!("◆ STORAGE HANDLE FOR {:?}", path);
        Self { pool, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Borrow a pooled connection
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage").field("path", &self.path).finish()
    }
}

/// Quote an identifier for SQL text
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
