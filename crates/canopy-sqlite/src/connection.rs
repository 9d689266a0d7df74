//! SQLite connection management
//!
//! One connection, shared by every store behind an `Arc<Mutex<..>>`. A
//! transaction begun through [`SqliteTransactions`] is connection state, so
//! every store call issued until commit or rollback runs inside it.

use crate::config::SqliteConfig;
use crate::error::{SqliteError, SqliteResult};
use crate::schema;
use canopy_core::storage::{StorageError, StorageResult, TransactionManager};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Thread-safe SQLite connection wrapper
#[derive(Clone)]
pub struct SqlitePool {
    conn: Arc<Mutex<Connection>>,
    config: SqliteConfig,
}

impl SqlitePool {
    /// Open the database and apply pending migrations
    pub fn new(config: SqliteConfig) -> SqliteResult<Self> {
        info!(path = ?config.path, "Opening SQLite database");

        let conn = if config.is_memory() {
            Connection::open_in_memory()?
        } else {
            if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SqliteError::Connection(format!("Failed to create directory: {}", e))
                })?;
            }
            Connection::open(&config.path)?
        };

        let pool = Self {
            conn: Arc::new(Mutex::new(conn)),
            config,
        };
        pool.initialize()?;

        Ok(pool)
    }

    /// In-memory database for tests
    pub fn memory() -> SqliteResult<Self> {
        Self::new(SqliteConfig::memory())
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Execute a closure with the connection
    pub fn with_connection<F, T>(&self, f: F) -> SqliteResult<T>
    where
        F: FnOnce(&Connection) -> SqliteResult<T>,
    {
        let conn = self.conn.lock();
        f(&conn)
    }

    /// Whether a transaction is currently open on the connection
    pub fn in_transaction(&self) -> bool {
        !self.conn.lock().is_autocommit()
    }

    fn initialize(&self) -> SqliteResult<()> {
        self.with_connection(|conn| {
            self.configure_pragmas(conn)?;
            schema::apply_migrations(conn)?;

            info!("SQLite database initialized");
            Ok(())
        })
    }

    fn configure_pragmas(&self, conn: &Connection) -> SqliteResult<()> {
        debug!("Configuring SQLite pragmas");

        if self.config.wal_mode && !self.config.is_memory() {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
            conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        }

        if self.config.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        }

        conn.execute_batch(&format!(
            "PRAGMA busy_timeout = {};",
            self.config.busy_timeout_ms
        ))?;
        conn.execute_batch(&format!("PRAGMA cache_size = {};", self.config.cache_size))?;
        conn.execute_batch("PRAGMA temp_store = MEMORY;")?;

        Ok(())
    }
}

/// Transaction boundary over the shared connection
#[derive(Clone)]
pub struct SqliteTransactions {
    pool: SqlitePool,
}

impl SqliteTransactions {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl TransactionManager for SqliteTransactions {
    fn begin(&self) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                if !conn.is_autocommit() {
                    return Err(SqliteError::InvalidOperation(
                        "a transaction is already open".to_string(),
                    ));
                }
                // Write lock is taken before the first statement
                conn.execute_batch("BEGIN IMMEDIATE;")?;
                Ok(())
            })
            .map_err(|e| StorageError::transaction(e.to_string()))
    }

    fn commit(&self) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                conn.execute_batch("COMMIT;")?;
                Ok(())
            })
            .map_err(|e| StorageError::transaction(e.to_string()))
    }

    fn rollback(&self) -> StorageResult<()> {
        self.pool
            .with_connection(|conn| {
                if conn.is_autocommit() {
                    warn!("Rollback requested without an open transaction");
                    return Ok(());
                }
                conn.execute_batch("ROLLBACK;")?;
                Ok(())
            })
            .map_err(|e| StorageError::transaction(e.to_string()))
    }
}
