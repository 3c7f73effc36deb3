//! Storage Configuration
//!
//! Backend selection and storage locations, read from the environment once
//! when the facade is constructed. A `.env` file in the working directory is
//! honored but never overrides variables that are already set.

use std::path::PathBuf;

// =============================================================================
// Constants
// =============================================================================

/// Selects the backend: `db` picks the database backend, anything else the file backend
pub const STORAGE_TYPE_ENV: &str = "HBNB_TYPE_STORAGE";

/// Durable JSON file used by the file backend
pub const FILE_PATH_ENV: &str = "HBNB_FILE_PATH";

/// SQLite database file used by the database backend
pub const DB_PATH_ENV: &str = "HBNB_DB_PATH";

/// Deployment environment; `test` resets the database on construction
pub const ENVIRONMENT_ENV: &str = "HBNB_ENV";

/// Value of `HBNB_TYPE_STORAGE` that selects the database backend
pub const STORAGE_TYPE_DB: &str = "db";

/// Value of `HBNB_ENV` that drops all tables when the database backend starts
pub const ENVIRONMENT_TEST: &str = "test";

/// Default durable file for the file backend
pub const FILE_PATH_DEFAULT: &str = "file.json";

/// Default database file for the database backend
pub const DB_PATH_DEFAULT: &str = "hbnb.db";

// =============================================================================
// Types
// =============================================================================

/// Which concrete backend the facade delegates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// JSON file with an in-memory registry
    File,
    /// Relational store with a session
    Db,
}

impl BackendKind {
    /// Interpret the raw `HBNB_TYPE_STORAGE` value.
    ///
    /// Only the exact value `db` selects the database backend.
    #[must_use]
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag {
            Some(STORAGE_TYPE_DB) => Self::Db,
            _ => Self::File,
        }
    }

    /// Get string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Db => "db",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything needed to construct a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Selected backend
    pub backend: BackendKind,
    /// Durable JSON file (file backend)
    pub file_path: PathBuf,
    /// SQLite database file (database backend)
    pub db_path: PathBuf,
    /// Drop all tables when the database backend is constructed
    pub reset_database: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::File,
            file_path: PathBuf::from(FILE_PATH_DEFAULT),
            db_path: PathBuf::from(DB_PATH_DEFAULT),
            reset_database: false,
        }
    }
}

impl StorageConfig {
    /// Read configuration from the process environment (and `.env`).
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend = BackendKind::from_flag(lookup(STORAGE_TYPE_ENV).as_deref());
        let file_path = lookup(FILE_PATH_ENV)
            .map(|p| expand_path(&p))
            .unwrap_or_else(|| PathBuf::from(FILE_PATH_DEFAULT));
        let db_path = lookup(DB_PATH_ENV)
            .map(|p| expand_path(&p))
            .unwrap_or_else(|| PathBuf::from(DB_PATH_DEFAULT));
        let reset_database = lookup(ENVIRONMENT_ENV).as_deref() == Some(ENVIRONMENT_TEST);

        Self {
            backend,
            file_path,
            db_path,
            reset_database,
        }
    }

    /// File backend persisting to `path`.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::File,
            file_path: path.into(),
            ..Self::default()
        }
    }

    /// Database backend persisting to `path`.
    #[must_use]
    pub fn db(path: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendKind::Db,
            db_path: path.into(),
            ..Self::default()
        }
    }

    /// Drop all tables when the database backend starts.
    #[must_use]
    pub fn with_reset_database(mut self, reset: bool) -> Self {
        self.reset_database = reset;
        self
    }
}

fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).to_string())
}

// =============================================================================
// Tests
// =============================================================================
