//! Storage Facade - the process-wide backend
//!
//! Installed once with [`init`] (or [`init_from_env`]); every model
//! operation goes through here. Access is serialized by a mutex around the
//! single backend instance.

use std::sync::Mutex;

use once_cell::sync::OnceCell;

use crate::config::{BackendKind, StorageConfig};
use crate::models::Model;
use crate::storage::{
    DbStorage, FileStorage, Objects, StorageBackend, StorageError, StorageResult,
};

/// Shared backend handle
pub type SharedBackend = Mutex<Box<dyn StorageBackend>>;

/// Global storage instance
static STORAGE: OnceCell<SharedBackend> = OnceCell::new();

// =============================================================================
// Lifecycle
// =============================================================================

/// Construct the configured backend and `reload()` it, without installing it.
///
/// # Errors
/// Fails if the backend cannot be opened or its durable state cannot be read.
pub fn open(config: &StorageConfig) -> StorageResult<Box<dyn StorageBackend>> {
    let mut backend: Box<dyn StorageBackend> = match config.backend {
        BackendKind::File => Box::new(FileStorage::with_path(config.file_path.clone())),
        BackendKind::Db => Box::new(DbStorage::connect(
            config.db_path.clone(),
            config.reset_database,
        )?),
    };
    backend.reload()?;
    Ok(backend)
}

/// Install the process-wide backend.
///
/// # Errors
/// Returns `AlreadyInitialized` on a second call, or any error from [`open`].
pub fn init(config: &StorageConfig) -> StorageResult<()> {
    if STORAGE.get().is_some() {
        return Err(StorageError::AlreadyInitialized);
    }
    let backend = open(config)?;
    STORAGE
        .set(Mutex::new(backend))
        .map_err(|_| StorageError::AlreadyInitialized)?;

    tracing::info!(backend = %config.backend, "Storage initialized");
    Ok(())
}

/// [`init`] with configuration read from the environment.
///
/// # Errors
/// Same as [`init`].
pub fn init_from_env() -> StorageResult<()> {
    init(&StorageConfig::from_env())
}

/// Whether [`init`] has succeeded.
#[must_use]
pub fn is_initialized() -> bool {
    STORAGE.get().is_some()
}

/// Kind of the installed backend.
///
/// # Errors
/// `NotInitialized` before [`init`].
pub fn backend_kind() -> StorageResult<BackendKind> {
    with_storage(|storage| Ok(storage.kind()))
}

fn with_storage<T>(
    f: impl FnOnce(&mut dyn StorageBackend) -> StorageResult<T>,
) -> StorageResult<T> {
    let cell = STORAGE.get().ok_or(StorageError::NotInitialized)?;
    let mut guard = cell.lock().map_err(|_| StorageError::Poisoned)?;
    f(&mut **guard)
}

// =============================================================================
// Operations
// =============================================================================

/// See [`StorageBackend::all`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn all(cls: Option<&str>) -> StorageResult<Objects> {
    with_storage(|storage| storage.all(cls))
}

/// See [`StorageBackend::new`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn new(obj: Model) -> StorageResult<()> {
    with_storage(|storage| storage.new(obj))
}

/// See [`StorageBackend::save`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn save() -> StorageResult<()> {
    with_storage(|storage| storage.save())
}

/// See [`StorageBackend::reload`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn reload() -> StorageResult<()> {
    with_storage(|storage| storage.reload())
}

/// See [`StorageBackend::delete`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn delete(obj: Option<&Model>) -> StorageResult<()> {
    with_storage(|storage| storage.delete(obj))
}

/// See [`StorageBackend::get`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn get(cls: &str, id: &str) -> StorageResult<Option<Model>> {
    with_storage(|storage| storage.get(cls, id))
}

/// See [`StorageBackend::count`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn count(cls: Option<&str>) -> StorageResult<usize> {
    with_storage(|storage| storage.count(cls))
}

/// See [`StorageBackend::close`].
///
/// # Errors
/// `NotInitialized` before [`init`], or a backend failure.
pub fn close() -> StorageResult<()> {
    with_storage(|storage| storage.close())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Entity, State};
    use tempfile::tempdir;

    // Nothing in the unit test binary installs the global backend.
    #[test]
    fn test_operations_before_init_fail() {
        assert!(!is_initialized());
        assert!(matches!(count(None), Err(StorageError::NotInitialized)));
        assert!(matches!(save(), Err(StorageError::NotInitialized)));
        assert!(matches!(
            State::new("Texas").register(),
            Err(StorageError::NotInitialized)
        ));
    }

    #[test]
    fn test_open_picks_backend() {
        let dir = tempdir().unwrap();

        let file = open(&StorageConfig::file(dir.path().join("file.json"))).unwrap();
        assert_eq!(file.kind(), BackendKind::File);

        let db = open(&StorageConfig::db(dir.path().join("hbnb.db"))).unwrap();
        assert_eq!(db.kind(), BackendKind::Db);
        assert_eq!(db.count(None).unwrap(), 0);
    }

    #[test]
    fn test_open_reloads_file_state() {
        let dir = tempdir().unwrap();
        let config = StorageConfig::file(dir.path().join("file.json"));

        let mut first = open(&config).unwrap();
        let state = State::new("Texas");
        first.new(state.clone().into()).unwrap();
        first.save().unwrap();

        let second = open(&config).unwrap();
        assert!(second.get("State", state.id()).unwrap().is_some());
    }
}
