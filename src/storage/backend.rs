//! StorageBackend - the contract both backends implement
//!
//! The facade delegates every call here unchanged. Lookups (`all`, `get`,
//! `count`) degrade to empty results on unknown classes or ids; only a
//! broken medium makes them fail.

use std::collections::BTreeMap;
use std::fmt;

use super::error::{StorageError, StorageResult};
use crate::config::BackendKind;
use crate::models::{EntityKind, Model};

// =============================================================================
// Registry
// =============================================================================

/// Live objects keyed by `"Type.id"`.
pub type Objects = BTreeMap<String, Model>;

/// Composite `(type, id)` key, rendered as `"Type.id"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryKey {
    pub kind: EntityKind,
    pub id: String,
}

impl RegistryKey {
    /// Key for an entity of `kind` with `id`.
    ///
    /// # Panics
    /// Panics if `id` is empty.
    #[must_use]
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "registry key id cannot be empty");
        Self { kind, id }
    }

    /// Parse `"Type.id"`; the first `.` separates type from id.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (class, id) = raw.split_once('.')?;
        let kind = EntityKind::from_name(class)?;
        if id.is_empty() {
            return None;
        }
        Some(Self {
            kind,
            id: id.to_string(),
        })
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.id)
    }
}

/// Registry key of `obj`, or `Validation` when its id is empty.
///
/// # Errors
/// Returns `StorageError::Validation` for an empty id.
pub fn key_of(obj: &Model) -> StorageResult<RegistryKey> {
    if obj.id().is_empty() {
        return Err(StorageError::Validation(format!("{} has an empty id", obj.kind())));
    }
    Ok(obj.key())
}

/// Normalize a class filter: `None` and `""` both mean "every class".
#[must_use]
pub fn class_filter(cls: Option<&str>) -> Option<&str> {
    cls.filter(|c| !c.is_empty())
}

/// Whether a `"Type.id"` key belongs to `cls` (`None` matches everything).
#[must_use]
pub fn key_matches(key: &str, cls: Option<&str>) -> bool {
    match cls {
        None => true,
        Some(cls) => key.split_once('.').map_or(false, |(class, _)| class == cls),
    }
}

// =============================================================================
// Backend Trait
// =============================================================================

/// Operations shared by the file and database backends.
pub trait StorageBackend: Send + fmt::Debug {
    /// Which backend this is.
    fn kind(&self) -> BackendKind;

    /// Objects whose class is `cls`, or every object when `cls` is `None`/empty.
    fn all(&self, cls: Option<&str>) -> StorageResult<Objects>;

    /// Add `obj` under its registry key, replacing any previous value.
    fn new(&mut self, obj: Model) -> StorageResult<()>;

    /// Flush every live object to the durable store.
    fn save(&mut self) -> StorageResult<()>;

    /// Restore state from the durable store; a missing store is not an error.
    fn reload(&mut self) -> StorageResult<()>;

    /// Remove `obj`; `None` or an unknown object is a no-op.
    fn delete(&mut self, obj: Option<&Model>) -> StorageResult<()>;

    /// The object of class `cls` with `id`, if any.
    fn get(&self, cls: &str, id: &str) -> StorageResult<Option<Model>>;

    /// Number of objects `all(cls)` would return.
    fn count(&self, cls: Option<&str>) -> StorageResult<usize> {
        Ok(self.all(cls)?.len())
    }

    /// Release per-session resources.
    fn close(&mut self) -> StorageResult<()>;
}

// =============================================================================
// Tests
// =============================================================================
