//! Storage Layer
//!
//! Two interchangeable backends behind [`StorageBackend`]:
//!
//! ```text
//! FileStorage  registry in memory ──save()──► file.json (whole-file rewrite)
//! DbStorage    staged session     ──save()──► SQLite (one transaction)
//! ```
//!
//! Both key objects as `"Type.id"` and return the same shapes, so callers
//! never branch on the backend.

mod backend;
mod db;
mod error;
mod file;
pub mod schema;

pub use backend::{class_filter, key_matches, key_of, Objects, RegistryKey, StorageBackend};
pub use db::DbStorage;
pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
