//! HBnB Storage - Object Persistence Behind One Facade
//!
//! Domain objects (users, places, reviews, states, ...) are created, queried
//! and deleted through a single process-wide facade. The facade delegates to
//! exactly one backend, picked once at startup from `HBNB_TYPE_STORAGE`.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 facade (process-wide instance)               │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    StorageBackend Trait                      │
//! └─────────────────────────────────────────────────────────────┘
//!          ↑                              ↑
//!          │                              │
//! ┌────────┴────────┐           ┌────────┴────────┐
//! │   FileStorage   │           │    DbStorage    │
//! │ (JSON registry) │           │ (SQLite session)│
//! └─────────────────┘           └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use hbnb::config::StorageConfig;
//! use hbnb::models::{Entity, State};
//!
//! # fn main() -> hbnb::StorageResult<()> {
//! hbnb::facade::init(&StorageConfig::file("file.json"))?;
//!
//! let mut state = State::new("Texas");
//! state.save()?;
//!
//! let found = hbnb::facade::get("State", state.id())?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod facade;
pub mod models;
pub mod storage;

pub use config::{BackendKind, StorageConfig};
pub use models::{Entity, EntityKind, Model};
pub use storage::{
    DbStorage, FileStorage, Objects, RegistryKey, StorageBackend, StorageError, StorageResult,
};
