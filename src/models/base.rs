//! Entity Base - Identity, Timestamps, Dict Protocol
//!
//! Every domain object embeds a [`BaseModel`] (flattened into its dict) and
//! implements [`Entity`]. Construction is pure; registration with the
//! process-wide facade is the explicit [`Entity::register`] call.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{EntityKind, Model};
use crate::facade;
use crate::storage::{RegistryKey, StorageResult};

// =============================================================================
// Constants
// =============================================================================

/// Render format for `created_at` / `updated_at` (ISO-8601, no offset, UTC)
pub const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Parse format; accepts any fractional precision, or none
pub const TIME_PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Dict key carrying the type discriminator
pub const CLASS_FIELD: &str = "__class__";

/// Dict key of the identifier
pub const ID_FIELD: &str = "id";

/// Dict key of the creation timestamp
pub const CREATED_AT_FIELD: &str = "created_at";

/// Dict key of the last-update timestamp
pub const UPDATED_AT_FIELD: &str = "updated_at";

// =============================================================================
// Timestamp Serde
// =============================================================================

/// Serde adapter for the fixed timestamp format.
pub mod timestamp {
    use super::{DateTime, NaiveDateTime, Utc, TIME_FORMAT, TIME_PARSE_FORMAT};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Render a timestamp.
    #[must_use]
    pub fn format(ts: &DateTime<Utc>) -> String {
        ts.format(TIME_FORMAT).to_string()
    }

    /// Parse a rendered timestamp.
    ///
    /// # Errors
    /// Returns the chrono parse error for anything but the fixed format.
    pub fn parse(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
        NaiveDateTime::parse_from_str(raw, TIME_PARSE_FORMAT).map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// BaseModel
// =============================================================================

/// Identity and timestamps shared by every entity.
///
/// Equality is by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseModel {
    /// Unique identifier (UUID v4), immutable
    pub id: String,
    /// Creation timestamp
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
    /// Last persisted mutation
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

impl BaseModel {
    /// Fresh identity with `created_at == updated_at == now`.
    #[must_use]
    pub fn new() -> Self {
        let now = now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Refresh `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = now();
    }
}

/// Current time at the precision timestamps are rendered with (microseconds).
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl Default for BaseModel {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for BaseModel {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for BaseModel {}

// =============================================================================
// Entity Trait
// =============================================================================

/// Contract every storable domain object implements.
pub trait Entity: Clone + Serialize + DeserializeOwned + Into<Model> {
    /// Type discriminator of this entity.
    const KIND: EntityKind;

    /// Shared identity and timestamps.
    fn base(&self) -> &BaseModel;

    /// Mutable access to identity and timestamps.
    fn base_mut(&mut self) -> &mut BaseModel;

    /// Recover the concrete type from a [`Model`].
    fn from_model(model: Model) -> Option<Self>;

    /// Unique identifier.
    fn id(&self) -> &str {
        &self.base().id
    }

    /// Registry key `"Type.id"`.
    fn key(&self) -> RegistryKey {
        RegistryKey::new(Self::KIND, self.id())
    }

    /// Public attributes that are set, plus `__class__` and rendered timestamps.
    fn to_dict(&self) -> Map<String, Value> {
        let mut dict = match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            // Entities are plain structs of strings and numbers.
            _ => Map::new(),
        };
        dict.insert(CLASS_FIELD.to_string(), Value::String(Self::KIND.to_string()));
        dict
    }

    /// Rehydrate from a dict.
    ///
    /// Missing `id` / timestamps are assigned fresh; `__class__` and unknown
    /// keys are ignored.
    ///
    /// # Errors
    /// Fails when `id` is empty, a present field has the wrong type, or a
    /// timestamp does not parse.
    fn from_dict(mut dict: Map<String, Value>) -> StorageResult<Self> {
        dict.remove(CLASS_FIELD);
        let now = timestamp::format(&Utc::now());
        match dict.get(ID_FIELD) {
            None | Some(Value::Null) => {
                dict.insert(ID_FIELD.to_string(), Value::String(uuid::Uuid::new_v4().to_string()));
            }
            Some(Value::String(id)) if id.is_empty() => {
                let err = <serde_json::Error as serde::de::Error>::custom("id cannot be empty");
                return Err(err.into());
            }
            Some(_) => {}
        }
        for field in [CREATED_AT_FIELD, UPDATED_AT_FIELD] {
            if dict.get(field).map_or(true, Value::is_null) {
                dict.insert(field.to_string(), Value::String(now.clone()));
            }
        }
        Ok(serde_json::from_value(Value::Object(dict))?)
    }

    /// Add this entity to the active facade (not persisted until `save`).
    ///
    /// # Errors
    /// Fails if the facade is not initialized or the backend rejects the type.
    fn register(&self) -> StorageResult<()> {
        facade::new(self.clone().into())
    }

    /// Refresh `updated_at`, re-register, and flush the whole registry.
    ///
    /// # Errors
    /// Propagates facade and backend failures from `new` and `save`.
    fn save(&mut self) -> StorageResult<()> {
        self.base_mut().touch();
        facade::new(self.clone().into())?;
        facade::save()
    }

    /// Remove this entity from the active facade.
    ///
    /// # Errors
    /// Fails if the facade is not initialized.
    fn delete(&self) -> StorageResult<()> {
        facade::delete(Some(&self.clone().into()))
    }
}

impl Entity for BaseModel {
    const KIND: EntityKind = EntityKind::BaseModel;

    fn base(&self) -> &BaseModel {
        self
    }

    fn base_mut(&mut self) -> &mut BaseModel {
        self
    }

    fn from_model(model: Model) -> Option<Self> {
        match model {
            Model::BaseModel(inner) => Some(inner),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
