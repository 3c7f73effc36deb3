//! Models - Domain Entities and the Class Table
//!
//! [`Model`] is the closed set of storable entities. Rehydration from a dict
//! dispatches on the `__class__` discriminator through [`CLASSES`], an
//! explicit table from type name to constructor.

mod base;
mod entities;
mod user;

pub use base::{
    timestamp, BaseModel, Entity, CLASS_FIELD, CREATED_AT_FIELD, ID_FIELD, TIME_FORMAT,
    UPDATED_AT_FIELD,
};
pub use entities::{Amenity, City, Place, Review, State};
pub use user::{User, PASSWORD_FIELD};

use serde_json::{Map, Value};

use crate::storage::{RegistryKey, StorageError, StorageResult};

// =============================================================================
// Entity Kind
// =============================================================================

/// Type discriminator of every storable entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    BaseModel,
    User,
    State,
    City,
    Amenity,
    Place,
    Review,
}

impl EntityKind {
    /// Class name used in registry keys and `__class__`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BaseModel => "BaseModel",
            Self::User => "User",
            Self::State => "State",
            Self::City => "City",
            Self::Amenity => "Amenity",
            Self::Place => "Place",
            Self::Review => "Review",
        }
    }

    /// Look up a class name (exact, case-sensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        CLASSES
            .iter()
            .find(|(kind, _)| kind.as_str() == name)
            .map(|(kind, _)| *kind)
    }

    /// Every kind, in class-table order.
    #[must_use]
    pub fn all() -> &'static [EntityKind] {
        &[
            Self::BaseModel,
            Self::User,
            Self::State,
            Self::City,
            Self::Amenity,
            Self::Place,
            Self::Review,
        ]
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Class Table
// =============================================================================

/// Rehydrates one entity from its dict.
pub type Rehydrate = fn(Map<String, Value>) -> StorageResult<Model>;

fn rehydrate<E: Entity>(dict: Map<String, Value>) -> StorageResult<Model> {
    Ok(E::from_dict(dict)?.into())
}

/// Type name to constructor, used when reading durable state back.
pub const CLASSES: &[(EntityKind, Rehydrate)] = &[
    (EntityKind::BaseModel, rehydrate::<BaseModel> as Rehydrate),
    (EntityKind::User, rehydrate::<User> as Rehydrate),
    (EntityKind::State, rehydrate::<State> as Rehydrate),
    (EntityKind::City, rehydrate::<City> as Rehydrate),
    (EntityKind::Amenity, rehydrate::<Amenity> as Rehydrate),
    (EntityKind::Place, rehydrate::<Place> as Rehydrate),
    (EntityKind::Review, rehydrate::<Review> as Rehydrate),
];

fn constructor_for(kind: EntityKind) -> Option<Rehydrate> {
    CLASSES.iter().find(|(k, _)| *k == kind).map(|(_, f)| *f)
}

// =============================================================================
// Model
// =============================================================================

/// Any storable entity.
///
/// Equality is by type and `id`, never by attribute values.
#[derive(Debug, Clone)]
pub enum Model {
    BaseModel(BaseModel),
    User(User),
    State(State),
    City(City),
    Amenity(Amenity),
    Place(Place),
    Review(Review),
}

impl Model {
    /// Type discriminator.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::BaseModel(_) => EntityKind::BaseModel,
            Self::User(_) => EntityKind::User,
            Self::State(_) => EntityKind::State,
            Self::City(_) => EntityKind::City,
            Self::Amenity(_) => EntityKind::Amenity,
            Self::Place(_) => EntityKind::Place,
            Self::Review(_) => EntityKind::Review,
        }
    }

    /// Shared identity and timestamps.
    #[must_use]
    pub fn base(&self) -> &BaseModel {
        match self {
            Self::BaseModel(e) => e,
            Self::User(e) => e.base(),
            Self::State(e) => e.base(),
            Self::City(e) => e.base(),
            Self::Amenity(e) => e.base(),
            Self::Place(e) => e.base(),
            Self::Review(e) => e.base(),
        }
    }

    /// Mutable identity and timestamps.
    pub fn base_mut(&mut self) -> &mut BaseModel {
        match self {
            Self::BaseModel(e) => e,
            Self::User(e) => e.base_mut(),
            Self::State(e) => e.base_mut(),
            Self::City(e) => e.base_mut(),
            Self::Amenity(e) => e.base_mut(),
            Self::Place(e) => e.base_mut(),
            Self::Review(e) => e.base_mut(),
        }
    }

    /// Unique identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Registry key `"Type.id"`.
    #[must_use]
    pub fn key(&self) -> RegistryKey {
        RegistryKey::new(self.kind(), self.id())
    }

    /// Dict form with `__class__` and rendered timestamps.
    #[must_use]
    pub fn to_dict(&self) -> Map<String, Value> {
        match self {
            Self::BaseModel(e) => e.to_dict(),
            Self::User(e) => e.to_dict(),
            Self::State(e) => e.to_dict(),
            Self::City(e) => e.to_dict(),
            Self::Amenity(e) => e.to_dict(),
            Self::Place(e) => e.to_dict(),
            Self::Review(e) => e.to_dict(),
        }
    }

    /// Dict form for API export: secrets (the password hash) removed.
    #[must_use]
    pub fn to_public_dict(&self) -> Map<String, Value> {
        let mut dict = self.to_dict();
        if self.kind() == EntityKind::User {
            dict.remove(PASSWORD_FIELD);
        }
        dict
    }

    /// Rehydrate a known kind from its dict.
    ///
    /// # Errors
    /// Fails on wrongly typed fields or unparsable timestamps.
    pub fn from_kind_dict(kind: EntityKind, dict: Map<String, Value>) -> StorageResult<Self> {
        let rehydrate =
            constructor_for(kind).ok_or_else(|| StorageError::UnknownClass(kind.to_string()))?;
        rehydrate(dict)
    }

    /// Rehydrate from a dict, picking the concrete type from `__class__`.
    ///
    /// # Errors
    /// Fails if `__class__` is missing or unknown, or the fields do not parse.
    pub fn from_dict(dict: Map<String, Value>) -> StorageResult<Self> {
        let class = match dict.get(CLASS_FIELD) {
            Some(Value::String(class)) => class.clone(),
            _ => return Err(StorageError::UnknownClass(format!("missing {CLASS_FIELD}"))),
        };
        let kind = EntityKind::from_name(&class).ok_or(StorageError::UnknownClass(class))?;
        Self::from_kind_dict(kind, dict)
    }

    /// Downcast to a concrete entity type.
    #[must_use]
    pub fn downcast<E: Entity>(self) -> Option<E> {
        E::from_model(self)
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.kind() == other.kind() && self.id() == other.id()
    }
}

impl Eq for Model {}

impl From<BaseModel> for Model {
    fn from(e: BaseModel) -> Self {
        Self::BaseModel(e)
    }
}

// =============================================================================
// Tests
// =============================================================================
