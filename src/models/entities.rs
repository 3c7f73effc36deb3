//! Places and Geography
//!
//! `State`, `City`, `Amenity`, `Place` and `Review`. Fields are optional so
//! a dict only carries what was set; the database backend enforces which
//! ones are required.

use serde::{Deserialize, Serialize};

use super::{BaseModel, Entity, EntityKind, Model};

macro_rules! entity_impl {
    ($ty:ident) => {
        impl Entity for $ty {
            const KIND: EntityKind = EntityKind::$ty;

            fn base(&self) -> &BaseModel {
                &self.base
            }

            fn base_mut(&mut self) -> &mut BaseModel {
                &mut self.base
            }

            fn from_model(model: Model) -> Option<Self> {
                match model {
                    Model::$ty(inner) => Some(inner),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Model {
            fn from(inner: $ty) -> Self {
                Self::$ty(inner)
            }
        }
    };
}

// =============================================================================
// State / City
// =============================================================================

/// A state; owns its cities.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl State {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

/// A city inside a state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct City {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl City {
    #[must_use]
    pub fn new(state_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            state_id: Some(state_id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

// =============================================================================
// Amenity
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Amenity {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }
}

// =============================================================================
// Place / Review
// =============================================================================

/// A rentable place, owned by a user and located in a city.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub number_rooms: i64,
    #[serde(default)]
    pub number_bathrooms: i64,
    #[serde(default)]
    pub max_guest: i64,
    #[serde(default)]
    pub price_by_night: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Ids of linked amenities (many-to-many)
    #[serde(default)]
    pub amenity_ids: Vec<String>,
}

impl Place {
    #[must_use]
    pub fn new(
        city_id: impl Into<String>,
        user_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            city_id: Some(city_id.into()),
            user_id: Some(user_id.into()),
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Link an amenity; linking twice is a no-op.
    pub fn add_amenity(&mut self, amenity_id: impl Into<String>) {
        let amenity_id = amenity_id.into();
        if !self.amenity_ids.contains(&amenity_id) {
            self.amenity_ids.push(amenity_id);
        }
    }
}

/// A user's review of a place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Review {
    #[serde(flatten)]
    pub base: BaseModel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Review {
    #[must_use]
    pub fn new(
        place_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            place_id: Some(place_id.into()),
            user_id: Some(user_id.into()),
            text: Some(text.into()),
            ..Self::default()
        }
    }
}

entity_impl!(State);
entity_impl!(City);
entity_impl!(Amenity);
entity_impl!(Place);
entity_impl!(Review);

// =============================================================================
// Tests
// =============================================================================
