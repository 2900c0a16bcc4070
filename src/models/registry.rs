//! Closed registry of the entity types known to the storage engine.
//!
//! The set is fixed at compile time: outer layers resolve a type name
//! through [`EntityKind::from_type_name`] instead of any runtime lookup,
//! and the engine stages and returns [`AnyEntity`] values.

use std::fmt;

use serde_json::{Map, Value};

use crate::models::base::{Base, Entity};
use crate::models::entities::{Amenity, City, Place, Review, State, User};

/// The fixed, closed set of persisted entity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    State,
    City,
    User,
    Place,
    Review,
    Amenity,
}

impl EntityKind {
    /// Every known kind, in the order unfiltered queries are unioned.
    pub const ALL: [EntityKind; 6] = [
        EntityKind::State,
        EntityKind::City,
        EntityKind::User,
        EntityKind::Place,
        EntityKind::Review,
        EntityKind::Amenity,
    ];

    /// Concrete type name used in storage keys and documents.
    pub fn type_name(self) -> &'static str {
        match self {
            EntityKind::State => "State",
            EntityKind::City => "City",
            EntityKind::User => "User",
            EntityKind::Place => "Place",
            EntityKind::Review => "Review",
            EntityKind::Amenity => "Amenity",
        }
    }

    /// Resolve a type name coming from an outer layer.
    pub fn from_type_name(name: &str) -> Option<Self> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.type_name() == name)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// An entity of any known kind.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyEntity {
    State(State),
    City(City),
    User(User),
    Place(Place),
    Review(Review),
    Amenity(Amenity),
}

impl AnyEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            AnyEntity::State(_) => EntityKind::State,
            AnyEntity::City(_) => EntityKind::City,
            AnyEntity::User(_) => EntityKind::User,
            AnyEntity::Place(_) => EntityKind::Place,
            AnyEntity::Review(_) => EntityKind::Review,
            AnyEntity::Amenity(_) => EntityKind::Amenity,
        }
    }

    pub fn base(&self) -> &Base {
        match self {
            AnyEntity::State(e) => e.base(),
            AnyEntity::City(e) => e.base(),
            AnyEntity::User(e) => e.base(),
            AnyEntity::Place(e) => e.base(),
            AnyEntity::Review(e) => e.base(),
            AnyEntity::Amenity(e) => e.base(),
        }
    }

    pub fn id(&self) -> &str {
        &self.base().id
    }

    /// Storage key, `"<TypeName>.<id>"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.kind().type_name(), self.id())
    }

    /// Document of the wrapped entity, including its `__class__` marker.
    pub fn to_document(&self) -> Map<String, Value> {
        match self {
            AnyEntity::State(e) => e.to_document(),
            AnyEntity::City(e) => e.to_document(),
            AnyEntity::User(e) => e.to_document(),
            AnyEntity::Place(e) => e.to_document(),
            AnyEntity::Review(e) => e.to_document(),
            AnyEntity::Amenity(e) => e.to_document(),
        }
    }
}

impl From<State> for AnyEntity {
    fn from(value: State) -> Self {
        AnyEntity::State(value)
    }
}

impl From<City> for AnyEntity {
    fn from(value: City) -> Self {
        AnyEntity::City(value)
    }
}

impl From<User> for AnyEntity {
    fn from(value: User) -> Self {
        AnyEntity::User(value)
    }
}

impl From<Place> for AnyEntity {
    fn from(value: Place) -> Self {
        AnyEntity::Place(value)
    }
}

impl From<Review> for AnyEntity {
    fn from(value: Review) -> Self {
        AnyEntity::Review(value)
    }
}

impl From<Amenity> for AnyEntity {
    fn from(value: Amenity) -> Self {
        AnyEntity::Amenity(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_type_name(kind.type_name()), Some(kind));
        }
        assert_eq!(EntityKind::from_type_name("BaseModel"), None);
        assert_eq!(EntityKind::from_type_name("state"), None);
    }

    #[test]
    fn test_any_entity_dispatch() {
        let city = City::new("state-1", "Portland");
        let any: AnyEntity = city.clone().into();
        assert_eq!(any.kind(), EntityKind::City);
        assert_eq!(any.id(), city.base.id);
        assert_eq!(any.key(), format!("City.{}", city.base.id));
        assert_eq!(any.to_document(), city.to_document());
    }
}
