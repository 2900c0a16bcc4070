//! Concrete entity schemas for the rental-listing domain.
//!
//! Each struct embeds [`Base`] for identity and timestamps and declares its
//! own typed fields; the document pair comes from the [`Entity`] trait.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::base::{Base, Entity};
use crate::models::registry::EntityKind;

/// Top-level geographic region listings are grouped under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
}

impl State {
    pub fn new<S: Into<String>>(name: S) -> Self {
        State {
            base: Base::new(),
            name: name.into(),
        }
    }
}

impl Entity for State {
    const KIND: EntityKind = EntityKind::State;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// City within a state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(flatten)]
    pub base: Base,
    pub state_id: String,
    pub name: String,
}

impl City {
    pub fn new<S: Into<String>, N: Into<String>>(state_id: S, name: N) -> Self {
        City {
            base: Base::new(),
            state_id: state_id.into(),
            name: name.into(),
        }
    }
}

impl Entity for City {
    const KIND: EntityKind = EntityKind::City;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl fmt::Display for City {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Registered account that owns places and writes reviews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub base: Base,
    pub email: String,
    pub password: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl User {
    pub fn new<E: Into<String>, P: Into<String>>(email: E, password: P) -> Self {
        User {
            base: Base::new(),
            email: email.into(),
            password: password.into(),
            first_name: None,
            last_name: None,
        }
    }
}

impl Entity for User {
    const KIND: EntityKind = EntityKind::User;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// A rentable listing, owned by a user and located in a city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub base: Base,
    pub city_id: String,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub number_rooms: i32,
    pub number_bathrooms: i32,
    pub max_guest: i32,
    pub price_by_night: i32,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Place {
    /// New listing with counts zeroed and optional fields unset.
    pub fn new<C, U, N>(city_id: C, user_id: U, name: N) -> Self
    where
        C: Into<String>,
        U: Into<String>,
        N: Into<String>,
    {
        Place {
            base: Base::new(),
            city_id: city_id.into(),
            user_id: user_id.into(),
            name: name.into(),
            description: None,
            number_rooms: 0,
            number_bathrooms: 0,
            max_guest: 0,
            price_by_night: 0,
            latitude: None,
            longitude: None,
        }
    }
}

impl Entity for Place {
    const KIND: EntityKind = EntityKind::Place;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Text left by a user about a place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(flatten)]
    pub base: Base,
    pub place_id: String,
    pub user_id: String,
    pub text: String,
}

impl Review {
    pub fn new<P, U, T>(place_id: P, user_id: U, text: T) -> Self
    where
        P: Into<String>,
        U: Into<String>,
        T: Into<String>,
    {
        Review {
            base: Base::new(),
            place_id: place_id.into(),
            user_id: user_id.into(),
            text: text.into(),
        }
    }
}

impl Entity for Review {
    const KIND: EntityKind = EntityKind::Review;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl fmt::Display for Review {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

/// Feature a place can offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amenity {
    #[serde(flatten)]
    pub base: Base,
    pub name: String,
}

impl Amenity {
    pub fn new<S: Into<String>>(name: S) -> Self {
        Amenity {
            base: Base::new(),
            name: name.into(),
        }
    }
}

impl Entity for Amenity {
    const KIND: EntityKind = EntityKind::Amenity;

    fn base(&self) -> &Base {
        &self.base
    }

    fn base_mut(&mut self) -> &mut Base {
        &mut self.base
    }
}

impl fmt::Display for Amenity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::base::CLASS_KEY;
    use chrono::NaiveDate;
    use serde_json::{Map, Value};

    #[test]
    fn test_document_includes_class_and_iso_timestamps() {
        let mut state = State::new("Arizona");
        state.base.created_at = NaiveDate::from_ymd_opt(2023, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let doc = state.to_document();
        assert_eq!(doc[CLASS_KEY], "State");
        assert_eq!(doc["created_at"], "2023-01-01T00:00:00");
        assert_eq!(doc["name"], "Arizona");
        assert_eq!(doc["id"], state.base.id.as_str());
    }

    #[test]
    fn test_document_round_trip_preserves_all_fields() {
        let mut place = Place::new("city-1", "user-1", "Loft");
        place.description = Some("Bright corner unit".to_owned());
        place.number_rooms = 2;
        place.price_by_night = 120;
        place.latitude = Some(45.52);

        let doc = place.to_document();
        let rebuilt = Place::from_document(&doc).unwrap();
        assert_eq!(rebuilt, place);
        assert_eq!(rebuilt.base.id, place.base.id);
        assert_eq!(rebuilt.base.created_at, place.base.created_at);
        assert_eq!(rebuilt.base.updated_at, place.base.updated_at);
    }

    #[test]
    fn test_partial_document_is_fully_populated() {
        let mut doc = Map::new();
        doc.insert("id".to_owned(), Value::String("fixed-id".to_owned()));
        doc.insert("name".to_owned(), Value::String("Utah".to_owned()));

        let state = State::from_document(&doc).unwrap();
        assert_eq!(state.base.id, "fixed-id");
        assert_eq!(state.name, "Utah");
        // timestamps were absent from the document and must be generated
        assert_eq!(
            state.to_document()["created_at"].as_str().map(str::is_empty),
            Some(false)
        );
    }

    #[test]
    fn test_render_format() {
        let amenity = Amenity::new("Sauna");
        let text = amenity.to_string();
        assert!(text.starts_with(&format!("[Amenity] ({}) ", amenity.base.id)));
        assert!(text.contains("\"name\":\"Sauna\""));
        assert!(!text.contains(CLASS_KEY));
    }

    #[test]
    fn test_key_format() {
        let user = User::new("kaia@example.net", "hunter2");
        assert_eq!(user.key(), format!("User.{}", user.base.id));
    }
}
