//! SeaORM entity models used by the database storage engine.
//!
//! One module per table, plus the conversions between rows and domain
//! entities and the schema/persistence helpers the engine drives:
//! - `states`, `cities`, `users`, `places`, `reviews`, `amenities`
//!
//! Timestamps are stored as ISO-8601 strings for portability.

use sea_orm::sea_query::{OnConflict, Table};
use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema, Set};

use crate::error_handling::types::StorageError;
use crate::models::base::{format_timestamp, parse_timestamp, Base};
use crate::models::entities::{Amenity, City, Place, Review, State, User};
use crate::models::registry::{AnyEntity, EntityKind};

/// `states` table entity model.
pub mod state {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "states")]
    pub struct Model {
        /// UUID as string primary key
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub created_at: String,
        pub updated_at: String,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::city::Entity")]
        Cities,
    }

    impl Related<super::city::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Cities.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// `cities` table entity model.
pub mod city {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "cities")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub created_at: String,
        pub updated_at: String,
        /// Foreign key to `states.id`
        pub state_id: String,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::state::Entity",
            from = "Column::StateId",
            to = "super::state::Column::Id"
        )]
        State,
        #[sea_orm(has_many = "super::place::Entity")]
        Places,
    }

    impl Related<super::state::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::State.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// `users` table entity model.
pub mod user {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub created_at: String,
        pub updated_at: String,
        pub email: String,
        pub password: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(has_many = "super::place::Entity")]
        Places,
        #[sea_orm(has_many = "super::review::Entity")]
        Reviews,
    }

    impl Related<super::place::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Places.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// `places` table entity model.
pub mod place {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
    #[sea_orm(table_name = "places")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub created_at: String,
        pub updated_at: String,
        /// Foreign key to `cities.id`
        pub city_id: String,
        /// Foreign key to `users.id`
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

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::city::Entity",
            from = "Column::CityId",
            to = "super::city::Column::Id"
        )]
        City,
        #[sea_orm(
            belongs_to = "super::user::Entity",
            from = "Column::UserId",
            to = "super::user::Column::Id"
        )]
        User,
        #[sea_orm(has_many = "super::review::Entity")]
        Reviews,
    }

    impl Related<super::city::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::City.def()
        }
    }

    impl Related<super::user::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// `reviews` table entity model.
pub mod review {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "reviews")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub created_at: String,
        pub updated_at: String,
        /// Foreign key to `places.id`
        pub place_id: String,
        /// Foreign key to `users.id`
        pub user_id: String,
        pub text: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        #[sea_orm(
            belongs_to = "super::place::Entity",
            from = "Column::PlaceId",
            to = "super::place::Column::Id"
        )]
        Place,
        #[sea_orm(
            belongs_to = "super::user::Entity",
            from = "Column::UserId",
            to = "super::user::Column::Id"
        )]
        User,
    }

    impl Related<super::place::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Place.def()
        }
    }

    impl Related<super::user::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::User.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// `amenities` table entity model.
pub mod amenity {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "amenities")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub id: String,
        pub created_at: String,
        pub updated_at: String,
        pub name: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

/// Creation order satisfying foreign key references; drops run in reverse.
const CREATE_ORDER: [EntityKind; 6] = [
    EntityKind::State,
    EntityKind::City,
    EntityKind::User,
    EntityKind::Amenity,
    EntityKind::Place,
    EntityKind::Review,
];

fn record_base(id: String, created_at: &str, updated_at: &str) -> Result<Base, StorageError> {
    Ok(Base {
        id,
        created_at: parse_timestamp(created_at)
            .map_err(|e| StorageError::CorruptRecord(format!("created_at: {}", e)))?,
        updated_at: parse_timestamp(updated_at)
            .map_err(|e| StorageError::CorruptRecord(format!("updated_at: {}", e)))?,
    })
}

impl state::Model {
    fn into_entity(self) -> Result<State, StorageError> {
        Ok(State {
            base: record_base(self.id, &self.created_at, &self.updated_at)?,
            name: self.name,
        })
    }
}

impl city::Model {
    fn into_entity(self) -> Result<City, StorageError> {
        Ok(City {
            base: record_base(self.id, &self.created_at, &self.updated_at)?,
            state_id: self.state_id,
            name: self.name,
        })
    }
}

impl user::Model {
    fn into_entity(self) -> Result<User, StorageError> {
        Ok(User {
            base: record_base(self.id, &self.created_at, &self.updated_at)?,
            email: self.email,
            password: self.password,
            first_name: self.first_name,
            last_name: self.last_name,
        })
    }
}

impl place::Model {
    fn into_entity(self) -> Result<Place, StorageError> {
        Ok(Place {
            base: record_base(self.id, &self.created_at, &self.updated_at)?,
            city_id: self.city_id,
            user_id: self.user_id,
            name: self.name,
            description: self.description,
            number_rooms: self.number_rooms,
            number_bathrooms: self.number_bathrooms,
            max_guest: self.max_guest,
            price_by_night: self.price_by_night,
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

impl review::Model {
    fn into_entity(self) -> Result<Review, StorageError> {
        Ok(Review {
            base: record_base(self.id, &self.created_at, &self.updated_at)?,
            place_id: self.place_id,
            user_id: self.user_id,
            text: self.text,
        })
    }
}

impl amenity::Model {
    fn into_entity(self) -> Result<Amenity, StorageError> {
        Ok(Amenity {
            base: record_base(self.id, &self.created_at, &self.updated_at)?,
            name: self.name,
        })
    }
}

fn state_row(entity: &State) -> state::ActiveModel {
    state::ActiveModel {
        id: Set(entity.base.id.clone()),
        created_at: Set(format_timestamp(entity.base.created_at)),
        updated_at: Set(format_timestamp(entity.base.updated_at)),
        name: Set(entity.name.clone()),
    }
}

fn city_row(entity: &City) -> city::ActiveModel {
    city::ActiveModel {
        id: Set(entity.base.id.clone()),
        created_at: Set(format_timestamp(entity.base.created_at)),
        updated_at: Set(format_timestamp(entity.base.updated_at)),
        state_id: Set(entity.state_id.clone()),
        name: Set(entity.name.clone()),
    }
}

fn user_row(entity: &User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(entity.base.id.clone()),
        created_at: Set(format_timestamp(entity.base.created_at)),
        updated_at: Set(format_timestamp(entity.base.updated_at)),
        email: Set(entity.email.clone()),
        password: Set(entity.password.clone()),
        first_name: Set(entity.first_name.clone()),
        last_name: Set(entity.last_name.clone()),
    }
}

fn place_row(entity: &Place) -> place::ActiveModel {
    place::ActiveModel {
        id: Set(entity.base.id.clone()),
        created_at: Set(format_timestamp(entity.base.created_at)),
        updated_at: Set(format_timestamp(entity.base.updated_at)),
        city_id: Set(entity.city_id.clone()),
        user_id: Set(entity.user_id.clone()),
        name: Set(entity.name.clone()),
        description: Set(entity.description.clone()),
        number_rooms: Set(entity.number_rooms),
        number_bathrooms: Set(entity.number_bathrooms),
        max_guest: Set(entity.max_guest),
        price_by_night: Set(entity.price_by_night),
        latitude: Set(entity.latitude),
        longitude: Set(entity.longitude),
    }
}

fn review_row(entity: &Review) -> review::ActiveModel {
    review::ActiveModel {
        id: Set(entity.base.id.clone()),
        created_at: Set(format_timestamp(entity.base.created_at)),
        updated_at: Set(format_timestamp(entity.base.updated_at)),
        place_id: Set(entity.place_id.clone()),
        user_id: Set(entity.user_id.clone()),
        text: Set(entity.text.clone()),
    }
}

fn amenity_row(entity: &Amenity) -> amenity::ActiveModel {
    amenity::ActiveModel {
        id: Set(entity.base.id.clone()),
        created_at: Set(format_timestamp(entity.base.created_at)),
        updated_at: Set(format_timestamp(entity.base.updated_at)),
        name: Set(entity.name.clone()),
    }
}

/// Create any missing table from the entity definitions. Idempotent.
pub(crate) async fn create_tables(conn: &impl ConnectionTrait) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);
    for kind in CREATE_ORDER {
        let mut statement = match kind {
            EntityKind::State => schema.create_table_from_entity(state::Entity),
            EntityKind::City => schema.create_table_from_entity(city::Entity),
            EntityKind::User => schema.create_table_from_entity(user::Entity),
            EntityKind::Place => schema.create_table_from_entity(place::Entity),
            EntityKind::Review => schema.create_table_from_entity(review::Entity),
            EntityKind::Amenity => schema.create_table_from_entity(amenity::Entity),
        };
        statement.if_not_exists();
        conn.execute(backend.build(&statement)).await?;
    }
    Ok(())
}

/// Drop every known table. Destructive; used by the test-mode reset.
pub(crate) async fn drop_tables(conn: &impl ConnectionTrait) -> Result<(), DbErr> {
    let backend = conn.get_database_backend();
    for kind in CREATE_ORDER.iter().rev() {
        let mut statement = Table::drop();
        statement.if_exists();
        match kind {
            EntityKind::State => statement.table(state::Entity),
            EntityKind::City => statement.table(city::Entity),
            EntityKind::User => statement.table(user::Entity),
            EntityKind::Place => statement.table(place::Entity),
            EntityKind::Review => statement.table(review::Entity),
            EntityKind::Amenity => statement.table(amenity::Entity),
        };
        conn.execute(backend.build(&statement)).await?;
    }
    Ok(())
}

/// Load every persisted row of `kind` as domain entities.
pub(crate) async fn fetch_kind(
    conn: &impl ConnectionTrait,
    kind: EntityKind,
) -> Result<Vec<AnyEntity>, StorageError> {
    let mut out = Vec::new();
    match kind {
        EntityKind::State => {
            for row in state::Entity::find()
                .all(conn)
                .await
                .map_err(StorageError::QueryFailed)?
            {
                out.push(AnyEntity::State(row.into_entity()?));
            }
        }
        EntityKind::City => {
            for row in city::Entity::find()
                .all(conn)
                .await
                .map_err(StorageError::QueryFailed)?
            {
                out.push(AnyEntity::City(row.into_entity()?));
            }
        }
        EntityKind::User => {
            for row in user::Entity::find()
                .all(conn)
                .await
                .map_err(StorageError::QueryFailed)?
            {
                out.push(AnyEntity::User(row.into_entity()?));
            }
        }
        EntityKind::Place => {
            for row in place::Entity::find()
                .all(conn)
                .await
                .map_err(StorageError::QueryFailed)?
            {
                out.push(AnyEntity::Place(row.into_entity()?));
            }
        }
        EntityKind::Review => {
            for row in review::Entity::find()
                .all(conn)
                .await
                .map_err(StorageError::QueryFailed)?
            {
                out.push(AnyEntity::Review(row.into_entity()?));
            }
        }
        EntityKind::Amenity => {
            for row in amenity::Entity::find()
                .all(conn)
                .await
                .map_err(StorageError::QueryFailed)?
            {
                out.push(AnyEntity::Amenity(row.into_entity()?));
            }
        }
    }
    Ok(out)
}

/// Insert-or-update one staged entity inside the commit transaction.
pub(crate) async fn persist(conn: &impl ConnectionTrait, entity: &AnyEntity) -> Result<(), DbErr> {
    match entity {
        AnyEntity::State(e) => {
            state::Entity::insert(state_row(e))
                .on_conflict(
                    OnConflict::column(state::Column::Id)
                        .update_columns([
                            state::Column::CreatedAt,
                            state::Column::UpdatedAt,
                            state::Column::Name,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        AnyEntity::City(e) => {
            city::Entity::insert(city_row(e))
                .on_conflict(
                    OnConflict::column(city::Column::Id)
                        .update_columns([
                            city::Column::CreatedAt,
                            city::Column::UpdatedAt,
                            city::Column::StateId,
                            city::Column::Name,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        AnyEntity::User(e) => {
            user::Entity::insert(user_row(e))
                .on_conflict(
                    OnConflict::column(user::Column::Id)
                        .update_columns([
                            user::Column::CreatedAt,
                            user::Column::UpdatedAt,
                            user::Column::Email,
                            user::Column::Password,
                            user::Column::FirstName,
                            user::Column::LastName,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        AnyEntity::Place(e) => {
            place::Entity::insert(place_row(e))
                .on_conflict(
                    OnConflict::column(place::Column::Id)
                        .update_columns([
                            place::Column::CreatedAt,
                            place::Column::UpdatedAt,
                            place::Column::CityId,
                            place::Column::UserId,
                            place::Column::Name,
                            place::Column::Description,
                            place::Column::NumberRooms,
                            place::Column::NumberBathrooms,
                            place::Column::MaxGuest,
                            place::Column::PriceByNight,
                            place::Column::Latitude,
                            place::Column::Longitude,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        AnyEntity::Review(e) => {
            review::Entity::insert(review_row(e))
                .on_conflict(
                    OnConflict::column(review::Column::Id)
                        .update_columns([
                            review::Column::CreatedAt,
                            review::Column::UpdatedAt,
                            review::Column::PlaceId,
                            review::Column::UserId,
                            review::Column::Text,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
        AnyEntity::Amenity(e) => {
            amenity::Entity::insert(amenity_row(e))
                .on_conflict(
                    OnConflict::column(amenity::Column::Id)
                        .update_columns([
                            amenity::Column::CreatedAt,
                            amenity::Column::UpdatedAt,
                            amenity::Column::Name,
                        ])
                        .to_owned(),
                )
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

/// Delete one row by kind and id; returns how many rows matched.
pub(crate) async fn remove(
    conn: &impl ConnectionTrait,
    kind: EntityKind,
    id: &str,
) -> Result<u64, DbErr> {
    let result = match kind {
        EntityKind::State => state::Entity::delete_by_id(id).exec(conn).await?,
        EntityKind::City => city::Entity::delete_by_id(id).exec(conn).await?,
        EntityKind::User => user::Entity::delete_by_id(id).exec(conn).await?,
        EntityKind::Place => place::Entity::delete_by_id(id).exec(conn).await?,
        EntityKind::Review => review::Entity::delete_by_id(id).exec(conn).await?,
        EntityKind::Amenity => amenity::Entity::delete_by_id(id).exec(conn).await?,
    };
    Ok(result.rows_affected)
}
