//! Database-backed storage engine.
//!
//! Wraps a SeaORM connection behind a synchronous facade: the engine owns a
//! current-thread tokio runtime and blocks on each operation. A session is
//! a staging buffer of pending upserts and removals; `save` applies the
//! whole buffer in a single transaction, so a failed batch leaves the
//! database untouched.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use sea_orm::{Database, DatabaseConnection, DbErr, RuntimeErr, TransactionTrait};

use crate::configuration::config::DbConfig;
use crate::error_handling::types::StorageError;
use crate::models::registry::{AnyEntity, EntityKind};
use crate::storage::db_entities;

/// Unit-of-work buffer: changes staged since the last commit.
#[derive(Default)]
struct Session {
    staged: Vec<AnyEntity>,
    removed: Vec<(EntityKind, String)>,
}

/// Storage engine over one database connection and at most one session.
///
/// Lifecycle: no session exists until [`reload`](DbStorage::reload); once
/// opened it is reused until [`close`](DbStorage::close), after which every
/// session-dependent operation fails with `SessionClosed` until the next
/// `reload`. Callers hold the engine by reference; `&mut self` on every
/// session-mutating operation serializes access.
pub struct DbStorage {
    rt: tokio::runtime::Runtime,
    conn: DatabaseConnection,
    session: Option<Session>,
}

impl DbStorage {
    /// Connect using environment-supplied credentials. With the test-mode
    /// flag set, every known table is dropped right after connecting.
    pub fn connect(config: &DbConfig) -> Result<Self, StorageError> {
        Self::connect_url(&config.url(), config.test_mode)
    }

    /// Open a file-backed SQLite database, creating the file if missing.
    /// The parent directory must exist.
    pub fn connect_sqlite_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().display());
        Self::connect_url(&url, false)
    }

    /// Core constructor: connect to `url`; `reset` drops every known table
    /// once the connection is established.
    pub fn connect_url(url: &str, reset: bool) -> Result<Self, StorageError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| {
                StorageError::ConnectionFailed(DbErr::Conn(RuntimeErr::Internal(e.to_string())))
            })?;
        let conn = rt
            .block_on(Database::connect(url))
            .map_err(StorageError::ConnectionFailed)?;
        if reset {
            info!("test mode: dropping every known table");
            rt.block_on(db_entities::drop_tables(&conn))
                .map_err(StorageError::SchemaFailed)?;
        }
        Ok(DbStorage {
            rt,
            conn,
            session: None,
        })
    }

    /// Every persisted entity of `kind`, or of all known kinds when `None`,
    /// keyed `"<TypeName>.<id>"`. Queries committed state live, then
    /// overlays the active session: staged upserts are visible, staged
    /// removals are not.
    pub fn all(
        &self,
        kind: Option<EntityKind>,
    ) -> Result<BTreeMap<String, AnyEntity>, StorageError> {
        let session = self.session.as_ref().ok_or(StorageError::SessionClosed)?;
        let selected;
        let kinds: &[EntityKind] = match kind {
            Some(k) => {
                selected = [k];
                &selected
            }
            None => &EntityKind::ALL,
        };

        let mut objects = BTreeMap::new();
        for k in kinds {
            for entity in self.rt.block_on(db_entities::fetch_kind(&self.conn, *k))? {
                objects.insert(entity.key(), entity);
            }
        }
        for entity in &session.staged {
            if kind.map_or(true, |k| k == entity.kind()) {
                objects.insert(entity.key(), entity.clone());
            }
        }
        for (k, id) in &session.removed {
            objects.remove(&format!("{}.{}", k.type_name(), id));
        }
        debug!("all({:?}) -> {} object(s)", kind, objects.len());
        Ok(objects)
    }

    /// Stage an entity for insertion or update at the next `save`. Staging
    /// the same key twice keeps the last write.
    pub fn add(&mut self, entity: AnyEntity) -> Result<(), StorageError> {
        let session = self.session_mut()?;
        let key = entity.key();
        session.staged.retain(|staged| staged.key() != key);
        session.staged.push(entity);
        Ok(())
    }

    /// Stage removal of `entity`; `None` is accepted and stages nothing.
    /// Takes effect at the next `save`, which fails if the row was never
    /// persisted. A staged upsert for the same key is cancelled.
    pub fn delete(&mut self, entity: Option<&AnyEntity>) -> Result<(), StorageError> {
        let session = self.session_mut()?;
        let Some(entity) = entity else {
            return Ok(());
        };
        let key = entity.key();
        session.staged.retain(|staged| staged.key() != key);
        let target = (entity.kind(), entity.id().to_owned());
        if !session.removed.contains(&target) {
            session.removed.push(target);
        }
        Ok(())
    }

    /// Commit every staged change in one transaction. On failure the whole
    /// batch rolls back and stays staged, so the caller may retry.
    pub fn save(&mut self) -> Result<(), StorageError> {
        let session = self.session.as_mut().ok_or(StorageError::SessionClosed)?;
        let conn = &self.conn;
        let staged = &session.staged;
        let removed = &session.removed;
        let result: Result<(), StorageError> = self.rt.block_on(async move {
            let txn = conn.begin().await.map_err(StorageError::CommitFailed)?;
            for entity in staged {
                if let Err(err) = db_entities::persist(&txn, entity).await {
                    let _ = txn.rollback().await;
                    return Err(StorageError::CommitFailed(err));
                }
            }
            for (kind, id) in removed {
                match db_entities::remove(&txn, *kind, id).await {
                    Ok(0) => {
                        let _ = txn.rollback().await;
                        return Err(StorageError::NotPersisted(format!(
                            "{}.{}",
                            kind.type_name(),
                            id
                        )));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        let _ = txn.rollback().await;
                        return Err(StorageError::CommitFailed(err));
                    }
                }
            }
            txn.commit().await.map_err(StorageError::CommitFailed)
        });
        result?;
        debug!(
            "committed {} upsert(s), {} removal(s)",
            session.staged.len(),
            session.removed.len()
        );
        session.staged.clear();
        session.removed.clear();
        Ok(())
    }

    /// Create any missing table from the entity definitions, then open a
    /// fresh session. Idempotent with respect to the schema; any staged
    /// changes from a previous session are discarded.
    pub fn reload(&mut self) -> Result<(), StorageError> {
        self.rt
            .block_on(db_entities::create_tables(&self.conn))
            .map_err(StorageError::SchemaFailed)?;
        self.session = Some(Session::default());
        info!("schema ensured, session opened");
        Ok(())
    }

    /// Drop the active session, discarding staged changes. Everything but
    /// `reload` is invalid until a new `reload`.
    pub fn close(&mut self) -> Result<(), StorageError> {
        if self.session.take().is_none() {
            return Err(StorageError::SessionClosed);
        }
        info!("session closed");
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut Session, StorageError> {
        self.session.as_mut().ok_or(StorageError::SessionClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::base::Entity;
    use crate::models::entities::{Amenity, City, Place, Review, State, User};
    use tempfile::TempDir;

    fn temp_storage() -> DbStorage {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.sqlite3");
        // Keep TempDir alive for the test duration
        Box::leak(Box::new(dir));
        DbStorage::connect_sqlite_file(path).unwrap()
    }

    #[test]
    fn test_all_requires_active_session() {
        let storage = temp_storage();
        assert!(matches!(storage.all(None), Err(StorageError::SessionClosed)));
    }

    #[test]
    fn test_operations_invalid_before_reload() {
        let mut storage = temp_storage();
        let state = State::new("Idaho");
        assert!(matches!(
            storage.add(state.clone().into()),
            Err(StorageError::SessionClosed)
        ));
        assert!(matches!(storage.save(), Err(StorageError::SessionClosed)));
        assert!(matches!(
            storage.delete(None),
            Err(StorageError::SessionClosed)
        ));
    }

    #[test]
    fn test_add_save_and_query_by_kind() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let state = State::new("California");
        let key = state.key();
        storage.add(state.clone().into()).unwrap();
        storage.save().unwrap();

        let states = storage.all(Some(EntityKind::State)).unwrap();
        assert_eq!(states.get(&key), Some(&AnyEntity::State(state)));
        // a filtered query of another kind does not see it
        assert!(storage.all(Some(EntityKind::City)).unwrap().is_empty());
    }

    #[test]
    fn test_all_unions_every_kind() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut state = State::new("Oregon");
        state.save(&mut storage).unwrap();
        let mut city = City::new(state.base.id.clone(), "Portland");
        city.save(&mut storage).unwrap();
        let mut user = User::new("mara@example.net", "hunter2");
        user.save(&mut storage).unwrap();

        let all = storage.all(None).unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.contains_key(&format!("State.{}", state.base.id)));
        assert!(all.contains_key(&format!("City.{}", city.base.id)));
        assert!(all.contains_key(&format!("User.{}", user.base.id)));
    }

    #[test]
    fn test_staged_changes_visible_before_commit() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let user = User::new("ansel@example.net", "hunter2");
        let key = user.key();
        storage.add(user.into()).unwrap();
        assert!(storage.all(None).unwrap().contains_key(&key));

        // never committed, so a fresh session no longer sees it
        storage.reload().unwrap();
        assert!(!storage.all(None).unwrap().contains_key(&key));
    }

    #[test]
    fn test_last_write_wins_when_staged_twice() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut amenity = Amenity::new("Wifi");
        storage.add(amenity.clone().into()).unwrap();
        amenity.name = "Fiber wifi".to_owned();
        storage.add(amenity.clone().into()).unwrap();
        storage.save().unwrap();

        let all = storage.all(Some(EntityKind::Amenity)).unwrap();
        match all.get(&amenity.key()) {
            Some(AnyEntity::Amenity(stored)) => assert_eq!(stored.name, "Fiber wifi"),
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_update_existing_row() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut state = State::new("Washington");
        state.save(&mut storage).unwrap();
        state.name = "Washington State".to_owned();
        state.save(&mut storage).unwrap();

        let all = storage.all(Some(EntityKind::State)).unwrap();
        assert_eq!(all.len(), 1);
        match all.get(&state.key()) {
            Some(AnyEntity::State(stored)) => {
                assert_eq!(stored.name, "Washington State");
                assert_eq!(stored.base.created_at, state.base.created_at);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_delete_then_save_removes_key() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut amenity = Amenity::new("Pool");
        amenity.save(&mut storage).unwrap();
        let key = amenity.key();
        assert!(storage.all(None).unwrap().contains_key(&key));

        let staged: AnyEntity = amenity.clone().into();
        storage.delete(Some(&staged)).unwrap();
        // staged removal already hides the entity
        assert!(!storage.all(None).unwrap().contains_key(&key));
        storage.save().unwrap();
        assert!(!storage.all(None).unwrap().contains_key(&key));
    }

    #[test]
    fn test_delete_nothing_is_a_no_op() {
        let mut storage = temp_storage();
        storage.reload().unwrap();
        storage.delete(None).unwrap();
        storage.save().unwrap();
        assert!(storage.all(None).unwrap().is_empty());
    }

    #[test]
    fn test_failed_batch_persists_nothing() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let state = State::new("Nevada");
        let key = state.key();
        storage.add(state.into()).unwrap();
        let ghost: AnyEntity = Amenity::new("Sauna").into();
        storage.delete(Some(&ghost)).unwrap();

        let err = storage.save().unwrap_err();
        assert!(matches!(err, StorageError::NotPersisted(_)));

        // the upsert staged alongside the failing removal was rolled back
        storage.reload().unwrap();
        assert!(!storage.all(None).unwrap().contains_key(&key));
    }

    #[test]
    fn test_save_refreshes_updated_at() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut state = State::new("Wyoming");
        assert_eq!(state.base.created_at, state.base.updated_at);
        std::thread::sleep(std::time::Duration::from_millis(2));
        state.save(&mut storage).unwrap();
        assert!(state.base.updated_at > state.base.created_at);

        match storage
            .all(Some(EntityKind::State))
            .unwrap()
            .remove(&state.key())
        {
            Some(AnyEntity::State(stored)) => {
                assert_eq!(stored.base.updated_at, state.base.updated_at);
            }
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_place_and_review_survive_storage() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut state = State::new("Oregon");
        state.save(&mut storage).unwrap();
        let mut city = City::new(state.base.id.clone(), "Ashland");
        city.save(&mut storage).unwrap();
        let mut host = User::new("noa@example.net", "hunter2");
        host.save(&mut storage).unwrap();

        let mut place = Place::new(city.base.id.clone(), host.base.id.clone(), "Creek Cabin");
        place.description = Some("Two rooms by the creek".to_owned());
        place.number_rooms = 2;
        place.max_guest = 4;
        place.price_by_night = 95;
        place.latitude = Some(42.19);
        place.longitude = Some(-122.70);
        place.save(&mut storage).unwrap();

        let mut review = Review::new(
            place.base.id.clone(),
            host.base.id.clone(),
            "Quiet and clean",
        );
        review.save(&mut storage).unwrap();

        let mut all = storage.all(None).unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all.remove(&place.key()), Some(AnyEntity::Place(place)));
        assert_eq!(all.remove(&review.key()), Some(AnyEntity::Review(review)));
    }

    #[test]
    fn test_entity_delete_commits_removal() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut user = User::new("finn@example.net", "hunter2");
        user.save(&mut storage).unwrap();
        user.delete(&mut storage).unwrap();
        assert!(storage.all(None).unwrap().is_empty());

        // deleting it again fails loudly
        let err = user.delete(&mut storage).unwrap_err();
        assert!(matches!(err, StorageError::NotPersisted(_)));
    }

    #[test]
    fn test_close_invalidates_session() {
        let mut storage = temp_storage();
        storage.reload().unwrap();
        storage.close().unwrap();

        assert!(matches!(storage.all(None), Err(StorageError::SessionClosed)));
        assert!(matches!(storage.save(), Err(StorageError::SessionClosed)));
        assert!(matches!(storage.close(), Err(StorageError::SessionClosed)));

        storage.reload().unwrap();
        assert!(storage.all(None).unwrap().is_empty());
    }

    #[test]
    fn test_reload_is_idempotent_and_keeps_rows() {
        let mut storage = temp_storage();
        storage.reload().unwrap();

        let mut state = State::new("Montana");
        state.save(&mut storage).unwrap();
        storage.reload().unwrap();
        storage.reload().unwrap();
        assert!(storage.all(None).unwrap().contains_key(&state.key()));
    }

    #[test]
    fn test_reset_drops_persisted_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reset.sqlite3");
        let url = format!("sqlite://{}?mode=rwc", path.display());
        {
            let mut storage = DbStorage::connect_url(&url, false).unwrap();
            storage.reload().unwrap();
            let mut state = State::new("Alaska");
            state.save(&mut storage).unwrap();
            assert_eq!(storage.all(None).unwrap().len(), 1);
        }

        let mut storage = DbStorage::connect_url(&url, true).unwrap();
        storage.reload().unwrap();
        assert!(storage.all(None).unwrap().is_empty());
    }
}
