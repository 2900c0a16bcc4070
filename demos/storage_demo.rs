use std::env;
use std::fs;
use std::path::PathBuf;

use casita::models::entities::{Amenity, City, Place, State, User};
use casita::{DbConfig, DbStorage, Entity, EntityKind};
use env_logger::Env;
use log::info;

fn main() {
    // Initialize logger (RUST_LOG can override; default to info)
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info")).try_init();

    // Prefer environment credentials when present, fall back to a local
    // SQLite file under target/
    let mut storage = match DbConfig::from_env() {
        Ok(config) => {
            info!("Connecting with {} credentials", DbConfig::HOST_VAR);
            DbStorage::connect(&config).expect("connect (env)")
        }
        Err(_) => {
            let out_dir: PathBuf = env::current_dir()
                .expect("cwd")
                .join("target")
                .join("storage_demo");
            fs::create_dir_all(&out_dir).expect("create output dir");
            let db_path = out_dir.join("storage_demo.sqlite3");
            info!("Using SQLite database at {}", db_path.display());
            DbStorage::connect_sqlite_file(&db_path).expect("connect (file)")
        }
    };

    storage.reload().expect("reload");

    // Build a small object graph and persist it entity by entity
    let mut state = State::new("Oregon");
    state.save(&mut storage).expect("save state");
    info!("{}", state);

    let mut city = City::new(state.base.id.clone(), "Portland");
    city.save(&mut storage).expect("save city");

    let mut host = User::new("demo@example.net", "demo-password");
    host.first_name = Some("Demo".to_owned());
    host.save(&mut storage).expect("save user");

    let mut place = Place::new(city.base.id.clone(), host.base.id.clone(), "Rose Loft");
    place.description = Some("Walkable corner unit".to_owned());
    place.number_rooms = 2;
    place.price_by_night = 120;
    place.save(&mut storage).expect("save place");

    let mut wifi = Amenity::new("Wifi");
    wifi.save(&mut storage).expect("save amenity");

    // Query back: filtered, then the union across every known kind
    let places = storage.all(Some(EntityKind::Place)).expect("query places");
    info!("Place count: {}", places.len());

    let everything = storage.all(None).expect("query all");
    for (key, entity) in &everything {
        info!("{} -> {}", key, serde_json::to_string(&entity.to_document()).expect("render"));
    }

    // Remove the amenity again and show the union shrinking
    wifi.delete(&mut storage).expect("delete amenity");
    let remaining = storage.all(None).expect("query all");
    info!(
        "Objects after delete: {} (was {})",
        remaining.len(),
        everything.len()
    );

    storage.close().expect("close");
    info!("Demo complete");
}
