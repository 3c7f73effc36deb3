//! Behavior shared by both backends, exercised through independent instances

use hbnb::config::StorageConfig;
use hbnb::facade;
use hbnb::models::{Entity, Model, State, User};
use hbnb::{StorageBackend, StorageError};
use tempfile::{tempdir, TempDir};

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .with_test_writer()
        .try_init();
}

/// A file config and a database config rooted in a fresh directory.
fn configs() -> (TempDir, Vec<StorageConfig>) {
    init_logging();
    let dir = tempdir().expect("tempdir");
    let configs = vec![
        StorageConfig::file(dir.path().join("file.json")),
        StorageConfig::db(dir.path().join("hbnb.db")),
    ];
    (dir, configs)
}

fn open(config: &StorageConfig) -> Box<dyn StorageBackend> {
    facade::open(config).expect("open backend")
}

fn user(email: &str) -> User {
    let mut user = User::new(email).with_name("Betty", "Holberton");
    user.set_password("pwd").expect("hash");
    user
}

#[test]
fn test_saved_state_survives_restart() {
    let (_dir, configs) = configs();
    for config in &configs {
        let mut storage = open(config);
        let state = State::new("Texas");
        storage.new(state.clone().into()).unwrap();
        storage.save().unwrap();

        let fresh = open(config);
        let back: State = fresh
            .get("State", state.id())
            .unwrap()
            .expect("state after restart")
            .downcast()
            .unwrap();
        assert_eq!(back.name.as_deref(), Some("Texas"), "{}", config.backend);
        assert_eq!(back.base.created_at, state.base.created_at);
    }
}

#[test]
fn test_unsaved_user_not_visible_elsewhere() {
    let (_dir, configs) = configs();
    for config in &configs {
        let mut storage = open(config);
        let pending = user("pending@hbnb.io");
        storage.new(pending.clone().into()).unwrap();
        assert!(storage.get("User", pending.id()).unwrap().is_some());

        let other = open(config);
        assert!(
            other.get("User", pending.id()).unwrap().is_none(),
            "{}",
            config.backend
        );
    }
}

#[test]
fn test_delete_then_save_is_durable() {
    let (_dir, configs) = configs();
    for config in &configs {
        let mut storage = open(config);
        let state = State::new("Nevada");
        let model: Model = state.clone().into();
        storage.new(model.clone()).unwrap();
        storage.save().unwrap();

        storage.delete(Some(&model)).unwrap();
        storage.delete(None).unwrap();
        storage.save().unwrap();
        storage.reload().unwrap();

        let key = format!("State.{}", state.id());
        assert!(!storage.all(None).unwrap().contains_key(&key));
        assert!(!open(config).all(None).unwrap().contains_key(&key));
    }
}

#[test]
fn test_count_matches_all() {
    let (_dir, configs) = configs();
    for config in &configs {
        let mut storage = open(config);
        for name in ["Ohio", "Iowa", "Utah"] {
            storage.new(State::new(name).into()).unwrap();
        }
        storage.new(user("a@hbnb.io").into()).unwrap();
        storage.save().unwrap();

        for cls in [None, Some(""), Some("State"), Some("User"), Some("Review"), Some("Nope")] {
            assert_eq!(
                storage.count(cls).unwrap(),
                storage.all(cls).unwrap().len(),
                "{} {cls:?}",
                config.backend
            );
        }
        assert_eq!(storage.count(Some("State")).unwrap(), 3);
        assert_eq!(storage.all(Some("")).unwrap(), storage.all(None).unwrap());
    }
}

#[test]
fn test_all_keys_are_type_dot_id() {
    let (_dir, configs) = configs();
    for config in &configs {
        let mut storage = open(config);
        storage.new(State::new("Maine").into()).unwrap();
        storage.new(user("k@hbnb.io").into()).unwrap();

        for (key, obj) in storage.all(None).unwrap() {
            assert_eq!(key, format!("{}.{}", obj.kind(), obj.id()));
        }
    }
}

#[test]
fn test_unknown_lookups_degrade() {
    let (_dir, configs) = configs();
    for config in &configs {
        let storage = open(config);
        assert!(storage.get("User", "test").unwrap().is_none());
        assert!(storage.get("test", "random").unwrap().is_none());
        assert!(storage.all(Some("Galaxy")).unwrap().is_empty());
    }
}

#[test]
fn test_password_hash_survives_restart() {
    let (_dir, configs) = configs();
    for config in &configs {
        let mut storage = open(config);
        let betty = user("betty@hbnb.io");
        storage.new(betty.clone().into()).unwrap();
        storage.save().unwrap();

        let back: User = open(config)
            .get("User", betty.id())
            .unwrap()
            .unwrap()
            .downcast()
            .unwrap();
        assert_eq!(back.password, betty.password);
        assert!(back.verify_password("pwd"));
        assert_eq!(back.first_name.as_deref(), Some("Betty"));
    }
}

#[test]
fn test_malformed_file_fails_reload() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.json");
    std::fs::write(&path, "{not json").unwrap();

    let err = facade::open(&StorageConfig::file(&path)).unwrap_err();
    assert!(matches!(err, StorageError::Malformed { .. }));

    std::fs::write(&path, r#"{"Ship.1": {"__class__": "Ship", "id": "1"}}"#).unwrap();
    let err = facade::open(&StorageConfig::file(&path)).unwrap_err();
    assert!(matches!(err, StorageError::UnknownClass(_)));

    std::fs::write(&path, r#"{"State.x": {"__class__": "State", "id": ""}}"#).unwrap();
    let err = facade::open(&StorageConfig::file(&path)).unwrap_err();
    assert!(matches!(err, StorageError::Malformed { .. }));
}
