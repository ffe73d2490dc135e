//! Repository behaviour against the file-backed store.

mod common;

use serde_json::{Value, json};

use docrepo::{EntityConfig, Error, Loader, Outcome, Repository};
use docrepo_core::error::{ConfigError, InvalidInputError};
use docrepo_core::{CollectionName, DocumentId, DocumentStore, Fields};
use docrepo_file::FileStore;

use common::{Note, User, note_config, temp_store, user_config};

fn fields(value: Value) -> Fields {
    value.as_object().cloned().unwrap()
}

#[tokio::test]
async fn test_create_with_empty_id_assigns_key_and_version() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();

    let mut user = User::new("", "ada", 36);
    user.version = 9;
    let outcome = users.create(&mut user).await.unwrap();

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(outcome.affected(), 1);
    assert!(!user.id.is_empty());
    assert_eq!(user.version, 1);
    assert!(user.created_at.is_some());
    assert_eq!(user.created_at, user.updated_at);
}

#[tokio::test]
async fn test_create_then_load_roundtrip() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store.clone(), user_config()).unwrap();

    let mut user = User::new("u1", "grace", 45);
    users.create(&mut user).await.unwrap();

    let loaded = users.load("u1").await.unwrap().unwrap();
    assert_eq!(loaded.id, user.id);
    assert_eq!(loaded.name, user.name);
    assert_eq!(loaded.age, user.age);
    assert_eq!(loaded.version, 1);
    assert_eq!(loaded.created_at, user.created_at);
    assert_eq!(loaded.updated_at, user.updated_at);

    // Stored under the wire name, without ignored fields.
    let doc = store
        .get(&CollectionName::new("users").unwrap(), &DocumentId::new("u1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        Value::Object(doc.fields),
        json!({"full_name": "grace", "age": 45, "version": 1})
    );
}

#[tokio::test]
async fn test_create_existing_is_unaffected() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();

    users.create(&mut User::new("u1", "a", 1)).await.unwrap();
    let mut second = User::new("u1", "b", 2);
    second.version = 7;
    let outcome = users.create(&mut second).await.unwrap();

    assert_eq!(outcome, Outcome::Unaffected);
    assert_eq!(second.version, 7);
    assert_eq!(users.load("u1").await.unwrap().unwrap().name, "a");
}

#[tokio::test]
async fn test_stale_update_conflicts() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();
    users.create(&mut User::new("u1", "ada", 36)).await.unwrap();

    let mut first = users.load("u1").await.unwrap().unwrap();
    let mut second = users.load("u1").await.unwrap().unwrap();

    first.age = 37;
    assert_eq!(users.update(&mut first).await.unwrap(), Outcome::Applied);
    assert_eq!(first.version, 2);

    second.age = 99;
    let outcome = users.update(&mut second).await.unwrap();
    assert_eq!(outcome, Outcome::Conflict);
    assert_eq!(outcome.affected(), -1);
    assert_eq!(second.version, 1);

    let stored = users.load("u1").await.unwrap().unwrap();
    assert_eq!(stored.age, 37);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_concurrent_updates_apply_exactly_once() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();
    users.create(&mut User::new("u1", "ada", 36)).await.unwrap();

    let mut a = users.load("u1").await.unwrap().unwrap();
    let mut b = a.clone();
    a.age = 1;
    b.age = 2;

    let (ra, rb) = tokio::join!(users.update(&mut a), users.update(&mut b));
    let mut outcomes = vec![ra.unwrap().affected(), rb.unwrap().affected()];
    outcomes.sort();

    assert_eq!(outcomes, vec![-1, 1]);
    assert_eq!(users.load("u1").await.unwrap().unwrap().version, 2);
}

#[tokio::test]
async fn test_update_absent_and_empty_id() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();

    let outcome = users.update(&mut User::new("ghost", "x", 1)).await.unwrap();
    assert_eq!(outcome, Outcome::Unaffected);

    let err = users.update(&mut User::new("", "x", 1)).await.unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidInput(InvalidInputError::DocumentId { .. })
    ));
}

#[tokio::test]
async fn test_update_without_version_replaces() {
    let (_dir, store) = temp_store();
    let notes = Repository::<Note, FileStore>::new(store, note_config()).unwrap();

    let mut note = Note {
        key: "n1".to_string(),
        body: "draft".to_string(),
    };
    notes.create(&mut note).await.unwrap();

    note.body = "final".to_string();
    assert_eq!(notes.update(&mut note).await.unwrap(), Outcome::Applied);
    assert_eq!(notes.load("n1").await.unwrap().unwrap().body, "final");
}

#[tokio::test]
async fn test_save_creates_then_checks_version() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();

    let mut user = User::new("u1", "ada", 36);
    user.version = 5;
    assert_eq!(users.save(&mut user).await.unwrap(), Outcome::Applied);
    assert_eq!(user.version, 1);

    user.age = 40;
    assert_eq!(users.save(&mut user).await.unwrap(), Outcome::Applied);
    assert_eq!(user.version, 2);

    let mut stale = user.clone();
    stale.version = 1;
    assert_eq!(users.save(&mut stale).await.unwrap(), Outcome::Conflict);

    let mut fresh = User::new("", "auto", 1);
    assert_eq!(users.save(&mut fresh).await.unwrap(), Outcome::Applied);
    assert!(!fresh.id.is_empty());
}

#[tokio::test]
async fn test_patch_advances_version_and_maps_names() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();
    users.create(&mut User::new("u1", "ada", 36)).await.unwrap();

    let mut patch = fields(json!({"id": "u1", "name": "Ada L.", "version": 1}));
    assert_eq!(users.patch(&mut patch).await.unwrap(), Outcome::Applied);

    assert_eq!(patch.get("version"), Some(&json!(2)));
    assert_eq!(patch.get("id"), Some(&json!("u1")));
    assert!(patch.get("updated_at").is_some_and(Value::is_string));

    let stored = users.load("u1").await.unwrap().unwrap();
    assert_eq!(stored.name, "Ada L.");
    assert_eq!(stored.age, 36);
    assert_eq!(stored.version, 2);
}

#[tokio::test]
async fn test_patch_with_text_version_keeps_stored_number() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store.clone(), user_config()).unwrap();
    users.create(&mut User::new("u1", "ada", 36)).await.unwrap();

    let mut patch = fields(json!({"id": "u1", "age": 40, "version": "1"}));
    assert_eq!(users.patch(&mut patch).await.unwrap(), Outcome::Applied);
    assert_eq!(patch.get("version"), Some(&json!(2)));

    let raw = store
        .get(&CollectionName::new("users").unwrap(), &DocumentId::new("u1").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(raw.fields.get("version"), Some(&json!(2)));

    let stored = users.load("u1").await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.age, 40);
}

#[tokio::test]
async fn test_stale_patch_conflicts_and_keeps_version() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();
    let mut user = User::new("u1", "ada", 36);
    users.create(&mut user).await.unwrap();
    users.update(&mut user).await.unwrap();

    let mut patch = fields(json!({"id": "u1", "age": 50, "version": 1}));
    let outcome = users.patch(&mut patch).await.unwrap();

    assert_eq!(outcome, Outcome::Conflict);
    assert_eq!(patch.get("version"), Some(&json!(1)));
    let stored = users.load("u1").await.unwrap().unwrap();
    assert_eq!(stored.version, 2);
    assert_eq!(stored.age, 36);
}

#[tokio::test]
async fn test_patch_requires_id_and_version() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();
    users.create(&mut User::new("u1", "ada", 36)).await.unwrap();

    let err = users
        .patch(&mut fields(json!({"age": 1})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidInput(InvalidInputError::MissingField { ref field }) if field == "id"
    ));

    let err = users
        .patch(&mut fields(json!({"id": "u1", "age": 1})))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::InvalidInput(InvalidInputError::MissingField { ref field }) if field == "version"
    ));

    let outcome = users
        .patch(&mut fields(json!({"id": "ghost", "version": 1})))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Unaffected);
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store, user_config()).unwrap();
    users.create(&mut User::new("u1", "ada", 36)).await.unwrap();

    assert_eq!(users.delete("u1").await.unwrap().affected(), 1);
    assert_eq!(users.delete("u1").await.unwrap().affected(), 0);
    assert_eq!(users.delete("never").await.unwrap().affected(), 0);
    assert!(!users.exist("u1").await.unwrap());
}

#[tokio::test]
async fn test_repository_requires_identifier() {
    #[derive(serde::Serialize, serde::Deserialize)]
    struct Event {
        kind: String,
    }

    impl docrepo::Entity for Event {
        fn fields() -> Vec<docrepo::Field<Self>> {
            vec![docrepo::Field::other("kind")]
        }
    }

    let (_dir, store) = temp_store();
    let config = EntityConfig::new("events").unwrap();

    let err = Repository::<Event, FileStore>::new(store.clone(), config.clone())
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::Configuration(ConfigError::MissingIdField { .. })
    ));

    // Reads without identity still work.
    let events = Loader::<Event, FileStore>::new(store, config).unwrap();
    assert!(events.all().await.unwrap().is_empty());
    assert!(events.load("x").await.is_err());
}

#[tokio::test]
async fn test_mistyped_version_is_rejected() {
    let (_dir, store) = temp_store();
    let config = EntityConfig::new("users").unwrap().version("name");

    let err = Repository::<User, FileStore>::new(store, config)
        .err()
        .unwrap();
    assert!(matches!(
        err,
        Error::Configuration(ConfigError::FieldType { .. })
    ));
}

#[tokio::test]
async fn test_loader_queries_and_map_hook() {
    let (_dir, store) = temp_store();
    let users = Repository::<User, FileStore>::new(store.clone(), user_config()).unwrap();
    for (id, name, age) in [("a", "ann", 30), ("b", "bob", 40), ("c", "cid", 50)] {
        users.create(&mut User::new(id, name, age)).await.unwrap();
    }

    assert!(users.exist("b").await.unwrap());
    assert!(!users.exist("z").await.unwrap());

    let all = users.all().await.unwrap();
    let ids: Vec<_> = all.iter().map(|u| u.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);

    let found = users
        .find_in("name", vec![json!("ann"), json!("cid")])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);

    let shouting = Loader::<User, FileStore>::new(store, user_config())
        .unwrap()
        .with_map(|u| u.name = u.name.to_uppercase());
    assert_eq!(shouting.load("b").await.unwrap().unwrap().name, "BOB");
}
