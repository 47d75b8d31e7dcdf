use std::sync::Arc;

use kvmodel::{attach, AttachExt, KvStore, MemoryStore, ModelError, ModelExt, ScanIndex};
use serde_json::json;

use crate::support::{users, users_with_generator, Audit, User};

#[tokio::test]
async fn save_assigns_a_key_to_new_instances() {
    let (store, users) = users_with_generator("gen-1");
    let user = users.create(json!({ "name": "ada" })).unwrap();
    assert!(store.is_empty());

    let record = user.save(&users).await.unwrap();
    assert_eq!(record["id"], "gen-1");
    assert_eq!(users.find("gen-1").await.unwrap().name, "ada");
}

#[tokio::test]
async fn update_overwrites_in_place() {
    let (store, users) = users();
    let mut user = users.create(json!({ "id": "u1", "name": "ada" })).unwrap();
    users.save(&user).await.unwrap();

    user.email = Some("ada@example.com".into());
    users.update(&user).await.unwrap();

    assert_eq!(store.len(), 1);
    assert_eq!(
        users.find("u1").await.unwrap().email.as_deref(),
        Some("ada@example.com")
    );
}

#[tokio::test]
async fn remove_by_key_or_instance() {
    let (store, users) = users();
    let ada = users.create(json!({ "id": "u1", "name": "ada" })).unwrap();
    let bob = users.create(json!({ "id": "u2", "name": "bob" })).unwrap();
    ada.save(&users).await.unwrap();
    bob.save(&users).await.unwrap();

    users.remove("u1").await.unwrap();
    bob.remove(&users).await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn find_reports_missing_records() {
    let (_store, users) = users();
    let err = users.find("ghost").await.unwrap_err();
    assert_eq!(
        err,
        ModelError::NotFound {
            model: "User",
            id: "ghost".into(),
        }
    );
    assert_eq!(err.to_string(), "Unable to find User with id: ghost");
}

#[tokio::test]
async fn secondary_lookups_use_registered_accessors() {
    let (store, users) = users();
    users
        .put_record(Some("u1"), json!({ "name": "ada", "email": "ada@example.com" }))
        .await
        .unwrap();

    assert!(matches!(
        users.find_by("email", "ada@example.com").await,
        Err(ModelError::AttributeIndexMissing { .. })
    ));

    let index = ScanIndex::new(Arc::new(store.clone()), "email");
    store.register_index(index.accessor_name(), Arc::new(index)).unwrap();

    let found = users.find_by("email", "ada@example.com").await.unwrap();
    assert_eq!(found.id.as_deref(), Some("u1"));

    users.remove_by("email", "ada@example.com").await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn readonly_models_still_read() {
    let store = Arc::new(MemoryStore::new());
    let audits = store.attach::<Audit>().unwrap();
    assert!(audits.is_readonly());
    assert!(!audits.methods().contains("put"));

    store
        .put("a1", json!({ "seq": "a1", "action": "login" }), Default::default())
        .await
        .unwrap();
    assert_eq!(audits.find("a1").await.unwrap().action, "login");
}

#[tokio::test]
async fn detached_models_fail_every_operation() {
    let store = Arc::new(MemoryStore::new());
    let mut users = attach::<User, _>(Arc::clone(&store)).unwrap();

    let original = users.detach().unwrap();
    assert!(Arc::ptr_eq(&original, &store));
    assert!(users.detach().is_none());

    assert_eq!(users.find("u1").await.unwrap_err(), ModelError::Detached);
    assert_eq!(
        users.put_record(Some("u1"), json!({ "name": "a" })).await.unwrap_err(),
        ModelError::Detached
    );
    assert!(users.query(Default::default()).is_err());

    // The original handle is untouched and can be attached again.
    let again = original.attach::<User>().unwrap();
    again.put_record(Some("u1"), json!({ "name": "a" })).await.unwrap();
    assert_eq!(store.len(), 1);
}
