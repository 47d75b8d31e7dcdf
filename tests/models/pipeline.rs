use kvmodel::{Capability, KvStore, ModelError, PutValue, WriteOptions};
use serde_json::json;

use crate::support::{users, users_with_generator, User};

#[tokio::test]
async fn generated_key_scenario() {
    let (store, users) = users_with_generator("k1");

    let record = users.put_record(None, json!({ "name": "a" })).await.unwrap();
    assert_eq!(record, json!({ "id": "k1", "name": "a", "email": null }));

    let user = users.find("k1").await.unwrap();
    assert_eq!(user.id.as_deref(), Some("k1"));
    assert_eq!(store.get("k1").await.unwrap()["name"], "a");
}

#[tokio::test]
async fn nothing_runs_before_the_future_is_polled() {
    let (store, users) = users();

    let good = users.put(Some("u1"), json!({ "name": "ada" }), WriteOptions::default());
    let bad = users.put(Some("u2"), json!({ "name": "" }), WriteOptions::default());
    assert!(store.is_empty());

    drop(bad);
    good.await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn stored_primary_key_always_matches_the_storage_key() {
    let (store, users) = users();
    for key in ["a", "b", "c"] {
        users
            .put_record(Some(key), json!({ "id": "overwritten", "name": key }))
            .await
            .unwrap();
    }
    for key in ["a", "b", "c"] {
        assert_eq!(store.get(key).await.unwrap()["id"], key);
    }
}

#[tokio::test]
async fn instances_must_agree_with_the_key() {
    let (store, users) = users();
    let user = users.create(json!({ "id": "u1", "name": "ada" })).unwrap();

    let err = users
        .put(Some("u2"), PutValue::Instance(user.clone()), WriteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ModelError::PrimaryKeyMismatch { .. }));
    assert!(store.is_empty());

    users.put_record(Some("u1"), user).await.unwrap();
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn keyless_writes_need_a_generator() {
    let store = kvmodel::MemoryStore::new().without(Capability::GenerateKey);
    let users = kvmodel::attach::<User, _>(std::sync::Arc::new(store.clone())).unwrap();

    let err = users.put_record(None, json!({ "name": "ada" })).await.unwrap_err();
    assert_eq!(err, ModelError::PrimaryKeyRequired);
    assert!(store.is_empty());
}

#[tokio::test]
async fn invalid_models_never_reach_the_store() {
    let (store, users) = users();
    let err = users
        .put_record(Some("u1"), json!({ "name": " " }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::InvalidModel {
            model: "User",
            reason: "name is required".into(),
        }
    );
    assert!(store.is_empty());
}

#[tokio::test]
async fn batch_and_del_pass_through() {
    let (store, users) = users();
    users
        .batch(vec![
            kvmodel::BatchOp::Put { key: "x".into(), value: json!("raw") },
            kvmodel::BatchOp::Put { key: "y".into(), value: json!(1) },
        ])
        .await
        .unwrap();
    assert_eq!(users.get("x").await.unwrap(), json!("raw"));

    users.del("x").await.unwrap();
    users.del("missing").await.unwrap();
    assert_eq!(store.len(), 1);
}
