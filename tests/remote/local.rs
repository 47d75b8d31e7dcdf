use kvmodel::{AttachExt, Capability, KvStore, ModelError, ModelExt, ReadOptions, StoreError};
use serde_json::json;
use tokio_stream::StreamExt;

use crate::support::{client, host, Todo};

#[tokio::test]
async fn client_attachments_skip_local_interception() {
    let store = kvmodel::MemoryStore::new();
    let todos = client(host(&store)).await.attach::<Todo>().unwrap();

    assert!(!todos.intercepts_writes());
    assert_eq!(
        todos.methods().names(),
        vec!["createLiveStream", "createReadStream"]
    );
}

#[tokio::test]
async fn writes_are_validated_by_the_host() {
    let store = kvmodel::MemoryStore::new();
    let todos = client(host(&store)).await.attach::<Todo>().unwrap();

    let record = todos
        .put_record(Some("t1"), json!({ "title": "write tests" }))
        .await
        .unwrap();
    assert_eq!(record["id"], "t1");
    assert_eq!(store.get("t1").await.unwrap()["title"], "write tests");

    let err = todos
        .put_record(Some("t2"), json!({ "title": "" }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::InvalidModel {
            model: "Todo",
            reason: "title must not be empty".into(),
        }
    );
    assert!(store.get("t2").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn keyless_client_writes_use_the_host_generator() {
    let store = kvmodel::MemoryStore::new().with_key_generator(|| "k1".to_string());
    let client = client(host(&store)).await;
    assert!(!client.supports(Capability::GenerateKey));

    let todos = client.attach::<Todo>().unwrap();
    let record = todos
        .put_record(None, json!({ "title": "untracked" }))
        .await
        .unwrap();
    assert_eq!(record["id"], "k1");
    assert_eq!(store.get("k1").await.unwrap()["title"], "untracked");

    let todo = todos.create(json!({ "title": "saved" })).unwrap();
    todo.save(&todos).await.unwrap();
    assert_eq!(store.get("k1").await.unwrap()["title"], "saved");
}

#[tokio::test]
async fn keyless_client_writes_fail_without_a_host_generator() {
    let store = kvmodel::MemoryStore::new().without(Capability::GenerateKey);
    let todos = client(host(&store)).await.attach::<Todo>().unwrap();

    let err = todos
        .put_record(Some(""), json!({ "title": "untracked" }))
        .await
        .unwrap_err();
    assert_eq!(err, ModelError::PrimaryKeyRequired);
    assert!(store.is_empty());
}

#[tokio::test]
async fn crud_round_trip_over_the_transport() {
    let store = kvmodel::MemoryStore::new();
    let todos = client(host(&store)).await.attach::<Todo>().unwrap();

    let mut todo = todos
        .create(json!({ "id": "t1", "title": "ship it" }))
        .unwrap();
    todo.save(&todos).await.unwrap();

    todo.done = true;
    todo.update(&todos).await.unwrap();
    assert!(todos.find("t1").await.unwrap().done);

    todo.remove(&todos).await.unwrap();
    let err = todos.find("t1").await.unwrap_err();
    assert_eq!(err.to_string(), "Unable to find Todo with id: t1");
}

#[tokio::test]
async fn query_projects_remote_streams() {
    let store = kvmodel::MemoryStore::new();
    let todos = client(host(&store)).await.attach::<Todo>().unwrap();
    for (id, title) in [("t1", "a"), ("t2", "b")] {
        todos
            .put_record(Some(id), json!({ "title": title }))
            .await
            .unwrap();
    }

    let titles: Vec<String> = todos
        .query(ReadOptions::new())
        .unwrap()
        .into_models()
        .map(|todo| todo.unwrap().title)
        .collect()
        .await;
    assert_eq!(titles, vec!["a", "b"]);
}

#[tokio::test]
async fn tail_observes_host_side_writes() {
    let store = kvmodel::MemoryStore::new();
    let host = host(&store);
    let todos = client(host.clone()).await.attach::<Todo>().unwrap();

    let mut feed = todos.tail(ReadOptions::new().old(false)).unwrap();
    host.attachment()
        .put_record(Some("t9"), json!({ "title": "from host" }))
        .await
        .unwrap();

    match feed.next().await {
        Some(Ok(kvmodel::Item::Entry { key, value: Some(todo) })) => {
            assert_eq!(key, "t9");
            assert_eq!(todo.title, "from host");
        }
        other => panic!("unexpected item: {:?}", other),
    }
}

#[tokio::test]
async fn readonly_hosts_refuse_client_writes() {
    let store = kvmodel::MemoryStore::new();
    let users = std::sync::Arc::new(store.clone())
        .attach_with::<Todo>(kvmodel::AttachOptions::new().readonly(true))
        .unwrap();
    let host = std::sync::Arc::new(kvmodel::remote::RemoteHost::new(users));
    let client = client(host).await;

    assert!(!client.supports(Capability::Put));
    let todos = client.attach::<Todo>().unwrap();
    let err = todos
        .put_record(Some("t1"), json!({ "title": "nope" }))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::Store(StoreError::Backend("unknown method: put".into()))
    );
    assert!(store.is_empty());
}
