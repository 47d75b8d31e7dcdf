use std::sync::Arc;

use kvmodel::remote::{ClientStore, LocalTransport, RemoteHost};
use kvmodel::{attach, MemoryStore, Model};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Model)]
#[model(validate = validate_todo)]
pub struct Todo {
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub done: bool,
}

fn validate_todo(todo: &Todo) -> Result<(), String> {
    if todo.title.is_empty() {
        return Err("title must not be empty".into());
    }
    Ok(())
}

pub type Host = RemoteHost<Todo, MemoryStore>;
pub type Client = ClientStore<LocalTransport<Todo, MemoryStore>>;

pub fn host(store: &MemoryStore) -> Arc<Host> {
    Arc::new(RemoteHost::new(attach(Arc::new(store.clone())).unwrap()))
}

pub async fn client(host: Arc<Host>) -> Arc<Client> {
    let transport = Arc::new(LocalTransport::new(host));
    Arc::new(ClientStore::connect(transport).await.unwrap())
}
