//! Shared test models and helpers.

use std::sync::Arc;

use kvmodel::{attach, Attachment, MemoryStore, Model};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Model)]
#[model(validate = validate_user)]
pub struct User {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[model(index)]
    #[serde(default)]
    pub email: Option<String>,
}

fn validate_user(user: &User) -> Result<(), String> {
    if user.name.trim().is_empty() {
        return Err("name is required".into());
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Model)]
#[model(name = "AuditEntry", readonly)]
pub struct Audit {
    #[model(primary)]
    pub seq: String,
    pub action: String,
}

pub fn users() -> (MemoryStore, Attachment<User, MemoryStore>) {
    let store = MemoryStore::new();
    let users = attach(Arc::new(store.clone())).unwrap();
    (store, users)
}

pub fn users_with_generator(key: &'static str) -> (MemoryStore, Attachment<User, MemoryStore>) {
    let store = MemoryStore::new().with_key_generator(move || key.to_string());
    let users = attach(Arc::new(store.clone())).unwrap();
    (store, users)
}
