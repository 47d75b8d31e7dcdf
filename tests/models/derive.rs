use kvmodel::{Attribute, Model};
use serde_json::json;

use crate::support::{Audit, User};

#[derive(Clone, serde::Serialize, serde::Deserialize, Model)]
struct Renamed {
    #[serde(rename = "_id")]
    #[model(primary)]
    key: Option<String>,
    #[serde(skip)]
    cache: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    note: Option<String>,
}

#[test]
fn defaults_come_from_the_struct() {
    assert_eq!(User::MODEL_NAME, "User");
    assert_eq!(User::PRIMARY_KEY, "id");
    assert!(!User::READONLY);
    assert_eq!(
        User::attributes(),
        &[
            Attribute::new("id"),
            Attribute::new("name"),
            Attribute::indexed("email"),
        ]
    );
}

#[test]
fn struct_attributes_override_defaults() {
    assert_eq!(Audit::MODEL_NAME, "AuditEntry");
    assert_eq!(Audit::PRIMARY_KEY, "seq");
    assert!(Audit::READONLY);
}

#[test]
fn string_primary_keys() {
    let mut audit = Audit::create(json!({ "seq": "", "action": "login" })).unwrap();
    assert_eq!(audit.primary(), None);
    audit.set_primary("a1".into());
    assert_eq!(audit.primary(), Some("a1"));
}

#[test]
fn serde_renames_and_skips_are_honored() {
    assert_eq!(Renamed::PRIMARY_KEY, "_id");
    let names: Vec<_> = Renamed::attributes().iter().map(|a| a.name).collect();
    assert_eq!(names, vec!["_id", "note"]);

    let record = Renamed::create(json!({ "_id": "r1" })).unwrap();
    assert_eq!(record.primary(), Some("r1"));
    assert!(record.cache.is_empty());
}

#[test]
fn validate_hook_is_wired() {
    let user = User::create(json!({ "name": "  " })).unwrap();
    assert_eq!(user.validate(), Err("name is required".to_string()));
    assert!(!user.is_valid());
}
