//! Models - typed records stored in a key-value store.
//!
//! A model describes its attributes, names its primary-key attribute, and
//! knows how to validate and serialize itself. Stored records are plain
//! JSON objects; [`Model::create`] lifts one back into an instance.
//!
//! ## Example
//!
//! ```ignore
//! use kvmodel::Model;
//!
//! #[derive(Serialize, Deserialize, Clone, Model)]
//! #[model(name = "User")]
//! struct User {
//!     #[model(primary)]
//!     pub id: Option<String>,
//!     #[model(index)]
//!     pub email: String,
//! }
//!
//! let user = User::create(json!({ "id": "u1", "email": "a@b.c" }))?;
//! assert_eq!(user.primary(), Some("u1"));
//! ```

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::ModelError;

/// Definition of one model attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute {
    pub name: &'static str,
    /// Whether the attribute is declared as indexed. Index accessors are not
    /// installed automatically; see [`crate::ScanIndex`].
    pub indexed: bool,
}

impl Attribute {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            indexed: false,
        }
    }

    pub const fn indexed(name: &'static str) -> Self {
        Self {
            name,
            indexed: true,
        }
    }
}

/// Trait for types that can be stored as records in an attached store.
pub trait Model: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Name used in diagnostics (e.g. "User").
    const MODEL_NAME: &'static str;

    /// Name of the primary-key attribute. Must be non-empty to attach.
    const PRIMARY_KEY: &'static str;

    /// Readonly models never advertise mutating remote methods.
    const READONLY: bool = false;

    /// Attribute definitions.
    fn attributes() -> &'static [Attribute] {
        &[]
    }

    /// Returns the primary-key value, if assigned.
    fn primary(&self) -> Option<&str>;

    /// Assigns the primary-key value.
    fn set_primary(&mut self, key: String);

    /// Self-validation. The default accepts every instance.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }

    fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Constructs an instance from a raw stored value.
    fn create(attrs: Value) -> Result<Self, ModelError> {
        serde_json::from_value(attrs).map_err(|e| ModelError::InvalidRecord {
            model: Self::MODEL_NAME,
            reason: e.to_string(),
        })
    }

    /// Serializes the instance into the record that gets stored.
    fn to_record(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Whether a raw value counts as absent for projection purposes.
///
/// `null`, `false`, `0` and `""` are absent.
pub(crate) fn is_absent(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}
