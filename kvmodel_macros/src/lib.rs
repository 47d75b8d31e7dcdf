mod model;

use proc_macro::TokenStream;

/// Derive macro that implements `kvmodel::Model` for a struct with named
/// fields.
///
/// # Usage
///
/// ```ignore
/// #[derive(Clone, Serialize, Deserialize, Model)]
/// #[model(name = "User", validate = validate_user)]
/// struct User {
///     #[model(primary)]
///     id: Option<String>,
///     name: String,
///     #[model(index)]
///     email: String,
/// }
///
/// fn validate_user(user: &User) -> Result<(), String> {
///     if user.name.is_empty() {
///         return Err("name is required".into());
///     }
///     Ok(())
/// }
/// ```
///
/// Struct attributes:
/// - `name = "..."`: model name used in diagnostics (default: the struct name)
/// - `readonly`: never advertise mutating remote methods
/// - `validate = path`: `fn(&Self) -> Result<(), String>` used for validation
///
/// Field attributes:
/// - `primary`: the primary-key field (default: a field named `id`), either
///   `String` or `Option<String>`
/// - `index`: declare the attribute as indexed
///
/// `#[serde(rename = "...")]` is honored for attribute names and
/// `#[serde(skip)]` fields are left out of the attribute list.
#[proc_macro_derive(Model, attributes(model))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    model::derive_model(input)
}
