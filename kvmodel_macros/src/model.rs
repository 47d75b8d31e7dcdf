use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Expr, Field, Fields, LitStr, Path, Token, Type};

pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

struct StructAttrs {
    name: String,
    readonly: bool,
    validate: Option<Path>,
}

struct ModelField<'a> {
    field: &'a Field,
    attr_name: String,
    primary: bool,
    index: bool,
    skipped: bool,
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Model derive only supports structs with named fields",
                ))
            }
        },
        _ => return Err(syn::Error::new_spanned(name, "Model derive only supports structs")),
    };

    let attrs = parse_struct_attrs(input)?;
    let fields = fields.iter().map(parse_field).collect::<syn::Result<Vec<_>>>()?;

    // Explicit #[model(primary)] wins, otherwise a field named `id`
    let primary = fields
        .iter()
        .find(|f| f.primary)
        .or_else(|| fields.iter().find(|f| f.field.ident.as_ref().is_some_and(|i| i == "id")))
        .ok_or_else(|| {
            syn::Error::new_spanned(
                name,
                "Model derive: no field marked with #[model(primary)] and no field named `id`",
            )
        })?;

    let model_name = &attrs.name;
    let readonly = attrs.readonly;
    let primary_key = &primary.attr_name;
    let primary_ident = &primary.field.ident;

    let (primary_body, set_primary_body) = if is_option(&primary.field.ty) {
        (
            quote! { self.#primary_ident.as_deref() },
            quote! { self.#primary_ident = ::std::option::Option::Some(key); },
        )
    } else {
        (
            quote! {
                if self.#primary_ident.is_empty() {
                    ::std::option::Option::None
                } else {
                    ::std::option::Option::Some(self.#primary_ident.as_str())
                }
            },
            quote! { self.#primary_ident = key; },
        )
    };

    let attributes = fields.iter().filter(|f| !f.skipped).map(|f| {
        let attr_name = &f.attr_name;
        if f.index {
            quote! { ::kvmodel::Attribute::indexed(#attr_name) }
        } else {
            quote! { ::kvmodel::Attribute::new(#attr_name) }
        }
    });

    let validate = attrs.validate.as_ref().map(|path| {
        quote! {
            fn validate(&self) -> ::std::result::Result<(), ::std::string::String> {
                #path(self)
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::kvmodel::Model for #name #ty_generics #where_clause {
            const MODEL_NAME: &'static str = #model_name;
            const PRIMARY_KEY: &'static str = #primary_key;
            const READONLY: bool = #readonly;

            fn attributes() -> &'static [::kvmodel::Attribute] {
                const ATTRIBUTES: &[::kvmodel::Attribute] = &[#(#attributes),*];
                ATTRIBUTES
            }

            fn primary(&self) -> ::std::option::Option<&str> {
                #primary_body
            }

            fn set_primary(&mut self, key: ::std::string::String) {
                #set_primary_body
            }

            #validate
        }
    })
}

fn parse_struct_attrs(input: &DeriveInput) -> syn::Result<StructAttrs> {
    let mut attrs = StructAttrs {
        name: input.ident.to_string(),
        readonly: false,
        validate: None,
    };

    for attr in input.attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.name = value.value();
            } else if meta.path.is_ident("readonly") {
                attrs.readonly = true;
            } else if meta.path.is_ident("validate") {
                attrs.validate = Some(meta.value()?.parse()?);
            } else {
                return Err(meta.error("unsupported model attribute"));
            }
            Ok(())
        })?;
    }

    Ok(attrs)
}

fn parse_field(field: &Field) -> syn::Result<ModelField<'_>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new(Span::call_site(), "unnamed field"))?;

    let mut parsed = ModelField {
        field,
        attr_name: ident.to_string(),
        primary: false,
        index: false,
        skipped: false,
    };

    for attr in field.attrs.iter().filter(|a| a.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("primary") {
                parsed.primary = true;
            } else if meta.path.is_ident("index") {
                parsed.index = true;
            } else {
                return Err(meta.error("unsupported model field attribute"));
            }
            Ok(())
        })?;
    }

    read_serde_attrs(&field.attrs, &mut parsed);
    Ok(parsed)
}

/// Picks up `rename` and `skip` from `#[serde(...)]`; everything else in
/// the attribute is skipped over.
fn read_serde_attrs(attrs: &[Attribute], parsed: &mut ModelField<'_>) {
    for attr in attrs.iter().filter(|a| a.path().is_ident("serde")) {
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                parsed.attr_name = value.value();
            } else if meta.path.is_ident("skip") {
                parsed.skipped = true;
            } else if meta.input.peek(Token![=]) {
                let _: Expr = meta.value()?.parse()?;
            } else if meta.input.peek(syn::token::Paren) {
                let _ = meta.parse_nested_meta(|_| Ok(()));
            }
            Ok(())
        });
    }
}

fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
