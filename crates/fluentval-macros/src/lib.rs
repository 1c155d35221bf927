//! Procedural macros for FluentVal
//!
//! This crate provides the derive macro used to make a DTO registrable:
//!
//! - `#[derive(Schema)]` - implements `SchemaNode`/`Schematic`, generating a
//!   composed getter closure per field so validation never introspects
//!
//! Field display names default to the lower-camel form of the field ident
//! and can be overridden with `#[schema(name = "...")]`. Nested structs that
//! also derive `Schema` are walked recursively with dotted name paths.

use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, LitStr};

/// Derive `SchemaNode` and `Schematic` for a DTO struct.
///
/// # Example
///
/// ```rust,ignore
/// use fluentval::prelude::*;
///
/// #[derive(Default, Schema)]
/// struct CreateUser {
///     #[schema(name = "email")]
///     primary_email: StrField,
///     age: IntField,
/// }
/// ```
///
/// Only plain structs with named fields are supported; the target must also
/// implement `Default` so a probe instance can be built at registration.
#[proc_macro_derive(Schema, attributes(schema))]
pub fn derive_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    let ident = &input.ident;

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            &input.generics,
            "#[derive(Schema)] does not support generic types",
        )
        .to_compile_error()
        .into();
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return syn::Error::new_spanned(
                    ident,
                    "#[derive(Schema)] requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(ident, "#[derive(Schema)] only supports structs")
                .to_compile_error()
                .into();
        }
    };

    let mut declares = Vec::new();
    for field in fields {
        let fident = field.ident.as_ref().expect("named field");
        let fty = &field.ty;

        // External-facing name: explicit annotation wins, lower-camel of the
        // field ident otherwise.
        let mut display = lower_camel(&fident.to_string());
        for attr in &field.attrs {
            if !attr.path().is_ident("schema") {
                continue;
            }
            let parsed = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value: LitStr = meta.value()?.parse()?;
                    display = value.value();
                    Ok(())
                } else {
                    Err(meta.error("unsupported #[schema(...)] attribute; expected `name`"))
                }
            });
            if let Err(error) = parsed {
                return error.to_compile_error().into();
            }
        }

        declares.push(quote! {
            {
                let __get = ::std::sync::Arc::clone(&get);
                let __get_mut = ::std::rc::Rc::clone(&get_mut);
                <#fty as ::fluentval::schema::SchemaNode>::declare(
                    walker,
                    #display,
                    ::fluentval::schema::getter(move |root: &__Root| &(*__get)(root).#fident),
                    ::fluentval::schema::getter_mut(move |root: &mut __Root| {
                        &mut (*__get_mut)(root).#fident
                    }),
                );
            }
        });
    }

    // Keep field-less structs warning-free: the accessors are only consumed
    // by per-field blocks.
    let sink = declares
        .is_empty()
        .then(|| quote! { let _ = (get, get_mut); });

    let expanded = quote! {
        impl ::fluentval::schema::SchemaNode for #ident {
            fn declare<__Root: 'static>(
                walker: &mut ::fluentval::schema::SchemaWalker<__Root>,
                name: &str,
                get: ::fluentval::schema::Getter<__Root, Self>,
                get_mut: ::fluentval::schema::GetterMut<__Root, Self>,
            ) {
                walker.enter(name);
                #sink
                #(#declares)*
                walker.exit(name);
            }
        }

        impl ::fluentval::schema::Schematic for #ident {}
    };

    TokenStream::from(expanded)
}

/// Convert a snake_case ident to lowerCamelCase.
fn lower_camel(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len());
    let mut first = true;
    for segment in ident.split('_').filter(|s| !s.is_empty()) {
        if first {
            out.push_str(&segment.to_lowercase());
            first = false;
        } else {
            let mut chars = segment.chars();
            if let Some(head) = chars.next() {
                out.extend(head.to_uppercase());
                out.push_str(chars.as_str().to_lowercase().as_str());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::lower_camel;

    #[test]
    fn lower_camel_conversion() {
        assert_eq!(lower_camel("age"), "age");
        assert_eq!(lower_camel("user_name"), "userName");
        assert_eq!(lower_camel("created_at_utc"), "createdAtUtc");
        assert_eq!(lower_camel("__leading"), "leading");
    }
}
