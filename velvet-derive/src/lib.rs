use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, LitStr, parse_macro_input};

/// Implements `velvet::Document` for a struct with named fields.
///
/// The collection name is required:
///
/// ```ignore
/// #[derive(Document)]
/// #[collection("photos")]
/// struct PhotoRecord { /* ... */ }
/// ```
#[proc_macro_derive(Document, attributes(collection))]
pub fn derive_document(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    match &input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(_) => {}
            Fields::Unnamed(_) => {
                return Err(Error::new_spanned(
                    name,
                    "velvet::Document doesn't support tuple structs, use named fields",
                ));
            }
            Fields::Unit => {
                return Err(Error::new_spanned(
                    name,
                    "Unit structs cannot derive velvet::Document as they have no fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                name,
                "velvet::Document can only be derived for structs",
            ));
        }
    }

    let collection = collection_name(input)?;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics velvet::Document for #name #ty_generics #where_clause {
            const COLLECTION: &'static str = #collection;
        }
    })
}

fn collection_name(input: &DeriveInput) -> syn::Result<LitStr> {
    let attr = input
        .attrs
        .iter()
        .find(|attr| attr.path().is_ident("collection"))
        .ok_or_else(|| {
            Error::new_spanned(
                &input.ident,
                "missing #[collection(\"...\")] attribute naming the document collection",
            )
        })?;

    let lit: LitStr = attr.parse_args()?;
    let value = lit.value();
    if value.is_empty() || value.contains('/') {
        return Err(Error::new_spanned(
            &lit,
            "collection name must be a non-empty single path segment",
        ));
    }
    Ok(lit)
}
