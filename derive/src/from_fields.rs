use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Field, Fields, Ident, LitInt, Result,
    parse::{Parse, ParseStream},
    spanned::Spanned,
};

pub(crate) fn expand_from_fields(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new(
            input.span(),
            "`FromFields` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new(
            input.span(),
            "`FromFields` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .collect::<Result<Vec<_>>>()?;

    let assignments = fields.iter().map(|field| {
        let name = &field.name;

        // Fields without an attribute are filled from `Default`.
        match &field.slot {
            Some(slot) => quote! { #name: fields.get(#slot)? },
            None => quote! { #name: Default::default() },
        }
    });

    let name = &input.ident;

    let expanded = quote! {
        impl FromFields for #name {
            fn from_fields(fields: &Fields) -> Result<Self, ExtractError> {
                Ok(Self {
                    #(#assignments,)*
                })
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    slot: Option<LitInt>,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Self> {
        let name = field.ident.clone().unwrap();

        let Some(attr) = field.attrs.iter().find(|a| a.path().is_ident("field")) else {
            return Ok(Self { name, slot: None });
        };

        let FieldAttribute { slot } = attr.meta.require_list()?.parse_args()?;

        Ok(Self {
            name,
            slot: Some(slot),
        })
    }
}

#[derive(Debug)]
struct FieldAttribute {
    slot: LitInt,
}

impl Parse for FieldAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let slot = input.parse::<LitInt>()?;

        if !input.is_empty() {
            Err(Error::new(
                input.span(),
                "Field attribute takes a single slot index.",
            ))?
        }

        Ok(Self { slot })
    }
}
