use std::collections::HashSet;

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Data, DeriveInput, Error, Expr, Field, Fields, Ident, LitInt, Result, Token, Type,
    parse::{Parse, ParseStream},
};

pub(crate) fn expand_from_table(input: &DeriveInput) -> Result<TokenStream> {
    let Data::Struct(data) = &input.data else {
        Err(Error::new_spanned(
            input,
            "`FromTable` may only be derived on structs.",
        ))?
    };

    let Fields::Named(fields) = &data.fields else {
        Err(Error::new_spanned(
            input,
            "`FromTable` may only be derived on structs with named fields.",
        ))?
    };

    let fields = fields
        .named
        .iter()
        .map(FieldMetadata::parse)
        .collect::<Result<Vec<_>>>()?;

    let mut slots = HashSet::new();

    for field in &fields {
        if let Some(slot) = &field.slot {
            if !slots.insert(slot.number.base10_parse::<u16>()?) {
                Err(Error::new_spanned(
                    &slot.number,
                    "Field slots must be unique.",
                ))?
            }

            if let (true, Some(default)) = (field.is_option, &slot.default) {
                Err(Error::new_spanned(
                    default,
                    "`Option` fields are `None` when absent and cannot take a default.",
                ))?
            }
        }
    }

    let initializers = fields.iter().map(|field| {
        let FieldMetadata {
            name,
            slot,
            is_option,
        } = field;

        let Some(SlotAttribute { number, default }) = slot else {
            return quote! { #name: ::core::default::Default::default() };
        };

        let value = quote! {
            ::flatview::table::FromSlot::from_slot(view, #number)?
        };

        if *is_option {
            quote! { #name: #value }
        } else if let Some(default) = default {
            quote! { #name: #value.unwrap_or_else(|| #default) }
        } else {
            quote! { #name: #value.unwrap_or_default() }
        }
    });

    let name = &input.ident;

    let expanded = quote! {
        impl ::flatview::table::FromTable for #name {
            fn from_table(
                view: &::flatview::View<'_>,
            ) -> ::core::result::Result<Self, ::flatview::Error> {
                ::core::result::Result::Ok(Self {
                    #(#initializers,)*
                })
            }
        }

        impl ::flatview::table::FromSlot for #name {
            fn from_slot(
                view: &::flatview::View<'_>,
                slot: u16,
            ) -> ::core::result::Result<::core::option::Option<Self>, ::flatview::Error> {
                match view.offset(slot)? {
                    0 => ::core::result::Result::Ok(::core::option::Option::None),
                    offset => {
                        let table = view.union(usize::from(offset))?;
                        <Self as ::flatview::table::FromTable>::from_table(&table)
                            .map(::core::option::Option::Some)
                    }
                }
            }
        }
    };

    Ok(expanded.into())
}

#[derive(Debug)]
struct FieldMetadata {
    name: Ident,
    slot: Option<SlotAttribute>,
    is_option: bool,
}

impl FieldMetadata {
    fn parse(field: &Field) -> Result<Self> {
        let name = field.ident.clone().unwrap();

        let slot = field
            .attrs
            .iter()
            .find(|a| a.path().is_ident("slot"))
            .map(|attr| attr.meta.require_list()?.parse_args::<SlotAttribute>())
            .transpose()?;

        let is_option = match &field.ty {
            Type::Path(path) => path
                .path
                .segments
                .last()
                .is_some_and(|segment| segment.ident == "Option"),
            _ => false,
        };

        Ok(Self {
            name,
            slot,
            is_option,
        })
    }
}

#[derive(Debug)]
struct SlotAttribute {
    number: LitInt,
    default: Option<Expr>,
}

impl Parse for SlotAttribute {
    fn parse(input: ParseStream) -> Result<Self> {
        let number = input.parse::<LitInt>()?;

        let default = if !input.is_empty() {
            input.parse::<Token![,]>()?;

            let key = input.parse::<Ident>()?;
            if key != "default" {
                Err(Error::new_spanned(
                    key,
                    "Expected `default = EXPR` after the slot number.",
                ))?
            }

            input.parse::<Token![=]>()?;
            Some(input.parse::<Expr>()?)
        } else {
            None
        };

        Ok(Self { number, default })
    }
}
