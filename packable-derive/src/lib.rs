//! # Packable Derive Macros
//!
//! This crate provides the procedural macro for `packable`. On a struct it implements
//! `Wire` (with the codable-object capability) and `Packable` (the declaration-ordered
//! member list). On a fieldless enum it implements `Wire` and `rt::WireEnum`, encoding the
//! discriminant as its `#[repr]` integer.
//!
//! Compatible with `syn 2.0`.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DataEnum, DataStruct, DeriveInput, Fields,
    Generics, Ident, Index, Member,
};

/// Derives `Wire` and `Packable` for structs, or `Wire` and `WireEnum` for fieldless enums.
///
/// Member attributes:
/// * `#[pack(exclude)]` skips the member.
/// * `#[pack(include)]` encodes the member even after an excluding `fall_through`.
/// * `fall_through` on either makes the decision the default for every later member. A
///   bare `#[pack(fall_through)]` excludes.
#[proc_macro_derive(Packable, attributes(pack))]
pub fn derive_packable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match &input.data {
        Data::Struct(ds) => expand_struct(&input.ident, &input.generics, ds),
        Data::Enum(de) => expand_enum(&input.ident, &input.generics, &input.attrs, de),
        Data::Union(_) => Err(syn::Error::new(
            input.ident.span(),
            "Packable only supports structs and fieldless enums",
        )),
    };

    match expanded {
        Ok(tokens) => TokenStream::from(tokens),
        Err(e) => e.to_compile_error().into(),
    }
}

// --- Internal Data Structures ---

struct MemberField {
    member: Member,
    name: String,
    ty: syn::Type,
    annotation: Option<PackAttr>,
}

#[derive(Clone, Copy)]
struct PackAttr {
    exclude: bool,
    fall_through: bool,
}

/// Parses the `#[pack(...)]` attributes of one field.
fn parse_attributes(attrs: &[Attribute]) -> syn::Result<Option<PackAttr>> {
    let mut exclude = false;
    let mut include = false;
    let mut fall_through = false;
    let mut seen = false;

    for attr in attrs {
        if !attr.path().is_ident("pack") {
            continue;
        }
        seen = true;
        let mut keys = 0;
        if !matches!(attr.meta, syn::Meta::Path(_)) {
            attr.parse_nested_meta(|meta| {
                keys += 1;
                if meta.path.is_ident("exclude") {
                    exclude = true;
                    return Ok(());
                }
                if meta.path.is_ident("include") {
                    include = true;
                    return Ok(());
                }
                if meta.path.is_ident("fall_through") {
                    fall_through = true;
                    return Ok(());
                }
                Err(meta.error("Unknown pack attribute key. Supported: exclude, include, fall_through"))
            })?;
        }
        if keys == 0 {
            return Err(syn::Error::new_spanned(
                attr,
                "empty pack attribute; expected exclude, include or fall_through",
            ));
        }
        if exclude && include {
            return Err(syn::Error::new_spanned(
                attr,
                "a member cannot be both excluded and included",
            ));
        }
    }

    if !seen {
        return Ok(None);
    }
    Ok(Some(PackAttr {
        exclude: !include,
        fall_through,
    }))
}

fn collect_fields(fields: &Fields) -> syn::Result<Vec<MemberField>> {
    let mut out = Vec::new();
    for (i, field) in fields.iter().enumerate() {
        let (member, name) = match &field.ident {
            Some(ident) => (Member::Named(ident.clone()), ident.to_string()),
            None => (Member::Unnamed(Index::from(i)), i.to_string()),
        };
        out.push(MemberField {
            member,
            name,
            ty: field.ty.clone(),
            annotation: parse_attributes(&field.attrs)?,
        });
    }
    Ok(out)
}

// --- Generator: structs ---

fn expand_struct(name: &Ident, generics: &Generics, ds: &DataStruct) -> syn::Result<TokenStream2> {
    let fields = collect_fields(&ds.fields)?;

    let mut generics = generics.clone();
    for param in generics.type_params_mut() {
        param.bounds.push(parse_quote!(packable::Wire));
    }
    generics
        .make_where_clause()
        .predicates
        .push(parse_quote!(Self: ::core::default::Default));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let declarations = fields.iter().map(|f| {
        let member = &f.member;
        let fname = &f.name;
        let ty = &f.ty;
        let annotation = match f.annotation {
            None => quote! { ::core::option::Option::None },
            Some(PackAttr { exclude, fall_through }) => {
                let base = if exclude {
                    quote! { packable::Annotation::exclude() }
                } else {
                    quote! { packable::Annotation::include() }
                };
                if fall_through {
                    quote! { ::core::option::Option::Some(#base.fall_through()) }
                } else {
                    quote! { ::core::option::Option::Some(#base) }
                }
            }
        };
        quote! {
            members.annotated::<#ty>(
                #fname,
                #annotation,
                |s| &s.#member,
                |s, v| s.#member = v,
            );
        }
    });

    Ok(quote! {
        impl #impl_generics packable::Wire for #name #ty_generics #where_clause {
            fn capabilities() -> packable::Capabilities<Self> {
                packable::Capabilities::none()
                    .with_codable(packable::dispatch::object_codec::<Self>)
            }
        }

        impl #impl_generics packable::Packable for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn declare(members: &mut packable::MemberSet<Self>) {
                #(#declarations)*
            }
        }
    })
}

// --- Generator: fieldless enums ---

const REPR_TYPES: &[&str] = &["u8", "i8", "u16", "i16", "u32", "i32", "u64", "i64"];

/// Finds the integer `#[repr]` of an enum, defaulting to `i32`.
fn parse_repr(attrs: &[Attribute]) -> syn::Result<Ident> {
    let mut repr = None;
    for attr in attrs {
        if !attr.path().is_ident("repr") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if let Some(ident) = meta.path.get_ident() {
                if REPR_TYPES.iter().any(|t| ident == t) {
                    repr = Some(ident.clone());
                } else if ident == "u128" || ident == "i128" || ident == "usize" || ident == "isize" {
                    return Err(meta.error("Packable enums need a fixed-width repr of at most 64 bits"));
                }
            }
            // repr(C), repr(align(N)) and friends do not affect the wire.
            if meta.input.peek(syn::token::Paren) {
                let _content;
                syn::parenthesized!(_content in meta.input);
            }
            Ok(())
        })?;
    }
    Ok(repr.unwrap_or_else(|| format_ident!("i32")))
}

fn expand_enum(
    name: &Ident,
    generics: &Generics,
    attrs: &[Attribute],
    de: &DataEnum,
) -> syn::Result<TokenStream2> {
    if let Some(variant) = de.variants.iter().find(|v| !matches!(v.fields, Fields::Unit)) {
        return Err(syn::Error::new_spanned(
            variant,
            "Packable enums must be fieldless",
        ));
    }
    if de.variants.is_empty() {
        return Err(syn::Error::new(
            name.span(),
            "Packable enums need at least one variant",
        ));
    }
    let repr = parse_repr(attrs)?;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let variants: Vec<&Ident> = de.variants.iter().map(|v| &v.ident).collect();

    Ok(quote! {
        impl #impl_generics packable::Wire for #name #ty_generics #where_clause {
            const IS_VALUE_TYPE: bool = true;

            fn capabilities() -> packable::Capabilities<Self> {
                packable::Capabilities::none()
                    .with_wrapper(packable::rt::enum_codec::<Self>)
            }
        }

        impl #impl_generics packable::rt::WireEnum for #name #ty_generics #where_clause {
            type Repr = #repr;

            fn to_repr(&self) -> #repr {
                match self {
                    #( Self::#variants => Self::#variants as #repr, )*
                }
            }

            fn from_repr(repr: #repr) -> ::core::option::Option<Self> {
                #(
                    if repr == Self::#variants as #repr {
                        return ::core::option::Option::Some(Self::#variants);
                    }
                )*
                ::core::option::Option::None
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn derive(input: DeriveInput) -> syn::Result<TokenStream2> {
        match &input.data {
            Data::Struct(ds) => expand_struct(&input.ident, &input.generics, ds),
            Data::Enum(de) => expand_enum(&input.ident, &input.generics, &input.attrs, de),
            Data::Union(_) => unreachable!("no unions in these tests"),
        }
    }

    #[test]
    fn pack_attribute_keys() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[pack(include, fall_through)])];
        let attr = parse_attributes(&attrs).expect("valid").expect("annotated");
        assert!(!attr.exclude);
        assert!(attr.fall_through);

        let attrs: Vec<Attribute> = vec![parse_quote!(#[doc = "plain"])];
        assert!(parse_attributes(&attrs).expect("valid").is_none());
    }

    #[test]
    fn empty_pack_attribute_is_rejected() {
        let cases: [Vec<Attribute>; 3] = [
            vec![parse_quote!(#[pack()])],
            vec![parse_quote!(#[pack])],
            vec![parse_quote!(#[pack(exclude)]), parse_quote!(#[pack()])],
        ];
        for attrs in cases {
            let err = parse_attributes(&attrs).err().expect("empty attribute accepted");
            assert!(err.to_string().contains("empty pack attribute"));
        }
    }

    #[test]
    fn unknown_and_conflicting_keys_are_rejected() {
        let attrs: Vec<Attribute> = vec![parse_quote!(#[pack(skip)])];
        assert!(parse_attributes(&attrs).is_err());

        let attrs: Vec<Attribute> = vec![parse_quote!(#[pack(exclude, include)])];
        assert!(parse_attributes(&attrs).is_err());
    }

    #[test]
    fn empty_enum_is_rejected() {
        let err = derive(parse_quote! {
            enum Never {}
        })
        .err()
        .expect("empty enum accepted");
        assert!(err.to_string().contains("at least one variant"));
    }

    #[test]
    fn enum_variants_need_no_fields() {
        assert!(derive(parse_quote! {
            #[repr(u8)]
            enum Level { Low = 1, High = 2 }
        })
        .is_ok());
        assert!(derive(parse_quote! {
            enum Shape { Dot, Line(u8) }
        })
        .is_err());
    }
}
