//! Pagebind Derive Macros: page declarations as plain structs
//!
//! `#[derive(PageModel)]` turns a struct whose fields carry locator
//! metadata into a `pagebind::PageModel` implementation. Field types pick
//! the property kind:
//!
//! | field type                         | property                  |
//! |------------------------------------|---------------------------|
//! | `Element`, `TextBox`, `Button`...  | element of that kind      |
//! | `ListOf<T>`                        | list whose items are `T`  |
//! | `Frame`                            | frame (for frame maps)    |
//! | `String`, `i64`, `f64`, `bool`...  | scalar                    |
//! | `#[computed(...)]` on any field    | virtual                   |
//! | any other type                     | nested page of that type  |
//!
//! # Example
//!
//! ```ignore
//! use pagebind::{Button, ListOf, PageModel, TextBox};
//!
//! #[derive(PageModel)]
//! #[page(document, route = "/orders/{id}")]
//! struct OrderPage {
//!     #[locator(id = "search")]
//!     search: TextBox,
//!     #[locator(tag = "button", text = "Go")]
//!     go: Button,
//!     #[locator(item_kind = "TableRow")]
//!     lines: ListOf<OrderLine>,
//!     #[page(name = "Page Title", default = "Orders")]
//!     title: String,
//!     #[computed(attribute = "placeholder", of = "search")]
//!     search_hint: String,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    parse_macro_input, Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Lit,
    PathArguments, Type,
};

/// Element marker types and the kind each declares
const ELEMENT_MARKERS: &[&str] = &[
    "Element",
    "TextBox",
    "TextArea",
    "CheckBox",
    "RadioButton",
    "Select",
    "Button",
    "Link",
    "Image",
    "Div",
    "Span",
    "Table",
    "TableRow",
];

/// Field types declared as scalars
const SCALAR_TYPES: &[&str] = &[
    "String", "i64", "i32", "u32", "f64", "bool", "Value", "NaiveDateTime", "Vec",
];

/// Derive `pagebind::PageModel`.
///
/// # Struct attributes
///
/// - `#[page(name = "...")]` - page name (defaults to the struct name)
/// - `#[page(document)]` - page is rooted at a whole document
/// - `#[page(route = "/path")]` - navigation route
/// - `#[page(frame = "name")]` - page lives inside a named frame
/// - `#[page(frame_map)]` - type declares the application's frames
/// - `#[locator(...)]` - own locator, used when nested without one
///
/// # Field attributes
///
/// - `#[locator(id, name, class, tag, text, index, title, url, alt, type,
///   attr = "key=value", item_kind)]`
/// - `#[page(name = "...")]` - property name (defaults to the field name)
/// - `#[page(default = ...)]` - initial scalar value
/// - `#[page(skip)]` - not a property
/// - `#[computed(attribute = "...", of = "field")]`, `#[computed(script = "...")]`
///   or `#[computed(text)]`
#[proc_macro_derive(PageModel, attributes(page, locator, computed))]
pub fn derive_page_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let ident = &input.ident;
    let page = PageAttrs::parse(&input.attrs)?;
    let name = page.name.clone().unwrap_or_else(|| ident.to_string());

    let mut calls = page.builder_calls();
    if let Some(locator) = LocatorAttrs::parse(&input.attrs)? {
        let locator = locator.tokens();
        calls.push(quote! { .locator(#locator) });
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => fields.named.iter().collect::<Vec<_>>(),
            Fields::Unit => Vec::new(),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    ident,
                    "PageModel needs named fields so properties have names",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                ident,
                "PageModel can only be derived for structs",
            ))
        }
    };

    for field in fields {
        if let Some(call) = field_call(field)? {
            calls.push(call);
        }
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::pagebind::PageModel for #ident #ty_generics #where_clause {
            fn descriptor() -> ::pagebind::PageDescriptor {
                ::pagebind::PageDescriptor::builder(#name)
                    #(#calls)*
                    .build()
            }
        }
    })
}

// ============================================================================
// Attribute parsing
// ============================================================================

#[derive(Debug, Default)]
struct PageAttrs {
    name: Option<String>,
    document: bool,
    route: Option<String>,
    frame: Option<String>,
    frame_map: bool,
    default: Option<Lit>,
    skip: bool,
}

impl PageAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("page")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    out.name = Some(string_value(&meta)?);
                } else if meta.path.is_ident("document") {
                    out.document = true;
                } else if meta.path.is_ident("route") {
                    out.route = Some(string_value(&meta)?);
                } else if meta.path.is_ident("frame") {
                    out.frame = Some(string_value(&meta)?);
                } else if meta.path.is_ident("frame_map") {
                    out.frame_map = true;
                } else if meta.path.is_ident("default") {
                    out.default = Some(meta.value()?.parse()?);
                } else if meta.path.is_ident("skip") {
                    out.skip = true;
                } else {
                    return Err(meta.error("unknown page attribute"));
                }
                Ok(())
            })?;
        }
        Ok(out)
    }

    fn builder_calls(&self) -> Vec<TokenStream2> {
        let mut calls = Vec::new();
        if self.document {
            calls.push(quote! { .document() });
        }
        if let Some(route) = &self.route {
            calls.push(quote! { .route(#route) });
        }
        if let Some(frame) = &self.frame {
            calls.push(quote! { .frame(#frame) });
        }
        if self.frame_map {
            calls.push(quote! { .frame_map() });
        }
        calls
    }
}

#[derive(Debug, Default)]
struct LocatorAttrs {
    strings: Vec<(&'static str, String)>,
    index: Option<u32>,
    attributes: Vec<(String, String)>,
    item_kind: Option<String>,
}

/// `#[locator(key = "...")]` keys and the `LocatorMetadata` setter each maps to
const LOCATOR_KEYS: &[(&str, &str)] = &[
    ("id", "with_id"),
    ("name", "with_name"),
    ("class", "with_class"),
    ("tag", "with_tag"),
    ("text", "with_text"),
    ("title", "with_title"),
    ("url", "with_url"),
    ("alt", "with_alt"),
    ("type", "with_input_type"),
    ("input_type", "with_input_type"),
];

impl LocatorAttrs {
    fn parse(attrs: &[Attribute]) -> syn::Result<Option<Self>> {
        let mut found = false;
        let mut out = Self::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("locator")) {
            found = true;
            attr.parse_nested_meta(|meta| {
                if let Some((_, setter)) = LOCATOR_KEYS.iter().find(|(key, _)| meta.path.is_ident(key)) {
                    out.strings.push((*setter, string_value(&meta)?));
                } else if meta.path.is_ident("index") {
                    let lit: syn::LitInt = meta.value()?.parse()?;
                    let index = lit.base10_parse::<u32>()?;
                    if index == 0 {
                        return Err(syn::Error::new_spanned(lit, "locator index is 1-based"));
                    }
                    out.index = Some(index);
                } else if meta.path.is_ident("attr") {
                    let text = string_value(&meta)?;
                    let (key, value) = text
                        .split_once('=')
                        .ok_or_else(|| meta.error("expected attr = \"key=value\""))?;
                    out.attributes.push((key.trim().to_string(), value.trim().to_string()));
                } else if meta.path.is_ident("item_kind") {
                    out.item_kind = Some(string_value(&meta)?);
                } else {
                    return Err(meta.error("unknown locator attribute"));
                }
                Ok(())
            })?;
        }
        Ok(found.then_some(out))
    }

    fn tokens(&self) -> TokenStream2 {
        let setters = self.strings.iter().map(|(setter, value)| {
            let setter = syn::Ident::new(setter, proc_macro2::Span::call_site());
            quote! { .#setter(#value) }
        });
        let index = self.index.map(|i| quote! { .with_index(#i) });
        let attributes = self
            .attributes
            .iter()
            .map(|(k, v)| quote! { .with_attribute(#k, #v) });
        quote! {
            ::pagebind::LocatorMetadata::new() #(#setters)* #index #(#attributes)*
        }
    }
}

#[derive(Debug)]
enum Computed {
    Attribute { attribute: String, of: String },
    Script(String),
    Text,
}

fn parse_computed(attrs: &[Attribute]) -> syn::Result<Option<Computed>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("computed")) else {
        return Ok(None);
    };
    let mut attribute = None;
    let mut of = None;
    let mut script = None;
    let mut text = false;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("attribute") {
            attribute = Some(string_value(&meta)?);
        } else if meta.path.is_ident("of") {
            of = Some(string_value(&meta)?);
        } else if meta.path.is_ident("script") {
            script = Some(string_value(&meta)?);
        } else if meta.path.is_ident("text") {
            text = true;
        } else {
            return Err(meta.error("unknown computed attribute"));
        }
        Ok(())
    })?;

    match (attribute, of, script, text) {
        (Some(attribute), Some(of), None, false) => Ok(Some(Computed::Attribute { attribute, of })),
        (None, None, Some(script), false) => Ok(Some(Computed::Script(script))),
        (None, None, None, true) => Ok(Some(Computed::Text)),
        _ => Err(syn::Error::new_spanned(
            attr,
            "expected computed(attribute = \"..\", of = \"..\"), computed(script = \"..\") or computed(text)",
        )),
    }
}

fn string_value(meta: &syn::meta::ParseNestedMeta<'_>) -> syn::Result<String> {
    let lit: syn::LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

// ============================================================================
// Field classification
// ============================================================================

#[derive(Debug, PartialEq)]
enum FieldKind {
    Element(String),
    List(Type),
    Frame,
    Scalar,
    Nested,
}

fn last_segment(ty: &Type) -> Option<&syn::PathSegment> {
    match ty {
        Type::Path(path) if path.qself.is_none() => path.path.segments.last(),
        _ => None,
    }
}

fn classify(ty: &Type) -> FieldKind {
    let Some(segment) = last_segment(ty) else {
        return FieldKind::Scalar;
    };
    let ident = segment.ident.to_string();
    if ELEMENT_MARKERS.contains(&ident.as_str()) {
        return FieldKind::Element(ident);
    }
    if ident == "Frame" {
        return FieldKind::Frame;
    }
    if ident == "ListOf" || ident == "ElementList" {
        if let PathArguments::AngleBracketed(args) = &segment.arguments {
            if let Some(GenericArgument::Type(item)) = args.args.first() {
                return FieldKind::List(item.clone());
            }
        }
    }
    if SCALAR_TYPES.contains(&ident.as_str()) {
        return FieldKind::Scalar;
    }
    FieldKind::Nested
}

fn field_call(field: &Field) -> syn::Result<Option<TokenStream2>> {
    let attrs = PageAttrs::parse(&field.attrs)?;
    if attrs.skip {
        return Ok(None);
    }
    let Some(ident) = &field.ident else {
        return Ok(None);
    };
    let name = attrs.name.clone().unwrap_or_else(|| ident.to_string());
    let locator = LocatorAttrs::parse(&field.attrs)?;
    let ty = &field.ty;

    if let Some(computed) = parse_computed(&field.attrs)? {
        return Ok(Some(match computed {
            Computed::Attribute { attribute, of } => {
                quote! { .virtual_attribute(#name, #of, #attribute) }
            }
            Computed::Script(script) => quote! { .virtual_script(#name, #script) },
            Computed::Text => quote! { .virtual_text(#name) },
        }));
    }

    let require_locator = |what: &str| {
        locator.as_ref().map(LocatorAttrs::tokens).ok_or_else(|| {
            syn::Error::new_spanned(ident, format!("{what} field `{ident}` needs #[locator(...)]"))
        })
    };

    let call = match classify(ty) {
        FieldKind::Element(marker) => {
            let meta = require_locator("element")?;
            let kind = element_kind(&marker);
            quote! { .element(#name, #kind, #meta) }
        }
        FieldKind::List(item) => {
            let meta = locator.as_ref().map_or_else(
                || quote! { ::pagebind::LocatorMetadata::new() },
                LocatorAttrs::tokens,
            );
            let kind = locator
                .as_ref()
                .and_then(|l| l.item_kind.as_deref())
                .map_or_else(|| element_kind("Element"), element_kind);
            quote! { .list::<#item>(#name, #kind, #meta) }
        }
        FieldKind::Frame => {
            let meta = require_locator("frame")?;
            quote! { .frame_element(#name, #meta) }
        }
        FieldKind::Scalar => {
            let value = match attrs.default.as_ref() {
                None => quote! {
                    ::pagebind::Value::from(<#ty as ::core::default::Default>::default())
                },
                Some(lit @ Lit::Str(_)) => quote! { ::pagebind::Value::from(#lit) },
                Some(lit) => quote! {
                    <::pagebind::Value as ::core::convert::From<#ty>>::from(#lit)
                },
            };
            quote! { .scalar(#name, #value) }
        }
        FieldKind::Nested => {
            let meta = locator.as_ref().map_or_else(
                || quote! { ::core::option::Option::None },
                |l| {
                    let tokens = l.tokens();
                    quote! { ::core::option::Option::Some(#tokens) }
                },
            );
            quote! { .nested::<#ty>(#name, #meta) }
        }
    };
    Ok(Some(call))
}

fn element_kind(marker: &str) -> TokenStream2 {
    if marker == "Element" {
        quote! { ::pagebind::ElementKind::Generic }
    } else {
        quote! { ::pagebind::ElementKind::from_name(#marker) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expand_str(input: DeriveInput) -> String {
        expand(&input).map(|t| t.to_string()).unwrap_or_else(|e| e.to_string())
    }

    mod classify_tests {
        use super::*;

        #[test]
        fn test_markers_lists_and_scalars() {
            assert_eq!(classify(&parse_quote!(TextBox)), FieldKind::Element("TextBox".into()));
            assert_eq!(
                classify(&parse_quote!(pagebind::Button)),
                FieldKind::Element("Button".into())
            );
            assert_eq!(classify(&parse_quote!(Frame)), FieldKind::Frame);
            assert_eq!(classify(&parse_quote!(String)), FieldKind::Scalar);
            assert_eq!(classify(&parse_quote!(Vec<String>)), FieldKind::Scalar);
            assert_eq!(classify(&parse_quote!(AddressForm)), FieldKind::Nested);
            assert!(matches!(classify(&parse_quote!(ListOf<Row>)), FieldKind::List(_)));
        }
    }

    mod expand_tests {
        use super::*;

        #[test]
        fn test_page_attributes_become_builder_calls() {
            let out = expand_str(parse_quote! {
                #[page(document, route = "/login", frame = "main")]
                struct Login {
                    #[locator(id = "user", type = "email")]
                    user: TextBox,
                }
            });
            assert!(out.contains("builder (\"Login\")"));
            assert!(out.contains(". document ()"));
            assert!(out.contains(". route (\"/login\")"));
            assert!(out.contains(". frame (\"main\")"));
            assert!(out.contains("with_id (\"user\")"));
            assert!(out.contains("with_input_type (\"email\")"));
            assert!(out.contains("from_name (\"TextBox\")"));
        }

        #[test]
        fn test_fields_map_to_property_kinds() {
            let out = expand_str(parse_quote! {
                struct Orders {
                    #[locator(item_kind = "TableRow")]
                    lines: ListOf<Line>,
                    #[page(name = "Page Title", default = "Orders")]
                    title: String,
                    #[computed(attribute = "placeholder", of = "search")]
                    hint: String,
                    #[computed(text)]
                    body: String,
                    address: Address,
                    #[page(skip)]
                    ignored: String,
                }
            });
            assert!(out.contains(". list :: < Line > (\"lines\""));
            assert!(out.contains("from_name (\"TableRow\")"));
            assert!(out.contains(". scalar (\"Page Title\" , :: pagebind :: Value :: from (\"Orders\"))"));
            assert!(out.contains(". virtual_attribute (\"hint\" , \"search\" , \"placeholder\")"));
            assert!(out.contains(". virtual_text (\"body\")"));
            assert!(out.contains(". nested :: < Address > (\"address\" , :: core :: option :: Option :: None)"));
            assert!(!out.contains("ignored"));
        }

        #[test]
        fn test_element_without_locator_is_an_error() {
            let out = expand_str(parse_quote! {
                struct Bad {
                    submit: Button,
                }
            });
            assert!(out.contains("needs #[locator(...)]"));
        }

        #[test]
        fn test_zero_index_is_rejected() {
            let out = expand_str(parse_quote! {
                struct Bad {
                    #[locator(tag = "li", index = 0)]
                    first: Element,
                }
            });
            assert!(out.contains("1-based"));
        }

        #[test]
        fn test_tuple_structs_are_rejected() {
            let out = expand_str(parse_quote! {
                struct Bad(TextBox);
            });
            assert!(out.contains("named fields"));
        }
    }
}
