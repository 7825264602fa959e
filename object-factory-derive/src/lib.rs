//! Derive macros for object-factory
//!
//! - `#[derive(Constructible)]` - Generate a `FromArgs` impl so a struct can be
//!   registered as a class and built from a positional argument list.
//!
//! # Example
//!
//! ```rust,ignore
//! use object_factory::{ClassDef, ClassRegistry, Constructible, Object};
//! use std::sync::Arc;
//!
//! #[derive(Constructible)]
//! struct Mailer {
//!     host: String,
//!     port: i64,
//!     // Missing or null arguments become None
//!     relay: Option<String>,
//!     // Not taken from the argument list
//!     #[arg(skip)]
//!     sent: u64,
//! }
//!
//! let classes = ClassRegistry::new();
//! classes.register(ClassDef::from_args::<Mailer>("Mailer"));
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, parse_macro_input};

/// Derive macro for building a struct from positional arguments.
///
/// Named fields consume arguments in declaration order, each converted
/// with `FromValue`. The generated `from_args` fails with an argument error
/// naming the field when a value is missing or has the wrong type.
///
/// # Attributes
///
/// - `#[arg(skip)]` - Do not consume an argument; the field uses `Default::default()`.
///
/// # Generated Code
///
/// ```rust,ignore
/// impl object_factory::FromArgs for Mailer {
///     fn from_args(args: Vec<object_factory::Value>) -> object_factory::Result<Self> {
///         let mut reader = object_factory::ArgReader::new(args);
///         Ok(Self {
///             host: reader.next("host")?,
///             port: reader.next("port")?,
///             relay: reader.next("relay")?,
///             sent: Default::default(),
///         })
///     }
/// }
/// ```
#[proc_macro_derive(Constructible, attributes(arg))]
pub fn derive_constructible(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let name = &input.ident;
    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => {
                let expanded = quote! {
                    impl #impl_generics ::object_factory::FromArgs for #name #ty_generics #where_clause {
                        fn from_args(
                            _args: ::std::vec::Vec<::object_factory::Value>
                        ) -> ::object_factory::Result<Self> {
                            Ok(Self)
                        }
                    }
                };
                return TokenStream::from(expanded);
            }
            Fields::Unnamed(_) => {
                return syn::Error::new_spanned(
                    &input,
                    "Constructible can only be derived for structs with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new_spanned(&input, "Constructible can only be derived for structs")
                .to_compile_error()
                .into();
        }
    };

    let mut field_inits = Vec::new();

    for field in fields.iter() {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };

        match find_arg_attr(&field.attrs) {
            Ok(ArgAttr::Skip) => {
                field_inits.push(quote! {
                    #field_name: ::std::default::Default::default()
                });
            }
            Ok(ArgAttr::Positional) => {
                let label = field_name.to_string();
                field_inits.push(quote! {
                    #field_name: reader.next(#label)?
                });
            }
            Err(err) => return err.to_compile_error().into(),
        }
    }

    let expanded = quote! {
        impl #impl_generics ::object_factory::FromArgs for #name #ty_generics #where_clause {
            fn from_args(
                args: ::std::vec::Vec<::object_factory::Value>
            ) -> ::object_factory::Result<Self> {
                let mut reader = ::object_factory::ArgReader::new(args);
                Ok(Self {
                    #(#field_inits),*
                })
            }
        }
    };

    TokenStream::from(expanded)
}

/// How a field is filled
enum ArgAttr {
    Positional,
    Skip,
}

/// Find and parse the #[arg] attribute
fn find_arg_attr(attrs: &[Attribute]) -> syn::Result<ArgAttr> {
    for attr in attrs {
        if !attr.path().is_ident("arg") {
            continue;
        }

        let ident = attr.parse_args::<syn::Ident>()?;
        if ident == "skip" {
            return Ok(ArgAttr::Skip);
        }

        return Err(syn::Error::new_spanned(
            ident,
            "unknown argument attribute, expected #[arg(skip)]",
        ));
    }
    Ok(ArgAttr::Positional)
}
