// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2026 Oxide Computer Company

use proc_macro2::TokenStream;
use quote::format_ident;
use quote::quote;
use syn::DeriveInput;
use syn::Expr;
use syn::ExprLit;
use syn::Field;
use syn::FieldsNamed;
use syn::FieldsUnnamed;
use syn::Ident;
use syn::Lit;
use syn::Meta;
use syn::MetaNameValue;
use syn::parse_macro_input;

/// Generate a [`ioam_export::stat::StatProvider`] implementation
/// given a struct of named fields of type
/// [`ioam_export::stat::StatU64`].
///
/// The doc comment on each field becomes the human-readable
/// description of that counter, in the same way a dataplane node's
/// error strings accompany its error counters.
///
/// ```ignore
/// #[derive(StatProvider)]
/// struct NodeStats {
///     /// Packets recorded for export
///     recorded: StatU64,
///     /// Export buffer allocation failures
///     no_buffer: StatU64,
/// }
/// ```
///
/// This macro generates the following code based on the struct above.
///
/// ```ignore
/// #[derive(Clone, Copy, Debug, Default, ...)]
/// pub struct NodeStatsSnap {
///     pub recorded: u64,
///     pub no_buffer: u64,
/// }
///
/// impl StatProvider for NodeStats {
///     const NUM_FIELDS: u32 = 2;
///     const FIELDS: &'static [StatField] = &[
///         StatField { name: "recorded", desc: "Packets recorded for export" },
///         StatField { name: "no_buffer", desc: "Export buffer allocation failures" },
///     ];
///     type Snap = NodeStatsSnap;
///
///     fn new() -> Self { ... }
///     fn snapshot(&self) -> Self::Snap { ... }
///     fn value(&self, idx: usize) -> Option<u64> { ... }
/// }
/// ```
#[proc_macro_derive(StatProvider)]
pub fn derive_stat_provider(
    input: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let derive_input = parse_macro_input!(input);
    stat_provider(derive_input).into()
}

fn stat_provider(input: DeriveInput) -> TokenStream {
    let DeriveInput { ident, data, .. } = input;
    let fields: Vec<Field> = match data {
        syn::Data::Struct(s) => match s.fields {
            syn::Fields::Named(FieldsNamed { named, .. }) => {
                named.into_iter().collect()
            }

            syn::Fields::Unnamed(FieldsUnnamed { unnamed: _, .. }) => {
                panic!("A StatProvider cannot have unnamed fields");
            }

            syn::Fields::Unit => {
                panic!("A unit struct cannot be a StatProvider");
            }
        },

        _ => panic!("Only a struct may be a StatProvider"),
    };

    let num_fields = fields.len() as u32;
    let fields_ident: Vec<Ident> =
        fields.iter().map(|f| f.ident.clone().unwrap()).collect();
    let fields_desc: Vec<String> = fields.iter().map(field_desc).collect();
    let fields_idx: Vec<usize> = (0..fields.len()).collect();
    let ident_snap = format_ident!("{}Snap", ident);

    let output = quote! {
        #[derive(
            Clone,
            Copy,
            Debug,
            Default,
            Eq,
            PartialEq,
            ::serde::Deserialize,
            ::serde::Serialize,
        )]
        pub struct #ident_snap {
            #( pub #fields_ident: u64, )*
        }

        impl ::ioam_export::stat::StatProvider for #ident {
            const NUM_FIELDS: u32 = #num_fields;
            const FIELDS: &'static [::ioam_export::stat::StatField] = &[
                #(
                    ::ioam_export::stat::StatField {
                        name: stringify!(#fields_ident),
                        desc: #fields_desc,
                    },
                )*
            ];
            type Snap = #ident_snap;

            fn new() -> Self {
                use ::ioam_export::stat::StatU64;

                Self {
                    #( #fields_ident: StatU64::new(), )*
                }
            }

            fn snapshot(&self) -> Self::Snap {
                #ident_snap {
                    #( #fields_ident: self.#fields_ident.val(), )*
                }
            }

            fn value(&self, idx: usize) -> Option<u64> {
                match idx {
                    #( #fields_idx => Some(self.#fields_ident.val()), )*
                    _ => None,
                }
            }
        }
    };

    output
}

/// Join the `///` lines on a field into a single description.
fn field_desc(field: &Field) -> String {
    let lines: Vec<String> = field
        .attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(MetaNameValue {
                value: Expr::Lit(ExprLit { lit: Lit::Str(s), .. }),
                ..
            }) => Some(s.value().trim().to_string()),
            _ => None,
        })
        .filter(|line| !line.is_empty())
        .collect();

    lines.join(" ")
}
