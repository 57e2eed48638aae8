extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn;

/// Implements `pcap2vec::Named` with the type's identifier as its name.
#[proc_macro_derive(Named)]
pub fn named_derive(input: TokenStream) -> TokenStream {
    let ast: syn::DeriveInput = syn::parse(input).unwrap();
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let gen = quote! {
        impl #impl_generics Named for #name #ty_generics #where_clause {
            fn name() -> &'static str where Self: Sized {
                stringify!(#name)
            }
        }
    };
    gen.into()
}
