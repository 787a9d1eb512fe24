use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod from_table;

#[proc_macro_derive(FromTable, attributes(slot))]
pub fn derive_from_table(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match from_table::expand_from_table(&input) {
        Ok(tokens) => tokens,
        Err(err) => err.to_compile_error().into(),
    }
}
