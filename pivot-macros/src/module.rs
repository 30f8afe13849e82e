//! The `#[logic_module]` attribute.

use proc_macro::TokenStream;
use quote::quote;
use std::collections::HashSet;
use syn::{
    Attribute, FnArg, Ident, ImplItem, ImplItemFn, ItemImpl, LitStr, Meta, Token, Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments accepted by `#[logic_module(...)]` and `#[operation(...)]`.
#[derive(Default)]
struct NameArgs {
    name: Option<LitStr>,
}

impl Parse for NameArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    if lit.value().is_empty() {
                        return Err(syn::Error::new(lit.span(), "name must not be empty"));
                    }
                    name = Some(lit);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(NameArgs { name })
    }
}

/// One `#[operation]` method.
struct Operation {
    name: LitStr,
    method: Ident,
}

fn is_operation_attr(attr: &Attribute) -> bool {
    attr.path().is_ident("operation")
}

/// Parse the `#[operation]` marker of `method`, if any.
fn operation_args(method: &ImplItemFn) -> syn::Result<Option<NameArgs>> {
    let mut found = None;
    for attr in method.attrs.iter().filter(|attr| is_operation_attr(attr)) {
        if found.is_some() {
            return Err(syn::Error::new_spanned(attr, "duplicate #[operation] attribute"));
        }
        let args = match &attr.meta {
            Meta::Path(_) => NameArgs::default(),
            Meta::List(_) => attr.parse_args::<NameArgs>()?,
            Meta::NameValue(_) => {
                return Err(syn::Error::new_spanned(
                    attr,
                    "expected #[operation] or #[operation(name = \"...\")]",
                ));
            }
        };
        found = Some(args);
    }
    Ok(found)
}

/// Check the operation signature: `async fn(&self, storage, args)`.
fn check_signature(method: &ImplItemFn) -> syn::Result<()> {
    let sig = &method.sig;
    if sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            sig.fn_token,
            "operation method must be async",
        ));
    }
    match sig.inputs.first() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.inputs,
                "operation method must take &self",
            ));
        }
    }
    if sig.inputs.len() != 3 {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "operation method must take (&self, storage: &dyn Storage, args: Calldata)",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "operation method must not be generic",
        ));
    }
    Ok(())
}

fn default_module_name(self_ty: &Type) -> syn::Result<LitStr> {
    match self_ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .map(|segment| LitStr::new(&segment.ident.to_string(), segment.ident.span()))
            .ok_or_else(|| syn::Error::new_spanned(self_ty, "expected a type name")),
        _ => Err(syn::Error::new_spanned(
            self_ty,
            "cannot derive a module name; use #[logic_module(name = \"...\")]",
        )),
    }
}

/// Strip `#[operation]` markers and collect the operations, in order.
fn collect_operations(item: &mut ItemImpl) -> syn::Result<Vec<Operation>> {
    let mut operations = Vec::new();
    let mut seen = HashSet::new();

    for impl_item in &mut item.items {
        let ImplItem::Fn(method) = impl_item else {
            continue;
        };
        let Some(args) = operation_args(method)? else {
            continue;
        };
        check_signature(method)?;
        method.attrs.retain(|attr| !is_operation_attr(attr));

        let ident = method.sig.ident.clone();
        let name = args
            .name
            .unwrap_or_else(|| LitStr::new(&ident.to_string(), ident.span()));
        if !seen.insert(name.value()) {
            return Err(syn::Error::new(
                name.span(),
                format!("operation `{}` is declared twice", name.value()),
            ));
        }
        operations.push(Operation {
            name,
            method: ident,
        });
    }

    Ok(operations)
}

/// Implementation of the `#[logic_module]` macro.
pub fn logic_module_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as NameArgs);
    let mut input = parse_macro_input!(item as ItemImpl);

    if let Some((_, path, _)) = &input.trait_ {
        return syn::Error::new_spanned(path, "#[logic_module] goes on an inherent impl block")
            .to_compile_error()
            .into();
    }

    let module_name = match args.name {
        Some(name) => name,
        None => match default_module_name(&input.self_ty) {
            Ok(name) => name,
            Err(err) => return err.to_compile_error().into(),
        },
    };

    let operations = match collect_operations(&mut input) {
        Ok(operations) => operations,
        Err(err) => return err.to_compile_error().into(),
    };

    let self_ty = &input.self_ty;
    let (impl_generics, _, where_clause) = input.generics.split_for_impl();
    let names: Vec<_> = operations.iter().map(|operation| &operation.name).collect();
    let methods: Vec<_> = operations.iter().map(|operation| &operation.method).collect();

    let expanded = quote! {
        #input

        impl #impl_generics ::pivot::Module for #self_ty #where_clause {
            fn name(&self) -> &str {
                #module_name
            }

            fn operations(&self) -> ::std::vec::Vec<::pivot::OperationId> {
                ::std::vec![#(::pivot::OperationId::new(#names)),*]
            }

            async fn invoke(
                &self,
                storage: &dyn ::pivot::Storage,
                operation: &::pivot::OperationId,
                args: ::pivot::Calldata,
            ) -> ::core::result::Result<::pivot::Calldata, ::pivot::BoxError> {
                match operation.as_str() {
                    #(#names => self.#methods(storage, args).await,)*
                    _ => ::core::result::Result::Err(
                        ::pivot::StateError::OperationNotSupported(operation.clone()).into(),
                    ),
                }
            }
        }
    };

    TokenStream::from(expanded)
}
