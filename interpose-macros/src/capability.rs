//! Capability-related macros.
//!
//! This module contains:
//! - `#[capability]` - Attribute macro turning a trait into a capability set
//!   with a typed interceptor

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Expr, FnArg, GenericArgument, Ident, ItemTrait, LitStr, Pat, PathArguments, ReturnType, Token,
    TraitItem, TraitItemFn, Type, parse::Parse, parse_macro_input, punctuated::Punctuated,
};

/// Arguments for the `#[capability]` macro.
pub(crate) struct CapabilityArgs {
    pub name: Option<String>,
}

impl Parse for CapabilityArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let mut name = None;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "name" => {
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
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

        Ok(CapabilityArgs { name })
    }
}

/// One declared parameter.
struct Param {
    ident: Ident,
    ty: Type,
}

/// One operation of the capability trait.
struct Operation {
    method: Ident,
    params: Vec<Param>,
    output: Type,
    ok: Type,
    err: Type,
    void: bool,
    aspects: Vec<Expr>,
}

/// Implementation of the `#[capability]` macro.
pub fn capability_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as CapabilityArgs);
    let mut input = parse_macro_input!(item as ItemTrait);

    match expand(&args, &mut input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(args: &CapabilityArgs, input: &mut ItemTrait) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() || input.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "capability traits cannot be generic",
        ));
    }

    let mut operations = Vec::new();
    for item in &mut input.items {
        match item {
            TraitItem::Fn(method) => operations.push(parse_operation(method)?),
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "capability traits may only contain methods",
                ));
            }
        }
    }

    let trait_ident = &input.ident;
    let vis = &input.vis;
    let capability_ident = format_ident!("{}Capability", trait_ident);
    let interceptor_ident = format_ident!("{}Interceptor", trait_ident);
    let capability_name = args
        .name
        .clone()
        .unwrap_or_else(|| trait_ident.to_string());

    let descriptors = operations.iter().map(descriptor_tokens);
    let declared_arms = operations
        .iter()
        .filter(|op| !op.aspects.is_empty())
        .map(declared_arm);
    let accept_arms = operations.iter().map(accept_arm);
    let call_arms = operations.iter().map(call_arm);
    let interceptor_methods = operations.iter().map(interceptor_method);

    let expanded = quote! {
        #input

        #[doc = concat!("Capability set generated by `#[capability]` from `", stringify!(#trait_ident), "`")]
        #[derive(Clone, Copy, Debug, Default)]
        #vis struct #capability_ident;

        impl ::interpose::Capability for #capability_ident {
            type Target = dyn #trait_ident + Send + Sync;

            const NAME: &'static str = #capability_name;

            fn operations() -> &'static [::interpose::OperationDescriptor] {
                static OPERATIONS: &[::interpose::OperationDescriptor] = &[#(#descriptors),*];
                OPERATIONS
            }

            fn accepts(
                __descriptor: &::interpose::OperationDescriptor,
                __args: &::interpose::Arguments,
            ) -> bool {
                match __descriptor.name {
                    #(#accept_arms)*
                    _ => false,
                }
            }

            fn declared_aspects(
                descriptor: &::interpose::OperationDescriptor,
            ) -> ::std::vec::Vec<::std::sync::Arc<dyn ::interpose::Aspect>> {
                match descriptor.name {
                    #(#declared_arms)*
                    _ => ::std::vec::Vec::new(),
                }
            }

            fn call(
                __target: &Self::Target,
                __descriptor: &::interpose::OperationDescriptor,
                __args: &::interpose::Arguments,
            ) -> ::interpose::Outcome {
                match __descriptor.name {
                    #(#call_arms)*
                    other => ::interpose::Outcome::failed(
                        ::interpose::InterposeError::UnknownOperation {
                            capability: #capability_name,
                            operation: ::std::string::ToString::to_string(other),
                        },
                    ),
                }
            }
        }

        #[doc = concat!("Interceptor generated by `#[capability]`: implements `", stringify!(#trait_ident), "` by dispatching every call through its aspects.")]
        #[derive(Clone, Debug)]
        #vis struct #interceptor_ident {
            dispatcher: ::interpose::Dispatcher<#capability_ident>,
        }

        impl #interceptor_ident {
            /// Wrap `target` with the aspects declared on the trait.
            pub fn new(target: ::std::sync::Arc<dyn #trait_ident + Send + Sync>) -> Self {
                Self {
                    dispatcher: ::interpose::Dispatcher::new(target),
                }
            }

            /// Wrap an already configured dispatcher.
            pub fn from_dispatcher(dispatcher: ::interpose::Dispatcher<#capability_ident>) -> Self {
                Self { dispatcher }
            }

            /// The dispatcher every call goes through.
            pub fn dispatcher(&self) -> &::interpose::Dispatcher<#capability_ident> {
                &self.dispatcher
            }
        }

        impl #trait_ident for #interceptor_ident {
            #(#interceptor_methods)*
        }
    };

    Ok(expanded)
}

fn parse_operation(method: &mut TraitItemFn) -> syn::Result<Operation> {
    let mut aspects = Vec::new();
    let mut error = None;
    method.attrs.retain(|attr| {
        if !attr.path().is_ident("aspects") {
            return true;
        }
        match attr.parse_args_with(Punctuated::<Expr, Token![,]>::parse_terminated) {
            Ok(exprs) => aspects.extend(exprs),
            Err(err) => {
                error.get_or_insert(err);
            }
        }
        false
    });
    if let Some(err) = error {
        return Err(err);
    }

    let sig = &method.sig;
    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "capability operations must be synchronous",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "capability operations cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() =>
        {
            if let Some((_, Some(lifetime))) = &receiver.reference {
                return Err(syn::Error::new_spanned(
                    lifetime,
                    "capability operations take a plain `&self`",
                ));
            }
        }
        _ => {
            return Err(syn::Error::new_spanned(
                sig,
                "capability operations must take `&self`",
            ));
        }
    }

    let mut params = Vec::new();
    for (index, input) in inputs.enumerate() {
        let FnArg::Typed(pat_type) = input else {
            continue;
        };
        let ident = match &*pat_type.pat {
            Pat::Ident(pat_ident) => pat_ident.ident.clone(),
            _ => format_ident!("arg{}", index),
        };
        params.push(Param {
            ident,
            ty: (*pat_type.ty).clone(),
        });
    }

    let output = match &sig.output {
        ReturnType::Type(_, ty) => (**ty).clone(),
        ReturnType::Default => {
            return Err(syn::Error::new_spanned(
                sig,
                "capability operations must return `Result<T, E>`",
            ));
        }
    };
    let (ok, err) = split_result(&output)?;
    let void = matches!(&ok, Type::Tuple(tuple) if tuple.elems.is_empty());

    Ok(Operation {
        method: sig.ident.clone(),
        params,
        output,
        ok,
        err,
        void,
        aspects,
    })
}

fn split_result(ty: &Type) -> syn::Result<(Type, Type)> {
    let not_result =
        || syn::Error::new_spanned(ty, "capability operations must return `Result<T, E>`");

    let Type::Path(type_path) = ty else {
        return Err(not_result());
    };
    let Some(segment) = type_path.path.segments.last() else {
        return Err(not_result());
    };
    if segment.ident != "Result" {
        return Err(not_result());
    }
    let PathArguments::AngleBracketed(generics) = &segment.arguments else {
        return Err(not_result());
    };

    let mut types = generics.args.iter().filter_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty.clone()),
        _ => None,
    });
    match (types.next(), types.next(), types.next()) {
        (Some(ok), Some(err), None) => Ok((ok, err)),
        _ => Err(syn::Error::new_spanned(
            ty,
            "spell out both type parameters: `Result<T, E>`",
        )),
    }
}

/// Render a type the way it is written.
///
/// `quote` separates every token with a space; only the spaces that rustfmt
/// would not write are dropped, so `Box<dyn Error>` and `&'static str` keep
/// theirs.
fn type_name(ty: &Type) -> String {
    let raw = quote!(#ty).to_string();
    let mut rendered = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != ' ' {
            rendered.push(c);
            continue;
        }
        let prev = rendered.chars().last();
        let next = chars.peek().copied();
        let glued_to_prev = matches!(prev, Some('<' | ':' | '(' | '[' | '&'));
        let glued_to_next = matches!(next, Some('<' | '>' | ':' | ',' | ')' | ']' | ';'))
            || (next == Some('(') && prev.is_some_and(|p| p.is_alphanumeric()));
        if !glued_to_prev && !glued_to_next {
            rendered.push(' ');
        }
    }
    rendered
}

fn op_name(op: &Operation) -> LitStr {
    LitStr::new(&op.method.to_string(), op.method.span())
}

fn descriptor_tokens(op: &Operation) -> TokenStream2 {
    let name = op_name(op);
    let params = op.params.iter().map(|param| {
        let param_name = LitStr::new(&param.ident.to_string(), param.ident.span());
        let param_ty = type_name(&param.ty);
        quote! {
            ::interpose::ParamDescriptor { name: #param_name, ty: #param_ty }
        }
    });
    let returns = if op.void {
        quote! { ::interpose::ReturnShape::Void }
    } else {
        let ok = type_name(&op.ok);
        quote! { ::interpose::ReturnShape::Value(#ok) }
    };

    quote! {
        ::interpose::OperationDescriptor {
            name: #name,
            params: &[#(#params),*],
            returns: #returns,
        }
    }
}

fn declared_arm(op: &Operation) -> TokenStream2 {
    let name = op_name(op);
    let aspects = &op.aspects;
    quote! {
        #name => ::std::vec![
            #(::std::sync::Arc::new(#aspects) as ::std::sync::Arc<dyn ::interpose::Aspect>),*
        ],
    }
}

fn accept_arm(op: &Operation) -> TokenStream2 {
    let name = op_name(op);
    let checks = op.params.iter().enumerate().map(|(index, param)| {
        let ty = &param.ty;
        quote! { && __args.is::<#ty>(#index) }
    });
    quote! {
        #name => true #(#checks)*,
    }
}

fn call_arm(op: &Operation) -> TokenStream2 {
    let name = op_name(op);
    let method = &op.method;
    let extractions = op.params.iter().enumerate().map(|(index, param)| {
        let ident = &param.ident;
        let ty = &param.ty;
        quote! {
            let #ident: #ty = match __args.cloned::<#ty>(#index) {
                ::core::result::Result::Ok(value) => value,
                ::core::result::Result::Err(err) => return ::interpose::Outcome::failed(err),
            };
        }
    });
    let idents = op.params.iter().map(|param| &param.ident);
    let convert = if op.void {
        quote! { ::interpose::Outcome::from_void_result }
    } else {
        quote! { ::interpose::Outcome::from_result }
    };

    quote! {
        #name => {
            #(#extractions)*
            #convert(__target.#method(#(#idents),*))
        }
    }
}

fn interceptor_method(op: &Operation) -> TokenStream2 {
    let name = op_name(op);
    let method = &op.method;
    let output = &op.output;
    let ok = &op.ok;
    let err = &op.err;
    let params = op.params.iter().map(|param| {
        let ident = &param.ident;
        let ty = &param.ty;
        quote! { #ident: #ty }
    });
    let count = op.params.len();
    let pushes = op.params.iter().map(|param| {
        let ident = &param.ident;
        quote! { __args.push(#ident); }
    });
    let build_args = if count == 0 {
        quote! { let __args = ::interpose::Arguments::new(); }
    } else {
        quote! {
            let mut __args = ::interpose::Arguments::with_capacity(#count);
            #(#pushes)*
        }
    };
    let recover = if op.void {
        quote! { ::interpose::Outcome::into_void::<#err>(__outcome) }
    } else {
        quote! { ::interpose::Outcome::into_value::<#ok, #err>(__outcome) }
    };

    quote! {
        fn #method(&self, #(#params),*) -> #output {
            #build_args
            let __outcome = self.dispatcher.invoke(#name, __args)?;
            #recover
        }
    }
}
