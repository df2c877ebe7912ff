#![crate_type = "proc-macro"]
use syn::parse::Parse;
use syn::{self, parse, parse_macro_input, spanned::Spanned, ExprCall, ItemFn, Path};

use proc_macro::TokenStream;
use quote::{self, ToTokens};

mod kw {
    syn::custom_keyword!(Capacity);
    syn::custom_keyword!(Shared);
    syn::custom_keyword!(CustomHasher);
    syn::custom_keyword!(HasherInit);
    syn::custom_punctuation!(Colon, :);
}

#[derive(Default, Clone)]
struct CacheOptions {
    lru_max_entries: Option<usize>,
    shared: bool,
    custom_hasher: Option<Path>,
    custom_hasher_initializer: Option<ExprCall>,
}

#[derive(Clone)]
enum CacheOption {
    LruMaxEntries(usize),
    Shared,
    CustomHasher(Path),
    HasherInit(ExprCall),
}

// To extend option parsing, add functionality here.
#[allow(unreachable_code)]
impl parse::Parse for CacheOption {
    fn parse(input: parse::ParseStream) -> syn::Result<Self> {
        let la = input.lookahead1();
        if la.peek(kw::Capacity) {
            #[cfg(not(feature = "full"))]
            return Err(syn::Error::new(input.span(),
            "memo error: Capacity specified, but the feature 'full' is not enabled! To fix this, compile with `--features=full`.",
            ));

            input.parse::<kw::Capacity>()?;
            input.parse::<kw::Colon>()?;
            let cap: syn::LitInt = input.parse()?;
            let entries: usize = cap.base10_parse()?;
            if entries == 0 {
                return Err(syn::Error::new(cap.span(), "memo error: Capacity must be at least 1"));
            }
            return Ok(CacheOption::LruMaxEntries(entries));
        }
        if la.peek(kw::Shared) {
            input.parse::<kw::Shared>()?;
            return Ok(CacheOption::Shared);
        }
        if la.peek(kw::CustomHasher) {
            input.parse::<kw::CustomHasher>()?;
            input.parse::<kw::Colon>()?;
            return Ok(CacheOption::CustomHasher(input.parse()?));
        }
        if la.peek(kw::HasherInit) {
            input.parse::<kw::HasherInit>()?;
            input.parse::<kw::Colon>()?;
            return Ok(CacheOption::HasherInit(input.parse()?));
        }
        Err(la.error())
    }
}

impl parse::Parse for CacheOptions {
    fn parse(input: parse::ParseStream) -> syn::Result<Self> {
        let f: syn::punctuated::Punctuated<CacheOption, syn::Token![,]> =
            input.parse_terminated(CacheOption::parse)?;
        let mut opts = Self::default();

        for opt in f {
            match opt {
                CacheOption::LruMaxEntries(cap) => opts.lru_max_entries = Some(cap),
                CacheOption::CustomHasher(hasher) => opts.custom_hasher = Some(hasher),
                CacheOption::HasherInit(init) => opts.custom_hasher_initializer = Some(init),
                CacheOption::Shared => opts.shared = true,
            }
        }
        Ok(opts)
    }
}

mod store {
    use crate::CacheOptions;
    use proc_macro2::{Span, TokenStream};

    /// Returns TokenStreams to be used in quote!{} for the type of the store ("Map<K,V>") and
    /// its initializer ("Map::new()").
    ///
    /// Every store implements `memocall::CacheMap`, which the generated code uses to access it.
    pub(crate) fn construct_cache(
        options: &CacheOptions,
        key_type: TokenStream,
        value_type: TokenStream,
    ) -> syn::Result<(TokenStream, TokenStream)> {
        if let Some(cap) = options.lru_max_entries {
            if let Some(hasher) = &options.custom_hasher {
                return Err(syn::Error::new_spanned(
                    hasher,
                    "memo error: Capacity and CustomHasher cannot be combined",
                ));
            }
            return Ok((
                quote::quote! { ::memocall::lru::LruCache<#key_type, #value_type> },
                quote::quote! { ::memocall::lru::LruCache::new(#cap) },
            ));
        }
        match (&options.custom_hasher, &options.custom_hasher_initializer) {
            (Some(hasher), Some(init)) => Ok((
                quote::quote! { #hasher<#key_type, #value_type> },
                quote::quote! { #init },
            )),
            (Some(hasher), None) => Ok((
                quote::quote! { #hasher<#key_type, #value_type> },
                quote::quote! { #hasher::new() },
            )),
            (None, Some(init)) => Err(syn::Error::new_spanned(
                init,
                "memo error: HasherInit requires CustomHasher",
            )),
            (None, None) => Ok((
                quote::quote! { ::std::collections::HashMap<#key_type, #value_type> },
                quote::quote! { ::std::collections::HashMap::new() },
            )),
        }
    }

    pub(crate) fn store_ident(fn_name: &str, span: Span) -> syn::Ident {
        syn::Ident::new(&format!("MEMO_STORE_{}", fn_name.to_uppercase()), span)
    }
}

/**
 * memo is an attribute to create a memoized version of a (simple enough) function.
 *
 * It works on free functions whose arguments are `Clone + Hash + Eq` and whose return value is
 * `Clone`. Argument types that cannot be hashed are rejected by the compiler. Methods (functions
 * with a `[&/&mut/]self` receiver) and arguments bound by a pattern without a name are not
 * supported.
 *
 * The annotated function is renamed to `memo_original_{fn}` and a memoizing function with the
 * original name and signature takes its place. Recursive calls inside the body resolve to the
 * memoizing function, so every subproblem is computed at most once.
 *
 * ```ignore
 * use memocall::memo;
 * #[memo]
 * fn hello(arg: String, arg2: usize) -> bool {
 *      arg.len() % 2 == arg2
 * }
 *
 * // `hello` is only called once.
 * assert!(! hello("World".to_string(), 0));
 * assert!(! hello("World".to_string(), 0));
 * assert!(! memo_original_hello("World".to_string(), 0));
 * assert_eq!(memo_size_hello(), 1);
 * ```
 *
 * If the function returns a `Result`, only `Ok` values are stored; errors are returned as they
 * are and the next call with the same arguments runs the function again.
 *
 * By default the cache is thread-local. Further options:
 *
 * - `#[memo(Shared)]`: one cache for all threads, in a `lazy_static` `Mutex`. The lock is not
 *   held while the function runs.
 * - `#[memo(Capacity: 1234)]`: use an `lru::LruCache` with the given capacity instead of a
 *   `HashMap` (needs the `full` feature).
 * - `#[memo(CustomHasher: FxHashMap, HasherInit: FxHashMap::default())]`: use another map type.
 *   Without `HasherInit`, the map is created with `new()`.
 *
 * `memo_size_{fn}()` returns the number of cached entries and has the same visibility as the
 * memoized function.
 */
#[proc_macro_attribute]
pub fn memo(attr: TokenStream, item: TokenStream) -> TokenStream {
    let func = parse_macro_input!(item as ItemFn);
    let options = parse_macro_input!(attr as CacheOptions);

    match expand(&options, func) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(options: &CacheOptions, func: ItemFn) -> syn::Result<proc_macro2::TokenStream> {
    let sig = &func.sig;

    let fn_name = sig.ident.to_string();
    let renamed_name = format!("memo_original_{}", fn_name);
    let size_name = syn::Ident::new(&format!("memo_size_{}", fn_name), sig.span());

    // Extracted from the function signature.
    let (input_types, input_names) = check_signature(sig)?;
    let return_type = match &sig.output {
        syn::ReturnType::Default => quote::quote! { () },
        syn::ReturnType::Type(_, ty) => ty.to_token_stream(),
    };

    // Functions with one or with multiple arguments are treated the same: the key is a tuple.
    let input_tuple_type = quote::quote! { (#(#input_types),*) };

    // Construct storage for the memoized keys and return values.
    let store_ident = store::store_ident(&fn_name, sig.span());
    let (cache_type, cache_init) =
        store::construct_cache(options, input_tuple_type, return_type)?;
    let store = if options.shared {
        quote::quote! {
            ::memocall::lazy_static::lazy_static! {
                static ref #store_ident : ::std::sync::Mutex<#cache_type> =
                    ::std::sync::Mutex::new(#cache_init);
            }
        }
    } else {
        quote::quote! {
            ::std::thread_local! {
                static #store_ident : ::std::cell::RefCell<#cache_type> =
                    ::std::cell::RefCell::new(#cache_init);
            }
        }
    };

    // Rename original function.
    let mut renamed_fn = func.clone();
    renamed_fn.sig.ident = syn::Ident::new(&renamed_name, func.sig.span());
    renamed_fn.attrs.push(syn::parse_quote! { #[allow(dead_code)] });
    let original_id = &renamed_fn.sig.ident;

    // Construct memoizer function, which calls the original function.
    let key = quote::quote! { (#(#input_names),*) };
    let key_cloned = quote::quote! { (#(#input_names.clone()),*) };
    let read_memo = quote::quote! {
        ::memocall::CacheMap::lookup(&mut *__memo_map, &#key_cloned).cloned()
    };
    let insert = quote::quote! {
        ::memocall::CacheMap::remember(&mut *__memo_map, #key, __memo_ret.clone());
    };
    let memoize = if returns_result(&sig.output) {
        quote::quote! {
            if let ::std::result::Result::Ok(_) = &__memo_ret {
                #insert
            }
        }
    } else {
        insert
    };

    let (memoizer, sizer_body) = if options.shared {
        (
            quote::quote! {
                {
                    let mut __memo_map = #store_ident
                        .lock()
                        .unwrap_or_else(::std::sync::PoisonError::into_inner);
                    if let ::std::option::Option::Some(__memo_ret) = #read_memo {
                        return __memo_ret;
                    }
                }
                let __memo_ret = #original_id(#(#input_names.clone()),*);

                let mut __memo_map = #store_ident
                    .lock()
                    .unwrap_or_else(::std::sync::PoisonError::into_inner);
                #memoize

                __memo_ret
            },
            quote::quote! {
                let __memo_map = #store_ident
                    .lock()
                    .unwrap_or_else(::std::sync::PoisonError::into_inner);
                ::memocall::CacheMap::entries(&*__memo_map)
            },
        )
    } else {
        (
            quote::quote! {
                let __memo_hit = #store_ident.with(|__memo_map| {
                    let mut __memo_map = __memo_map.borrow_mut();
                    #read_memo
                });
                if let ::std::option::Option::Some(__memo_ret) = __memo_hit {
                    return __memo_ret;
                }

                let __memo_ret = #original_id(#(#input_names.clone()),*);

                #store_ident.with(|__memo_map| {
                    let mut __memo_map = __memo_map.borrow_mut();
                    #memoize
                });

                __memo_ret
            },
            quote::quote! {
                #store_ident.with(|__memo_map| ::memocall::CacheMap::entries(&*__memo_map.borrow()))
            },
        )
    };

    let vis = &func.vis;

    Ok(quote::quote! {
        #renamed_fn
        #store

        #[allow(dead_code)]
        #vis fn #size_name() -> usize {
            #sizer_body
        }

        #[allow(unused_variables, unused_mut)]
        #vis #sig {
            #memoizer
        }
    })
}

fn check_signature(
    sig: &syn::Signature,
) -> Result<(Vec<Box<syn::Type>>, Vec<syn::Ident>), syn::Error> {
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new(asyncness.span(), "Cannot memoize async functions!"));
    }
    if sig.inputs.is_empty() {
        return Ok((vec![], vec![]));
    }
    if let syn::FnArg::Receiver(_) = sig.inputs[0] {
        return Err(syn::Error::new(sig.span(), "Cannot memoize methods!"));
    }

    let mut types = vec![];
    let mut names = vec![];
    for a in &sig.inputs {
        if let syn::FnArg::Typed(ref arg) = a {
            types.push(arg.ty.clone());

            if let syn::Pat::Ident(patident) = &*arg.pat {
                names.push(patident.ident.clone());
            } else {
                return Err(syn::Error::new(
                    arg.pat.span(),
                    "Cannot memoize arbitrary patterns! Bind the argument by name (`name @ pattern`).",
                ));
            }
        }
    }
    Ok((types, names))
}

// `Result<..>`, `io::Result<..>`, `std::result::Result<..>` and friends.
fn returns_result(output: &syn::ReturnType) -> bool {
    match output {
        syn::ReturnType::Type(_, ty) => match &**ty {
            syn::Type::Path(p) => p
                .path
                .segments
                .last()
                .map_or(false, |seg| seg.ident == "Result"),
            _ => false,
        },
        syn::ReturnType::Default => false,
    }
}
