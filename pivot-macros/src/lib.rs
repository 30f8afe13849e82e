//! Procedural macros for Pivot.
//!
//! - `#[logic_module]` - Derive a `Module` implementation from an inherent
//!   `impl` block whose `#[operation]` methods become the module's operations

use proc_macro::TokenStream;

mod module;

/// Turn an inherent `impl` block into a Pivot logic module.
///
/// Every method marked `#[operation]` becomes an operation named after the
/// method, or after `#[operation(name = "...")]`. Operation methods must be
/// `async fn(&self, &dyn Storage, Calldata) -> Result<Calldata, BoxError>`.
/// Other methods are left alone.
///
/// The module name defaults to the type name; override it with
/// `#[logic_module(name = "...")]`.
///
/// # Example
///
/// ```rust,ignore
/// struct Transfers;
///
/// #[pivot::logic_module(name = "transfers")]
/// impl Transfers {
///     #[operation]
///     async fn transfer(&self, storage: &dyn Storage, args: Calldata) -> Result<Calldata, BoxError> {
///         storage.store("last", args.into_inner());
///         Ok(Calldata::empty())
///     }
///
///     #[operation(name = "balanceOf")]
///     async fn balance_of(&self, storage: &dyn Storage, _args: Calldata) -> Result<Calldata, BoxError> {
///         Ok(Calldata::new(storage.load("last").unwrap_or_default()))
///     }
/// }
/// ```
#[proc_macro_attribute]
pub fn logic_module(attr: TokenStream, item: TokenStream) -> TokenStream {
    module::logic_module_impl(attr, item)
}
