use proc_macro::TokenStream;

mod capability;

/// Turn a trait into a capability set.
///
/// Emits the trait unchanged (minus `#[aspects(..)]` attributes) together
/// with two items:
///
/// - `<Trait>Capability`: implements `interpose::Capability`. Holds the
///   operation descriptors, the aspects declared per operation and a by-name
///   call table over `dyn Trait`.
/// - `<Trait>Interceptor`: implements `Trait` itself. Every method packs its
///   arguments, goes through `interpose::Dispatcher::invoke` and unpacks the
///   outcome, so callers cannot tell it apart from the real target.
///
/// Every method must take `&self` and return `Result<T, E>` where
/// `E: From<InterposeError>`. `Result<(), E>` declares an operation without a
/// return value. Argument types must be `Clone`.
///
/// # Example
///
/// ```rust,ignore
/// #[interpose::capability]
/// pub trait Repository: Send + Sync {
///     #[aspects(TimingAspect::new(), LoggingAspect::new())]
///     fn create(&self, name: String, last_name: String) -> Result<Entity, RepositoryError>;
///
///     #[aspects(LoggingAspect::new())]
///     fn reindex(&self) -> Result<(), RepositoryError>;
/// }
///
/// let repository = RepositoryInterceptor::new(Arc::new(InMemoryRepository::new()));
/// repository.create("Arthur".into(), "Schopenhauer".into())?;
/// ```
#[proc_macro_attribute]
pub fn capability(attr: TokenStream, item: TokenStream) -> TokenStream {
    capability::capability_impl(attr, item)
}
