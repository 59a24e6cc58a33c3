//! Demo: two creates and a reindex through the intercepted repository.
//!
//! Log verbosity follows `RUST_LOG` and defaults to `info`.

use interpose::{
    BoxError,
    repository::{InMemoryRepository, Repository, RepositoryInterceptor},
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), BoxError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let repository = RepositoryInterceptor::new(Arc::new(InMemoryRepository::new()));

    let arthur = repository.create("Arthur".into(), "Schopenhauer".into())?;
    tracing::info!(%arthur, "created");

    let gustave = repository.create("Gustave".into(), "Le bon".into())?;
    tracing::info!(%gustave, "created");

    repository.reindex()?;

    Ok(())
}
