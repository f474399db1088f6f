//! PostgreSQL persistence adapters for the domain ports.
//!
//! Public surface:
//! - [`PoolConfig`] / [`DbPool`] — async connection pooling.
//! - [`DieselUserRepository`] — identity store adapter.
//! - [`DieselCategoryRepository`] — category catalogue adapter.
//! - [`DieselListRepository`] — list CRUD adapter.
//! - [`DieselVoteStore`] — vote store adapter with the transactional switch.
//! - [`run_migrations`] — apply embedded SQL migrations at startup.

mod diesel_catalogue_repository;
mod diesel_list_repository;
mod diesel_user_repository;
mod diesel_vote_repository;
mod error_mapping;
mod models;
pub mod pool;
pub mod schema;

use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

pub use diesel_catalogue_repository::DieselCategoryRepository;
pub use diesel_list_repository::DieselListRepository;
pub use diesel_user_repository::DieselUserRepository;
pub use diesel_vote_repository::DieselVoteStore;
pub use pool::{DbPool, PoolConfig, PoolError, build_pool};

/// SQL migrations compiled into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Errors raised while applying migrations.
#[derive(Debug, thiserror::Error)]
#[error("migration failure: {message}")]
pub struct MigrationError {
    pub message: String,
}

/// Apply any pending migrations.
///
/// The migration harness is synchronous, so this runs a dedicated blocking
/// connection rather than borrowing from the async pool.
pub async fn run_migrations(database_url: &str) -> Result<(), MigrationError> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url).map_err(|err| MigrationError {
            message: format!("connect for migrations: {err}"),
        })?;
        conn.run_pending_migrations(MIGRATIONS)
            .map_err(|err| MigrationError {
                message: err.to_string(),
            })?;
        Ok(())
    })
    .await
    .map_err(|err| MigrationError {
        message: format!("migration task panicked: {err}"),
    })?
}
