//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the warranty claims domain, built on SQLx.
//!
//! # Architecture
//!
//! - [`PgTransactionManager`] opens one [`PgUnitOfWork`] per operation
//! - the repositories in [`repositories`] implement the domain's port traits
//!   against that unit of work
//! - [`MIGRATOR`] carries the embedded schema
//!
//! Per-claim serialization relies on row locks: every mutating service
//! operation starts with `lock_by_id`, which issues `SELECT ... FOR UPDATE`.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, repositories::pg_repositories, run_migrations, DatabaseConfig, PgTransactionManager};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/warranty_claims")).await?;
//! run_migrations(&pool).await?;
//! let tm = PgTransactionManager::new(pool);
//! let services = ClaimServices::new(pg_repositories(), store, policy);
//! ```

pub mod pool;
pub mod error;
pub mod transaction;
pub mod repositories;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, DatabaseConfig};
pub use error::DatabaseError;
pub use transaction::{PgTransactionManager, PgUnitOfWork};

use tracing::info;

/// Schema migrations embedded at compile time from `migrations/`
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// Applies any pending schema migrations
pub async fn run_migrations(pool: &DatabasePool) -> Result<(), DatabaseError> {
    MIGRATOR.run(pool).await?;
    info!("database migrations applied");
    Ok(())
}
