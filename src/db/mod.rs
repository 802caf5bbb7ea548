//! Database layer
//!
//! SQLite through `sqlx`. The pool is created from [`DatabaseConfig`],
//! migrations are embedded in the binary, and each table is accessed through
//! a repository trait so services can be tested against any implementation.
//!
//! ```ignore
//! let pool = db::create_pool(&config.database).await?;
//! db::migrations::run_migrations(&pool).await?;
//! ```
//!
//! [`DatabaseConfig`]: crate::config::DatabaseConfig

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool, ping};
