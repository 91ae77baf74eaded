//! PostgreSQL connection pooling and schema migrations

pub mod migrations;
mod postgres;

pub use migrations::{revert_last_migration, run_migrations, schema_migrations, Migration};
pub use postgres::{connect_pool, PostgresConfig};
