//! forms_postgres — PostgreSQL adapter for the forms_core store port.
//!
//! All SQL is runtime-checked (`sqlx::query`, not `sqlx::query!`) so building
//! the crate needs no database.

pub mod schema;
pub mod store;

pub use schema::ensure_schema;
pub use store::{PgFormStore, PgFormTx};
