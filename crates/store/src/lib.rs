//! SQLite-backed annotation property store.
//!
//! Records are keyed annotations whose nested properties are stored as
//! JSON text in a single column. Predicates composed with
//! `annolake-predicate` run against the store two ways: compiled to a SQL
//! fragment executed by the engine (with the registry's scalar functions
//! registered by [`bridge`]), or natively over the decoded properties of
//! each record. Spatial payloads and their filters belong to the imaging
//! collaborators, not to this crate.

pub mod annotation;
pub mod bridge;
pub mod config;
pub mod error;
pub mod store;

pub use annotation::Annotation;
pub use bridge::register_functions;
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use store::SqliteStore;
