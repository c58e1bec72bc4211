//! orientdb-schema — the global property cache and the fetch-plan resolver
//! that sit between the record codec and the session actor.

pub mod error;
pub mod fetch_plan;
pub mod schema;

pub use error::{Missing, SchemaError};
pub use schema::{SchemaCache, SCHEMA_RECORD_RID};
