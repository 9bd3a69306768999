//! rescache - TTL-based, reference-aware resource cache for REST entities
//!
//! The cache sits between consumers and a REST API that serves typed
//! entities (projects, users, teams, collections) and ordered relations
//! between them (a team's projects, a collection's projects). It has two
//! halves:
//!
//! - the **store** ([`CacheStore`]) answers reads synchronously with whatever
//!   it knows, stale values included, and says what still needs fetching;
//! - the **coordinator** batches those fetch requests over a short window,
//!   deduplicates and chunks them, follows relation pagination, and writes
//!   the responses back in batches.
//!
//! # Example
//!
//! ```rust,no_run
//! use rescache::{ApiConfig, ResourceCache, Status};
//!
//! #[tokio::main]
//! async fn main() -> rescache::Result<()> {
//!     let cache = ResourceCache::builder()
//!         .rest(ApiConfig::new().token("my-persistent-token"))
//!         .build()?;
//!
//!     // Non-blocking: returns what is cached and queues a fetch.
//!     let team = cache.get("team", 74)?;
//!     assert_eq!(team.status, Status::Loading);
//!
//!     // Or wait for the relation and everything it references.
//!     let projects = cache.load_relation("team", 74, "projects").await?;
//!     println!("{} projects", projects.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod config;
mod coordinator;
pub mod error;
pub mod schema;
pub mod store;
pub mod telemetry;
pub mod types;

// Re-export main types at crate root
pub use api::{Page, ResourceApi, RestClient};
pub use cache::{ResourceCache, ResourceCacheBuilder};
pub use config::{ApiConfig, CacheConfig, Config};
pub use coordinator::merge_requests;
pub use error::{CacheError, Result};
pub use schema::{OrderDirection, RelationDef, RelationOrder, Schema, SchemaBuilder, TypeDef};
pub use store::{CacheStore, WriteTicket};
pub use types::{EntityId, FetchRequest, Lookup, Status};
