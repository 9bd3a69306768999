//! Public types for the resource cache API.

mod id;
mod lookup;
mod request;

pub use id::EntityId;
pub use lookup::{Lookup, Status};
pub use request::FetchRequest;
