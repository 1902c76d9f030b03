//! Seams between the services and their collaborators.
//!
//! - `ListingProvider`: listings search and detail (the MLS provider)
//! - `NlpParser`: free text to provider-native request
//! - `BoundaryLookup`: neighborhood polygons
//! - `CommunitySource`: community definitions (the configuration service)
//! - `CacheStore`: TTL key/value persistence, one keyspace per `CacheKind`

pub mod cache;
pub mod community;
pub mod provider;

pub use cache::{CacheEntry, CacheKind, CacheStore};
pub use community::{CommunitySource, SyncReport};
pub use provider::{BoundaryLookup, ListingProvider, NlpParse, NlpParser};
