//! MLS query client: provider request construction and response normalization.

mod client;
mod query;

pub use client::MlsQueryClient;
pub use query::{ListingQuery, QueryBody};
