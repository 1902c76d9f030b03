//! Community definitions and their live-stats enrichment.

mod aggregator;
mod config_client;
mod directory;
mod fallback;

pub use aggregator::CommunityAggregator;
pub use config_client::{HttpCommunitySource, SYNC_BATCH_SIZE, SYNC_SECRET_HEADER};
pub use directory::CommunityDirectory;
pub use fallback::StaticCommunities;
