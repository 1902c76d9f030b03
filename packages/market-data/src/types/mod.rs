//! Canonical data types shared by every layer.

pub mod community;
pub mod filters;
pub mod listing;
pub mod results;
pub mod stats;

pub use community::{Community, CommunityKind, CommunityPage, CommunityQuery, EnrichedCommunity, SearchSource};
pub use filters::{LocationFilter, SearchFilters, SortOrder, TransactionType};
pub use listing::{Address, Listing, ListingStatus, PropertyType};
pub use results::{PriceBounds, SearchResults};
pub use stats::{AreaKey, MarketStats};
