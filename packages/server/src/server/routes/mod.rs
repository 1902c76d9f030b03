// HTTP routes
pub mod communities;
pub mod health;
pub mod listings;
pub mod market_stats;
pub mod search;

pub use communities::*;
pub use health::*;
pub use listings::*;
pub use market_stats::*;
pub use search::*;
