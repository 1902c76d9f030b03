//! Free-text listing search.

mod matcher;
mod orchestrator;

pub use matcher::{CommunityIndex, QueryMatcher};
pub use orchestrator::{SearchOrchestrator, SearchOutcome, SearchRequest};
