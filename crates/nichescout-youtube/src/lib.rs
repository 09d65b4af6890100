//! YouTube Data API client, two-tier query planner and batched detail resolver.

pub mod client;
pub mod details;
pub mod duration;
pub mod error;
pub mod planner;
pub mod provider;
pub mod types;

mod retry;

pub use client::YoutubeClient;
pub use details::{resolve_details, DETAILS_BATCH_SIZE};
pub use duration::parse_iso8601_duration;
pub use error::YoutubeError;
pub use planner::{
    discover_candidates, merge_unique, plan_queries, PlanInput, PlannedQuery, QueryPlan,
};
pub use provider::{VideoDetails, VideoSearch};
pub use types::{SearchOrder, SearchPage, SearchRequest, VideoDetail, VideoHit};
