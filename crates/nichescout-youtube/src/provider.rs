//! Provider seams used by the planner and detail resolver.
//!
//! [`crate::YoutubeClient`] is the production implementation; tests plug in
//! scripted fakes.

use std::future::Future;

use crate::error::YoutubeError;
use crate::types::{SearchPage, SearchRequest, VideoDetail};

pub trait VideoSearch: Send + Sync {
    /// Fetch one page of search results.
    fn search_page(
        &self,
        request: &SearchRequest,
    ) -> impl Future<Output = Result<SearchPage, YoutubeError>> + Send;
}

pub trait VideoDetails: Send + Sync {
    /// Fetch statistics for at most 50 ids. Unknown ids are simply absent
    /// from the result; order is unspecified.
    fn video_details(
        &self,
        ids: &[String],
    ) -> impl Future<Output = Result<Vec<VideoDetail>, YoutubeError>> + Send;
}
