//! Resumable multi-stage research workflow.
//!
//! A [`WorkflowSession`] tracks where the user is (stage, watermark,
//! exclusion mask, per-stage state) for one project. A [`Pipeline`] runs the
//! stage operations against the persisted artifacts and external providers.

pub mod analysis;
pub mod controller;
pub mod error;
pub mod oracle;
pub mod progress;
pub mod stage;
pub mod stages;

pub use controller::{StageState, StageTicket, WorkflowSession};
pub use error::PipelineError;
pub use oracle::{AnalysisOracle, ChatOracle, OracleCall, OracleError, OracleRequest};
pub use progress::{ProgressSink, SilentProgress};
pub use stage::{stage_for_status, Stage};
pub use stages::{
    EmbedSummary, FilterSummary, Pipeline, PipelineSettings, SearchSummary, ValidationView,
};
