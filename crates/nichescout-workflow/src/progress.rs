//! Progress callbacks for long-running stages.

use crate::controller::StageState;
use crate::stage::Stage;

/// Receives stage lifecycle and batch progress events.
pub trait ProgressSink: Send + Sync {
    /// Called when a stage operation starts.
    fn stage_started(&self, stage: Stage);
    /// Called after every batch with items done and the total.
    fn batch_done(&self, stage: Stage, done: usize, total: usize);
    /// Called once with the terminal state of a non-stale invocation.
    fn stage_finished(&self, stage: Stage, state: &StageState);
}

/// No-op progress sink for headless/test usage.
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn stage_started(&self, _stage: Stage) {}
    fn batch_done(&self, _stage: Stage, _done: usize, _total: usize) {}
    fn stage_finished(&self, _stage: Stage, _state: &StageState) {}
}
