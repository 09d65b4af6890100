use nichescout_workflow::{ProgressSink, Stage, StageState};

/// Reports stage progress through `tracing` so it lands on stderr next to
/// the rest of the run's logs.
pub(crate) struct LogProgress;

impl ProgressSink for LogProgress {
    fn stage_started(&self, stage: Stage) {
        tracing::info!(%stage, "stage started");
    }

    fn batch_done(&self, stage: Stage, done: usize, total: usize) {
        tracing::info!(%stage, done, total, "progress");
    }

    fn stage_finished(&self, stage: Stage, state: &StageState) {
        match state {
            StageState::Failed { message, retriable } => {
                tracing::warn!(%stage, retriable, error = %message, "stage failed");
            }
            _ => tracing::debug!(%stage, ?state, "stage finished"),
        }
    }
}
