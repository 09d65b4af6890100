//! Session-local workflow state: current stage, watermark, exclusion mask
//! and per-stage execution state.

use std::collections::{BTreeMap, BTreeSet};

use nichescout_core::{ProjectStatus, ProjectStore, ResearchProject};

use crate::error::PipelineError;
use crate::stage::{stage_for_status, Stage};

/// Execution state of one stage within a session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StageState {
    #[default]
    Idle,
    Running {
        done: usize,
        total: usize,
    },
    Succeeded,
    Failed {
        message: String,
        retriable: bool,
    },
}

/// Identifies one stage invocation. Only the most recent ticket can apply
/// its result; navigation and newer invocations make older tickets stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTicket {
    stage: Stage,
    generation: u64,
}

impl StageTicket {
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }
}

#[derive(Debug, Clone)]
pub struct WorkflowSession {
    project: ResearchProject,
    current: Stage,
    watermark: Stage,
    generation: u64,
    states: BTreeMap<Stage, StageState>,
    excluded: BTreeSet<String>,
}

impl WorkflowSession {
    /// Load the project and position the session at the stage its persisted
    /// status resumes to.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NotFound`] for an unknown project,
    /// [`PipelineError::UnknownStatus`] for an unparseable status, and
    /// [`PipelineError::Store`] for other storage failures.
    pub async fn resume<S: ProjectStore>(
        store: &S,
        project_id: i64,
    ) -> Result<Self, PipelineError> {
        let project = store.load_project(project_id).await?;
        let session = Self::from_project(project);
        tracing::info!(
            project_id,
            status = %session.project.status,
            stage = %session.current,
            "session resumed"
        );
        Ok(session)
    }

    /// Derive the starting stage from the project's status. The mapped
    /// stage is both the current stage and the initial watermark.
    #[must_use]
    pub fn from_project(project: ResearchProject) -> Self {
        let stage = stage_for_status(project.status);
        Self {
            project,
            current: stage,
            watermark: stage,
            generation: 0,
            states: BTreeMap::new(),
            excluded: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn project(&self) -> &ResearchProject {
        &self.project
    }

    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.current
    }

    /// Furthest stage visited in this session.
    #[must_use]
    pub fn watermark(&self) -> Stage {
        self.watermark
    }

    #[must_use]
    pub fn stage_state(&self, stage: Stage) -> StageState {
        self.states.get(&stage).cloned().unwrap_or_default()
    }

    /// Move to `target`.
    ///
    /// Backward moves and a single forward step are always allowed; a
    /// forward jump is allowed only up to the watermark. Changing stage
    /// invalidates any in-flight invocation.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] for a forward jump past
    /// the watermark.
    pub fn navigate(&mut self, target: Stage) -> Result<(), PipelineError> {
        if target == self.current {
            return Ok(());
        }
        let one_step = self.current.next() == Some(target);
        if target > self.current && !one_step && target > self.watermark {
            return Err(PipelineError::InvalidTransition {
                from: self.current,
                to: target,
            });
        }

        tracing::debug!(from = %self.current, to = %target, "navigate");
        self.generation += 1;
        self.current = target;
        self.watermark = self.watermark.max(target);
        Ok(())
    }

    /// Step forward by one stage.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] at the last stage.
    pub fn advance(&mut self) -> Result<Stage, PipelineError> {
        let next = self
            .current
            .next()
            .ok_or(PipelineError::InvalidTransition {
                from: self.current,
                to: self.current,
            })?;
        self.navigate(next)?;
        Ok(next)
    }

    /// Start an invocation of `stage`, superseding any earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidTransition`] unless `stage` is the
    /// current stage.
    pub fn begin(&mut self, stage: Stage) -> Result<StageTicket, PipelineError> {
        if stage != self.current {
            return Err(PipelineError::InvalidTransition {
                from: self.current,
                to: stage,
            });
        }
        self.generation += 1;
        self.states
            .insert(stage, StageState::Running { done: 0, total: 0 });
        Ok(StageTicket {
            stage,
            generation: self.generation,
        })
    }

    #[must_use]
    pub fn is_current(&self, ticket: &StageTicket) -> bool {
        ticket.generation == self.generation && ticket.stage == self.current
    }

    /// Record batch progress; ignored for stale tickets.
    pub fn report_progress(&mut self, ticket: &StageTicket, done: usize, total: usize) {
        if self.is_current(ticket) {
            self.states
                .insert(ticket.stage, StageState::Running { done, total });
        }
    }

    /// Apply the outcome of an invocation.
    ///
    /// A stale ticket discards the outcome and yields
    /// [`PipelineError::StaleInvocation`]. Otherwise the stage state becomes
    /// `Succeeded` or `Failed` and the outcome is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the invocation's own error, or `StaleInvocation`.
    pub fn finish<T>(
        &mut self,
        ticket: StageTicket,
        outcome: Result<T, PipelineError>,
    ) -> Result<T, PipelineError> {
        if !self.is_current(&ticket) {
            tracing::debug!(stage = %ticket.stage, "discarding stale stage result");
            return Err(PipelineError::StaleInvocation {
                stage: ticket.stage,
            });
        }
        let state = match &outcome {
            Ok(_) => {
                tracing::info!(
                    stage = %ticket.stage,
                    project_id = self.project.id,
                    "stage succeeded"
                );
                StageState::Succeeded
            }
            Err(e) => {
                tracing::error!(
                    stage = %ticket.stage,
                    project_id = self.project.id,
                    error = %e,
                    "stage failed"
                );
                StageState::Failed {
                    message: e.to_string(),
                    retriable: e.is_retriable(),
                }
            }
        };
        self.states.insert(ticket.stage, state);
        outcome
    }

    /// Reload project data without touching stage or watermark.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn refresh_project<S: ProjectStore>(
        &mut self,
        store: &S,
    ) -> Result<(), PipelineError> {
        self.project = store.load_project(self.project.id).await?;
        Ok(())
    }

    pub(crate) fn set_status(&mut self, status: ProjectStatus) {
        self.project.status = status;
    }

    // -- exclusion mask -----------------------------------------------------

    /// Mark a candidate for removal at the FILTER → EMBED transition.
    pub fn exclude(&mut self, video_id: impl Into<String>) {
        self.excluded.insert(video_id.into());
    }

    pub fn include(&mut self, video_id: &str) {
        self.excluded.remove(video_id);
    }

    /// Flip a candidate's exclusion; returns `true` when it is now excluded.
    pub fn toggle_exclusion(&mut self, video_id: &str) -> bool {
        if self.excluded.remove(video_id) {
            false
        } else {
            self.excluded.insert(video_id.to_string());
            true
        }
    }

    #[must_use]
    pub fn is_excluded(&self, video_id: &str) -> bool {
        self.excluded.contains(video_id)
    }

    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    pub fn clear_exclusions(&mut self) {
        self.excluded.clear();
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
