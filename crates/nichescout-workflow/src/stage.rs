use std::str::FromStr;

use nichescout_core::ProjectStatus;

/// Workflow stages in forward order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Config,
    Search,
    Filter,
    Embed,
    Input,
    Analysis,
    Validation,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Config,
        Stage::Search,
        Stage::Filter,
        Stage::Embed,
        Stage::Input,
        Stage::Analysis,
        Stage::Validation,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Config => "config",
            Stage::Search => "search",
            Stage::Filter => "filter",
            Stage::Embed => "embed",
            Stage::Input => "input",
            Stage::Analysis => "analysis",
            Stage::Validation => "validation",
        }
    }

    /// The following stage, or `None` at the end of the workflow.
    #[must_use]
    pub fn next(self) -> Option<Stage> {
        let idx = Stage::ALL.iter().position(|s| *s == self)?;
        Stage::ALL.get(idx + 1).copied()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown stage: {s}"))
    }
}

/// Stage a session resumes at for a persisted status.
///
/// Each status resumes at the stage that consumes its output.
#[must_use]
pub fn stage_for_status(status: ProjectStatus) -> Stage {
    match status {
        ProjectStatus::Draft => Stage::Config,
        ProjectStatus::Searched => Stage::Filter,
        ProjectStatus::Filtered | ProjectStatus::EmbeddingPartial => Stage::Embed,
        ProjectStatus::Embedded => Stage::Input,
        ProjectStatus::ConceptSaved => Stage::Analysis,
        ProjectStatus::Analyzed => Stage::Validation,
    }
}
