use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CoreError;

/// A research project: one niche, one candidate set, one concept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchProject {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub niche_query: String,
    /// ISO 3166-1 alpha-2 region code passed to the search provider.
    pub country_code: String,
    pub candidate_limit: u32,
    pub time_window: TimeWindow,
    pub status: ProjectStatus,
    /// Optional video whose tags/category seed the secondary query and scorer.
    pub source_video_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Persisted pipeline status. Each value records the last stage output that
/// was durably written; variants are ordered by pipeline progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Draft,
    Searched,
    Filtered,
    EmbeddingPartial,
    Embedded,
    ConceptSaved,
    Analyzed,
}

impl ProjectStatus {
    pub const ALL: [ProjectStatus; 7] = [
        ProjectStatus::Draft,
        ProjectStatus::Searched,
        ProjectStatus::Filtered,
        ProjectStatus::EmbeddingPartial,
        ProjectStatus::Embedded,
        ProjectStatus::ConceptSaved,
        ProjectStatus::Analyzed,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Searched => "searched",
            ProjectStatus::Filtered => "filtered",
            ProjectStatus::EmbeddingPartial => "embedding_partial",
            ProjectStatus::Embedded => "embedded",
            ProjectStatus::ConceptSaved => "concept_saved",
            ProjectStatus::Analyzed => "analyzed",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProjectStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::UnknownStatus(s.to_string()))
    }
}

/// How far back the search looks for published videos.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Week,
    Month,
    Quarter,
    Year,
    All,
}

impl TimeWindow {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimeWindow::Week => "week",
            TimeWindow::Month => "month",
            TimeWindow::Quarter => "quarter",
            TimeWindow::Year => "year",
            TimeWindow::All => "all",
        }
    }

    /// Earliest publish date admitted by this window, or `None` for no bound.
    #[must_use]
    pub fn lower_bound(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let days = match self {
            TimeWindow::Week => 7,
            TimeWindow::Month => 30,
            TimeWindow::Quarter => 90,
            TimeWindow::Year => 365,
            TimeWindow::All => return None,
        };
        Some(now - Duration::days(days))
    }
}

impl std::fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeWindow {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(TimeWindow::Week),
            "month" => Ok(TimeWindow::Month),
            "quarter" => Ok(TimeWindow::Quarter),
            "year" => Ok(TimeWindow::Year),
            "all" => Ok(TimeWindow::All),
            other => Err(CoreError::UnknownTimeWindow(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn status_round_trips_through_its_string_form() {
        for status in ProjectStatus::ALL {
            assert_eq!(status.as_str().parse::<ProjectStatus>(), Ok(status));
        }
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert_eq!(
            "completed".parse::<ProjectStatus>(),
            Err(CoreError::UnknownStatus("completed".to_string()))
        );
    }

    #[test]
    fn status_serializes_as_snake_case() {
        let json = serde_json::to_string(&ProjectStatus::EmbeddingPartial).unwrap();
        assert_eq!(json, "\"embedding_partial\"");
    }

    #[test]
    fn time_window_lower_bound() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(
            TimeWindow::Week.lower_bound(now),
            Some(Utc.with_ymd_and_hms(2025, 3, 24, 12, 0, 0).unwrap())
        );
        assert_eq!(TimeWindow::All.lower_bound(now), None);
    }

    #[test]
    fn unknown_time_window_is_an_error() {
        assert!(matches!(
            "decade".parse::<TimeWindow>(),
            Err(CoreError::UnknownTimeWindow(_))
        ));
    }
}
