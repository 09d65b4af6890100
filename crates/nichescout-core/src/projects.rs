use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::project::TimeWindow;
use crate::ConfigError;

/// Upper bound on candidates a single project may request.
pub const MAX_CANDIDATE_LIMIT: u32 = 500;

/// Definition of a research project, as written in `config/projects.yaml`
/// or passed to `project create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectDefinition {
    pub name: String,
    pub niche_query: String,
    pub country_code: String,
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: u32,
    #[serde(default = "default_time_window")]
    pub time_window: TimeWindow,
    #[serde(default)]
    pub source_video_id: Option<String>,
}

fn default_candidate_limit() -> u32 {
    50
}

fn default_time_window() -> TimeWindow {
    TimeWindow::Year
}

impl ProjectDefinition {
    /// Check a single definition in isolation.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "project name must be non-empty".to_string(),
            ));
        }
        if self.niche_query.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "project '{}' has an empty niche_query",
                self.name
            )));
        }
        if self.country_code.len() != 2
            || !self.country_code.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(ConfigError::Validation(format!(
                "project '{}' has invalid country_code '{}'; expected two letters",
                self.name, self.country_code
            )));
        }
        if !(1..=MAX_CANDIDATE_LIMIT).contains(&self.candidate_limit) {
            return Err(ConfigError::Validation(format!(
                "project '{}' has invalid candidate_limit {}; must be 1..={MAX_CANDIDATE_LIMIT}",
                self.name, self.candidate_limit
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ProjectsFile {
    pub projects: Vec<ProjectDefinition>,
}

/// Load and validate project definitions from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_projects(path: &Path) -> Result<ProjectsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProjectsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_projects(&content)
}

fn parse_projects(content: &str) -> Result<ProjectsFile, ConfigError> {
    let file: ProjectsFile = serde_yaml::from_str(content)?;
    validate_projects(&file)?;
    Ok(file)
}

fn validate_projects(file: &ProjectsFile) -> Result<(), ConfigError> {
    let mut seen_names = HashSet::new();

    for project in &file.projects {
        project.validate()?;

        if !seen_names.insert(project.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate project name: '{}'",
                project.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r"
projects:
  - name: Budget PC builds
    niche_query: budget gaming pc build
    country_code: US
    candidate_limit: 120
    time_window: quarter
    source_video_id: dQw4w9WgXcQ
  - name: Sourdough
    niche_query: sourdough for beginners
    country_code: GB
";

    #[test]
    fn parses_valid_file_with_defaults() {
        let file = parse_projects(VALID).expect("valid file");
        assert_eq!(file.projects.len(), 2);
        assert_eq!(file.projects[0].time_window, TimeWindow::Quarter);
        assert_eq!(file.projects[0].candidate_limit, 120);
        assert_eq!(file.projects[1].candidate_limit, 50);
        assert_eq!(file.projects[1].time_window, TimeWindow::Year);
        assert!(file.projects[1].source_video_id.is_none());
    }

    #[test]
    fn rejects_duplicate_names_case_insensitively() {
        let yaml = r"
projects:
  - name: Sourdough
    niche_query: a
    country_code: US
  - name: sourdough
    niche_query: b
    country_code: US
";
        let err = parse_projects(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn rejects_bad_country_code() {
        let yaml = r"
projects:
  - name: X
    niche_query: a
    country_code: USA
";
        assert!(matches!(
            parse_projects(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_limit() {
        let yaml = r"
projects:
  - name: X
    niche_query: a
    country_code: US
    candidate_limit: 0
";
        assert!(matches!(
            parse_projects(yaml),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn rejects_unknown_time_window() {
        let yaml = r"
projects:
  - name: X
    niche_query: a
    country_code: US
    time_window: decade
";
        assert!(matches!(
            parse_projects(yaml),
            Err(ConfigError::ProjectsFileParse(_))
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_projects(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ProjectsFileIo { .. }));
    }
}
