use std::fmt::Write as _;

use nichescout_core::ResearchProject;
use nichescout_workflow::ValidationView;

/// Render the validation view as a markdown report.
pub(crate) fn render_markdown(project: &ResearchProject, view: &ValidationView) -> String {
    let analysis = &view.analysis;
    let mut out = String::new();

    let _ = writeln!(out, "# {}: concept validation\n", project.name);
    let _ = writeln!(out, "Niche: {}\n", project.niche_query);
    let _ = writeln!(
        out,
        "**Validation score: {:.1} / 100**\n",
        analysis.validation_score
    );

    out.push_str("## Direct competitors\n\n");
    out.push_str("| # | Similarity | Views | Title | Channel |\n");
    out.push_str("|---|-----------:|------:|-------|---------|\n");
    for (rank, m) in analysis.top_matches.iter().enumerate() {
        let candidate = view.top_candidates.iter().find(|c| c.video_id == m.video_id);
        let (views, title, channel) = candidate.map_or(
            ("\u{2014}".to_string(), m.video_id.as_str(), ""),
            |c| {
                (
                    c.view_count.to_string(),
                    c.title.as_str(),
                    c.channel_title.as_str(),
                )
            },
        );
        let _ = writeln!(
            out,
            "| {} | {:.3} | {views} | {} | {channel} |",
            rank + 1,
            m.similarity,
            escape_cell(title)
        );
    }

    out.push_str("\n## Content gaps\n\n");
    if analysis.gaps.is_empty() {
        out.push_str("_No gaps reported._\n");
    }
    for gap in &analysis.gaps {
        let _ = writeln!(out, "- **{:.0}** {}", gap.score, gap.description);
    }

    let suggestions = &analysis.suggestions;
    out.push_str("\n## Suggestions\n\n");
    if !suggestions.title_variants.is_empty() {
        out.push_str("Titles:\n");
        for title in &suggestions.title_variants {
            let _ = writeln!(out, "- {title}");
        }
        out.push('\n');
    }
    if let Some(description) = &suggestions.description {
        let _ = writeln!(out, "Description:\n\n> {}\n", description.replace('\n', "\n> "));
    }
    if !suggestions.tags.is_empty() {
        let _ = writeln!(out, "Tags: {}", suggestions.tags.join(", "));
    }

    if let Some(extended) = &analysis.extended {
        out.push_str("\n## Patterns\n\n");
        for hook in &extended.hook_patterns {
            let _ = writeln!(out, "- Hook: {hook}");
        }
        for thumb in &extended.thumbnail_patterns {
            let _ = writeln!(out, "- Thumbnail: {thumb}");
        }
        if let Some(notes) = &extended.audience_notes {
            let _ = writeln!(out, "\nAudience: {notes}");
        }
    }

    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use nichescout_core::{
        AnalysisResult, CandidateMatch, ContentGap, ProjectStatus, Suggestions, TimeWindow,
        ANALYSIS_ARTIFACT_VERSION,
    };

    use super::*;

    fn project() -> ResearchProject {
        ResearchProject {
            id: 1,
            public_id: uuid::Uuid::nil(),
            name: "Budget PC builds".to_string(),
            niche_query: "budget gaming pc".to_string(),
            country_code: "US".to_string(),
            candidate_limit: 50,
            time_window: TimeWindow::Year,
            status: ProjectStatus::Analyzed,
            source_video_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn report_lists_gaps_and_unresolved_matches() {
        let view = ValidationView {
            analysis: AnalysisResult {
                version: ANALYSIS_ARTIFACT_VERSION,
                top_matches: vec![CandidateMatch {
                    video_id: "gone".to_string(),
                    similarity: 0.91,
                }],
                pattern_summary: serde_json::json!({}),
                gaps: vec![ContentGap {
                    description: "No sub-$500 AMD builds".to_string(),
                    score: 82.0,
                }],
                suggestions: Suggestions {
                    title_variants: vec!["$450 | AMD build".to_string()],
                    description: None,
                    tags: vec!["amd".to_string(), "budget".to_string()],
                },
                validation_score: 82.0,
                extended: None,
                created_at: Utc::now(),
            },
            top_candidates: vec![],
        };

        let md = render_markdown(&project(), &view);
        assert!(md.contains("**Validation score: 82.0 / 100**"));
        assert!(md.contains("| 1 | 0.910 | \u{2014} | gone |  |"));
        assert!(md.contains("- **82** No sub-$500 AMD builds"));
        assert!(md.contains("Tags: amd, budget"));
        assert!(!md.contains("## Patterns"));
    }
}
