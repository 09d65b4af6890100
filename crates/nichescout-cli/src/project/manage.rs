use nichescout_core::{ProjectDefinition, ResearchProject};
use nichescout_workflow::stage_for_status;

/// Validate and insert a new project.
///
/// # Errors
///
/// Returns an error if the definition is invalid or the insert fails
/// (for example a duplicate name).
pub(crate) async fn run_create(
    pool: &sqlx::PgPool,
    definition: &ProjectDefinition,
) -> anyhow::Result<()> {
    definition.validate()?;
    let row = nichescout_db::create_project(pool, definition).await?;
    println!("created project {} ({})", row.id, row.name);
    Ok(())
}

pub(crate) async fn run_list(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let rows = nichescout_db::list_projects(pool).await?;
    if rows.is_empty() {
        println!("no projects found; run `project create` or `db seed` first");
        return Ok(());
    }

    println!(
        "{:<6}{:<19}{:<8}{:<7}NAME",
        "ID", "STATUS", "REGION", "LIMIT"
    );
    for row in &rows {
        println!(
            "{:<6}{:<19}{:<8}{:<7}{}",
            row.id,
            row.status,
            row.country_code.trim(),
            row.candidate_limit,
            row.name
        );
    }
    Ok(())
}

/// Show where a project stands and what it has persisted.
///
/// # Errors
///
/// Returns an error if the project is missing or a query fails.
pub(crate) async fn run_status(pool: &sqlx::PgPool, id: i64) -> anyhow::Result<()> {
    let row = nichescout_db::get_project(pool, id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("project {id} not found"))?;
    let project = ResearchProject::try_from(row)?;

    let candidates = nichescout_db::load_candidates(pool, id).await?;
    let embedded = candidates.iter().filter(|c| c.has_embedding()).count();
    let concept = nichescout_db::load_concept(pool, id).await?;
    let analysis = nichescout_db::load_analysis(pool, id).await?;

    println!("Project {}: {}", project.id, project.name);
    println!("Niche:      {}", project.niche_query);
    println!(
        "Search:     region {}, window {}, keep {}",
        project.country_code, project.time_window, project.candidate_limit
    );
    println!("Status:     {}", project.status);
    println!("Next stage: {}", stage_for_status(project.status));
    println!("Candidates: {} ({embedded} embedded)", candidates.len());
    println!(
        "Concept:    {}",
        concept.map_or_else(|| "\u{2014}".to_string(), |c| c.title)
    );
    println!(
        "Analysis:   {}",
        analysis.map_or_else(
            || "\u{2014}".to_string(),
            |a| format!("validation score {:.1}", a.validation_score)
        )
    );
    Ok(())
}
