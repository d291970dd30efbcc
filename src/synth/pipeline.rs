//! Drives the generators in dependency order, one committed transaction per
//! phase.

use std::time::Instant;

use tracing::info;

use crate::config::SimConfig;
use crate::content::ContentSource;
use crate::errors::GenerationError;
use crate::models::ProjectDescriptor;
use crate::rng::seeded;
use crate::store::Store;
use crate::temporal::Timeline;

use super::custom_fields::{CustomFieldCounts, generate_custom_fields_for_projects};
use super::identity::generate_organization_and_users;
use super::tasks::{TaskGraphCounts, generate_tasks_for_projects};
use super::teams::{generate_teams_and_projects, populate_team_memberships};

/// Phase labels, in execution order.
pub const PHASES: [&str; 6] = [
    "Applying schema",
    "Generating organization and users",
    "Generating teams and projects",
    "Assigning team memberships",
    "Generating tasks, subtasks, comments and attachments",
    "Generating custom fields",
];

/// Receives phase milestones as the pipeline advances.
///
/// `index` is 1-based. The unit type ignores every event.
pub trait PhaseObserver {
    fn phase_started(&self, index: usize, total: usize, label: &str);
    fn phase_finished(&self, index: usize, detail: &str);
}

impl PhaseObserver for () {
    fn phase_started(&self, _index: usize, _total: usize, _label: &str) {}
    fn phase_finished(&self, _index: usize, _detail: &str) {}
}

/// What a completed run wrote.
#[derive(Debug, Clone, Default)]
pub struct GenerationSummary {
    pub organization_id: i64,
    pub users: u32,
    pub teams: u32,
    pub projects: usize,
    pub archived_projects: usize,
    pub memberships: usize,
    pub task_graph: TaskGraphCounts,
    pub custom_fields: CustomFieldCounts,
    pub elapsed_secs: f64,
}

/// Run every phase against `store`.
///
/// Each phase commits before the next begins. A failure leaves the earlier
/// phases in the store and nothing from the failing one.
pub async fn run_generation(
    store: &Store,
    config: &SimConfig,
    content: &dyn ContentSource,
    observer: &dyn PhaseObserver,
) -> Result<GenerationSummary, GenerationError> {
    config.validate()?;
    let started = Instant::now();
    let timeline = Timeline::new(config.reference_now()?)?;
    let mut rng = seeded(config.seed);
    let templates = *content.templates();
    let total = PHASES.len();

    info!(
        users = config.users,
        teams = config.teams,
        seed = config.seed,
        now = %timeline.now(),
        "Starting generation"
    );

    observer.phase_started(1, total, PHASES[0]);
    store.apply_schema().map_err(GenerationError::Store)?;
    observer.phase_finished(1, "schema applied");

    observer.phase_started(2, total, PHASES[1]);
    let tx = store.begin_phase().map_err(GenerationError::Store)?;
    let organization_id =
        generate_organization_and_users(store, &mut rng, &timeline, &templates, config.users)?;
    tx.commit()
        .map_err(|e| GenerationError::Store(e.into()))?;
    observer.phase_finished(2, &format!("{} users", config.users));

    observer.phase_started(3, total, PHASES[2]);
    let tx = store.begin_phase().map_err(GenerationError::Store)?;
    let projects: Vec<ProjectDescriptor> = generate_teams_and_projects(
        store,
        &mut rng,
        &timeline,
        &templates,
        organization_id,
        config.teams,
    )?;
    tx.commit()
        .map_err(|e| GenerationError::Store(e.into()))?;
    let archived_projects = projects.iter().filter(|p| p.is_archived).count();
    observer.phase_finished(
        3,
        &format!("{} teams, {} projects", config.teams, projects.len()),
    );

    observer.phase_started(4, total, PHASES[3]);
    let tx = store.begin_phase().map_err(GenerationError::Store)?;
    let memberships = populate_team_memberships(store, &mut rng, &timeline)?;
    tx.commit()
        .map_err(|e| GenerationError::Store(e.into()))?;
    observer.phase_finished(4, &format!("{} memberships", memberships));

    observer.phase_started(5, total, PHASES[4]);
    let tx = store.begin_phase().map_err(GenerationError::Store)?;
    let task_graph =
        generate_tasks_for_projects(store, &mut rng, &timeline, content, &projects).await?;
    tx.commit()
        .map_err(|e| GenerationError::Store(e.into()))?;
    observer.phase_finished(5, &format!("{} tasks", task_graph.tasks));

    observer.phase_started(6, total, PHASES[5]);
    let tx = store.begin_phase().map_err(GenerationError::Store)?;
    let custom_fields = generate_custom_fields_for_projects(store, &mut rng, &projects)?;
    tx.commit()
        .map_err(|e| GenerationError::Store(e.into()))?;
    observer.phase_finished(
        6,
        &format!(
            "{} definitions, {} values",
            custom_fields.definitions, custom_fields.values
        ),
    );

    let summary = GenerationSummary {
        organization_id,
        users: config.users,
        teams: config.teams,
        projects: projects.len(),
        archived_projects,
        memberships,
        task_graph,
        custom_fields,
        elapsed_secs: started.elapsed().as_secs_f64(),
    };
    info!(
        tasks = summary.task_graph.tasks,
        elapsed_secs = summary.elapsed_secs,
        "Generation complete"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::content::TemplateSource;

    fn small_config(seed: u64) -> SimConfig {
        SimConfig {
            users: 40,
            teams: 4,
            seed,
            now: Some("2025-06-18T15:30:00".into()),
            ..SimConfig::default()
        }
    }

    #[derive(Default)]
    struct Recorder {
        started: RefCell<Vec<usize>>,
        finished: RefCell<Vec<usize>>,
    }

    impl PhaseObserver for Recorder {
        fn phase_started(&self, index: usize, total: usize, _label: &str) {
            assert_eq!(total, PHASES.len());
            self.started.borrow_mut().push(index);
        }
        fn phase_finished(&self, index: usize, _detail: &str) {
            self.finished.borrow_mut().push(index);
        }
    }

    #[tokio::test]
    async fn runs_all_phases_in_order() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        let recorder = Recorder::default();
        let summary =
            run_generation(&store, &small_config(42), &TemplateSource::new(), &recorder).await?;

        assert_eq!(*recorder.started.borrow(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(*recorder.finished.borrow(), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(store.count_rows("users")?, 40);
        assert_eq!(store.count_rows("teams")?, 4);
        assert_eq!(store.count_rows("projects")? as usize, summary.projects);
        assert_eq!(store.count_rows("sections")? as usize, summary.projects * 5);
        assert_eq!(
            store.count_rows("custom_field_values")? as usize,
            summary.custom_fields.values
        );
        Ok(())
    }

    #[tokio::test]
    async fn same_seed_and_now_reproduce_every_table() -> anyhow::Result<()> {
        let a = Store::open_in_memory()?;
        let b = Store::open_in_memory()?;
        run_generation(&a, &small_config(5), &TemplateSource::new(), &()).await?;
        run_generation(&b, &small_config(5), &TemplateSource::new(), &()).await?;
        assert_eq!(a.table_counts()?, b.table_counts()?);

        let last_task = |s: &Store| -> rusqlite::Result<(String, String, String)> {
            s.conn().query_row(
                "SELECT gid, name, created_at FROM tasks ORDER BY id DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
        };
        assert_eq!(last_task(&a)?, last_task(&b)?);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_config_is_rejected_before_writing() -> anyhow::Result<()> {
        let store = Store::open_in_memory()?;
        let config = SimConfig {
            users: 0,
            ..small_config(1)
        };
        let err = run_generation(&store, &config, &TemplateSource::new(), &())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::InvalidConfig(_)));
        assert_eq!(store.count_rows("organizations")?, 0);
        Ok(())
    }
}
