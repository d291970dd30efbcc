//! The task graph: tasks and their subtasks, comments, tag links and
//! attachments.
//!
//! Every child timestamp is derived by adding a non-negative offset to its
//! parent's creation time, so causal ordering holds by construction.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use rand::prelude::*;
use tracing::{debug, info};

use crate::content::{ContentSource, DescriptionShape, TemplateSource};
use crate::errors::GenerationError;
use crate::models::{
    Attachment, Comment, EFFORT_POINTS, Priority, ProjectDescriptor, Subtask, Tag, Task,
};
use crate::rng::{SimRng, chance, gid, weighted};
use crate::store::Store;
use crate::temporal::{Timeline, format_date, format_timestamp};

pub const TAG_NAMES: [&str; 6] = ["bug", "feature", "urgent", "low-effort", "research", "customer"];
const TAG_COLORS: [&str; 6] = ["red", "green", "blue", "purple", "orange", "teal"];

const TASK_LOOKBACK_DAYS: i64 = 365;
const ASSIGNED_PROBABILITY: f64 = 0.85;
const ALLOW_OVERDUE_PROBABILITY: f64 = 0.05;

const SUBTASK_PROBABILITY: f64 = 0.25;
const SUBTASK_INHERITS_ASSIGNEE: f64 = 0.6;
const SUBTASK_ASSIGNED_PROBABILITY: f64 = 0.7;
const SUBTASK_COMPLETED_PROBABILITY: f64 = 0.5;
const COMMENT_PROBABILITY: f64 = 0.6;
const TAG_PROBABILITY: f64 = 0.5;
const ATTACHMENT_PROBABILITY: f64 = 0.05;

/// Rows written by [`generate_tasks_for_projects`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskGraphCounts {
    pub tasks: usize,
    pub subtasks: usize,
    pub comments: usize,
    pub task_tags: usize,
    pub attachments: usize,
}

/// Per-project inputs shared by every task in the project.
struct ProjectScope<'a> {
    descriptor: ProjectDescriptor,
    name: String,
    pool: &'a [i64],
    section_ids: Vec<i64>,
}

/// Archived projects get 5-15 tasks; active ones get their type's range.
pub fn task_count(rng: &mut SimRng, project: &ProjectDescriptor) -> u32 {
    if project.is_archived {
        return rng.gen_range(5..=15);
    }
    let (low, high) = project.project_type.task_count_range();
    rng.gen_range(low..=high)
}

/// Create the shared tag vocabulary. Returns tag ids in [`TAG_NAMES`] order.
pub fn create_tags(store: &Store, rng: &mut SimRng) -> Result<Vec<i64>> {
    let mut ids = Vec::with_capacity(TAG_NAMES.len());
    for name in TAG_NAMES {
        let color = TAG_COLORS.choose(rng).copied().unwrap_or(TAG_COLORS[0]);
        ids.push(store.insert_tag(&Tag {
            id: 0,
            gid: gid(rng),
            name: name.to_string(),
            color: color.to_string(),
        })?);
    }
    Ok(ids)
}

/// Generate the task graph for every project descriptor.
///
/// Assignees, comment authors and uploaders come from the project's team,
/// or from the whole organization when the team has no members.
pub async fn generate_tasks_for_projects(
    store: &Store,
    rng: &mut SimRng,
    timeline: &Timeline,
    content: &dyn ContentSource,
    projects: &[ProjectDescriptor],
) -> Result<TaskGraphCounts> {
    let all_users: Vec<i64> = store
        .list_user_roles()?
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    if all_users.is_empty() {
        return Err(GenerationError::NoUsers.into());
    }
    let team_members = store.team_members()?;
    let tags = create_tags(store, rng)?;

    let mut counts = TaskGraphCounts::default();
    let mut tag_links: HashSet<(i64, i64)> = HashSet::new();

    for (idx, descriptor) in projects.iter().enumerate() {
        let pool = team_members
            .get(&descriptor.team_id)
            .filter(|members| !members.is_empty())
            .map(Vec::as_slice)
            .unwrap_or(&all_users);
        let scope = ProjectScope {
            descriptor: *descriptor,
            name: store.project_name(descriptor.project_id)?,
            pool,
            section_ids: store
                .list_sections(descriptor.project_id)?
                .into_iter()
                .map(|s| s.id)
                .collect(),
        };

        for _ in 0..task_count(rng, descriptor) {
            let (task_id, task, created) =
                insert_task(store, rng, timeline, content, &scope).await?;
            counts.tasks += 1;

            counts.subtasks += insert_subtasks(
                store,
                rng,
                timeline,
                content.templates(),
                &scope,
                &task,
                task_id,
                created,
            )?;
            counts.comments +=
                insert_comments(store, rng, content, &scope, &task, task_id, created).await?;

            if chance(rng, TAG_PROBABILITY) {
                let n = rng.gen_range(1..=2);
                let chosen: Vec<i64> = tags.choose_multiple(rng, n).copied().collect();
                for tag_id in chosen {
                    if tag_links.insert((task_id, tag_id)) {
                        store.insert_task_tag(task_id, tag_id)?;
                        counts.task_tags += 1;
                    }
                }
            }

            if chance(rng, ATTACHMENT_PROBABILITY) {
                let filename = content.templates().attachment_filename(rng);
                let uploaded_by = pick_member(rng, scope.pool)?;
                let at = created + Duration::days(rng.gen_range(0..=15));
                store.insert_attachment(&Attachment {
                    id: 0,
                    gid: gid(rng),
                    task_id,
                    url: format!("https://files.example.com/{}", filename),
                    filename,
                    uploaded_by,
                    created_at: format_timestamp(at),
                })?;
                counts.attachments += 1;
            }
        }

        if (idx + 1) % 200 == 0 {
            debug!(projects = idx + 1, total = projects.len(), "Task generation progress");
        }
    }

    info!(
        tasks = counts.tasks,
        subtasks = counts.subtasks,
        comments = counts.comments,
        task_tags = counts.task_tags,
        attachments = counts.attachments,
        "Created task graph"
    );
    Ok(counts)
}

fn pick_member(rng: &mut SimRng, pool: &[i64]) -> Result<i64> {
    pool.choose(rng)
        .copied()
        .ok_or_else(|| GenerationError::NoUsers.into())
}

async fn insert_task(
    store: &Store,
    rng: &mut SimRng,
    timeline: &Timeline,
    content: &dyn ContentSource,
    scope: &ProjectScope<'_>,
) -> Result<(i64, Task, NaiveDateTime)> {
    let project_type = scope.descriptor.project_type;
    let name = content.task_name(rng, project_type, &scope.name).await;
    let shape = DescriptionShape::draw(rng);
    let description = content
        .task_description(rng, project_type, &name, shape)
        .await;

    let assignee_id = if chance(rng, ASSIGNED_PROBABILITY) {
        scope.pool.choose(rng).copied()
    } else {
        None
    };

    let created = timeline.creation_timestamp(rng, timeline.now(), TASK_LOOKBACK_DAYS);
    let allow_overdue = chance(rng, ALLOW_OVERDUE_PROBABILITY);
    let due_date = timeline.due_date(rng, created, project_type, allow_overdue);

    let completed = chance(rng, project_type.completion_probability());
    let completed_at = if completed {
        Some(timeline.completed_at(rng, created))
    } else {
        None
    };

    let section_id = scope.section_ids.choose(rng).copied();
    let priority = weighted(rng, &Priority::ALL, Priority::weight)
        .context("Failed to draw task priority")?;
    let effort = EFFORT_POINTS.choose(rng).copied().unwrap_or(EFFORT_POINTS[0]);

    let task = Task {
        id: 0,
        gid: gid(rng),
        project_id: scope.descriptor.project_id,
        section_id,
        name,
        description,
        assignee_id,
        created_at: format_timestamp(created),
        due_date: due_date.map(format_date),
        completed,
        completed_at: completed_at.map(format_timestamp),
        priority,
        effort,
    };
    let id = store.insert_task(&task)?;
    Ok((id, task, created))
}

#[allow(clippy::too_many_arguments)]
fn insert_subtasks(
    store: &Store,
    rng: &mut SimRng,
    timeline: &Timeline,
    templates: &TemplateSource,
    scope: &ProjectScope<'_>,
    parent: &Task,
    parent_id: i64,
    parent_created: NaiveDateTime,
) -> Result<usize> {
    if !chance(rng, SUBTASK_PROBABILITY) {
        return Ok(0);
    }
    let n = rng.gen_range(1..=5);

    for _ in 0..n {
        let name = templates.subtask_name(rng);
        let assignee_id = match parent.assignee_id {
            Some(parent_assignee) if chance(rng, SUBTASK_INHERITS_ASSIGNEE) => {
                Some(parent_assignee)
            }
            _ if chance(rng, SUBTASK_ASSIGNED_PROBABILITY) => scope.pool.choose(rng).copied(),
            _ => None,
        };

        let created =
            (parent_created + Duration::days(rng.gen_range(0..=5))).min(timeline.now());
        let due = (created + Duration::days(rng.gen_range(3..=30))).date();
        let completed = chance(rng, SUBTASK_COMPLETED_PROBABILITY);
        let completed_at = if completed {
            Some(format_timestamp(timeline.completed_at(rng, created)))
        } else {
            None
        };

        store.insert_subtask(&Subtask {
            id: 0,
            gid: gid(rng),
            parent_task_id: parent_id,
            name,
            assignee_id,
            created_at: format_timestamp(created),
            due_date: Some(format_date(due)),
            completed,
            completed_at,
        })?;
    }
    Ok(n)
}

async fn insert_comments(
    store: &Store,
    rng: &mut SimRng,
    content: &dyn ContentSource,
    scope: &ProjectScope<'_>,
    task: &Task,
    task_id: i64,
    task_created: NaiveDateTime,
) -> Result<usize> {
    if !chance(rng, COMMENT_PROBABILITY) {
        return Ok(0);
    }
    let n = rng.gen_range(1..=5);
    for _ in 0..n {
        let author_id = pick_member(rng, scope.pool)?;
        let text = content.comment(rng, &task.name).await;
        let at = task_created + Duration::days(rng.gen_range(0..=20));
        store.insert_comment(&Comment {
            id: 0,
            gid: gid(rng),
            task_id,
            author_id,
            text,
            created_at: format_timestamp(at),
        })?;
    }
    Ok(n)
}
