//! Teams, their projects and sections, and team membership.

use std::collections::HashSet;

use anyhow::{Context, Result};
use chrono::Duration;
use rand::prelude::*;
use tracing::{debug, info};

use crate::content::TemplateSource;
use crate::errors::GenerationError;
use crate::models::{
    MembershipRole, Project, ProjectDescriptor, ProjectType, Section, SectionName, Team,
    TeamArchetype, TeamMembership, UserRole,
};
use crate::rng::{SimRng, chance, gid, weighted};
use crate::store::Store;
use crate::temporal::{Timeline, format_timestamp};

const ARCHIVED_PROBABILITY: f64 = 0.025;
const ENGINEERING_SHARE: f64 = 0.7;
const LEAD_PROBABILITY: f64 = 0.25;

/// Insert `team_count` teams, 2-8 projects per team and the five fixed
/// sections per project.
///
/// Returns one descriptor per project, in insertion order.
pub fn generate_teams_and_projects(
    store: &Store,
    rng: &mut SimRng,
    timeline: &Timeline,
    templates: &TemplateSource,
    organization_id: i64,
    team_count: u32,
) -> Result<Vec<ProjectDescriptor>> {
    let mut descriptors = Vec::new();
    let now = timeline.now();

    for t in 0..team_count {
        let team_id = store.insert_team(&Team {
            id: 0,
            gid: gid(rng),
            organization_id,
            name: templates.team_name(rng),
            description: templates.sentence(rng, 8),
            created_at: format_timestamp(now),
        })?;

        for _ in 0..rng.gen_range(2..=8) {
            let project_type = weighted(rng, &ProjectType::ALL, ProjectType::weight)
                .context("Failed to draw project type")?;
            let name = templates.project_name(rng, project_type);
            let description = templates.paragraph(rng, 2);
            let created = timeline.creation_timestamp(rng, now, 365);
            let is_archived = chance(rng, ARCHIVED_PROBABILITY);

            let project_id = store.insert_project(&Project {
                id: 0,
                gid: gid(rng),
                team_id,
                organization_id,
                name,
                description,
                project_type,
                is_archived,
                created_at: format_timestamp(created),
            })?;

            for section in SectionName::ORDERED {
                store.insert_section(&Section {
                    id: 0,
                    gid: gid(rng),
                    project_id,
                    name: section.as_str().to_string(),
                    position: section.position(),
                })?;
            }

            descriptors.push(ProjectDescriptor {
                project_id,
                team_id,
                project_type,
                is_archived,
            });
        }

        if (t + 1) % 50 == 0 {
            debug!(created = t + 1, total = team_count, "Teams progress");
        }
    }

    info!(
        teams = team_count,
        projects = descriptors.len(),
        "Created teams and projects"
    );
    Ok(descriptors)
}

/// Staff every team with 5-20 members.
///
/// Engineering-archetype teams take `floor(size * 0.7)` engineers first and
/// fill the rest from other roles; every other archetype samples the whole
/// population. Returns the number of memberships written.
pub fn populate_team_memberships(
    store: &Store,
    rng: &mut SimRng,
    timeline: &Timeline,
) -> Result<usize> {
    let team_ids = store.list_team_ids()?;
    if team_ids.is_empty() {
        return Err(GenerationError::NoTeams.into());
    }
    let users = store.list_user_roles()?;
    if users.is_empty() {
        return Err(GenerationError::NoUsers.into());
    }

    let engineers: Vec<i64> = users
        .iter()
        .filter(|(_, role)| *role == UserRole::Engineer)
        .map(|(id, _)| *id)
        .collect();
    let others: Vec<i64> = users
        .iter()
        .filter(|(_, role)| *role != UserRole::Engineer)
        .map(|(id, _)| *id)
        .collect();
    let everyone: Vec<i64> = users.iter().map(|(id, _)| *id).collect();

    let mut seen: HashSet<(i64, i64)> = HashSet::new();
    let mut written = 0usize;

    for team_id in team_ids {
        let size: usize = rng.gen_range(5..=20);
        let archetype = weighted(rng, &TeamArchetype::ALL, TeamArchetype::weight)
            .context("Failed to draw team archetype")?;

        let members: Vec<i64> = if archetype == TeamArchetype::Engineering && !engineers.is_empty()
        {
            let eng_target = (size as f64 * ENGINEERING_SHARE).floor() as usize;
            let mut picked: Vec<i64> = engineers
                .choose_multiple(rng, eng_target.min(engineers.len()))
                .copied()
                .collect();
            let remaining = size.saturating_sub(picked.len());
            picked.extend(others.choose_multiple(rng, remaining.min(others.len())));
            picked
        } else {
            everyone
                .choose_multiple(rng, size.min(everyone.len()))
                .copied()
                .collect()
        };

        for user_id in members {
            let role = if chance(rng, LEAD_PROBABILITY) {
                MembershipRole::Lead
            } else {
                MembershipRole::Member
            };
            let joined = timeline.now() - Duration::days(rng.gen_range(30..=730));
            if !seen.insert((team_id, user_id)) {
                continue;
            }
            store.insert_membership(&TeamMembership {
                team_id,
                user_id,
                role,
                joined_at: format_timestamp(joined),
            })?;
            written += 1;
        }
    }

    info!(memberships = written, "Created team memberships");
    Ok(written)
}
