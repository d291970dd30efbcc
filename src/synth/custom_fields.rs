//! Per-project custom field definitions and sparse task values.

use anyhow::Result;
use rand::prelude::*;
use tracing::info;

use crate::models::{
    CustomFieldDefinition, CustomFieldValue, FieldType, ProjectDescriptor, ProjectType,
};
use crate::rng::{SimRng, chance, gid};
use crate::store::Store;

const VALUE_PROBABILITY: f64 = 0.7;
const NUMBER_VALUES: [i64; 6] = [1, 2, 3, 5, 8, 13];

#[derive(Debug, Clone, Copy)]
enum TemplateKind {
    Enum(&'static [&'static str]),
    Number,
    Text,
}

#[derive(Debug, Clone, Copy)]
struct FieldTemplate {
    name: &'static str,
    kind: TemplateKind,
}

const fn field(name: &'static str, kind: TemplateKind) -> FieldTemplate {
    FieldTemplate { name, kind }
}

const ENGINEERING_FIELDS: &[FieldTemplate] = &[
    field(
        "Priority",
        TemplateKind::Enum(&["Low", "Medium", "High", "Critical"]),
    ),
    field("Story Points", TemplateKind::Number),
    field("Sprint", TemplateKind::Text),
    field(
        "Component",
        TemplateKind::Enum(&["Frontend", "Backend", "Database", "API", "DevOps"]),
    ),
    field(
        "Bug Severity",
        TemplateKind::Enum(&["Minor", "Major", "Critical", "Blocker"]),
    ),
];

const MARKETING_FIELDS: &[FieldTemplate] = &[
    field(
        "Campaign Status",
        TemplateKind::Enum(&["Planning", "In Progress", "Review", "Live", "Complete"]),
    ),
    field("Target Audience", TemplateKind::Text),
    field("Budget", TemplateKind::Number),
    field(
        "Channel",
        TemplateKind::Enum(&["Email", "Social", "Web", "Events", "Paid Ads"]),
    ),
];

const OPS_FIELDS: &[FieldTemplate] = &[
    field(
        "Priority",
        TemplateKind::Enum(&["Low", "Medium", "High", "Urgent"]),
    ),
    field(
        "Department",
        TemplateKind::Enum(&["HR", "Finance", "IT", "Legal", "Operations"]),
    ),
    field(
        "Status",
        TemplateKind::Enum(&["Not Started", "In Progress", "Blocked", "Complete"]),
    ),
];

fn templates_for(project_type: ProjectType) -> &'static [FieldTemplate] {
    match project_type {
        ProjectType::Engineering => ENGINEERING_FIELDS,
        ProjectType::Marketing => MARKETING_FIELDS,
        ProjectType::Ops => OPS_FIELDS,
    }
}

impl FieldTemplate {
    fn instantiate(&self, rng: &mut SimRng, project_id: i64) -> CustomFieldDefinition {
        let (field_type, options): (FieldType, Option<Vec<String>>) = match self.kind {
            TemplateKind::Enum(opts) => (
                FieldType::Enum,
                Some(opts.iter().map(|o| o.to_string()).collect()),
            ),
            TemplateKind::Number => (FieldType::Number, None),
            TemplateKind::Text => (FieldType::Text, None),
        };
        CustomFieldDefinition {
            id: 0,
            gid: gid(rng),
            project_id,
            name: self.name.to_string(),
            field_type,
            options,
        }
    }
}

/// A value consistent with `def`'s declared type.
///
/// Unrecognized types, and enums without options, get `"N/A"`.
pub fn field_value(rng: &mut SimRng, def: &CustomFieldDefinition) -> String {
    match (&def.field_type, def.options.as_deref()) {
        (FieldType::Enum, Some(options)) if !options.is_empty() => options
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| "N/A".to_string()),
        (FieldType::Number, _) => NUMBER_VALUES
            .choose(rng)
            .copied()
            .unwrap_or(NUMBER_VALUES[0])
            .to_string(),
        (FieldType::Text, _) if def.name.contains("Sprint") => {
            format!("Sprint {}", rng.gen_range(1..=20))
        }
        (FieldType::Text, _) => "Notes".to_string(),
        _ => "N/A".to_string(),
    }
}

/// Rows written by [`generate_custom_fields_for_projects`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomFieldCounts {
    pub definitions: usize,
    pub values: usize,
}

/// Give each project 2-4 fields from its type's template set, then fill 1-3
/// of them on roughly 70% of the project's tasks.
pub fn generate_custom_fields_for_projects(
    store: &Store,
    rng: &mut SimRng,
    projects: &[ProjectDescriptor],
) -> Result<CustomFieldCounts> {
    let mut counts = CustomFieldCounts::default();

    for project in projects {
        let templates = templates_for(project.project_type);
        let n = rng.gen_range(2..=templates.len().min(4));
        let selected: Vec<FieldTemplate> = templates.choose_multiple(rng, n).copied().collect();

        let mut defs = Vec::with_capacity(selected.len());
        for template in selected {
            let mut def = template.instantiate(rng, project.project_id);
            def.id = store.insert_custom_field_def(&def)?;
            defs.push(def);
        }
        counts.definitions += defs.len();

        for task_id in store.task_ids_for_project(project.project_id)? {
            if !chance(rng, VALUE_PROBABILITY) {
                continue;
            }
            let k = rng.gen_range(1..=3).min(defs.len());
            let fill: Vec<&CustomFieldDefinition> = defs.choose_multiple(rng, k).collect();
            for def in fill {
                let value = field_value(rng, def);
                store.insert_custom_field_value(&CustomFieldValue {
                    custom_field_def_id: def.id,
                    task_id,
                    value,
                })?;
                counts.values += 1;
            }
        }
    }

    info!(
        definitions = counts.definitions,
        values = counts.values,
        "Created custom fields"
    );
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::TemplateSource;
    use crate::rng::seeded;
    use crate::synth::identity::generate_organization_and_users;
    use crate::synth::tasks::generate_tasks_for_projects;
    use crate::synth::teams::{generate_teams_and_projects, populate_team_memberships};
    use crate::temporal::{Timeline, parse_timestamp};
    use std::collections::HashMap;

    async fn fielded_graph(
        seed: u64,
    ) -> Result<(Store, Vec<ProjectDescriptor>, CustomFieldCounts)> {
        let store = Store::open_in_memory()?;
        let mut rng = seeded(seed);
        let tl = Timeline::new(parse_timestamp("2025-06-18T15:30:00")?)?;
        let templates = TemplateSource::new();
        let org_id = generate_organization_and_users(&store, &mut rng, &tl, &templates, 60)?;
        let projects = generate_teams_and_projects(&store, &mut rng, &tl, &templates, org_id, 6)?;
        populate_team_memberships(&store, &mut rng, &tl)?;
        generate_tasks_for_projects(&store, &mut rng, &tl, &templates, &projects).await?;
        let counts = generate_custom_fields_for_projects(&store, &mut rng, &projects)?;
        Ok((store, projects, counts))
    }

    fn scalar(store: &Store, sql: &str) -> i64 {
        store.conn().query_row(sql, [], |row| row.get(0)).unwrap()
    }

    fn def(name: &str, field_type: FieldType, options: Option<Vec<&str>>) -> CustomFieldDefinition {
        CustomFieldDefinition {
            id: 1,
            gid: "cf".into(),
            project_id: 1,
            name: name.into(),
            field_type,
            options: options.map(|o| o.into_iter().map(String::from).collect()),
        }
    }

    #[test]
    fn template_sets_cover_each_type() {
        assert_eq!(templates_for(ProjectType::Engineering).len(), 5);
        assert_eq!(templates_for(ProjectType::Marketing).len(), 4);
        assert_eq!(templates_for(ProjectType::Ops).len(), 3);
    }

    #[test]
    fn values_follow_declared_type() {
        let mut rng = seeded(12);
        let channel = def("Channel", FieldType::Enum, Some(vec!["Email", "Web"]));
        let budget = def("Budget", FieldType::Number, None);
        let sprint = def("Sprint", FieldType::Text, None);
        let audience = def("Target Audience", FieldType::Text, None);
        let unknown = def("Launch", FieldType::Other("date".into()), None);
        let bare_enum = def("Empty", FieldType::Enum, None);

        for _ in 0..100 {
            let v = field_value(&mut rng, &channel);
            assert!(v == "Email" || v == "Web");
            let n: i64 = field_value(&mut rng, &budget).parse().unwrap();
            assert!(NUMBER_VALUES.contains(&n));
            assert!(field_value(&mut rng, &sprint).starts_with("Sprint "));
        }
        assert_eq!(field_value(&mut rng, &audience), "Notes");
        assert_eq!(field_value(&mut rng, &unknown), "N/A");
        assert_eq!(field_value(&mut rng, &bare_enum), "N/A");
    }

    #[tokio::test]
    async fn projects_get_two_to_four_fields_from_their_type() -> Result<()> {
        let (store, projects, counts) = fielded_graph(42).await?;
        let defs = store.list_custom_field_defs()?;
        assert_eq!(defs.len(), counts.definitions);

        let mut by_project: HashMap<i64, Vec<&CustomFieldDefinition>> = HashMap::new();
        for def in &defs {
            by_project.entry(def.project_id).or_default().push(def);
        }
        for project in &projects {
            let fields = by_project.get(&project.project_id).cloned().unwrap_or_default();
            assert!((2..=4).contains(&fields.len()), "{} fields", fields.len());

            let allowed: Vec<&str> = templates_for(project.project_type)
                .iter()
                .map(|t| t.name)
                .collect();
            for def in fields {
                assert!(allowed.contains(&def.name.as_str()), "{}", def.name);
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn values_are_sparse_bounded_and_unique() -> Result<()> {
        let (store, _, counts) = fielded_graph(42).await?;
        assert_eq!(store.count_rows("custom_field_values")? as usize, counts.values);

        let tasks = store.count_rows("tasks")?;
        let with_values = scalar(&store, "SELECT COUNT(DISTINCT task_id) FROM custom_field_values");
        let share = with_values as f64 / tasks as f64;
        assert!((0.6..=0.8).contains(&share), "share {share}");

        let overfull = scalar(
            &store,
            "SELECT COUNT(*) FROM (SELECT task_id FROM custom_field_values
             GROUP BY task_id HAVING COUNT(*) > 3)",
        );
        let duplicate_pairs = scalar(
            &store,
            "SELECT COUNT(*) FROM (SELECT 1 FROM custom_field_values
             GROUP BY task_id, custom_field_def_id HAVING COUNT(*) > 1)",
        );
        let foreign_fields = scalar(
            &store,
            "SELECT COUNT(*) FROM custom_field_values v
             JOIN tasks t ON t.id = v.task_id
             JOIN custom_field_defs d ON d.id = v.custom_field_def_id
             WHERE d.project_id != t.project_id",
        );
        assert_eq!(overfull, 0);
        assert_eq!(duplicate_pairs, 0);
        assert_eq!(foreign_fields, 0);
        Ok(())
    }
}
