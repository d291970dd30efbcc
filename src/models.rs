use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Timestamp layout used for every persisted `*_at` column.
///
/// Fixed-width so lexical comparison in SQL matches chronological order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Calendar-date layout used for `due_date` columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Engineering,
    Marketing,
    Ops,
}

impl ProjectType {
    pub const ALL: [ProjectType; 3] = [Self::Engineering, Self::Marketing, Self::Ops];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engineering => "engineering",
            Self::Marketing => "marketing",
            Self::Ops => "ops",
        }
    }

    /// Draw weight when a new project picks its type.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Engineering => 0.6,
            Self::Marketing => 0.25,
            Self::Ops => 0.15,
        }
    }

    /// Probability that a task in a project of this type is completed.
    pub fn completion_probability(&self) -> f64 {
        match self {
            Self::Engineering => 0.6,
            Self::Marketing => 0.5,
            Self::Ops => 0.45,
        }
    }

    /// Inclusive task-count range for an active project of this type.
    pub fn task_count_range(&self) -> (u32, u32) {
        match self {
            Self::Engineering => (30, 120),
            Self::Marketing => (10, 40),
            Self::Ops => (8, 30),
        }
    }
}

impl FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "engineering" => Ok(Self::Engineering),
            "marketing" => Ok(Self::Marketing),
            "ops" => Ok(Self::Ops),
            _ => Err(format!("Invalid project type: {}", s)),
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum UserRole {
    Engineer,
    Product,
    Designer,
    Marketing,
    Sales,
    Ops,
    #[serde(rename = "HR")]
    Hr,
}

impl UserRole {
    pub const ALL: [UserRole; 7] = [
        Self::Engineer,
        Self::Product,
        Self::Designer,
        Self::Marketing,
        Self::Sales,
        Self::Ops,
        Self::Hr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Engineer => "Engineer",
            Self::Product => "Product",
            Self::Designer => "Designer",
            Self::Marketing => "Marketing",
            Self::Sales => "Sales",
            Self::Ops => "Ops",
            Self::Hr => "HR",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Self::Engineer => 0.35,
            Self::Product => 0.12,
            Self::Designer => 0.06,
            Self::Marketing => 0.12,
            Self::Sales => 0.08,
            Self::Ops => 0.15,
            Self::Hr => 0.12,
        }
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| format!("Invalid user role: {}", s))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MembershipRole {
    Member,
    Lead,
}

impl MembershipRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Lead => "lead",
        }
    }
}

impl FromStr for MembershipRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Self::Member),
            "lead" => Ok(Self::Lead),
            _ => Err(format!("Invalid membership role: {}", s)),
        }
    }
}

/// Team-level label that biases which roles fill its seats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TeamArchetype {
    Engineering,
    Product,
    Marketing,
    Ops,
}

impl TeamArchetype {
    pub const ALL: [TeamArchetype; 4] = [Self::Engineering, Self::Product, Self::Marketing, Self::Ops];

    pub fn weight(&self) -> f64 {
        match self {
            Self::Engineering => 0.5,
            Self::Product => 0.15,
            Self::Marketing => 0.2,
            Self::Ops => 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Priority {
    pub const ALL: [Priority; 4] = [Self::Low, Self::Medium, Self::High, Self::Urgent];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    pub fn weight(&self) -> f64 {
        match self {
            Self::Low => 0.4,
            Self::Medium => 0.4,
            Self::High => 0.15,
            Self::Urgent => 0.05,
        }
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "urgent" => Ok(Self::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// Story-point scale for task effort.
pub const EFFORT_POINTS: [i64; 5] = [1, 2, 3, 5, 8];

/// The five workflow stages every project is created with, in board order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SectionName {
    Backlog,
    ToDo,
    InProgress,
    Review,
    Done,
}

impl SectionName {
    pub const ORDERED: [SectionName; 5] = [
        Self::Backlog,
        Self::ToDo,
        Self::InProgress,
        Self::Review,
        Self::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backlog => "Backlog",
            Self::ToDo => "To Do",
            Self::InProgress => "In Progress",
            Self::Review => "Review",
            Self::Done => "Done",
        }
    }

    pub fn position(&self) -> i64 {
        match self {
            Self::Backlog => 0,
            Self::ToDo => 1,
            Self::InProgress => 2,
            Self::Review => 3,
            Self::Done => 4,
        }
    }
}

/// Declared type of a custom field.
///
/// `Other` keeps unrecognized stored types representable so the value
/// generator and the validator can fall back instead of failing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Enum,
    Number,
    Text,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Enum => "enum",
            Self::Number => "number",
            Self::Text => "text",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "enum" => Self::Enum,
            "number" => Self::Number,
            "text" => Self::Text,
            other => Self::Other(other.to_string()),
        }
    }
}

// Row types. `id` is the local integer key, `gid` the durable global identifier.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: i64,
    pub gid: String,
    pub name: String,
    pub domain: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub gid: String,
    pub organization_id: i64,
    pub full_name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub gid: String,
    pub organization_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMembership {
    pub team_id: i64,
    pub user_id: i64,
    pub role: MembershipRole,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub gid: String,
    pub team_id: i64,
    pub organization_id: i64,
    pub name: String,
    pub description: String,
    pub project_type: ProjectType,
    pub is_archived: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub gid: String,
    pub project_id: i64,
    pub name: String,
    pub position: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub gid: String,
    pub project_id: i64,
    pub section_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub assignee_id: Option<i64>,
    pub created_at: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
    pub priority: Priority,
    pub effort: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: i64,
    pub gid: String,
    pub parent_task_id: i64,
    pub name: String,
    pub assignee_id: Option<i64>,
    pub created_at: String,
    pub due_date: Option<String>,
    pub completed: bool,
    pub completed_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub gid: String,
    pub task_id: i64,
    pub author_id: i64,
    pub text: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub gid: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub gid: String,
    pub task_id: i64,
    pub filename: String,
    pub url: String,
    pub uploaded_by: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldDefinition {
    pub id: i64,
    pub gid: String,
    pub project_id: i64,
    pub name: String,
    pub field_type: FieldType,
    pub options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub custom_field_def_id: i64,
    pub task_id: i64,
    pub value: String,
}

/// Per-project descriptor handed from the project generator to the task and
/// custom-field generators. This is the only coupling between those phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectDescriptor {
    pub project_id: i64,
    pub team_id: i64,
    pub project_type: ProjectType,
    pub is_archived: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_type_round_trips_through_storage_string() {
        for t in ProjectType::ALL {
            assert_eq!(ProjectType::from_str(t.as_str()).unwrap(), t);
        }
        assert!(ProjectType::from_str("legal").is_err());
    }

    #[test]
    fn weights_sum_to_one() {
        let sum = |ws: &[f64]| ws.iter().sum::<f64>();
        let project: Vec<f64> = ProjectType::ALL.iter().map(|t| t.weight()).collect();
        let roles: Vec<f64> = UserRole::ALL.iter().map(|r| r.weight()).collect();
        let archetypes: Vec<f64> = TeamArchetype::ALL.iter().map(|a| a.weight()).collect();
        let priorities: Vec<f64> = Priority::ALL.iter().map(|p| p.weight()).collect();
        for ws in [project, roles, archetypes, priorities] {
            assert!((sum(&ws) - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn hr_role_uses_uppercase_label() {
        assert_eq!(UserRole::Hr.as_str(), "HR");
        assert_eq!(UserRole::from_str("HR").unwrap(), UserRole::Hr);
    }

    #[test]
    fn sections_are_in_canonical_order() {
        let names: Vec<&str> = SectionName::ORDERED.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["Backlog", "To Do", "In Progress", "Review", "Done"]);
        for (idx, s) in SectionName::ORDERED.iter().enumerate() {
            assert_eq!(s.position(), idx as i64);
        }
    }

    #[test]
    fn unknown_field_type_is_preserved() {
        assert_eq!(FieldType::parse("enum"), FieldType::Enum);
        let other = FieldType::parse("date");
        assert_eq!(other, FieldType::Other("date".to_string()));
        assert_eq!(other.as_str(), "date");
    }
}
