//! SQLite persistence for the generated snapshot.
//!
//! The generator is the only writer. Each phase wraps its inserts in one
//! transaction ([`Store::begin_phase`]), so a crash leaves complete earlier
//! phases and nothing of the phase in flight.

pub mod schema;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, Transaction, params};

use crate::models::*;
pub use schema::TABLES;

pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (or create) a store at `path`. The schema is applied separately
    /// by [`Store::apply_schema`] as the first generation phase.
    pub fn create(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        Ok(Self { conn })
    }

    /// Create an in-memory store with the schema already applied (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        let store = Self { conn };
        store.apply_schema()?;
        Ok(store)
    }

    /// Open an existing store without write access.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Store not found at {}", path.display());
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .with_context(|| format!("Failed to open {} read-only", path.display()))?;
        Ok(Self { conn })
    }

    /// Create every table and index. Safe to call more than once.
    pub fn apply_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(schema::SCHEMA_SQL)
            .context("Failed to apply schema")
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start the transaction that holds one generation phase.
    ///
    /// Inserts made through `&self` while the returned transaction is alive
    /// belong to it; dropping it without `commit` rolls the phase back.
    pub fn begin_phase(&self) -> Result<Transaction<'_>> {
        self.conn
            .unchecked_transaction()
            .context("Failed to begin phase transaction")
    }

    pub fn count_rows(&self, table: &str) -> Result<i64> {
        if !TABLES.contains(&table) {
            anyhow::bail!("Unknown table: {}", table);
        }
        self.conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })
            .with_context(|| format!("Failed to count rows in {}", table))
    }

    pub fn table_counts(&self) -> Result<Vec<(&'static str, i64)>> {
        TABLES
            .iter()
            .map(|t| Ok((*t, self.count_rows(t)?)))
            .collect()
    }

    // ── Identity ──────────────────────────────────────────────────────

    pub fn insert_organization(&self, org: &Organization) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO organizations (gid, name, domain, created_at) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![org.gid, org.name, org.domain, org.created_at])
            .context("Failed to insert organization")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_user(&self, user: &User) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO users (gid, organization_id, full_name, email, role, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                user.gid,
                user.organization_id,
                user.full_name,
                user.email,
                user.role.as_str(),
                user.created_at
            ])
            .context("Failed to insert user")?;
        Ok(self.conn.last_insert_rowid())
    }

    /// `(user_id, role)` for every user, ordered by id.
    pub fn list_user_roles(&self) -> Result<Vec<(i64, UserRole)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, role FROM users ORDER BY id")
            .context("Failed to prepare list_user_roles")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))
            .context("Failed to query users")?;
        let mut users = Vec::new();
        for row in rows {
            let (id, role) = row.context("Failed to read user row")?;
            let role = role.parse::<UserRole>().map_err(|e| anyhow::anyhow!(e))?;
            users.push((id, role));
        }
        Ok(users)
    }

    // ── Teams and projects ────────────────────────────────────────────

    pub fn insert_team(&self, team: &Team) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO teams (gid, organization_id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                team.gid,
                team.organization_id,
                team.name,
                team.description,
                team.created_at
            ])
            .context("Failed to insert team")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_team_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM teams ORDER BY id")
            .context("Failed to prepare list_team_ids")?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .context("Failed to query teams")?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.context("Failed to read team row")?);
        }
        Ok(ids)
    }

    pub fn insert_membership(&self, membership: &TeamMembership) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO team_memberships (team_id, user_id, role, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![
                membership.team_id,
                membership.user_id,
                membership.role.as_str(),
                membership.joined_at
            ])
            .context("Failed to insert team membership")?;
        Ok(())
    }

    /// Team id to member user ids, each list in insertion order.
    pub fn team_members(&self) -> Result<HashMap<i64, Vec<i64>>> {
        let mut stmt = self
            .conn
            .prepare("SELECT team_id, user_id FROM team_memberships ORDER BY rowid")
            .context("Failed to prepare team_members")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))
            .context("Failed to query team memberships")?;
        let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
        for row in rows {
            let (team_id, user_id) = row.context("Failed to read membership row")?;
            map.entry(team_id).or_default().push(user_id);
        }
        Ok(map)
    }

    pub fn insert_project(&self, project: &Project) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO projects (gid, team_id, organization_id, name, description, project_type, is_archived, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                project.gid,
                project.team_id,
                project.organization_id,
                project.name,
                project.description,
                project.project_type.as_str(),
                project.is_archived,
                project.created_at
            ])
            .context("Failed to insert project")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn project_name(&self, project_id: i64) -> Result<String> {
        self.conn
            .prepare_cached("SELECT name FROM projects WHERE id = ?1")?
            .query_row(params![project_id], |row| row.get(0))
            .with_context(|| format!("Failed to load project {}", project_id))
    }

    pub fn insert_section(&self, section: &Section) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO sections (gid, project_id, name, position) VALUES (?1, ?2, ?3, ?4)",
            )?
            .execute(params![
                section.gid,
                section.project_id,
                section.name,
                section.position
            ])
            .context("Failed to insert section")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_sections(&self, project_id: i64) -> Result<Vec<Section>> {
        let mut stmt = self
            .conn
            .prepare_cached(
                "SELECT id, gid, project_id, name, position FROM sections
                 WHERE project_id = ?1 ORDER BY position",
            )
            .context("Failed to prepare list_sections")?;
        let rows = stmt
            .query_map(params![project_id], |row| {
                Ok(Section {
                    id: row.get(0)?,
                    gid: row.get(1)?,
                    project_id: row.get(2)?,
                    name: row.get(3)?,
                    position: row.get(4)?,
                })
            })
            .context("Failed to query sections")?;
        let mut sections = Vec::new();
        for row in rows {
            sections.push(row.context("Failed to read section row")?);
        }
        Ok(sections)
    }

    // ── Task graph ────────────────────────────────────────────────────

    pub fn insert_tag(&self, tag: &Tag) -> Result<i64> {
        self.conn
            .prepare_cached("INSERT INTO tags (gid, name, color) VALUES (?1, ?2, ?3)")?
            .execute(params![tag.gid, tag.name, tag.color])
            .context("Failed to insert tag")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_task(&self, task: &Task) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO tasks (gid, project_id, section_id, name, description, assignee_id, created_at, due_date, completed, completed_at, priority, effort)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            )?
            .execute(params![
                task.gid,
                task.project_id,
                task.section_id,
                task.name,
                task.description,
                task.assignee_id,
                task.created_at,
                task.due_date,
                task.completed,
                task.completed_at,
                task.priority.as_str(),
                task.effort
            ])
            .context("Failed to insert task")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn task_ids_for_project(&self, project_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT id FROM tasks WHERE project_id = ?1 ORDER BY id")
            .context("Failed to prepare task_ids_for_project")?;
        let rows = stmt
            .query_map(params![project_id], |row| row.get(0))
            .context("Failed to query tasks")?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row.context("Failed to read task row")?);
        }
        Ok(ids)
    }

    pub fn insert_subtask(&self, subtask: &Subtask) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO subtasks (gid, parent_task_id, name, assignee_id, created_at, due_date, completed, completed_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?
            .execute(params![
                subtask.gid,
                subtask.parent_task_id,
                subtask.name,
                subtask.assignee_id,
                subtask.created_at,
                subtask.due_date,
                subtask.completed,
                subtask.completed_at
            ])
            .context("Failed to insert subtask")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_comment(&self, comment: &Comment) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO comments (gid, task_id, author_id, text, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                comment.gid,
                comment.task_id,
                comment.author_id,
                comment.text,
                comment.created_at
            ])
            .context("Failed to insert comment")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_task_tag(&self, task_id: i64, tag_id: i64) -> Result<()> {
        self.conn
            .prepare_cached("INSERT INTO task_tags (task_id, tag_id) VALUES (?1, ?2)")?
            .execute(params![task_id, tag_id])
            .context("Failed to insert task tag")?;
        Ok(())
    }

    pub fn insert_attachment(&self, attachment: &Attachment) -> Result<i64> {
        self.conn
            .prepare_cached(
                "INSERT INTO attachments (gid, task_id, filename, url, uploaded_by, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?
            .execute(params![
                attachment.gid,
                attachment.task_id,
                attachment.filename,
                attachment.url,
                attachment.uploaded_by,
                attachment.created_at
            ])
            .context("Failed to insert attachment")?;
        Ok(self.conn.last_insert_rowid())
    }

    // ── Custom fields ─────────────────────────────────────────────────

    pub fn insert_custom_field_def(&self, def: &CustomFieldDefinition) -> Result<i64> {
        let options = def
            .options
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .context("Failed to encode custom field options")?;
        self.conn
            .prepare_cached(
                "INSERT INTO custom_field_defs (gid, project_id, name, field_type, options)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?
            .execute(params![
                def.gid,
                def.project_id,
                def.name,
                def.field_type.as_str(),
                options
            ])
            .context("Failed to insert custom field definition")?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_custom_field_defs(&self) -> Result<Vec<CustomFieldDefinition>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, gid, project_id, name, field_type, options FROM custom_field_defs ORDER BY id",
            )
            .context("Failed to prepare list_custom_field_defs")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })
            .context("Failed to query custom field definitions")?;
        let mut defs = Vec::new();
        for row in rows {
            let (id, gid, project_id, name, field_type, options) =
                row.context("Failed to read custom field definition row")?;
            let options = options
                .map(|raw| serde_json::from_str::<Vec<String>>(&raw))
                .transpose()
                .with_context(|| format!("Invalid options JSON on custom field {}", id))?;
            defs.push(CustomFieldDefinition {
                id,
                gid,
                project_id,
                name,
                field_type: FieldType::parse(&field_type),
                options,
            });
        }
        Ok(defs)
    }

    pub fn insert_custom_field_value(&self, value: &CustomFieldValue) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT INTO custom_field_values (custom_field_def_id, task_id, value)
                 VALUES (?1, ?2, ?3)",
            )?
            .execute(params![value.custom_field_def_id, value.task_id, value.value])
            .context("Failed to insert custom field value")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn org() -> Organization {
        Organization {
            id: 0,
            gid: "org-1".into(),
            name: "Acme Inc".into(),
            domain: "acmeinc.com".into(),
            created_at: "2025-01-01T09:00:00".into(),
        }
    }

    fn user(org_id: i64, n: i64, role: UserRole) -> User {
        User {
            id: 0,
            gid: format!("user-{}", n),
            organization_id: org_id,
            full_name: format!("User {}", n),
            email: format!("user.{}@acmeinc.com", n),
            role,
            created_at: "2025-01-01T09:00:00".into(),
        }
    }

    #[test]
    fn test_schema_creates_all_tables() -> Result<()> {
        let store = Store::open_in_memory()?;
        for table in TABLES {
            assert_eq!(store.count_rows(table)?, 0, "{} should start empty", table);
        }
        Ok(())
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() -> Result<()> {
        let store = Store::open_in_memory()?;
        assert!(store.count_rows("sqlite_master; DROP TABLE users").is_err());
        Ok(())
    }

    #[test]
    fn test_insert_and_list_users() -> Result<()> {
        let store = Store::open_in_memory()?;
        let org_id = store.insert_organization(&org())?;
        store.insert_user(&user(org_id, 1, UserRole::Engineer))?;
        store.insert_user(&user(org_id, 2, UserRole::Hr))?;

        let users = store.list_user_roles()?;
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].1, UserRole::Engineer);
        assert_eq!(users[1].1, UserRole::Hr);
        Ok(())
    }

    #[test]
    fn test_duplicate_membership_is_rejected_by_schema() -> Result<()> {
        let store = Store::open_in_memory()?;
        let org_id = store.insert_organization(&org())?;
        let user_id = store.insert_user(&user(org_id, 1, UserRole::Ops))?;
        let team_id = store.insert_team(&Team {
            id: 0,
            gid: "team-1".into(),
            organization_id: org_id,
            name: "Core".into(),
            description: String::new(),
            created_at: "2025-01-01T09:00:00".into(),
        })?;
        let membership = TeamMembership {
            team_id,
            user_id,
            role: MembershipRole::Member,
            joined_at: "2024-01-01T09:00:00".into(),
        };
        store.insert_membership(&membership)?;
        assert!(store.insert_membership(&membership).is_err());
        assert_eq!(store.team_members()?.get(&team_id), Some(&vec![user_id]));
        Ok(())
    }

    #[test]
    fn test_dropped_phase_transaction_rolls_back() -> Result<()> {
        let store = Store::open_in_memory()?;
        {
            let _tx = store.begin_phase()?;
            store.insert_organization(&org())?;
        }
        assert_eq!(store.count_rows("organizations")?, 0);

        let tx = store.begin_phase()?;
        store.insert_organization(&org())?;
        tx.commit()?;
        assert_eq!(store.count_rows("organizations")?, 1);
        Ok(())
    }

    #[test]
    fn test_custom_field_options_round_trip_as_json() -> Result<()> {
        let store = Store::open_in_memory()?;
        let org_id = store.insert_organization(&org())?;
        let team_id = store.insert_team(&Team {
            id: 0,
            gid: "team-1".into(),
            organization_id: org_id,
            name: "Core".into(),
            description: String::new(),
            created_at: "2025-01-01T09:00:00".into(),
        })?;
        let project_id = store.insert_project(&Project {
            id: 0,
            gid: "p-1".into(),
            team_id,
            organization_id: org_id,
            name: "Search Platform Revamp".into(),
            description: String::new(),
            project_type: ProjectType::Engineering,
            is_archived: false,
            created_at: "2025-01-01T09:00:00".into(),
        })?;
        store.insert_custom_field_def(&CustomFieldDefinition {
            id: 0,
            gid: "cf-1".into(),
            project_id,
            name: "Component".into(),
            field_type: FieldType::Enum,
            options: Some(vec!["Frontend".into(), "Backend".into()]),
        })?;
        store.insert_custom_field_def(&CustomFieldDefinition {
            id: 0,
            gid: "cf-2".into(),
            project_id,
            name: "Sprint".into(),
            field_type: FieldType::Text,
            options: None,
        })?;

        let defs = store.list_custom_field_defs()?;
        assert_eq!(defs.len(), 2);
        assert_eq!(
            defs[0].options.as_deref(),
            Some(&["Frontend".to_string(), "Backend".to_string()][..])
        );
        assert_eq!(defs[1].field_type, FieldType::Text);
        assert!(defs[1].options.is_none());
        Ok(())
    }

    #[test]
    fn test_file_store_round_trip_read_only() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("snapshot.sqlite");
        {
            let store = Store::create(&path)?;
            store.apply_schema()?;
            store.apply_schema()?;
            store.insert_organization(&org())?;
        }
        let reader = Store::open_read_only(&path)?;
        assert_eq!(reader.count_rows("organizations")?, 1);
        assert!(reader.insert_organization(&org()).is_err());
        Ok(())
    }

    #[test]
    fn test_read_only_store_refuses_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Store::open_read_only(&dir.path().join("absent.sqlite"))
            .err()
            .expect("missing file should fail");
        assert!(err.to_string().contains("Store not found"));
    }
}
