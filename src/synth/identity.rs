//! Root organization and its user population.

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::content::TemplateSource;
use crate::models::{Organization, User, UserRole};
use crate::rng::{SimRng, gid, weighted};
use crate::store::Store;
use crate::temporal::{Timeline, format_timestamp};

/// How far before the organization's creation a user may have been created.
const USER_LOOKBACK_DAYS: i64 = 365;

/// Insert the organization and `user_count` users. Returns the organization id.
pub fn generate_organization_and_users(
    store: &Store,
    rng: &mut SimRng,
    timeline: &Timeline,
    templates: &TemplateSource,
    user_count: u32,
) -> Result<i64> {
    let name = format!("{} Inc", templates.company_name(rng));
    let domain = format!("{}.com", name.to_lowercase().replace(' ', ""));
    let org_created = timeline.now();

    let org_id = store.insert_organization(&Organization {
        id: 0,
        gid: gid(rng),
        name: name.clone(),
        domain: domain.clone(),
        created_at: format_timestamp(org_created),
    })?;
    info!(org_id, name = %name, "Created organization");

    for i in 0..user_count {
        let (first, last) = templates.person_name(rng);
        let email = format!(
            "{}.{}.{}@{}",
            first.to_lowercase(),
            last.to_lowercase(),
            i,
            domain
        );
        let role = weighted(rng, &UserRole::ALL, UserRole::weight)
            .context("Failed to draw user role")?;
        let created = timeline.creation_timestamp(rng, org_created, USER_LOOKBACK_DAYS);

        store.insert_user(&User {
            id: 0,
            gid: gid(rng),
            organization_id: org_id,
            full_name: format!("{} {}", first, last),
            email,
            role,
            created_at: format_timestamp(created),
        })?;

        if (i + 1) % 1000 == 0 {
            debug!(created = i + 1, total = user_count, "Users progress");
        }
    }

    info!(users = user_count, "Created users");
    Ok(org_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::seeded;
    use crate::temporal::parse_timestamp;

    fn timeline() -> Timeline {
        Timeline::new(parse_timestamp("2025-06-18T15:30:00").unwrap()).unwrap()
    }

    #[test]
    fn creates_one_org_and_requested_users() -> Result<()> {
        let store = Store::open_in_memory()?;
        let org_id = generate_organization_and_users(
            &store,
            &mut seeded(42),
            &timeline(),
            &TemplateSource::new(),
            50,
        )?;
        assert!(org_id > 0);
        assert_eq!(store.count_rows("organizations")?, 1);
        assert_eq!(store.count_rows("users")?, 50);
        Ok(())
    }

    #[test]
    fn domain_and_emails_follow_org_name() -> Result<()> {
        let store = Store::open_in_memory()?;
        generate_organization_and_users(
            &store,
            &mut seeded(1),
            &timeline(),
            &TemplateSource::new(),
            5,
        )?;
        let (name, domain): (String, String) = store.conn().query_row(
            "SELECT name, domain FROM organizations",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        assert!(name.ends_with(" Inc"));
        assert!(domain.ends_with("inc.com"));
        assert!(!domain.contains(' '));

        let bad_emails: i64 = store.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE email NOT LIKE '%@' || ?1",
            [&domain],
            |row| row.get(0),
        )?;
        assert_eq!(bad_emails, 0);
        Ok(())
    }

    #[test]
    fn users_are_never_created_after_now() -> Result<()> {
        let store = Store::open_in_memory()?;
        generate_organization_and_users(
            &store,
            &mut seeded(9),
            &timeline(),
            &TemplateSource::new(),
            200,
        )?;
        let late: i64 = store.conn().query_row(
            "SELECT COUNT(*) FROM users WHERE created_at > '2025-06-18T15:30:00'",
            [],
            |row| row.get(0),
        )?;
        assert_eq!(late, 0);
        Ok(())
    }
}
