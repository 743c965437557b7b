//! Role hierarchies and authorization checks.
//!
//! Both hierarchies are plain data: each role maps to the roles it directly
//! implies, and a grant always stores the transitive closure.

use std::collections::{BTreeSet, HashMap};

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        admission::{Admission, SchoolRole},
        user::GlobalRole,
    },
};

const SCHOOL_IMPLIES: &[(SchoolRole, &[SchoolRole])] = &[
    (SchoolRole::Director, &[SchoolRole::SuperAdministrator]),
    (SchoolRole::SuperAdministrator, &[SchoolRole::Administrator]),
    (SchoolRole::Administrator, &[]),
    (SchoolRole::Teacher, &[]),
    (SchoolRole::Client, &[]),
];

const GLOBAL_IMPLIES: &[(GlobalRole, &[GlobalRole])] = &[
    (GlobalRole::SystemAdministrator, &[]),
    (GlobalRole::Director, &[GlobalRole::AdultUser]),
    (GlobalRole::AdultUser, &[GlobalRole::User]),
    (GlobalRole::User, &[]),
];

fn closure_of<R: Copy + Ord>(role: R, table: &[(R, &[R])]) -> BTreeSet<R> {
    let mut out = BTreeSet::new();
    let mut pending = vec![role];
    while let Some(r) = pending.pop() {
        if out.insert(r) {
            if let Some((_, implied)) = table.iter().find(|(k, _)| *k == r) {
                pending.extend(implied.iter().copied());
            }
        }
    }
    out
}

/// A school role together with every role beneath it.
pub fn school_closure(role: SchoolRole) -> BTreeSet<SchoolRole> {
    closure_of(role, SCHOOL_IMPLIES)
}

pub fn global_closure(role: GlobalRole) -> BTreeSet<GlobalRole> {
    closure_of(role, GLOBAL_IMPLIES)
}

/// Parse stored role names, dropping any that are no longer known.
pub fn parse_roles(names: &[String]) -> BTreeSet<SchoolRole> {
    names.iter().filter_map(|n| n.parse().ok()).collect()
}

pub fn role_names<R: ToString>(roles: impl IntoIterator<Item = R>) -> Vec<String> {
    roles.into_iter().map(|r| r.to_string()).collect()
}

/// Per-school membership as seen by authorization checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub roles: BTreeSet<SchoolRole>,
    pub is_active: bool,
}

impl From<&Admission> for Membership {
    fn from(a: &Admission) -> Self {
        Membership { roles: parse_roles(&a.roles), is_active: a.is_active }
    }
}

impl Membership {
    pub fn has_role(&self, role: SchoolRole) -> bool {
        self.roles.contains(&role)
    }
}

/// Ban is checked before role membership; every failure is the same error.
pub fn authorize(membership: Option<&Membership>, required: SchoolRole) -> AppResult<()> {
    match membership {
        Some(m) if m.is_active && m.has_role(required) => Ok(()),
        _ => Err(AppError::Forbidden),
    }
}

/// Whether a stored admission currently grants `role`: present, not banned,
/// and holding the role.
pub fn admission_grants(admission: Option<&Admission>, role: SchoolRole) -> bool {
    authorize(admission.map(Membership::from).as_ref(), role).is_ok()
}

/// The acting user's admissions, keyed by school.
#[derive(Debug, Clone, Default)]
pub struct AccessIndex {
    user_id: Uuid,
    memberships: HashMap<Uuid, Membership>,
}

impl AccessIndex {
    pub fn new(user_id: Uuid, admissions: &[Admission]) -> Self {
        let memberships = admissions
            .iter()
            .filter(|a| a.client_id == user_id)
            .map(|a| (a.school_id, Membership::from(a)))
            .collect();
        AccessIndex { user_id, memberships }
    }

    pub async fn load(pool: &PgPool, user_id: Uuid) -> AppResult<Self> {
        let admissions =
            sqlx::query_as::<_, Admission>("SELECT * FROM admissions WHERE client_id = $1")
                .bind(user_id)
                .fetch_all(pool)
                .await?;
        Ok(Self::new(user_id, &admissions))
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn membership(&self, school_id: Uuid) -> Option<&Membership> {
        self.memberships.get(&school_id)
    }

    pub fn require(&self, school_id: Uuid, role: SchoolRole) -> AppResult<()> {
        authorize(self.membership(school_id), role)
    }

    pub fn allows(&self, school_id: Uuid, role: SchoolRole) -> bool {
        self.require(school_id, role).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn admission(
        school_id: Uuid,
        client_id: Uuid,
        roles: &[SchoolRole],
        active: bool,
    ) -> Admission {
        Admission {
            id: Uuid::new_v4(),
            school_id,
            client_id,
            roles: role_names(roles.iter().copied()),
            is_active: active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn director_implies_the_administrative_chain() {
        let roles = school_closure(SchoolRole::Director);
        assert!(roles.contains(&SchoolRole::SuperAdministrator));
        assert!(roles.contains(&SchoolRole::Administrator));
        assert!(!roles.contains(&SchoolRole::Teacher));
        assert!(!roles.contains(&SchoolRole::Client));
    }

    #[test]
    fn leaves_imply_only_themselves() {
        for role in [SchoolRole::Teacher, SchoolRole::Client, SchoolRole::Administrator] {
            assert_eq!(school_closure(role), BTreeSet::from([role]));
        }
    }

    #[test]
    fn global_hierarchy() {
        assert_eq!(
            global_closure(GlobalRole::Director),
            BTreeSet::from([GlobalRole::Director, GlobalRole::AdultUser, GlobalRole::User])
        );
        assert_eq!(
            global_closure(GlobalRole::SystemAdministrator),
            BTreeSet::from([GlobalRole::SystemAdministrator])
        );
    }

    #[test]
    fn role_names_roundtrip_through_storage_format() {
        let names = role_names(school_closure(SchoolRole::Director));
        assert!(names.contains(&"super_administrator".to_string()));
        assert_eq!(parse_roles(&names), school_closure(SchoolRole::Director));
    }

    #[test]
    fn unknown_stored_roles_are_ignored() {
        let names = vec!["client".to_string(), "adult_student".to_string()];
        assert_eq!(parse_roles(&names), BTreeSet::from([SchoolRole::Client]));
    }

    #[test]
    fn ban_overrides_roles() {
        let school = Uuid::new_v4();
        let user = Uuid::new_v4();
        let roles: Vec<_> = school_closure(SchoolRole::Director).into_iter().collect();

        let active = AccessIndex::new(user, &[admission(school, user, &roles, true)]);
        assert!(active.require(school, SchoolRole::Administrator).is_ok());

        let banned = AccessIndex::new(user, &[admission(school, user, &roles, false)]);
        assert!(matches!(
            banned.require(school, SchoolRole::Administrator),
            Err(AppError::Forbidden)
        ));
        // Stored membership is untouched by the ban.
        assert!(banned.membership(school).unwrap().has_role(SchoolRole::Administrator));
    }

    #[test]
    fn missing_admission_and_missing_role_are_indistinguishable() {
        let school = Uuid::new_v4();
        let user = Uuid::new_v4();
        let index = AccessIndex::new(user, &[admission(school, user, &[SchoolRole::Client], true)]);

        let no_role = index.require(school, SchoolRole::Teacher).unwrap_err();
        let no_admission = index.require(Uuid::new_v4(), SchoolRole::Client).unwrap_err();
        assert_eq!(no_role.to_string(), no_admission.to_string());
    }

    #[test]
    fn banned_admission_grants_nothing() {
        let school = Uuid::new_v4();
        let user = Uuid::new_v4();
        let teacher = admission(school, user, &[SchoolRole::Teacher], true);
        assert!(admission_grants(Some(&teacher), SchoolRole::Teacher));
        assert!(!admission_grants(Some(&teacher), SchoolRole::Client));

        let banned = admission(school, user, &[SchoolRole::Teacher], false);
        assert!(!admission_grants(Some(&banned), SchoolRole::Teacher));
        assert!(!admission_grants(None, SchoolRole::Teacher));
    }

    #[test]
    fn index_ignores_other_users_rows() {
        let school = Uuid::new_v4();
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let foreign = admission(school, other, &[SchoolRole::Client], true);
        let index = AccessIndex::new(user, &[foreign]);
        assert!(!index.allows(school, SchoolRole::Client));
        assert!(index.membership(school).is_none());
    }
}
