//! Membership model, group roles and the capability matrix

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role a user holds inside one group, ordered by privilege
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "group_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Member,
    Secretary,
    Treasurer,
    Chairperson,
}

/// Group-scoped action gated by role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    ViewGroup,
    Contribute,
    AddMember,
    ViewRoles,
    VerifyContribution,
    EditContribution,
    ViewAudit,
    ChangeRole,
}

impl GroupRole {
    pub const ALL: [GroupRole; 4] = [
        GroupRole::Member,
        GroupRole::Secretary,
        GroupRole::Treasurer,
        GroupRole::Chairperson,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupRole::Member => "member",
            GroupRole::Secretary => "secretary",
            GroupRole::Treasurer => "treasurer",
            GroupRole::Chairperson => "chairperson",
        }
    }

    /// Lowest role that may perform `capability`
    fn minimum_for(capability: Capability) -> GroupRole {
        match capability {
            Capability::ViewGroup | Capability::Contribute => GroupRole::Member,
            Capability::AddMember => GroupRole::Secretary,
            Capability::ViewRoles
            | Capability::VerifyContribution
            | Capability::EditContribution
            | Capability::ViewAudit => GroupRole::Treasurer,
            Capability::ChangeRole => GroupRole::Chairperson,
        }
    }

    pub fn has_capability(&self, capability: Capability) -> bool {
        *self >= GroupRole::minimum_for(capability)
    }
}

/// True when an actor would lower their own role
pub fn is_self_demotion(
    actor_id: Uuid,
    actor_role: GroupRole,
    target_id: Uuid,
    new_role: GroupRole,
) -> bool {
    actor_id == target_id && new_role < actor_role
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a role name is not recognised
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid role: {}", self.0)
    }
}

impl FromStr for GroupRole {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(GroupRole::Member),
            "secretary" => Ok(GroupRole::Secretary),
            "treasurer" => Ok(GroupRole::Treasurer),
            "chairperson" | "admin" => Ok(GroupRole::Chairperson),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// Membership entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
    pub role_updated_at: Option<DateTime<Utc>>,
    pub role_updated_by: Option<Uuid>,
}

/// Member listing row visible to every member
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MemberEntry {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
}

/// Member listing row with role and contact data, for officers
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct GroupMember {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub phone: Option<String>,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

/// Outcome of an idempotent join
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "membership", rename_all = "snake_case")]
pub enum JoinOutcome {
    Joined(Membership),
    AlreadyMember(Membership),
}

/// Outcome of provisioning a member by phone
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "member", rename_all = "snake_case")]
pub enum AddMemberOutcome {
    Added(GroupMember),
    AlreadyMember(GroupMember),
}

/// Request for provisioning a member
#[derive(Debug, Clone, Deserialize)]
pub struct AddMemberRequest {
    pub username: String,
    pub phone: String,
}

/// Request for changing a member's role
#[derive(Debug, Clone, Deserialize)]
pub struct SetRoleRequest {
    pub role: String,
}

/// Response for the caller's own role
#[derive(Debug, Clone, Serialize)]
pub struct RoleResponse {
    pub role: GroupRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles_and_admin_alias() {
        assert_eq!("member".parse::<GroupRole>(), Ok(GroupRole::Member));
        assert_eq!("Treasurer".parse::<GroupRole>(), Ok(GroupRole::Treasurer));
        assert_eq!("admin".parse::<GroupRole>(), Ok(GroupRole::Chairperson));
        assert_eq!(" chairperson ".parse::<GroupRole>(), Ok(GroupRole::Chairperson));
        assert!("owner".parse::<GroupRole>().is_err());
        assert!("".parse::<GroupRole>().is_err());
    }

    #[test]
    fn member_can_only_view_and_contribute() {
        let role = GroupRole::Member;
        assert!(role.has_capability(Capability::ViewGroup));
        assert!(role.has_capability(Capability::Contribute));
        assert!(!role.has_capability(Capability::AddMember));
        assert!(!role.has_capability(Capability::VerifyContribution));
        assert!(!role.has_capability(Capability::ChangeRole));
    }

    #[test]
    fn treasurer_attests_but_cannot_change_roles() {
        let role = GroupRole::Treasurer;
        assert!(role.has_capability(Capability::VerifyContribution));
        assert!(role.has_capability(Capability::EditContribution));
        assert!(role.has_capability(Capability::ViewAudit));
        assert!(role.has_capability(Capability::AddMember));
        assert!(!role.has_capability(Capability::ChangeRole));
    }

    #[test]
    fn secretary_adds_members_only() {
        let role = GroupRole::Secretary;
        assert!(role.has_capability(Capability::AddMember));
        assert!(!role.has_capability(Capability::ViewRoles));
        assert!(!role.has_capability(Capability::EditContribution));
    }

    #[test]
    fn chairperson_can_do_everything() {
        let all = [
            Capability::ViewGroup,
            Capability::Contribute,
            Capability::AddMember,
            Capability::ViewRoles,
            Capability::VerifyContribution,
            Capability::EditContribution,
            Capability::ViewAudit,
            Capability::ChangeRole,
        ];
        assert!(all.iter().all(|c| GroupRole::Chairperson.has_capability(*c)));
    }

    #[test]
    fn chairperson_cannot_demote_themself() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(is_self_demotion(me, GroupRole::Chairperson, me, GroupRole::Treasurer));
        assert!(!is_self_demotion(me, GroupRole::Chairperson, me, GroupRole::Chairperson));
        assert!(!is_self_demotion(me, GroupRole::Chairperson, other, GroupRole::Member));
    }

    #[test]
    fn join_outcome_serializes_with_status_tag() {
        let membership = Membership {
            group_id: Uuid::nil(),
            user_id: Uuid::nil(),
            role: GroupRole::Member,
            joined_at: Utc::now(),
            role_updated_at: None,
            role_updated_by: None,
        };
        let value = serde_json::to_value(JoinOutcome::AlreadyMember(membership)).unwrap();
        assert_eq!(value["status"], "already_member");
        assert_eq!(value["membership"]["role"], "member");
    }
}
