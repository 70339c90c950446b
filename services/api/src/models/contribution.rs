//! Contribution ledger models and the verification state machine
//!
//! A contribution is created `pending`, attested to `verified` or
//! `rejected` by a treasurer or chairperson, re-opened to `pending` by any
//! edit, and finally soft-deleted. Deleted rows are terminal: no further
//! transition is accepted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::models::summary::MemberTotal;

/// Version of the snapshot layout stored in `contribution_audit`
pub const AUDIT_SCHEMA_VERSION: i32 = 1;

/// Verification status of a contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "contribution_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContributionStatus {
    Pending,
    Verified,
    Rejected,
}

impl ContributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Verified => "verified",
            ContributionStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContributionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ContributionStatus::Pending),
            "verified" => Ok(ContributionStatus::Verified),
            "rejected" => Ok(ContributionStatus::Rejected),
            other => Err(format!("Invalid contribution status: {}", other)),
        }
    }
}

/// Mutation requested on a ledger row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    Verify,
    Reject,
    Edit,
    Delete,
}

/// Why a ledger transition was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerRefusal {
    /// The row is soft-deleted and accepts nothing further
    Deleted,
}

impl LedgerAction {
    /// Status the row ends up in after this action
    ///
    /// Deleting keeps the status; the row is marked by `deleted_at` instead.
    pub fn next_status(
        self,
        current: ContributionStatus,
        deleted: bool,
    ) -> Result<ContributionStatus, LedgerRefusal> {
        if deleted {
            return Err(LedgerRefusal::Deleted);
        }
        Ok(match self {
            LedgerAction::Verify => ContributionStatus::Verified,
            LedgerAction::Reject => ContributionStatus::Rejected,
            LedgerAction::Edit => ContributionStatus::Pending,
            LedgerAction::Delete => current,
        })
    }
}

/// Contribution ledger entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Contribution {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
    pub note: Option<String>,
    pub status: ContributionStatus,
    pub verified_by: Option<Uuid>,
    pub verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: Option<Uuid>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
    pub delete_reason: Option<String>,
}

impl Contribution {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Requested field changes for an edit; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContributionChanges {
    pub amount: Option<Decimal>,
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "double_option")]
    pub note: Option<Option<String>>,
}

impl ContributionChanges {
    /// Field values after applying the changes to `before`
    pub fn merge(&self, before: &Contribution) -> (Decimal, DateTime<Utc>, Option<String>) {
        let amount = self.amount.unwrap_or(before.amount);
        let paid_at = self.paid_at.unwrap_or(before.paid_at);
        let note = match &self.note {
            Some(note) => note.clone(),
            None => before.note.clone(),
        };
        (amount, paid_at, note)
    }
}

/// Distinguishes an explicit `null` (clear the note) from a missing field
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Audit action recorded for a ledger mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "audit_action", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Update,
    Delete,
}

/// Append-only audit entry
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContributionAudit {
    pub id: Uuid,
    pub contribution_id: Uuid,
    pub group_id: Uuid,
    pub actor_user_id: Uuid,
    pub action: AuditAction,
    pub schema_version: i32,
    pub before: serde_json::Value,
    pub after: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Request for recording a contribution
#[derive(Debug, Clone, Deserialize)]
pub struct CreateContributionRequest {
    pub group_id: Uuid,
    pub amount: Decimal,
    pub paid_at: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Request for rejecting a contribution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RejectContributionRequest {
    pub note: Option<String>,
}

/// Request for soft-deleting a contribution
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteContributionRequest {
    pub reason: Option<String>,
}

/// Query parameters for listing a group's contributions
#[derive(Debug, Clone, Deserialize)]
pub struct ContributionQuery {
    pub group_id: Uuid,
    pub status: Option<String>,
}

/// Group ledger view: live rows plus verified totals
#[derive(Debug, Clone, Serialize)]
pub struct ContributionLedger {
    pub total: Decimal,
    pub totals_by_member: Vec<MemberTotal>,
    pub items: Vec<Contribution>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: ContributionStatus) -> Contribution {
        let now = Utc::now();
        Contribution {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            amount: Decimal::from(500),
            paid_at: now,
            note: Some("cash".to_string()),
            status,
            verified_by: None,
            verified_at: None,
            created_at: now,
            updated_at: now,
            updated_by: None,
            deleted_at: None,
            deleted_by: None,
            delete_reason: None,
        }
    }

    #[test]
    fn verify_and_reject_apply_from_any_live_status() {
        for status in [
            ContributionStatus::Pending,
            ContributionStatus::Verified,
            ContributionStatus::Rejected,
        ] {
            assert_eq!(
                LedgerAction::Verify.next_status(status, false),
                Ok(ContributionStatus::Verified)
            );
            assert_eq!(
                LedgerAction::Reject.next_status(status, false),
                Ok(ContributionStatus::Rejected)
            );
        }
    }

    #[test]
    fn edit_always_reopens_verification() {
        assert_eq!(
            LedgerAction::Edit.next_status(ContributionStatus::Verified, false),
            Ok(ContributionStatus::Pending)
        );
        assert_eq!(
            LedgerAction::Edit.next_status(ContributionStatus::Rejected, false),
            Ok(ContributionStatus::Pending)
        );
    }

    #[test]
    fn deleted_rows_refuse_every_action() {
        for action in [
            LedgerAction::Verify,
            LedgerAction::Reject,
            LedgerAction::Edit,
            LedgerAction::Delete,
        ] {
            assert_eq!(
                action.next_status(ContributionStatus::Verified, true),
                Err(LedgerRefusal::Deleted)
            );
        }
    }

    #[test]
    fn delete_keeps_status() {
        assert_eq!(
            LedgerAction::Delete.next_status(ContributionStatus::Verified, false),
            Ok(ContributionStatus::Verified)
        );
    }

    #[test]
    fn merge_keeps_unspecified_fields() {
        let before = sample(ContributionStatus::Verified);
        let changes = ContributionChanges {
            amount: Some(Decimal::from(750)),
            ..Default::default()
        };
        let (amount, paid_at, note) = changes.merge(&before);
        assert_eq!(amount, Decimal::from(750));
        assert_eq!(paid_at, before.paid_at);
        assert_eq!(note, before.note);
    }

    #[test]
    fn explicit_null_note_clears_it() {
        let before = sample(ContributionStatus::Pending);

        let changes: ContributionChanges = serde_json::from_str(r#"{"note": null}"#).unwrap();
        assert_eq!(changes.merge(&before).2, None);

        let changes: ContributionChanges = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(changes.merge(&before).2, Some("cash".to_string()));
    }

    #[test]
    fn status_parsing() {
        assert_eq!("Verified".parse(), Ok(ContributionStatus::Verified));
        assert!("approved".parse::<ContributionStatus>().is_err());
    }

    #[test]
    fn amount_deserializes_from_number_or_string() {
        let req: CreateContributionRequest = serde_json::from_str(&format!(
            r#"{{"group_id": "{}", "amount": 500}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(req.amount, Decimal::from(500));

        let req: CreateContributionRequest = serde_json::from_str(&format!(
            r#"{{"group_id": "{}", "amount": "12.50"}}"#,
            Uuid::nil()
        ))
        .unwrap();
        assert_eq!(req.amount, Decimal::new(1250, 2));

        let bad = serde_json::from_str::<CreateContributionRequest>(&format!(
            r#"{{"group_id": "{}", "amount": "lots"}}"#,
            Uuid::nil()
        ));
        assert!(bad.is_err());
    }
}
