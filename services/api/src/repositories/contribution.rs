//! Contribution ledger repository
//!
//! Every mutation of an existing row runs as one transaction: the row is
//! locked with `FOR UPDATE` and checked against `LedgerAction::next_status`
//! before it is written. Edits and soft deletes also add exactly one audit
//! row before commit. A concurrent edit and delete therefore serialise on
//! the row lock and the loser observes the winner's state.

use chrono::{DateTime, Utc};
use common::error::DatabaseResult;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

use crate::models::contribution::{
    AUDIT_SCHEMA_VERSION, AuditAction, Contribution, ContributionAudit, ContributionChanges,
    ContributionStatus, LedgerAction, LedgerRefusal,
};

const CONTRIBUTION_COLUMNS: &str = "id, group_id, user_id, amount, paid_at, note, status, \
     verified_by, verified_at, created_at, updated_at, updated_by, \
     deleted_at, deleted_by, delete_reason";

/// Result of a transactional ledger mutation
#[derive(Debug)]
pub enum LedgerOutcome {
    Applied(Contribution),
    NotFound,
    AlreadyDeleted,
}

impl LedgerOutcome {
    /// The updated row, if the mutation went through
    pub fn applied(self) -> Option<Contribution> {
        match self {
            LedgerOutcome::Applied(contribution) => Some(contribution),
            LedgerOutcome::NotFound | LedgerOutcome::AlreadyDeleted => None,
        }
    }
}

/// Contribution repository
#[derive(Clone)]
pub struct ContributionRepository {
    pool: PgPool,
}

impl ContributionRepository {
    /// Create a new contribution repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a pending contribution; `paid_at` defaults to now
    pub async fn create(
        &self,
        group_id: Uuid,
        user_id: Uuid,
        amount: Decimal,
        paid_at: Option<DateTime<Utc>>,
        note: Option<&str>,
    ) -> DatabaseResult<Contribution> {
        let contribution = sqlx::query_as::<_, Contribution>(&format!(
            r#"
            INSERT INTO contributions (group_id, user_id, amount, paid_at, note, status)
            VALUES ($1, $2, $3, COALESCE($4, NOW()), $5, 'pending')
            RETURNING {CONTRIBUTION_COLUMNS}
            "#
        ))
        .bind(group_id)
        .bind(user_id)
        .bind(amount)
        .bind(paid_at)
        .bind(note)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Recorded contribution {} of {} for user {} in group {}",
            contribution.id, contribution.amount, user_id, group_id
        );
        Ok(contribution)
    }

    /// Live contributions of a group, most recently paid first
    pub async fn list_by_group(
        &self,
        group_id: Uuid,
        status: Option<ContributionStatus>,
    ) -> DatabaseResult<Vec<Contribution>> {
        let contributions = sqlx::query_as::<_, Contribution>(&format!(
            r#"
            SELECT {CONTRIBUTION_COLUMNS}
            FROM contributions
            WHERE group_id = $1
              AND deleted_at IS NULL
              AND ($2::contribution_status IS NULL OR status = $2)
            ORDER BY paid_at DESC, created_at DESC
            "#
        ))
        .bind(group_id)
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        Ok(contributions)
    }

    /// Any contribution by id, soft-deleted ones included
    pub async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<Contribution>> {
        let contribution = sqlx::query_as::<_, Contribution>(&format!(
            r#"
            SELECT {CONTRIBUTION_COLUMNS}
            FROM contributions
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(contribution)
    }

    /// Mark a live contribution verified, re-stamping the verifier if it
    /// already was
    pub async fn verify(&self, id: Uuid, actor: Uuid) -> DatabaseResult<LedgerOutcome> {
        self.stamp(id, actor, LedgerAction::Verify, None).await
    }

    /// Mark a live contribution rejected, replacing the note when one is
    /// given
    pub async fn reject(
        &self,
        id: Uuid,
        actor: Uuid,
        note: Option<&str>,
    ) -> DatabaseResult<LedgerOutcome> {
        self.stamp(id, actor, LedgerAction::Reject, note).await
    }

    /// Record a verification decision under the row lock
    async fn stamp(
        &self,
        id: Uuid,
        actor: Uuid,
        action: LedgerAction,
        note: Option<&str>,
    ) -> DatabaseResult<LedgerOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(current) = lock_row(&mut tx, id).await? else {
            return Ok(LedgerOutcome::NotFound);
        };

        let status = match action.next_status(current.status, current.is_deleted()) {
            Ok(status) => status,
            Err(LedgerRefusal::Deleted) => return Ok(LedgerOutcome::AlreadyDeleted),
        };

        let contribution = sqlx::query_as::<_, Contribution>(&format!(
            r#"
            UPDATE contributions
            SET status = $2,
                verified_by = $3,
                verified_at = NOW(),
                note = COALESCE($4, note),
                updated_at = NOW(),
                updated_by = $3
            WHERE id = $1
            RETURNING {CONTRIBUTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status)
        .bind(actor)
        .bind(note)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        info!("Contribution {} marked {} by {}", id, status, actor);
        Ok(LedgerOutcome::Applied(contribution))
    }

    /// Apply field changes, reset verification to pending and audit the
    /// change, all in one transaction
    pub async fn edit(
        &self,
        id: Uuid,
        actor: Uuid,
        changes: &ContributionChanges,
    ) -> DatabaseResult<LedgerOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(before) = lock_row(&mut tx, id).await? else {
            return Ok(LedgerOutcome::NotFound);
        };

        let status = match LedgerAction::Edit.next_status(before.status, before.is_deleted()) {
            Ok(status) => status,
            Err(LedgerRefusal::Deleted) => return Ok(LedgerOutcome::AlreadyDeleted),
        };

        let (amount, paid_at, note) = changes.merge(&before);

        let after = sqlx::query_as::<_, Contribution>(&format!(
            r#"
            UPDATE contributions
            SET amount = $2,
                paid_at = $3,
                note = $4,
                status = $5,
                verified_by = NULL,
                verified_at = NULL,
                updated_at = NOW(),
                updated_by = $6
            WHERE id = $1
            RETURNING {CONTRIBUTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(amount)
        .bind(paid_at)
        .bind(note)
        .bind(status)
        .bind(actor)
        .fetch_one(&mut *tx)
        .await?;

        record_audit(&mut tx, &before, &after, actor, AuditAction::Update).await?;
        tx.commit().await?;

        info!("Contribution {} edited by {}, verification reset", id, actor);
        Ok(LedgerOutcome::Applied(after))
    }

    /// Soft-delete a contribution and audit it, in one transaction
    pub async fn soft_delete(
        &self,
        id: Uuid,
        actor: Uuid,
        reason: Option<&str>,
    ) -> DatabaseResult<LedgerOutcome> {
        let mut tx = self.pool.begin().await?;

        let Some(before) = lock_row(&mut tx, id).await? else {
            return Ok(LedgerOutcome::NotFound);
        };

        if let Err(LedgerRefusal::Deleted) =
            LedgerAction::Delete.next_status(before.status, before.is_deleted())
        {
            return Ok(LedgerOutcome::AlreadyDeleted);
        }

        let after = sqlx::query_as::<_, Contribution>(&format!(
            r#"
            UPDATE contributions
            SET deleted_at = NOW(),
                deleted_by = $2,
                delete_reason = $3,
                updated_at = NOW(),
                updated_by = $2
            WHERE id = $1
            RETURNING {CONTRIBUTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(actor)
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        record_audit(&mut tx, &before, &after, actor, AuditAction::Delete).await?;
        tx.commit().await?;

        info!("Contribution {} deleted by {}", id, actor);
        Ok(LedgerOutcome::Applied(after))
    }

    /// Audit trail of one contribution, oldest first
    pub async fn audit_trail(&self, contribution_id: Uuid) -> DatabaseResult<Vec<ContributionAudit>> {
        let entries = sqlx::query_as::<_, ContributionAudit>(
            r#"
            SELECT id, contribution_id, group_id, actor_user_id, action,
                   schema_version, before, after, created_at
            FROM contribution_audit
            WHERE contribution_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(contribution_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}

async fn lock_row(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> DatabaseResult<Option<Contribution>> {
    let row = sqlx::query_as::<_, Contribution>(&format!(
        r#"
        SELECT {CONTRIBUTION_COLUMNS}
        FROM contributions
        WHERE id = $1
        FOR UPDATE
        "#
    ))
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    Ok(row)
}

async fn record_audit(
    tx: &mut Transaction<'_, Postgres>,
    before: &Contribution,
    after: &Contribution,
    actor: Uuid,
    action: AuditAction,
) -> DatabaseResult<()> {
    sqlx::query(
        r#"
        INSERT INTO contribution_audit
            (contribution_id, group_id, actor_user_id, action, schema_version, before, after)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(before.id)
    .bind(before.group_id)
    .bind(actor)
    .bind(action)
    .bind(AUDIT_SCHEMA_VERSION)
    .bind(sqlx::types::Json(before))
    .bind(sqlx::types::Json(after))
    .execute(&mut **tx)
    .await?;

    Ok(())
}
