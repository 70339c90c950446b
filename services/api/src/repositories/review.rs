//! Review repository for database operations

use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::models::review::Review;

/// Review repository
#[derive(Clone)]
pub struct ReviewRepository {
    pool: PgPool,
}

impl ReviewRepository {
    /// Create a new review repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store the review for a job; `None` when the job already has one
    ///
    /// The unique `job_id` constraint decides concurrent submissions.
    pub async fn create(
        &self,
        job_id: Uuid,
        provider_id: Uuid,
        rating: i16,
        comment: &str,
    ) -> DatabaseResult<Option<Review>> {
        let inserted = sqlx::query_as::<_, Review>(
            r#"
            INSERT INTO reviews (job_id, provider_id, rating, comment)
            VALUES ($1, $2, $3, $4)
            RETURNING id, job_id, provider_id, rating, comment, created_at
            "#,
        )
        .bind(job_id)
        .bind(provider_id)
        .bind(rating)
        .bind(comment)
        .fetch_one(&self.pool)
        .await;

        let review = match inserted {
            Ok(review) => review,
            Err(e) => {
                let err = DatabaseError::from(e);
                if err.is_unique_violation() {
                    return Ok(None);
                }
                return Err(err);
            }
        };

        info!(
            "Review {} ({} stars) stored for provider {}",
            review.id, review.rating, provider_id
        );
        Ok(Some(review))
    }

    /// A provider's reviews, newest first
    pub async fn list_for_provider(&self, provider_id: Uuid) -> DatabaseResult<Vec<Review>> {
        let reviews = sqlx::query_as::<_, Review>(
            r#"
            SELECT id, job_id, provider_id, rating, comment, created_at
            FROM reviews
            WHERE provider_id = $1
            ORDER BY created_at DESC, id ASC
            "#,
        )
        .bind(provider_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(reviews)
    }
}
