//! Application state shared across handlers

use sqlx::PgPool;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::middleware::JwtVerifier;
use crate::notifications::{HttpNotifier, LogNotifier, Notifier};
use crate::repositories::{
    ContributionRepository, GroupRepository, JobRepository, MembershipRepository,
    ReviewRepository, SummaryRepository,
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub config: Arc<ServerConfig>,
    pub jwt: JwtVerifier,
    pub notifier: Arc<dyn Notifier>,
    pub group_repository: GroupRepository,
    pub membership_repository: MembershipRepository,
    pub contribution_repository: ContributionRepository,
    pub summary_repository: SummaryRepository,
    pub job_repository: JobRepository,
    pub review_repository: ReviewRepository,
}

impl AppState {
    /// Wire repositories onto `pool`; notifications go over HTTP when a
    /// notification URL is configured and to the log otherwise
    pub fn new(pool: PgPool, config: ServerConfig, jwt: JwtVerifier) -> Self {
        let notifier: Arc<dyn Notifier> = match &config.notification_url {
            Some(url) => Arc::new(HttpNotifier::new(url.clone())),
            None => Arc::new(LogNotifier),
        };

        Self {
            group_repository: GroupRepository::new(pool.clone()),
            membership_repository: MembershipRepository::new(pool.clone()),
            contribution_repository: ContributionRepository::new(pool.clone()),
            summary_repository: SummaryRepository::new(pool.clone()),
            job_repository: JobRepository::new(pool.clone()),
            review_repository: ReviewRepository::new(pool.clone()),
            db_pool: pool,
            config: Arc::new(config),
            jwt,
            notifier,
        }
    }
}
