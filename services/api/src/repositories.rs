//! Repositories for database operations
//!
//! Repositories return `DatabaseResult` and express expected domain
//! outcomes (already deleted, not eligible, duplicate) in their `Ok` values,
//! leaving `Err` for storage failures.

pub mod contribution;
pub mod group;
pub mod job;
pub mod membership;
pub mod review;
pub mod summary;

pub use contribution::{ContributionRepository, LedgerOutcome};
pub use group::GroupRepository;
pub use job::JobRepository;
pub use membership::MembershipRepository;
pub use review::ReviewRepository;
pub use summary::SummaryRepository;
