//! API models: entities, request and response payloads, and the state
//! machines that govern them

pub mod contribution;
pub mod group;
pub mod job;
pub mod membership;
pub mod review;
pub mod summary;
