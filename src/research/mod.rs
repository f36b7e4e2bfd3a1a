//! Research task lifecycle: start, fetch, status.
//!
//! [`service::ResearchService`] is the synchronous surface over the
//! asynchronous machinery: it validates and persists new tasks, hands them
//! to the job queue, and projects task state for read endpoints. The actual
//! execution happens in [`crate::queue`].

/// Task lifecycle service.
pub mod service;

pub use service::ResearchService;
