//! Attempt reconciliation and performance analytics.
//!
//! This crate takes the loosely shaped attempt, analysis and solution
//! payloads an exam backend returns and derives one consistent view of a
//! learner's performance. It has no HTTP client of its own; network access
//! goes through the [`transport::Transport`] trait.

pub mod analysis;
pub mod api;
pub mod attempt;
pub mod correctness;
pub mod error;
pub mod groups;
pub mod ids;
pub mod lenient;
pub mod loader;
pub mod mock;
pub mod normalize;
pub mod partition;
pub mod question;
pub mod reconcile;
pub mod report;
pub mod response;
pub mod solution;
pub mod store;
pub mod sync;
pub mod transport;

/// Subject label used when a question or solution carries none.
pub const DEFAULT_SUBJECT: &str = "General";
