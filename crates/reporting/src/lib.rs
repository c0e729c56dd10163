//! Read-only reporting façade consumed by the dashboard. Every query is
//! independently retryable and degrades to empty/zero on store failure.

pub mod dashboard;

pub use dashboard::DashboardReporter;
