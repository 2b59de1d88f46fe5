//! Workspace integration tests.
//!
//! Every scenario runs against both the SQLite store and the in-memory
//! store through [`helpers::TestEngine`].

mod helpers;

mod analytics_test;
mod cancellation_test;
mod lifecycle_test;
mod retention_test;
mod retry_test;
mod sweep_test;
