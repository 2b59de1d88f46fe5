//! Background triggers for the FitPulse notification engine.
//!
//! This crate provides:
//! - A sweep runner that drives the due and retry sweeps on fixed intervals
//! - A cron scheduler for retention cleanup

pub mod runner;
pub mod scheduler;

pub use runner::SweepRunner;
pub use scheduler::MaintenanceScheduler;
