//! # fitpulse-core
//!
//! Core crate for the FitPulse notification engine. Contains the unified
//! error system, configuration schemas, typed identifiers, and the
//! capability traits (such as [`traits::Clock`]) that the engine consumes.
//!
//! This crate has **no** internal dependencies on other FitPulse crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
