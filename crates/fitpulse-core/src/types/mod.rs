//! Core type definitions used across the FitPulse workspace.

pub mod id;

pub use id::*;
