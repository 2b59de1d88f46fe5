//! # fitpulse-entity
//!
//! Domain entity models for the FitPulse notification engine. Every struct
//! in this crate represents a stored record or a domain value object. The
//! notification lifecycle state machine lives here as well, so every crate
//! that mutates a notification goes through the same transition table.

pub mod log;
pub mod notification;
