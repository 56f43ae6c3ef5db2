//! # Tactics Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Fixture builders (ASCII terrain, combatants, fixed-point helpers)
//! - Brute-force reference search for path optimality checks
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod reference;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
