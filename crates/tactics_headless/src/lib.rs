//! Headless scenario driver for the tactical core.
//!
//! The core has no loop of its own. This crate is the external driver: it
//! loads a RON scenario, builds terrain, the sight grid and a combat resolver
//! from it, answers route queries, then ticks volleys at 20 Hz and reports
//! the outcome as JSON.
//!
//! - **stdout**: the JSON report
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run the bundled scenario
//! cargo run -p tactics_headless -- run --scenario crates/tactics_headless/scenarios/outpost.ron
//!
//! # Query a single route
//! cargo run -p tactics_headless -- path --scenario outpost.ron --from 0,0 --to 19,11 --smooth
//!
//! # Sweep 100 seeds
//! cargo run -p tactics_headless -- batch --scenario outpost.ron --runs 100
//! ```

pub mod batch;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, BatchSummary};
pub use runner::{RouteReport, RunReport, ScenarioRunner, ShotOutcome};
pub use scenario::{Scenario, ScenarioError};
