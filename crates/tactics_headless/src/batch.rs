//! Batch runner for seed sweeps.
//!
//! Runs one scenario under many seeds in parallel using rayon, collecting
//! per-run outcomes and an aggregate summary. Each seed changes rock
//! passability, sight blocking and damage rolls.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use tactics_core::combatant::TeamId;

use crate::runner::ScenarioRunner;
use crate::scenario::{Scenario, ScenarioError};

/// Configuration for a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Number of seeds to run.
    pub runs: u32,
    /// First seed; run `i` uses `seed_start + i`.
    pub seed_start: u64,
    /// Tick limit override, `None` for the scenario's own.
    pub max_ticks: Option<u64>,
    /// Worker threads (0 = rayon default).
    pub parallel: u32,
    /// Where results are written by the CLI.
    pub output: Option<PathBuf>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            runs: 32,
            seed_start: 0,
            max_ticks: None,
            parallel: 0,
            output: None,
        }
    }
}

impl BatchConfig {
    /// Config for `runs` seeds.
    pub fn new(runs: u32) -> Self {
        Self {
            runs,
            ..Default::default()
        }
    }

    /// Set the first seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set the worker count.
    pub fn with_parallel(mut self, parallel: u32) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Outcome of one seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRun {
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Surviving combatants per team.
    pub survivors: BTreeMap<TeamId, usize>,
    /// Shots launched.
    pub shots_fired: u32,
    /// Shots withheld for lack of sight.
    pub shots_blocked: u32,
    /// Combatants destroyed.
    pub kills: usize,
    /// Total damage applied.
    pub total_damage: u64,
    /// Final state hash.
    pub state_hash: u64,
}

/// A seed that failed to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used.
    pub seed: u64,
    /// Error message.
    pub message: String,
}

/// Aggregate over all successful runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Successful runs.
    pub runs: usize,
    /// Mean ticks per run.
    pub average_ticks: f64,
    /// Mean damage per run.
    pub average_damage: f64,
    /// Share of runs each team ended with at least one survivor.
    pub team_survival: BTreeMap<TeamId, f64>,
    /// Share of scheduled shots withheld for lack of sight.
    pub sight_block_rate: f64,
    /// Number of distinct final states.
    pub distinct_outcomes: usize,
}

impl BatchSummary {
    /// Summarise a set of runs.
    #[must_use]
    pub fn from_runs(runs: &[BatchRun]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;

        let mut team_survival: BTreeMap<TeamId, f64> = BTreeMap::new();
        for run in runs {
            for (&team, &alive) in &run.survivors {
                let entry = team_survival.entry(team).or_insert(0.0);
                if alive > 0 {
                    *entry += 1.0;
                }
            }
        }
        for share in team_survival.values_mut() {
            *share /= n;
        }

        let fired: u64 = runs.iter().map(|r| u64::from(r.shots_fired)).sum();
        let blocked: u64 = runs.iter().map(|r| u64::from(r.shots_blocked)).sum();
        let mut hashes: Vec<u64> = runs.iter().map(|r| r.state_hash).collect();
        hashes.sort_unstable();
        hashes.dedup();

        Self {
            runs: runs.len(),
            average_ticks: runs.iter().map(|r| r.ticks as f64).sum::<f64>() / n,
            average_damage: runs.iter().map(|r| r.total_damage as f64).sum::<f64>() / n,
            team_survival,
            sight_block_rate: blocked as f64 / ((fired + blocked).max(1)) as f64,
            distinct_outcomes: hashes.len(),
        }
    }
}

/// Results from a batch run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name.
    pub scenario: String,
    /// Configuration used.
    pub config: BatchConfig,
    /// Successful runs, ordered by seed.
    pub runs: Vec<BatchRun>,
    /// Aggregate summary.
    pub summary: BatchSummary,
    /// Failed seeds.
    pub errors: Vec<BatchError>,
    /// Wall-clock runtime.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Run one seed to completion.
pub fn run_single(
    scenario: &Scenario,
    seed: u64,
    max_ticks: Option<u64>,
) -> Result<BatchRun, ScenarioError> {
    let mut runner = ScenarioRunner::with_seed(scenario, seed)?;
    let report = runner.run(max_ticks);

    let mut survivors = BTreeMap::new();
    for unit in &report.units {
        *survivors.entry(unit.team).or_insert(0) += usize::from(unit.alive);
    }

    Ok(BatchRun {
        seed,
        ticks: report.ticks,
        survivors,
        shots_fired: report.volleys.fired,
        shots_blocked: report.volleys.blocked_by_sight,
        kills: report.kills.len(),
        total_damage: report.stats.total_damage_dealt,
        state_hash: report.state_hash,
    })
}

/// Run a scenario across `config.runs` consecutive seeds.
pub fn run_batch(scenario: &Scenario, config: BatchConfig) -> BatchResults {
    let start = Instant::now();
    info!(
        scenario = %scenario.name,
        runs = config.runs,
        seed_start = config.seed_start,
        "Starting batch run"
    );

    let sweep = || -> Vec<Result<BatchRun, BatchError>> {
        (0..config.runs)
            .into_par_iter()
            .map(|i| {
                let seed = config.seed_start.wrapping_add(u64::from(i));
                run_single(scenario, seed, config.max_ticks).map_err(|e| {
                    warn!(seed, error = %e, "Run failed");
                    BatchError {
                        seed,
                        message: e.to_string(),
                    }
                })
            })
            .collect()
    };

    let results = if config.parallel > 0 {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel as usize)
            .build()
        {
            Ok(pool) => pool.install(sweep),
            Err(e) => {
                warn!(error = %e, "Falling back to the global thread pool");
                sweep()
            }
        }
    } else {
        sweep()
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<BatchRun> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    debug!(?summary, "Batch summary");
    info!(
        "Batch complete: {} runs in {:.1}s ({} failed)",
        runs.len(),
        duration_seconds,
        errors.len()
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        runs,
        summary,
        errors,
        duration_seconds,
    }
}

/// Run the same seed `runs` times and check every report matches.
pub fn verify_determinism(scenario: &Scenario, seed: u64, runs: u32) -> Result<bool, ScenarioError> {
    let reference = ScenarioRunner::with_seed(scenario, seed)?.run(None);
    for attempt in 1..runs {
        let report = ScenarioRunner::with_seed(scenario, seed)?.run(None);
        if report != reference {
            warn!(
                seed,
                attempt,
                expected = reference.state_hash,
                actual = report.state_hash,
                "Determinism check failed"
            );
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500).with_seed(12345).with_parallel(2);
        assert_eq!(config.runs, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.parallel, 2);
        assert_eq!(config.max_ticks, None);
    }

    #[test]
    fn test_run_batch_small() {
        let scenario = Scenario::outpost().unwrap();
        let results = run_batch(&scenario, BatchConfig::new(6).with_parallel(2));

        assert_eq!(results.runs.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.runs, 6);
        assert!(results.summary.distinct_outcomes >= 1);
        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_batch_matches_single_runs() {
        let scenario = Scenario::outpost().unwrap();
        let results = run_batch(&scenario, BatchConfig::new(3).with_seed(40));
        for run in &results.runs {
            assert_eq!(run, &run_single(&scenario, run.seed, None).unwrap());
        }
    }

    #[test]
    fn test_summary_team_survival() {
        let run = |seed, team0, team1| BatchRun {
            seed,
            ticks: 100,
            survivors: BTreeMap::from([(0, team0), (1, team1)]),
            shots_fired: 3,
            shots_blocked: 1,
            kills: 0,
            total_damage: 50,
            state_hash: seed,
        };
        let summary = BatchSummary::from_runs(&[run(1, 2, 0), run(2, 1, 1)]);

        assert_eq!(summary.runs, 2);
        assert!((summary.team_survival[&0] - 1.0).abs() < 1e-9);
        assert!((summary.team_survival[&1] - 0.5).abs() < 1e-9);
        assert!((summary.sight_block_rate - 0.25).abs() < 1e-9);
        assert_eq!(summary.distinct_outcomes, 2);
    }

    #[test]
    fn test_verify_determinism() {
        let scenario = Scenario::outpost().unwrap();
        assert!(verify_determinism(&scenario, 12345, 3).unwrap());
    }

    #[test]
    fn test_batch_results_save_load() {
        let scenario = Scenario::outpost().unwrap();
        let results = run_batch(&scenario, BatchConfig::new(2));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");

        results.save(&path).unwrap();
        assert!(path.exists());

        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.runs, results.runs);
        assert_eq!(loaded.scenario, "Outpost Defence");
    }
}
