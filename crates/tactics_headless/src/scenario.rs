//! Scenario loading and validation.
//!
//! A scenario describes one self-contained engagement: a glyph map, tuning,
//! combatant placements, route queries to resolve and a volley schedule.

use std::collections::HashSet;
use std::path::Path;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tactics_core::combatant::{Archetype, EntityId, TeamId};
use tactics_core::config::CoreConfig;
use tactics_core::error::GameError;
use tactics_core::projectile::ProjectileKind;
use tactics_core::terrain::TerrainMap;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Structurally valid but inconsistent scenario.
    #[error("Invalid scenario: {0}")]
    Invalid(String),
    /// Rejected by the tactical core.
    #[error(transparent)]
    Core(#[from] GameError),
}

const fn default_seed() -> u64 {
    0
}

const fn default_max_ticks() -> u64 {
    // One minute at 20 ticks per second
    1200
}

const fn default_repeat() -> u32 {
    1
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Seed for rock passability, sight blocking and damage variance.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Upper bound on simulated ticks.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u64,
    /// Chance, in percent, that each walkable rock tile stays passable.
    /// `None` keeps the map exactly as drawn.
    #[serde(default)]
    pub rock_passable_percent: Option<u32>,
    /// Tuning for the core.
    #[serde(default)]
    pub config: CoreConfig,
    /// Map rows, one glyph per tile.
    pub map: Vec<String>,
    /// Combatants present at tick 0.
    #[serde(default)]
    pub units: Vec<UnitPlacement>,
    /// Routes to resolve before combat starts.
    #[serde(default)]
    pub routes: Vec<RouteRequest>,
    /// Scheduled fire.
    #[serde(default)]
    pub volleys: Vec<Volley>,
}

/// One combatant at a fixed world position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitPlacement {
    /// Unique id.
    pub id: EntityId,
    /// Team.
    pub team: TeamId,
    /// Stat archetype.
    pub archetype: Archetype,
    /// World position (x, y).
    pub position: (i32, i32),
}

/// A route query between two tiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteRequest {
    /// Label echoed in the report.
    pub name: String,
    /// Start tile (x, y).
    pub from: (i32, i32),
    /// Goal tile (x, y).
    pub to: (i32, i32),
    /// Smooth the found path.
    #[serde(default)]
    pub smooth: bool,
}

/// Shots from one combatant at another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volley {
    /// Tick of the first shot.
    pub tick: u64,
    /// Firing combatant.
    pub shooter: EntityId,
    /// Intended victim.
    pub target: EntityId,
    /// Projectile preset.
    pub kind: ProjectileKind,
    /// Number of shots, spaced by the shooter's attack cooldown.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

impl Scenario {
    /// Load and validate a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        let scenario = Self::from_ron_str(&contents)?;
        tracing::info!(
            name = %scenario.name,
            path = %path.display(),
            units = scenario.units.len(),
            volleys = scenario.volleys.len(),
            "Loaded scenario"
        );
        Ok(scenario)
    }

    /// Parse and validate a scenario from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// The bundled outpost defence scenario.
    pub fn outpost() -> Result<Self, ScenarioError> {
        Self::from_ron_str(include_str!("../scenarios/outpost.ron"))
    }

    /// Check cross-references and ranges.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        self.config.validate()?;
        let terrain = TerrainMap::from_rows(&self.map)?;

        if self.rock_passable_percent.is_some_and(|p| p > 100) {
            return Err(ScenarioError::Invalid(
                "rock_passable_percent must be at most 100".into(),
            ));
        }

        let mut ids = HashSet::new();
        for unit in &self.units {
            if !ids.insert(unit.id) {
                return Err(ScenarioError::Invalid(format!("duplicate unit id {}", unit.id)));
            }
        }

        let tile = u64::from(self.config.tile_size);
        let world = (terrain.width() as u64 * tile, terrain.height() as u64 * tile);
        if world.0 > i32::MAX as u64 || world.1 > i32::MAX as u64 {
            return Err(ScenarioError::Invalid(format!(
                "{}x{} map at tile size {} exceeds world coordinate range",
                terrain.width(),
                terrain.height(),
                self.config.tile_size
            )));
        }
        for unit in &self.units {
            let (x, y) = unit.position;
            if x < 0 || y < 0 || x as u64 >= world.0 || y as u64 >= world.1 {
                return Err(ScenarioError::Invalid(format!(
                    "unit {} at ({x}, {y}) is outside the {}x{} map",
                    unit.id, world.0, world.1
                )));
            }
        }

        for volley in &self.volleys {
            for id in [volley.shooter, volley.target] {
                if !ids.contains(&id) {
                    return Err(ScenarioError::Invalid(format!(
                        "volley at tick {} references unknown unit {id}",
                        volley.tick
                    )));
                }
            }
            if volley.shooter == volley.target {
                return Err(ScenarioError::Invalid(format!(
                    "unit {} cannot fire at itself",
                    volley.shooter
                )));
            }
            if volley.repeat == 0 {
                return Err(ScenarioError::Invalid(format!(
                    "volley from unit {} fires zero shots",
                    volley.shooter
                )));
            }
        }

        Ok(())
    }

    /// Build the terrain, rolling rock passability when configured.
    pub fn terrain<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<TerrainMap, ScenarioError> {
        let mut terrain = TerrainMap::from_rows(&self.map)?;
        if let Some(percent) = self.rock_passable_percent {
            terrain.roll_rock_passability(rng, percent);
        }
        Ok(terrain)
    }
}
