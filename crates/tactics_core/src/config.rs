//! Tuning configuration for the tactical core.
//!
//! All values are integers (world units, percentages, milliseconds) so that
//! RON files stay readable and the conversion to fixed-point is exact or
//! truncated the same way on every platform.
//!
//! # Example RON
//!
//! ```ron
//! CoreConfig(
//!     tile_size: 32,
//!     sight: SightConfig(cell_size: 32, rock_block_percent: 30),
//!     combat: CombatConfig(
//!         variance_percent: 10,
//!         effectiveness: [
//!             EffectivenessEntry(damage_type: Energy, armor_type: Shield, multiplier_percent: 200),
//!         ],
//!     ),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::damage::{ArmorType, DamageType};
use crate::error::{GameError, Result};

/// Line-of-sight grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SightConfig {
    /// World units per occlusion cell.
    pub cell_size: u32,
    /// Chance, in percent, that a rock cell blocks sight.
    pub rock_block_percent: u32,
}

impl Default for SightConfig {
    fn default() -> Self {
        Self {
            cell_size: 32,
            rock_block_percent: 30,
        }
    }
}

/// One effectiveness override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectivenessEntry {
    /// Attacking damage type.
    pub damage_type: DamageType,
    /// Defending armor type.
    pub armor_type: ArmorType,
    /// Multiplier as a percentage (150 = 1.5x).
    pub multiplier_percent: u32,
}

/// Damage and telemetry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Half-width of the random damage band (10 = ±10%).
    pub variance_percent: u32,
    /// Damage at or above this is presented as critical.
    pub critical_threshold: u32,
    /// Bonus per veterancy level, in percent.
    pub veterancy_bonus_percent: u32,
    /// Area damage at the blast edge, as a percentage of nominal.
    pub splash_edge_percent: u32,
    /// Visual decay of a spent projectile.
    pub projectile_decay_ms: u32,
    /// Explosion lifetime.
    pub explosion_duration_ms: u32,
    /// Share of the explosion lifetime spent growing.
    pub explosion_growth_percent: u32,
    /// Damage number lifetime.
    pub damage_number_duration_ms: u32,
    /// Damage number drift in world units per second.
    pub damage_number_rise_speed: u32,
    /// Damage number horizontal jitter band width in world units.
    pub damage_number_jitter: u32,
    /// Overrides merged over the built-in effectiveness matrix.
    pub effectiveness: Vec<EffectivenessEntry>,
    /// Start from an empty matrix instead of the built-in one.
    pub strict_effectiveness: bool,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            variance_percent: 10,
            critical_threshold: 50,
            veterancy_bonus_percent: 10,
            splash_edge_percent: 50,
            projectile_decay_ms: 300,
            explosion_duration_ms: 500,
            explosion_growth_percent: 30,
            damage_number_duration_ms: 1500,
            damage_number_rise_speed: 30,
            damage_number_jitter: 20,
            effectiveness: Vec::new(),
            strict_effectiveness: false,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// World units per terrain tile.
    pub tile_size: u32,
    /// Line-of-sight grid settings.
    pub sight: SightConfig,
    /// Damage and telemetry settings.
    pub combat: CombatConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            tile_size: 32,
            sight: SightConfig::default(),
            combat: CombatConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parse and validate a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Self::parse(ron, "<inline>")
    }

    /// Load and validate a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents, &path.display().to_string())
    }

    fn parse(ron: &str, origin: &str) -> Result<Self> {
        let config: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        config.validate()?;
        tracing::debug!(origin, tile_size = config.tile_size, "Loaded core config");
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.tile_size == 0 {
            return Err(GameError::InvalidConfig("tile_size must be positive".into()));
        }
        if self.sight.cell_size == 0 {
            return Err(GameError::InvalidConfig("sight.cell_size must be positive".into()));
        }
        if self.sight.rock_block_percent > 100 {
            return Err(GameError::InvalidConfig(
                "sight.rock_block_percent must be at most 100".into(),
            ));
        }

        let combat = &self.combat;
        if combat.variance_percent >= 100 {
            return Err(GameError::InvalidConfig(
                "combat.variance_percent must be below 100".into(),
            ));
        }
        if combat.splash_edge_percent > 100 {
            return Err(GameError::InvalidConfig(
                "combat.splash_edge_percent must be at most 100".into(),
            ));
        }
        if combat.explosion_growth_percent == 0 || combat.explosion_growth_percent >= 100 {
            return Err(GameError::InvalidConfig(
                "combat.explosion_growth_percent must be between 1 and 99".into(),
            ));
        }
        if let Some(entry) = combat.effectiveness.iter().find(|e| e.multiplier_percent == 0) {
            return Err(GameError::InvalidConfig(format!(
                "effectiveness {:?} vs {:?} must be positive",
                entry.damage_type, entry.armor_type
            )));
        }
        Ok(())
    }
}
