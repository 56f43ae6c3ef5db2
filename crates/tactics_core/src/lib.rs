//! # Tactics Core
//!
//! Deterministic tactical core for a desert RTS: grid pathfinding over
//! weighted terrain, weapon line of sight, and combat damage resolution.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No global state
//! - No ambient randomness (every random draw comes from an injected, seeded source)
//! - No floating-point math (uses fixed-point)
//!
//! Everything runs single-threaded and run-to-completion, driven once per
//! simulation tick by an external loop.
//!
//! ## Crate Structure
//!
//! - [`terrain`] - Tile grid and movement cost model
//! - [`pathfinding`] - A* search and path smoothing
//! - [`line_of_sight`] - Occlusion grid for weapon sight checks
//! - [`damage`] - Effectiveness matrix and damage rolls
//! - [`combat`] - Projectile flight and hit resolution
//! - [`combatant`] - Health contract, veterancy and archetypes
//! - [`config`] - RON-loadable tuning
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod combat;
pub mod combatant;
pub mod config;
pub mod damage;
pub mod error;
pub mod line_of_sight;
pub mod math;
pub mod pathfinding;
pub mod projectile;
pub mod telemetry;
pub mod terrain;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::combat::{CombatResolver, CombatTickReport, HitEvent, HitKind};
    pub use crate::combatant::{
        Archetype, ArchetypeStats, Combatant, Damageable, EntityId, TeamId, Veterancy,
        VeterancyLadder,
    };
    pub use crate::config::{CombatConfig, CoreConfig, SightConfig};
    pub use crate::damage::{
        ArmorType, DamageModel, DamageType, EffectivenessMatrix, NoVariance, PresentationHint,
        SeededVariance, SourceModifiers, VarianceSource,
    };
    pub use crate::error::{GameError, Result};
    pub use crate::line_of_sight::LineOfSightGrid;
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::pathfinding::{Path, PathFinder};
    pub use crate::projectile::{
        FireOrder, Projectile, ProjectileId, ProjectileKind, ProjectilePhase, ProjectileTarget,
        ShotSource,
    };
    pub use crate::telemetry::{CombatStats, DamageNumber, Explosion};
    pub use crate::terrain::{GridCoord, TerrainMap, Tile, TileKind};
}
