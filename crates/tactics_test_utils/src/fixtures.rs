//! Test fixtures and helpers.
//!
//! Pre-built terrain, combatants and fixed-point shorthands for consistent
//! testing.

use fixed::types::I32F32;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tactics_core::combatant::{Archetype, Combatant, EntityId, TeamId};
use tactics_core::config::SightConfig;
use tactics_core::line_of_sight::LineOfSightGrid;
use tactics_core::math::Vec2Fixed;
use tactics_core::terrain::{GridCoord, TerrainMap, Tile, TileKind};

/// World units per tile used by fixtures.
pub const TILE_SIZE: u32 = 32;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a fixed-point number from a float (for tests only).
///
/// Note: In real simulation code, never use floats.
/// This is only for convenient test setup.
#[must_use]
pub fn fixed_f(n: f64) -> I32F32 {
    I32F32::from_num(n)
}

/// One tick at 20 ticks per second.
#[must_use]
pub fn tick_dt() -> I32F32 {
    I32F32::ONE / I32F32::from_num(20)
}

/// Shorthand for a grid coordinate.
#[must_use]
pub const fn coord(x: i32, y: i32) -> GridCoord {
    GridCoord::new(x, y)
}

/// Shorthand for an integer world point.
#[must_use]
pub fn point(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::from_ints(x, y)
}

/// Build terrain from glyph rows (see `TileKind::from_glyph`).
///
/// # Panics
///
/// Panics if the rows are ragged or contain unknown glyphs.
#[must_use]
pub fn terrain_from_ascii(rows: &[&str]) -> TerrainMap {
    TerrainMap::from_rows(rows).expect("fixture terrain must be valid")
}

/// All-sand terrain.
#[must_use]
pub fn open_terrain(width: u32, height: u32) -> TerrainMap {
    TerrainMap::filled(width, height, TileKind::Sand)
}

/// Sand terrain with an impassable rock column at `x`, open only at `gap_y`.
#[must_use]
pub fn wall_with_gap(width: u32, height: u32, x: i32, gap_y: Option<i32>) -> TerrainMap {
    let mut terrain = open_terrain(width, height);
    for y in 0..height as i32 {
        if Some(y) != gap_y {
            terrain.set_tile(coord(x, y), Tile::new(TileKind::Rock, false));
        }
    }
    terrain
}

/// Terrain with a deterministic mix of every tile kind and some blocked rock.
#[must_use]
pub fn mixed_terrain(width: u32, height: u32, seed: u64) -> TerrainMap {
    use rand::Rng;

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut terrain = open_terrain(width, height);
    for y in 0..height as i32 {
        for x in 0..width as i32 {
            let kind = TileKind::ALL[rng.gen_range(0..TileKind::ALL.len())];
            terrain.set_tile(coord(x, y), Tile::open(kind));
        }
    }
    terrain.roll_rock_passability(&mut rng, 70);
    terrain
}

/// An all-clear sight grid covering `terrain`.
#[must_use]
pub fn clear_sight(terrain: &TerrainMap) -> LineOfSightGrid {
    LineOfSightGrid::build(
        terrain,
        TILE_SIZE,
        &SightConfig {
            cell_size: TILE_SIZE,
            rock_block_percent: 0,
        },
        &mut ChaCha8Rng::seed_from_u64(0),
    )
}

/// Spawn a combatant at an integer world point.
#[must_use]
pub fn combatant(id: EntityId, team: TeamId, archetype: Archetype, x: i32, y: i32) -> Combatant {
    Combatant::new(id, team, archetype, point(x, y))
}
