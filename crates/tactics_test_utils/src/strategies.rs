//! Proptest strategies for the tactical core.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing: small terrains, coordinates, world points and
//! damage parameters.

use proptest::prelude::*;

use tactics_core::damage::{ArmorType, DamageType};
use tactics_core::math::{Fixed, Vec2Fixed};
use tactics_core::terrain::{GridCoord, TerrainMap, Tile, TileKind};

/// Generate any tile kind.
pub fn arb_tile_kind() -> impl Strategy<Value = TileKind> {
    prop::sample::select(TileKind::ALL.to_vec())
}

/// Generate a tile, blocked roughly one time in five.
pub fn arb_tile() -> impl Strategy<Value = Tile> {
    (arb_tile_kind(), prop::bool::weighted(0.8)).prop_map(|(kind, walkable)| Tile::new(kind, walkable))
}

/// Generate a terrain between 2x2 and `max_side` x `max_side` tiles.
pub fn arb_terrain(max_side: u32) -> impl Strategy<Value = TerrainMap> {
    (2..=max_side, 2..=max_side).prop_flat_map(|(width, height)| {
        prop::collection::vec(arb_tile(), (width * height) as usize).prop_map(move |tiles| {
            TerrainMap::from_tiles(width, height, tiles).expect("tile count matches dimensions")
        })
    })
}

/// Generate a terrain plus two in-bounds coordinates on it.
pub fn arb_terrain_with_endpoints(
    max_side: u32,
) -> impl Strategy<Value = (TerrainMap, GridCoord, GridCoord)> {
    arb_terrain(max_side).prop_flat_map(|terrain| {
        let w = terrain.width() as i32;
        let h = terrain.height() as i32;
        (
            Just(terrain),
            (0..w, 0..h).prop_map(|(x, y)| GridCoord::new(x, y)),
            (0..w, 0..h).prop_map(|(x, y)| GridCoord::new(x, y)),
        )
    })
}

/// Generate a grid coordinate in `[0, side)` on both axes.
pub fn arb_coord(side: i32) -> impl Strategy<Value = GridCoord> {
    (0..side, 0..side).prop_map(|(x, y)| GridCoord::new(x, y))
}

/// Generate an integer world point in `[0, extent)` on both axes.
pub fn arb_world_point(extent: i32) -> impl Strategy<Value = Vec2Fixed> {
    (0..extent, 0..extent).prop_map(|(x, y)| Vec2Fixed::from_ints(x, y))
}

/// Generate a distance in `[0, radius]` with 1/256 precision.
pub fn arb_distance_within(radius: i32) -> impl Strategy<Value = Fixed> {
    (0..=radius * 256).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(256))
}

/// Generate any damage type.
pub fn arb_damage_type() -> impl Strategy<Value = DamageType> {
    prop::sample::select(DamageType::ALL.to_vec())
}

/// Generate any armor type.
pub fn arb_armor_type() -> impl Strategy<Value = ArmorType> {
    prop::sample::select(ArmorType::ALL.to_vec())
}

/// Generate base damage values.
///
/// Range: 0 to 500
pub fn arb_base_damage() -> impl Strategy<Value = u32> {
    0u32..=500
}
