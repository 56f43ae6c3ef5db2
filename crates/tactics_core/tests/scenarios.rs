//! Reference scenarios for pathfinding, damage, area falloff and sight.
//!
//! Each test builds a small, fully specified situation and checks the exact
//! numbers that come out.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tactics_core::math::SQRT_2;
use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{
    combatant, coord, fixed, open_terrain, point, terrain_from_ascii, tick_dt, wall_with_gap,
    TILE_SIZE,
};

// =============================================================================
// Pathfinding
// =============================================================================

#[test]
fn scenario_a_open_grid_takes_the_diagonal() {
    let terrain = open_terrain(10, 10);
    let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));

    let path = finder.find_path(coord(0, 0), coord(9, 9)).unwrap();

    assert_eq!(path.len(), 9);
    assert_eq!(path.last(), Some(&finder.grid_to_world(coord(9, 9))));
    assert_eq!(
        finder.path_cost(coord(0, 0), &path),
        Some(SQRT_2 * Fixed::from_num(9))
    );
}

#[test]
fn scenario_b_solid_wall_is_unreachable() {
    let terrain = wall_with_gap(10, 10, 5, None);
    let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));

    let result = finder.find_path(coord(0, 0), coord(9, 9));
    assert!(matches!(
        result,
        Err(GameError::PathNotFound { start, end }) if start == coord(0, 0) && end == coord(9, 9)
    ));

    // The legacy fallback walks straight at the goal.
    let direct = finder.find_path_or_direct(coord(0, 0), coord(9, 9));
    assert_eq!(direct, vec![finder.grid_to_world(coord(9, 9))]);
}

#[test]
fn scenario_b_wall_with_gap_forces_a_detour() {
    let terrain = wall_with_gap(10, 10, 5, Some(0));
    let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));

    let path = finder.find_path(coord(0, 0), coord(9, 9)).unwrap();
    let cost = finder.path_cost(coord(0, 0), &path).unwrap();

    assert!(cost > SQRT_2 * Fixed::from_num(9));
    assert!(path.contains(&finder.grid_to_world(coord(5, 0))));
    for waypoint in &path {
        let tile = finder.world_to_grid(*waypoint).unwrap();
        assert!(terrain.is_walkable(tile), "waypoint on blocked tile {tile}");
    }
}

#[test]
fn test_terrain_costs_steer_the_route() {
    // A band of dunes across the middle; a spice lane through it.
    let terrain = terrain_from_ascii(&[
        "..........",
        "~~~~$~~~~~",
        "~~~~$~~~~~",
        "~~~~$~~~~~",
        "..........",
    ]);
    let finder = PathFinder::new(&terrain, Fixed::ONE);

    let tiles = finder.find_tile_path(coord(4, 0), coord(4, 4)).unwrap();
    assert_eq!(tiles, vec![coord(4, 1), coord(4, 2), coord(4, 3), coord(4, 4)]);
}

#[test]
fn test_smoothed_route_on_open_ground_is_two_points() {
    let terrain = open_terrain(12, 12);
    let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));

    let smoothed = finder.find_smoothed_path(coord(0, 0), coord(11, 4)).unwrap();
    let raw = finder.find_path(coord(0, 0), coord(11, 4)).unwrap();

    assert!(smoothed.len() <= raw.len());
    assert_eq!(smoothed.first(), raw.first());
    assert_eq!(smoothed.last(), raw.last());
    assert_eq!(smoothed.len(), 2);
}

#[test]
fn test_tile_info_reports_cost() {
    let mut terrain = open_terrain(3, 3);
    terrain.set_tile(coord(1, 1), Tile::open(TileKind::Dune));

    let info = terrain.tile_info(coord(1, 1)).unwrap();
    assert_eq!(info.kind, TileKind::Dune);
    assert!(info.walkable);
    assert_eq!(info.cost, Some(TileKind::Dune.cost_factor()));
    assert!(terrain.tile_info(coord(3, 0)).is_none());
}

// =============================================================================
// Damage
// =============================================================================

#[test]
fn scenario_c_explosive_vs_light() {
    let model = DamageModel::default();
    let damage = model.compute_damage(
        100,
        DamageType::Explosive,
        ArmorType::Light,
        &SourceModifiers::default(),
        &mut NoVariance,
    );
    assert_eq!(damage, 150);
}

#[test]
fn scenario_d_area_falloff_at_half_radius() {
    let mut resolver = CombatResolver::new(DamageModel::default(), NoVariance);
    let mut targets = vec![
        combatant(1, 1, Archetype::Heavy, 200, 200),
        combatant(2, 1, Archetype::Heavy, 215, 200),
    ];

    let order = FireOrder::new(
        point(100, 200),
        ProjectileTarget::Entity {
            id: 1,
            position: point(200, 200),
        },
        100,
        DamageType::Explosive,
        fixed(250),
        fixed(30),
    )
    .with_source(ShotSource {
        id: 50,
        team: 0,
        modifiers: SourceModifiers::NONE,
    });
    resolver.submit_projectile(order);

    let mut hits = Vec::new();
    for _ in 0..20 {
        hits.extend(resolver.tick(tick_dt(), &mut targets).hits);
    }

    let splash: Vec<_> = hits.iter().filter(|h| h.kind == HitKind::Splash).collect();
    assert_eq!(splash.len(), 1);
    assert_eq!(splash[0].target, 2);
    assert_eq!(splash[0].amount, 75);

    let direct: Vec<_> = hits.iter().filter(|h| h.kind == HitKind::Direct).collect();
    assert_eq!(direct.len(), 1);
    assert_eq!(direct[0].target, 1);
    // Explosive vs heavy is neutral.
    assert_eq!(direct[0].amount, 100);
}

// =============================================================================
// Line of sight
// =============================================================================

#[test]
fn scenario_e_clear_grid_then_blocked_midpoint() {
    let mut grid = LineOfSightGrid::clear(10, 10, TILE_SIZE);
    let points = [
        point(0, 0),
        point(319, 319),
        point(0, 319),
        point(160, 5),
        point(33, 250),
    ];
    for a in points {
        for b in points {
            assert!(grid.has_line_of_sight(a, b));
        }
    }

    let a = point(16, 16);
    let b = point(304, 304);
    let (mx, my) = grid.world_to_cell(point(160, 160));
    grid.set_blocked(mx, my, true);

    assert!(!grid.has_line_of_sight(a, b));
    assert!(!grid.has_line_of_sight(b, a));
}

#[test]
fn test_sight_and_walkability_are_independent() {
    // Passable rock can still block sight.
    let terrain = TerrainMap::filled(4, 1, TileKind::Rock);
    let grid = LineOfSightGrid::build(
        &terrain,
        TILE_SIZE,
        &SightConfig {
            cell_size: TILE_SIZE,
            rock_block_percent: 100,
        },
        &mut ChaCha8Rng::seed_from_u64(1),
    );

    assert!(terrain.is_walkable(coord(1, 0)));
    assert!(!grid.has_line_of_sight(point(0, 0), point(127, 0)));

    let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));
    assert!(finder.has_walkable_line(point(0, 0), point(96, 0)));
}
