//! Property-based tests for the tactical core.
//!
//! Random terrains, points and damage parameters are generated with the
//! strategies in `tactics_test_utils`; each property must hold for all of
//! them.

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use tactics_core::combat::splash_damage;
use tactics_core::math::percent;
use tactics_core::prelude::*;
use tactics_test_utils::fixtures::{fixed, fixed_f, point, tick_dt, TILE_SIZE};
use tactics_test_utils::reference::dijkstra_cost;
use tactics_test_utils::strategies::{
    arb_armor_type, arb_base_damage, arb_damage_type, arb_distance_within, arb_terrain,
    arb_terrain_with_endpoints, arb_world_point,
};

// =============================================================================
// Pathfinding
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// A* finds a path exactly when one exists, and its cost matches an
    /// exhaustive search.
    #[test]
    fn prop_astar_matches_reference((terrain, start, goal) in arb_terrain_with_endpoints(10)) {
        let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));
        let expected = dijkstra_cost(&finder, start, goal);

        match finder.find_path(start, goal) {
            Ok(path) if start == goal => prop_assert!(path.is_empty()),
            Ok(path) => {
                let cost = finder.path_cost(start, &path);
                prop_assert!(cost.is_some(), "path has an illegal step");
                let (cost, expected) = (cost.unwrap_or_default(), expected.unwrap_or_default());
                // The heuristic is rounded, so allow a few ulps of slack.
                prop_assert!((cost - expected).abs() <= fixed_f(0.0001),
                    "A* cost {} vs reference {}", cost, expected);
            }
            Err(GameError::PathNotFound { .. }) => prop_assert!(expected.is_none()),
            Err(other) => prop_assert!(false, "unexpected error {}", other),
        }
    }

    /// Every step of a found path is a legal move onto walkable ground and
    /// the last waypoint is the goal.
    #[test]
    fn prop_paths_are_connected((terrain, start, goal) in arb_terrain_with_endpoints(12)) {
        let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));
        if let Ok(tiles) = finder.find_tile_path(start, goal) {
            let mut previous = start;
            for &tile in &tiles {
                prop_assert!(terrain.is_walkable(tile));
                prop_assert!(previous.is_adjacent(tile), "{} -> {} is not a step", previous, tile);
                previous = tile;
            }
            if start != goal {
                prop_assert_eq!(tiles.last().copied(), Some(goal));
            }
        }
    }

    /// Smoothing never grows a path, keeps its endpoints, and only skips
    /// waypoints across walkable ground.
    #[test]
    fn prop_smoothing_is_safe((terrain, start, goal) in arb_terrain_with_endpoints(12)) {
        let finder = PathFinder::new(&terrain, fixed(TILE_SIZE as i32));
        if let Ok(raw) = finder.find_path(start, goal) {
            let smoothed = finder.smooth_path(&raw);

            prop_assert!(smoothed.len() <= raw.len());
            prop_assert_eq!(smoothed.first(), raw.first());
            prop_assert_eq!(smoothed.last(), raw.last());
            for pair in smoothed.windows(2) {
                prop_assert!(finder.has_walkable_line(pair[0], pair[1]));
            }
        }
    }
}

// =============================================================================
// Line of sight
// =============================================================================

proptest! {
    /// Sight is symmetric on any built grid.
    #[test]
    fn prop_line_of_sight_is_symmetric(
        terrain in arb_terrain(10),
        seed in any::<u64>(),
        block in 0u32..=100,
        a in arb_world_point(320),
        b in arb_world_point(320),
    ) {
        let grid = LineOfSightGrid::build(
            &terrain,
            TILE_SIZE,
            &SightConfig { cell_size: 16, rock_block_percent: block },
            &mut ChaCha8Rng::seed_from_u64(seed),
        );
        prop_assert_eq!(grid.has_line_of_sight(a, b), grid.has_line_of_sight(b, a));
    }

    /// A grid with nothing blocked never occludes.
    #[test]
    fn prop_clear_grid_sees_everything(a in arb_world_point(640), b in arb_world_point(640)) {
        let grid = LineOfSightGrid::clear(20, 20, TILE_SIZE);
        prop_assert!(grid.has_line_of_sight(a, b));
    }
}

// =============================================================================
// Damage
// =============================================================================

proptest! {
    /// The built-in matrix answers every pair with a positive multiplier.
    #[test]
    fn prop_builtin_matrix_is_total(damage_type in arb_damage_type(), armor_type in arb_armor_type()) {
        let matrix = EffectivenessMatrix::builtin();
        let value = matrix.get(damage_type, armor_type);
        prop_assert!(value.is_some_and(|v| v > Fixed::ZERO));
    }

    /// Every resolved hit deals at least one point of damage.
    #[test]
    fn prop_damage_is_at_least_one(
        base in arb_base_damage(),
        damage_type in arb_damage_type(),
        armor_type in arb_armor_type(),
        level in proptest::option::of(0u32..=3),
        seed in any::<u64>(),
    ) {
        let model = DamageModel::default();
        let modifiers = SourceModifiers { damage_multiplier: None, veterancy_level: level };
        let mut variance = SeededVariance::new(seed);
        for _ in 0..8 {
            let damage = model.compute_damage(base, damage_type, armor_type, &modifiers, &mut variance);
            prop_assert!(damage >= 1);
        }
    }

    /// Area damage never increases with distance from the blast.
    #[test]
    fn prop_splash_falls_off_monotonically(
        base in arb_base_damage(),
        d1 in arb_distance_within(60),
        d2 in arb_distance_within(60),
        drop in 0u32..=100,
    ) {
        let radius = fixed(60);
        let (near, far) = if d1 <= d2 { (d1, d2) } else { (d2, d1) };
        let drop = percent(drop);
        prop_assert!(
            splash_damage(base, near, radius, drop) >= splash_damage(base, far, radius, drop)
        );
        prop_assert_eq!(splash_damage(base, Fixed::ZERO, radius, drop), base);
    }
}

// =============================================================================
// Projectiles
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// A projectile aimed at a target damages it exactly once, however long
    /// the resolver keeps ticking.
    #[test]
    fn prop_projectile_hits_once(
        distance in 1i32..400,
        speed in 20i32..600,
        ticks in 1usize..200,
    ) {
        let mut resolver = CombatResolver::new(DamageModel::default(), NoVariance);
        let mut targets = vec![Combatant::new(1, 1, Archetype::Heavy, point(distance, 0))];
        let order = FireOrder::new(
            point(0, 0),
            ProjectileTarget::Entity { id: 1, position: point(distance, 0) },
            1,
            DamageType::Kinetic,
            fixed(speed),
            Fixed::ZERO,
        );
        resolver.submit_projectile(order);

        let mut hits = 0;
        for _ in 0..ticks {
            hits += resolver.tick(tick_dt(), &mut targets).hits.len();
        }
        prop_assert!(hits <= 1);

        // Long enough for any of these flights to land.
        for _ in 0..500 {
            hits += resolver.tick(tick_dt(), &mut targets).hits.len();
        }
        prop_assert_eq!(hits, 1);
        prop_assert!(resolver.projectiles().is_empty());
    }
}
