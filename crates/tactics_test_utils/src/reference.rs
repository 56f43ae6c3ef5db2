//! Brute-force reference search.
//!
//! A plain Dijkstra over the same move-cost rule the pathfinder uses. Slow and
//! obviously correct, for checking A* optimality on small grids.

use std::collections::{BTreeSet, HashMap};

use tactics_core::math::Fixed;
use tactics_core::pathfinding::PathFinder;
use tactics_core::terrain::GridCoord;

/// Minimum total cost from `start` to `goal`, or `None` if unreachable.
///
/// Uses an ordered set as the frontier so ties resolve by coordinate.
#[must_use]
pub fn dijkstra_cost(finder: &PathFinder<'_>, start: GridCoord, goal: GridCoord) -> Option<Fixed> {
    if start == goal {
        return Some(Fixed::ZERO);
    }

    let terrain = finder.terrain();
    let mut dist: HashMap<GridCoord, Fixed> = HashMap::new();
    let mut frontier: BTreeSet<(Fixed, GridCoord)> = BTreeSet::new();

    dist.insert(start, Fixed::ZERO);
    frontier.insert((Fixed::ZERO, start));

    while let Some((cost, current)) = frontier.pop_first() {
        if current == goal {
            return Some(cost);
        }
        if dist.get(&current).is_some_and(|&best| cost > best) {
            continue;
        }

        for dy in -1..=1 {
            for dx in -1..=1 {
                let next = GridCoord::new(current.x + dx, current.y + dy);
                if !terrain.in_bounds(next) {
                    continue;
                }
                let Some(step) = finder.move_cost(current, next) else {
                    continue;
                };
                let candidate = cost + step;
                if dist.get(&next).map_or(true, |&best| candidate < best) {
                    dist.insert(next, candidate);
                    frontier.insert((candidate, next));
                }
            }
        }
    }

    None
}
