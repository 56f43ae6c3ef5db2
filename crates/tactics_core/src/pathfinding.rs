//! Grid-based pathfinding using the A* algorithm.
//!
//! Searches the terrain grid with 8-directional movement. Entering a tile
//! costs `1` orthogonally or `sqrt(2)` diagonally, scaled by the tile's
//! terrain cost factor. All calculations use fixed-point math for
//! deterministic results across different platforms and clients.
//!
//! Paths are returned in world space and exclude the start tile: the first
//! waypoint is the first tile to move into.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use crate::error::{GameError, Result};
use crate::math::{trace_grid_line, Fixed, Vec2Fixed, SQRT_2};
use crate::terrain::{GridCoord, TerrainMap};

/// Ordered world-space waypoints, excluding the starting tile.
///
/// An empty path means "nothing to do".
pub type Path = Vec<Vec2Fixed>;

/// A node in the A* open set priority queue.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
struct AStarNode {
    coord: GridCoord,
    /// Cost from the start when this entry was pushed.
    g_score: Fixed,
    /// g_score + heuristic.
    f_score: Fixed,
    /// Insertion counter; earlier entries win f_score ties.
    sequence: u64,
}

impl Ord for AStarNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so reverse both keys for min-heap behavior.
        match other.f_score.cmp(&self.f_score) {
            Ordering::Equal => other.sequence.cmp(&self.sequence),
            ord => ord,
        }
    }
}

impl PartialOrd for AStarNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Direction offsets for 8-directional movement.
const DIRECTIONS: [(i32, i32); 8] = [
    (1, 0),   // East
    (1, 1),   // Southeast
    (0, 1),   // South
    (-1, 1),  // Southwest
    (-1, 0),  // West
    (-1, -1), // Northwest
    (0, -1),  // North
    (1, -1),  // Northeast
];

/// Octile distance between two tiles.
///
/// `max(dx, dy) + (sqrt(2) - 1) * min(dx, dy)`: the exact cost of an
/// unobstructed 8-directional walk over unit-cost terrain.
#[must_use]
pub fn octile_distance(a: GridCoord, b: GridCoord) -> Fixed {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    Fixed::from_num(dx.max(dy)) + (SQRT_2 - Fixed::ONE) * Fixed::from_num(dx.min(dy))
}

/// A* pathfinder over a borrowed terrain map.
///
/// Never mutates the terrain. Each query allocates its own search state,
/// so a single `PathFinder` can serve any number of sequential requests.
#[derive(Debug, Clone, Copy)]
pub struct PathFinder<'a> {
    terrain: &'a TerrainMap,
    tile_size: Fixed,
    heuristic_scale: Fixed,
}

impl<'a> PathFinder<'a> {
    /// Create a pathfinder for a fully populated terrain map.
    ///
    /// # Panics
    ///
    /// Panics if `tile_size` is not positive.
    #[must_use]
    pub fn new(terrain: &'a TerrainMap, tile_size: Fixed) -> Self {
        assert!(tile_size > Fixed::ZERO, "tile_size must be positive");

        Self {
            terrain,
            tile_size,
            heuristic_scale: crate::terrain::TileKind::cheapest_factor(),
        }
    }

    /// The terrain this pathfinder reads.
    #[must_use]
    pub const fn terrain(&self) -> &'a TerrainMap {
        self.terrain
    }

    /// World units per tile.
    #[must_use]
    pub const fn tile_size(&self) -> Fixed {
        self.tile_size
    }

    /// Convert a tile coordinate to world space (`grid * tile_size`).
    #[must_use]
    pub fn grid_to_world(&self, coord: GridCoord) -> Vec2Fixed {
        Vec2Fixed::new(
            Fixed::from_num(coord.x) * self.tile_size,
            Fixed::from_num(coord.y) * self.tile_size,
        )
    }

    /// Convert a world position to the tile containing it.
    ///
    /// Returns `None` if the position is outside the map.
    #[must_use]
    pub fn world_to_grid(&self, pos: Vec2Fixed) -> Option<GridCoord> {
        let coord = GridCoord::new(
            (pos.x / self.tile_size).floor().to_num::<i32>(),
            (pos.y / self.tile_size).floor().to_num::<i32>(),
        );
        self.terrain.in_bounds(coord).then_some(coord)
    }

    /// Cost of stepping from `from` into the adjacent tile `to`.
    ///
    /// `None` if `to` is blocked, off the map, or not adjacent.
    #[must_use]
    pub fn move_cost(&self, from: GridCoord, to: GridCoord) -> Option<Fixed> {
        if !from.is_adjacent(to) {
            return None;
        }
        let factor = self.terrain.cost_factor(to)?;
        Some(if from.is_diagonal_to(to) {
            SQRT_2 * factor
        } else {
            factor
        })
    }

    /// Find the cheapest route from `start` to `end`.
    ///
    /// Returns `Ok` with an empty path when `start == end` or when either
    /// coordinate is off the map. Returns [`GameError::PathNotFound`] when the
    /// goal cannot be reached.
    pub fn find_path(&self, start: GridCoord, end: GridCoord) -> Result<Path> {
        let tiles = self.find_tile_path(start, end)?;
        Ok(tiles.into_iter().map(|c| self.grid_to_world(c)).collect())
    }

    /// Like [`find_path`](Self::find_path), returning tile coordinates.
    pub fn find_tile_path(&self, start: GridCoord, end: GridCoord) -> Result<Vec<GridCoord>> {
        if start == end || !self.terrain.in_bounds(start) || !self.terrain.in_bounds(end) {
            return Ok(Vec::new());
        }

        let path = self.search(start, end)?;
        tracing::debug!(%start, %end, waypoints = path.len(), "Path found");
        Ok(path)
    }

    /// Find a route, falling back to a single waypoint at the destination.
    ///
    /// When the goal is unreachable this returns `[end]` in world space, which
    /// may cross unwalkable terrain. Prefer [`find_path`](Self::find_path)
    /// when the caller can react to an unreachable goal.
    #[must_use]
    pub fn find_path_or_direct(&self, start: GridCoord, end: GridCoord) -> Path {
        match self.find_path(start, end) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(%start, %end, %err, "Falling back to direct waypoint");
                vec![self.grid_to_world(end)]
            }
        }
    }

    /// Find a route and remove waypoints that a straight walk makes redundant.
    pub fn find_smoothed_path(&self, start: GridCoord, end: GridCoord) -> Result<Path> {
        let path = self.find_path(start, end)?;
        Ok(self.smooth_path(&path))
    }

    /// Internal A* implementation working on grid coordinates.
    fn search(&self, start: GridCoord, goal: GridCoord) -> Result<Vec<GridCoord>> {
        let mut open_set: BinaryHeap<AStarNode> = BinaryHeap::new();
        let mut came_from: HashMap<GridCoord, GridCoord> = HashMap::new();
        let mut g_score: HashMap<GridCoord, Fixed> = HashMap::new();
        let mut sequence = 0u64;

        g_score.insert(start, Fixed::ZERO);
        open_set.push(AStarNode {
            coord: start,
            g_score: Fixed::ZERO,
            f_score: self.heuristic(start, goal),
            sequence,
        });

        while let Some(current) = open_set.pop() {
            // Goal test on pop, not on discovery
            if current.coord == goal {
                return Ok(reconstruct_path(&came_from, start, goal));
            }

            let best_g = g_score.get(&current.coord).copied().unwrap_or(Fixed::MAX);
            if current.g_score > best_g {
                // Stale entry superseded by a cheaper push
                continue;
            }

            for &(dx, dy) in &DIRECTIONS {
                let neighbor = GridCoord::new(current.coord.x + dx, current.coord.y + dy);

                let Some(move_cost) = self.move_cost(current.coord, neighbor) else {
                    continue;
                };

                let tentative_g = current.g_score + move_cost;
                let neighbor_g = g_score.get(&neighbor).copied().unwrap_or(Fixed::MAX);

                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.coord);
                    g_score.insert(neighbor, tentative_g);

                    sequence += 1;
                    open_set.push(AStarNode {
                        coord: neighbor,
                        g_score: tentative_g,
                        f_score: tentative_g + self.heuristic(neighbor, goal),
                        sequence,
                    });
                }
            }
        }

        Err(GameError::PathNotFound { start, end: goal })
    }

    #[inline]
    fn heuristic(&self, from: GridCoord, goal: GridCoord) -> Fixed {
        octile_distance(from, goal) * self.heuristic_scale
    }

    /// Smooth a path by removing waypoints a straight walk can skip.
    ///
    /// Walks the path keeping an anchor (the last retained waypoint). A
    /// waypoint is dropped when every tile on the straight line from the
    /// anchor to the following waypoint is walkable. The first and last
    /// waypoints are always retained, and each retained pair is connected by
    /// a walkable straight line.
    #[must_use]
    pub fn smooth_path(&self, path: &[Vec2Fixed]) -> Path {
        if path.len() <= 2 {
            return path.to_vec();
        }

        let mut smoothed = Vec::with_capacity(path.len());
        let mut anchor = path[0];
        smoothed.push(anchor);

        for window in path.windows(2).skip(1) {
            let (candidate, next) = (window[0], window[1]);
            if !self.has_walkable_line(anchor, next) {
                smoothed.push(candidate);
                anchor = candidate;
            }
        }

        if let Some(&last) = path.last() {
            smoothed.push(last);
        }

        tracing::trace!(before = path.len(), after = smoothed.len(), "Smoothed path");
        smoothed
    }

    /// Check that every tile on the straight line between two world points
    /// is walkable.
    ///
    /// Uses the terrain's walkability, not the sight occlusion grid.
    #[must_use]
    pub fn has_walkable_line(&self, from: Vec2Fixed, to: Vec2Fixed) -> bool {
        let (Some(a), Some(b)) = (self.world_to_grid(from), self.world_to_grid(to)) else {
            return false;
        };
        self.has_walkable_tile_line(a, b)
    }

    /// Tile-space variant of [`has_walkable_line`](Self::has_walkable_line).
    #[must_use]
    pub fn has_walkable_tile_line(&self, a: GridCoord, b: GridCoord) -> bool {
        trace_grid_line((a.x, a.y), (b.x, b.y), |x, y| {
            self.terrain.is_walkable(GridCoord::new(x, y))
        })
    }

    /// Total movement cost of walking `path` starting from `start`.
    ///
    /// Every step must be between adjacent, walkable tiles; otherwise
    /// returns `None`. An empty path costs zero.
    #[must_use]
    pub fn path_cost(&self, start: GridCoord, path: &[Vec2Fixed]) -> Option<Fixed> {
        let mut total = Fixed::ZERO;
        let mut current = start;
        for &waypoint in path {
            let next = self.world_to_grid(waypoint)?;
            total += self.move_cost(current, next)?;
            current = next;
        }
        Some(total)
    }
}

/// Walk `came_from` back from the goal, then drop the start tile.
fn reconstruct_path(
    came_from: &HashMap<GridCoord, GridCoord>,
    start: GridCoord,
    goal: GridCoord,
) -> Vec<GridCoord> {
    let mut path = vec![goal];
    let mut current = goal;

    while let Some(&prev) = came_from.get(&current) {
        if prev == start {
            break;
        }
        path.push(prev);
        current = prev;
    }

    path.reverse();
    path
}
