//! Line-of-sight occlusion grid.
//!
//! A coarse boolean grid built once from terrain. Each occlusion cell looks at
//! the terrain tile under its top-left corner; only rock may block, and only a
//! seeded random subset of rock cells actually do. Queries rasterize the
//! segment between two world points in cell space and fail on the first
//! blocked cell.
//!
//! Sight blocking is rolled independently of rock walkability, so a rock a unit
//! cannot walk through may still be seen past, and vice versa.

use rand::Rng;

use crate::config::SightConfig;
use crate::math::{trace_grid_line, Fixed, Vec2Fixed};
use crate::terrain::{GridCoord, TerrainMap};

/// Immutable occlusion grid for weapon sight checks.
///
/// The default value is an unbuilt grid, which reports every line as clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineOfSightGrid {
    cell_size: Fixed,
    width: u32,
    height: u32,
    /// Row-major blocked flags.
    blocked: Vec<bool>,
}

impl LineOfSightGrid {
    /// Build the occlusion grid for a fully populated terrain map.
    ///
    /// The grid covers `ceil(map_world_size / cell_size)` cells on each axis.
    /// Rock cells block with probability `rock_block_percent`, decided here
    /// and never re-rolled.
    ///
    /// # Panics
    ///
    /// Panics if `tile_size` or `config.cell_size` is zero.
    #[must_use]
    pub fn build<R: Rng + ?Sized>(
        terrain: &TerrainMap,
        tile_size: u32,
        config: &SightConfig,
        rng: &mut R,
    ) -> Self {
        assert!(tile_size > 0, "tile_size must be positive");
        assert!(config.cell_size > 0, "cell_size must be positive");

        let cell_size = config.cell_size;
        let map_width = u64::from(terrain.width()) * u64::from(tile_size);
        let map_height = u64::from(terrain.height()) * u64::from(tile_size);
        let width = map_width.div_ceil(u64::from(cell_size)) as u32;
        let height = map_height.div_ceil(u64::from(cell_size)) as u32;

        let mut blocked = Vec::with_capacity((width as usize) * (height as usize));
        for cy in 0..height {
            for cx in 0..width {
                let tile = GridCoord::new(
                    (u64::from(cx) * u64::from(cell_size) / u64::from(tile_size)) as i32,
                    (u64::from(cy) * u64::from(cell_size) / u64::from(tile_size)) as i32,
                );
                let occludes = terrain
                    .tile(tile)
                    .is_some_and(|t| t.kind.can_block_sight())
                    && rng.gen_range(0..100) < config.rock_block_percent;
                blocked.push(occludes);
            }
        }

        let grid = Self {
            cell_size: Fixed::from_num(cell_size),
            width,
            height,
            blocked,
        };
        tracing::debug!(
            width,
            height,
            blocked = grid.blocked_count(),
            "Line-of-sight grid built"
        );
        grid
    }

    /// An all-clear grid of the given cell dimensions.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is zero.
    #[must_use]
    pub fn clear(width: u32, height: u32, cell_size: u32) -> Self {
        assert!(cell_size > 0, "cell_size must be positive");
        Self {
            cell_size: Fixed::from_num(cell_size),
            width,
            height,
            blocked: vec![false; (width as usize) * (height as usize)],
        }
    }

    /// Whether the grid has been built. Unbuilt grids are fail-open.
    #[must_use]
    pub fn is_built(&self) -> bool {
        !self.blocked.is_empty()
    }

    /// Grid dimensions in cells.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// World units per occlusion cell.
    #[must_use]
    pub const fn cell_size(&self) -> Fixed {
        self.cell_size
    }

    fn index(&self, cx: i32, cy: i32) -> Option<usize> {
        (cx >= 0 && cy >= 0 && (cx as u32) < self.width && (cy as u32) < self.height)
            .then(|| (cy as usize) * (self.width as usize) + (cx as usize))
    }

    /// Whether a cell blocks sight. Cells off the grid never block.
    #[must_use]
    pub fn is_blocked(&self, cx: i32, cy: i32) -> bool {
        self.index(cx, cy).is_some_and(|i| self.blocked[i])
    }

    /// Override one cell. Returns `false` if the cell is off the grid.
    pub fn set_blocked(&mut self, cx: i32, cy: i32, blocked: bool) -> bool {
        match self.index(cx, cy) {
            Some(i) => {
                self.blocked[i] = blocked;
                true
            }
            None => false,
        }
    }

    /// Number of blocking cells.
    #[must_use]
    pub fn blocked_count(&self) -> usize {
        self.blocked.iter().filter(|b| **b).count()
    }

    /// Occlusion cell containing a world point.
    #[must_use]
    pub fn world_to_cell(&self, pos: Vec2Fixed) -> (i32, i32) {
        (
            (pos.x / self.cell_size).floor().to_num::<i32>(),
            (pos.y / self.cell_size).floor().to_num::<i32>(),
        )
    }

    /// Check for clear sight between two world points.
    ///
    /// Symmetric: swapping the endpoints gives the same answer.
    #[must_use]
    pub fn has_line_of_sight(&self, from: Vec2Fixed, to: Vec2Fixed) -> bool {
        if !self.is_built() {
            return true;
        }

        let start = self.world_to_cell(from);
        let end = self.world_to_cell(to);
        trace_grid_line(start, end, |cx, cy| !self.is_blocked(cx, cy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terrain::TileKind;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn sight(cell_size: u32, rock_block_percent: u32) -> SightConfig {
        SightConfig {
            cell_size,
            rock_block_percent,
        }
    }

    #[test]
    fn test_dimensions_round_up() {
        let terrain = TerrainMap::filled(10, 7, TileKind::Sand);
        let mut rng = ChaCha8Rng::seed_from_u64(0);

        let grid = LineOfSightGrid::build(&terrain, 32, &sight(32, 30), &mut rng);
        assert_eq!(grid.dimensions(), (10, 7));

        let grid = LineOfSightGrid::build(&terrain, 32, &sight(48, 30), &mut rng);
        // 320 / 48 = 6.67, 224 / 48 = 4.67
        assert_eq!(grid.dimensions(), (7, 5));
    }

    #[test]
    fn test_only_rock_blocks() {
        let terrain = TerrainMap::filled(8, 8, TileKind::Dune);
        let grid = LineOfSightGrid::build(
            &terrain,
            32,
            &sight(32, 100),
            &mut ChaCha8Rng::seed_from_u64(3),
        );
        assert_eq!(grid.blocked_count(), 0);

        let rock = TerrainMap::filled(8, 8, TileKind::Rock);
        let grid =
            LineOfSightGrid::build(&rock, 32, &sight(32, 100), &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(grid.blocked_count(), 64);
    }

    #[test]
    fn test_build_is_seeded() {
        let terrain = TerrainMap::filled(16, 16, TileKind::Rock);
        let a = LineOfSightGrid::build(&terrain, 32, &sight(32, 30), &mut ChaCha8Rng::seed_from_u64(9));
        let b = LineOfSightGrid::build(&terrain, 32, &sight(32, 30), &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
        assert!(a.blocked_count() > 0 && a.blocked_count() < 256);
    }

    #[test]
    fn test_unbuilt_grid_is_fail_open() {
        let grid = LineOfSightGrid::default();
        assert!(!grid.is_built());
        assert!(grid.has_line_of_sight(Vec2Fixed::from_ints(0, 0), Vec2Fixed::from_ints(999, 999)));
    }

    #[test]
    fn test_blocked_cell_breaks_sight() {
        let mut grid = LineOfSightGrid::clear(10, 10, 32);
        let a = Vec2Fixed::from_ints(16, 160);
        let b = Vec2Fixed::from_ints(300, 160);
        assert!(grid.has_line_of_sight(a, b));

        assert!(grid.set_blocked(5, 5, true));
        assert!(!grid.has_line_of_sight(a, b));
        assert!(!grid.has_line_of_sight(b, a));

        // A parallel line one row up is unaffected.
        assert!(grid.has_line_of_sight(Vec2Fixed::from_ints(16, 130), Vec2Fixed::from_ints(300, 130)));
    }

    #[test]
    fn test_off_grid_cells_do_not_block() {
        let grid = LineOfSightGrid::clear(4, 4, 32);
        assert!(!grid.is_blocked(-1, 0));
        assert!(!grid.is_blocked(4, 4));
        assert!(grid.has_line_of_sight(Vec2Fixed::from_ints(-100, -100), Vec2Fixed::from_ints(500, 20)));
    }

    #[test]
    fn test_set_blocked_out_of_range() {
        let mut grid = LineOfSightGrid::clear(2, 2, 32);
        assert!(!grid.set_blocked(2, 0, true));
        assert_eq!(grid.blocked_count(), 0);
    }
}
