//! Terrain cost model: a read-only tile view for pathfinding and sight.
//!
//! Tiles are produced by an external terrain generator. The core only reads
//! them: each tile yields a walkability flag and a movement-cost factor that
//! scales the cost of entering it.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{percent, Fixed};

/// Integer tile coordinate in grid space.
///
/// Signed so that callers can express off-map requests; those are rejected
/// by bounds checks rather than wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct GridCoord {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
}

impl GridCoord {
    /// Create a new grid coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Chebyshev adjacency (the eight surrounding tiles).
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self != other && self.x.abs_diff(other.x) <= 1 && self.y.abs_diff(other.y) <= 1
    }

    /// True when `other` differs on both axes.
    #[must_use]
    pub fn is_diagonal_to(self, other: Self) -> bool {
        self.x != other.x && self.y != other.y
    }
}

impl fmt::Display for GridCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Desert terrain classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TileKind {
    /// Open sand, baseline cost.
    #[default]
    Sand,
    /// Darker, looser sand.
    DarkSand,
    /// Dunes, hard to climb.
    Dune,
    /// Compacted flat ground.
    HardPan,
    /// Rock formations. Some are impassable, some block sight.
    Rock,
    /// Spice fields, packed and easy to cross.
    Spice,
}

impl TileKind {
    /// Every tile kind, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Sand,
        Self::DarkSand,
        Self::Dune,
        Self::HardPan,
        Self::Rock,
        Self::Spice,
    ];

    /// Cost percentage for entering a tile of this kind.
    #[must_use]
    pub const fn cost_percent(self) -> u32 {
        match self {
            Self::Sand => 100,
            Self::DarkSand => 110,
            Self::Dune => 130,
            Self::HardPan => 100,
            Self::Rock => 150,
            Self::Spice => 90,
        }
    }

    /// Movement cost multiplier for entering a tile of this kind.
    #[must_use]
    pub fn cost_factor(self) -> Fixed {
        percent(self.cost_percent())
    }

    /// The smallest cost factor of any tile kind.
    ///
    /// Scaling the search heuristic by this keeps it admissible even though
    /// spice is cheaper than open sand.
    #[must_use]
    pub fn cheapest_factor() -> Fixed {
        let min = Self::ALL
            .iter()
            .map(|kind| kind.cost_percent())
            .min()
            .unwrap_or(100);
        percent(min)
    }

    /// Whether tiles of this kind may occlude sight.
    #[must_use]
    pub const fn can_block_sight(self) -> bool {
        matches!(self, Self::Rock)
    }

    /// Parse a single map glyph.
    ///
    /// `.` sand, `:` dark sand, `~` dune, `=` hard pan, `r` rock,
    /// `#` impassable rock, `$` spice. Returns the kind and its walkability.
    #[must_use]
    pub const fn from_glyph(glyph: char) -> Option<(Self, bool)> {
        match glyph {
            '.' => Some((Self::Sand, true)),
            ':' => Some((Self::DarkSand, true)),
            '~' => Some((Self::Dune, true)),
            '=' => Some((Self::HardPan, true)),
            'r' => Some((Self::Rock, true)),
            '#' => Some((Self::Rock, false)),
            '$' => Some((Self::Spice, true)),
            _ => None,
        }
    }
}

/// A single terrain tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tile {
    /// Terrain class.
    pub kind: TileKind,
    /// Whether ground units may enter the tile.
    pub walkable: bool,
}

impl Tile {
    /// Create a tile with explicit walkability.
    #[must_use]
    pub const fn new(kind: TileKind, walkable: bool) -> Self {
        Self { kind, walkable }
    }

    /// Create a walkable tile.
    #[must_use]
    pub const fn open(kind: TileKind) -> Self {
        Self::new(kind, true)
    }

    /// Movement cost multiplier of this tile.
    #[must_use]
    pub fn base_cost(&self) -> Fixed {
        self.kind.cost_factor()
    }
}

/// Debug record describing one tile as seen by the pathfinder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileInfo {
    /// Terrain class.
    pub kind: TileKind,
    /// Walkability flag.
    pub walkable: bool,
    /// Cost factor, `None` if the tile cannot be entered.
    pub cost: Option<Fixed>,
}

/// Tile grid owned by the terrain generator.
///
/// Row-major storage. Pathfinding and sight only ever hold shared references.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainMap {
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
}

impl TerrainMap {
    /// Create a map filled with walkable tiles of one kind.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is zero.
    #[must_use]
    pub fn filled(width: u32, height: u32, kind: TileKind) -> Self {
        assert!(width > 0, "TerrainMap width must be positive");
        assert!(height > 0, "TerrainMap height must be positive");

        Self {
            width,
            height,
            tiles: vec![Tile::open(kind); (width as usize) * (height as usize)],
        }
    }

    /// Wrap fully populated tile data in row-major order.
    pub fn from_tiles(width: u32, height: u32, tiles: Vec<Tile>) -> Result<Self> {
        let expected = (width as usize) * (height as usize);
        if expected == 0 || tiles.len() != expected {
            return Err(GameError::TerrainSizeMismatch {
                expected,
                actual: tiles.len(),
            });
        }

        Ok(Self {
            width,
            height,
            tiles,
        })
    }

    /// Parse a map from glyph rows (see [`TileKind::from_glyph`]).
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.as_ref().chars().count());
        let mut tiles = Vec::with_capacity(width * height);

        for (y, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != width {
                return Err(GameError::InvalidConfig(format!(
                    "map row {y} has {} tiles, expected {width}",
                    row.chars().count()
                )));
            }
            for glyph in row.chars() {
                let (kind, walkable) = TileKind::from_glyph(glyph).ok_or_else(|| {
                    GameError::InvalidConfig(format!("unknown map glyph '{glyph}' in row {y}"))
                })?;
                tiles.push(Tile::new(kind, walkable));
            }
        }

        Self::from_tiles(width as u32, height as u32, tiles)
    }

    /// Map width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Map height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Check if a coordinate lies on the map.
    #[must_use]
    pub fn in_bounds(&self, coord: GridCoord) -> bool {
        coord.x >= 0
            && coord.y >= 0
            && (coord.x as u32) < self.width
            && (coord.y as u32) < self.height
    }

    #[inline]
    fn index(&self, coord: GridCoord) -> Option<usize> {
        self.in_bounds(coord)
            .then(|| (coord.y as usize) * (self.width as usize) + (coord.x as usize))
    }

    /// Tile at a coordinate, `None` when off the map.
    #[must_use]
    pub fn tile(&self, coord: GridCoord) -> Option<&Tile> {
        self.index(coord).map(|i| &self.tiles[i])
    }

    /// Replace a tile. Returns `false` if out of bounds.
    pub fn set_tile(&mut self, coord: GridCoord, tile: Tile) -> bool {
        match self.index(coord) {
            Some(i) => {
                self.tiles[i] = tile;
                true
            }
            None => false,
        }
    }

    /// Check if a coordinate is on the map and walkable.
    #[must_use]
    pub fn is_walkable(&self, coord: GridCoord) -> bool {
        self.tile(coord).is_some_and(|t| t.walkable)
    }

    /// Cost factor for entering a tile. `None` for blocked or off-map tiles.
    #[must_use]
    pub fn cost_factor(&self, coord: GridCoord) -> Option<Fixed> {
        self.tile(coord)
            .filter(|t| t.walkable)
            .map(Tile::base_cost)
    }

    /// Pathfinding view of one tile.
    #[must_use]
    pub fn tile_info(&self, coord: GridCoord) -> Option<TileInfo> {
        self.tile(coord).map(|t| TileInfo {
            kind: t.kind,
            walkable: t.walkable,
            cost: t.walkable.then(|| t.base_cost()),
        })
    }

    /// Decide once, per rock tile, whether it can be walked through.
    ///
    /// Each walkable rock tile stays passable with probability
    /// `passable_percent`; rock already marked impassable is left alone. The
    /// result is stored on the tile, so every later query sees the same
    /// answer. Returns the number of rock tiles made impassable.
    pub fn roll_rock_passability<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        passable_percent: u32,
    ) -> usize {
        let mut blocked = 0;
        for tile in self
            .tiles
            .iter_mut()
            .filter(|t| t.kind == TileKind::Rock && t.walkable)
        {
            tile.walkable = rng.gen_range(0..100) < passable_percent;
            if !tile.walkable {
                blocked += 1;
            }
        }

        tracing::debug!(blocked, passable_percent, "Rolled rock passability");
        blocked
    }

    /// Iterate over `(coord, tile)` pairs in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (GridCoord, &Tile)> {
        let width = self.width as usize;
        self.tiles
            .iter()
            .enumerate()
            .map(move |(i, t)| (GridCoord::new((i % width) as i32, (i / width) as i32), t))
    }
}
