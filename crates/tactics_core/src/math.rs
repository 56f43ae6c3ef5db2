//! Fixed-point math utilities for deterministic simulation.
//!
//! All tactical math uses fixed-point arithmetic so that path costs,
//! projectile positions and damage rolls come out bit-identical on every
//! platform. Floating-point operations can produce different results on
//! different CPUs.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// `sqrt(2)` truncated to the nearest representable value below it.
pub const SQRT_2: Fixed = Fixed::from_bits(6_074_000_999);

/// Largest integer whose square still fits in [`Fixed`].
const SQRT_UPPER_BOUND: i32 = 46_341;

/// Per-axis span below which `dx^2 + dy^2` cannot overflow [`Fixed`].
const DIRECT_DISTANCE_LIMIT: i32 = 32_768;

/// Build a fixed-point ratio from an integer percentage (`110` -> `1.1`).
#[inline]
#[must_use]
pub fn percent(value: u32) -> Fixed {
    Fixed::from_num(value) / Fixed::from_num(100)
}

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer world coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    ///
    /// Saturates at [`Fixed::MAX`] once the span reaches about 46341 units.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx.saturating_mul(dx).saturating_add(dy.saturating_mul(dy))
    }

    /// Euclidean distance to another point.
    ///
    /// Spans too long for [`distance_squared`](Self::distance_squared) are
    /// measured as `major * sqrt(1 + (minor / major)^2)`, so they never clamp.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        let dx = self.x.saturating_sub(other.x).saturating_abs();
        let dy = self.y.saturating_sub(other.y).saturating_abs();
        let (major, minor) = if dx >= dy { (dx, dy) } else { (dy, dx) };
        if major < Fixed::from_num(DIRECT_DISTANCE_LIMIT) {
            return fixed_sqrt(dx * dx + dy * dy);
        }

        let ratio = minor / major;
        major.saturating_mul(fixed_sqrt(Fixed::ONE + ratio * ratio))
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Computes the square root of a fixed-point number using bisection.
///
/// Returns the largest representable value whose square does not exceed
/// `value`, so results never overshoot the true root.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::ONE {
        value.min(Fixed::from_num(SQRT_UPPER_BOUND))
    } else {
        Fixed::ONE + Fixed::DELTA
    };

    for _ in 0..64 {
        let mid = low + (high - low) / Fixed::from_num(2);
        if mid == low {
            break;
        }

        if mid.saturating_mul(mid) <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

/// Walk the integer cells of the segment between two grid cells.
///
/// Bresenham rasterization, visiting both endpoints. The walk always runs
/// from the lexicographically smaller endpoint, so `a -> b` and `b -> a`
/// visit the same cells. Stops and returns `false` as soon as `visit`
/// returns `false`.
pub fn trace_grid_line<F>(a: (i32, i32), b: (i32, i32), mut visit: F) -> bool
where
    F: FnMut(i32, i32) -> bool,
{
    let ((x0, y0), (x1, y1)) = if a <= b { (a, b) } else { (b, a) };

    let dx = (x1 - x0).abs();
    let dy = (y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx - dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        if !visit(x, y) {
            return false;
        }

        if x == x1 && y == y1 {
            return true;
        }

        let e2 = 2 * err;
        if e2 > -dy {
            err -= dy;
            x += sx;
        }
        if e2 < dx {
            err += dx;
            y += sy;
        }
    }
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec2_distance_squared() {
        let a = Vec2Fixed::from_ints(3, 0);
        let b = Vec2Fixed::from_ints(0, 4);
        assert_eq!(a.distance_squared(b), Fixed::from_num(25));
    }

    #[test]
    fn test_distance_exact_for_pythagorean_triple() {
        let a = Vec2Fixed::from_ints(0, 0);
        let b = Vec2Fixed::from_ints(30, 40);
        assert_eq!(a.distance(b), Fixed::from_num(50));
    }

    #[test]
    fn test_distance_beyond_squared_range() {
        let a = Vec2Fixed::from_ints(0, 0);
        assert_eq!(a.distance(Vec2Fixed::from_ints(100_000, 0)), Fixed::from_num(100_000));

        let far = a.distance(Vec2Fixed::from_ints(300_000, 400_000));
        assert!((far - Fixed::from_num(500_000)).abs() < Fixed::from_num(1), "{far}");

        // Both sides of the switch agree on a diagonal.
        let below = a.distance(Vec2Fixed::from_ints(32_767, 32_767));
        let above = a.distance(Vec2Fixed::from_ints(32_768, 32_768));
        assert!(above > below);
        assert!(above - below < Fixed::from_num(2));
    }

    #[test]
    fn test_fixed_sqrt_never_overshoots() {
        for n in [2, 3, 5, 7, 1000, 123_456, 2_000_000_000] {
            let v = Fixed::from_num(n);
            let root = fixed_sqrt(v);
            assert!(root.saturating_mul(root) <= v, "sqrt({n}) overshoots");
            let next = root + Fixed::DELTA;
            assert!(next.saturating_mul(next) > v, "sqrt({n}) not tight");
        }
        assert_eq!(fixed_sqrt(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(fixed_sqrt(Fixed::from_num(-4)), Fixed::ZERO);
    }

    #[test]
    fn test_sqrt_2_constant() {
        let sq = SQRT_2 * SQRT_2;
        assert!(sq <= Fixed::from_num(2));
        assert!(Fixed::from_num(2) - sq < Fixed::from_num(0.000_001));
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(150), Fixed::from_num(1.5));
        assert_eq!(percent(100), Fixed::ONE);
    }

    #[test]
    fn test_vec2_lerp() {
        let a = Vec2Fixed::from_ints(0, 0);
        let b = Vec2Fixed::from_ints(10, 20);
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec2Fixed::from_ints(5, 10));
    }

    #[test]
    fn test_trace_grid_line_visits_endpoints() {
        let mut cells = Vec::new();
        trace_grid_line((0, 0), (3, 0), |x, y| {
            cells.push((x, y));
            true
        });
        assert_eq!(cells, vec![(0, 0), (1, 0), (2, 0), (3, 0)]);
    }

    #[test]
    fn test_trace_grid_line_is_symmetric() {
        let collect = |a, b| {
            let mut cells = Vec::new();
            trace_grid_line(a, b, |x, y| {
                cells.push((x, y));
                true
            });
            cells
        };
        assert_eq!(collect((0, 0), (7, 3)), collect((7, 3), (0, 0)));
        assert_eq!(collect((2, 9), (5, -4)), collect((5, -4), (2, 9)));
    }

    #[test]
    fn test_trace_grid_line_stops_early() {
        let mut visited = 0;
        let clear = trace_grid_line((0, 0), (5, 5), |x, _| {
            visited += 1;
            x < 2
        });
        assert!(!clear);
        assert_eq!(visited, 3);
    }
}
