//! Presentational combat telemetry: explosions, damage numbers, running stats.
//!
//! None of this feeds back into the simulation. Renderers poll snapshots of
//! these collections once per frame; the resolver ages and expires them every
//! tick.

use serde::Serialize;

use crate::config::CombatConfig;
use crate::damage::PresentationHint;
use crate::math::{percent, Fixed, Vec2Fixed};

/// Durations and motion of telemetry effects, in seconds and world units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EffectTimings {
    /// Explosion lifetime.
    pub explosion_duration: Fixed,
    /// Fraction of the lifetime spent growing to full radius.
    pub explosion_growth: Fixed,
    /// Damage number lifetime.
    pub damage_number_duration: Fixed,
    /// Upward drift of damage numbers per second.
    pub damage_number_rise_speed: Fixed,
    /// Full width of the horizontal jitter band for damage numbers.
    pub damage_number_jitter: Fixed,
    /// Post-hit decay of a spent projectile.
    pub projectile_decay: Fixed,
}

/// Convert milliseconds to fixed-point seconds.
fn seconds(ms: u32) -> Fixed {
    Fixed::from_num(ms) / Fixed::from_num(1000)
}

impl EffectTimings {
    /// Timings from combat configuration.
    #[must_use]
    pub fn from_config(config: &CombatConfig) -> Self {
        Self {
            explosion_duration: seconds(config.explosion_duration_ms),
            explosion_growth: percent(config.explosion_growth_percent),
            damage_number_duration: seconds(config.damage_number_duration_ms),
            damage_number_rise_speed: Fixed::from_num(config.damage_number_rise_speed),
            damage_number_jitter: Fixed::from_num(config.damage_number_jitter),
            projectile_decay: seconds(config.projectile_decay_ms),
        }
    }
}

impl Default for EffectTimings {
    fn default() -> Self {
        Self::from_config(&CombatConfig::default())
    }
}

/// Expanding, fading blast visual.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Explosion {
    /// Blast centre.
    pub position: Vec2Fixed,
    /// Radius reached after the growth phase.
    pub max_radius: Fixed,
    /// Current drawn radius.
    pub radius: Fixed,
    /// Current brightness in `[0, 1]`.
    pub intensity: Fixed,
    /// Display colour.
    pub color: &'static str,
    elapsed: Fixed,
    duration: Fixed,
    growth: Fixed,
}

impl Explosion {
    /// Create an explosion at zero radius and full intensity.
    #[must_use]
    pub fn new(position: Vec2Fixed, max_radius: Fixed, color: &'static str, timings: &EffectTimings) -> Self {
        Self {
            position,
            max_radius,
            radius: Fixed::ZERO,
            intensity: Fixed::ONE,
            color,
            elapsed: Fixed::ZERO,
            duration: timings.explosion_duration,
            growth: timings.explosion_growth,
        }
    }

    /// Lifetime progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        if self.duration <= Fixed::ZERO {
            Fixed::ONE
        } else {
            (self.elapsed / self.duration).min(Fixed::ONE)
        }
    }

    /// Age the explosion. Returns `false` once it has expired.
    pub fn update(&mut self, dt: Fixed) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        let progress = self.progress();
        if progress >= Fixed::ONE {
            return false;
        }

        if progress < self.growth {
            self.radius = self.max_radius * (progress / self.growth);
            self.intensity = Fixed::ONE;
        } else {
            self.radius = self.max_radius;
            self.intensity = Fixed::ONE - (progress - self.growth) / (Fixed::ONE - self.growth);
        }
        true
    }
}

/// Floating damage number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageNumber {
    /// Current position. Rises over time.
    pub position: Vec2Fixed,
    /// Damage shown.
    pub amount: u32,
    /// Severity classification, which decides the colour.
    pub hint: PresentationHint,
    /// Current opacity in `[0, 1]`.
    pub opacity: Fixed,
    elapsed: Fixed,
    duration: Fixed,
    rise_speed: Fixed,
}

impl DamageNumber {
    /// Create a damage number. `jitter` in `[-1, 1]` shifts it horizontally.
    #[must_use]
    pub fn new(
        position: Vec2Fixed,
        amount: u32,
        hint: PresentationHint,
        jitter: Fixed,
        timings: &EffectTimings,
    ) -> Self {
        let offset = jitter * timings.damage_number_jitter / Fixed::from_num(2);
        Self {
            position: Vec2Fixed::new(position.x + offset, position.y),
            amount,
            hint,
            opacity: Fixed::ONE,
            elapsed: Fixed::ZERO,
            duration: timings.damage_number_duration,
            rise_speed: timings.damage_number_rise_speed,
        }
    }

    /// Display colour.
    #[must_use]
    pub const fn color(&self) -> &'static str {
        self.hint.color()
    }

    /// Age the number. Returns `false` once it has expired.
    pub fn update(&mut self, dt: Fixed) -> bool {
        self.elapsed = self.elapsed.saturating_add(dt);
        let progress = if self.duration <= Fixed::ZERO {
            Fixed::ONE
        } else {
            self.elapsed / self.duration
        };
        if progress >= Fixed::ONE {
            return false;
        }

        self.position.y -= self.rise_speed * dt;
        self.opacity = Fixed::ONE - progress;
        true
    }
}

/// Running combat totals plus current collection sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CombatStats {
    /// Projectiles submitted since creation.
    pub projectiles_fired: u64,
    /// Explosions created since creation.
    pub explosions_created: u64,
    /// Sum of all applied damage.
    pub total_damage_dealt: u64,
    /// Projectiles currently tracked (in flight or decaying).
    pub active_projectiles: usize,
    /// Explosions currently visible.
    pub active_explosions: usize,
    /// Damage numbers currently visible.
    pub active_damage_numbers: usize,
}
