//! Projectiles: fire orders, presets and per-projectile ballistics.
//!
//! A projectile flies in a straight line from its origin to a fixed aim
//! point. Its position is the linear interpolation of origin and aim point by
//! `elapsed / travel_time`, where the travel time is fixed at launch.
//!
//! Lifecycle: `InFlight -> Hit -> Decaying -> Removed`. The hit transition
//! happens at most once; the resolver applies damage only when it wins that
//! transition.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::combatant::{EntityId, TeamId};
use crate::damage::{DamageType, SourceModifiers};
use crate::math::{Fixed, Vec2Fixed};

/// Stable identifier of a projectile within one resolver.
pub type ProjectileId = u64;

/// Trail length for projectiles fired without a preset.
const DEFAULT_TRAIL_LENGTH: usize = 6;

/// Projectile presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectileKind {
    /// Fast, no splash.
    Bullet,
    /// Artillery shell with a small blast.
    Shell,
    /// Slow missile with a large blast.
    Missile,
}

/// Preset numbers for a [`ProjectileKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileStats {
    /// World units per second.
    pub speed: u32,
    /// Blast radius, 0 for no area damage.
    pub explosion_radius: u32,
    /// Collision radius of the projectile itself.
    pub size: u32,
    /// Number of recent positions kept for drawing.
    pub trail_length: usize,
    /// Default base damage.
    pub damage: u32,
}

impl ProjectileKind {
    /// Preset numbers for this kind.
    #[must_use]
    pub const fn stats(self) -> ProjectileStats {
        match self {
            Self::Bullet => ProjectileStats {
                speed: 400,
                explosion_radius: 0,
                size: 3,
                trail_length: 6,
                damage: 25,
            },
            Self::Shell => ProjectileStats {
                speed: 250,
                explosion_radius: 30,
                size: 5,
                trail_length: 10,
                damage: 40,
            },
            Self::Missile => ProjectileStats {
                speed: 200,
                explosion_radius: 50,
                size: 4,
                trail_length: 15,
                damage: 60,
            },
        }
    }

    /// Explosion colour for this kind.
    #[must_use]
    pub const fn explosion_color(self) -> &'static str {
        match self {
            Self::Bullet => "#FFFF00",
            Self::Shell => "#FFA500",
            Self::Missile => "#FF4500",
        }
    }
}

/// Explosion colour for projectiles without a preset.
pub const DEFAULT_EXPLOSION_COLOR: &str = "#FFD700";

/// What a projectile was aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectileTarget {
    /// A ground point.
    Point(Vec2Fixed),
    /// An entity, aimed at its position when fired. The shot does not home.
    Entity {
        /// Intended victim.
        id: EntityId,
        /// Victim position at fire time.
        position: Vec2Fixed,
    },
}

impl ProjectileTarget {
    /// Aim point.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        match *self {
            Self::Point(position) | Self::Entity { position, .. } => position,
        }
    }

    /// Intended entity, if any.
    #[must_use]
    pub const fn entity(&self) -> Option<EntityId> {
        match *self {
            Self::Point(_) => None,
            Self::Entity { id, .. } => Some(id),
        }
    }
}

/// Who fired a shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShotSource {
    /// Firing entity.
    pub id: EntityId,
    /// Firing team. Entities on this team are never hit.
    pub team: TeamId,
    /// Damage modifiers at fire time.
    pub modifiers: SourceModifiers,
}

/// Everything needed to launch a projectile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FireOrder {
    /// Launch point.
    pub origin: Vec2Fixed,
    /// Aim.
    pub target: ProjectileTarget,
    /// Base damage before effectiveness and modifiers.
    pub damage: u32,
    /// Damage type.
    pub damage_type: DamageType,
    /// World units per second. Non-positive speeds arrive instantly.
    pub speed: Fixed,
    /// Blast radius, zero for no area damage.
    pub explosion_radius: Fixed,
    /// Collision radius of the projectile.
    pub size: Fixed,
    /// Preset this order came from, if any.
    pub kind: Option<ProjectileKind>,
    /// Shooter, `None` for environmental fire.
    pub source: Option<ShotSource>,
}

impl FireOrder {
    /// A fire order with explicit ballistics and no preset.
    #[must_use]
    pub const fn new(
        origin: Vec2Fixed,
        target: ProjectileTarget,
        damage: u32,
        damage_type: DamageType,
        speed: Fixed,
        explosion_radius: Fixed,
    ) -> Self {
        Self {
            origin,
            target,
            damage,
            damage_type,
            speed,
            explosion_radius,
            size: Fixed::ZERO,
            kind: None,
            source: None,
        }
    }

    /// A fire order using a preset's speed, radius, size and damage.
    #[must_use]
    pub fn preset(kind: ProjectileKind, origin: Vec2Fixed, target: ProjectileTarget) -> Self {
        let stats = kind.stats();
        Self {
            origin,
            target,
            damage: stats.damage,
            damage_type: DamageType::Kinetic,
            speed: Fixed::from_num(stats.speed),
            explosion_radius: Fixed::from_num(stats.explosion_radius),
            size: Fixed::from_num(stats.size),
            kind: Some(kind),
            source: None,
        }
    }

    /// Override the base damage.
    #[must_use]
    pub const fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    /// Override the damage type.
    #[must_use]
    pub const fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }

    /// Set the projectile's collision radius.
    #[must_use]
    pub const fn with_size(mut self, size: Fixed) -> Self {
        self.size = size;
        self
    }

    /// Attribute the shot to a shooter.
    #[must_use]
    pub const fn with_source(mut self, source: ShotSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// Lifecycle phase of a projectile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectilePhase {
    /// Moving toward the aim point.
    InFlight,
    /// Hit registered this tick; damage not yet resolved.
    Hit,
    /// Post-hit visual decay.
    Decaying,
    /// Ready to be dropped.
    Removed,
}

/// A projectile owned by the combat resolver.
#[derive(Debug, Clone)]
pub struct Projectile {
    id: ProjectileId,
    order: FireOrder,
    position: Vec2Fixed,
    elapsed: Fixed,
    travel_time: Fixed,
    phase: ProjectilePhase,
    decay_elapsed: Fixed,
    trail: VecDeque<Vec2Fixed>,
    trail_length: usize,
}

impl Projectile {
    /// Launch a projectile. Travel time is fixed here.
    #[must_use]
    pub fn launch(id: ProjectileId, order: FireOrder) -> Self {
        let distance = order.origin.distance(order.target.position());
        let travel_time = if order.speed > Fixed::ZERO {
            distance / order.speed
        } else {
            Fixed::ZERO
        };
        let trail_length = order
            .kind
            .map_or(DEFAULT_TRAIL_LENGTH, |kind| kind.stats().trail_length);

        Self {
            id,
            position: order.origin,
            order,
            elapsed: Fixed::ZERO,
            travel_time,
            phase: ProjectilePhase::InFlight,
            decay_elapsed: Fixed::ZERO,
            trail: VecDeque::with_capacity(trail_length),
            trail_length,
        }
    }

    /// Identifier.
    #[must_use]
    pub const fn id(&self) -> ProjectileId {
        self.id
    }

    /// The order this projectile was launched with.
    #[must_use]
    pub const fn order(&self) -> &FireOrder {
        &self.order
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.position
    }

    /// Aim point.
    #[must_use]
    pub const fn target_position(&self) -> Vec2Fixed {
        self.order.target.position()
    }

    /// Time since launch while in flight.
    #[must_use]
    pub const fn elapsed(&self) -> Fixed {
        self.elapsed
    }

    /// Flight duration fixed at launch.
    #[must_use]
    pub const fn travel_time(&self) -> Fixed {
        self.travel_time
    }

    /// Flight progress in `[0, 1]`.
    #[must_use]
    pub fn progress(&self) -> Fixed {
        if self.travel_time <= Fixed::ZERO {
            Fixed::ONE
        } else {
            (self.elapsed / self.travel_time).min(Fixed::ONE)
        }
    }

    /// Lifecycle phase.
    #[must_use]
    pub const fn phase(&self) -> ProjectilePhase {
        self.phase
    }

    /// Whether the hit transition has happened.
    #[must_use]
    pub const fn has_hit(&self) -> bool {
        !matches!(self.phase, ProjectilePhase::InFlight)
    }

    /// Whether the projectile is still flying toward its target.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        matches!(self.phase, ProjectilePhase::InFlight)
    }

    /// Recent positions, oldest first.
    pub fn trail(&self) -> impl Iterator<Item = &Vec2Fixed> {
        self.trail.iter()
    }

    /// Advance flight by `dt` seconds.
    ///
    /// Returns `true` once the aim point is reached. Does nothing after the
    /// hit transition.
    pub fn advance(&mut self, dt: Fixed) -> bool {
        if !self.is_in_flight() {
            return false;
        }

        self.trail.push_back(self.position);
        while self.trail.len() > self.trail_length {
            self.trail.pop_front();
        }

        self.elapsed = self.elapsed.saturating_add(dt);
        let progress = self.progress();
        self.position = self.order.origin.lerp(self.order.target.position(), progress);
        progress >= Fixed::ONE
    }

    /// Register the hit. Returns `true` only for the first call.
    pub fn mark_hit(&mut self) -> bool {
        if self.is_in_flight() {
            self.phase = ProjectilePhase::Hit;
            true
        } else {
            false
        }
    }

    /// Enter the visual decay phase after a hit has been resolved.
    pub fn begin_decay(&mut self) {
        if self.phase == ProjectilePhase::Hit {
            self.phase = ProjectilePhase::Decaying;
            self.decay_elapsed = Fixed::ZERO;
        }
    }

    /// Advance visual decay. Moves to `Removed` once `duration` has passed.
    pub fn advance_decay(&mut self, dt: Fixed, duration: Fixed) {
        if self.phase != ProjectilePhase::Decaying {
            return;
        }
        self.decay_elapsed = self.decay_elapsed.saturating_add(dt);
        if self.decay_elapsed >= duration {
            self.phase = ProjectilePhase::Removed;
        }
    }

    /// Whether the projectile can be dropped.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        matches!(self.phase, ProjectilePhase::Removed)
    }
}
