//! Combat resolution: projectile flight, hits, area damage and telemetry.
//!
//! The [`CombatResolver`] owns every projectile and telemetry event. Callers
//! submit fire orders and advance the resolver once per simulation tick,
//! passing the entities that can be hit. Entities are only touched through
//! the [`Damageable`] contract, once per applied hit.
//!
//! # Tick order
//!
//! 1. Age explosions and damage numbers, dropping expired ones
//! 2. Run the veterancy hook on every live entity
//! 3. Advance in-flight projectiles and resolve hits
//! 4. Advance post-hit decay and drop finished projectiles

use serde::Serialize;

use crate::combatant::{Damageable, EntityId};
use crate::config::CombatConfig;
use crate::damage::{DamageModel, DamageType, SourceModifiers, VarianceSource};
use crate::error::Result;
use crate::math::{percent, Fixed, Vec2Fixed};
use crate::projectile::{
    FireOrder, Projectile, ProjectileId, ProjectilePhase, ShotSource, DEFAULT_EXPLOSION_COLOR,
};
use crate::telemetry::{CombatStats, DamageNumber, EffectTimings, Explosion};

/// How a hit was delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HitKind {
    /// Projectile collided with the target.
    Direct,
    /// Target was inside a blast radius.
    Splash,
    /// Instant damage through [`CombatResolver::deal_damage`].
    Instant,
}

/// One application of damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HitEvent {
    /// Projectile responsible, if any.
    pub projectile: Option<ProjectileId>,
    /// Entity that took the damage.
    pub target: EntityId,
    /// Shooter, if known.
    pub source: Option<EntityId>,
    /// Damage applied.
    pub amount: u32,
    /// Delivery.
    pub kind: HitKind,
    /// Whether this hit destroyed the target.
    pub destroyed: bool,
}

/// Outcome of one resolver tick.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CombatTickReport {
    /// Hits applied this tick, in resolution order.
    pub hits: Vec<HitEvent>,
    /// Entities destroyed this tick.
    pub destroyed: Vec<EntityId>,
}

impl CombatTickReport {
    /// True if nothing was hit.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    fn record(&mut self, event: HitEvent) {
        if event.destroyed {
            self.destroyed.push(event.target);
        }
        self.hits.push(event);
    }
}

/// Owner of all in-flight projectiles and combat telemetry.
#[derive(Debug)]
pub struct CombatResolver<V> {
    model: DamageModel,
    variance: V,
    timings: EffectTimings,
    /// Damage lost at the blast edge, as a fraction of nominal.
    splash_drop: Fixed,
    next_projectile_id: ProjectileId,
    projectiles: Vec<Projectile>,
    explosions: Vec<Explosion>,
    damage_numbers: Vec<DamageNumber>,
    stats: CombatStats,
}

impl<V: VarianceSource> CombatResolver<V> {
    /// Create a resolver with default timings and a 50% splash edge.
    #[must_use]
    pub fn new(model: DamageModel, variance: V) -> Self {
        Self {
            model,
            variance,
            timings: EffectTimings::default(),
            splash_drop: Fixed::ONE - percent(50),
            next_projectile_id: 1,
            projectiles: Vec::new(),
            explosions: Vec::new(),
            damage_numbers: Vec::new(),
            stats: CombatStats::default(),
        }
    }

    /// Create a resolver from combat configuration.
    pub fn from_config(config: &CombatConfig, variance: V) -> Result<Self> {
        let mut resolver = Self::new(DamageModel::from_config(config)?, variance);
        resolver.timings = EffectTimings::from_config(config);
        resolver.splash_drop = Fixed::ONE - percent(config.splash_edge_percent);
        Ok(resolver)
    }

    /// The damage model in use.
    #[must_use]
    pub const fn model(&self) -> &DamageModel {
        &self.model
    }

    /// Effect timings in use.
    #[must_use]
    pub const fn timings(&self) -> &EffectTimings {
        &self.timings
    }

    /// Take ownership of a new projectile. Returns its id.
    pub fn submit_projectile(&mut self, order: FireOrder) -> ProjectileId {
        let id = self.next_projectile_id;
        self.next_projectile_id += 1;

        let projectile = Projectile::launch(id, order);
        tracing::trace!(
            id,
            travel_time = %projectile.travel_time(),
            active = self.projectiles.len() + 1,
            "Projectile submitted"
        );
        self.projectiles.push(projectile);
        self.stats.projectiles_fired += 1;
        id
    }

    /// Advance all projectiles and telemetry by `dt` seconds.
    pub fn tick<T: Damageable>(&mut self, dt: Fixed, targets: &mut [T]) -> CombatTickReport {
        let mut report = CombatTickReport::default();

        self.explosions.retain_mut(|e| e.update(dt));
        self.damage_numbers.retain_mut(|n| n.update(dt));

        for target in targets.iter_mut().filter(|t| t.is_alive()) {
            target.update_veterancy(dt);
        }

        let mut projectiles = std::mem::take(&mut self.projectiles);
        for projectile in &mut projectiles {
            match projectile.phase() {
                ProjectilePhase::InFlight => {
                    let arrived = projectile.advance(dt);
                    let collided = find_collision(projectile, targets);
                    if (arrived || collided.is_some()) && projectile.mark_hit() {
                        self.resolve_hit(projectile, collided, targets, &mut report);
                        projectile.begin_decay();
                    }
                }
                ProjectilePhase::Hit => projectile.begin_decay(),
                ProjectilePhase::Decaying => {
                    projectile.advance_decay(dt, self.timings.projectile_decay);
                }
                ProjectilePhase::Removed => {}
            }
        }

        let before = projectiles.len();
        projectiles.retain(|p| !p.is_removed());
        let removed = before - projectiles.len();
        self.projectiles = projectiles;

        if removed > 0 || !report.is_empty() {
            tracing::debug!(
                removed,
                hits = report.hits.len(),
                destroyed = report.destroyed.len(),
                active = self.projectiles.len(),
                "Combat tick"
            );
        }
        report
    }

    /// Apply instant damage to one target.
    ///
    /// Goes through the damage model and the health contract and emits a
    /// damage number. Returns `true` if the target was destroyed. Dead targets
    /// are left untouched.
    pub fn deal_damage<T: Damageable + ?Sized>(
        &mut self,
        target: &mut T,
        base_damage: u32,
        damage_type: DamageType,
        source: Option<&ShotSource>,
    ) -> bool {
        if !target.is_alive() {
            return false;
        }
        let modifiers = source.map_or(SourceModifiers::NONE, |s| s.modifiers);
        let amount = self.model.compute_damage(
            base_damage,
            damage_type,
            target.armor_type(),
            &modifiers,
            &mut self.variance,
        );
        let event = self.apply(target, amount, damage_type, None, source, HitKind::Instant);
        event.destroyed
    }

    fn resolve_hit<T: Damageable>(
        &mut self,
        projectile: &Projectile,
        direct: Option<usize>,
        targets: &mut [T],
        report: &mut CombatTickReport,
    ) {
        let order = projectile.order();
        let source = order.source.as_ref();
        let hit_point = projectile.position();

        if let Some(target) = direct.and_then(|i| targets.get_mut(i)) {
            let modifiers = source.map_or(SourceModifiers::NONE, |s| s.modifiers);
            let amount = self.model.compute_damage(
                order.damage,
                order.damage_type,
                target.armor_type(),
                &modifiers,
                &mut self.variance,
            );
            let event = self.apply(
                target,
                amount,
                order.damage_type,
                Some(projectile.id()),
                source,
                HitKind::Direct,
            );
            report.record(event);
        }

        let radius = order.explosion_radius;
        if radius <= Fixed::ZERO {
            return;
        }

        let color = order.kind.map_or(DEFAULT_EXPLOSION_COLOR, |k| k.explosion_color());
        self.explosions
            .push(Explosion::new(hit_point, radius, color, &self.timings));
        self.stats.explosions_created += 1;

        for (index, target) in targets.iter_mut().enumerate() {
            if Some(index) == direct || !target.is_alive() || !is_hostile(source, &*target) {
                continue;
            }
            let distance = hit_point.distance(target.position());
            if distance > radius {
                continue;
            }

            let amount = splash_damage(order.damage, distance, radius, self.splash_drop);
            if amount == 0 {
                continue;
            }
            let event = self.apply(
                target,
                amount,
                order.damage_type,
                Some(projectile.id()),
                source,
                HitKind::Splash,
            );
            report.record(event);
        }
    }

    fn apply<T: Damageable + ?Sized>(
        &mut self,
        target: &mut T,
        amount: u32,
        damage_type: DamageType,
        projectile: Option<ProjectileId>,
        source: Option<&ShotSource>,
        kind: HitKind,
    ) -> HitEvent {
        let destroyed = target.take_damage(amount);

        let hint = self.model.classify_severity(amount, damage_type);
        let jitter = self.variance.signed_unit();
        self.damage_numbers.push(DamageNumber::new(
            target.position(),
            amount,
            hint,
            jitter,
            &self.timings,
        ));
        self.stats.total_damage_dealt += u64::from(amount);

        tracing::trace!(
            target = target.id(),
            amount,
            ?damage_type,
            ?kind,
            destroyed,
            "Damage applied"
        );
        if destroyed {
            tracing::debug!(target = target.id(), "Target destroyed");
        }

        HitEvent {
            projectile,
            target: target.id(),
            source: source.map(|s| s.id),
            amount,
            kind,
            destroyed,
        }
    }

    /// True if any in-flight projectile is aimed within `radius` of `point`.
    #[must_use]
    pub fn is_position_under_fire(&self, point: Vec2Fixed, radius: Fixed) -> bool {
        let radius_sq = radius.saturating_mul(radius);
        self.projectiles
            .iter()
            .filter(|p| p.is_in_flight())
            .any(|p| p.target_position().distance_squared(point) <= radius_sq)
    }

    /// Projectiles currently tracked, in flight or decaying.
    #[must_use]
    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    /// Visible explosions.
    #[must_use]
    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    /// Visible damage numbers.
    #[must_use]
    pub fn damage_numbers(&self) -> &[DamageNumber] {
        &self.damage_numbers
    }

    /// Running totals and current collection sizes.
    #[must_use]
    pub fn stats(&self) -> CombatStats {
        CombatStats {
            active_projectiles: self.projectiles.len(),
            active_explosions: self.explosions.len(),
            active_damage_numbers: self.damage_numbers.len(),
            ..self.stats
        }
    }
}

/// Entities on the shooter's team are never hit. Unattributed fire hits
/// everyone.
fn is_hostile<T: Damageable + ?Sized>(source: Option<&ShotSource>, target: &T) -> bool {
    source.map_or(true, |s| s.team != target.team())
}

/// Closest live hostile entity touching the projectile.
///
/// Contact means `distance <= target radius + projectile size`.
fn find_collision<T: Damageable>(projectile: &Projectile, targets: &[T]) -> Option<usize> {
    let order = projectile.order();
    let source = order.source.as_ref();
    let position = projectile.position();

    targets
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_alive() && is_hostile(source, *t))
        .filter_map(|(i, t)| {
            let reach = t.radius() + order.size;
            let distance_sq = position.distance_squared(t.position());
            (distance_sq <= reach.saturating_mul(reach)).then_some((i, distance_sq))
        })
        .min_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(i, _)| i)
}

/// Area damage at `distance` from the blast centre.
///
/// `round(base * (1 - (distance / radius) * drop))`, where `drop` is the
/// fraction lost at the edge.
#[must_use]
pub fn splash_damage(base: u32, distance: Fixed, radius: Fixed, drop: Fixed) -> u32 {
    if radius <= Fixed::ZERO {
        return 0;
    }
    let ratio = (distance / radius).clamp(Fixed::ZERO, Fixed::ONE);
    let falloff = Fixed::ONE - ratio * drop;
    let amount = Fixed::saturating_from_num(base).saturating_mul(falloff).round();
    amount.max(Fixed::ZERO).to_num::<u32>()
}
