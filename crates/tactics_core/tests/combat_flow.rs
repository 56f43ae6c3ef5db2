//! End-to-end combat tests.
//!
//! Drive a [`CombatResolver`] against real [`Combatant`]s over many ticks:
//! volleys, area damage, veterancy promotion, telemetry lifetimes and
//! seeded determinism.

use tactics_core::combatant::{HIT_EXPERIENCE, KILL_EXPERIENCE};
use tactics_core::prelude::*;
use tactics_test_utils::determinism::{compute_hash, run_parallel, verify_determinism};
use tactics_test_utils::fixtures::{combatant, point, tick_dt};

// =============================================================================
// Helpers
// =============================================================================

/// A turret line against a raider pack, ticked at 20 Hz.
struct Skirmish {
    resolver: CombatResolver<SeededVariance>,
    units: Vec<Combatant>,
    tick: u64,
}

impl Skirmish {
    fn new(seed: u64) -> Self {
        Self {
            resolver: CombatResolver::new(DamageModel::default(), SeededVariance::new(seed)),
            units: vec![
                combatant(1, 0, Archetype::GunTurret, 0, 0),
                combatant(10, 1, Archetype::Raider, 120, 0),
                combatant(11, 1, Archetype::Raider, 140, 40),
                combatant(12, 1, Archetype::Raider, 200, -30),
            ],
            tick: 0,
        }
    }

    /// Every turret fires a shell at its nearest live enemy once a second.
    fn step(&mut self) {
        if self.tick % 20 == 0 {
            let orders: Vec<FireOrder> = self
                .units
                .iter()
                .filter(|u| u.archetype == Archetype::GunTurret && u.is_alive())
                .filter_map(|shooter| {
                    let victim = self
                        .units
                        .iter()
                        .filter(|u| u.team != shooter.team && u.is_alive())
                        .min_by_key(|u| shooter.position.distance_squared(u.position))?;
                    Some(
                        FireOrder::preset(
                            ProjectileKind::Shell,
                            shooter.position,
                            ProjectileTarget::Entity {
                                id: victim.id,
                                position: victim.position,
                            },
                        )
                        .with_damage_type(shooter.weapon_damage_type())
                        .with_source(ShotSource {
                            id: shooter.id,
                            team: shooter.team,
                            modifiers: shooter.source_modifiers(),
                        }),
                    )
                })
                .collect();
            for order in orders {
                self.resolver.submit_projectile(order);
            }
        }

        let report = self.resolver.tick(tick_dt(), &mut self.units);
        for hit in &report.hits {
            let award = if hit.destroyed {
                KILL_EXPERIENCE
            } else {
                HIT_EXPERIENCE
            };
            if let Some(shooter) = hit
                .source
                .and_then(|id| self.units.iter_mut().find(|u| u.id == id))
            {
                shooter.gain_experience(award);
            }
        }
        self.tick += 1;
    }

    fn state_hash(&self) -> u64 {
        let healths: Vec<(EntityId, u32, u32)> = self
            .units
            .iter()
            .map(|u| (u.id, u.health, u.veterancy.experience()))
            .collect();
        compute_hash(&(healths, self.resolver.stats().total_damage_dealt))
    }
}

fn shot_from(shooter: &Combatant) -> ShotSource {
    ShotSource {
        id: shooter.id,
        team: shooter.team,
        modifiers: shooter.source_modifiers(),
    }
}

// =============================================================================
// Volleys and veterancy
// =============================================================================

#[test]
fn test_turret_clears_raider_pack_and_promotes() {
    let mut skirmish = Skirmish::new(7);
    for _ in 0..600 {
        skirmish.step();
    }

    let turret = &skirmish.units[0];
    assert!(turret.is_alive());
    assert!(
        skirmish.units[1..].iter().all(|u| !u.is_alive()),
        "raiders left: {:?}",
        skirmish.units
    );
    assert!(turret.veterancy.experience() >= 3 * KILL_EXPERIENCE);
    assert!(turret.veterancy.level() >= 1);
}

#[test]
fn test_veteran_shots_hit_harder() {
    let mut resolver = CombatResolver::new(DamageModel::default(), NoVariance);
    let mut turret = combatant(1, 0, Archetype::GunTurret, 0, 0);
    let mut recruit_target = combatant(2, 1, Archetype::Raider, 50, 0);
    let mut veteran_target = combatant(3, 1, Archetype::Raider, 50, 0);

    resolver.deal_damage(&mut recruit_target, 25, DamageType::Kinetic, Some(&shot_from(&turret)));
    assert_eq!(recruit_target.health, 35);

    assert_eq!(turret.veterancy.gain_experience(2 * KILL_EXPERIENCE), 1);
    // Ladder 1.2x and a 10% per-level bonus stack.
    resolver.deal_damage(&mut veteran_target, 25, DamageType::Kinetic, Some(&shot_from(&turret)));
    assert_eq!(veteran_target.health, 60 - 33);
}

#[test]
fn test_promoted_turret_switches_to_anti_armor() {
    let mut turret = combatant(1, 0, Archetype::GunTurret, 0, 0);
    assert_eq!(turret.weapon_damage_type(), DamageType::Kinetic);

    turret.veterancy.gain_experience(300);
    assert_eq!(turret.veterancy.level(), 2);
    assert_eq!(turret.weapon_damage_type(), DamageType::AntiArmor);

    let model = DamageModel::default();
    let heavy = model.compute_damage(
        100,
        turret.weapon_damage_type(),
        ArmorType::Heavy,
        &SourceModifiers::NONE,
        &mut NoVariance,
    );
    assert_eq!(heavy, 160);
}

// =============================================================================
// Area damage and telemetry
// =============================================================================

#[test]
fn test_splash_spares_allies() {
    let mut resolver = CombatResolver::new(DamageModel::default(), NoVariance);
    let shooter = combatant(1, 0, Archetype::GunTurret, 0, 0);
    let mut units = vec![
        combatant(2, 1, Archetype::Heavy, 100, 0),
        combatant(3, 0, Archetype::Heavy, 110, 0),
        combatant(4, 1, Archetype::Heavy, 100, 20),
    ];

    resolver.submit_projectile(
        FireOrder::preset(
            ProjectileKind::Missile,
            shooter.position,
            ProjectileTarget::Entity {
                id: 2,
                position: point(100, 0),
            },
        )
        .with_source(shot_from(&shooter)),
    );

    let mut hits = Vec::new();
    for _ in 0..40 {
        hits.extend(resolver.tick(tick_dt(), &mut units).hits);
    }

    assert!(hits.iter().any(|h| h.target == 2 && h.kind == HitKind::Direct));
    assert!(hits.iter().any(|h| h.target == 4 && h.kind == HitKind::Splash));
    assert!(hits.iter().all(|h| h.target != 3));
    assert_eq!(units[1].health, units[1].max_health);
}

#[test]
fn test_effects_expire_after_a_hit() {
    let mut resolver = CombatResolver::new(DamageModel::default(), NoVariance);
    let mut units = vec![combatant(2, 1, Archetype::Heavy, 60, 0)];

    resolver.submit_projectile(FireOrder::preset(
        ProjectileKind::Shell,
        point(0, 0),
        ProjectileTarget::Point(point(60, 0)),
    ));
    assert!(resolver.is_position_under_fire(point(60, 0), Fixed::from_num(5)));

    let mut dealt = 0u64;
    let mut saw_explosion = false;
    for _ in 0..10 {
        let report = resolver.tick(tick_dt(), &mut units);
        dealt += report.hits.iter().map(|h| u64::from(h.amount)).sum::<u64>();
        saw_explosion |= !resolver.explosions().is_empty();
    }
    assert!(saw_explosion);
    assert!(!resolver.damage_numbers().is_empty());
    assert!(!resolver.is_position_under_fire(point(60, 0), Fixed::from_num(5)));

    // Longest effect is the 1.5 s damage number.
    for _ in 0..40 {
        resolver.tick(tick_dt(), &mut units);
    }
    let stats = resolver.stats();
    assert_eq!(stats.projectiles_fired, 1);
    assert_eq!(stats.explosions_created, 1);
    assert_eq!(stats.total_damage_dealt, dealt);
    assert_eq!(stats.active_projectiles, 0);
    assert_eq!(stats.active_explosions, 0);
    assert_eq!(stats.active_damage_numbers, 0);
}

#[test]
fn test_dead_target_still_consumes_projectile() {
    let mut resolver = CombatResolver::new(DamageModel::default(), NoVariance);
    let mut units = vec![combatant(2, 1, Archetype::Scout, 80, 0)];

    resolver.submit_projectile(FireOrder::preset(
        ProjectileKind::Bullet,
        point(0, 0),
        ProjectileTarget::Entity {
            id: 2,
            position: point(80, 0),
        },
    ));
    assert!(resolver.deal_damage(&mut units[0], 1000, DamageType::Kinetic, None));

    let mut hits = 0;
    for _ in 0..40 {
        hits += resolver.tick(tick_dt(), &mut units).hits.len();
    }
    assert_eq!(hits, 0);
    assert!(resolver.projectiles().is_empty());
}

// =============================================================================
// Determinism
// =============================================================================

#[test]
fn test_seeded_skirmish_is_deterministic() {
    let result = verify_determinism(
        3,
        300,
        || Skirmish::new(42),
        Skirmish::step,
        Skirmish::state_hash,
    );
    result.assert_deterministic();
}

#[test]
fn test_seeded_skirmish_matches_across_threads() {
    let result = run_parallel(
        4,
        300,
        || Skirmish::new(42),
        Skirmish::step,
        Skirmish::state_hash,
    );
    result.assert_deterministic();
}
