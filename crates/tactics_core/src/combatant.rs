//! Combat entities: the health contract, veterancy and archetype stats.
//!
//! The resolver never owns entities. It reaches them only through the
//! [`Damageable`] trait, so any game-side type can be targeted. [`Combatant`]
//! is a ready-made implementation used by the headless driver and tests.

use serde::{Deserialize, Serialize};

use crate::damage::{ArmorType, DamageType, SourceModifiers};
use crate::math::{percent, Fixed, Vec2Fixed};

/// Unique identifier for entities.
pub type EntityId = u64;

/// Team affiliation. Entities on different teams are hostile.
pub type TeamId = u8;

/// Experience for landing a hit.
pub const HIT_EXPERIENCE: u32 = 10;

/// Experience for destroying a target.
pub const KILL_EXPERIENCE: u32 = 50;

/// The health contract the combat resolver calls into.
pub trait Damageable {
    /// Stable identifier.
    fn id(&self) -> EntityId;

    /// Owning team.
    fn team(&self) -> TeamId;

    /// Current world position.
    fn position(&self) -> Vec2Fixed;

    /// Collision radius in world units.
    fn radius(&self) -> Fixed;

    /// Armor class used for effectiveness lookups.
    fn armor_type(&self) -> ArmorType;

    /// Current health.
    fn health(&self) -> u32;

    /// Maximum health.
    fn max_health(&self) -> u32;

    /// Whether the entity can still be hit.
    fn is_alive(&self) -> bool {
        self.health() > 0
    }

    /// Apply damage. Returns `true` if this hit destroyed the entity.
    fn take_damage(&mut self, amount: u32) -> bool;

    /// Per-tick veterancy hook. Most entities level up on events only.
    fn update_veterancy(&mut self, _dt: Fixed) {}
}

impl<T: Damageable + ?Sized> Damageable for &mut T {
    fn id(&self) -> EntityId {
        (**self).id()
    }

    fn team(&self) -> TeamId {
        (**self).team()
    }

    fn position(&self) -> Vec2Fixed {
        (**self).position()
    }

    fn radius(&self) -> Fixed {
        (**self).radius()
    }

    fn armor_type(&self) -> ArmorType {
        (**self).armor_type()
    }

    fn health(&self) -> u32 {
        (**self).health()
    }

    fn max_health(&self) -> u32 {
        (**self).max_health()
    }

    fn is_alive(&self) -> bool {
        (**self).is_alive()
    }

    fn take_damage(&mut self, amount: u32) -> bool {
        (**self).take_damage(amount)
    }

    fn update_veterancy(&mut self, dt: Fixed) {
        (**self).update_veterancy(dt);
    }
}

/// Experience thresholds and per-level damage multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VeterancyLadder {
    /// Mobile hostile units: two levels.
    Enemy,
    /// Defensive turrets: three levels.
    Turret,
}

impl VeterancyLadder {
    /// Cumulative experience needed for each level.
    #[must_use]
    pub const fn thresholds(self) -> &'static [u32] {
        match self {
            Self::Enemy => &[50, 150],
            Self::Turret => &[100, 300, 600],
        }
    }

    /// Damage multiplier percentage at each level, starting at level 1.
    #[must_use]
    pub const fn multiplier_percents(self) -> &'static [u32] {
        match self {
            Self::Enemy => &[130, 150],
            Self::Turret => &[120, 140, 160],
        }
    }

    /// Max health growth applied on reaching each level, compounding.
    #[must_use]
    pub const fn health_percents(self) -> &'static [u32] {
        match self {
            Self::Enemy => &[120, 110],
            Self::Turret => &[],
        }
    }

    /// Movement speed growth applied on reaching each level, compounding.
    #[must_use]
    pub const fn speed_percents(self) -> &'static [u32] {
        match self {
            Self::Enemy => &[110, 110],
            Self::Turret => &[],
        }
    }

    /// Attack cooldown at each level as a percentage of the base cooldown.
    #[must_use]
    pub const fn cooldown_percents(self) -> &'static [u32] {
        match self {
            Self::Enemy => &[],
            Self::Turret => &[90, 72, 50],
        }
    }

    /// Extra weapon range at each level, in tiles.
    #[must_use]
    pub const fn range_bonus_tiles(self) -> &'static [u32] {
        match self {
            Self::Enemy => &[],
            Self::Turret => &[0, 1, 2],
        }
    }

    /// Highest reachable level.
    #[must_use]
    pub const fn max_level(self) -> u32 {
        self.thresholds().len() as u32
    }
}

/// Experience and level of a combat entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Veterancy {
    ladder: VeterancyLadder,
    experience: u32,
    level: u32,
}

impl Veterancy {
    /// A fresh recruit on the given ladder.
    #[must_use]
    pub const fn new(ladder: VeterancyLadder) -> Self {
        Self {
            ladder,
            experience: 0,
            level: 0,
        }
    }

    /// Ladder in use.
    #[must_use]
    pub const fn ladder(&self) -> VeterancyLadder {
        self.ladder
    }

    /// Accumulated experience.
    #[must_use]
    pub const fn experience(&self) -> u32 {
        self.experience
    }

    /// Current level, 0 for a recruit.
    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    /// Add experience. Returns the number of levels gained.
    pub fn gain_experience(&mut self, amount: u32) -> u32 {
        self.experience = self.experience.saturating_add(amount);

        let thresholds = self.ladder.thresholds();
        let before = self.level;
        while let Some(&threshold) = thresholds.get(self.level as usize) {
            if self.experience < threshold {
                break;
            }
            self.level += 1;
        }

        let gained = self.level - before;
        if gained > 0 {
            tracing::debug!(level = self.level, experience = self.experience, "Promoted");
        }
        gained
    }

    /// Ladder damage multiplier at the current level (1.0 for recruits).
    #[must_use]
    pub fn damage_multiplier(&self) -> Fixed {
        self.at_level(self.ladder.multiplier_percents())
            .map_or(Fixed::ONE, percent)
    }

    /// Attack cooldown as a percentage of the archetype's base.
    #[must_use]
    pub fn cooldown_percent(&self) -> u32 {
        self.at_level(self.ladder.cooldown_percents()).unwrap_or(100)
    }

    /// Extra weapon range in tiles.
    #[must_use]
    pub fn range_bonus_tiles(&self) -> u32 {
        self.at_level(self.ladder.range_bonus_tiles()).unwrap_or(0)
    }

    fn at_level(&self, table: &[u32]) -> Option<u32> {
        self.level
            .checked_sub(1)
            .and_then(|i| table.get(i as usize))
            .copied()
    }
}

/// Stat block for one archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchetypeStats {
    /// Maximum health.
    pub health: u32,
    /// Base weapon damage.
    pub damage: u32,
    /// Armor class.
    pub armor: ArmorType,
    /// Weapon damage type.
    pub damage_type: DamageType,
    /// Footprint in world units; the collision radius is half of this.
    pub size: u32,
    /// Movement speed in world units per second, 0 for structures.
    pub speed: u32,
    /// Weapon range in world units.
    pub attack_range: u32,
    /// Time between shots.
    pub attack_cooldown_ms: u32,
    /// Veterancy ladder.
    pub ladder: VeterancyLadder,
}

/// Combat entity archetypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Archetype {
    /// Fast, lightly armored raider.
    Scout,
    /// Balanced attacker with explosive rounds.
    Raider,
    /// Slow, heavily armored assault unit.
    Heavy,
    /// Static defensive turret.
    GunTurret,
}

impl Archetype {
    /// Stat block for this archetype.
    #[must_use]
    pub const fn stats(self) -> ArchetypeStats {
        match self {
            Self::Scout => ArchetypeStats {
                health: 30,
                damage: 8,
                armor: ArmorType::Light,
                damage_type: DamageType::Kinetic,
                size: 12,
                speed: 120,
                attack_range: 30,
                attack_cooldown_ms: 1000,
                ladder: VeterancyLadder::Enemy,
            },
            Self::Raider => ArchetypeStats {
                health: 60,
                damage: 15,
                armor: ArmorType::Medium,
                damage_type: DamageType::Explosive,
                size: 16,
                speed: 80,
                attack_range: 40,
                attack_cooldown_ms: 1500,
                ladder: VeterancyLadder::Enemy,
            },
            Self::Heavy => ArchetypeStats {
                health: 120,
                damage: 30,
                armor: ArmorType::Heavy,
                damage_type: DamageType::AntiArmor,
                size: 24,
                speed: 50,
                attack_range: 50,
                attack_cooldown_ms: 2500,
                ladder: VeterancyLadder::Enemy,
            },
            Self::GunTurret => ArchetypeStats {
                health: 100,
                damage: 25,
                armor: ArmorType::Medium,
                damage_type: DamageType::Kinetic,
                size: 32,
                speed: 0,
                attack_range: 256,
                attack_cooldown_ms: 2000,
                ladder: VeterancyLadder::Turret,
            },
        }
    }
}

/// A concrete damageable entity with archetype stats and veterancy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Combatant {
    /// Stable identifier.
    pub id: EntityId,
    /// Owning team.
    pub team: TeamId,
    /// Stat archetype.
    pub archetype: Archetype,
    /// World position.
    pub position: Vec2Fixed,
    /// Current health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Experience and level.
    pub veterancy: Veterancy,
}

impl Combatant {
    /// Spawn a combatant at full health.
    #[must_use]
    pub const fn new(id: EntityId, team: TeamId, archetype: Archetype, position: Vec2Fixed) -> Self {
        let stats = archetype.stats();
        Self {
            id,
            team,
            archetype,
            position,
            health: stats.health,
            max_health: stats.health,
            veterancy: Veterancy::new(stats.ladder),
        }
    }

    /// Archetype stats.
    #[must_use]
    pub const fn stats(&self) -> ArchetypeStats {
        self.archetype.stats()
    }

    /// Modifiers this combatant applies to its own shots.
    #[must_use]
    pub fn source_modifiers(&self) -> SourceModifiers {
        SourceModifiers::from_veterancy(&self.veterancy)
    }

    /// Damage type of this combatant's weapon.
    ///
    /// Turrets switch to armor-piercing rounds from level 2.
    #[must_use]
    pub fn weapon_damage_type(&self) -> DamageType {
        match self.archetype {
            Archetype::GunTurret if self.veterancy.level() >= 2 => DamageType::AntiArmor,
            archetype => archetype.stats().damage_type,
        }
    }

    /// Add experience and apply the stat growth of every level reached.
    ///
    /// Each promotion that grows max health also restores the combatant to
    /// full health. Returns the number of levels gained.
    pub fn gain_experience(&mut self, amount: u32) -> u32 {
        let before = self.veterancy.level();
        let gained = self.veterancy.gain_experience(amount);
        let growth = self.veterancy.ladder().health_percents();

        for level in before..before + gained {
            if let Some(&pct) = growth.get(level as usize) {
                let grown = (u64::from(self.max_health) * u64::from(pct) + 50) / 100;
                self.max_health = u32::try_from(grown).unwrap_or(u32::MAX);
                self.health = self.max_health;
            }
        }
        gained
    }

    /// Movement speed in world units per second at the current level.
    #[must_use]
    pub fn speed(&self) -> Fixed {
        let growth = self.veterancy.ladder().speed_percents();
        growth
            .iter()
            .take(self.veterancy.level() as usize)
            .fold(Fixed::from_num(self.stats().speed), |speed, &p| speed * percent(p))
    }

    /// Time between shots at the current level.
    #[must_use]
    pub fn attack_cooldown_ms(&self) -> u32 {
        let base = u64::from(self.stats().attack_cooldown_ms);
        (base * u64::from(self.veterancy.cooldown_percent()) / 100) as u32
    }

    /// Weapon range in world units at the current level.
    #[must_use]
    pub fn attack_range(&self, tile_size: u32) -> u32 {
        self.veterancy
            .range_bonus_tiles()
            .saturating_mul(tile_size)
            .saturating_add(self.stats().attack_range)
    }

    /// Health as a percentage (0-100).
    #[must_use]
    pub fn health_percentage(&self) -> u32 {
        if self.max_health == 0 {
            0
        } else {
            (self.health * 100) / self.max_health
        }
    }
}

impl Damageable for Combatant {
    fn id(&self) -> EntityId {
        self.id
    }

    fn team(&self) -> TeamId {
        self.team
    }

    fn position(&self) -> Vec2Fixed {
        self.position
    }

    fn radius(&self) -> Fixed {
        Fixed::from_num(self.stats().size) / Fixed::from_num(2)
    }

    fn armor_type(&self) -> ArmorType {
        self.stats().armor
    }

    fn health(&self) -> u32 {
        self.health
    }

    fn max_health(&self) -> u32 {
        self.max_health
    }

    fn take_damage(&mut self, amount: u32) -> bool {
        if self.health == 0 {
            return false;
        }
        self.health = self.health.saturating_sub(amount);
        self.health == 0
    }
}
