//! Damage model: type-versus-armor effectiveness and damage rolls.
//!
//! Every hit goes through [`DamageModel::compute_damage`], which applies the
//! effectiveness matrix, the attacker's modifiers and a bounded random
//! variance, then rounds and clamps the result to at least 1. The random draw
//! comes from an injected [`VarianceSource`] so tests and replays stay
//! deterministic.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::combatant::Veterancy;
use crate::config::CombatConfig;
use crate::error::{GameError, Result};
use crate::math::{percent, Fixed};

/// Damage delivery classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DamageType {
    /// Bullets and shells.
    #[default]
    Kinetic,
    /// Rockets and grenades.
    Explosive,
    /// Lasers and plasma.
    Energy,
    /// Armor-piercing rounds.
    AntiArmor,
}

impl DamageType {
    /// Every damage type, in matrix row order.
    pub const ALL: [Self; 4] = [Self::Kinetic, Self::Explosive, Self::Energy, Self::AntiArmor];

    const fn index(self) -> usize {
        match self {
            Self::Kinetic => 0,
            Self::Explosive => 1,
            Self::Energy => 2,
            Self::AntiArmor => 3,
        }
    }
}

/// Armor classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ArmorType {
    /// Infantry and light vehicles.
    #[default]
    Light,
    /// Tanks and heavier units.
    Medium,
    /// Structures and super-heavy units.
    Heavy,
    /// Energy shields.
    Shield,
}

impl ArmorType {
    /// Every armor type, in matrix column order.
    pub const ALL: [Self; 4] = [Self::Light, Self::Medium, Self::Heavy, Self::Shield];

    const fn index(self) -> usize {
        match self {
            Self::Light => 0,
            Self::Medium => 1,
            Self::Heavy => 2,
            Self::Shield => 3,
        }
    }
}

/// Built-in effectiveness percentages, rows by [`DamageType`], columns by
/// [`ArmorType`].
const BUILTIN_PERCENT: [[u32; 4]; 4] = [
    // Light, Medium, Heavy, Shield
    [120, 100, 70, 50],  // Kinetic
    [150, 120, 100, 80], // Explosive
    [80, 90, 60, 180],   // Energy
    [80, 130, 160, 110], // AntiArmor
];

/// Damage multiplier for every (damage type, armor type) pair.
///
/// Immutable once the [`DamageModel`] owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectivenessMatrix {
    entries: [[Option<Fixed>; 4]; 4],
}

impl Default for EffectivenessMatrix {
    fn default() -> Self {
        Self::builtin()
    }
}

impl EffectivenessMatrix {
    /// The standard, complete matrix.
    #[must_use]
    pub fn builtin() -> Self {
        let mut entries = [[None; 4]; 4];
        for (row, percents) in entries.iter_mut().zip(BUILTIN_PERCENT) {
            for (cell, value) in row.iter_mut().zip(percents) {
                *cell = Some(percent(value));
            }
        }
        Self { entries }
    }

    /// A matrix with no entries. Every lookup falls back to 1.0.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            entries: [[None; 4]; 4],
        }
    }

    /// Build a matrix from combat configuration.
    ///
    /// Listed entries are merged over the built-in table, or over an empty
    /// table when `strict_effectiveness` is set.
    pub fn from_config(config: &CombatConfig) -> Result<Self> {
        let mut matrix = if config.strict_effectiveness {
            Self::empty()
        } else {
            Self::builtin()
        };

        for entry in &config.effectiveness {
            if entry.multiplier_percent == 0 {
                return Err(GameError::InvalidConfig(format!(
                    "effectiveness {:?} vs {:?} must be positive",
                    entry.damage_type, entry.armor_type
                )));
            }
            matrix.set(entry.damage_type, entry.armor_type, percent(entry.multiplier_percent));
        }

        if !matrix.is_complete() {
            tracing::warn!("Effectiveness matrix is incomplete, missing pairs default to 1.0");
        }
        Ok(matrix)
    }

    /// Set one multiplier.
    pub fn set(&mut self, damage_type: DamageType, armor_type: ArmorType, multiplier: Fixed) {
        self.entries[damage_type.index()][armor_type.index()] = Some(multiplier);
    }

    /// The stored multiplier, if defined.
    #[must_use]
    pub const fn get(&self, damage_type: DamageType, armor_type: ArmorType) -> Option<Fixed> {
        self.entries[damage_type.index()][armor_type.index()]
    }

    /// Multiplier for a pair, falling back to 1.0 when it is undefined.
    #[must_use]
    pub fn effectiveness(&self, damage_type: DamageType, armor_type: ArmorType) -> Fixed {
        self.get(damage_type, armor_type).unwrap_or_else(|| {
            tracing::warn!(?damage_type, ?armor_type, "Missing effectiveness entry");
            Fixed::ONE
        })
    }

    /// Whether all sixteen pairs are defined.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.entries.iter().flatten().all(Option::is_some)
    }
}

/// Attacker-side modifiers applied on top of effectiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceModifiers {
    /// Upgrade or veterancy multiplier already reduced to a scalar.
    pub damage_multiplier: Option<Fixed>,
    /// Veterancy level, adding a separate per-level bonus.
    pub veterancy_level: Option<u32>,
}

impl SourceModifiers {
    /// No modifiers: an anonymous or environmental source.
    pub const NONE: Self = Self {
        damage_multiplier: None,
        veterancy_level: None,
    };

    /// Modifiers from a veterancy component.
    ///
    /// Carries both the ladder multiplier and the raw level; the damage model
    /// stacks them independently.
    #[must_use]
    pub fn from_veterancy(veterancy: &Veterancy) -> Self {
        Self {
            damage_multiplier: Some(veterancy.damage_multiplier()),
            veterancy_level: Some(veterancy.level()),
        }
    }

    /// Set a scalar damage multiplier.
    #[must_use]
    pub const fn with_multiplier(mut self, multiplier: Fixed) -> Self {
        self.damage_multiplier = Some(multiplier);
        self
    }
}

/// Source of the symmetric random draw used for damage variance and
/// presentation jitter.
pub trait VarianceSource {
    /// A value in `[-1, 1]`.
    fn signed_unit(&mut self) -> Fixed;
}

/// Always draws zero. Disables variance for deterministic tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoVariance;

impl VarianceSource for NoVariance {
    fn signed_unit(&mut self) -> Fixed {
        Fixed::ZERO
    }
}

/// Seeded uniform variance.
#[derive(Debug, Clone)]
pub struct SeededVariance {
    rng: ChaCha8Rng,
}

impl SeededVariance {
    /// Create a variance source from a seed.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl VarianceSource for SeededVariance {
    fn signed_unit(&mut self) -> Fixed {
        let one = Fixed::ONE.to_bits();
        Fixed::from_bits(self.rng.gen_range(-one..=one))
    }
}

impl<V: VarianceSource + ?Sized> VarianceSource for &mut V {
    fn signed_unit(&mut self) -> Fixed {
        (**self).signed_unit()
    }
}

/// Hex colour for critical hits.
pub const CRITICAL_COLOR: &str = "#FFD700";

/// Cosmetic classification of an applied hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationHint {
    /// Damage at or above the critical threshold.
    Critical,
    /// Ordinary hit, coloured by damage type.
    Typed(DamageType),
}

impl PresentationHint {
    /// Display colour.
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::Critical => CRITICAL_COLOR,
            Self::Typed(DamageType::Kinetic) => "#FF0000",
            Self::Typed(DamageType::Explosive) => "#FF8C00",
            Self::Typed(DamageType::Energy) => "#00BFFF",
            Self::Typed(DamageType::AntiArmor) => "#9932CC",
        }
    }
}

/// Stateless damage calculator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DamageModel {
    matrix: EffectivenessMatrix,
    /// Half-width of the uniform variance band (0.1 = ±10%).
    variance: Fixed,
    /// Bonus per veterancy level.
    veterancy_bonus: Fixed,
    critical_threshold: u32,
}

impl Default for DamageModel {
    fn default() -> Self {
        Self::new(EffectivenessMatrix::builtin())
    }
}

impl DamageModel {
    /// Create a model with standard tuning around the given matrix.
    #[must_use]
    pub fn new(matrix: EffectivenessMatrix) -> Self {
        Self {
            matrix,
            variance: percent(10),
            veterancy_bonus: percent(10),
            critical_threshold: 50,
        }
    }

    /// Create a model from combat configuration.
    pub fn from_config(config: &CombatConfig) -> Result<Self> {
        Ok(Self {
            matrix: EffectivenessMatrix::from_config(config)?,
            variance: percent(config.variance_percent),
            veterancy_bonus: percent(config.veterancy_bonus_percent),
            critical_threshold: config.critical_threshold,
        })
    }

    /// The effectiveness matrix in use.
    #[must_use]
    pub const fn matrix(&self) -> &EffectivenessMatrix {
        &self.matrix
    }

    /// Multiplier for a damage type against an armor type.
    #[must_use]
    pub fn effectiveness(&self, damage_type: DamageType, armor_type: ArmorType) -> Fixed {
        self.matrix.effectiveness(damage_type, armor_type)
    }

    /// Roll the damage a hit deals.
    ///
    /// `base * effectiveness * multiplier * (1 + bonus * level) * (1 + variance)`,
    /// rounded to the nearest integer and never below 1.
    pub fn compute_damage<V: VarianceSource + ?Sized>(
        &self,
        base_damage: u32,
        damage_type: DamageType,
        armor_type: ArmorType,
        source: &SourceModifiers,
        variance: &mut V,
    ) -> u32 {
        let mut damage =
            Fixed::saturating_from_num(base_damage).saturating_mul(self.effectiveness(damage_type, armor_type));

        if let Some(multiplier) = source.damage_multiplier {
            damage = damage.saturating_mul(multiplier);
        }

        if let Some(level) = source.veterancy_level {
            let bonus = Fixed::ONE + self.veterancy_bonus * Fixed::from_num(level);
            damage = damage.saturating_mul(bonus);
        }

        let roll = variance.signed_unit().clamp(-Fixed::ONE, Fixed::ONE);
        damage = damage.saturating_mul(Fixed::ONE + roll * self.variance);

        let rounded = damage.round().to_num::<i64>();
        if rounded < 0 {
            tracing::error!(
                base_damage,
                ?damage_type,
                ?armor_type,
                rounded,
                "Negative damage before clamp"
            );
        }

        rounded.clamp(1, i64::from(u32::MAX)) as u32
    }

    /// Cosmetic classification of an applied hit.
    #[must_use]
    pub const fn classify_severity(&self, damage: u32, damage_type: DamageType) -> PresentationHint {
        if damage >= self.critical_threshold {
            PresentationHint::Critical
        } else {
            PresentationHint::Typed(damage_type)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EffectivenessEntry;

    /// Variance source that always returns one value.
    struct ConstantVariance(Fixed);

    impl VarianceSource for ConstantVariance {
        fn signed_unit(&mut self) -> Fixed {
            self.0
        }
    }

    #[test]
    fn test_builtin_matrix_values() {
        let matrix = EffectivenessMatrix::builtin();
        assert!(matrix.is_complete());
        assert_eq!(
            matrix.effectiveness(DamageType::Explosive, ArmorType::Light),
            Fixed::from_num(1.5)
        );
        assert_eq!(matrix.effectiveness(DamageType::Kinetic, ArmorType::Medium), Fixed::ONE);
        assert_eq!(
            matrix.effectiveness(DamageType::Energy, ArmorType::Shield),
            percent(180)
        );
        assert_eq!(
            matrix.effectiveness(DamageType::AntiArmor, ArmorType::Heavy),
            percent(160)
        );
    }

    #[test]
    fn test_empty_matrix_falls_back_to_one() {
        let matrix = EffectivenessMatrix::empty();
        assert!(!matrix.is_complete());
        assert_eq!(matrix.get(DamageType::Energy, ArmorType::Heavy), None);
        assert_eq!(matrix.effectiveness(DamageType::Energy, ArmorType::Heavy), Fixed::ONE);
    }

    #[test]
    fn test_matrix_from_config_merges() {
        let config = CombatConfig {
            effectiveness: vec![EffectivenessEntry {
                damage_type: DamageType::Kinetic,
                armor_type: ArmorType::Shield,
                multiplier_percent: 25,
            }],
            ..CombatConfig::default()
        };
        let matrix = EffectivenessMatrix::from_config(&config).unwrap();
        assert!(matrix.is_complete());
        assert_eq!(matrix.get(DamageType::Kinetic, ArmorType::Shield), Some(percent(25)));
        assert_eq!(matrix.get(DamageType::Kinetic, ArmorType::Light), Some(percent(120)));
    }

    #[test]
    fn test_matrix_strict_starts_empty() {
        let config = CombatConfig {
            strict_effectiveness: true,
            effectiveness: vec![EffectivenessEntry {
                damage_type: DamageType::Energy,
                armor_type: ArmorType::Light,
                multiplier_percent: 200,
            }],
            ..CombatConfig::default()
        };
        let matrix = EffectivenessMatrix::from_config(&config).unwrap();
        assert_eq!(matrix.get(DamageType::Energy, ArmorType::Light), Some(Fixed::from_num(2)));
        assert_eq!(matrix.get(DamageType::Energy, ArmorType::Medium), None);
    }

    #[test]
    fn test_matrix_rejects_zero_multiplier() {
        let config = CombatConfig {
            effectiveness: vec![EffectivenessEntry {
                damage_type: DamageType::Energy,
                armor_type: ArmorType::Light,
                multiplier_percent: 0,
            }],
            ..CombatConfig::default()
        };
        assert!(matches!(
            EffectivenessMatrix::from_config(&config),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_compute_damage_without_variance() {
        let model = DamageModel::default();
        let damage = model.compute_damage(
            100,
            DamageType::Explosive,
            ArmorType::Light,
            &SourceModifiers::NONE,
            &mut NoVariance,
        );
        assert_eq!(damage, 150);
    }

    #[test]
    fn test_compute_damage_stacks_modifiers() {
        let model = DamageModel::default();
        let source = SourceModifiers {
            damage_multiplier: Some(Fixed::from_num(2)),
            veterancy_level: Some(2),
        };
        // 50 * 1.0 * 2 * 1.2 = 120
        let damage = model.compute_damage(
            50,
            DamageType::Kinetic,
            ArmorType::Medium,
            &source,
            &mut NoVariance,
        );
        assert_eq!(damage, 120);
    }

    #[test]
    fn test_variance_bounds() {
        let model = DamageModel::default();
        let high = model.compute_damage(
            100,
            DamageType::Kinetic,
            ArmorType::Medium,
            &SourceModifiers::NONE,
            &mut ConstantVariance(Fixed::ONE),
        );
        let low = model.compute_damage(
            100,
            DamageType::Kinetic,
            ArmorType::Medium,
            &SourceModifiers::NONE,
            &mut ConstantVariance(-Fixed::ONE),
        );
        assert_eq!(high, 110);
        assert_eq!(low, 90);
    }

    #[test]
    fn test_seeded_variance_stays_in_band() {
        let model = DamageModel::default();
        let mut variance = SeededVariance::new(42);
        for _ in 0..500 {
            let damage = model.compute_damage(
                100,
                DamageType::Kinetic,
                ArmorType::Medium,
                &SourceModifiers::NONE,
                &mut variance,
            );
            assert!((90..=110).contains(&damage), "damage {damage} outside ±10%");
        }
    }

    #[test]
    fn test_seeded_variance_is_reproducible() {
        let mut a = SeededVariance::new(5);
        let mut b = SeededVariance::new(5);
        for _ in 0..20 {
            assert_eq!(a.signed_unit(), b.signed_unit());
        }
    }

    #[test]
    fn test_damage_floor() {
        let model = DamageModel::default();
        let damage = model.compute_damage(
            0,
            DamageType::Kinetic,
            ArmorType::Shield,
            &SourceModifiers::NONE,
            &mut ConstantVariance(-Fixed::ONE),
        );
        assert_eq!(damage, 1);

        let damage = model.compute_damage(
            1,
            DamageType::Energy,
            ArmorType::Heavy,
            &SourceModifiers::NONE.with_multiplier(Fixed::ZERO),
            &mut NoVariance,
        );
        assert_eq!(damage, 1);
    }

    #[test]
    fn test_classify_severity() {
        let model = DamageModel::default();
        assert_eq!(model.classify_severity(50, DamageType::Energy), PresentationHint::Critical);
        assert_eq!(
            model.classify_severity(49, DamageType::Energy),
            PresentationHint::Typed(DamageType::Energy)
        );
        assert_eq!(PresentationHint::Critical.color(), "#FFD700");
        assert_eq!(PresentationHint::Typed(DamageType::Kinetic).color(), "#FF0000");
    }
}
