//! Scenario runner: the external tick loop around the tactical core.
//!
//! Builds terrain, the sight grid and a combat resolver from a [`Scenario`],
//! resolves its route queries, then fires the volley schedule at 20 ticks per
//! second until every shot has landed or the tick budget runs out.

use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use tactics_core::combat::{CombatResolver, CombatTickReport};
use tactics_core::combatant::{
    Archetype, Combatant, Damageable, EntityId, TeamId, HIT_EXPERIENCE, KILL_EXPERIENCE,
};
use tactics_core::damage::SeededVariance;
use tactics_core::line_of_sight::LineOfSightGrid;
use tactics_core::math::{Fixed, Vec2Fixed};
use tactics_core::pathfinding::PathFinder;
use tactics_core::projectile::{FireOrder, ProjectileKind, ProjectileTarget, ShotSource};
use tactics_core::telemetry::CombatStats;
use tactics_core::terrain::{GridCoord, TerrainMap};

use crate::scenario::{RouteRequest, Scenario, ScenarioError, Volley};

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 20;

/// Duration of one tick in seconds.
#[must_use]
pub fn tick_dt() -> Fixed {
    Fixed::ONE / Fixed::from_num(TICK_RATE)
}

/// Ticks between shots for a combatant at its current level, at least one.
#[must_use]
pub fn cooldown_ticks(unit: &Combatant) -> u64 {
    let ms = u64::from(unit.attack_cooldown_ms());
    (ms * u64::from(TICK_RATE) / 1000).max(1)
}

/// The next shot of a volley.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScheduledShot {
    /// Tick the shot is attempted on.
    pub tick: u64,
    /// Firing combatant.
    pub shooter: EntityId,
    /// Intended victim.
    pub target: EntityId,
    /// Projectile preset.
    pub kind: ProjectileKind,
    /// Shots left in the volley, this one included.
    pub remaining: u32,
}

/// What happened to a scheduled shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotOutcome {
    /// Launched.
    Fired,
    /// Sight line occluded.
    BlockedBySight,
    /// Target beyond weapon range.
    OutOfRange,
    /// Shooter missing or destroyed.
    ShooterDown,
    /// Target missing or destroyed.
    TargetDown,
}

/// Tally of shot outcomes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VolleySummary {
    /// Shots launched.
    pub fired: u32,
    /// Shots withheld for lack of sight.
    pub blocked_by_sight: u32,
    /// Shots withheld for range.
    pub out_of_range: u32,
    /// Shots skipped because the shooter was gone.
    pub shooter_down: u32,
    /// Shots skipped because the target was gone.
    pub target_down: u32,
}

impl VolleySummary {
    fn record(&mut self, outcome: ShotOutcome) {
        let slot = match outcome {
            ShotOutcome::Fired => &mut self.fired,
            ShotOutcome::BlockedBySight => &mut self.blocked_by_sight,
            ShotOutcome::OutOfRange => &mut self.out_of_range,
            ShotOutcome::ShooterDown => &mut self.shooter_down,
            ShotOutcome::TargetDown => &mut self.target_down,
        };
        *slot += 1;
    }

    /// Every shot attempted, fired or not.
    #[must_use]
    pub fn attempted(&self) -> u32 {
        self.fired + self.blocked_by_sight + self.out_of_range + self.shooter_down + self.target_down
    }
}

/// Result of one route query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteReport {
    /// Label from the scenario.
    pub name: String,
    /// Start tile.
    pub from: (i32, i32),
    /// Goal tile.
    pub to: (i32, i32),
    /// Whether a walkable route exists.
    pub reachable: bool,
    /// Whether `waypoints` were smoothed.
    pub smoothed: bool,
    /// World-space waypoints, excluding the start.
    pub waypoints: Vec<(i32, i32)>,
    /// Movement cost of the unsmoothed route.
    pub cost: Option<f64>,
}

/// A destroyed combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KillRecord {
    /// Tick of destruction.
    pub tick: u64,
    /// Destroyed combatant.
    pub target: EntityId,
    /// Credited shooter.
    pub source: Option<EntityId>,
}

/// Final state of one combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Id.
    pub id: EntityId,
    /// Team.
    pub team: TeamId,
    /// Archetype.
    pub archetype: Archetype,
    /// Remaining health.
    pub health: u32,
    /// Maximum health.
    pub max_health: u32,
    /// Still standing.
    pub alive: bool,
    /// Veterancy level.
    pub level: u32,
    /// Accumulated experience.
    pub experience: u32,
}

impl From<&Combatant> for UnitReport {
    fn from(unit: &Combatant) -> Self {
        Self {
            id: unit.id,
            team: unit.team,
            archetype: unit.archetype,
            health: unit.health,
            max_health: unit.max_health,
            alive: unit.is_alive(),
            level: unit.veterancy.level(),
            experience: unit.veterancy.experience(),
        }
    }
}

/// Everything a run produced, printed as JSON by the CLI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Route query results.
    pub routes: Vec<RouteReport>,
    /// Shot outcomes.
    pub volleys: VolleySummary,
    /// Number of damage applications.
    pub hits: usize,
    /// Destroyed combatants in order.
    pub kills: Vec<KillRecord>,
    /// Final combatant states.
    pub units: Vec<UnitReport>,
    /// Resolver totals.
    pub stats: CombatStats,
    /// Hash of the final combat state.
    pub state_hash: u64,
}

impl RunReport {
    /// Pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Surviving combatants on `team`.
    #[must_use]
    pub fn survivors(&self, team: TeamId) -> usize {
        self.units.iter().filter(|u| u.team == team && u.alive).count()
    }
}

/// Drives one scenario to completion.
#[derive(Debug)]
pub struct ScenarioRunner {
    name: String,
    seed: u64,
    max_ticks: u64,
    terrain: TerrainMap,
    sight: LineOfSightGrid,
    tile_size: Fixed,
    resolver: CombatResolver<SeededVariance>,
    units: Vec<Combatant>,
    routes: Vec<RouteRequest>,
    schedule: VecDeque<ScheduledShot>,
    tick: u64,
    volleys: VolleySummary,
    hits: usize,
    kills: Vec<KillRecord>,
}

impl ScenarioRunner {
    /// Build a runner using the scenario's own seed.
    pub fn new(scenario: &Scenario) -> Result<Self, ScenarioError> {
        Self::with_seed(scenario, scenario.seed)
    }

    /// Build a runner with an explicit seed.
    ///
    /// One seeded stream feeds, in order, rock passability, sight blocking
    /// and the damage variance seed.
    pub fn with_seed(scenario: &Scenario, seed: u64) -> Result<Self, ScenarioError> {
        scenario.validate()?;

        let config = &scenario.config;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let terrain = scenario.terrain(&mut rng)?;
        let sight = LineOfSightGrid::build(&terrain, config.tile_size, &config.sight, &mut rng);
        let resolver =
            CombatResolver::from_config(&config.combat, SeededVariance::new(rng.gen()))?;

        let units: Vec<Combatant> = scenario
            .units
            .iter()
            .map(|u| {
                Combatant::new(
                    u.id,
                    u.team,
                    u.archetype,
                    Vec2Fixed::from_ints(u.position.0, u.position.1),
                )
            })
            .collect();
        let schedule = expand_schedule(&scenario.volleys);

        tracing::info!(
            scenario = %scenario.name,
            seed,
            units = units.len(),
            shots = schedule.iter().map(|s| u64::from(s.remaining)).sum::<u64>(),
            blocked_cells = sight.blocked_count(),
            "Scenario ready"
        );

        Ok(Self {
            name: scenario.name.clone(),
            seed,
            max_ticks: scenario.max_ticks,
            terrain,
            sight,
            tile_size: Fixed::from_num(config.tile_size),
            resolver,
            units,
            routes: scenario.routes.clone(),
            schedule,
            tick: 0,
            volleys: VolleySummary::default(),
            hits: 0,
            kills: Vec::new(),
        })
    }

    /// Terrain after the passability roll.
    #[must_use]
    pub fn terrain(&self) -> &TerrainMap {
        &self.terrain
    }

    /// Weapon sight grid.
    #[must_use]
    pub fn sight(&self) -> &LineOfSightGrid {
        &self.sight
    }

    /// Combatants in placement order.
    #[must_use]
    pub fn units(&self) -> &[Combatant] {
        &self.units
    }

    /// Combat resolver.
    #[must_use]
    pub fn resolver(&self) -> &CombatResolver<SeededVariance> {
        &self.resolver
    }

    /// Ticks simulated so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Shots not yet attempted.
    #[must_use]
    pub fn pending_shots(&self) -> usize {
        self.schedule.iter().map(|s| s.remaining as usize).sum()
    }

    /// Pathfinder over this runner's terrain.
    #[must_use]
    pub fn pathfinder(&self) -> PathFinder<'_> {
        PathFinder::new(&self.terrain, self.tile_size)
    }

    /// Resolve one route query.
    #[must_use]
    pub fn plan_route(&self, request: &RouteRequest) -> RouteReport {
        let finder = self.pathfinder();
        let from = GridCoord::new(request.from.0, request.from.1);
        let to = GridCoord::new(request.to.0, request.to.1);
        let unreachable = RouteReport {
            name: request.name.clone(),
            from: request.from,
            to: request.to,
            reachable: false,
            smoothed: request.smooth,
            waypoints: Vec::new(),
            cost: None,
        };

        if !self.terrain.in_bounds(from) || !self.terrain.in_bounds(to) {
            tracing::warn!(route = %request.name, %from, %to, "Route endpoint off the map");
            return unreachable;
        }

        match finder.find_path(from, to) {
            Ok(path) => {
                let cost = finder.path_cost(from, &path).map(|c| c.to_num::<f64>());
                let path = if request.smooth {
                    finder.smooth_path(&path)
                } else {
                    path
                };
                RouteReport {
                    waypoints: path
                        .iter()
                        .map(|p| (p.x.to_num::<i32>(), p.y.to_num::<i32>()))
                        .collect(),
                    reachable: true,
                    cost,
                    ..unreachable
                }
            }
            Err(err) => {
                tracing::warn!(route = %request.name, %err, "Route unreachable");
                unreachable
            }
        }
    }

    /// Resolve every route query in the scenario.
    #[must_use]
    pub fn plan_routes(&self) -> Vec<RouteReport> {
        self.routes.iter().map(|r| self.plan_route(r)).collect()
    }

    /// True once every shot is attempted and nothing is left in the air.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.schedule.is_empty() && self.resolver.projectiles().iter().all(|p| !p.is_in_flight())
    }

    /// Advance one tick: fire due shots, resolve combat, award experience.
    pub fn step(&mut self) -> CombatTickReport {
        while let Some(shot) = self.schedule.front().copied() {
            if shot.tick > self.tick {
                break;
            }
            self.schedule.pop_front();
            let outcome = self.fire(shot);
            self.volleys.record(outcome);

            if shot.remaining > 1 {
                let interval = self
                    .units
                    .iter()
                    .find(|u| u.id == shot.shooter)
                    .map_or(1, cooldown_ticks);
                self.queue(ScheduledShot {
                    tick: self.tick + interval,
                    remaining: shot.remaining - 1,
                    ..shot
                });
            }
        }

        let report = self.resolver.tick(tick_dt(), &mut self.units);
        self.hits += report.hits.len();

        for hit in &report.hits {
            if hit.destroyed {
                self.kills.push(KillRecord {
                    tick: self.tick,
                    target: hit.target,
                    source: hit.source,
                });
            }
            let award = if hit.destroyed {
                KILL_EXPERIENCE
            } else {
                HIT_EXPERIENCE
            };
            let shooter = hit
                .source
                .and_then(|id| self.units.iter_mut().find(|u| u.id == id))
                .filter(|u| u.is_alive());
            if let Some(shooter) = shooter {
                let promoted = shooter.gain_experience(award);
                if promoted > 0 {
                    tracing::info!(
                        unit = shooter.id,
                        level = shooter.veterancy.level(),
                        max_health = shooter.max_health,
                        tick = self.tick,
                        "Unit promoted"
                    );
                }
            }
        }

        self.tick += 1;
        report
    }

    /// Insert after every shot due on the same tick or earlier.
    fn queue(&mut self, shot: ScheduledShot) {
        let at = self.schedule.partition_point(|s| s.tick <= shot.tick);
        self.schedule.insert(at, shot);
    }

    /// Attempt one scheduled shot.
    pub fn fire(&mut self, shot: ScheduledShot) -> ShotOutcome {
        let Some(shooter) = self.units.iter().find(|u| u.id == shot.shooter && u.is_alive()) else {
            return ShotOutcome::ShooterDown;
        };
        let Some(target) = self.units.iter().find(|u| u.id == shot.target && u.is_alive()) else {
            return ShotOutcome::TargetDown;
        };

        let reach = shooter.attack_range(self.tile_size.to_num::<u32>());
        let range = Fixed::saturating_from_num(reach);
        let outcome = if shooter.position.distance_squared(target.position)
            > range.saturating_mul(range)
        {
            ShotOutcome::OutOfRange
        } else if !self.sight.has_line_of_sight(shooter.position, target.position) {
            ShotOutcome::BlockedBySight
        } else {
            ShotOutcome::Fired
        };

        if outcome == ShotOutcome::Fired {
            let order = FireOrder::preset(
                shot.kind,
                shooter.position,
                ProjectileTarget::Entity {
                    id: target.id,
                    position: target.position,
                },
            )
            .with_damage_type(shooter.weapon_damage_type())
            .with_source(ShotSource {
                id: shooter.id,
                team: shooter.team,
                modifiers: shooter.source_modifiers(),
            });
            self.resolver.submit_projectile(order);
        }

        tracing::trace!(
            tick = self.tick,
            shooter = shot.shooter,
            target = shot.target,
            ?outcome,
            "Shot attempted"
        );
        outcome
    }

    /// Run to completion or `max_ticks` (the scenario's limit if `None`).
    pub fn run(&mut self, max_ticks: Option<u64>) -> RunReport {
        let routes = self.plan_routes();
        let limit = max_ticks.unwrap_or(self.max_ticks);

        while self.tick < limit && !self.is_finished() {
            self.step();
        }

        if !self.schedule.is_empty() {
            tracing::warn!(
                pending = self.pending_shots(),
                limit,
                "Tick limit reached with shots pending"
            );
        }

        self.report(routes)
    }

    /// Hash of combatant state and damage totals.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.tick.hash(&mut hasher);
        for unit in &self.units {
            (unit.id, unit.health, unit.veterancy.experience()).hash(&mut hasher);
        }
        self.resolver.stats().total_damage_dealt.hash(&mut hasher);
        hasher.finish()
    }

    fn report(&self, routes: Vec<RouteReport>) -> RunReport {
        let report = RunReport {
            scenario: self.name.clone(),
            seed: self.seed,
            ticks: self.tick,
            routes,
            volleys: self.volleys,
            hits: self.hits,
            kills: self.kills.clone(),
            units: self.units.iter().map(UnitReport::from).collect(),
            stats: self.resolver.stats(),
            state_hash: self.state_hash(),
        };
        tracing::info!(
            ticks = report.ticks,
            fired = report.volleys.fired,
            hits = report.hits,
            kills = report.kills.len(),
            "Run complete"
        );
        report
    }
}

/// Order volleys by their first tick.
///
/// Volleys starting on the same tick keep their declaration order. Repeats
/// are queued as each shot is attempted, spaced by the shooter's cooldown at
/// that moment.
#[must_use]
pub fn expand_schedule(volleys: &[Volley]) -> VecDeque<ScheduledShot> {
    let mut shots: Vec<ScheduledShot> = volleys
        .iter()
        .map(|volley| ScheduledShot {
            tick: volley.tick,
            shooter: volley.shooter,
            target: volley.target,
            kind: volley.kind,
            remaining: volley.repeat,
        })
        .collect();
    shots.sort_by_key(|s| s.tick);
    shots.into()
}
