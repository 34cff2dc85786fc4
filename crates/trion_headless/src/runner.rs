//! Scenario execution and reporting.
//!
//! [`ScenarioRunner`] spawns a scenario's characters into an [`Arena`] and
//! plays its steps in order. Rejections from the core (an empty slot, a
//! charge without enough Trion) are recorded as failed steps and the script
//! continues; only a malformed scenario aborts the run.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use trion_core::arena::Arena;
use trion_core::capacity::{CapacityBreakdown, CapacityModel};
use trion_core::catalog::{ItemCatalog, WeaponCategory};
use trion_core::character::Character;
use trion_core::components::{EntityId, Hand};
use trion_core::config::TrionConfig;
use trion_core::ledger::sanitize_amount;
use trion_core::loadout::{Loadout, LoadoutLedger};
use trion_core::math::Fixed;
use trion_core::split::{ChargeOutcome, EscalateOutcome};

use crate::scenario::{transform_for, Scenario, ScenarioError, Step};

fn to_f64(value: Fixed) -> f64 {
    value.to_num::<f64>()
}

/// Result of one scripted step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    /// Position in the script.
    pub index: usize,
    /// What the step did.
    pub action: String,
    /// Whether the core accepted it.
    pub ok: bool,
    /// Outcome or rejection reason.
    pub outcome: String,
    /// Subject's Trion balance after the step.
    pub trion: Option<f64>,
}

/// End-of-run state of one character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterSummary {
    /// Scenario name.
    pub name: String,
    /// Entity ID.
    pub id: EntityId,
    /// Team number.
    pub team: u8,
    /// Trion attribute.
    pub attribute: i32,
    /// Capacity before loadout locks.
    pub base_capacity: u32,
    /// Capacity after locks.
    pub capacity: u32,
    /// Capacity locked by the loadout.
    pub locked: u32,
    /// Trion balance.
    pub current: f64,
    /// Balance as a percentage of capacity.
    pub percentage: f64,
    /// Equipped item ids.
    pub loadout: Vec<String>,
    /// Item drawn in the main hand.
    pub main_hand: Option<String>,
    /// Item drawn in the sub hand.
    pub sub_hand: Option<String>,
    /// Split level of a charged weapon.
    pub split_level: Option<u8>,
    /// Whether the balance reached zero.
    pub defeated: bool,
}

impl CharacterSummary {
    fn new(name: &str, id: EntityId, character: &Character, arena: &Arena) -> Self {
        let res = character.resources();
        let ledger = character.loadout();
        let drawn = |hand| ledger.active_item(hand).map(ToString::to_string);
        Self {
            name: name.to_string(),
            id,
            team: character.team().0,
            attribute: character.attribute(),
            base_capacity: res.base_capacity(),
            capacity: res.capacity(),
            locked: res.locked(),
            current: to_f64(res.current()),
            percentage: to_f64(res.percentage()),
            loadout: ledger.loadout().items().map(ToString::to_string).collect(),
            main_hand: drawn(Hand::Main),
            sub_hand: drawn(Hand::Sub),
            split_level: arena.controller().level(id).map(|l| l.number()),
            defeated: character.is_defeated(),
        }
    }
}

/// Full report of a scenario run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    /// Scenario name.
    pub scenario: String,
    /// Ticks advanced.
    pub ticks: u64,
    /// Step results in script order.
    pub steps: Vec<StepRecord>,
    /// Shots handed off over the run.
    pub shots_fired: usize,
    /// Characters still in the arena, in ID order.
    pub characters: Vec<CharacterSummary>,
    /// Final [`Arena::state_hash`].
    pub state_hash: u64,
}

impl RunReport {
    /// Number of steps the core rejected.
    #[must_use]
    pub fn failed_steps(&self) -> usize {
        self.steps.iter().filter(|s| !s.ok).count()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Scenario: {}", self.scenario)?;
        writeln!(f, "{}", "=".repeat(50))?;
        for step in &self.steps {
            let mark = if step.ok { "ok " } else { "ERR" };
            write!(f, "[{:>3}] {mark} {:<28} {}", step.index, step.action, step.outcome)?;
            if let Some(trion) = step.trion {
                write!(f, " (trion {trion:.2})")?;
            }
            writeln!(f)?;
        }
        writeln!(f, "{}", "=".repeat(50))?;
        for c in &self.characters {
            writeln!(
                f,
                "{} #{} team {}: {:.2}/{} ({:.1}%), locked {}{}{}",
                c.name,
                c.id,
                c.team,
                c.current,
                c.capacity,
                c.percentage,
                c.locked,
                c.split_level
                    .map(|l| format!(", split level {l}"))
                    .unwrap_or_default(),
                if c.defeated { ", DEFEATED" } else { "" },
            )?;
        }
        writeln!(
            f,
            "Ticks: {}  Shots: {}  Failed steps: {}",
            self.ticks,
            self.shots_fired,
            self.failed_steps()
        )?;
        write!(f, "State hash: {:016x}", self.state_hash)
    }
}

/// Plays scenarios against an arena.
#[derive(Debug)]
pub struct ScenarioRunner {
    arena: Arena,
    names: BTreeMap<String, EntityId>,
    shots_fired: usize,
}

impl ScenarioRunner {
    /// Create a runner with an empty arena.
    #[must_use]
    pub fn new(config: TrionConfig, catalog: Arc<ItemCatalog>) -> Self {
        Self {
            arena: Arena::new(config, catalog),
            names: BTreeMap::new(),
            shots_fired: 0,
        }
    }

    /// The arena being driven.
    #[must_use]
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Entity ID of a named character.
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<EntityId> {
        self.names.get(name).copied()
    }

    /// Spawn and equip every character of a scenario.
    ///
    /// A loadout that names unknown items or does not fit is an error here,
    /// unlike the same problem in a scripted step.
    pub fn setup(&mut self, scenario: &Scenario) -> Result<(), ScenarioError> {
        scenario.validate()?;
        for setup in &scenario.characters {
            let id = self
                .arena
                .spawn_character(setup.attribute, setup.team_id(), setup.transform());
            self.names.insert(setup.name.clone(), id);
            let loadout = setup.loadout.to_loadout()?;
            if !loadout.is_empty() {
                self.arena.equip(id, loadout)?;
            }
        }
        tracing::debug!(characters = self.names.len(), "Scenario setup complete");
        Ok(())
    }

    /// Execute one step.
    pub fn execute(&mut self, index: usize, step: &Step) -> Result<StepRecord, ScenarioError> {
        let subject = match step.subject() {
            Some(name) => Some(self.id_of(name).ok_or_else(|| {
                ScenarioError::UnknownCharacter {
                    step: index,
                    name: name.to_string(),
                }
            })?),
            None => None,
        };

        let result = match (step, subject) {
            (Step::Tick(count), _) => Ok(self.tick(*count)),
            (_, Some(id)) => self.act(id, step),
            (_, None) => Err("step has no subject".to_string()),
        };

        let trion = subject
            .and_then(|id| self.arena.character(id))
            .map(|c| to_f64(c.resources().current()));
        let record = match result {
            Ok(outcome) => StepRecord {
                index,
                action: step.label(),
                ok: true,
                outcome,
                trion,
            },
            Err(reason) => {
                tracing::debug!(index, reason = %reason, "Step rejected");
                StepRecord {
                    index,
                    action: step.label(),
                    ok: false,
                    outcome: reason,
                    trion,
                }
            }
        };
        Ok(record)
    }

    fn act(&mut self, id: EntityId, step: &Step) -> Result<String, String> {
        let arena = &mut self.arena;
        match step {
            Step::Equip { loadout, .. } => {
                let loadout = loadout.to_loadout().map_err(|e| e.to_string())?;
                arena
                    .equip(id, loadout)
                    .map(|cost| format!("locked {cost}"))
                    .map_err(|e| e.to_string())
            }
            Step::Draw { hand, slot, .. } => arena
                .draw(id, *hand, *slot)
                .map(|item| format!("drew {item}"))
                .map_err(|e| e.to_string()),
            Step::Holster { hand, .. } => arena
                .holster(id, *hand)
                .map(|item| match item {
                    Some(item) => format!("holstered {item}"),
                    None => "hand was empty".to_string(),
                })
                .map_err(|e| e.to_string()),
            Step::Move {
                position, facing, ..
            } => arena
                .set_transform(id, transform_for(*position, *facing))
                .map(|()| "moved".to_string())
                .map_err(|e| e.to_string()),
            Step::Charge(_) => arena
                .charge(id)
                .map(|outcome| match outcome {
                    ChargeOutcome::Charged { cost, cubes } => {
                        format!("charged for {cost}, {cubes} cubes")
                    }
                    ChargeOutcome::AlreadyCharged { level } => {
                        format!("already charged at level {}", level.number())
                    }
                })
                .map_err(|e| e.to_string()),
            Step::Escalate(_) => arena
                .escalate(id)
                .map(|outcome| match outcome {
                    EscalateOutcome::Escalated { level, cubes } => {
                        format!("level {}, {cubes} cubes", level.number())
                    }
                    EscalateOutcome::AlreadyMaximal => "already maximal".to_string(),
                })
                .map_err(|e| e.to_string()),
            Step::Fire(_) => arena
                .fire(id)
                .map(|r| {
                    format!(
                        "{} projectiles x {:.4} = {:.4}",
                        r.projectiles,
                        to_f64(r.per_projectile),
                        to_f64(r.total)
                    )
                })
                .map_err(|e| e.to_string()),
            Step::Cancel(_) => Ok(if arena.cancel(id) {
                "charge dropped".to_string()
            } else {
                "nothing charged".to_string()
            }),
            Step::Hit { amount, .. } => arena
                .apply_hit(id, sanitize_amount(*amount, "scenario_hit"))
                .map(|removed| format!("removed {:.4}", to_f64(removed)))
                .map_err(|e| e.to_string()),
            Step::Heal { amount, .. } => arena
                .heal(id, sanitize_amount(*amount, "scenario_heal"))
                .map(|added| format!("restored {:.4}", to_f64(added)))
                .map_err(|e| e.to_string()),
            Step::Refresh(_) => arena
                .refresh_resources(id)
                .map(|cost| format!("fresh record, locked {cost}"))
                .map_err(|e| e.to_string()),
            Step::Despawn(_) => arena
                .despawn_character(id)
                .map(|()| "despawned".to_string())
                .map_err(|e| e.to_string()),
            Step::Tick(_) => Err("tick has no subject".to_string()),
        }
    }

    fn tick(&mut self, count: u32) -> String {
        let mut shots = 0usize;
        let mut reconciled = 0usize;
        let mut defeated: Vec<EntityId> = Vec::new();
        for _ in 0..count {
            let events = self.arena.tick();
            shots += events.shots.len();
            reconciled += events.split_events.len();
            defeated.extend(events.defeated);
        }
        self.shots_fired += shots;

        let mut outcome = format!("tick {}, {shots} shots", self.arena.tick_count());
        if reconciled > 0 {
            outcome.push_str(&format!(", {reconciled} split events"));
        }
        for id in defeated {
            let name = self
                .names
                .iter()
                .find(|(_, v)| **v == id)
                .map_or("?", |(k, _)| k.as_str());
            outcome.push_str(&format!(", {name} defeated"));
        }
        outcome
    }

    /// Summaries of the characters still in the arena.
    #[must_use]
    pub fn summaries(&self) -> Vec<CharacterSummary> {
        let mut by_id: Vec<(&String, EntityId)> =
            self.names.iter().map(|(name, &id)| (name, id)).collect();
        by_id.sort_by_key(|(_, id)| *id);
        by_id
            .into_iter()
            .filter_map(|(name, id)| {
                self.arena
                    .character(id)
                    .map(|c| CharacterSummary::new(name, id, c, &self.arena))
            })
            .collect()
    }

    /// Set up and play a whole scenario.
    pub fn run(mut self, scenario: &Scenario) -> Result<RunReport, ScenarioError> {
        tracing::info!(scenario = %scenario.name, steps = scenario.steps.len(), "Running scenario");
        self.setup(scenario)?;

        let mut steps = Vec::with_capacity(scenario.steps.len());
        for (index, step) in scenario.steps.iter().enumerate() {
            steps.push(self.execute(index, step)?);
        }

        let report = RunReport {
            scenario: scenario.name.clone(),
            ticks: self.arena.tick_count(),
            steps,
            shots_fired: self.shots_fired,
            characters: self.summaries(),
            state_hash: self.arena.state_hash(),
        };
        tracing::info!(
            failed = report.failed_steps(),
            hash = report.state_hash,
            "Scenario finished"
        );
        Ok(report)
    }
}

/// Capacity breakdown for one attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapacityReport {
    /// Attribute queried.
    pub attribute: i32,
    /// Breakdown of its capacity.
    pub breakdown: CapacityBreakdown,
}

impl CapacityReport {
    /// Compute the breakdown.
    #[must_use]
    pub fn new(model: &CapacityModel, attribute: i32) -> Self {
        Self {
            attribute,
            breakdown: model.breakdown(attribute),
        }
    }
}

impl fmt::Display for CapacityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.breakdown;
        writeln!(f, "Attribute: {}", self.attribute)?;
        writeln!(f, "  capacity:  {}", b.capacity)?;
        writeln!(f, "  basic:     {}", b.basic)?;
        writeln!(f, "  equipment: {}", b.equipment)?;
        write!(f, "  combat:    {}", b.combat)
    }
}

/// Cost of a loadout against one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CostReport {
    /// Attribute checked against.
    pub attribute: i32,
    /// Capacity at that attribute.
    pub capacity: u32,
    /// Total set cost.
    pub set_cost: u32,
    /// Per-item costs in slot order.
    pub items: Vec<(String, u32)>,
    /// Whether the set fits the capacity.
    pub affordable: bool,
    /// Capacity left after locking the set.
    pub remaining: u32,
}

impl CostReport {
    /// Price a loadout.
    pub fn new(
        catalog: Arc<ItemCatalog>,
        model: &CapacityModel,
        loadout: &Loadout,
        attribute: i32,
    ) -> trion_core::error::Result<Self> {
        let ledger = LoadoutLedger::new(catalog);
        let set_cost = ledger.set_cost(loadout)?;
        let items = loadout
            .items()
            .map(|id| {
                ledger
                    .catalog()
                    .require(id)
                    .map(|spec| (id.to_string(), spec.set_cost))
            })
            .collect::<trion_core::error::Result<Vec<_>>>()?;
        let capacity = model.capacity(attribute);
        Ok(Self {
            attribute,
            capacity,
            set_cost,
            items,
            affordable: ledger.can_afford(loadout, capacity),
            remaining: capacity.saturating_sub(set_cost),
        })
    }
}

impl fmt::Display for CostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (id, cost) in &self.items {
            writeln!(f, "  {id:<12} {cost:>4}")?;
        }
        writeln!(f, "Set cost: {}", self.set_cost)?;
        writeln!(f, "Capacity at attribute {}: {}", self.attribute, self.capacity)?;
        if self.affordable {
            write!(f, "Affordable, {} capacity remaining", self.remaining)
        } else {
            write!(f, "NOT affordable, short by {}", self.set_cost - self.capacity)
        }
    }
}

/// One catalog row for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogRow {
    /// Item id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: WeaponCategory,
    /// Capacity locked while equipped.
    pub set_cost: u32,
    /// Trion spent per activation.
    pub activation_cost: u32,
    /// Damage per activation.
    pub damage: u32,
    /// Range in world units.
    pub range: u32,
}

/// Catalog contents in id order.
#[must_use]
pub fn catalog_rows(catalog: &ItemCatalog) -> Vec<CatalogRow> {
    catalog
        .iter()
        .map(|spec| CatalogRow {
            id: spec.id.to_string(),
            name: spec.name.clone(),
            category: spec.category,
            set_cost: spec.set_cost,
            activation_cost: spec.activation_cost,
            damage: spec.damage,
            range: spec.range,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> ScenarioRunner {
        ScenarioRunner::new(TrionConfig::default(), Arc::new(ItemCatalog::standard()))
    }

    #[test]
    fn test_walkthrough_report() {
        let report = runner().run(&Scenario::asteroid_walkthrough()).unwrap();
        assert_eq!(report.failed_steps(), 0);
        assert_eq!(report.ticks, 2);
        assert_eq!(report.shots_fired, 9);
        assert_eq!(report.characters.len(), 1);
        assert_eq!(report.characters[0].locked, 24);
        assert_eq!(report.characters[0].split_level, None);
        assert_eq!(report.steps[1].outcome, "charged for 8, 4 cubes");
    }

    #[test]
    fn test_rejected_step_is_recorded() {
        let mut r = runner();
        r.setup(&Scenario::asteroid_walkthrough()).unwrap();
        let record = r.execute(0, &Step::Fire("shooter".to_string())).unwrap();
        assert!(!record.ok);
        assert!(record.outcome.contains("not charged"));
    }

    #[test]
    fn test_unknown_name_is_fatal() {
        let mut r = runner();
        assert!(matches!(
            r.execute(3, &Step::Charge("ghost".to_string())),
            Err(ScenarioError::UnknownCharacter { step: 3, .. })
        ));
    }

    #[test]
    fn test_capacity_report() {
        let report = CapacityReport::new(&CapacityModel::default(), 5);
        assert_eq!(report.breakdown.capacity, 475);
        assert!(report.to_string().contains("475"));
    }

    #[test]
    fn test_cost_report_shortfall() {
        let loadout = Loadout::from_ids(&["kogetsu", "meteora"], &["egret"]).unwrap();
        let report = CostReport::new(
            Arc::new(ItemCatalog::standard()),
            &CapacityModel::default(),
            &loadout,
            2,
        )
        .unwrap();
        assert_eq!(report.set_cost, 60);
        assert_eq!(report.capacity, 30);
        assert!(!report.affordable);
        assert_eq!(report.remaining, 0);
        assert!(report.to_string().contains("short by 30"));
    }

    #[test]
    fn test_catalog_rows_sorted() {
        let rows = catalog_rows(&ItemCatalog::standard());
        assert_eq!(rows.len(), 11);
        assert!(rows.windows(2).all(|w| w[0].id < w[1].id));
    }
}
