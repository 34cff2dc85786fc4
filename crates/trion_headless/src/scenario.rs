//! Scenario definitions for headless runs.
//!
//! A scenario names a set of characters and an ordered script of steps to
//! play against an [`trion_core::arena::Arena`]. Scenarios are written in
//! RON:
//!
//! ```ron
//! Scenario(
//!     name: "Asteroid split",
//!     characters: [
//!         CharacterSetup(
//!             name: "shooter",
//!             attribute: 5,
//!             loadout: LoadoutSetup(primary: ["asteroid"]),
//!         ),
//!     ],
//!     steps: [
//!         Draw(who: "shooter", hand: Main, slot: 0),
//!         Charge("shooter"),
//!         Fire("shooter"),
//!         Tick(1),
//!     ],
//! )
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trion_core::components::{Hand, TeamId, Transform};
use trion_core::error::TrionError;
use trion_core::loadout::Loadout;
use trion_core::math::Vec3Fixed;

/// Errors that can occur when loading or running a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Two characters share a name.
    #[error("Duplicate character name: {0}")]
    DuplicateCharacter(String),
    /// A step names a character the scenario never sets up.
    #[error("Step {step} references unknown character '{name}'")]
    UnknownCharacter {
        /// Index of the offending step.
        step: usize,
        /// Name it used.
        name: String,
    },
    /// Setup rejected by the core (bad loadout, unknown item).
    #[error(transparent)]
    Core(#[from] TrionError),
}

/// Integer world coordinates used in scenario files.
pub type GridPoint = (i32, i32, i32);

fn to_vec(point: GridPoint) -> Vec3Fixed {
    Vec3Fixed::from_ints(point.0, point.1, point.2)
}

/// Transform for a scenario position and optional facing.
#[must_use]
pub fn transform_for(position: GridPoint, facing: Option<GridPoint>) -> Transform {
    match facing {
        Some(dir) => Transform::facing(to_vec(position), to_vec(dir)),
        None => Transform::at(to_vec(position)),
    }
}

/// Item ids per slot group, filled from slot 0.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadoutSetup {
    /// Main-hand items.
    #[serde(default)]
    pub primary: Vec<String>,
    /// Sub-hand items.
    #[serde(default)]
    pub secondary: Vec<String>,
}

impl LoadoutSetup {
    /// Build the core loadout. More than four ids per group is an error.
    pub fn to_loadout(&self) -> trion_core::error::Result<Loadout> {
        let primary: Vec<&str> = self.primary.iter().map(String::as_str).collect();
        let secondary: Vec<&str> = self.secondary.iter().map(String::as_str).collect();
        Loadout::from_ids(&primary, &secondary)
    }
}

/// One combatant in a scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterSetup {
    /// Name steps refer to.
    pub name: String,
    /// Trion attribute.
    pub attribute: i32,
    /// Team number.
    #[serde(default)]
    pub team: u8,
    /// Starting position.
    #[serde(default)]
    pub position: GridPoint,
    /// Starting facing; the default forward axis when absent.
    #[serde(default)]
    pub facing: Option<GridPoint>,
    /// Loadout equipped at spawn.
    #[serde(default)]
    pub loadout: LoadoutSetup,
}

impl CharacterSetup {
    /// Team id of this character.
    #[must_use]
    pub const fn team_id(&self) -> TeamId {
        TeamId(self.team)
    }

    /// Spawn transform.
    #[must_use]
    pub fn transform(&self) -> Transform {
        transform_for(self.position, self.facing)
    }
}

/// A scripted action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Step {
    /// Replace a character's loadout.
    Equip {
        /// Character name.
        who: String,
        /// New loadout.
        loadout: LoadoutSetup,
    },
    /// Draw an item into a hand.
    Draw {
        /// Character name.
        who: String,
        /// Hand to draw with.
        hand: Hand,
        /// Slot inside the hand's group.
        slot: usize,
    },
    /// Put away a hand's item.
    Holster {
        /// Character name.
        who: String,
        /// Hand to empty.
        hand: Hand,
    },
    /// Move or turn a character.
    Move {
        /// Character name.
        who: String,
        /// New position.
        position: GridPoint,
        /// New facing.
        #[serde(default)]
        facing: Option<GridPoint>,
    },
    /// Charge the drawn splitting weapon.
    Charge(String),
    /// Raise the split level.
    Escalate(String),
    /// Fire the charged weapon.
    Fire(String),
    /// Drop the charged weapon without firing.
    Cancel(String),
    /// Damage a character. Invalid amounts are treated as zero.
    Hit {
        /// Character name.
        who: String,
        /// Damage amount.
        amount: f64,
    },
    /// Heal a character. Invalid amounts are treated as zero.
    Heal {
        /// Character name.
        who: String,
        /// Heal amount.
        amount: f64,
    },
    /// Replace a character's resource record with a fresh one.
    Refresh(String),
    /// Remove a character from the arena.
    Despawn(String),
    /// Advance the arena.
    Tick(u32),
}

impl Step {
    /// Character the step acts on, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::Equip { who, .. }
            | Self::Draw { who, .. }
            | Self::Holster { who, .. }
            | Self::Move { who, .. }
            | Self::Hit { who, .. }
            | Self::Heal { who, .. } => Some(who),
            Self::Charge(who)
            | Self::Escalate(who)
            | Self::Fire(who)
            | Self::Cancel(who)
            | Self::Refresh(who)
            | Self::Despawn(who) => Some(who),
            Self::Tick(_) => None,
        }
    }

    /// Short human-readable label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Equip { who, .. } => format!("equip {who}"),
            Self::Draw { who, hand, slot } => format!("draw {who} {hand:?}[{slot}]"),
            Self::Holster { who, hand } => format!("holster {who} {hand:?}"),
            Self::Move { who, position, .. } => format!("move {who} to {position:?}"),
            Self::Charge(who) => format!("charge {who}"),
            Self::Escalate(who) => format!("escalate {who}"),
            Self::Fire(who) => format!("fire {who}"),
            Self::Cancel(who) => format!("cancel {who}"),
            Self::Hit { who, amount } => format!("hit {who} for {amount}"),
            Self::Heal { who, amount } => format!("heal {who} for {amount}"),
            Self::Refresh(who) => format!("refresh {who}"),
            Self::Despawn(who) => format!("despawn {who}"),
            Self::Tick(n) => format!("tick x{n}"),
        }
    }
}

/// A complete scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Characters spawned before the first step, in order.
    pub characters: Vec<CharacterSetup>,
    /// Script.
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check that names are unique and every step names a known character.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let mut names = BTreeSet::new();
        for setup in &self.characters {
            if !names.insert(setup.name.as_str()) {
                return Err(ScenarioError::DuplicateCharacter(setup.name.clone()));
            }
        }
        for (step, action) in self.steps.iter().enumerate() {
            if let Some(name) = action.subject() {
                if !names.contains(name) {
                    return Err(ScenarioError::UnknownCharacter {
                        step,
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The asteroid walkthrough: one character charges, escalates and fires.
    #[must_use]
    pub fn asteroid_walkthrough() -> Self {
        let who = || "shooter".to_string();
        Self {
            name: "Asteroid walkthrough".to_string(),
            description: "Charge, escalate and fire a splitting weapon".to_string(),
            characters: vec![CharacterSetup {
                name: who(),
                attribute: 5,
                team: 1,
                position: (0, 0, 0),
                facing: None,
                loadout: LoadoutSetup {
                    primary: vec!["asteroid".to_string()],
                    secondary: vec!["shield".to_string()],
                },
            }],
            steps: vec![
                Step::Draw {
                    who: who(),
                    hand: Hand::Main,
                    slot: 0,
                },
                Step::Charge(who()),
                Step::Tick(1),
                Step::Escalate(who()),
                Step::Fire(who()),
                Step::Tick(1),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walkthrough_is_valid() {
        let scenario = Scenario::asteroid_walkthrough();
        scenario.validate().unwrap();
        assert_eq!(scenario.characters.len(), 1);
        assert_eq!(scenario.steps[1].subject(), Some("shooter"));
    }

    #[test]
    fn test_parse_from_ron() {
        let ron = r#"
            Scenario(
                name: "Test",
                characters: [
                    CharacterSetup(
                        name: "a",
                        attribute: 4,
                        team: 2,
                        position: (1, 0, 2),
                        facing: Some((1, 0, 0)),
                        loadout: LoadoutSetup(primary: ["kogetsu"], secondary: ["shield"]),
                    ),
                ],
                steps: [
                    Draw(who: "a", hand: Sub, slot: 0),
                    Hit(who: "a", amount: 12.5),
                    Tick(3),
                ],
            )
        "#;
        let scenario = Scenario::from_ron_str(ron).unwrap();
        assert_eq!(scenario.name, "Test");
        assert!(scenario.description.is_empty());
        assert_eq!(scenario.characters[0].team_id(), TeamId(2));
        assert_eq!(scenario.steps.len(), 3);
        assert_eq!(scenario.steps[2], Step::Tick(3));
    }

    #[test]
    fn test_unknown_character_rejected() {
        let ron = r#"
            Scenario(
                name: "Bad",
                characters: [CharacterSetup(name: "a", attribute: 3)],
                steps: [Tick(1), Charge("b")],
            )
        "#;
        match Scenario::from_ron_str(ron) {
            Err(ScenarioError::UnknownCharacter { step, name }) => {
                assert_eq!(step, 1);
                assert_eq!(name, "b");
            }
            other => panic!("expected unknown character, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_character_rejected() {
        let ron = r#"
            Scenario(
                name: "Twins",
                characters: [
                    CharacterSetup(name: "a", attribute: 3),
                    CharacterSetup(name: "a", attribute: 4),
                ],
            )
        "#;
        assert!(matches!(
            Scenario::from_ron_str(ron),
            Err(ScenarioError::DuplicateCharacter(_))
        ));
    }

    #[test]
    fn test_loadout_setup_overflow() {
        let setup = LoadoutSetup {
            primary: vec!["scorpion".to_string(); 5],
            secondary: Vec::new(),
        };
        assert!(setup.to_loadout().is_err());
    }

    #[test]
    fn test_transform_defaults_forward() {
        let t = transform_for((1, 2, 3), None);
        assert_eq!(t.position, Vec3Fixed::from_ints(1, 2, 3));
        assert_eq!(t.forward, Vec3Fixed::FORWARD);
    }
}
