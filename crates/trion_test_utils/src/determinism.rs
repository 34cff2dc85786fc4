//! Determinism testing utilities.
//!
//! Provides a harness for verifying that an arena produces identical state
//! given identical inputs.
//!
//! # Sources of non-determinism
//!
//! - **Floating-point math**: Trion amounts and positions use
//!   [`trion_core::math::Fixed`] throughout.
//! - **HashMap iteration order**: entity storage is hashed in sorted ID
//!   order; characters and split states live in `BTreeMap`s.
//! - **System randomness**: none in the core.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use trion_core::arena::Arena;
use trion_core::components::EntityId;
use trion_core::math::Fixed;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of steps run.
    pub steps: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic session).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Session is non-deterministic!\n\
                 Runs: {}\n\
                 Steps: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.steps,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a session multiple times and verify determinism.
///
/// `step` receives the step index so scripted inputs can vary over time.
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    steps: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S, u64),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for i in 0..steps {
            step(&mut state, i);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        steps,
    }
}

/// Scripted input applied to one character of an arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaAction {
    /// Charge the drawn splitting weapon.
    Charge,
    /// Escalate a charged weapon.
    Escalate,
    /// Fire a charged weapon.
    Fire,
    /// Cancel a charged weapon.
    Cancel,
    /// Take this much damage.
    Hit(u32),
    /// Advance one tick.
    Tick,
}

/// Apply an action, ignoring rejected ones.
///
/// Rejections (firing while idle, charging without Trion) are part of what
/// property tests exercise, so they are not errors here.
pub fn apply_action(arena: &mut Arena, id: EntityId, action: ArenaAction) {
    match action {
        ArenaAction::Charge => {
            let _ = arena.charge(id);
        }
        ArenaAction::Escalate => {
            let _ = arena.escalate(id);
        }
        ArenaAction::Fire => {
            let _ = arena.fire(id);
        }
        ArenaAction::Cancel => {
            arena.cancel(id);
        }
        ArenaAction::Hit(amount) => {
            let _ = arena.apply_hit(id, Fixed::from_num(amount));
        }
        ArenaAction::Tick => {
            arena.tick();
        }
    }
}

/// Replay the same script on two arenas, finding the first divergent step.
///
/// # Returns
///
/// `None` if the arenas stayed identical, `Some(step)` otherwise. Step 0 is
/// the initial state.
pub fn find_first_divergence<F>(setup_fn: F, script: &[ArenaAction]) -> Option<u64>
where
    F: Fn() -> (Arena, EntityId),
{
    let (mut a, id_a) = setup_fn();
    let (mut b, id_b) = setup_fn();

    if a.state_hash() != b.state_hash() {
        return Some(0);
    }

    for (step, &action) in (1u64..).zip(script) {
        apply_action(&mut a, id_a, action);
        apply_action(&mut b, id_b, action);

        if a.state_hash() != b.state_hash() {
            return Some(step);
        }
    }

    None
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for ledger and controller testing.
pub mod strategies {
    use proptest::prelude::*;
    use trion_core::catalog::{ItemCatalog, ItemId};
    use trion_core::loadout::Loadout;
    use trion_core::math::Fixed;

    use super::ArenaAction;

    /// Trion attribute, including non-positive values.
    pub fn arb_attribute() -> impl Strategy<Value = i32> {
        -5i32..=40
    }

    /// Damage or heal amount with up to four decimal places.
    pub fn arb_amount() -> impl Strategy<Value = Fixed> {
        (-1_000i64..1_000_000i64).prop_map(|n| Fixed::from_num(n) / Fixed::from_num(10_000))
    }

    fn arb_slot(ids: Vec<String>) -> impl Strategy<Value = Option<ItemId>> {
        proptest::option::of(proptest::sample::select(ids).prop_map(ItemId::new))
    }

    /// Loadout built from standard catalog items, possibly with empty slots.
    pub fn arb_loadout() -> impl Strategy<Value = Loadout> {
        let ids: Vec<String> = ItemCatalog::standard()
            .iter()
            .map(|spec| spec.id.to_string())
            .collect();
        (
            proptest::array::uniform4(arb_slot(ids.clone())),
            proptest::array::uniform4(arb_slot(ids)),
        )
            .prop_map(|(primary, secondary)| Loadout { primary, secondary })
    }

    /// Scripted arena input.
    pub fn arb_action() -> impl Strategy<Value = ArenaAction> {
        prop_oneof![
            3 => Just(ArenaAction::Charge),
            2 => Just(ArenaAction::Escalate),
            2 => Just(ArenaAction::Fire),
            1 => Just(ArenaAction::Cancel),
            1 => (0u32..200).prop_map(ArenaAction::Hit),
            3 => Just(ArenaAction::Tick),
        ]
    }

    /// Sequence of scripted inputs.
    pub fn arb_script(max_len: usize) -> impl Strategy<Value = Vec<ArenaAction>> {
        proptest::collection::vec(arb_action(), 0..max_len)
    }
}
