//! Error types for the Trion core.

use thiserror::Error;

use crate::components::{EntityId, Hand};

/// Result type alias using [`TrionError`].
pub type Result<T> = std::result::Result<T, TrionError>;

/// Top-level error type for ledger, catalog and configuration failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrionError {
    /// A loadout or draw request referenced an item the catalog doesn't know.
    #[error("Unknown item: {0}")]
    UnknownItem(String),

    /// The catalog contains the same item id twice.
    #[error("Duplicate item id in catalog: {0}")]
    DuplicateItem(String),

    /// A capacity lock would drive capacity below zero.
    #[error("Insufficient capacity: need {required}, have {available}")]
    InsufficientCapacity {
        /// Amount requested.
        required: u32,
        /// Capacity available to lock.
        available: u32,
    },

    /// Slot index outside the four slots of a hand group.
    #[error("Invalid slot index: {0}")]
    InvalidSlot(usize),

    /// Draw request for a slot that holds no item.
    #[error("Slot {slot} of the {hand:?} hand is empty")]
    EmptySlot {
        /// Hand whose slot group was searched.
        hand: Hand,
        /// Slot index inside the group.
        slot: usize,
    },

    /// Invalid entity reference.
    #[error("Entity not found: {0}")]
    EntityNotFound(EntityId),

    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Configuration values that break a model invariant.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
