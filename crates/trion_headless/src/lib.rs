//! Headless runner for Trion arena scenarios.
//!
//! Plays scripted scenarios against a [`trion_core::arena::Arena`] without
//! any rendering, for balance checks, CI and determinism verification.
//!
//! - [`scenario`] - RON scenario format and validation
//! - [`runner`] - Step execution and reports
//! - [`data_loader`] - Catalog and tuning table loading
//!
//! # Example
//!
//! ```bash
//! # Run a scenario and print a text report
//! cargo run -p trion_headless -- run --scenario scenarios/asteroid_split.ron
//!
//! # Same, as JSON
//! cargo run -p trion_headless -- run --scenario scenarios/asteroid_split.ron --json
//!
//! # Capacity breakdown for an attribute
//! cargo run -p trion_headless -- capacity --attr 7
//! ```
//!
//! Reports go to stdout, logs to stderr.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod data_loader;
pub mod runner;
pub mod scenario;

pub use runner::{RunReport, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError};
