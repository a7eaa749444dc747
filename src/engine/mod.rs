//! Execution engine for adclictl
//!
//! The engine orchestrates:
//! 1. Diffing - Probe the machine and show current vs desired state
//! 2. Confirming - Ask before changing anything
//! 3. Executing - Reconcile the catalog and summarize the report

pub mod differ;
pub mod executor;

pub use differ::display_diff;
pub use executor::{RunOptions, RunOutcome, print_summary, run};
