//! Simulation engine: the per-period decision loop and its rules.

pub mod config;
pub mod entry;
pub mod exit;
pub mod loop_runner;
pub mod state;

pub use config::{ConfigError, EngineConfig, DEFAULT_BUY_THRESHOLD};
pub use entry::{select_candidates, EntryCandidate};
pub use exit::{ExitAction, ExitRules};
pub use loop_runner::{run_simulation, Simulation};
pub use state::{RunDiagnostics, RunResult, SimulationError};
