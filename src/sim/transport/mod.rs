pub mod analysis;
mod config;
mod simulation;

pub use config::{AbsorptionMode, FreePathMode, ScatteringMode, SimulationConfig};
pub use simulation::{
    Simulation, SimulationProgress, SimulationResult, StepModels, Termination, TrialOutcome,
    trial_rng,
};
