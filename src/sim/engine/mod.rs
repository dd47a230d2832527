//! Per-step physics of a photon trial.
//!
//! Each concern (free path, absorption, scattering) is a trait so a simulation
//! can swap the models without touching the transport loop.
pub mod absorption;
pub mod free_path;
pub mod scattering;

pub use absorption::{AbsorptionModel, Deposit, ExponentialDecay, LinearDecay, exponential_loss};
pub use free_path::{ExtinctionFreePath, FreePathModel, ScatteringFreePath};
pub use scattering::{LabFrameHenyeyGreenstein, NoScattering, ScatteringModel};
