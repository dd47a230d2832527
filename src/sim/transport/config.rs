use anyhow::{Result, ensure};
use rand::Rng;

use crate::sim::engine::{
    AbsorptionModel, Deposit, ExponentialDecay, ExtinctionFreePath, FreePathModel,
    LabFrameHenyeyGreenstein, LinearDecay, NoScattering, ScatteringFreePath, ScatteringModel,
};
use crate::sim::optics::OpticalProperties;
use crate::sim::photon::{Photon, WEIGHT_THRESHOLD};
use crate::{Point, Vector};

/// Allowed deviation of `initial_direction` from unit length.
const UNIT_TOLERANCE: f64 = 1e-9;

/// Coefficient used to sample free path lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreePathMode {
    /// `mu_s` only.
    Scattering,
    /// `mu_s + mu_a`.
    Extinction,
}

/// Weight decay applied after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsorptionMode {
    /// `w * (1 - mu_a * step)`.
    Linear,
    /// `w * exp(-mu_a * step)`.
    Exponential,
}

/// Direction change applied after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScatteringMode {
    /// Photons keep their initial direction.
    Disabled,
    /// Henyey-Greenstein resampling in the lab frame.
    HenyeyGreenstein,
}

impl FreePathModel for FreePathMode {
    fn coefficient(&self, props: &OpticalProperties) -> f64 {
        match self {
            FreePathMode::Scattering => ScatteringFreePath.coefficient(props),
            FreePathMode::Extinction => ExtinctionFreePath.coefficient(props),
        }
    }
}

impl AbsorptionModel for AbsorptionMode {
    fn deposit(&self, weight: f64, mu_a: f64, step: f64) -> Deposit {
        match self {
            AbsorptionMode::Linear => LinearDecay.deposit(weight, mu_a, step),
            AbsorptionMode::Exponential => ExponentialDecay.deposit(weight, mu_a, step),
        }
    }
}

impl ScatteringModel for ScatteringMode {
    fn interact<R: Rng + ?Sized>(&self, photon: &mut Photon, props: &OpticalProperties, rng: &mut R) {
        match self {
            ScatteringMode::Disabled => NoScattering.interact(photon, props, rng),
            ScatteringMode::HenyeyGreenstein => LabFrameHenyeyGreenstein.interact(photon, props, rng),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SimulationConfig {
    // Photons
    pub num_photons: usize,
    /// Launch position. Defaults to the origin, not to the launch direction.
    pub source: Point,
    pub initial_direction: Vector,
    pub weight_threshold: f64,

    // Randomness
    /// Base seed. Trial `i` draws from a stream derived from `(seed, i)`.
    /// `None` picks a fresh seed per run (reported in the result).
    pub seed: Option<u64>,

    // Step physics
    pub free_path: FreePathMode,
    pub absorption: AbsorptionMode,
    pub scattering: ScatteringMode,

    // Safety
    /// Optional cap on steps per photon. With scattering disabled and a direction
    /// parallel to the layers, a non-absorbing photon would otherwise never stop.
    pub max_steps_per_photon: Option<usize>,
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self {
            num_photons: 1000,
            source: Point::origin(),
            initial_direction: Vector::unit_z(),
            weight_threshold: WEIGHT_THRESHOLD,
            seed: None,
            free_path: FreePathMode::Scattering,
            absorption: AbsorptionMode::Linear,
            scattering: ScatteringMode::Disabled,
            max_steps_per_photon: None,
        }
    }

    /// Checks values that would make the transport loop meaningless.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.initial_direction.is_unit(UNIT_TOLERANCE),
            "Initial direction must be a unit vector, got {:.6}",
            self.initial_direction
        );
        ensure!(
            self.weight_threshold.is_finite() && self.weight_threshold >= 0.0,
            "Weight threshold must be finite and non-negative, got {}",
            self.weight_threshold
        );
        ensure!(
            self.source.x.is_finite() && self.source.y.is_finite() && self.source.z.is_finite(),
            "Source position must be finite, got {:.6}",
            self.source
        );
        if let Some(max_steps) = self.max_steps_per_photon {
            ensure!(max_steps > 0, "max_steps_per_photon must be positive");
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::new()
    }
}
