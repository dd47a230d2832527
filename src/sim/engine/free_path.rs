use rand::Rng;
use rand::distributions::OpenClosed01;

use crate::sim::optics::OpticalProperties;

/// Defines how far a photon travels between interactions.
pub trait FreePathModel {
    /// Attenuation coefficient that sets the mean free path in a layer.
    fn coefficient(&self, props: &OpticalProperties) -> f64;

    /// Samples a step length. Consumes exactly one uniform draw.
    fn sample_step<R: Rng + ?Sized>(&self, props: &OpticalProperties, rng: &mut R) -> f64 {
        let u: f64 = rng.sample(OpenClosed01);
        step_length(u, self.coefficient(props))
    }
}

/// Exponentially distributed step `-ln(u) / coefficient` for `u` in (0, 1].
pub fn step_length(u: f64, coefficient: f64) -> f64 {
    -u.ln() / coefficient
}

/// Step lengths drawn from the scattering coefficient only.
pub struct ScatteringFreePath;

impl FreePathModel for ScatteringFreePath {
    fn coefficient(&self, props: &OpticalProperties) -> f64 {
        props.mu_s
    }
}

/// Step lengths drawn from the extinction coefficient `mu_s + mu_a`.
pub struct ExtinctionFreePath;

impl FreePathModel for ExtinctionFreePath {
    fn coefficient(&self, props: &OpticalProperties) -> f64 {
        props.mu_t()
    }
}
