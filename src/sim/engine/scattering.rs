use rand::Rng;

use crate::sim::optics::OpticalProperties;
use crate::sim::photon::Photon;

/// Defines what happens to the photon direction at the end of a step.
pub trait ScatteringModel {
    fn interact<R: Rng + ?Sized>(&self, photon: &mut Photon, props: &OpticalProperties, rng: &mut R);
}

/// Direction stays fixed for the whole trial. Consumes no random draws.
pub struct NoScattering;

impl ScatteringModel for NoScattering {
    fn interact<R: Rng + ?Sized>(&self, _photon: &mut Photon, _props: &OpticalProperties, _rng: &mut R) {}
}

/// Henyey-Greenstein scattering with the layer's `g`, resampled in the lab frame.
pub struct LabFrameHenyeyGreenstein;

impl ScatteringModel for LabFrameHenyeyGreenstein {
    fn interact<R: Rng + ?Sized>(&self, photon: &mut Photon, props: &OpticalProperties, rng: &mut R) {
        photon.scatter(props.g, rng);
    }
}
