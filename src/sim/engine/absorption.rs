/// Weight lost by `weight` over `step` under Beer-Lambert attenuation.
pub fn exponential_loss(weight: f64, mu_a: f64, step: f64) -> f64 {
    weight * (1.0 - (-mu_a * step).exp())
}

/// Energy deposited in one step and the weight left afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deposit {
    pub absorbed: f64,
    pub remaining: f64,
}

/// Defines how photon weight is absorbed over one step.
pub trait AbsorptionModel {
    /// Applies absorption coefficient `mu_a` over `step` to `weight`.
    fn deposit(&self, weight: f64, mu_a: f64, step: f64) -> Deposit;
}

/// Linear decay: deposits `w * mu_a * step` and keeps `w * (1 - mu_a * step)`.
///
/// The deposit is computed from the weight before decay. The decay factor is
/// clamped at zero, so a step longer than `1 / mu_a` leaves zero weight.
pub struct LinearDecay;

impl AbsorptionModel for LinearDecay {
    fn deposit(&self, weight: f64, mu_a: f64, step: f64) -> Deposit {
        Deposit {
            absorbed: weight * mu_a * step,
            remaining: weight * (1.0 - mu_a * step).max(0.0),
        }
    }
}

/// Beer-Lambert decay: deposits `w * (1 - exp(-mu_a * step))`.
///
/// Same law as [`crate::sim::photon::Photon::absorb`]; conserves energy exactly.
pub struct ExponentialDecay;

impl AbsorptionModel for ExponentialDecay {
    fn deposit(&self, weight: f64, mu_a: f64, step: f64) -> Deposit {
        let absorbed = exponential_loss(weight, mu_a, step);
        Deposit {
            absorbed,
            remaining: weight - absorbed,
        }
    }
}
