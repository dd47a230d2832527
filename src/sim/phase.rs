//! Henyey-Greenstein phase function sampling.
use rand::Rng;

/// Below this `|g|` the phase function is treated as isotropic.
pub const ISOTROPIC_EPS: f64 = 1e-10;

/// Cosine of the scattering angle for anisotropy `g` and uniform draw `u` in [0, 1).
///
/// Inverse-CDF sampling of the Henyey-Greenstein phase function.
/// At `|g| == 1` the distribution collapses to a single direction and `g` itself is returned.
pub fn sample_cos_theta(g: f64, u: f64) -> f64 {
    if g.abs() < ISOTROPIC_EPS {
        2.0 * u - 1.0
    } else if g.abs() == 1.0 {
        // The general formula is 0/0 at u = 0 for g = 1
        g
    } else {
        let g2 = g * g;
        let frac = (1.0 - g2) / (1.0 - g + 2.0 * g * u);
        (1.0 + g2 - frac * frac) / (2.0 * g)
    }
}

/// Scattering polar angle in [0, pi] for anisotropy `g` and uniform draw `u`.
pub fn sample_theta(g: f64, u: f64) -> f64 {
    // Rounding can push |cos| a hair above 1 for |g| close to 1
    sample_cos_theta(g, u).clamp(-1.0, 1.0).acos()
}

/// Draws one uniform number from `rng` and returns a scattering angle.
pub fn sample<R: Rng + ?Sized>(g: f64, rng: &mut R) -> f64 {
    let u: f64 = rng.r#gen();
    sample_theta(g, u)
}
