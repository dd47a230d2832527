use std::collections::HashMap;

use anyhow::{Result, bail};

/// Keys accepted by [`OpticalProperties::from_map`].
pub const REQUIRED_KEYS: [&str; 4] = ["n", "mu_s", "mu_a", "g"];

/// Optical properties of a single tissue layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpticalProperties {
    /// Refractive index.
    pub n: f64,
    /// Scattering coefficient (1/length).
    pub mu_s: f64,
    /// Absorption coefficient (1/length).
    pub mu_a: f64,
    /// Anisotropy factor of the phase function, in [-1, 1].
    pub g: f64,
}

impl OpticalProperties {
    pub fn new(n: f64, mu_s: f64, mu_a: f64, g: f64) -> Self {
        Self { n, mu_s, mu_a, g }
    }

    /// Builds a record from named values.
    ///
    /// All of `n`, `mu_s`, `mu_a` and `g` must be present. Extra keys are ignored.
    pub fn from_map(values: &HashMap<String, f64>) -> Result<Self> {
        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| !values.contains_key(*key))
            .collect();
        if !missing.is_empty() {
            bail!(
                "Layer must specify 'n', 'mu_s', 'mu_a' and 'g' (missing: {})",
                missing.join(", ")
            );
        }
        Ok(Self {
            n: values["n"],
            mu_s: values["mu_s"],
            mu_a: values["mu_a"],
            g: values["g"],
        })
    }

    /// Extinction (total interaction) coefficient `mu_s + mu_a`.
    pub fn mu_t(&self) -> f64 {
        self.mu_s + self.mu_a
    }
}
