//! Read-only summaries of a finished transport simulation.
use std::fmt;

use crate::Point;
use crate::sim::mesh::LayeredMesh;

use super::simulation::SimulationResult;

/// Where a photon ended up relative to the medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscapeKind {
    /// Final depth above the surface (`z < b[0]`).
    Reflected,
    /// Final depth below the bottom (`z > b[n-1]`).
    Transmitted,
    /// Final depth within the medium.
    Inside,
}

/// Classifies a path by its final depth.
pub fn classify_escape(path: &[Point], mesh: &LayeredMesh) -> EscapeKind {
    let (Some(last), Some(first), Some(bottom)) =
        (path.last(), mesh.first_boundary(), mesh.last_boundary())
    else {
        return EscapeKind::Inside;
    };
    if last.z < first {
        EscapeKind::Reflected
    } else if last.z > bottom {
        EscapeKind::Transmitted
    } else {
        EscapeKind::Inside
    }
}

fn fraction_of(result: &SimulationResult, kind: EscapeKind) -> f64 {
    let total = result.photon_paths.len();
    if total == 0 {
        return 0.0;
    }
    let count = result
        .photon_paths
        .iter()
        .filter(|path| classify_escape(path, &result.mesh) == kind)
        .count();
    count as f64 / total as f64
}

/// Fraction of photons that left through the surface. Zero if no photons ran.
pub fn reflection_rate(result: &SimulationResult) -> f64 {
    fraction_of(result, EscapeKind::Reflected)
}

/// Fraction of photons that left through the bottom. Zero if no photons ran.
pub fn transmission_rate(result: &SimulationResult) -> f64 {
    fraction_of(result, EscapeKind::Transmitted)
}

/// Maximum depth reached by each photon.
pub fn penetration_depths(result: &SimulationResult) -> Vec<f64> {
    result
        .photon_paths
        .iter()
        .filter_map(|path| path.iter().map(|p| p.z).max_by(f64::total_cmp))
        .collect()
}

/// Total energy deposited in the real layers.
pub fn total_absorbed(result: &SimulationResult) -> f64 {
    result.absorption_profile.iter().sum()
}

/// Absorption per layer divided by the number of launched photons.
pub fn absorption_per_photon(result: &SimulationResult) -> Vec<f64> {
    let n = result.photon_paths.len();
    if n == 0 {
        return vec![0.0; result.absorption_profile.len()];
    }
    result
        .absorption_profile
        .iter()
        .map(|a| a / n as f64)
        .collect()
}

/// Equal-width histogram.
#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    /// Bin edges, one more than the number of bins.
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Bins `values` into `num_bins` equal-width bins spanning their range.
    ///
    /// Returns an empty histogram when there are no finite values or no bins.
    pub fn new(values: &[f64], num_bins: usize) -> Self {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let (Some(lo), Some(hi)) = (
            finite.iter().copied().min_by(f64::total_cmp),
            finite.iter().copied().max_by(f64::total_cmp),
        ) else {
            return Self {
                edges: vec![],
                counts: vec![],
            };
        };
        if num_bins == 0 {
            return Self {
                edges: vec![],
                counts: vec![],
            };
        }

        // All-equal values get a unit-width range
        let width = if hi > lo { (hi - lo) / num_bins as f64 } else { 1.0 / num_bins as f64 };
        let edges = (0..=num_bins).map(|i| lo + i as f64 * width).collect();
        let mut counts = vec![0; num_bins];
        for v in finite {
            let bin = (((v - lo) / width) as usize).min(num_bins - 1);
            counts[bin] += 1;
        }
        Self { edges, counts }
    }
}

/// Headline numbers of a transport run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportReport {
    pub num_photons: usize,
    pub reflection_rate: f64,
    pub transmission_rate: f64,
    pub total_absorbed: f64,
    pub mean_penetration_depth: f64,
    pub absorption_per_photon: Vec<f64>,
}

impl TransportReport {
    pub fn from_result(result: &SimulationResult) -> Self {
        let depths = penetration_depths(result);
        let mean_penetration_depth = if depths.is_empty() {
            0.0
        } else {
            depths.iter().sum::<f64>() / depths.len() as f64
        };
        Self {
            num_photons: result.photon_paths.len(),
            reflection_rate: reflection_rate(result),
            transmission_rate: transmission_rate(result),
            total_absorbed: total_absorbed(result),
            mean_penetration_depth,
            absorption_per_photon: absorption_per_photon(result),
        }
    }
}

impl fmt::Display for TransportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Photons:                {}", self.num_photons)?;
        writeln!(f, "Reflection rate:        {:.4}", self.reflection_rate)?;
        writeln!(f, "Transmission rate:      {:.4}", self.transmission_rate)?;
        writeln!(f, "Total absorbed:         {:.4}", self.total_absorbed)?;
        writeln!(f, "Mean penetration depth: {:.4}", self.mean_penetration_depth)?;
        for (i, a) in self.absorption_per_photon.iter().enumerate() {
            writeln!(f, "  Layer {}: {:.6} per photon", i + 1, a)?;
        }
        Ok(())
    }
}
