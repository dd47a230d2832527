use std::collections::HashMap;

use anyhow::{Result, ensure};

use super::optics::OpticalProperties;

/// Depth-layered medium.
///
/// Boundaries are strictly increasing depths `b[0] < b[1] < ... < b[n-1]`, stored
/// index-for-index with the optical properties added alongside them.
/// Depth `z` in `[b[i], b[i+1])` belongs to layer `i`. The last boundary closes
/// the medium: its properties are only reachable at `z == b[n-1]`, and the number
/// of real layers is `n - 1`.
#[derive(Debug, Clone, Default)]
pub struct LayeredMesh {
    boundaries: Vec<f64>,
    properties: Vec<OpticalProperties>,
}

impl LayeredMesh {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a boundary together with the optical properties of the layer starting there.
    ///
    /// Fails (without modifying the mesh) if `boundary` is not strictly greater
    /// than the current last boundary.
    pub fn add_layer(&mut self, boundary: f64, n: f64, mu_s: f64, mu_a: f64, g: f64) -> Result<()> {
        self.add_layer_with(boundary, OpticalProperties::new(n, mu_s, mu_a, g))
    }

    /// Same as [`LayeredMesh::add_layer`] with a prebuilt property record.
    pub fn add_layer_with(&mut self, boundary: f64, properties: OpticalProperties) -> Result<()> {
        ensure!(boundary.is_finite(), "Layer boundary must be finite, got {boundary}");
        if let Some(&last) = self.boundaries.last() {
            ensure!(
                boundary > last,
                "New layer boundary ({boundary}) must be greater than the last boundary ({last})"
            );
        }
        self.boundaries.push(boundary);
        self.properties.push(properties);
        Ok(())
    }

    /// Adds a layer from named property values (`n`, `mu_s`, `mu_a`, `g`).
    pub fn add_layer_from_map(&mut self, boundary: f64, values: &HashMap<String, f64>) -> Result<()> {
        let properties = OpticalProperties::from_map(values)?;
        self.add_layer_with(boundary, properties)
    }

    /// Builds a mesh from parallel lists of boundaries and properties.
    pub fn from_layers(boundaries: &[f64], properties: &[OpticalProperties]) -> Result<Self> {
        ensure!(
            boundaries.len() == properties.len(),
            "Got {} boundaries but {} property records",
            boundaries.len(),
            properties.len()
        );
        let mut mesh = Self::new();
        for (&b, &p) in boundaries.iter().zip(properties) {
            mesh.add_layer_with(b, p)?;
        }
        Ok(mesh)
    }

    pub fn boundaries(&self) -> &[f64] {
        &self.boundaries
    }

    pub fn properties(&self) -> &[OpticalProperties] {
        &self.properties
    }

    /// Number of boundaries.
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// Number of real layers (one less than the number of boundaries).
    pub fn num_layers(&self) -> usize {
        self.boundaries.len().saturating_sub(1)
    }

    /// Surface of the medium.
    pub fn first_boundary(&self) -> Option<f64> {
        self.boundaries.first().copied()
    }

    /// Bottom of the medium.
    pub fn last_boundary(&self) -> Option<f64> {
        self.boundaries.last().copied()
    }

    /// Returns true if `z` lies in `[b[0], b[n-1]]`.
    pub fn contains(&self, z: f64) -> bool {
        match (self.first_boundary(), self.last_boundary()) {
            (Some(first), Some(last)) => z >= first && z <= last,
            _ => false,
        }
    }

    /// Index of the layer containing depth `z`: the largest `i` with `b[i] <= z`.
    ///
    /// Returns `None` outside `[b[0], b[n-1]]`, for an empty mesh, and for NaN.
    pub fn layer_index(&self, z: f64) -> Option<usize> {
        if !self.contains(z) {
            return None;
        }
        // b[0] <= z, so at least one boundary satisfies the predicate
        Some(self.boundaries.partition_point(|&b| b <= z) - 1)
    }

    /// Optical properties at depth `z`, or `None` outside the medium.
    pub fn properties_at(&self, z: f64) -> Option<&OpticalProperties> {
        self.layer_index(z).map(|i| &self.properties[i])
    }

    /// Real layers as `(top, bottom, properties)`, ordered by depth.
    pub fn layers(&self) -> impl Iterator<Item = (f64, f64, &OpticalProperties)> {
        self.boundaries
            .windows(2)
            .zip(&self.properties)
            .map(|(w, p)| (w[0], w[1], p))
    }
}
