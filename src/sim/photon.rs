use rand::Rng;
use std::f64::consts::PI;

use crate::sim::engine::exponential_loss;
use crate::sim::phase;
use crate::{Point, Vector};

/// Photons lighter than this are terminated by [`Photon::check_weight`].
pub const WEIGHT_THRESHOLD: f64 = 0.001;

/// State of a single photon packet during one trial.
///
/// The position is always the last entry of the path, so the trajectory
/// can only be extended, never rewritten. `alive` only goes from true to false.
#[derive(Debug, Clone)]
pub struct Photon {
    direction: Vector,
    weight: f64,
    alive: bool,
    path: Vec<Point>,
}

impl Photon {
    /// Creates a live photon with unit weight at `position`.
    pub fn new(position: Point, direction: Vector) -> Self {
        Self {
            direction,
            weight: 1.0,
            alive: true,
            path: vec![position],
        }
    }

    /// Current position (last point of the path).
    pub fn position(&self) -> Point {
        // The path is created non-empty and only ever grows
        self.path[self.path.len() - 1]
    }

    pub fn direction(&self) -> Vector {
        self.direction
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// Consumes the photon and returns its trajectory.
    pub fn into_path(self) -> Vec<Point> {
        self.path
    }

    /// Moves the photon by `step_size` along its direction, appending the new position.
    pub fn advance(&mut self, step_size: f64) {
        let next = self.position() + self.direction * step_size;
        self.path.push(next);
    }

    /// Replaces the direction with a Henyey-Greenstein sample.
    ///
    /// Draws the polar angle first, then the azimuth. The new direction is expressed
    /// in the fixed lab frame of the medium, not relative to the previous direction.
    pub fn scatter<R: Rng + ?Sized>(&mut self, g: f64, rng: &mut R) {
        let theta = phase::sample(g, rng);
        let u: f64 = rng.r#gen();
        let phi = 2.0 * PI * u;
        self.direction = Vector::from_spherical(theta, phi);
    }

    /// Exponential attenuation over `step_size`: `w -= w * (1 - exp(-mu_a * step))`.
    pub fn absorb(&mut self, mu_a: f64, step_size: f64) {
        self.weight -= exponential_loss(self.weight, mu_a, step_size);
    }

    /// Lowers the weight to `weight`. Values above the current weight or below
    /// zero are clamped, so the weight never grows.
    pub fn reduce_weight_to(&mut self, weight: f64) {
        self.weight = weight.min(self.weight).max(0.0);
    }

    /// Terminates the photon if its weight fell below `threshold`.
    pub fn check_weight(&mut self, threshold: f64) {
        if self.weight < threshold {
            self.alive = false;
        }
    }

    /// Terminates the photon unconditionally (e.g. after leaving the medium).
    pub fn terminate(&mut self) {
        self.alive = false;
    }

    /// Number of steps taken so far.
    pub fn num_steps(&self) -> usize {
        self.path.len() - 1
    }
}
