use crate::geom::EPS;
use std::fmt;
use std::ops::Mul;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
}

impl Vector {
    pub fn new(dx: f64, dy: f64, dz: f64) -> Self {
        Self { dx, dy, dz }
    }

    /// Unit vector pointing into the medium (+z).
    pub fn unit_z() -> Self {
        Self::new(0., 0., 1.)
    }

    /// Unit vector from a polar angle `theta` (measured from +z)
    /// and an azimuth `phi`, both in radians.
    pub fn from_spherical(theta: f64, phi: f64) -> Self {
        Self {
            dx: theta.sin() * phi.cos(),
            dy: theta.sin() * phi.sin(),
            dz: theta.cos(),
        }
    }

    /// Returns the length of the vector.
    pub fn length(&self) -> f64 {
        (self.dx.powi(2) + self.dy.powi(2) + self.dz.powi(2)).sqrt()
    }

    pub fn is_close(&self, other: &Self) -> bool {
        (self.dx - other.dx).abs() < EPS
            && (self.dy - other.dy).abs() < EPS
            && (self.dz - other.dz).abs() < EPS
    }

    /// Returns true if the length differs from 1 by at most `tol`.
    pub fn is_unit(&self, tol: f64) -> bool {
        (self.length() - 1.0).abs() <= tol
    }
}

impl fmt::Display for Vector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = f.precision().unwrap_or(2); // Default 2 decimals
        write!(
            f,
            "Vector({:.prec$}, {:.prec$}, {:.prec$})",
            self.dx,
            self.dy,
            self.dz,
            prec = prec
        )
    }
}

// Implement *
impl Mul<f64> for Vector {
    type Output = Self;
    fn mul(self, other: f64) -> Self {
        Self {
            dx: self.dx * other,
            dy: self.dy * other,
            dz: self.dz * other,
        }
    }
}
