pub mod engine;
pub mod mesh;
pub mod optics;
pub mod phase;
pub mod photon;
pub mod transport;
