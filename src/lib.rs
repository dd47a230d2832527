pub mod geom;
pub mod sim;

// Prelude
pub use geom::point::Point;
pub use geom::vector::Vector;
pub use sim::mesh::LayeredMesh;
pub use sim::optics::OpticalProperties;
pub use sim::photon::Photon;
pub use sim::transport::{Simulation, SimulationConfig, SimulationResult};
