use anyhow::Result;
use log::info;
use tissue3d::sim::transport::analysis::{Histogram, TransportReport, penetration_depths};
use tissue3d::{LayeredMesh, Simulation, SimulationConfig};

/// Five-layer skin-like medium: thin absorbing layers over a deep, dark one.
fn build_tissue() -> Result<LayeredMesh> {
    let mut mesh = LayeredMesh::new();
    mesh.add_layer(0.0, 1.0, 10.0, 0.1, 0.9)?;
    mesh.add_layer(1.5, 1.33, 5.0, 0.1, 0.9)?;
    mesh.add_layer(3.0, 1.57, 5.0, 0.1, 0.9)?;
    mesh.add_layer(5.0, 1.4, 10.0, 0.0, 0.9)?;
    mesh.add_layer(15.0, 1.4, 10.0, 0.1, 0.9)?;
    Ok(mesh)
}

fn main() -> Result<()> {
    env_logger::init();

    let mesh = build_tissue()?;
    for (i, (top, bottom, props)) in mesh.layers().enumerate() {
        info!(
            "Layer {}: [{top:.2}, {bottom:.2}) n={} mu_s={} mu_a={} g={}",
            i + 1,
            props.n,
            props.mu_s,
            props.mu_a,
            props.g
        );
    }

    let config = SimulationConfig {
        num_photons: 30_000,
        seed: Some(2024),
        ..SimulationConfig::new()
    };
    let result = Simulation::new(mesh, config)?.run_with_progress(10_000, |p| {
        info!("{}/{} photons", p.trials_done, p.num_photons);
    });

    println!("{}", TransportReport::from_result(&result));

    let histogram = Histogram::new(&penetration_depths(&result), 10);
    println!("Penetration depth distribution:");
    for (i, count) in histogram.counts.iter().enumerate() {
        println!(
            "  [{:.2}, {:.2}): {}",
            histogram.edges[i],
            histogram.edges[i + 1],
            count
        );
    }
    Ok(())
}
