use std::sync::Arc;

use glam::{Affine3A, Vec3};
use spline_scatter::prelude::*;
use spline_scatter_examples::{init_tracing, render_scene_to_png, DemoHost, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let radial = RadialDistribution::new(2.0, 3.0, 2.0).with_accuracy(Accuracy::PreferAccuracy);
    let config = SpawnerConfig::new(DistributionMode::Radial(radial)).with_seed(7);
    let spawner = Spawner::new(config, DemoHost::new())?;

    spawner.add_placeable(Placeable::new("stone").with_probability(70.0));
    spawner.add_placeable(Placeable::new("pillar").with_probability(30.0));
    spawner.add_modifier(Box::new(Scale::uniform(0.7, 1.4)));

    let curve: Arc<dyn CurveQuery> = Arc::new(Polyline::circle(Vec3::ZERO, 20.0, 64));
    spawner.add_segment(Arc::clone(&curve), Affine3A::IDENTITY);
    spawner.respawn_all()?;

    let mut rc = RenderConfig::centered((800, 800), 24.0);
    rc.set_style("stone", [90, 90, 110], 3);
    rc.set_style("pillar", [200, 120, 40], 5);
    render_scene_to_png(
        &spawner.instances().host().visible(),
        &[curve.as_ref()],
        &rc,
        "radial-basic.png",
    )?;
    Ok(())
}
