use std::sync::Arc;

use glam::{Affine3A, Vec3};
use spline_scatter::prelude::*;
use spline_scatter_examples::{init_tracing, render_scene_to_png, DemoHost, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = SpawnerConfig::new(DistributionMode::OnKnots(OnKnotsDistribution::new()))
        .with_root(Some(1));
    let spawner = Spawner::new(config, DemoHost::new())?;
    spawner.add_placeable(Placeable::new("lamp").with_pivot(Pivot::Back));
    spawner.add_modifier(Box::new(Offset::new(Space::World, Vec3::new(0.0, 0.5, 0.0))));

    let street: Arc<dyn CurveQuery> = Arc::new(Polyline::open(vec![
        Vec3::new(-30.0, 0.0, -10.0),
        Vec3::new(-10.0, 0.0, -12.0),
        Vec3::new(5.0, 0.0, 0.0),
        Vec3::new(20.0, 0.0, 8.0),
        Vec3::new(30.0, 0.0, 20.0),
    ]));
    // Second copy of the street, shifted north.
    spawner.add_segment(Arc::clone(&street), Affine3A::IDENTITY);
    spawner.add_segment(
        Arc::clone(&street),
        Affine3A::from_translation(Vec3::new(0.0, 0.0, 10.0)),
    );

    let outcomes = spawner.respawn_all()?;
    info!("{} segments processed.", outcomes.len());

    let mut rc = RenderConfig::centered((800, 800), 40.0);
    rc.set_style("lamp", [240, 200, 40], 4);
    render_scene_to_png(
        &spawner.instances().host().visible(),
        &[street.as_ref()],
        &rc,
        "on-knots-lamps.png",
    )?;
    Ok(())
}
