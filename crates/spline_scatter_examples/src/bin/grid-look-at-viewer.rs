use std::sync::Arc;

use glam::{Affine3A, Vec3};
use spline_scatter::prelude::*;
use spline_scatter_examples::{init_tracing, render_scene_to_png, DemoHost, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();

    let grid = GridDistribution::new(4.0).with_rotation(20.0);
    let config = SpawnerConfig::new(DistributionMode::Grid(grid));
    let spawner = Spawner::new(config, DemoHost::new())?;
    spawner.add_placeable(Placeable::new("billboard"));
    spawner.add_modifier(Box::new(LookAt::new(LookAtTarget::Viewer)));

    let area: Arc<dyn CurveQuery> = Arc::new(Polyline::circle(Vec3::ZERO, 30.0, 48));
    spawner.add_segment(Arc::clone(&area), Affine3A::IDENTITY);

    // Without a viewer the look-at stage is skipped with a warning.
    spawner.respawn_all()?;

    spawner.set_viewer(Some(Vec3::new(-40.0, 2.0, -40.0)));
    spawner.respawn_all()?;

    let mut rc = RenderConfig::centered((800, 800), 45.0);
    rc.set_style("billboard", [30, 90, 200], 3);
    render_scene_to_png(
        &spawner.instances().host().visible(),
        &[area.as_ref()],
        &rc,
        "grid-look-at-viewer.png",
    )?;
    Ok(())
}
