use std::sync::Arc;

use glam::{Affine3A, Vec2, Vec3};
use spline_scatter::prelude::*;
use spline_scatter_examples::{init_tracing, render_scene_to_png, DemoHost, RenderConfig};
use tracing::info;

fn main() -> anyhow::Result<()> {
    init_tracing();

    let area = InsideAreaDistribution::new(1.5, 0.8);
    let config = SpawnerConfig::new(DistributionMode::InsideArea(area))
        .with_seed(2024)
        .with_mask_layers(LayerMask::layer(0).with_layer(1));
    let spawner = Spawner::new(config, DemoHost::new())?;
    spawner.add_placeable(Placeable::new("grass").with_probability(80.0));
    spawner.add_placeable(Placeable::new("flower").with_probability(20.0));

    let field: Arc<dyn CurveQuery> =
        Arc::new(Polyline::rectangle(Vec3::ZERO, Vec2::new(60.0, 40.0)));
    let pond: Arc<dyn CurveQuery> = Arc::new(Polyline::circle(Vec3::new(8.0, 0.0, 4.0), 9.0, 48));

    // Clear the pond and a path; a layer-2 rule is ignored by this spawner.
    spawner.add_mask(MaskRule::exclude(MaskShape::Curve {
        curve: Arc::clone(&pond),
        tolerance: 0.5,
    }));
    spawner.add_mask(
        MaskRule::exclude(MaskShape::Box(Aabb::new(
            Vec3::new(-30.0, -1.0, -14.0),
            Vec3::new(30.0, 1.0, -12.0),
        )))
        .on_layer(1),
    );
    spawner.add_mask(
        MaskRule::exclude(MaskShape::Sphere {
            center: Vec3::ZERO,
            radius: 100.0,
        })
        .on_layer(2),
    );
    spawner.add_modifier(Box::new(
        Rotate::new(Vec3::ZERO).with_random(Vec3::ZERO, Vec3::new(0.0, 360.0, 0.0)),
    ));

    spawner.add_segment(Arc::clone(&field), Affine3A::IDENTITY);
    spawner.warm_up_pools(256);

    let mut sink = VecSink::new();
    spawner.respawn_all_with_events(&mut sink)?;
    spawner.respawn_all_with_events(&mut sink)?;
    for event in sink.as_slice() {
        if let SpawnEvent::PostRespawn { report } = event {
            info!(
                "segment {}: {} generated, {} masked, {} spawned, {:?}",
                report.segment,
                report.points_generated,
                report.points_masked,
                report.instances_spawned,
                report.timings.total()
            );
        }
    }
    info!(
        "Instances created across two passes: {}",
        spawner.instances().creation_count()
    );

    let mut rc = RenderConfig::centered((900, 900), 34.0).with_background([235, 240, 225]);
    rc.set_style("grass", [70, 140, 60], 2);
    rc.set_style("flower", [220, 80, 160], 3);
    render_scene_to_png(
        &spawner.instances().host().visible(),
        &[field.as_ref(), pond.as_ref()],
        &rc,
        "inside-area-masked.png",
    )?;
    Ok(())
}
