use std::sync::Arc;

use glam::{Affine3A, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spline_scatter::prelude::*;
use spline_scatter_examples::{init_tracing, render_scene_to_png, DemoHost, RenderConfig};

fn main() -> anyhow::Result<()> {
    init_tracing();

    // Wavy path across the view.
    let mut rng = StdRng::seed_from_u64(99);
    let knots: Vec<Vec3> = (0..9)
        .map(|i| {
            let wobble = (rng.next_u32() as f32 / u32::MAX as f32 - 0.5) * 12.0;
            Vec3::new(-40.0 + i as f32 * 10.0, 0.0, wobble)
        })
        .collect();
    let path: Arc<dyn CurveQuery> = Arc::new(Polyline::open(knots));

    let on_curve = OnCurveDistribution::new(2.5).with_jitter(0.2);
    let config = SpawnerConfig::new(DistributionMode::OnCurve(on_curve)).with_seed(1);
    let spawner = Spawner::new(config, DemoHost::new())?;
    spawner.add_placeable(Placeable::new("post"));
    spawner.add_placeable(
        Placeable::new("rail")
            .with_probability(40.0)
            .with_forward_axis(ForwardAxis::PositiveX),
    );

    // Alternate sides of the path in runs of three.
    spawner.add_modifier(Box::new(Offset::new(Space::Curve, Vec3::ZERO).with_random(
        RandomMode::Alternate,
        Vec3::new(-2.0, 0.0, 0.0),
        Vec3::new(2.0, 0.0, 0.0),
        3.0,
    )));
    spawner.add_modifier(Box::new(LookAt::new(LookAtTarget::Curve).with_lock(
        glam::BVec3::new(true, false, true),
    )));

    spawner.add_segment(Arc::clone(&path), Affine3A::IDENTITY);
    spawner.respawn_all()?;

    let mut rc = RenderConfig::centered((1000, 600), 45.0);
    rc.set_style("post", [120, 80, 40], 3);
    rc.set_style("rail", [40, 120, 60], 2);
    render_scene_to_png(
        &spawner.instances().host().visible(),
        &[path.as_ref()],
        &rc,
        "on-curve-fence.png",
    )?;
    Ok(())
}
