use std::collections::HashMap;

use glam::{Vec2, Vec3};
use image::{Rgb, RgbImage};
use spline_scatter::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::host::DemoInstance;

/// Installs a `fmt` subscriber honoring `RUST_LOG`, defaulting to `info`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Top-down (XZ) render settings.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub image_size: (u32, u32),
    /// World-space ground rectangle mapped onto the image.
    pub world_min: Vec2,
    pub world_max: Vec2,
    pub background: [u8; 3],
    pub curve_color: [u8; 3],
    styles: HashMap<PlaceableId, ([u8; 3], i32)>,
}

impl RenderConfig {
    pub fn new(image_size: (u32, u32), world_min: Vec2, world_max: Vec2) -> Self {
        Self {
            image_size,
            world_min,
            world_max,
            background: [250, 250, 245],
            curve_color: [60, 60, 60],
            styles: HashMap::new(),
        }
    }

    /// Square view of `half_extent` around the origin.
    pub fn centered(image_size: (u32, u32), half_extent: f32) -> Self {
        Self::new(
            image_size,
            Vec2::splat(-half_extent),
            Vec2::splat(half_extent),
        )
    }

    pub fn with_background(mut self, background: [u8; 3]) -> Self {
        self.background = background;
        self
    }

    pub fn set_style(&mut self, id: impl Into<PlaceableId>, color: [u8; 3], radius: i32) {
        self.styles.insert(id.into(), (color, radius));
    }

    fn to_pixel(&self, p: Vec3) -> (i32, i32) {
        let size = self.world_max - self.world_min;
        let u = (p.x - self.world_min.x) / size.x;
        let v = (p.z - self.world_min.y) / size.y;
        (
            (u * self.image_size.0 as f32) as i32,
            ((1.0 - v) * self.image_size.1 as f32) as i32,
        )
    }
}

fn put(img: &mut RgbImage, x: i32, y: i32, color: [u8; 3]) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, Rgb(color));
    }
}

fn disc(img: &mut RgbImage, cx: i32, cy: i32, radius: i32, color: [u8; 3]) {
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                put(img, cx + dx, cy + dy, color);
            }
        }
    }
}

fn segment(img: &mut RgbImage, a: (i32, i32), b: (i32, i32), color: [u8; 3]) {
    let steps = (b.0 - a.0).abs().max((b.1 - a.1).abs()).max(1);
    for s in 0..=steps {
        let t = s as f32 / steps as f32;
        let x = a.0 as f32 + (b.0 - a.0) as f32 * t;
        let y = a.1 as f32 + (b.1 - a.1) as f32 * t;
        put(img, x.round() as i32, y.round() as i32, color);
    }
}

/// Draws the curves and instances seen from above and writes a PNG to `out_path`.
pub fn render_scene_to_png(
    instances: &[DemoInstance],
    curves: &[&dyn CurveQuery],
    config: &RenderConfig,
    out_path: &str,
) -> anyhow::Result<()> {
    let (w, h) = config.image_size;
    let mut img = RgbImage::from_pixel(w, h, Rgb(config.background));

    for curve in curves {
        let length = curve.length();
        let steps = ((length / 0.25).ceil() as usize).max(1);
        let mut prev = config.to_pixel(curve.sample_at(0.0).position);
        for i in 1..=steps {
            let next = config.to_pixel(curve.sample_at(length * i as f32 / steps as f32).position);
            segment(&mut img, prev, next, config.curve_color);
            prev = next;
        }
    }

    for instance in instances {
        let (color, radius) = config
            .styles
            .get(&instance.placeable)
            .copied()
            .unwrap_or(([200, 40, 40], 3));
        let center = config.to_pixel(instance.position);
        let heading = instance.rotation * Vec3::Z * instance.scale.z.max(0.5);
        let tip = config.to_pixel(instance.position + heading);
        segment(&mut img, center, tip, color);
        disc(&mut img, center.0, center.1, radius, color);
    }

    img.save(out_path)?;
    info!("Wrote {} instances to {}.", instances.len(), out_path);
    Ok(())
}
