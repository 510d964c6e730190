#![forbid(unsafe_code)]

mod host;
mod rendering;

pub use host::{DemoHost, DemoInstance};
pub use rendering::{init_tracing, render_scene_to_png, RenderConfig};
