//! Concrete traversals over the scene tree.
pub mod animation;
pub mod lights;
pub mod raster;
pub mod text;

pub use animation::AnimationVisitor;
pub use lights::collect_lights;
pub use raster::{LeafDraw, RasterRenderer, RenderBackend, RenderError, DEFAULT_TEXTURE};
pub use text::TextRenderer;
