pub mod drawing;
pub mod overlay_renderer;
