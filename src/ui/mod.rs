/// Pure camera math shared by the renderer and pointer picking
pub mod projection;
/// Canvas 2D adapter for the browser build
#[cfg(target_arch = "wasm32")]
pub mod web_renderer;
