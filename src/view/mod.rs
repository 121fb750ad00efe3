//! View layer
//!
//! Themes, the scroll viewport and the composed surface renderer.

pub mod surface;
pub mod theme;
pub mod viewport;

pub use surface::{DropdownOverlay, SurfaceFrame, SurfaceWidget};
pub use viewport::Viewport;
