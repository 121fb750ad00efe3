// Editing-surface library - exposes all core modules for testing

// Host and editor configuration (serde + JSON schema)
pub mod config;

// Pure building blocks, then the layers built on them
pub mod app;
pub mod input;
pub mod model;
pub mod primitives;
pub mod services;
pub mod view;

pub use app::EditingSurface;
pub use config::{EditorOptions, HostConfig};
pub use services::host::EngineHost;
