pub mod analysis;
pub mod completion;
pub mod host;
pub mod hover;
