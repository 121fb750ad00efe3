pub mod analysis;
pub mod declarations;
pub mod host;
pub mod lsp;
#[cfg(feature = "runtime")]
pub mod tracing_setup;
