//! Language-server analysis backend
//!
//! [`LspClient`] speaks JSON-RPC over any async byte stream;
//! [`LspAnalysisBackend`] maps the analysis contract onto it.

pub mod backend;
pub mod client;

pub use backend::LspAnalysisBackend;
pub use client::LspClient;
