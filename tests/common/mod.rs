// Common test utilities

pub mod fake_backend;
pub mod fixtures;
pub mod harness;
pub mod tracing;
