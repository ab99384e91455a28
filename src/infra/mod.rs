//! Infrastructure adapters and runtime bootstrap.

pub mod error;
pub mod fs_source;
pub mod http_source;
pub mod memory_source;
pub mod telemetry;
