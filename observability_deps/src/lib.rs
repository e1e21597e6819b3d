//! This crate exists to avoid duplication in all the other crates that need
//! to depend on `tracing` for logging and instrumentation. Every crate in
//! this workspace should import `tracing` macros via `observability_deps`
//! rather than depending on `tracing` directly, so that swapping out the
//! underlying logging implementation only requires changes in one place.

pub use tracing;
