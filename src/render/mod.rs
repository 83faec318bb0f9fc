//! Host surfaces and the demo scene used by the CLI.

/// Procedural scene for exercising a capture loop.
pub mod demo;
/// Rendered surface type.
pub mod frame;
