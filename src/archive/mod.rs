//! Streaming tape-archive encoder.
//!
//! [`tarball::Tarball`] accumulates regular-file entries in the classic 512-byte record layout and
//! serializes them into a [`tarball::ArchivePart`] on demand.

/// Fixed-width header fields, octal encoding and checksum.
pub mod header;
/// Append-only archive builder.
pub mod tarball;
