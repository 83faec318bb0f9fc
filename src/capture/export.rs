use std::path::PathBuf;

use anyhow::Context as _;

use crate::archive::tarball::{ArchivePart, Tarball};
use crate::foundation::error::FramecapResult;

/// Receives finished archive parts, e.g. to offer them as downloads.
pub trait PartSink {
    /// Take ownership of one named part.
    fn emit(&mut self, name: &str, part: ArchivePart) -> FramecapResult<()>;
}

/// Sink that keeps parts in memory.
#[derive(Debug, Default)]
pub struct InMemoryPartSink {
    parts: Vec<(String, ArchivePart)>,
}

impl InMemoryPartSink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parts in emission order.
    pub fn parts(&self) -> &[(String, ArchivePart)] {
        &self.parts
    }

    /// Names of emitted parts in order.
    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Remove and return everything emitted so far.
    pub fn take(&mut self) -> Vec<(String, ArchivePart)> {
        std::mem::take(&mut self.parts)
    }
}

impl PartSink for InMemoryPartSink {
    fn emit(&mut self, name: &str, part: ArchivePart) -> FramecapResult<()> {
        self.parts.push((name.to_owned(), part));
        Ok(())
    }
}

/// Sink that writes each part as a file in a directory.
#[derive(Debug)]
pub struct DirPartSink {
    dir: PathBuf,
    written: Vec<PathBuf>,
}

impl DirPartSink {
    /// Write parts into `dir`, creating it on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            written: Vec::new(),
        }
    }

    /// Paths written so far.
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }
}

impl PartSink for DirPartSink {
    fn emit(&mut self, name: &str, part: ArchivePart) -> FramecapResult<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("create output directory '{}'", self.dir.display()))?;
        let path = self.dir.join(name);
        let file = std::fs::File::create(&path)
            .with_context(|| format!("create archive part '{}'", path.display()))?;
        part.write_to(std::io::BufWriter::new(file))?;
        tracing::info!(path = %path.display(), bytes = part.len(), "wrote archive part");
        self.written.push(path);
        Ok(())
    }
}

/// Names, counts and emits archive parts for one recording session.
#[derive(Debug)]
pub(crate) struct ExportManager {
    base_name: String,
    parts: Vec<String>,
    bytes_emitted: u64,
}

impl ExportManager {
    pub(crate) fn new(base_name: String) -> Self {
        Self {
            base_name,
            parts: Vec::new(),
            bytes_emitted: 0,
        }
    }

    pub(crate) fn base_name(&self) -> &str {
        &self.base_name
    }

    pub(crate) fn parts_emitted(&self) -> u32 {
        self.parts.len() as u32
    }

    pub(crate) fn part_names(&self) -> &[String] {
        &self.parts
    }

    pub(crate) fn bytes_emitted(&self) -> u64 {
        self.bytes_emitted
    }

    /// Emit `tape` as a part that is known to be followed by another one.
    pub(crate) fn rotate(
        &mut self,
        tape: &Tarball,
        sink: &mut dyn PartSink,
    ) -> FramecapResult<String> {
        let name = self.numbered_name(self.parts_emitted() + 1);
        self.emit(name, tape, sink)
    }

    /// Emit `tape` as the last part of the session.
    ///
    /// A session that never rotated produces a single unsuffixed part.
    pub(crate) fn finish(
        &mut self,
        tape: &Tarball,
        sink: &mut dyn PartSink,
    ) -> FramecapResult<String> {
        let name = if self.parts.is_empty() {
            format!("{}.tar", self.base_name)
        } else {
            self.numbered_name(self.parts_emitted() + 1)
        };
        self.emit(name, tape, sink)
    }

    fn numbered_name(&self, seq: u32) -> String {
        format!("{}_{seq:03}.tar", self.base_name)
    }

    fn emit(
        &mut self,
        name: String,
        tape: &Tarball,
        sink: &mut dyn PartSink,
    ) -> FramecapResult<String> {
        let part = tape.save();
        let bytes = part.len();
        sink.emit(&name, part)?;
        self.bytes_emitted += bytes;
        tracing::info!(
            part = %name,
            entries = tape.entry_count(),
            bytes,
            total_bytes = self.bytes_emitted,
            "emitted archive part"
        );
        self.parts.push(name.clone());
        Ok(name)
    }
}

/// Default part base name derived from a session start timestamp.
pub(crate) fn timestamp_base_name(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S%.3fZ").to_string()
}

#[cfg(test)]
#[path = "../../tests/unit/capture/export.rs"]
mod tests;
