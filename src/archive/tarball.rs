use std::any::Any;
use std::io::Write;

use anyhow::Context as _;

use crate::archive::header::{HeaderFields, RECORD_SIZE, encode_header, padded_len};
use crate::foundation::error::{FramecapError, FramecapResult};

/// Largest contiguous sub-buffer produced by [`Tarball::save`] (1 MiB).
pub const MAX_CHUNK_BYTES: u64 = 1 << 20;

/// Default permission bits for appended entries.
pub const DEFAULT_MODE: u32 = 0o777;

/// Entry payload: raw bytes or text (stored as UTF-8).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryPayload {
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Text, encoded as UTF-8.
    Text(String),
}

impl EntryPayload {
    /// Accept a dynamically typed payload.
    ///
    /// Only byte buffers and strings are valid; anything else fails with
    /// [`FramecapError::InvalidEntryType`].
    pub fn from_any(value: &dyn Any) -> FramecapResult<Self> {
        if let Some(v) = value.downcast_ref::<Vec<u8>>() {
            return Ok(Self::Bytes(v.clone()));
        }
        if let Some(v) = value.downcast_ref::<Box<[u8]>>() {
            return Ok(Self::Bytes(v.to_vec()));
        }
        if let Some(v) = value.downcast_ref::<&'static [u8]>() {
            return Ok(Self::Bytes(v.to_vec()));
        }
        if let Some(v) = value.downcast_ref::<String>() {
            return Ok(Self::Text(v.clone()));
        }
        if let Some(v) = value.downcast_ref::<&'static str>() {
            return Ok(Self::Text((*v).to_owned()));
        }
        Err(FramecapError::invalid_entry_type(
            "payload must be a byte buffer or a string",
        ))
    }

    fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(b) => b,
            Self::Text(s) => s.into_bytes(),
        }
    }
}

impl From<Vec<u8>> for EntryPayload {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<&[u8]> for EntryPayload {
    fn from(v: &[u8]) -> Self {
        Self::Bytes(v.to_vec())
    }
}

impl From<String> for EntryPayload {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for EntryPayload {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

/// Optional per-entry header overrides.
#[derive(Clone, Debug, Default)]
pub struct EntryOptions {
    /// Permission bits, default `0o777`.
    pub mode: Option<u32>,
    /// Owning user id, default `0`.
    pub uid: Option<u32>,
    /// Owning group id, default `0`.
    pub gid: Option<u32>,
    /// Modification time in Unix seconds, default "now".
    pub mtime: Option<u64>,
    /// Owner name, default empty.
    pub owner: Option<String>,
    /// Group name, default empty.
    pub group: Option<String>,
}

#[derive(Clone, Debug)]
struct Entry {
    header: Box<[u8; RECORD_SIZE]>,
    payload: Vec<u8>,
    payload_padded: u64,
}

impl Entry {
    fn encoded_len(&self) -> u64 {
        RECORD_SIZE as u64 + self.payload_padded
    }
}

/// Append-only tape-archive builder.
///
/// Headers are encoded at append time; [`Tarball::save`] only lays out bytes and never touches
/// stored entries.
#[derive(Clone, Debug, Default)]
pub struct Tarball {
    entries: Vec<Entry>,
    len: u64,
}

impl Tarball {
    /// Create an empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one regular-file entry.
    ///
    /// On error the archive is left unchanged.
    pub fn append(
        &mut self,
        name: &str,
        payload: impl Into<EntryPayload>,
        opts: &EntryOptions,
    ) -> FramecapResult<()> {
        let payload = payload.into().into_bytes();
        let mtime = match opts.mtime {
            Some(t) => t,
            None => unix_now_secs()?,
        };

        let header = encode_header(&HeaderFields {
            name,
            mode: opts.mode.unwrap_or(DEFAULT_MODE),
            uid: opts.uid.unwrap_or(0),
            gid: opts.gid.unwrap_or(0),
            size: payload.len() as u64,
            mtime,
            owner: opts.owner.as_deref().unwrap_or(""),
            group: opts.group.as_deref().unwrap_or(""),
        })?;

        let entry = Entry {
            header: Box::new(header),
            payload_padded: padded_len(payload.len() as u64),
            payload,
        };
        self.len += entry.encoded_len();
        self.entries.push(entry);
        Ok(())
    }

    /// Encoded size of the current entries (headers + padded payloads), excluding the end marker.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Return `true` when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of appended entries.
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Serialize every entry in append order followed by two zero records.
    ///
    /// Entries are packed greedily into sub-buffers of at most [`MAX_CHUNK_BYTES`]; an entry that
    /// alone exceeds the cap gets a sub-buffer of its own.
    pub fn save(&self) -> ArchivePart {
        let mut groups: Vec<(&[Entry], u64)> = Vec::new();
        let mut start = 0usize;
        let mut group_len = 0u64;
        for (i, e) in self.entries.iter().enumerate() {
            let n = e.encoded_len();
            if group_len > 0 && group_len + n > MAX_CHUNK_BYTES {
                groups.push((&self.entries[start..i], group_len));
                start = i;
                group_len = 0;
            }
            group_len += n;
        }
        if group_len > 0 {
            groups.push((&self.entries[start..], group_len));
        }

        let mut chunks = Vec::with_capacity(groups.len() + 1);
        for (entries, len) in groups {
            let mut buf = vec![0u8; len as usize];
            let mut at = 0usize;
            for e in entries {
                buf[at..at + RECORD_SIZE].copy_from_slice(&e.header[..]);
                at += RECORD_SIZE;
                buf[at..at + e.payload.len()].copy_from_slice(&e.payload);
                at += e.payload_padded as usize;
            }
            chunks.push(buf);
        }
        chunks.push(vec![0u8; 2 * RECORD_SIZE]);

        ArchivePart { chunks }
    }
}

/// One serialized archive, split into contiguous sub-buffers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchivePart {
    chunks: Vec<Vec<u8>>,
}

impl ArchivePart {
    /// Total byte length including the end-of-archive marker.
    pub fn len(&self) -> u64 {
        self.chunks.iter().map(|c| c.len() as u64).sum()
    }

    /// Always `false`: a part carries at least the end-of-archive marker.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Contiguous sub-buffers in byte order; the last one is the end marker.
    pub fn chunks(&self) -> &[Vec<u8>] {
        &self.chunks
    }

    /// Concatenate all sub-buffers.
    pub fn to_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len() as usize);
        for c in &self.chunks {
            out.extend_from_slice(c);
        }
        out
    }

    /// Stream the part into `w`.
    pub fn write_to(&self, mut w: impl Write) -> FramecapResult<()> {
        for c in &self.chunks {
            w.write_all(c).context("write archive part")?;
        }
        w.flush().context("flush archive part")?;
        Ok(())
    }
}

fn unix_now_secs() -> FramecapResult<u64> {
    let d = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock is before the Unix epoch")?;
    Ok(d.as_secs())
}

#[cfg(test)]
#[path = "../../tests/unit/archive/tarball.rs"]
mod tests;
