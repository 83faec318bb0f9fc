use crate::foundation::error::{FramecapError, FramecapResult};

/// Size of one tape-archive record; headers and payloads are padded to it.
pub const RECORD_SIZE: usize = 512;

/// GNU-style magic + version written into every header.
pub(crate) const MAGIC: &[u8; 8] = b"ustar  \0";

/// Field layout of a classic 512-byte header, in byte order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Field {
    Name,
    Mode,
    Uid,
    Gid,
    Size,
    Mtime,
    Checksum,
    TypeFlag,
    LinkName,
    Magic,
    Owner,
    Group,
    DevMajor,
    DevMinor,
    Prefix,
    Pad,
}

impl Field {
    pub(crate) const ALL: [Field; 16] = [
        Field::Name,
        Field::Mode,
        Field::Uid,
        Field::Gid,
        Field::Size,
        Field::Mtime,
        Field::Checksum,
        Field::TypeFlag,
        Field::LinkName,
        Field::Magic,
        Field::Owner,
        Field::Group,
        Field::DevMajor,
        Field::DevMinor,
        Field::Prefix,
        Field::Pad,
    ];

    pub(crate) fn width(self) -> usize {
        match self {
            Field::Name | Field::LinkName => 100,
            Field::Mode | Field::Uid | Field::Gid => 8,
            Field::Size | Field::Mtime => 12,
            Field::Checksum | Field::Magic | Field::DevMajor | Field::DevMinor => 8,
            Field::TypeFlag => 1,
            Field::Owner | Field::Group => 32,
            Field::Prefix => 155,
            Field::Pad => 12,
        }
    }

    pub(crate) fn offset(self) -> usize {
        Self::ALL
            .iter()
            .take_while(|f| **f != self)
            .map(|f| f.width())
            .sum()
    }

    pub(crate) fn label(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Mode => "mode",
            Field::Uid => "uid",
            Field::Gid => "gid",
            Field::Size => "size",
            Field::Mtime => "mtime",
            Field::Checksum => "checksum",
            Field::TypeFlag => "typeflag",
            Field::LinkName => "linkname",
            Field::Magic => "magic",
            Field::Owner => "owner",
            Field::Group => "group",
            Field::DevMajor => "devmajor",
            Field::DevMinor => "devminor",
            Field::Prefix => "prefix",
            Field::Pad => "pad",
        }
    }
}

/// Values encoded into one regular-file header.
#[derive(Clone, Debug)]
pub(crate) struct HeaderFields<'a> {
    pub name: &'a str,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub mtime: u64,
    pub owner: &'a str,
    pub group: &'a str,
}

/// Zero-padded octal digits of `value`, exactly `digits` wide.
///
/// Fails instead of letting an oversized value spill into the neighbouring field.
pub(crate) fn octal(field: Field, value: u64, digits: usize) -> FramecapResult<String> {
    let s = format!("{value:0digits$o}");
    if s.len() > digits {
        return Err(FramecapError::field_overflow(field.label(), s.len(), digits));
    }
    Ok(s)
}

fn put(buf: &mut [u8; RECORD_SIZE], field: Field, bytes: &[u8]) -> FramecapResult<()> {
    let width = field.width();
    if bytes.len() > width {
        return Err(FramecapError::field_overflow(field.label(), bytes.len(), width));
    }
    let off = field.offset();
    buf[off..off + bytes.len()].copy_from_slice(bytes);
    Ok(())
}

/// Standard checksum: unsigned byte sum with the checksum field counted as spaces.
pub fn header_checksum(header: &[u8; RECORD_SIZE]) -> u32 {
    let off = Field::Checksum.offset();
    let width = Field::Checksum.width();
    header
        .iter()
        .enumerate()
        .map(|(i, &b)| {
            if (off..off + width).contains(&i) {
                u32::from(b' ')
            } else {
                u32::from(b)
            }
        })
        .sum()
}

/// Encode a complete regular-file header record.
pub(crate) fn encode_header(fields: &HeaderFields<'_>) -> FramecapResult<[u8; RECORD_SIZE]> {
    if fields.name.is_empty() {
        return Err(FramecapError::validation("archive entry name must not be empty"));
    }
    if fields.name.as_bytes().contains(&0) {
        return Err(FramecapError::validation(
            "archive entry name must not contain NUL bytes",
        ));
    }

    let mut buf = [0u8; RECORD_SIZE];
    put(&mut buf, Field::Name, fields.name.as_bytes())?;
    // Numeric fields keep their trailing NUL: N-1 digits in an N-byte field.
    put(&mut buf, Field::Mode, octal(Field::Mode, u64::from(fields.mode), 7)?.as_bytes())?;
    put(&mut buf, Field::Uid, octal(Field::Uid, u64::from(fields.uid), 7)?.as_bytes())?;
    put(&mut buf, Field::Gid, octal(Field::Gid, u64::from(fields.gid), 7)?.as_bytes())?;
    put(&mut buf, Field::Size, octal(Field::Size, fields.size, 11)?.as_bytes())?;
    put(&mut buf, Field::Mtime, octal(Field::Mtime, fields.mtime, 11)?.as_bytes())?;
    put(&mut buf, Field::TypeFlag, b"0")?;
    put(&mut buf, Field::Magic, MAGIC)?;
    put(&mut buf, Field::Owner, fields.owner.as_bytes())?;
    put(&mut buf, Field::Group, fields.group.as_bytes())?;

    let sum = header_checksum(&buf);
    let mut checksum = octal(Field::Checksum, u64::from(sum), 6)?.into_bytes();
    checksum.extend_from_slice(b"\0 ");
    put(&mut buf, Field::Checksum, &checksum)?;
    Ok(buf)
}

/// Round `len` up to the next multiple of [`RECORD_SIZE`].
pub fn padded_len(len: u64) -> u64 {
    len.div_ceil(RECORD_SIZE as u64) * RECORD_SIZE as u64
}

#[cfg(test)]
#[path = "../../tests/unit/archive/header.rs"]
mod tests;
