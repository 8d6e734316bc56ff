//! Record encoding and decoding

use std::io::{self, ErrorKind, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{EmberError, Result};

use super::{LogEntry, LEN_PREFIX_SIZE, MAX_FIELD_LEN, RECORD_OVERHEAD, TRAILER_SIZE};

// =============================================================================
// Encoding
// =============================================================================

/// Exact number of bytes `encode` produces for `entry`
pub fn encoded_len(entry: &LogEntry) -> u64 {
    (RECORD_OVERHEAD + entry.key.len() + entry.value.len()) as u64
}

/// Encode an entry into a single contiguous buffer
///
/// Fails only if a field is too long to be read back.
pub fn encode(entry: &LogEntry) -> io::Result<Bytes> {
    let klen = field_len(&entry.key, "key")?;
    let vlen = field_len(&entry.value, "value")?;

    let mut buf = BytesMut::with_capacity(encoded_len(entry) as usize);
    buf.put_u32_le(klen);
    buf.put_slice(&entry.key);
    buf.put_u8(0);
    buf.put_u32_le(vlen);
    buf.put_slice(&entry.value);
    buf.put_u8(0);
    buf.put_u8(entry.deleted as u8);
    buf.put_u16_le(0); // reserved

    Ok(buf.freeze())
}

/// Encode an entry and write it to `writer`, returning the bytes written
pub fn write_entry<W: Write>(writer: &mut W, entry: &LogEntry) -> io::Result<u64> {
    let bytes = encode(entry)?;
    writer.write_all(&bytes)?;
    Ok(bytes.len() as u64)
}

/// Length prefix for a field: its size plus the terminator
fn field_len(field: &[u8], name: &str) -> io::Result<u32> {
    match u32::try_from(field.len() + 1) {
        Ok(len) if len <= MAX_FIELD_LEN => Ok(len),
        _ => Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!(
                "{} of {} bytes exceeds the {} byte record limit",
                name,
                field.len(),
                MAX_FIELD_LEN - 1
            ),
        )),
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode exactly one entry from `reader`
///
/// Running out of input anywhere, including before the first byte, is a
/// corrupt record.
pub fn decode<R: Read>(reader: &mut R) -> Result<LogEntry> {
    match decode_next(reader)? {
        Some(entry) => Ok(entry),
        None => Err(EmberError::CorruptRecord(
            "stream ended before record header".to_string(),
        )),
    }
}

/// Decode the next entry, or `None` if the stream ends cleanly at a record
/// boundary
pub fn decode_next<R: Read>(reader: &mut R) -> Result<Option<LogEntry>> {
    let mut prefix = [0u8; LEN_PREFIX_SIZE];
    if !read_prefix_or_eof(reader, &mut prefix)? {
        return Ok(None);
    }

    let klen = checked_len(u32::from_le_bytes(prefix), "key")?;
    let key = read_field(reader, klen, "key")?;

    read_exact_or_corrupt(reader, &mut prefix, "value length")?;
    let vlen = checked_len(u32::from_le_bytes(prefix), "value")?;
    let value = read_field(reader, vlen, "value")?;

    let mut trailer = [0u8; TRAILER_SIZE];
    read_exact_or_corrupt(reader, &mut trailer, "trailer")?;

    let deleted = match trailer[0] {
        0 => false,
        1 => true,
        other => {
            return Err(EmberError::CorruptRecord(format!(
                "deleted flag must be 0 or 1, got {}",
                other
            )))
        }
    };

    if trailer[1] != 0 || trailer[2] != 0 {
        return Err(EmberError::CorruptRecord(format!(
            "reserved bytes must be zero, got {:#04x} {:#04x}",
            trailer[1], trailer[2]
        )));
    }

    Ok(Some(LogEntry {
        key,
        value,
        deleted,
    }))
}

fn checked_len(len: u32, name: &str) -> Result<usize> {
    if len == 0 {
        return Err(EmberError::CorruptRecord(format!(
            "{} length prefix is zero, no room for terminator",
            name
        )));
    }
    if len > MAX_FIELD_LEN {
        return Err(EmberError::CorruptRecord(format!(
            "{} length prefix {} exceeds limit {}",
            name, len, MAX_FIELD_LEN
        )));
    }
    Ok(len as usize)
}

/// Read a terminated field and strip the terminator
fn read_field<R: Read>(reader: &mut R, len: usize, name: &str) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; len];
    read_exact_or_corrupt(reader, &mut buf, name)?;

    // len >= 1 was checked by checked_len
    if buf.pop() != Some(0) {
        return Err(EmberError::CorruptRecord(format!(
            "{} is missing its zero terminator",
            name
        )));
    }
    Ok(buf)
}

fn read_exact_or_corrupt<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            EmberError::CorruptRecord(format!("stream ended while reading {}", what))
        }
        _ => EmberError::Io(e),
    })
}

/// Fill `buf` with the key length prefix. Returns false if the stream was
/// already at its end; a partial prefix is corruption.
fn read_prefix_or_eof<R: Read>(reader: &mut R, buf: &mut [u8; LEN_PREFIX_SIZE]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => {
                return Err(EmberError::CorruptRecord(format!(
                    "stream ended after {} of {} key length bytes",
                    filled, LEN_PREFIX_SIZE
                )))
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(EmberError::Io(e)),
        }
    }
    Ok(true)
}
