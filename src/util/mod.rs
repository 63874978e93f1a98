//! util — shared helpers used across the decoder and the read path.
//!
//! Contains:
//! - read_chunk_at() / read_block_at(): positioned reads over Read + Seek.
//! - guid_from_le(): Windows mixed-endian GUID -> Uuid.
//! - filetime_to_utc(): FILETIME (100ns since 1601) -> DateTime<Utc>.
//! - decode_utf16_le(), is_zeroed(), to_hex().

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Read up to `buf.len()` bytes at `offset`. Stops early only at EOF and
/// returns the number of bytes read.
pub fn read_chunk_at<R: Read + Seek + ?Sized>(r: &mut R, offset: u64, buf: &mut [u8]) -> Result<usize> {
    r.seek(SeekFrom::Start(offset))?;
    let mut done = 0usize;
    while done < buf.len() {
        match r.read(&mut buf[done..]) {
            Ok(0) => break,
            Ok(n) => done += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::Io(e)),
        }
    }
    Ok(done)
}

/// Read exactly `buf.len()` bytes at `offset` (record blocks must be whole).
pub fn read_block_at<R: Read + Seek + ?Sized>(
    r: &mut R,
    offset: u64,
    buf: &mut [u8],
    what: &'static str,
) -> Result<()> {
    let n = read_chunk_at(r, offset, buf)?;
    if n < buf.len() {
        return Err(Error::MessageSize {
            what,
            needed: buf.len(),
            got: n,
        });
    }
    Ok(())
}

/// Decode a 16-byte Windows GUID (Data1..Data3 little-endian).
#[inline]
pub fn guid_from_le(b: &[u8]) -> Uuid {
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&b[..16]);
    Uuid::from_bytes_le(raw)
}

/// Seconds between 1601-01-01 and 1970-01-01.
const FILETIME_UNIX_DIFF_SECS: i64 = 11_644_473_600;

/// Convert a FILETIME to UTC. Values outside chrono's range yield None.
pub fn filetime_to_utc(ft: u64) -> Option<DateTime<Utc>> {
    let secs = (ft / 10_000_000) as i64 - FILETIME_UNIX_DIFF_SECS;
    let nanos = ((ft % 10_000_000) * 100) as u32;
    Utc.timestamp_opt(secs, nanos).single()
}

/// Decode UTF-16LE bytes, replacing invalid sequences.
pub fn decode_utf16_le(b: &[u8]) -> String {
    let units: Vec<u16> = b.chunks_exact(2).map(LittleEndian::read_u16).collect();
    String::from_utf16_lossy(&units)
}

#[inline]
pub fn is_zeroed(b: &[u8]) -> bool {
    b.iter().all(|&x| x == 0)
}

pub fn to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}
