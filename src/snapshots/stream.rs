//! snapshots/stream — `Read + Seek` adapter over a shadow copy.

use std::io::{self, Read, Seek, SeekFrom};

use uuid::Uuid;

use crate::config::VssConfig;
use crate::error::{Error, Result};
use crate::snapshots::shadow_copy::ShadowCopy;

/// Point-in-time view of a volume as a byte stream.
///
/// `R` reads the live volume (or its image). Passing `&mut File` keeps the
/// file owned by the caller.
#[derive(Debug)]
pub struct ShadowCopyStream<R> {
    reader: R,
    shadow_copy: ShadowCopy,
    pos: u64,
}

impl<R: Read + Seek> ShadowCopyStream<R> {
    /// Parse the store on `reader` and open shadow copy `shadow_copy_id`.
    pub fn open(mut reader: R, shadow_copy_id: &Uuid, config: &VssConfig) -> Result<Self> {
        let shadow_copy = ShadowCopy::parse(&mut reader, shadow_copy_id, config)?;
        Ok(Self::new(reader, shadow_copy))
    }

    pub fn new(reader: R, shadow_copy: ShadowCopy) -> Self {
        Self {
            reader,
            shadow_copy,
            pos: 0,
        }
    }

    pub fn shadow_copy(&self) -> &ShadowCopy {
        &self.shadow_copy
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn size(&self) -> u64 {
        self.shadow_copy.size()
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Seek> Read for ShadowCopyStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let size = self.size();
        if buf.is_empty() || self.pos >= size {
            return Ok(0);
        }
        let remaining = usize::try_from(size - self.pos).unwrap_or(usize::MAX);
        let len = buf.len().min(remaining);

        let n = self
            .shadow_copy
            .read_at(&mut self.reader, self.pos, &mut buf[..len])?;
        self.pos += n as u64;
        Ok(n)
    }
}

impl<R: Read + Seek> Seek for ShadowCopyStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(p) => p,
            SeekFrom::Current(delta) => self.pos.checked_add_signed(delta).ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "seek before start of shadow copy")
            })?,
            SeekFrom::End(_) => return Err(Error::InvalidSeek.into()),
        };
        self.pos = new_pos;
        Ok(new_pos)
    }
}
