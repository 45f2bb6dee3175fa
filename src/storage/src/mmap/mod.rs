use std::fs::File;
use std::io;
use std::io::ErrorKind;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};

use crate::RandomAccessFile;

/// MmapReadableFile serves reads from a read-only memory map of the whole file.
#[derive(Debug)]
pub struct MmapReadableFile {
    len: usize,
    mmap: Option<Mmap>,
}

impl MmapReadableFile {
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let f = File::open(path.as_ref())?;

        let meta = f.metadata()?;
        let len = meta.len() as usize;

        // zero length maps are rejected on some platforms
        let mmap = if len == 0 {
            None
        } else {
            Some(unsafe { MmapOptions::new().offset(0).len(len).map(&f)? })
        };
        debug!("mapped {} ({} bytes)", path.as_ref().display(), len);

        Ok(Self { len, mmap })
    }

    pub fn as_slice(&self) -> &[u8] {
        match &self.mmap {
            Some(m) => &m[..],
            None => &[],
        }
    }
}

impl RandomAccessFile for MmapReadableFile {
    fn read(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let size = buf.len();
        if size == 0 {
            return Ok(0);
        }

        let offset = offset as usize;
        let upper = offset + size;
        if upper > self.len {
            return Err(io::Error::new(ErrorKind::UnexpectedEof, ""));
        }

        buf.copy_from_slice(&self.as_slice()[offset..upper]);
        Ok(size)
    }

    fn len(&self) -> io::Result<u64> {
        Ok(self.len as u64)
    }
}
