use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::RandomAccessFile;

/// FileStream is a file handle that may be released between reads and is
/// transparently reopened on the next access. It keeps the number of open
/// descriptors bounded when many files are resident at once.
///
/// Not safe for concurrent use.
#[derive(Debug)]
pub struct FileStream {
    path: PathBuf,
    writable: bool,
    close_between_reads: bool,
    f: RefCell<Option<File>>,
}

impl FileStream {
    pub fn open(
        path: impl AsRef<Path>,
        writable: bool,
        close_between_reads: bool,
    ) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let f = Self::open_file(&path, writable)?;

        let stream = Self {
            path,
            writable,
            close_between_reads,
            f: RefCell::new(Some(f)),
        };
        if close_between_reads {
            stream.close();
        }

        Ok(stream)
    }

    fn open_file(path: &Path, writable: bool) -> io::Result<File> {
        OpenOptions::new().read(true).write(writable).open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    pub fn is_open(&self) -> bool {
        self.f.borrow().is_some()
    }

    /// close releases the OS handle. The next read or write reopens it.
    pub fn close(&self) {
        if self.f.borrow_mut().take().is_some() {
            trace!("closed {}", self.path.display());
        }
    }

    fn with_file<T>(&self, op: impl FnOnce(&mut File) -> io::Result<T>) -> io::Result<T> {
        let mut slot = self.f.borrow_mut();
        if slot.is_none() {
            trace!("reopen {}", self.path.display());
            *slot = Some(Self::open_file(&self.path, self.writable)?);
        }

        let r = match slot.as_mut() {
            Some(f) => op(f),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "file handle missing")),
        };

        if self.close_between_reads {
            *slot = None;
        }
        r
    }

    /// write_at overwrites `data.len()` bytes starting at `offset`.
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        if !self.writable {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} opened read only", self.path.display()),
            ));
        }

        self.with_file(|f| {
            f.seek(SeekFrom::Start(offset))?;
            f.write_all(data)?;
            f.flush()
        })
    }
}

impl RandomAccessFile for FileStream {
    fn read(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        self.with_file(|f| {
            f.seek(SeekFrom::Start(offset))?;
            f.read_exact(buf)?;
            Ok(buf.len())
        })
    }

    fn len(&self) -> io::Result<u64> {
        self.with_file(|f| Ok(f.metadata()?.len()))
    }
}
