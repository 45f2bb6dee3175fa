#[macro_use]
extern crate tracing;

use std::io;

use byteorder::{BigEndian, ByteOrder};

pub mod file;
pub mod mmap;

/// RandomAccessFile is a byte source addressed by absolute offsets.
pub trait RandomAccessFile {
    /// read fills `buf` completely from `offset`, failing with
    /// `UnexpectedEof` if the source is too short.
    fn read(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    fn len(&self) -> io::Result<u64>;

    fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }
}

pub trait RandomAccessFileExt: RandomAccessFile {
    fn read_bytes(&self, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0_u8; len];
        self.read(offset, &mut buf)?;
        Ok(buf)
    }

    fn read_i32(&self, offset: u64) -> io::Result<i32> {
        let mut buf = [0; 4];
        self.read(offset, &mut buf)?;
        Ok(BigEndian::read_i32(&buf))
    }

    fn read_f32(&self, offset: u64) -> io::Result<f32> {
        let mut buf = [0; 4];
        self.read(offset, &mut buf)?;
        Ok(BigEndian::read_f32(&buf))
    }

    fn read_f64(&self, offset: u64) -> io::Result<f64> {
        let mut buf = [0; 8];
        self.read(offset, &mut buf)?;
        Ok(BigEndian::read_f64(&buf))
    }
}

impl<R: RandomAccessFile + ?Sized> RandomAccessFileExt for R {}
