use byteorder::{BigEndian, ByteOrder};
use common_base::iterator::TryIterator;
use eclsum_storage::{RandomAccessFile, RandomAccessFileExt};

use crate::record::{
    header_size, DataType, FormatLayout, Record, RecordHeader, HEADER_MARKER, MARKER_SIZE,
    NAME_LEN,
};
use crate::{EclError, Result};

/// is_formatted sniffs the encoding of a record file from its first bytes.
/// An empty file counts as unformatted.
pub fn is_formatted<R: RandomAccessFile + ?Sized>(src: &R) -> Result<bool> {
    let len = src.len()?;
    if len == 0 {
        return Ok(false);
    }
    if len < 4 {
        return Err(EclError::Scan(format!("file too short ({} bytes)", len)));
    }

    let mut b = [0_u8; 4];
    src.read(0, &mut b)?;
    if BigEndian::read_i32(&b) == HEADER_MARKER {
        Ok(false)
    } else if &b[..2] == b" '" {
        Ok(true)
    } else {
        Err(EclError::Scan("not a keyword record file".to_string()))
    }
}

/// RecordScanner walks the headers of a record file without decoding any
/// payload. Each payload is skipped by its computed on-disk size.
pub struct RecordScanner<'a, R: RandomAccessFile + ?Sized> {
    src: &'a R,
    len: u64,
    offset: u64,
    formatted: bool,
    layout: FormatLayout,
}

impl<'a, R: RandomAccessFile + ?Sized> RecordScanner<'a, R> {
    pub fn new(src: &'a R, formatted: bool, layout: FormatLayout) -> Result<Self> {
        let len = src.len()?;
        Ok(Self {
            src,
            len,
            offset: 0,
            formatted,
            layout,
        })
    }

    /// offset returns the position of the next header.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn parse_unformatted(&self, b: &[u8]) -> Result<RecordHeader> {
        let lead = BigEndian::read_i32(&b[0..4]);
        let trail = BigEndian::read_i32(&b[20..24]);
        if lead != HEADER_MARKER || trail != HEADER_MARKER {
            return Err(EclError::Scan(format!(
                "invalid header markers {}/{} at offset {}",
                lead, trail, self.offset
            )));
        }

        let name = String::from_utf8_lossy(&b[4..4 + NAME_LEN]).trim_end().to_string();
        let count = BigEndian::read_i32(&b[12..16]);
        let tag = &b[16..20];
        self.make_header(name, count, tag)
    }

    fn parse_formatted(&self, b: &[u8]) -> Result<RecordHeader> {
        // ` 'NAME    ' %11d 'TYPE'\n`
        let well_formed = b[0] == b' '
            && b[1] == b'\''
            && b[10] == b'\''
            && b[24] == b'\''
            && b[29] == b'\''
            && b[30] == b'\n';
        if !well_formed {
            return Err(EclError::Scan(format!(
                "invalid formatted header {:?} at offset {}",
                String::from_utf8_lossy(b),
                self.offset
            )));
        }

        let name = String::from_utf8_lossy(&b[2..10]).trim_end().to_string();
        let count = std::str::from_utf8(&b[11..24])
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
            .ok_or_else(|| {
                EclError::Scan(format!("invalid element count at offset {}", self.offset))
            })?;
        self.make_header(name, count, &b[25..29])
    }

    fn make_header(&self, name: String, count: i32, tag: &[u8]) -> Result<RecordHeader> {
        let data_type = DataType::parse(tag).ok_or_else(|| {
            EclError::Scan(format!(
                "{}: unknown type {:?} at offset {}",
                name,
                String::from_utf8_lossy(tag),
                self.offset
            ))
        })?;
        if count < 0 {
            return Err(EclError::Scan(format!(
                "{}: negative element count {} at offset {}",
                name, count, self.offset
            )));
        }

        Ok(RecordHeader::new(name, data_type, count as usize))
    }

    /// check_markers verifies the chunk markers of an unformatted payload.
    fn check_markers(&self, header: &RecordHeader, payload_offset: u64) -> Result<()> {
        let ty = header.data_type;
        let chunk = self.layout.chunk_size(ty);
        let mut pos = payload_offset;
        let mut remaining = header.count;
        while remaining > 0 {
            let n = remaining.min(chunk);
            let nbytes = (n * ty.element_size()) as u64;

            let lead = self.src.read_i32(pos)?;
            let trail = self.src.read_i32(pos + MARKER_SIZE + nbytes)?;
            if lead as u64 != nbytes || lead != trail {
                return Err(EclError::Scan(format!(
                    "{}: chunk markers {}/{} expected {} at offset {}",
                    header.name, lead, trail, nbytes, pos
                )));
            }

            pos += nbytes + 2 * MARKER_SIZE;
            remaining -= n;
        }
        Ok(())
    }
}

impl<'a, R: RandomAccessFile + ?Sized> TryIterator for RecordScanner<'a, R> {
    type Item = Record;
    type Error = EclError;

    fn try_next(&mut self) -> Result<Option<Self::Item>> {
        if self.offset >= self.len {
            return Ok(None);
        }

        let hsize = header_size(self.formatted);
        if self.offset + hsize > self.len {
            return Err(EclError::Scan(format!(
                "truncated header at offset {} ({} bytes left)",
                self.offset,
                self.len - self.offset
            )));
        }

        let mut b = vec![0_u8; hsize as usize];
        self.src.read(self.offset, &mut b)?;
        let header = if self.formatted {
            self.parse_formatted(&b)?
        } else {
            self.parse_unformatted(&b)?
        };

        let payload_offset = self.offset + hsize;
        let size = self
            .layout
            .payload_size(header.data_type, header.count, self.formatted);
        if payload_offset + size > self.len {
            return Err(EclError::Scan(format!(
                "{}: payload of {} bytes truncated at offset {}",
                header.name, size, payload_offset
            )));
        }
        if !self.formatted {
            self.check_markers(&header, payload_offset)?;
        }

        trace!(
            "record {} {} x{} at {}",
            header.name,
            header.data_type,
            header.count,
            payload_offset
        );
        self.offset = payload_offset + size;
        Ok(Some(Record::new(header, payload_offset)))
    }
}

/// scan_all reads every record header of `src`. A malformed record fails
/// the whole scan.
pub fn scan_all<R: RandomAccessFile + ?Sized>(
    src: &R,
    formatted: bool,
    layout: FormatLayout,
) -> Result<Vec<Record>> {
    let records = RecordScanner::new(src, formatted, layout)?.try_collect()?;
    debug!("scanned {} records", records.len());
    Ok(records)
}
