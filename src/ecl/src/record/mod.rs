//! Keyword records: the header+payload unit every result file is built from.
//!
//! A record is an up to 8 character keyword, an element type, an element count
//! and a payload. Payloads come in two encodings. The unformatted one is big
//! endian binary split into chunks bracketed by byte-count markers, the
//! formatted one is fixed width text split into the same chunks.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

mod data;
mod scanner;
mod writer;

pub use data::{read_inte_at, read_real_at, RecordData};
pub use scanner::{is_formatted, scan_all, RecordScanner};
pub use writer::{encode_header, encode_payload, RecordWriter};

pub(crate) const NAME_LEN: usize = 8;
pub(crate) const MARKER_SIZE: u64 = 4;
pub(crate) const UNFORMATTED_HEADER_SIZE: u64 = 24;
pub(crate) const FORMATTED_HEADER_SIZE: u64 = 31;
pub(crate) const HEADER_MARKER: i32 = 16;

const NUMERIC_CHUNK: usize = 1000;
const STRING_CHUNK: usize = 105;
const FORMATTED_LINE_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Inte,
    Real,
    Doub,
    Logi,
    Char,
    /// Fixed length string of 1..=99 characters.
    C0nn(u8),
    Mess,
}

impl DataType {
    pub fn parse(tag: &[u8]) -> Option<Self> {
        match tag {
            b"INTE" => Some(Self::Inte),
            b"REAL" => Some(Self::Real),
            b"DOUB" => Some(Self::Doub),
            b"LOGI" => Some(Self::Logi),
            b"CHAR" => Some(Self::Char),
            b"MESS" => Some(Self::Mess),
            [b'C', b'0', a, b] if a.is_ascii_digit() && b.is_ascii_digit() => {
                let n = (a - b'0') * 10 + (b - b'0');
                if n == 0 {
                    None
                } else {
                    Some(Self::C0nn(n))
                }
            }
            _ => None,
        }
    }

    pub fn tag(&self) -> String {
        match self {
            Self::Inte => "INTE".to_string(),
            Self::Real => "REAL".to_string(),
            Self::Doub => "DOUB".to_string(),
            Self::Logi => "LOGI".to_string(),
            Self::Char => "CHAR".to_string(),
            Self::C0nn(n) => format!("C{:03}", n),
            Self::Mess => "MESS".to_string(),
        }
    }

    /// element_size returns the size in bytes of one element in the unformatted encoding.
    pub fn element_size(&self) -> usize {
        match self {
            Self::Inte | Self::Real | Self::Logi => 4,
            Self::Doub => 8,
            Self::Char => 8,
            Self::C0nn(n) => *n as usize,
            Self::Mess => 0,
        }
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Self::Char | Self::C0nn(_))
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.tag())
    }
}

/// FormatLayout holds the writer-defined chunking constants. They are not
/// recorded in the files themselves, so a reader has to be told about them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatLayout {
    /// elements per chunk for numeric and logical payloads
    pub numeric_chunk: usize,
    /// elements per chunk for string payloads
    pub string_chunk: usize,
}

impl Default for FormatLayout {
    fn default() -> Self {
        Self {
            numeric_chunk: NUMERIC_CHUNK,
            string_chunk: STRING_CHUNK,
        }
    }
}

impl FormatLayout {
    pub fn chunk_size(&self, ty: DataType) -> usize {
        let n = if ty.is_string() {
            self.string_chunk
        } else {
            self.numeric_chunk
        };
        n.max(1)
    }

    /// columns returns the number of elements per line in the formatted encoding.
    pub fn columns(&self, ty: DataType) -> usize {
        match ty {
            DataType::Inte => 6,
            DataType::Real => 4,
            DataType::Doub => 3,
            DataType::Logi => 25,
            DataType::Char => 7,
            DataType::C0nn(n) => (FORMATTED_LINE_WIDTH / (n as usize + 3)).max(1),
            DataType::Mess => 1,
        }
    }

    /// column_width returns the width in characters of one formatted element.
    pub fn column_width(&self, ty: DataType) -> usize {
        match ty {
            DataType::Inte => 12,
            DataType::Real => 17,
            DataType::Doub => 23,
            DataType::Logi => 3,
            DataType::Char => 11,
            DataType::C0nn(n) => n as usize + 3,
            DataType::Mess => 0,
        }
    }

    fn formatted_chunk_size(&self, ty: DataType, n: usize) -> u64 {
        let cols = self.columns(ty);
        let lines = (n + cols - 1) / cols;
        (n * self.column_width(ty) + lines) as u64
    }

    /// payload_size returns the on-disk size of a payload of `count` elements.
    pub fn payload_size(&self, ty: DataType, count: usize, formatted: bool) -> u64 {
        if count == 0 || ty == DataType::Mess {
            return 0;
        }

        let chunk = self.chunk_size(ty);
        let full = count / chunk;
        let rem = count % chunk;

        if formatted {
            full as u64 * self.formatted_chunk_size(ty, chunk) + self.formatted_chunk_size(ty, rem)
        } else {
            let chunks = full + usize::from(rem > 0);
            (count * ty.element_size()) as u64 + chunks as u64 * 2 * MARKER_SIZE
        }
    }

    /// element_offset returns where element `pos` starts, relative to the
    /// start of the payload.
    pub fn element_offset(&self, ty: DataType, pos: usize, formatted: bool) -> u64 {
        let chunk = self.chunk_size(ty);
        let nchunk = (pos / chunk) as u64;
        let rem = pos % chunk;

        if formatted {
            nchunk * self.formatted_chunk_size(ty, chunk)
                + (rem * self.column_width(ty) + rem / self.columns(ty)) as u64
        } else {
            let full = (chunk * ty.element_size()) as u64 + 2 * MARKER_SIZE;
            nchunk * full + MARKER_SIZE + (rem * ty.element_size()) as u64
        }
    }
}

pub fn header_size(formatted: bool) -> u64 {
    if formatted {
        FORMATTED_HEADER_SIZE
    } else {
        UNFORMATTED_HEADER_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordHeader {
    pub name: String,
    pub data_type: DataType,
    pub count: usize,
}

impl RecordHeader {
    pub fn new(name: impl Into<String>, data_type: DataType, count: usize) -> Self {
        Self {
            name: name.into(),
            data_type,
            count,
        }
    }
}

/// Record is one scanned keyword record. The payload is decoded on first
/// request and kept.
#[derive(Debug, Clone)]
pub struct Record {
    header: RecordHeader,
    /// offset of the payload, just past the header
    offset: u64,
    data: Option<RecordData>,
}

impl Record {
    pub fn new(header: RecordHeader, offset: u64) -> Self {
        Self {
            header,
            offset,
            data: None,
        }
    }

    pub fn header(&self) -> &RecordHeader {
        &self.header
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    pub fn count(&self) -> usize {
        self.header.count
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn data(&self) -> Option<&RecordData> {
        self.data.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    pub(crate) fn set_data(&mut self, data: RecordData) {
        self.data = Some(data);
    }
}

#[cfg(test)]
mod tests {
    use crate::record::{DataType, FormatLayout};

    #[test]
    fn test_data_type_tag() {
        for tag in ["INTE", "REAL", "DOUB", "LOGI", "CHAR", "MESS", "C008", "C099"] {
            let ty = DataType::parse(tag.as_bytes()).unwrap();
            assert_eq!(ty.tag(), tag);
        }
        assert_eq!(DataType::parse(b"C042"), Some(DataType::C0nn(42)));
        assert_eq!(DataType::parse(b"C000"), None);
        assert_eq!(DataType::parse(b"C1AB"), None);
        assert_eq!(DataType::parse(b"XXXX"), None);
    }

    #[test]
    fn test_unformatted_payload_size() {
        let layout = FormatLayout::default();
        assert_eq!(layout.payload_size(DataType::Real, 0, false), 0);
        assert_eq!(layout.payload_size(DataType::Mess, 0, false), 0);
        assert_eq!(layout.payload_size(DataType::Real, 1, false), 12);
        assert_eq!(layout.payload_size(DataType::Real, 1000, false), 4008);
        assert_eq!(layout.payload_size(DataType::Real, 1001, false), 4008 + 12);
        assert_eq!(layout.payload_size(DataType::Doub, 2500, false), 20000 + 24);
        assert_eq!(layout.payload_size(DataType::Char, 106, false), 848 + 16);
    }

    #[test]
    fn test_formatted_payload_size() {
        let layout = FormatLayout::default();
        // one line of four, one partial line of one
        assert_eq!(layout.payload_size(DataType::Real, 5, true), 5 * 17 + 2);
        assert_eq!(layout.payload_size(DataType::Inte, 6, true), 6 * 12 + 1);
        assert_eq!(layout.payload_size(DataType::Logi, 26, true), 26 * 3 + 2);
        // 1000 reals are 250 full lines per chunk
        assert_eq!(
            layout.payload_size(DataType::Real, 1001, true),
            1000 * 17 + 250 + 17 + 1
        );
    }

    #[test]
    fn test_element_offset() {
        let layout = FormatLayout::default();
        assert_eq!(layout.element_offset(DataType::Real, 0, false), 4);
        assert_eq!(layout.element_offset(DataType::Real, 999, false), 4 + 999 * 4);
        assert_eq!(layout.element_offset(DataType::Real, 1000, false), 4008 + 4);
        assert_eq!(layout.element_offset(DataType::Real, 1500, false), 3 * 4 + 1500 * 4);

        assert_eq!(layout.element_offset(DataType::Real, 5, true), 5 * 17 + 1);
        assert_eq!(
            layout.element_offset(DataType::Real, 1004, true),
            1000 * 17 + 250 + 4 * 17 + 1
        );
    }
}
