use byteorder::{BigEndian, ByteOrder};
use eclsum_storage::RandomAccessFile;

use crate::record::{DataType, FormatLayout, RecordHeader};
use crate::{EclError, Result};

/// RecordData is a decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordData {
    Inte(Vec<i32>),
    Real(Vec<f32>),
    Doub(Vec<f64>),
    Logi(Vec<bool>),
    Char(Vec<String>),
    C0nn(u8, Vec<String>),
    Mess,
}

impl RecordData {
    pub fn data_type(&self) -> DataType {
        match self {
            Self::Inte(_) => DataType::Inte,
            Self::Real(_) => DataType::Real,
            Self::Doub(_) => DataType::Doub,
            Self::Logi(_) => DataType::Logi,
            Self::Char(_) => DataType::Char,
            Self::C0nn(n, _) => DataType::C0nn(*n),
            Self::Mess => DataType::Mess,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Inte(v) => v.len(),
            Self::Real(v) => v.len(),
            Self::Doub(v) => v.len(),
            Self::Logi(v) => v.len(),
            Self::Char(v) | Self::C0nn(_, v) => v.len(),
            Self::Mess => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_inte(&self) -> Option<&[i32]> {
        match self {
            Self::Inte(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_real(&self) -> Option<&[f32]> {
        match self {
            Self::Real(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_doub(&self) -> Option<&[f64]> {
        match self {
            Self::Doub(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_logi(&self) -> Option<&[bool]> {
        match self {
            Self::Logi(v) => Some(v),
            _ => None,
        }
    }

    /// as_strings returns the elements of either string type.
    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Self::Char(v) | Self::C0nn(_, v) => Some(v),
            _ => None,
        }
    }

    /// to_f64 widens any numeric payload.
    pub fn to_f64(&self) -> Option<Vec<f64>> {
        match self {
            Self::Inte(v) => Some(v.iter().map(|x| *x as f64).collect()),
            Self::Real(v) => Some(v.iter().map(|x| *x as f64).collect()),
            Self::Doub(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// decode parses a complete on-disk payload, markers or line breaks included.
    pub fn decode(
        bytes: &[u8],
        header: &RecordHeader,
        layout: &FormatLayout,
        formatted: bool,
    ) -> Result<Self> {
        let ty = header.data_type;
        if ty == DataType::Mess {
            return Ok(Self::Mess);
        }

        if formatted {
            decode_formatted(bytes, header, layout)
        } else {
            decode_unformatted(bytes, header, layout)
        }
    }
}

fn scan_err(header: &RecordHeader, msg: impl AsRef<str>) -> EclError {
    EclError::Scan(format!("{}: {}", header.name, msg.as_ref()))
}

fn decode_str(b: &[u8]) -> String {
    String::from_utf8_lossy(b).trim_end().to_string()
}

/// strip_markers concatenates the chunk bodies of an unformatted payload.
fn strip_markers(bytes: &[u8], header: &RecordHeader, layout: &FormatLayout) -> Result<Vec<u8>> {
    let ty = header.data_type;
    let elem_size = ty.element_size();
    let chunk = layout.chunk_size(ty);

    let mut raw = Vec::with_capacity(header.count * elem_size);
    let mut cursor = 0;
    let mut remaining = header.count;
    while remaining > 0 {
        let n = remaining.min(chunk);
        let nbytes = n * elem_size;

        let head = bytes
            .get(cursor..cursor + 4)
            .ok_or_else(|| scan_err(header, "payload truncated"))?;
        let body = bytes
            .get(cursor + 4..cursor + 4 + nbytes)
            .ok_or_else(|| scan_err(header, "payload truncated"))?;
        let tail = bytes
            .get(cursor + 4 + nbytes..cursor + 8 + nbytes)
            .ok_or_else(|| scan_err(header, "payload truncated"))?;

        let lead = BigEndian::read_i32(head);
        let trail = BigEndian::read_i32(tail);
        if lead as usize != nbytes || lead != trail {
            return Err(scan_err(
                header,
                format!("chunk markers {}/{} expected {}", lead, trail, nbytes),
            ));
        }

        raw.extend_from_slice(body);
        cursor += nbytes + 8;
        remaining -= n;
    }

    Ok(raw)
}

fn decode_unformatted(
    bytes: &[u8],
    header: &RecordHeader,
    layout: &FormatLayout,
) -> Result<RecordData> {
    let raw = strip_markers(bytes, header, layout)?;
    let count = header.count;

    let data = match header.data_type {
        DataType::Inte => {
            let mut v = vec![0_i32; count];
            BigEndian::read_i32_into(&raw, &mut v);
            RecordData::Inte(v)
        }
        DataType::Real => {
            let mut v = vec![0_f32; count];
            BigEndian::read_f32_into(&raw, &mut v);
            RecordData::Real(v)
        }
        DataType::Doub => {
            let mut v = vec![0_f64; count];
            BigEndian::read_f64_into(&raw, &mut v);
            RecordData::Doub(v)
        }
        DataType::Logi => RecordData::Logi(
            raw.chunks_exact(4)
                .map(|b| BigEndian::read_i32(b) != 0)
                .collect(),
        ),
        DataType::Char => RecordData::Char(raw.chunks_exact(8).map(decode_str).collect()),
        DataType::C0nn(n) => {
            RecordData::C0nn(n, raw.chunks_exact(n as usize).map(decode_str).collect())
        }
        DataType::Mess => RecordData::Mess,
    };

    Ok(data)
}

/// formatted_fields splits a formatted payload into its fixed width element fields.
fn formatted_fields<'a>(
    bytes: &'a [u8],
    header: &RecordHeader,
    layout: &FormatLayout,
) -> Result<Vec<&'a [u8]>> {
    let ty = header.data_type;
    let chunk = layout.chunk_size(ty);
    let cols = layout.columns(ty);
    let width = layout.column_width(ty);

    let mut fields = Vec::with_capacity(header.count);
    let mut cursor = 0;
    let mut remaining = header.count;
    while remaining > 0 {
        let n = remaining.min(chunk);
        let mut left = n;
        while left > 0 {
            let k = left.min(cols);
            for _ in 0..k {
                let field = bytes
                    .get(cursor..cursor + width)
                    .ok_or_else(|| scan_err(header, "payload truncated"))?;
                fields.push(field);
                cursor += width;
            }
            if bytes.get(cursor) != Some(&b'\n') {
                return Err(scan_err(header, format!("line break expected at {}", cursor)));
            }
            cursor += 1;
            left -= k;
        }
        remaining -= n;
    }

    Ok(fields)
}

pub(crate) fn parse_number<T: std::str::FromStr>(field: &[u8], exp: Option<u8>) -> Option<T> {
    let mut text = std::str::from_utf8(field).ok()?.trim().to_string();
    if let Some(c) = exp {
        text = text.replace(c as char, "E");
    }
    // `0.1-299`: three-digit exponents carry no letter.
    let sign = text.rfind(|c| c == '+' || c == '-');
    if let Some(pos) = sign.filter(|&p| p > 0 && text.as_bytes()[p - 1].is_ascii_digit()) {
        text.insert(pos, 'E');
    }
    text.parse().ok()
}

fn parse_string(field: &[u8]) -> Option<String> {
    // ` 'xxxxxxxx'`
    if field.len() < 3 || field[1] != b'\'' || field[field.len() - 1] != b'\'' {
        return None;
    }
    Some(decode_str(&field[2..field.len() - 1]))
}

fn collect_fields<T>(
    fields: &[&[u8]],
    header: &RecordHeader,
    parse: impl Fn(&[u8]) -> Option<T>,
) -> Result<Vec<T>> {
    fields
        .iter()
        .map(|f| {
            parse(*f).ok_or_else(|| {
                let text = String::from_utf8_lossy(f);
                scan_err(header, format!("invalid {} element {:?}", header.data_type, text))
            })
        })
        .collect()
}

fn decode_formatted(
    bytes: &[u8],
    header: &RecordHeader,
    layout: &FormatLayout,
) -> Result<RecordData> {
    let fields = formatted_fields(bytes, header, layout)?;

    let data = match header.data_type {
        DataType::Inte => {
            RecordData::Inte(collect_fields(&fields, header, |f| parse_number(f, None))?)
        }
        DataType::Real => {
            RecordData::Real(collect_fields(&fields, header, |f| parse_number(f, None))?)
        }
        DataType::Doub => {
            RecordData::Doub(collect_fields(&fields, header, |f| parse_number(f, Some(b'D')))?)
        }
        DataType::Logi => RecordData::Logi(collect_fields(&fields, header, |f| {
            match std::str::from_utf8(f).ok()?.trim() {
                "T" => Some(true),
                "F" => Some(false),
                _ => None,
            }
        })?),
        DataType::Char => RecordData::Char(collect_fields(&fields, header, parse_string)?),
        DataType::C0nn(n) => RecordData::C0nn(n, collect_fields(&fields, header, parse_string)?),
        DataType::Mess => RecordData::Mess,
    };

    Ok(data)
}

/// read_real_at decodes element `pos` of the REAL payload starting at
/// `payload_offset` without reading the rest of the record.
pub fn read_real_at<R: RandomAccessFile + ?Sized>(
    src: &R,
    payload_offset: u64,
    pos: usize,
    layout: &FormatLayout,
    formatted: bool,
) -> Result<f32> {
    let offset = payload_offset + layout.element_offset(DataType::Real, pos, formatted);

    if formatted {
        let width = layout.column_width(DataType::Real);
        let mut buf = vec![0_u8; width];
        src.read(offset, &mut buf)?;
        parse_number(&buf, None).ok_or_else(|| {
            EclError::Scan(format!(
                "invalid REAL element {:?} at {}",
                String::from_utf8_lossy(&buf),
                offset
            ))
        })
    } else {
        let mut buf = [0_u8; 4];
        src.read(offset, &mut buf)?;
        Ok(BigEndian::read_f32(&buf))
    }
}

/// read_inte_at decodes element `pos` of the INTE payload starting at `payload_offset`.
pub fn read_inte_at<R: RandomAccessFile + ?Sized>(
    src: &R,
    payload_offset: u64,
    pos: usize,
    layout: &FormatLayout,
    formatted: bool,
) -> Result<i32> {
    let offset = payload_offset + layout.element_offset(DataType::Inte, pos, formatted);

    if formatted {
        let mut buf = vec![0_u8; layout.column_width(DataType::Inte)];
        src.read(offset, &mut buf)?;
        parse_number(&buf, None).ok_or_else(|| {
            EclError::Scan(format!(
                "invalid INTE element {:?} at {}",
                String::from_utf8_lossy(&buf),
                offset
            ))
        })
    } else {
        let mut buf = [0_u8; 4];
        src.read(offset, &mut buf)?;
        Ok(BigEndian::read_i32(&buf))
    }
}
