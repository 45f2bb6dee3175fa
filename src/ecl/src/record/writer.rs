use std::io::Write;

use bytes::BufMut;

use crate::record::{
    header_size, DataType, FormatLayout, RecordData, HEADER_MARKER, NAME_LEN,
};
use crate::{EclError, Result};

fn fixed_str(dst: &mut Vec<u8>, s: &str, width: usize) {
    let b = s.as_bytes();
    let n = b.len().min(width);
    dst.put_slice(&b[..n]);
    dst.put_bytes(b' ', width - n);
}

/// encode_header returns the header bytes of a record.
pub fn encode_header(name: &str, ty: DataType, count: usize, formatted: bool) -> Result<Vec<u8>> {
    if name.len() > NAME_LEN || !name.is_ascii() {
        return Err(EclError::Format(format!("invalid keyword name {:?}", name)));
    }
    if count > i32::MAX as usize {
        return Err(EclError::Format(format!("{}: too many elements {}", name, count)));
    }

    let mut b = Vec::with_capacity(header_size(formatted) as usize);
    if formatted {
        let line = format!(" '{:<8}' {:>11} '{}'\n", name, count, ty.tag());
        b.put_slice(line.as_bytes());
    } else {
        b.put_i32(HEADER_MARKER);
        fixed_str(&mut b, name, NAME_LEN);
        b.put_i32(count as i32);
        b.put_slice(ty.tag().as_bytes());
        b.put_i32(HEADER_MARKER);
    }

    Ok(b)
}

/// scientific renders `x` as a `0.ddddE+xx` style mantissa/exponent pair.
/// Exponents of three digits drop the letter (`0.dddd-123`) and non-finite
/// values are written as right-aligned `NaN`/`inf`, so every field keeps the
/// column width.
fn scientific(x: f64, width: usize, precision: usize, exp: char) -> String {
    if !x.is_finite() {
        return format!("{:>w$}", x, w = width + 6);
    }

    let (mut arg, mut pow) = (0.0, 0.0);
    if x != 0.0 {
        pow = x.abs().log10().ceil();
        arg = x / 10_f64.powf(pow);
        if arg.abs() == 1.0 {
            arg *= 0.1;
            pow += 1.0;
        }
    }
    let pow = pow as i32;
    if pow.abs() >= 100 {
        return format!(
            "  {:>width$.precision$}{:+04}",
            arg,
            pow,
            width = width,
            precision = precision
        );
    }
    format!(
        "  {:>width$.precision$}{}{:+03}",
        arg,
        exp,
        pow,
        width = width,
        precision = precision
    )
}

fn formatted_element(dst: &mut Vec<u8>, data: &RecordData, i: usize) {
    match data {
        RecordData::Inte(v) => dst.put_slice(format!(" {:>11}", v[i]).as_bytes()),
        RecordData::Real(v) => dst.put_slice(scientific(v[i] as f64, 11, 8, 'E').as_bytes()),
        RecordData::Doub(v) => dst.put_slice(scientific(v[i], 17, 14, 'D').as_bytes()),
        RecordData::Logi(v) => dst.put_slice(if v[i] { b"  T" } else { b"  F" }),
        RecordData::Char(v) => {
            dst.put_slice(b" '");
            fixed_str(dst, &v[i], NAME_LEN);
            dst.put_u8(b'\'');
        }
        RecordData::C0nn(n, v) => {
            dst.put_slice(b" '");
            fixed_str(dst, &v[i], *n as usize);
            dst.put_u8(b'\'');
        }
        RecordData::Mess => {}
    }
}

fn unformatted_element(dst: &mut Vec<u8>, data: &RecordData, i: usize) {
    match data {
        RecordData::Inte(v) => dst.put_i32(v[i]),
        RecordData::Real(v) => dst.put_f32(v[i]),
        RecordData::Doub(v) => dst.put_f64(v[i]),
        RecordData::Logi(v) => dst.put_i32(if v[i] { -1 } else { 0 }),
        RecordData::Char(v) => fixed_str(dst, &v[i], NAME_LEN),
        RecordData::C0nn(n, v) => fixed_str(dst, &v[i], *n as usize),
        RecordData::Mess => {}
    }
}

/// encode_payload returns the on-disk payload bytes of `data`.
pub fn encode_payload(data: &RecordData, layout: &FormatLayout, formatted: bool) -> Vec<u8> {
    let ty = data.data_type();
    let count = data.len();
    let chunk = layout.chunk_size(ty);

    let mut b = Vec::with_capacity(layout.payload_size(ty, count, formatted) as usize);
    let mut start = 0;
    while start < count {
        let end = count.min(start + chunk);
        if formatted {
            let cols = layout.columns(ty);
            for (j, i) in (start..end).enumerate() {
                formatted_element(&mut b, data, i);
                if (j + 1) % cols == 0 || i + 1 == end {
                    b.put_u8(b'\n');
                }
            }
        } else {
            let nbytes = ((end - start) * ty.element_size()) as i32;
            b.put_i32(nbytes);
            for i in start..end {
                unformatted_element(&mut b, data, i);
            }
            b.put_i32(nbytes);
        }
        start = end;
    }

    b
}

/// RecordWriter appends records to a stream in either encoding.
pub struct RecordWriter<W: Write> {
    w: W,
    formatted: bool,
    layout: FormatLayout,
    offset: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(w: W, formatted: bool, layout: FormatLayout) -> Self {
        Self {
            w,
            formatted,
            layout,
            offset: 0,
        }
    }

    /// write appends one record and returns the offset of its payload.
    pub fn write(&mut self, name: &str, data: &RecordData) -> Result<u64> {
        let header = encode_header(name, data.data_type(), data.len(), self.formatted)?;
        let payload = encode_payload(data, &self.layout, self.formatted);

        self.w.write_all(&header)?;
        self.w.write_all(&payload)?;

        let payload_offset = self.offset + header.len() as u64;
        self.offset = payload_offset + payload.len() as u64;
        Ok(payload_offset)
    }

    /// offset returns the number of bytes written so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn flush(&mut self) -> Result<()> {
        self.w.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.w
    }
}
