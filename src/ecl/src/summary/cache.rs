//! The `.ESMRY` sidecar: every vector of a single run pre-decoded into one
//! flat REAL record, guarded by a fingerprint of the key list.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{NaiveDateTime, SubsecRound};
use eclsum_utils::time::{date_parts, from_date_parts};

use crate::file::{BinaryFile, OpenOptions};
use crate::record::{FormatLayout, RecordData, RecordWriter, NAME_LEN};
use crate::summary::discovery::{base_of, with_extension};
use crate::{EclError, Result};

pub(crate) const CACHE_EXTENSION: &str = "ESMRY";
const TMP_FILE_SUFFIX: &str = ".initializing";
const FRAGMENTS: usize = 3;

pub(crate) fn cache_path(header: &Path) -> PathBuf {
    with_extension(&base_of(header), CACHE_EXTENSION)
}

/// fingerprint splits a key into three 8 character fragments. Longer keys
/// are cut off.
pub(crate) fn fingerprint(key: &str) -> [String; FRAGMENTS] {
    let mut padded: Vec<u8> = key.bytes().take(NAME_LEN * FRAGMENTS).collect();
    padded.resize(NAME_LEN * FRAGMENTS, b' ');

    let mut out: [String; FRAGMENTS] = Default::default();
    for (i, chunk) in padded.chunks(NAME_LEN).enumerate() {
        out[i] = String::from_utf8_lossy(chunk).trim_end().to_string();
    }
    out
}

fn vector_name(i: usize) -> String {
    format!("V{}", i)
}

/// CacheContents is everything needed to write a sidecar.
pub(crate) struct CacheContents<'a> {
    pub start: NaiveDateTime,
    pub restart: Option<(&'a str, i32)>,
    pub keys: Vec<&'a str>,
    pub units: Vec<&'a str>,
    pub report: &'a [bool],
    pub ministeps: &'a [i32],
    pub vectors: Vec<&'a [f32]>,
}

/// write_cache writes the sidecar under a temporary name and renames it
/// into place once complete.
pub(crate) fn write_cache(path: &Path, contents: &CacheContents<'_>) -> Result<()> {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(TMP_FILE_SUFFIX);
    let tmp = PathBuf::from(tmp);

    let f = File::create(&tmp)?;
    let mut w = RecordWriter::new(BufWriter::new(f), false, FormatLayout::default());

    w.write("START", &RecordData::Inte(date_parts(contents.start).to_vec()))?;
    if let Some((name, step)) = contents.restart {
        let fragments = name
            .as_bytes()
            .chunks(NAME_LEN)
            .map(|c| String::from_utf8_lossy(c).to_string())
            .collect();
        w.write("RESTART", &RecordData::Char(fragments))?;
        w.write("RSTNUM", &RecordData::Inte(vec![step]))?;
    }

    let keycheck = contents
        .keys
        .iter()
        .flat_map(|k| fingerprint(k))
        .collect::<Vec<_>>();
    w.write("KEYCHECK", &RecordData::Char(keycheck))?;
    w.write(
        "UNITS",
        &RecordData::Char(contents.units.iter().map(|u| u.to_string()).collect()),
    )?;
    w.write("RSTEP", &RecordData::Logi(contents.report.to_vec()))?;
    w.write("TSTEP", &RecordData::Inte(contents.ministeps.to_vec()))?;
    for (i, v) in contents.vectors.iter().enumerate() {
        w.write(&vector_name(i), &RecordData::Real(v.to_vec()))?;
    }
    w.flush()?;
    drop(w);

    fs::rename(&tmp, path)?;
    info!(
        "wrote {} vectors x {} steps to {}",
        contents.vectors.len(),
        contents.report.len(),
        path.display()
    );
    Ok(())
}

/// SummaryCache is an opened, validated sidecar.
#[derive(Debug)]
pub(crate) struct SummaryCache {
    file: BinaryFile,
    report: Vec<bool>,
    ministeps: Vec<i32>,
}

impl SummaryCache {
    /// open reads a sidecar and checks it was written for exactly `keys`
    /// and a case starting at `start`.
    pub fn open(
        path: &Path,
        keys: &[&str],
        start: NaiveDateTime,
        layout: FormatLayout,
    ) -> Result<Self> {
        let mut file = BinaryFile::open_with_layout(path, OpenOptions::default(), layout)?;

        let stored = file
            .named_record("START", 0)?
            .as_inte()
            .and_then(from_date_parts)
            .ok_or_else(|| EclError::Format(format!("{}: invalid START", path.display())))?;
        if stored != start.trunc_subsecs(0) {
            return Err(EclError::Consistency(format!(
                "{} was written for a case starting {}, not {}",
                path.display(),
                stored,
                start
            )));
        }

        let keycheck = file
            .named_record("KEYCHECK", 0)?
            .as_strings()
            .map(|v| v.to_vec())
            .unwrap_or_default();
        let expected = keys.iter().flat_map(|k| fingerprint(k)).collect::<Vec<_>>();
        if keycheck != expected {
            return Err(EclError::Consistency(format!(
                "{} was written for a different key list ({} vs {} keys)",
                path.display(),
                keycheck.len() / FRAGMENTS,
                keys.len()
            )));
        }

        let report = file
            .named_record("RSTEP", 0)?
            .as_logi()
            .map(|v| v.to_vec())
            .ok_or_else(|| EclError::Format(format!("{}: RSTEP is not LOGI", path.display())))?;
        let ministeps = file
            .named_record("TSTEP", 0)?
            .as_inte()
            .map(|v| v.to_vec())
            .ok_or_else(|| EclError::Format(format!("{}: TSTEP is not INTE", path.display())))?;
        if ministeps.len() != report.len() {
            return Err(EclError::Consistency(format!(
                "{}: {} ministeps for {} time steps",
                path.display(),
                ministeps.len(),
                report.len()
            )));
        }
        if file.num_named("V0") == 0 && !keys.is_empty() {
            return Err(EclError::Consistency(format!(
                "{}: no vectors stored",
                path.display()
            )));
        }

        debug!("{}: cache valid, {} steps", path.display(), report.len());
        Ok(Self {
            file,
            report,
            ministeps,
        })
    }

    pub fn report(&self) -> &[bool] {
        &self.report
    }

    pub fn ministeps(&self) -> &[i32] {
        &self.ministeps
    }

    /// vector returns the values of vector `i`.
    pub fn vector(&mut self, i: usize) -> Result<Vec<f32>> {
        let name = vector_name(i);
        let values = self
            .file
            .named_record(&name, 0)?
            .as_real()
            .map(|v| v.to_vec())
            .ok_or_else(|| EclError::Format(format!("{} is not REAL", name)))?;
        if values.len() != self.report.len() {
            return Err(EclError::Consistency(format!(
                "{} has {} values for {} time steps",
                name,
                values.len(),
                self.report.len()
            )));
        }
        Ok(values)
    }
}
