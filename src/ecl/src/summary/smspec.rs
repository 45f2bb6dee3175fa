use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use eclsum_utils::time::start_date;

use crate::file::{BinaryFile, OpenOptions};
use crate::record::{FormatLayout, RecordData};
use crate::summary::node::NodeEntry;
use crate::{EclError, Result};

/// SummaryHeader is the content of one SMSPEC/FSMSPEC file.
#[derive(Debug, Clone)]
pub(crate) struct SummaryHeader {
    pub path: PathBuf,
    pub formatted: bool,
    pub dims: [i32; 3],
    /// report step this run restarted from
    pub restart_step: i32,
    pub start: NaiveDateTime,
    /// predecessor base name as written by the simulator, if any
    pub restart: Option<String>,
    /// one entry per PARAMS position
    pub entries: Vec<NodeEntry>,
}

fn required<'a>(f: &'a mut BinaryFile, keyword: &str) -> Result<&'a RecordData> {
    let path = f.path().display().to_string();
    f.find_named_record(keyword, 0)?
        .ok_or_else(|| EclError::Format(format!("{}: missing {}", path, keyword)))
}

fn optional_strings(f: &mut BinaryFile, keyword: &str) -> Result<Vec<String>> {
    Ok(f.find_named_record(keyword, 0)?
        .and_then(|d| d.as_strings())
        .map(|v| v.to_vec())
        .unwrap_or_default())
}

fn optional_ints(f: &mut BinaryFile, keyword: &str) -> Result<Vec<i32>> {
    Ok(f.find_named_record(keyword, 0)?
        .and_then(|d| d.as_inte())
        .map(|v| v.to_vec())
        .unwrap_or_default())
}

fn strings_of(data: &RecordData, keyword: &str) -> Result<Vec<String>> {
    data.as_strings()
        .map(|v| v.to_vec())
        .ok_or_else(|| EclError::Format(format!("{} is not a string array", keyword)))
}

fn ints_of(data: &RecordData, keyword: &str) -> Result<Vec<i32>> {
    data.as_inte()
        .map(|v| v.to_vec())
        .ok_or_else(|| EclError::Format(format!("{} is not an integer array", keyword)))
}

impl SummaryHeader {
    pub fn load(path: impl AsRef<Path>, layout: FormatLayout) -> Result<Self> {
        let path = path.as_ref();
        let mut f = BinaryFile::open_with_layout(path, OpenOptions::default(), layout)?;

        let dimens = ints_of(required(&mut f, "DIMENS")?, "DIMENS")?;
        if dimens.len() < 4 {
            return Err(EclError::Format(format!(
                "{}: DIMENS has {} elements",
                path.display(),
                dimens.len()
            )));
        }
        let dims = [dimens[1], dimens[2], dimens[3]];
        let restart_step = dimens.get(5).copied().unwrap_or(0);

        let startdat = ints_of(required(&mut f, "STARTDAT")?, "STARTDAT")?;
        let start = start_date(&startdat).ok_or_else(|| {
            EclError::Format(format!("{}: invalid STARTDAT {:?}", path.display(), startdat))
        })?;

        let keywords = strings_of(required(&mut f, "KEYWORDS")?, "KEYWORDS")?;
        let mut names = optional_strings(&mut f, "WGNAMES")?;
        if names.is_empty() {
            names = optional_strings(&mut f, "NAMES")?;
        }
        let nums = optional_ints(&mut f, "NUMS")?;
        let units = optional_strings(&mut f, "UNITS")?;
        let lgrs = optional_strings(&mut f, "LGRS")?;
        let numlx = optional_ints(&mut f, "NUMLX")?;
        let numly = optional_ints(&mut f, "NUMLY")?;
        let numlz = optional_ints(&mut f, "NUMLZ")?;

        let restart = optional_strings(&mut f, "RESTART")?.concat();
        let restart = restart.trim();
        let restart = if restart.is_empty() {
            None
        } else {
            Some(restart.to_string())
        };

        let entries = keywords
            .iter()
            .enumerate()
            .map(|(i, kw)| {
                let lgr_ijk = match (numlx.get(i), numly.get(i), numlz.get(i)) {
                    (Some(x), Some(y), Some(z)) => Some([*x, *y, *z]),
                    _ => None,
                };
                NodeEntry {
                    keyword: kw.trim().to_string(),
                    name: names.get(i).map(|s| s.trim().to_string()).unwrap_or_default(),
                    num: nums.get(i).copied().unwrap_or(0),
                    unit: units.get(i).map(|s| s.trim().to_string()).unwrap_or_default(),
                    lgr: lgrs
                        .get(i)
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty()),
                    lgr_ijk,
                }
            })
            .collect::<Vec<_>>();

        debug!(
            "{}: {} header entries, grid {:?}, restart {:?}",
            path.display(),
            entries.len(),
            dims,
            restart
        );

        Ok(Self {
            path: path.to_path_buf(),
            formatted: f.is_formatted(),
            dims,
            restart_step,
            start,
            restart,
            entries,
        })
    }
}
