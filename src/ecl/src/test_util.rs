//! Synthetic summary cases written through the crate's own record writer.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::record::{FormatLayout, RecordData, RecordWriter, NAME_LEN};
use crate::summary::{region_num, CategoryKind, PLACEHOLDER_NAME};

pub(crate) fn write_records(path: &Path, formatted: bool, records: &[(&str, RecordData)]) {
    let f = File::create(path).unwrap();
    let mut w = RecordWriter::new(BufWriter::new(f), formatted, FormatLayout::default());
    for (name, data) in records {
        w.write(name, data).unwrap();
    }
    w.flush().unwrap();
}

/// value_of is the value a fixture stores for `key` at `ministep`.
pub(crate) fn value_of(key: &str, ministep: i32) -> f32 {
    if key == "TIME" {
        return ministep as f32;
    }
    let seed = key.bytes().map(|b| b as i32).sum::<i32>() % 997;
    (ministep * 1000 + seed) as f32
}

/// RunSpec describes one run of a synthetic case.
pub(crate) struct RunSpec {
    pub base: String,
    pub formatted: bool,
    pub unified: bool,
    pub dims: [i32; 3],
    pub start: [i32; 3],
    pub restart: Option<String>,
    pub restart_step: i32,
    pub keys: Vec<String>,
    /// ministeps of each report step
    pub reports: Vec<Vec<i32>>,
}

struct Entry {
    keyword: String,
    name: String,
    num: i32,
    unit: String,
}

impl RunSpec {
    pub fn new(base: &str, keys: &[&str]) -> Self {
        Self {
            base: base.to_string(),
            formatted: false,
            unified: true,
            dims: [10, 10, 5],
            start: [1, 1, 2000],
            restart: None,
            restart_step: 0,
            keys: keys.iter().map(|k| k.to_string()).collect(),
            reports: vec![vec![1, 2], vec![3], vec![4, 5, 6]],
        }
    }

    pub fn with_reports(mut self, reports: &[&[i32]]) -> Self {
        self.reports = reports.iter().map(|r| r.to_vec()).collect();
        self
    }

    fn cell_num(&self, ijk: &str) -> i32 {
        let v: Vec<i32> = ijk.split(',').map(|s| s.parse().unwrap()).collect();
        let [nx, ny, _] = self.dims;
        v[0] + (v[1] - 1) * nx + (v[2] - 1) * nx * ny
    }

    fn number(&self, s: &str) -> i32 {
        if s.contains(',') {
            self.cell_num(s)
        } else if let Some((r1, r2)) = s.split_once('-') {
            region_num(r1.parse().unwrap(), r2.parse().unwrap())
        } else {
            s.parse().unwrap()
        }
    }

    fn entries(&self) -> Vec<Entry> {
        self.keys
            .iter()
            .map(|key| {
                let parts: Vec<&str> = key.split(':').collect();
                let keyword = parts[0].to_string();
                let (name, num) = match parts.len() {
                    1 => (PLACEHOLDER_NAME.to_string(), 0),
                    2 => match CategoryKind::classify(&keyword) {
                        CategoryKind::Well | CategoryKind::Group | CategoryKind::Network => {
                            (parts[1].to_string(), 0)
                        }
                        _ => (PLACEHOLDER_NAME.to_string(), self.number(parts[1])),
                    },
                    _ => (parts[1].to_string(), self.number(parts[2])),
                };
                let unit = if keyword == "TIME" { "DAYS" } else { "SM3" };
                Entry {
                    keyword,
                    name,
                    num,
                    unit: unit.to_string(),
                }
            })
            .collect()
    }

    fn path(&self, dir: &Path, ext: &str) -> PathBuf {
        dir.join(format!("{}.{}", self.base, ext))
    }

    pub fn write_header(&self, dir: &Path) -> PathBuf {
        let entries = self.entries();
        let path = self.path(dir, if self.formatted { "FSMSPEC" } else { "SMSPEC" });
        let [nx, ny, nz] = self.dims;

        let mut records = vec![];
        if let Some(restart) = &self.restart {
            let mut padded = restart.clone().into_bytes();
            padded.resize(9 * NAME_LEN, b' ');
            let fragments = padded
                .chunks(NAME_LEN)
                .map(|c| String::from_utf8(c.to_vec()).unwrap())
                .collect();
            records.push(("RESTART", RecordData::Char(fragments)));
        }
        records.push((
            "DIMENS",
            RecordData::Inte(vec![entries.len() as i32, nx, ny, nz, 0, self.restart_step]),
        ));
        records.push((
            "KEYWORDS",
            RecordData::Char(entries.iter().map(|e| e.keyword.clone()).collect()),
        ));
        records.push((
            "WGNAMES",
            RecordData::Char(entries.iter().map(|e| e.name.clone()).collect()),
        ));
        records.push((
            "NUMS",
            RecordData::Inte(entries.iter().map(|e| e.num).collect()),
        ));
        records.push((
            "UNITS",
            RecordData::Char(entries.iter().map(|e| e.unit.clone()).collect()),
        ));
        records.push(("STARTDAT", RecordData::Inte(self.start.to_vec())));

        write_records(&path, self.formatted, &records);
        path
    }

    fn step_records(&self, seqhdr: usize, ministeps: &[i32]) -> Vec<(&'static str, RecordData)> {
        let mut records = vec![("SEQHDR", RecordData::Inte(vec![seqhdr as i32]))];
        for &m in ministeps {
            records.push(("MINISTEP", RecordData::Inte(vec![m])));
            records.push((
                "PARAMS",
                RecordData::Real(self.keys.iter().map(|k| value_of(k, m)).collect()),
            ));
        }
        records
    }

    /// write_data writes the time steps, one SEQHDR per report step.
    pub fn write_data(&self, dir: &Path) -> Vec<PathBuf> {
        if self.unified {
            let path = self.path(dir, if self.formatted { "FUNSMRY" } else { "UNSMRY" });
            let records = self
                .reports
                .iter()
                .enumerate()
                .flat_map(|(k, steps)| self.step_records(k, steps))
                .collect::<Vec<_>>();
            write_records(&path, self.formatted, &records);
            return vec![path];
        }

        self.reports
            .iter()
            .enumerate()
            .map(|(k, steps)| {
                let n = self.restart_step as usize + k + 1;
                let ext = format!("{}{:04}", if self.formatted { "A" } else { "S" }, n);
                let path = self.path(dir, &ext);
                write_records(&path, self.formatted, &self.step_records(k, steps));
                path
            })
            .collect()
    }

    /// write writes header and data, returning the header path.
    pub fn write(&self, dir: &Path) -> PathBuf {
        self.write_data(dir);
        self.write_header(dir)
    }
}
