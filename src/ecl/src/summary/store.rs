//! The summary store indexes every time step of a (possibly restarted) case
//! and decodes vectors on first use.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use common_base::iterator::{TryIterator, TryIterators};
use eclsum_storage::mmap::MmapReadableFile;
use eclsum_storage::RandomAccessFileExt;
use eclsum_utils::glob::Pattern;
use eclsum_utils::time::add_days;

use crate::record::{
    read_inte_at, read_real_at, DataType, FormatLayout, RecordData, RecordHeader,
    RecordScanner,
};
use crate::summary::cache::{cache_path, write_cache, CacheContents, SummaryCache};
use crate::summary::discovery::{base_of, discover_chain, find_data_files};
use crate::summary::node::SummaryNode;
use crate::summary::smspec::SummaryHeader;
use crate::summary::SummaryOptions;
use crate::{EclError, Result};

/// Run is one member of the restart chain.
#[derive(Debug)]
struct Run {
    files: Vec<PathBuf>,
    formatted: bool,
    /// PARAMS position of every store vector in this run
    positions: Vec<Option<usize>>,
}

/// TimeStep locates the MINISTEP and PARAMS payloads of one step.
#[derive(Debug, Clone, Copy)]
struct TimeStep {
    run: usize,
    file: usize,
    ministep: u64,
    params: u64,
    nparams: usize,
}

#[derive(Debug)]
enum Backing {
    Runs { runs: Vec<Run>, steps: Vec<TimeStep> },
    Cache(SummaryCache),
}

/// SummaryStore gives random access to the vectors of a summary case.
#[derive(Debug)]
pub struct SummaryStore {
    header_path: PathBuf,
    options: SummaryOptions,
    start: NaiveDateTime,
    num_runs: usize,
    restart: Option<(String, i32)>,
    nodes: Vec<SummaryNode>,
    /// every key of every node
    index: HashMap<String, usize>,
    report: Vec<bool>,
    ministeps: Option<Vec<i32>>,
    vectors: Vec<Option<Vec<f32>>>,
    backing: Backing,
}

/// collect_nodes builds the union of the vectors of all runs, newest run
/// first. A key seen twice keeps its first node.
fn collect_nodes(chain: &[SummaryHeader]) -> (Vec<SummaryNode>, HashMap<String, usize>) {
    let mut nodes: Vec<SummaryNode> = vec![];
    let mut index = HashMap::new();

    for header in chain.iter().rev() {
        for entry in &header.entries {
            let node = match SummaryNode::new(entry, header.dims) {
                Some(n) => n,
                None => continue,
            };
            if index.contains_key(node.key()) {
                continue;
            }
            for key in node.keys() {
                index.entry(key.clone()).or_insert(nodes.len());
            }
            nodes.push(node);
        }
    }

    (nodes, index)
}

/// positions maps every store vector to its first PARAMS position in a run.
fn positions(header: &SummaryHeader, nodes: &[SummaryNode]) -> Vec<Option<usize>> {
    let mut first: HashMap<String, usize> = HashMap::new();
    for (i, entry) in header.entries.iter().enumerate() {
        if let Some(node) = SummaryNode::new(entry, header.dims) {
            first.entry(node.key().to_string()).or_insert(i);
        }
    }
    nodes.iter().map(|n| first.get(n.key()).copied()).collect()
}

/// scan_run lists the time steps of one run together with their report
/// step flags.
fn scan_run(
    run_index: usize,
    run: &Run,
    nentries: usize,
    layout: FormatLayout,
) -> Result<Vec<(TimeStep, bool)>> {
    let sources = run
        .files
        .iter()
        .map(MmapReadableFile::open)
        .collect::<std::io::Result<Vec<_>>>()?;
    let scanners = sources
        .iter()
        .map(|s| RecordScanner::new(s, run.formatted, layout))
        .collect::<Result<Vec<_>>>()?;
    let mut itr = TryIterators::new(scanners);

    let mut steps = vec![];
    let mut pending: Option<TimeStep> = None;
    let mut ministep: Option<(usize, u64)> = None;

    while let Some(record) = itr.try_next()? {
        let file = itr.position();
        match record.name() {
            "SEQHDR" => {
                if let Some(step) = pending.take() {
                    steps.push((step, true));
                }
            }
            "MINISTEP" => {
                if let Some(step) = pending.take() {
                    steps.push((step, step.file != file));
                }
                if ministep.is_some() {
                    return Err(EclError::Format(format!(
                        "{}: MINISTEP without PARAMS",
                        run.files[file].display()
                    )));
                }
                ministep = Some((file, record.offset()));
            }
            "PARAMS" => {
                let (mfile, offset) = ministep.take().ok_or_else(|| {
                    EclError::Format(format!(
                        "{}: PARAMS without MINISTEP",
                        run.files[file].display()
                    ))
                })?;
                if mfile != file || record.data_type() != DataType::Real {
                    return Err(EclError::Format(format!(
                        "{}: malformed PARAMS at {}",
                        run.files[file].display(),
                        record.offset()
                    )));
                }
                if record.count() < nentries {
                    return Err(EclError::Format(format!(
                        "{}: PARAMS has {} values for {} header entries",
                        run.files[file].display(),
                        record.count(),
                        nentries
                    )));
                }
                pending = Some(TimeStep {
                    run: run_index,
                    file,
                    ministep: offset,
                    params: record.offset(),
                    nparams: record.count(),
                });
            }
            other => {
                return Err(EclError::Format(format!(
                    "{}: unexpected record {} in summary data",
                    run.files[file].display(),
                    other
                )))
            }
        }
    }

    if ministep.is_some() {
        return Err(EclError::Format(format!(
            "{}: data ends after MINISTEP",
            run.files.last().map(|p| p.display().to_string()).unwrap_or_default()
        )));
    }
    if let Some(step) = pending.take() {
        steps.push((step, true));
    }
    Ok(steps)
}

/// for_each_step visits the steps in order, keeping the current data file
/// mapped while consecutive steps live in it.
fn for_each_step(
    runs: &[Run],
    steps: &[TimeStep],
    mut f: impl FnMut(&MmapReadableFile, &Run, &TimeStep) -> Result<()>,
) -> Result<()> {
    let mut open: Option<((usize, usize), MmapReadableFile)> = None;
    for step in steps {
        let key = (step.run, step.file);
        let run = &runs[step.run];
        let src = match open.take() {
            Some((k, src)) if k == key => src,
            _ => MmapReadableFile::open(&run.files[step.file])?,
        };
        let src = &open.insert((key, src)).1;
        f(src, run, step)?;
    }
    Ok(())
}

impl SummaryStore {
    /// open discovers the case at `path` (a base name or any of its result
    /// files) and indexes its time steps. No vector is decoded yet.
    pub fn open(path: impl AsRef<Path>, options: SummaryOptions) -> Result<Self> {
        let base = base_of(path.as_ref());
        let chain = discover_chain(&base, options.layout, options.include_restarts)?;
        let (newest, oldest) = match (chain.last(), chain.first()) {
            (Some(n), Some(o)) => (n, o),
            _ => {
                return Err(EclError::Format(format!(
                    "no summary header found for {}",
                    base.display()
                )))
            }
        };

        let (nodes, index) = collect_nodes(&chain);
        let header_path = newest.path.clone();
        let start = oldest.start;
        let restart = newest
            .restart
            .as_ref()
            .map(|name| (name.clone(), newest.restart_step));

        let sidecar = cache_path(&header_path);
        if options.use_cache && chain.len() == 1 && sidecar.is_file() {
            let keys = nodes.iter().map(|n| n.key()).collect::<Vec<_>>();
            let cache = SummaryCache::open(&sidecar, &keys, start, options.layout)?;
            info!("{}: reading vectors from {}", base.display(), sidecar.display());

            return Ok(Self {
                header_path,
                options,
                start,
                num_runs: 1,
                restart,
                vectors: vec![None; nodes.len()],
                report: cache.report().to_vec(),
                ministeps: Some(cache.ministeps().to_vec()),
                nodes,
                index,
                backing: Backing::Cache(cache),
            });
        }
        if options.use_cache {
            debug!("{}: no usable cache, scanning data files", base.display());
        }

        let mut runs = vec![];
        let mut steps = vec![];
        let mut report = vec![];
        let mut report_number = 0;
        for (i, header) in chain.iter().enumerate() {
            let to = chain.get(i + 1).map(|h| h.restart_step).unwrap_or(i32::MAX);
            let files = find_data_files(&base_of(&header.path), header.formatted)?;
            let run = Run {
                files: files.paths().to_vec(),
                formatted: header.formatted,
                positions: positions(header, &nodes),
            };

            let found = scan_run(i, &run, header.entries.len(), options.layout)?;
            let total = found.len();
            let mut kept = 0;
            for (step, is_report) in found {
                if report_number >= to {
                    break;
                }
                steps.push(step);
                report.push(is_report);
                if is_report {
                    report_number += 1;
                }
                kept += 1;
            }
            // The successor counts its report steps from its restart step.
            if to != i32::MAX {
                report_number = to;
            }
            debug!(
                "{}: {} of {} time steps used",
                header.path.display(),
                kept,
                total
            );
            runs.push(run);
        }

        info!(
            "{}: {} vectors, {} time steps in {} run(s)",
            base.display(),
            nodes.len(),
            steps.len(),
            runs.len()
        );

        Ok(Self {
            header_path,
            options,
            start,
            num_runs: runs.len(),
            restart,
            vectors: vec![None; nodes.len()],
            report,
            ministeps: None,
            nodes,
            index,
            backing: Backing::Runs { runs, steps },
        })
    }

    pub fn header_path(&self) -> &Path {
        &self.header_path
    }

    pub fn options(&self) -> &SummaryOptions {
        &self.options
    }

    /// is_cached reports whether vectors are served from the sidecar.
    pub fn is_cached(&self) -> bool {
        matches!(self.backing, Backing::Cache(_))
    }

    /// has reports whether `key` names a vector of any run.
    pub fn has(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn vector_index(&self, key: &str) -> Result<usize> {
        self.index
            .get(key)
            .copied()
            .ok_or_else(|| EclError::Lookup(format!("no summary vector {}", key)))
    }

    pub fn start_date(&self) -> NaiveDateTime {
        self.start
    }

    pub fn num_time_steps(&self) -> usize {
        self.report.len()
    }

    pub fn num_report_steps(&self) -> usize {
        self.report.iter().filter(|r| **r).count()
    }

    /// report_steps returns the time step indices that close a report step.
    pub fn report_steps(&self) -> Vec<usize> {
        self.report
            .iter()
            .enumerate()
            .filter(|(_, r)| **r)
            .map(|(i, _)| i)
            .collect()
    }

    /// report_step_start returns the time step index recorded for the
    /// 1-based report step `report_step`.
    pub fn report_step_start(&self, report_step: usize) -> Result<usize> {
        let steps = self.report_steps();
        if report_step < 1 || report_step > steps.len() {
            return Err(EclError::Lookup(format!(
                "report step {} outside valid range 1 .. {}",
                report_step,
                steps.len()
            )));
        }
        Ok(steps[report_step - 1])
    }

    pub fn unit(&self, key: &str) -> Result<&str> {
        let i = self.vector_index(key)?;
        Ok(self.nodes[i].unit())
    }

    pub fn node(&self, key: &str) -> Result<&SummaryNode> {
        let i = self.vector_index(key)?;
        Ok(&self.nodes[i])
    }

    /// nodes returns the summary nodes in display order.
    pub fn nodes(&self) -> Vec<&SummaryNode> {
        let mut nodes = self.nodes.iter().collect::<Vec<_>>();
        nodes.sort();
        nodes
    }

    /// keyword_list returns the primary key of every vector, sorted.
    pub fn keyword_list(&self) -> Vec<String> {
        let mut keys = self
            .nodes
            .iter()
            .map(|n| n.key().to_string())
            .collect::<Vec<_>>();
        keys.sort();
        keys
    }

    /// keyword_list_matching is `keyword_list` filtered by a glob pattern.
    pub fn keyword_list_matching(&self, pattern: &str) -> Result<Vec<String>> {
        let pattern = Pattern::new(pattern)
            .map_err(|e| EclError::Lookup(format!("invalid pattern {:?}: {}", pattern, e)))?;
        Ok(self
            .keyword_list()
            .into_iter()
            .filter(|k| pattern.matches(k))
            .collect())
    }

    fn read_vector(&mut self, i: usize) -> Result<Vec<f32>> {
        let layout = self.options.layout;
        match &mut self.backing {
            Backing::Cache(cache) => cache.vector(i),
            Backing::Runs { runs, steps } => {
                let mut values = Vec::with_capacity(steps.len());
                for_each_step(runs, steps, |src, run, step| {
                    let v = match run.positions[i] {
                        Some(pos) => read_real_at(src, step.params, pos, &layout, run.formatted)?,
                        None => f32::NAN,
                    };
                    values.push(v);
                    Ok(())
                })?;
                Ok(values)
            }
        }
    }

    /// get returns the values of `key` at every time step. Steps of runs
    /// that lack the vector hold NaN.
    pub fn get(&mut self, key: &str) -> Result<&[f32]> {
        let i = self.vector_index(key)?;
        let values = match self.vectors[i].take() {
            Some(v) => v,
            None => {
                let v = self.read_vector(i)?;
                trace!("loaded {} ({} values)", key, v.len());
                v
            }
        };
        Ok(self.vectors[i].insert(values).as_slice())
    }

    /// get_at_report_steps returns the values of `key` at the last time step
    /// of every report step.
    pub fn get_at_report_steps(&mut self, key: &str) -> Result<Vec<f32>> {
        let steps = self.report_steps();
        let values = self.get(key)?;
        Ok(steps.iter().map(|&i| values[i]).collect())
    }

    /// dates returns the timestamp of every time step, from the TIME vector.
    pub fn dates(&mut self) -> Result<Vec<NaiveDateTime>> {
        let start = self.start;
        let time = self.get("TIME")?;
        time.iter()
            .map(|&t| {
                add_days(start, t as f64).ok_or_else(|| {
                    EclError::Format(format!("TIME value {} is not a valid date offset", t))
                })
            })
            .collect()
    }

    pub fn dates_at_report_steps(&mut self) -> Result<Vec<NaiveDateTime>> {
        let steps = self.report_steps();
        let dates = self.dates()?;
        Ok(steps.iter().map(|&i| dates[i]).collect())
    }

    /// ministeps returns the MINISTEP counter of every time step.
    pub fn ministeps(&mut self) -> Result<&[i32]> {
        let values = match self.ministeps.take() {
            Some(v) => v,
            None => match &self.backing {
                Backing::Cache(cache) => cache.ministeps().to_vec(),
                Backing::Runs { runs, steps } => {
                    let layout = self.options.layout;
                    let mut values = Vec::with_capacity(steps.len());
                    for_each_step(runs, steps, |src, run, step| {
                        values.push(read_inte_at(src, step.ministep, 0, &layout, run.formatted)?);
                        Ok(())
                    })?;
                    values
                }
            },
        };
        Ok(self.ministeps.insert(values).as_slice())
    }

    /// all_steps_available reports whether no ministep was left out of the
    /// output.
    pub fn all_steps_available(&mut self) -> Result<bool> {
        let ministeps = self.ministeps()?;
        Ok(ministeps.windows(2).all(|w| w[1] - w[0] <= 1))
    }

    /// load_all decodes every vector not loaded yet, reading each PARAMS
    /// record once.
    pub fn load_all(&mut self) -> Result<()> {
        let Self {
            options,
            vectors,
            backing,
            ..
        } = self;
        let pending = (0..vectors.len())
            .filter(|i| vectors[*i].is_none())
            .collect::<Vec<_>>();
        if pending.is_empty() {
            return Ok(());
        }

        match backing {
            Backing::Cache(cache) => {
                for &i in &pending {
                    vectors[i] = Some(cache.vector(i)?);
                }
            }
            Backing::Runs { runs, steps } => {
                let layout = options.layout;
                let mut acc = vec![Vec::with_capacity(steps.len()); pending.len()];
                for_each_step(runs, steps, |src, run, step| {
                    let size = layout.payload_size(DataType::Real, step.nparams, run.formatted);
                    let bytes = src.read_bytes(step.params, size as usize)?;
                    let header = RecordHeader::new("PARAMS", DataType::Real, step.nparams);
                    let data = RecordData::decode(&bytes, &header, &layout, run.formatted)?;
                    let params = data.as_real().unwrap_or_default();
                    for (slot, &v) in pending.iter().enumerate() {
                        let value = run.positions[v]
                            .and_then(|p| params.get(p).copied())
                            .unwrap_or(f32::NAN);
                        acc[slot].push(value);
                    }
                    Ok(())
                })?;
                for (&v, values) in pending.iter().zip(acc) {
                    vectors[v] = Some(values);
                }
            }
        }

        debug!("loaded {} vectors", pending.len());
        Ok(())
    }

    /// make_cache_file writes the `.ESMRY` sidecar of a single run case.
    /// Returns false if the sidecar already exists.
    pub fn make_cache_file(&mut self) -> Result<bool> {
        if self.num_runs > 1 {
            return Err(EclError::Format(format!(
                "{}: cannot cache a restart chain of {} runs",
                self.header_path.display(),
                self.num_runs
            )));
        }

        let path = cache_path(&self.header_path);
        if path.exists() {
            return Ok(false);
        }

        self.load_all()?;
        self.ministeps()?;

        let ministeps = self.ministeps.as_deref().unwrap_or_default();
        let vectors = self
            .vectors
            .iter()
            .map(|v| v.as_deref().unwrap_or_default())
            .collect();
        let contents = CacheContents {
            start: self.start,
            restart: self.restart.as_ref().map(|(name, step)| (name.as_str(), *step)),
            keys: self.nodes.iter().map(|n| n.key()).collect(),
            units: self.nodes.iter().map(|n| n.unit()).collect(),
            report: &self.report,
            ministeps,
            vectors,
        };
        write_cache(&path, &contents)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;

    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    use crate::summary::cache::cache_path;
    use crate::summary::{region_num, SummaryOptions, SummaryStore};
    use crate::test_util::{value_of, RunSpec};
    use crate::EclError;

    const KEYS: [&str; 6] = [
        "TIME",
        "FOPT",
        "WOPR:PROD1",
        "WOPR:PROD2",
        "BPR:2,3,1",
        "RGFT:2-5",
    ];

    fn expected(key: &str, ministeps: &[i32]) -> Vec<f32> {
        ministeps.iter().map(|&m| value_of(key, m)).collect()
    }

    fn check_single_run(run: RunSpec) {
        let dir = tempfile::tempdir().unwrap();
        run.write(dir.path());

        let mut store =
            SummaryStore::open(dir.path().join("CASE"), SummaryOptions::default()).unwrap();
        let all = [1, 2, 3, 4, 5, 6];
        assert_eq!(store.num_time_steps(), 6);
        assert_eq!(store.num_report_steps(), 3);
        assert!(!store.is_cached());

        for key in KEYS {
            assert!(store.has(key), "{}", key);
            assert_eq!(store.get(key).unwrap(), expected(key, &all).as_slice());
        }
        assert_eq!(
            store.get_at_report_steps("FOPT").unwrap(),
            expected("FOPT", &[2, 3, 6])
        );
        assert_eq!(store.ministeps().unwrap(), &all);
    }

    #[test]
    fn test_single_run() {
        check_single_run(RunSpec::new("CASE", &KEYS));
    }

    #[test]
    fn test_numbered_files() {
        let mut run = RunSpec::new("CASE", &KEYS);
        run.unified = false;
        check_single_run(run);
    }

    #[test]
    fn test_formatted_files() {
        let mut run = RunSpec::new("CASE", &KEYS);
        run.formatted = true;
        check_single_run(run);

        let mut run = RunSpec::new("CASE", &KEYS);
        run.formatted = true;
        run.unified = false;
        check_single_run(run);
    }

    #[test]
    fn test_lookups() {
        let dir = tempfile::tempdir().unwrap();
        let path = RunSpec::new("CASE", &KEYS).write(dir.path());
        let mut store = SummaryStore::open(&path, SummaryOptions::default()).unwrap();

        let by_ijk = store.get("BPR:2,3,1").unwrap().to_vec();
        assert_eq!(store.get("BPR:22").unwrap(), by_ijk.as_slice());

        let packed = format!("RGFT:{}", region_num(2, 5));
        let by_pair = store.get("RGFT:2-5").unwrap().to_vec();
        assert_eq!(store.get(&packed).unwrap(), by_pair.as_slice());

        assert!(!store.has("WOPR:PROD3"));
        assert_matches!(store.get("WOPR:PROD3"), Err(EclError::Lookup(_)));
        assert_matches!(store.unit("FOPR"), Err(EclError::Lookup(_)));
        assert_eq!(store.unit("TIME").unwrap(), "DAYS");
        assert_eq!(store.unit("FOPT").unwrap(), "SM3");

        assert_eq!(
            store.keyword_list(),
            vec!["BPR:2,3,1", "FOPT", "RGFT:2-5", "TIME", "WOPR:PROD1", "WOPR:PROD2"]
        );
        assert_eq!(
            store.keyword_list_matching("WOPR:*").unwrap(),
            vec!["WOPR:PROD1", "WOPR:PROD2"]
        );

        let order = store
            .nodes()
            .iter()
            .map(|n| n.key().to_string())
            .collect::<Vec<_>>();
        assert_eq!(
            order,
            vec!["TIME", "FOPT", "WOPR:PROD1", "WOPR:PROD2", "BPR:2,3,1", "RGFT:2-5"]
        );
    }

    #[test]
    fn test_dates_and_steps() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunSpec::new("CASE", &KEYS).with_reports(&[&[1, 2], &[3], &[5, 6]]);
        run.write(dir.path());
        let mut store =
            SummaryStore::open(dir.path().join("CASE"), SummaryOptions::default()).unwrap();

        let start = NaiveDate::from_ymd_opt(2000, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(store.start_date(), start);
        assert_eq!(
            store.dates_at_report_steps().unwrap(),
            vec![
                NaiveDate::from_ymd_opt(2000, 1, 3).unwrap().and_hms_opt(0, 0, 0).unwrap(),
                NaiveDate::from_ymd_opt(2000, 1, 4).unwrap().and_hms_opt(0, 0, 0).unwrap(),
                NaiveDate::from_ymd_opt(2000, 1, 7).unwrap().and_hms_opt(0, 0, 0).unwrap(),
            ]
        );
        assert_eq!(store.dates().unwrap().len(), 5);

        assert!(!store.all_steps_available().unwrap());
        assert_eq!(store.report_step_start(1).unwrap(), 1);
        assert_eq!(store.report_step_start(2).unwrap(), 2);
        assert_eq!(store.report_step_start(3).unwrap(), 4);
        assert_matches!(store.report_step_start(0), Err(EclError::Lookup(_)));
        assert_matches!(store.report_step_start(4), Err(EclError::Lookup(_)));
    }

    #[test]
    fn test_dates_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let run = RunSpec::new("CASE", &["TIME"]).with_reports(&[&[1], &[100_000_000]]);
        run.write(dir.path());
        let mut store =
            SummaryStore::open(dir.path().join("CASE"), SummaryOptions::default()).unwrap();

        assert_eq!(store.get("TIME").unwrap(), &[1.0, 1e8]);
        assert_matches!(store.dates(), Err(EclError::Format(_)));
        assert_matches!(store.dates_at_report_steps(), Err(EclError::Format(_)));
    }

    fn write_chain(dir: &std::path::Path) {
        RunSpec::new("BASE", &["TIME", "FOPT"])
            .with_reports(&[&[1], &[2], &[3], &[4]])
            .write(dir);

        let mut rst1 = RunSpec::new("RST1", &["TIME", "FOPT", "WOPR:PROD1"])
            .with_reports(&[&[3], &[4], &[5]]);
        rst1.restart = Some("BASE".to_string());
        rst1.restart_step = 2;
        rst1.unified = false;
        rst1.write(dir);

        let mut rst2 = RunSpec::new("RST2", &["TIME", "WOPR:PROD1", "FOPT"])
            .with_reports(&[&[5, 6], &[7]]);
        rst2.restart = Some("RST1".to_string());
        rst2.restart_step = 4;
        rst2.write(dir);
    }

    #[test]
    fn test_restart_chain() {
        let dir = tempfile::tempdir().unwrap();
        write_chain(dir.path());

        let mut store =
            SummaryStore::open(dir.path().join("RST2"), SummaryOptions::default()).unwrap();
        let all = [1, 2, 3, 4, 5, 6, 7];
        assert_eq!(store.num_time_steps(), all.len());
        assert_eq!(store.num_report_steps(), 6);
        assert_eq!(store.ministeps().unwrap(), &all);
        assert!(store.all_steps_available().unwrap());

        assert_eq!(store.get("FOPT").unwrap(), expected("FOPT", &all).as_slice());
        assert_eq!(store.get("TIME").unwrap(), expected("TIME", &all).as_slice());

        let wopr = store.get("WOPR:PROD1").unwrap().to_vec();
        assert_eq!(wopr.len(), all.len());
        assert!(wopr[..2].iter().all(|v| v.is_nan()));
        assert_eq!(&wopr[2..], expected("WOPR:PROD1", &all[2..]).as_slice());

        assert_eq!(store.keyword_list(), vec!["FOPT", "TIME", "WOPR:PROD1"]);
        assert_matches!(store.make_cache_file(), Err(EclError::Format(_)));

        let options = SummaryOptions {
            include_restarts: false,
            ..Default::default()
        };
        let mut store = SummaryStore::open(dir.path().join("RST2"), options).unwrap();
        assert_eq!(store.num_time_steps(), 3);
        assert_eq!(store.get("FOPT").unwrap(), expected("FOPT", &[5, 6, 7]).as_slice());
    }

    #[test]
    fn test_restart_after_short_run() {
        let dir = tempfile::tempdir().unwrap();
        RunSpec::new("BASE", &["TIME", "FOPT"])
            .with_reports(&[&[1], &[2]])
            .write(dir.path());

        let mut rst1 = RunSpec::new("RST1", &["TIME", "FOPT"]).with_reports(&[&[5], &[6], &[7]]);
        rst1.restart = Some("BASE".to_string());
        rst1.restart_step = 4;
        rst1.write(dir.path());

        let mut rst2 = RunSpec::new("RST2", &["TIME", "FOPT"]).with_reports(&[&[6], &[7]]);
        rst2.restart = Some("RST1".to_string());
        rst2.restart_step = 5;
        rst2.write(dir.path());

        let mut store =
            SummaryStore::open(dir.path().join("RST2"), SummaryOptions::default()).unwrap();
        let kept = [1, 2, 5, 6, 7];
        assert_eq!(store.num_time_steps(), kept.len());
        assert_eq!(store.ministeps().unwrap(), &kept);
        assert_eq!(store.get("TIME").unwrap(), expected("TIME", &kept).as_slice());
    }

    #[test]
    fn test_missing_predecessor() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = RunSpec::new("RST", &["TIME", "FOPT"]);
        run.restart = Some("GONE".to_string());
        run.restart_step = 1;
        run.write(dir.path());

        assert_matches!(
            SummaryStore::open(dir.path().join("RST"), SummaryOptions::default()),
            Err(EclError::Format(_))
        );
    }

    #[test]
    fn test_missing_data() {
        let dir = tempfile::tempdir().unwrap();
        RunSpec::new("CASE", &KEYS).write_header(dir.path());
        assert_matches!(
            SummaryStore::open(dir.path().join("CASE"), SummaryOptions::default()),
            Err(EclError::Format(_))
        );
    }

    #[test]
    fn test_load_all() {
        let dir = tempfile::tempdir().unwrap();
        RunSpec::new("CASE", &KEYS).write(dir.path());
        let mut lazy =
            SummaryStore::open(dir.path().join("CASE"), SummaryOptions::default()).unwrap();
        let mut eager =
            SummaryStore::open(dir.path().join("CASE"), SummaryOptions::default()).unwrap();

        lazy.get("FOPT").unwrap();
        eager.load_all().unwrap();
        for key in KEYS {
            let a = lazy.get(key).unwrap().to_vec();
            assert_eq!(eager.get(key).unwrap(), a.as_slice());
        }
    }

    #[test]
    fn test_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut run = RunSpec::new("CASE", &KEYS);
        run.restart = Some("BASE".to_string());
        run.restart_step = 3;
        let header = run.write(dir.path());

        let options = SummaryOptions {
            include_restarts: false,
            use_cache: true,
            ..Default::default()
        };
        let mut direct = SummaryStore::open(&header, options).unwrap();
        assert!(!direct.is_cached());
        assert!(direct.make_cache_file().unwrap());
        assert!(!direct.make_cache_file().unwrap());
        assert!(cache_path(&header).is_file());

        let mut cached = SummaryStore::open(&header, options).unwrap();
        assert!(cached.is_cached());
        assert_eq!(cached.num_time_steps(), direct.num_time_steps());
        assert_eq!(cached.report_steps(), direct.report_steps());
        assert_eq!(
            cached.ministeps().unwrap().to_vec(),
            direct.ministeps().unwrap().to_vec()
        );
        for key in KEYS {
            let a = direct.get(key).unwrap().to_vec();
            assert_eq!(cached.get(key).unwrap(), a.as_slice(), "{}", key);
        }

        let plain = SummaryOptions {
            use_cache: false,
            ..options
        };
        assert!(!SummaryStore::open(&header, plain).unwrap().is_cached());
    }

    #[test]
    fn test_cache_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let header = RunSpec::new("CASE", &KEYS).write(dir.path());
        let options = SummaryOptions {
            use_cache: true,
            ..Default::default()
        };
        SummaryStore::open(&header, options)
            .unwrap()
            .make_cache_file()
            .unwrap();

        // same case rewritten with a different key list
        RunSpec::new("CASE", &["TIME", "FOPT"]).write(dir.path());
        assert_matches!(
            SummaryStore::open(&header, options),
            Err(EclError::Consistency(_))
        );

        File::create(cache_path(&header)).unwrap();
        assert!(SummaryStore::open(&header, options).is_err());
    }

    #[test]
    fn test_cache_dotted_case_names() {
        let dir = tempfile::tempdir().unwrap();
        let first = RunSpec::new("RUN.1", &KEYS)
            .with_reports(&[&[1], &[2]])
            .write(dir.path());
        let second = RunSpec::new("RUN.2", &KEYS)
            .with_reports(&[&[1], &[2], &[3], &[4]])
            .write(dir.path());
        assert_eq!(cache_path(&first), dir.path().join("RUN.1.ESMRY"));
        assert_eq!(cache_path(&second), dir.path().join("RUN.2.ESMRY"));

        let options = SummaryOptions {
            use_cache: true,
            ..Default::default()
        };
        assert!(SummaryStore::open(&first, options)
            .unwrap()
            .make_cache_file()
            .unwrap());

        let mut store = SummaryStore::open(&second, options).unwrap();
        assert!(!store.is_cached());
        assert_eq!(store.num_time_steps(), 4);
        assert!(store.make_cache_file().unwrap());

        let mut store = SummaryStore::open(dir.path().join("RUN.2"), options).unwrap();
        assert!(store.is_cached());
        assert_eq!(store.get("TIME").unwrap(), &[1.0, 2.0, 3.0, 4.0]);
    }
}
