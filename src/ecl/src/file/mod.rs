//! Keyword-indexed access to a single result file.

use std::fs::File;
use std::io::BufWriter;
use std::ops::Range;
use std::path::Path;

use eclsum_storage::file::FileStream;
use eclsum_storage::RandomAccessFileExt;
use serde::{Deserialize, Serialize};

use crate::record::{
    encode_payload, is_formatted, scan_all, FormatLayout, RecordData, RecordHeader, RecordWriter,
};
use crate::{EclError, Result};

mod index;

pub use index::{FileIndex, IndexView};

use index::Occurrences;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenOptions {
    /// allow `replace_record`
    pub writable: bool,
    /// release the OS handle after every read
    pub close_stream: bool,
}

/// RecordHandle identifies one record of a BinaryFile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordHandle(usize);

impl RecordHandle {
    /// index returns the position of the record in the whole file.
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Active {
    Global,
    Block(usize),
}

#[derive(Debug)]
struct CachedBlock {
    keyword: String,
    occurrence: usize,
    range: Range<usize>,
    occ: Occurrences,
}

/// BinaryFile is an opened record file. All lookups go through the active
/// index, which is either the whole file or one selected block.
#[derive(Debug)]
pub struct BinaryFile {
    stream: FileStream,
    formatted: bool,
    layout: FormatLayout,
    global: FileIndex,
    blocks: Vec<CachedBlock>,
    active: Active,
    stack: Vec<Active>,
}

impl BinaryFile {
    pub fn open(path: impl AsRef<Path>, options: OpenOptions) -> Result<Self> {
        Self::open_with_layout(path, options, FormatLayout::default())
    }

    pub fn open_with_layout(
        path: impl AsRef<Path>,
        options: OpenOptions,
        layout: FormatLayout,
    ) -> Result<Self> {
        let path = path.as_ref();
        let stream = FileStream::open(path, options.writable, options.close_stream)?;
        let formatted = is_formatted(&stream)?;
        let records = scan_all(&stream, formatted, layout)?;
        debug!(
            "opened {}: {} records, formatted: {}",
            path.display(),
            records.len(),
            formatted
        );

        Ok(Self {
            stream,
            formatted,
            layout,
            global: FileIndex::from_records(records),
            blocks: vec![],
            active: Active::Global,
            stack: vec![],
        })
    }

    pub fn path(&self) -> &Path {
        self.stream.path()
    }

    pub fn is_formatted(&self) -> bool {
        self.formatted
    }

    pub fn is_writable(&self) -> bool {
        self.stream.is_writable()
    }

    /// close_stream releases the OS handle; it is reopened on the next read.
    pub fn close_stream(&self) {
        self.stream.close()
    }

    pub fn global_index(&self) -> &FileIndex {
        &self.global
    }

    fn active_range(&self) -> Range<usize> {
        match self.active {
            Active::Global => 0..self.global.num_records(),
            Active::Block(i) => self.blocks[i].range.clone(),
        }
    }

    /// active_view returns the currently active index.
    pub fn active_view(&self) -> IndexView<'_> {
        match self.active {
            Active::Global => self.global.view(),
            Active::Block(i) => {
                let block = &self.blocks[i];
                IndexView::with_occurrences(self.global.records(), block.range.clone(), &block.occ)
            }
        }
    }

    pub fn select_global(&mut self) {
        self.active = Active::Global;
    }

    fn block_slot(&mut self, keyword: &str, occurrence: usize) -> Option<usize> {
        let cached = self
            .blocks
            .iter()
            .position(|b| b.keyword == keyword && b.occurrence == occurrence);
        if cached.is_some() {
            return cached;
        }

        let range = self.global.block_range(keyword, occurrence)?;
        let occ = Occurrences::build(&self.global.records()[range.clone()]);
        self.blocks.push(CachedBlock {
            keyword: keyword.to_string(),
            occurrence,
            range,
            occ,
        });
        Some(self.blocks.len() - 1)
    }

    /// select_block makes the `occurrence`'th block bounded by `keyword` the
    /// active index. Blocks are always derived from the whole file. Returns
    /// false, leaving the active index alone, if there is no such block.
    pub fn select_block(&mut self, keyword: &str, occurrence: usize) -> bool {
        match self.block_slot(keyword, occurrence) {
            Some(i) => {
                self.active = Active::Block(i);
                true
            }
            None => false,
        }
    }

    pub fn try_select_block(&mut self, keyword: &str, occurrence: usize) -> Result<()> {
        if self.select_block(keyword, occurrence) {
            Ok(())
        } else {
            Err(EclError::Lookup(format!(
                "no block {}[{}] in {}",
                keyword,
                occurrence,
                self.path().display()
            )))
        }
    }

    /// push_block saves the active index.
    pub fn push_block(&mut self) {
        self.stack.push(self.active);
    }

    /// pop_block restores the most recently pushed index. Returns false if
    /// nothing was pushed.
    pub fn pop_block(&mut self) -> bool {
        match self.stack.pop() {
            Some(active) => {
                self.active = active;
                true
            }
            None => false,
        }
    }

    pub fn num_records(&self) -> usize {
        self.active_range().len()
    }

    pub fn num_named(&self, keyword: &str) -> usize {
        self.active_view().occurrences(keyword)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.active_view().has_keyword(keyword)
    }

    /// record_header returns the header of the i'th record of the active index.
    pub fn record_header(&self, i: usize) -> Option<&RecordHeader> {
        let range = self.active_range();
        if i >= range.len() {
            return None;
        }
        self.global.record(range.start + i).map(|r| r.header())
    }

    pub fn find_record(&self, keyword: &str, occurrence: usize) -> Option<RecordHandle> {
        let view = self.active_view();
        view.global_index(keyword, occurrence)
            .map(|i| RecordHandle(view.start() + i))
    }

    fn load(&mut self, i: usize) -> Result<()> {
        let (header, offset) = match self.global.record(i) {
            Some(r) if r.is_loaded() => return Ok(()),
            Some(r) => (r.header().clone(), r.offset()),
            None => return Err(EclError::Lookup(format!("no record {}", i))),
        };

        let size = self
            .layout
            .payload_size(header.data_type, header.count, self.formatted);
        let bytes = self.stream.read_bytes(offset, size as usize)?;
        let data = RecordData::decode(&bytes, &header, &self.layout, self.formatted)?;
        trace!("decoded {} ({} elements)", header.name, data.len());

        if let Some(r) = self.global.record_mut(i) {
            r.set_data(data);
        }
        Ok(())
    }

    /// record_data returns the decoded payload of a record, reading it on first use.
    pub fn record_data(&mut self, handle: RecordHandle) -> Result<&RecordData> {
        self.load(handle.0)?;
        self.global
            .record(handle.0)
            .and_then(|r| r.data())
            .ok_or_else(|| EclError::Lookup(format!("no record {}", handle.0)))
    }

    /// find_named_record returns the decoded `occurrence`'th `keyword` of
    /// the active index, or None if there is no such record.
    pub fn find_named_record(
        &mut self,
        keyword: &str,
        occurrence: usize,
    ) -> Result<Option<&RecordData>> {
        match self.find_record(keyword, occurrence) {
            Some(handle) => self.record_data(handle).map(Some),
            None => Ok(None),
        }
    }

    /// named_record is `find_named_record` with a missing record reported as
    /// a Lookup error.
    pub fn named_record(&mut self, keyword: &str, occurrence: usize) -> Result<&RecordData> {
        let handle = self.find_record(keyword, occurrence).ok_or_else(|| {
            EclError::Lookup(format!("no record {}[{}]", keyword, occurrence))
        })?;
        self.record_data(handle)
    }

    /// load_all decodes every record of the active index.
    pub fn load_all(&mut self) -> Result<()> {
        for i in self.active_range() {
            self.load(i)?;
        }
        Ok(())
    }

    /// replace_record overwrites the payload of a record in place. The new
    /// payload must have the type and element count of the old one.
    pub fn replace_record(&mut self, handle: RecordHandle, data: RecordData) -> Result<()> {
        if !self.active_range().contains(&handle.0) {
            return Err(EclError::Lookup(format!(
                "record {} is not in the active index",
                handle.0
            )));
        }

        let (header, offset) = match self.global.record(handle.0) {
            Some(r) => (r.header().clone(), r.offset()),
            None => return Err(EclError::Lookup(format!("no record {}", handle.0))),
        };
        if data.data_type() != header.data_type || data.len() != header.count {
            return Err(EclError::Consistency(format!(
                "{}: cannot replace {} x{} with {} x{}",
                header.name,
                header.data_type,
                header.count,
                data.data_type(),
                data.len()
            )));
        }

        let bytes = encode_payload(&data, &self.layout, self.formatted);
        self.stream.write_at(offset, &bytes)?;
        debug!("replaced {} at {}", header.name, offset);

        if let Some(r) = self.global.record_mut(handle.0) {
            r.set_data(data);
        }
        Ok(())
    }

    /// write_to writes the records of the active index to a new file.
    pub fn write_to(&mut self, path: impl AsRef<Path>, formatted: bool) -> Result<()> {
        self.load_all()?;

        let f = File::create(path.as_ref())?;
        let mut w = RecordWriter::new(BufWriter::new(f), formatted, self.layout);
        let range = self.active_range();
        for r in &self.global.records()[range] {
            let data = r
                .data()
                .ok_or_else(|| EclError::Lookup(format!("{} not loaded", r.name())))?;
            w.write(r.name(), data)?;
        }
        w.flush()?;

        info!("wrote {} records to {}", self.num_records(), path.as_ref().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use assert_matches::assert_matches;
    use rand::Rng;

    use crate::file::{BinaryFile, OpenOptions};
    use crate::record::{FormatLayout, RecordData, RecordWriter};
    use crate::EclError;

    fn write_file(path: &Path, formatted: bool, records: &[(&str, RecordData)]) {
        let mut w = RecordWriter::new(Vec::new(), formatted, FormatLayout::default());
        for (name, data) in records {
            w.write(name, data).unwrap();
        }
        std::fs::write(path, w.into_inner()).unwrap();
    }

    fn sample(dir: &Path, formatted: bool) -> PathBuf {
        let path = dir.join(if formatted { "SAMPLE.FUNRST" } else { "SAMPLE.UNRST" });
        write_file(
            &path,
            formatted,
            &[
                ("SEQNUM", RecordData::Inte(vec![1])),
                ("PRESSURE", RecordData::Real(vec![100.0, 200.5, 300.25])),
                ("SWAT", RecordData::Doub(vec![0.5, 0.75])),
                ("SEQNUM", RecordData::Inte(vec![2])),
                ("PRESSURE", RecordData::Real(vec![110.0, 210.5, 310.25])),
                ("ACTIVE", RecordData::Logi(vec![true, false, true])),
                ("WELLS", RecordData::Char(vec!["PROD1".into(), "INJ1".into()])),
            ],
        );
        path
    }

    #[test]
    fn test_named_record() {
        let dir = tempfile::tempdir().unwrap();
        for formatted in [false, true] {
            let mut f = BinaryFile::open(sample(dir.path(), formatted), OpenOptions::default())
                .unwrap();
            assert_eq!(f.is_formatted(), formatted);
            assert_eq!(f.num_records(), 7);
            assert_eq!(f.num_named("PRESSURE"), 2);
            assert!(f.has_keyword("SWAT"));

            let p = f.named_record("PRESSURE", 1).unwrap();
            assert_eq!(p, &RecordData::Real(vec![110.0, 210.5, 310.25]));
            let w = f.named_record("WELLS", 0).unwrap();
            assert_eq!(w.as_strings().unwrap(), &["PROD1".to_string(), "INJ1".to_string()]);
            let s = f.named_record("SWAT", 0).unwrap();
            assert_eq!(s.as_doub().unwrap(), &[0.5, 0.75]);

            assert!(f.find_named_record("PRESSURE", 2).unwrap().is_none());
            assert_matches!(f.named_record("PRESSURE", 2), Err(EclError::Lookup(_)));
            assert_matches!(f.named_record("SGAS", 0), Err(EclError::Lookup(_)));
        }
    }

    #[test]
    fn test_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = BinaryFile::open(sample(dir.path(), false), OpenOptions::default()).unwrap();

        assert!(f.select_block("SEQNUM", 1));
        assert_eq!(f.num_records(), 4);
        assert_eq!(f.num_named("PRESSURE"), 1);
        assert!(!f.has_keyword("SWAT"));
        assert_eq!(f.record_header(0).unwrap().name, "SEQNUM");
        assert!(f.record_header(4).is_none());
        assert_eq!(
            f.named_record("PRESSURE", 0).unwrap(),
            &RecordData::Real(vec![110.0, 210.5, 310.25])
        );

        f.push_block();
        assert!(f.select_block("SEQNUM", 0));
        assert_eq!(f.num_records(), 3);
        assert_eq!(
            f.named_record("PRESSURE", 0).unwrap(),
            &RecordData::Real(vec![100.0, 200.5, 300.25])
        );

        // a miss leaves the active block alone
        assert!(!f.select_block("SEQNUM", 2));
        assert_eq!(f.num_records(), 3);
        assert_matches!(f.try_select_block("SEQNUM", 2), Err(EclError::Lookup(_)));

        assert!(f.pop_block());
        assert_eq!(f.num_records(), 4);
        assert!(!f.pop_block());

        f.select_global();
        assert_eq!(f.num_records(), 7);
        assert_eq!(f.num_named("PRESSURE"), 2);
    }

    #[test]
    fn test_close_stream() {
        let dir = tempfile::tempdir().unwrap();
        let options = OpenOptions {
            writable: false,
            close_stream: true,
        };
        let mut f = BinaryFile::open(sample(dir.path(), false), options).unwrap();

        let first = f.named_record("PRESSURE", 0).unwrap().clone();
        f.close_stream();
        let handle = f.find_record("PRESSURE", 0).unwrap();
        assert!(f.global_index().record(handle.index()).unwrap().is_loaded());
        assert_eq!(f.named_record("PRESSURE", 0).unwrap(), &first);
        assert_eq!(
            f.named_record("ACTIVE", 0).unwrap(),
            &RecordData::Logi(vec![true, false, true])
        );
    }

    #[test]
    fn test_replace_record() {
        let dir = tempfile::tempdir().unwrap();
        for formatted in [false, true] {
            let path = sample(dir.path(), formatted);

            let mut ro = BinaryFile::open(&path, OpenOptions::default()).unwrap();
            let handle = ro.find_record("PRESSURE", 0).unwrap();
            let err = ro
                .replace_record(handle, RecordData::Real(vec![1.0, 2.0, 3.0]))
                .unwrap_err();
            assert_matches!(err, EclError::Io(_));
            drop(ro);

            let options = OpenOptions {
                writable: true,
                close_stream: false,
            };
            let mut f = BinaryFile::open(&path, options).unwrap();
            let handle = f.find_record("PRESSURE", 0).unwrap();
            let before = std::fs::read(&path).unwrap();

            let err = f
                .replace_record(handle, RecordData::Real(vec![1.0, 2.0]))
                .unwrap_err();
            assert_matches!(err, EclError::Consistency(_));
            let err = f
                .replace_record(handle, RecordData::Doub(vec![1.0, 2.0, 3.0]))
                .unwrap_err();
            assert_matches!(err, EclError::Consistency(_));
            assert_eq!(std::fs::read(&path).unwrap(), before);

            // handles outside the active block are rejected
            assert!(f.select_block("SEQNUM", 1));
            assert_matches!(
                f.replace_record(handle, RecordData::Real(vec![1.0, 2.0, 3.0])),
                Err(EclError::Lookup(_))
            );
            f.select_global();

            f.replace_record(handle, RecordData::Real(vec![1.5, -2.0, 30.0]))
                .unwrap();
            assert_eq!(
                f.named_record("PRESSURE", 0).unwrap(),
                &RecordData::Real(vec![1.5, -2.0, 30.0])
            );
            drop(f);

            let mut f = BinaryFile::open(&path, OpenOptions::default()).unwrap();
            assert_eq!(
                f.named_record("PRESSURE", 0).unwrap(),
                &RecordData::Real(vec![1.5, -2.0, 30.0])
            );
            assert_eq!(
                f.named_record("PRESSURE", 1).unwrap(),
                &RecordData::Real(vec![110.0, 210.5, 310.25])
            );
        }
    }

    #[test]
    fn test_reemit_identical() {
        let dir = tempfile::tempdir().unwrap();
        let mut rng = rand::thread_rng();
        let big: Vec<f32> = (0..2345).map(|_| rng.gen_range(-1e6..1e6)).collect();
        let ints: Vec<i32> = (0..1500).map(|_| rng.gen()).collect();
        let strs: Vec<String> = (0..300).map(|i| format!("W{}", i)).collect();

        let path = dir.path().join("BIG.UNSMRY");
        write_file(
            &path,
            false,
            &[
                ("PARAMS", RecordData::Real(big)),
                ("NUMS", RecordData::Inte(ints)),
                ("ENDSOL", RecordData::Mess),
                ("NAMES", RecordData::Char(strs.clone())),
                ("LGRNAMES", RecordData::C0nn(20, strs)),
            ],
        );
        let mut f = BinaryFile::open(&path, OpenOptions::default()).unwrap();
        let out = dir.path().join("COPY.UNSMRY");
        f.write_to(&out, false).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&out).unwrap());

        let path = sample(dir.path(), true);
        let mut f = BinaryFile::open(&path, OpenOptions::default()).unwrap();
        let out = dir.path().join("COPY.FUNRST");
        f.write_to(&out, true).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), std::fs::read(&out).unwrap());

        // a selected block is written on its own
        assert!(f.select_block("SEQNUM", 1));
        let out = dir.path().join("BLOCK.UNRST");
        f.write_to(&out, false).unwrap();
        let mut block = BinaryFile::open(&out, OpenOptions::default()).unwrap();
        assert_eq!(block.num_records(), 4);
        assert_eq!(block.named_record("SEQNUM", 0).unwrap(), &RecordData::Inte(vec![2]));
    }

    #[test]
    fn test_open_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = sample(dir.path(), false);
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();
        assert_matches!(
            BinaryFile::open(&path, OpenOptions::default()),
            Err(EclError::Scan(_))
        );
    }
}
