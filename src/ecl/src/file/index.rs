use std::borrow::Cow;
use std::collections::HashMap;
use std::ops::Range;

use crate::record::Record;

/// Occurrences maps every keyword to the positions it appears at, in file order.
#[derive(Debug, Clone, Default)]
pub(crate) struct Occurrences {
    by_keyword: HashMap<String, Vec<usize>>,
    distinct: Vec<String>,
}

impl Occurrences {
    pub(crate) fn build(records: &[Record]) -> Self {
        let mut occ = Self::default();
        for (i, r) in records.iter().enumerate() {
            occ.push(r.name(), i);
        }
        occ
    }

    fn push(&mut self, name: &str, i: usize) {
        match self.by_keyword.get_mut(name) {
            Some(v) => v.push(i),
            None => {
                self.by_keyword.insert(name.to_string(), vec![i]);
                self.distinct.push(name.to_string());
            }
        }
    }

    fn get(&self, keyword: &str) -> &[usize] {
        self.by_keyword
            .get(keyword)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

/// FileIndex owns the records of one file in file order.
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    records: Vec<Record>,
    occ: Occurrences,
}

impl FileIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        let occ = Occurrences::build(&records);
        Self { records, occ }
    }

    pub fn add_record(&mut self, record: Record) {
        self.occ.push(record.name(), self.records.len());
        self.records.push(record);
    }

    /// global_index returns the position of the `occurrence`'th record named `keyword`.
    pub fn global_index(&self, keyword: &str, occurrence: usize) -> Option<usize> {
        self.occ.get(keyword).get(occurrence).copied()
    }

    pub fn record(&self, i: usize) -> Option<&Record> {
        self.records.get(i)
    }

    pub(crate) fn record_mut(&mut self, i: usize) -> Option<&mut Record> {
        self.records.get_mut(i)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.occ.by_keyword.contains_key(keyword)
    }

    pub fn num_distinct_keywords(&self) -> usize {
        self.occ.distinct.len()
    }

    /// distinct_keyword returns the i'th distinct keyword in order of first appearance.
    pub fn distinct_keyword(&self, i: usize) -> Option<&str> {
        self.occ.distinct.get(i).map(|s| s.as_str())
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn occurrences(&self, keyword: &str) -> usize {
        self.occ.get(keyword).len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    pub fn view(&self) -> IndexView<'_> {
        IndexView {
            records: &self.records,
            start: 0,
            occ: Cow::Borrowed(&self.occ),
        }
    }

    /// make_block returns the records from the `occurrence`'th `keyword` up
    /// to, but excluding, the next one.
    pub fn make_block(&self, keyword: &str, occurrence: usize) -> Option<IndexView<'_>> {
        let range = self.block_range(keyword, occurrence)?;
        Some(IndexView::over(&self.records, range))
    }

    pub(crate) fn block_range(&self, keyword: &str, occurrence: usize) -> Option<Range<usize>> {
        block_range(self.occ.get(keyword), occurrence, self.records.len())
    }

    pub(crate) fn records(&self) -> &[Record] {
        &self.records
    }
}

fn block_range(positions: &[usize], occurrence: usize, end: usize) -> Option<Range<usize>> {
    let start = *positions.get(occurrence)?;
    let stop = positions.get(occurrence + 1).copied().unwrap_or(end);
    Some(start..stop)
}

/// IndexView is a read-only window over the records of a FileIndex: either
/// all of them or one block. It borrows from the owning index and cannot
/// outlive it.
#[derive(Debug, Clone)]
pub struct IndexView<'a> {
    records: &'a [Record],
    start: usize,
    occ: Cow<'a, Occurrences>,
}

impl<'a> IndexView<'a> {
    pub(crate) fn over(all: &'a [Record], range: Range<usize>) -> Self {
        let records = &all[range.clone()];
        Self {
            records,
            start: range.start,
            occ: Cow::Owned(Occurrences::build(records)),
        }
    }

    pub(crate) fn with_occurrences(
        all: &'a [Record],
        range: Range<usize>,
        occ: &'a Occurrences,
    ) -> Self {
        Self {
            records: &all[range.clone()],
            start: range.start,
            occ: Cow::Borrowed(occ),
        }
    }

    /// start returns the position of the first record in the owning index.
    pub fn start(&self) -> usize {
        self.start
    }

    /// global_index returns the view-local position of the `occurrence`'th `keyword`.
    pub fn global_index(&self, keyword: &str, occurrence: usize) -> Option<usize> {
        self.occ.get(keyword).get(occurrence).copied()
    }

    pub fn record(&self, i: usize) -> Option<&'a Record> {
        self.records.get(i)
    }

    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.occ.by_keyword.contains_key(keyword)
    }

    pub fn num_distinct_keywords(&self) -> usize {
        self.occ.distinct.len()
    }

    pub fn distinct_keyword(&self, i: usize) -> Option<&str> {
        self.occ.distinct.get(i).map(|s| s.as_str())
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn occurrences(&self, keyword: &str) -> usize {
        self.occ.get(keyword).len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Record> {
        self.records.iter()
    }

    /// contains reports whether owner position `i` lies inside this view.
    pub fn contains(&self, i: usize) -> bool {
        i >= self.start && i < self.start + self.records.len()
    }

    /// make_block derives a nested block from this view.
    pub fn make_block(&self, keyword: &str, occurrence: usize) -> Option<IndexView<'a>> {
        let local = block_range(self.occ.get(keyword), occurrence, self.records.len())?;
        let block = IndexView::over(self.records, local);
        Some(IndexView {
            start: self.start + block.start,
            ..block
        })
    }
}
