use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// Name used in WGNAMES for entries that belong to no well or group.
pub const PLACEHOLDER_NAME: &str = ":+:+:+:+";

const RATE_SUFFIXES: [&str; 5] = ["OPR", "GPR", "WPR", "GOR", "WCT"];

const TOTAL_SUFFIXES: [&str; 33] = [
    "OPT", "GPT", "WPT", "GIT", "WIT", "OPTF", "OPTS", "OIT", "OVPT", "OVIT", "MWT", "WVPT",
    "WVIT", "GMT", "GPTF", "SGT", "GST", "FGT", "GCT", "GIMT", "WGPT", "WGIT", "EGT", "EXGT",
    "GVPT", "GVIT", "LPT", "VPT", "VIT", "NPT", "NIT", "CPT", "CIT",
];

/// Misc keywords listed first, in this order.
const EARLY_MISC: [&str; 6] = ["TIME", "DAYS", "DAY", "MONTH", "YEAR", "YEARS"];

const REGION_PACK: i32 = 32768;
const REGION_OFFSET: i32 = 10;

lazy_static! {
    /// Keywords whose leading letter does not give their category.
    static ref MISC_KEYWORDS: HashSet<&'static str> = [
        "NEWTON", "NAIMFRAC", "NLINEARS", "NLINSMIN", "NLINSMAX", "ELAPSED", "MAXDPR",
        "MAXDSO", "MAXDSG", "MAXDSW", "STEPTYPE", "WNEWTON", "SEPARATE", "SUMTHIN",
    ]
    .into_iter()
    .collect();
}

/// CategoryKind is the field-less tag of a Category, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CategoryKind {
    Misc,
    Field,
    Well,
    Group,
    Region,
    Block,
    Completion,
    Segment,
    Aquifer,
    RegionToRegion,
    LocalWell,
    LocalBlock,
    LocalCompletion,
    Network,
}

impl CategoryKind {
    /// classify derives the category of a summary keyword.
    pub fn classify(keyword: &str) -> Self {
        if MISC_KEYWORDS.contains(keyword) {
            return Self::Misc;
        }

        let b = keyword.as_bytes();
        match b.first() {
            Some(b'A') => Self::Aquifer,
            Some(b'B') => Self::Block,
            Some(b'C') => Self::Completion,
            Some(b'F') => Self::Field,
            Some(b'G') => Self::Group,
            Some(b'N') => Self::Network,
            Some(b'S') => Self::Segment,
            Some(b'W') => Self::Well,
            Some(b'L') => match b.get(1) {
                Some(b'B') => Self::LocalBlock,
                Some(b'C') => Self::LocalCompletion,
                Some(b'W') => Self::LocalWell,
                _ => Self::Misc,
            },
            Some(b'R') => {
                if is_region_to_region(keyword) {
                    Self::RegionToRegion
                } else {
                    Self::Region
                }
            }
            _ => Self::Misc,
        }
    }
}

fn is_region_to_region(keyword: &str) -> bool {
    let b = keyword.as_bytes();
    if keyword == "RORFR" {
        return false;
    }
    if b.len() == 3 && b[2] == b'F' {
        return true;
    }
    if keyword == "RNLF" {
        return true;
    }

    let flow_at = |i: usize| b.get(i) == Some(&b'F') && matches!(b.get(i + 1), Some(b'T' | b'R'));
    flow_at(2) || flow_at(3)
}

/// Category carries the identifying fields of a summary vector, one case per kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Category {
    Misc,
    Field,
    Well { name: String },
    Group { name: String },
    Region { num: i32 },
    Block { num: i32, ijk: [i32; 3] },
    Completion { name: String, num: i32, ijk: [i32; 3] },
    Segment { name: String, num: i32 },
    Aquifer { num: i32 },
    RegionToRegion { num: i32, r1: i32, r2: i32 },
    LocalWell { lgr: String, name: String },
    LocalBlock { lgr: String, ijk: [i32; 3] },
    LocalCompletion { lgr: String, name: String, ijk: [i32; 3] },
    Network { name: String },
}

impl Category {
    pub fn kind(&self) -> CategoryKind {
        match self {
            Self::Misc => CategoryKind::Misc,
            Self::Field => CategoryKind::Field,
            Self::Well { .. } => CategoryKind::Well,
            Self::Group { .. } => CategoryKind::Group,
            Self::Region { .. } => CategoryKind::Region,
            Self::Block { .. } => CategoryKind::Block,
            Self::Completion { .. } => CategoryKind::Completion,
            Self::Segment { .. } => CategoryKind::Segment,
            Self::Aquifer { .. } => CategoryKind::Aquifer,
            Self::RegionToRegion { .. } => CategoryKind::RegionToRegion,
            Self::LocalWell { .. } => CategoryKind::LocalWell,
            Self::LocalBlock { .. } => CategoryKind::LocalBlock,
            Self::LocalCompletion { .. } => CategoryKind::LocalCompletion,
            Self::Network { .. } => CategoryKind::Network,
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Well { name }
            | Self::Group { name }
            | Self::Completion { name, .. }
            | Self::Segment { name, .. }
            | Self::LocalWell { name, .. }
            | Self::LocalCompletion { name, .. }
            | Self::Network { name } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn num(&self) -> Option<i32> {
        match self {
            Self::Region { num }
            | Self::Block { num, .. }
            | Self::Completion { num, .. }
            | Self::Segment { num, .. }
            | Self::Aquifer { num }
            | Self::RegionToRegion { num, .. } => Some(*num),
            _ => None,
        }
    }
}

/// NodeEntry is one raw column of a summary header: the keyword, WGNAMES,
/// NUMS and UNITS values at one position, plus the local grid columns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeEntry {
    pub keyword: String,
    pub name: String,
    pub num: i32,
    pub unit: String,
    pub lgr: Option<String>,
    pub lgr_ijk: Option<[i32; 3]>,
}

impl NodeEntry {
    pub fn new(keyword: &str, name: &str, num: i32, unit: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            name: name.to_string(),
            num,
            unit: unit.to_string(),
            lgr: None,
            lgr_ijk: None,
        }
    }

    pub fn with_lgr(mut self, lgr: &str, ijk: [i32; 3]) -> Self {
        self.lgr = Some(lgr.to_string());
        self.lgr_ijk = Some(ijk);
        self
    }
}

fn valid_name(name: &str) -> Option<String> {
    let name = name.trim();
    if name.is_empty() || name == PLACEHOLDER_NAME {
        None
    } else {
        Some(name.to_string())
    }
}

fn valid_num(num: i32) -> Option<i32> {
    if num > 0 {
        Some(num)
    } else {
        None
    }
}

/// cell_ijk unpacks a 1-based cell number into 1-based (i, j, k). Numbers
/// outside the grid give None.
pub fn cell_ijk(num: i32, dims: [i32; 3]) -> Option<[i32; 3]> {
    let [nx, ny, nz] = dims;
    if num <= 0 || nx <= 0 || ny <= 0 || nz <= 0 {
        return None;
    }
    let layer = nx.checked_mul(ny)?;
    if let Some(cells) = layer.checked_mul(nz) {
        if num > cells {
            return None;
        }
    }

    let n0 = num - 1;
    let k = n0 / layer;
    let j = (n0 % layer) / nx;
    let i = n0 % nx;
    Some([i + 1, j + 1, k + 1])
}

/// region_pair unpacks a region-to-region number into (r1, r2).
pub fn region_pair(num: i32) -> (i32, i32) {
    (num % REGION_PACK, num / REGION_PACK - REGION_OFFSET)
}

pub fn region_num(r1: i32, r2: i32) -> i32 {
    r1 + REGION_PACK * (r2 + REGION_OFFSET)
}

fn ijk_str(ijk: &[i32; 3]) -> String {
    format!("{},{},{}", ijk[0], ijk[1], ijk[2])
}

/// SummaryNode describes one summary vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryNode {
    keyword: String,
    unit: String,
    category: Category,
    keys: Vec<String>,
    rate: bool,
    total: bool,
    historical: bool,
}

impl SummaryNode {
    /// new builds the node of a header entry on a grid of `dims` cells.
    /// Returns None for entries that do not denote a usable vector.
    pub fn new(entry: &NodeEntry, dims: [i32; 3]) -> Option<Self> {
        let keyword = entry.keyword.trim();
        if keyword.is_empty() {
            return None;
        }

        let lgr = || entry.lgr.as_deref().and_then(valid_name);
        let category = match CategoryKind::classify(keyword) {
            CategoryKind::Misc => Category::Misc,
            CategoryKind::Field => Category::Field,
            CategoryKind::Well => Category::Well {
                name: valid_name(&entry.name)?,
            },
            CategoryKind::Group => Category::Group {
                name: valid_name(&entry.name)?,
            },
            CategoryKind::Network => Category::Network {
                name: valid_name(&entry.name)?,
            },
            CategoryKind::Region => Category::Region {
                num: valid_num(entry.num)?,
            },
            CategoryKind::Aquifer => Category::Aquifer {
                num: valid_num(entry.num)?,
            },
            CategoryKind::Block => Category::Block {
                num: entry.num,
                ijk: cell_ijk(entry.num, dims)?,
            },
            CategoryKind::Completion => Category::Completion {
                name: valid_name(&entry.name)?,
                num: entry.num,
                ijk: cell_ijk(entry.num, dims)?,
            },
            CategoryKind::Segment => Category::Segment {
                name: valid_name(&entry.name)?,
                num: valid_num(entry.num)?,
            },
            CategoryKind::RegionToRegion => {
                let num = valid_num(entry.num)?;
                let (r1, r2) = region_pair(num);
                Category::RegionToRegion { num, r1, r2 }
            }
            CategoryKind::LocalWell => Category::LocalWell {
                lgr: lgr()?,
                name: valid_name(&entry.name)?,
            },
            CategoryKind::LocalBlock => Category::LocalBlock {
                lgr: lgr()?,
                ijk: entry.lgr_ijk?,
            },
            CategoryKind::LocalCompletion => Category::LocalCompletion {
                lgr: lgr()?,
                name: valid_name(&entry.name)?,
                ijk: entry.lgr_ijk?,
            },
        };

        Some(Self::with_category(keyword, &entry.unit, category))
    }

    fn with_category(keyword: &str, unit: &str, category: Category) -> Self {
        let keys = make_keys(keyword, &category);
        let suffix = keyword.get(1..).unwrap_or("");
        let rate = RATE_SUFFIXES.iter().any(|s| suffix.starts_with(s));
        let total = matches!(
            category.kind(),
            CategoryKind::Field
                | CategoryKind::Well
                | CategoryKind::Group
                | CategoryKind::Region
                | CategoryKind::Completion
        ) && TOTAL_SUFFIXES.iter().any(|s| suffix.starts_with(s));
        let historical = keyword.ends_with('H');

        Self {
            keyword: keyword.to_string(),
            unit: unit.trim().to_string(),
            category,
            keys,
            rate,
            total,
            historical,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn kind(&self) -> CategoryKind {
        self.category.kind()
    }

    /// key returns the primary lookup key, e.g. `WOPR:PROD1` or `BPR:2,3,1`.
    pub fn key(&self) -> &str {
        &self.keys[0]
    }

    /// keys returns every key the node answers to, primary key first.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn is_rate(&self) -> bool {
        self.rate
    }

    pub fn is_total(&self) -> bool {
        self.total
    }

    pub fn is_historical(&self) -> bool {
        self.historical
    }

    fn tie_break(&self, other: &Self) -> Ordering {
        self.keys
            .cmp(&other.keys)
            .then_with(|| self.unit.cmp(&other.unit))
    }
}

fn make_keys(kw: &str, category: &Category) -> Vec<String> {
    match category {
        Category::Misc | Category::Field => vec![kw.to_string()],
        Category::Well { name } | Category::Group { name } | Category::Network { name } => {
            vec![format!("{}:{}", kw, name)]
        }
        Category::Region { num } | Category::Aquifer { num } => vec![format!("{}:{}", kw, num)],
        Category::Block { num, ijk } => {
            vec![format!("{}:{}", kw, ijk_str(ijk)), format!("{}:{}", kw, num)]
        }
        Category::Completion { name, num, ijk } => vec![
            format!("{}:{}:{}", kw, name, ijk_str(ijk)),
            format!("{}:{}:{}", kw, name, num),
        ],
        Category::Segment { name, num } => vec![format!("{}:{}:{}", kw, name, num)],
        Category::RegionToRegion { num, r1, r2 } => {
            vec![format!("{}:{}-{}", kw, r1, r2), format!("{}:{}", kw, num)]
        }
        Category::LocalWell { lgr, name } => vec![format!("{}:{}:{}", kw, lgr, name)],
        Category::LocalBlock { lgr, ijk } => vec![format!("{}:{}:{}", kw, lgr, ijk_str(ijk))],
        Category::LocalCompletion { lgr, name, ijk } => {
            vec![format!("{}:{}:{}:{}", kw, lgr, name, ijk_str(ijk))]
        }
    }
}

fn early_rank(kw: &str) -> usize {
    EARLY_MISC
        .iter()
        .position(|e| *e == kw)
        .unwrap_or(EARLY_MISC.len())
}

fn named_order(a: &str, b: &str) -> Ordering {
    (a == PLACEHOLDER_NAME)
        .cmp(&(b == PLACEHOLDER_NAME))
        .then_with(|| a.cmp(b))
}

impl Ord for SummaryNode {
    fn cmp(&self, other: &Self) -> Ordering {
        use Category::*;

        let by_kind = self.kind().cmp(&other.kind());
        if by_kind != Ordering::Equal {
            return by_kind;
        }

        let kw = || self.keyword.cmp(&other.keyword);
        let order = match (&self.category, &other.category) {
            (Misc, Misc) => early_rank(&self.keyword)
                .cmp(&early_rank(&other.keyword))
                .then_with(kw),
            (Well { name: a }, Well { name: b })
            | (Group { name: a }, Group { name: b })
            | (Network { name: a }, Network { name: b }) => kw().then_with(|| named_order(a, b)),
            (Region { num: a }, Region { num: b })
            | (Aquifer { num: a }, Aquifer { num: b })
            | (Block { num: a, .. }, Block { num: b, .. })
            | (RegionToRegion { num: a, .. }, RegionToRegion { num: b, .. }) => {
                kw().then_with(|| a.cmp(b))
            }
            (Completion { name: a, num: x, .. }, Completion { name: b, num: y, .. })
            | (Segment { name: a, num: x }, Segment { name: b, num: y }) => kw()
                .then_with(|| named_order(a, b))
                .then_with(|| x.cmp(y)),
            (LocalWell { lgr: l1, name: a }, LocalWell { lgr: l2, name: b }) => kw()
                .then_with(|| l1.cmp(l2))
                .then_with(|| named_order(a, b)),
            (LocalBlock { lgr: l1, ijk: a }, LocalBlock { lgr: l2, ijk: b }) => kw()
                .then_with(|| l1.cmp(l2))
                .then_with(|| a.cmp(b)),
            (
                LocalCompletion { lgr: l1, name: a, ijk: x },
                LocalCompletion { lgr: l2, name: b, ijk: y },
            ) => kw()
                .then_with(|| l1.cmp(l2))
                .then_with(|| named_order(a, b))
                .then_with(|| x.cmp(y)),
            _ => kw(),
        };

        order.then_with(|| self.tie_break(other))
    }
}

impl PartialOrd for SummaryNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for SummaryNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}
