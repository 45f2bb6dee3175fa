//! Summary time series: vector metadata, chain discovery, the lazily
//! decoded store and its pre-decoded sidecar.

use serde::{Deserialize, Serialize};

use crate::record::FormatLayout;

mod cache;
mod discovery;
pub mod node;
mod smspec;
pub mod store;

pub use node::{
    cell_ijk, region_num, Category, CategoryKind, NodeEntry, SummaryNode, PLACEHOLDER_NAME,
};
pub use store::SummaryStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    /// follow the RESTART reference of each header back to the first run
    pub include_restarts: bool,
    /// read vectors from a valid `.ESMRY` sidecar instead of the data files
    pub use_cache: bool,
    pub layout: FormatLayout,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            include_restarts: true,
            use_cache: false,
            layout: FormatLayout::default(),
        }
    }
}
