use std::fs;

use clap::Parser;
use eclsum_io::summary::{SummaryOptions, SummaryStore};
use eclsum_utils::time::time_format;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    /// case base name or any of its result files
    #[clap(long)]
    pub path: String,

    /// JSON file with summary options
    #[clap(long)]
    pub config: Option<String>,

    /// only read the named run, not its restart predecessors
    #[clap(long)]
    pub no_restarts: bool,

    #[clap(long)]
    pub use_cache: bool,

    /// print every vector whose key matches this glob
    #[clap(long)]
    pub print: Option<String>,

    /// only print values at report steps
    #[clap(long)]
    pub report_steps: bool,

    /// write the ESMRY sidecar
    #[clap(long)]
    pub make_cache: bool,
}

impl Config {
    fn options(&self) -> anyhow::Result<SummaryOptions> {
        let mut options = match &self.config {
            Some(path) => serde_json::from_str(&fs::read_to_string(path)?)?,
            None => SummaryOptions::default(),
        };
        if self.no_restarts {
            options.include_restarts = false;
        }
        if self.use_cache {
            options.use_cache = true;
        }
        Ok(options)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    info!("config: {:?}", config);
    if config.path.is_empty() {
        println!("path MUST not be empty!");
        return Ok(());
    }

    let options = config.options()?;
    let mut store = SummaryStore::open(&config.path, options)?;
    println!(
        "start {}, {} time steps, {} report steps",
        time_format(store.start_date()),
        store.num_time_steps(),
        store.num_report_steps()
    );

    if config.make_cache {
        if store.make_cache_file()? {
            info!("cache written");
        } else {
            info!("cache already exists");
        }
    }

    let pattern = match &config.print {
        Some(p) => p,
        None => {
            for node in store.nodes() {
                println!("{:<32} {}", node.key(), node.unit());
            }
            return Ok(());
        }
    };

    let dates = if config.report_steps {
        store.dates_at_report_steps()?
    } else {
        store.dates()?
    };
    let keys = store.keyword_list_matching(pattern)?;
    let mut columns = vec![];
    for key in &keys {
        let values = if config.report_steps {
            store.get_at_report_steps(key)?
        } else {
            store.get(key)?.to_vec()
        };
        columns.push(values);
    }

    println!("{:<19} {}", "DATE", keys.join(" "));
    for (i, date) in dates.iter().enumerate() {
        let row = columns
            .iter()
            .map(|c| format!("{:.4}", c[i]))
            .collect::<Vec<_>>();
        println!("{} {}", time_format(*date), row.join(" "));
    }

    Ok(())
}
