use std::collections::HashMap;

use clap::Parser;
use eclsum_io::file::{BinaryFile, OpenOptions};
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Parser)]
#[clap(about, version, author)]
struct Config {
    #[clap(long)]
    pub path: String,

    /// restrict the listing to a block, e.g. `SEQHDR:3`
    #[clap(long)]
    pub block: Option<String>,

    /// re-emit the listed records to this file
    #[clap(long)]
    pub emit: Option<String>,

    /// write the re-emitted file in the formatted encoding
    #[clap(long)]
    pub formatted: bool,

    /// print the first values of every record
    #[clap(long)]
    pub values: bool,
}

fn parse_block(s: &str) -> anyhow::Result<(&str, usize)> {
    match s.split_once(':') {
        Some((kw, occ)) => Ok((kw, occ.parse()?)),
        None => Ok((s, 0)),
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

    let mut file = BinaryFile::open(&config.path, OpenOptions::default())?;
    if let Some(block) = &config.block {
        let (kw, occ) = parse_block(block)?;
        file.try_select_block(kw, occ)?;
    }

    let view = file.active_view();
    println!(
        "{} records, {} distinct keywords",
        view.num_records(),
        view.num_distinct_keywords()
    );
    let offsets = view.iter().map(|r| r.offset()).collect::<Vec<_>>();
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (i, offset) in offsets.into_iter().enumerate() {
        let header = match file.record_header(i) {
            Some(h) => h.clone(),
            None => break,
        };
        print!(
            "{:06} {:<8} {:>6} x{:<10} @{}",
            i, header.name, header.data_type, header.count, offset
        );
        let occurrence = seen.entry(header.name.clone()).or_insert(0);
        let handle = file.find_record(&header.name, *occurrence);
        *occurrence += 1;
        if config.values {
            if let Some(handle) = handle {
                let data = file.record_data(handle)?;
                match data.to_f64() {
                    Some(v) => print!(" {:?}", &v[..v.len().min(4)]),
                    None => {
                        if let Some(s) = data.as_strings() {
                            print!(" {:?}", &s[..s.len().min(4)]);
                        }
                    }
                }
            }
        }
        println!();
    }

    if let Some(out) = &config.emit {
        file.write_to(out, config.formatted)?;
        info!("wrote {}", out);
    }

    Ok(())
}
