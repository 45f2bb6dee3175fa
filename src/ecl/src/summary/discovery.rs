//! Locating the files that make up a summary case and its restart chain.

use std::fs;
use std::path::{Path, PathBuf};

use eclsum_utils::fs::is_newer;
use regex::Regex;

use crate::record::FormatLayout;
use crate::summary::smspec::SummaryHeader;
use crate::{EclError, Result};

const HEADER_EXTENSIONS: [&str; 2] = ["SMSPEC", "FSMSPEC"];
const KNOWN_EXTENSIONS: [&str; 6] = ["SMSPEC", "FSMSPEC", "UNSMRY", "FUNSMRY", "ESMRY", "DATA"];

/// DataFiles is where the time steps of one run are stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DataFiles {
    Unified(PathBuf),
    /// one file per report step, in report order
    Numbered(Vec<PathBuf>),
}

impl DataFiles {
    pub fn paths(&self) -> &[PathBuf] {
        match self {
            Self::Unified(p) => std::slice::from_ref(p),
            Self::Numbered(v) => v,
        }
    }
}

fn is_numbered_extension(ext: &str) -> Option<(bool, u32)> {
    lazy_static! {
        static ref RE: Regex = Regex::new("^([SA])([0-9]{4})$").unwrap();
    }

    let caps = RE.captures(ext)?;
    let formatted = &caps[1] == "A";
    let n = caps[2].parse().ok()?;
    Some((formatted, n))
}

/// base_of strips a known result file extension, leaving the case base name.
pub(crate) fn base_of(path: &Path) -> PathBuf {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_uppercase());
    match ext {
        Some(e) if KNOWN_EXTENSIONS.contains(&e.as_str()) || is_numbered_extension(&e).is_some() => {
            path.with_extension("")
        }
        _ => path.to_path_buf(),
    }
}

/// with_extension appends `.ext` to a case base name, which may itself
/// contain dots.
pub(crate) fn with_extension(base: &Path, ext: &str) -> PathBuf {
    let mut s = base.as_os_str().to_os_string();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

/// find_header picks the header file of `base`; if both encodings exist the
/// more recently written one wins.
pub(crate) fn find_header(base: &Path) -> Result<PathBuf> {
    let [unformatted, formatted] = HEADER_EXTENSIONS.map(|e| with_extension(base, e));

    match (unformatted.is_file(), formatted.is_file()) {
        (true, true) => {
            if is_newer(&formatted, &unformatted)? {
                Ok(formatted)
            } else {
                Ok(unformatted)
            }
        }
        (true, false) => Ok(unformatted),
        (false, true) => Ok(formatted),
        (false, false) => Err(EclError::Format(format!(
            "no summary header found for {}",
            base.display()
        ))),
    }
}

fn numbered_files(base: &Path, formatted: bool) -> Result<Vec<PathBuf>> {
    let dir = match base.parent() {
        Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let stem = match base.file_name().and_then(|s| s.to_str()) {
        Some(s) => s,
        None => return Ok(vec![]),
    };

    let mut files = vec![];
    for entry in fs::read_dir(&dir)? {
        let path = entry?.path();
        let name_ok = path.file_stem().and_then(|s| s.to_str()) == Some(stem);
        let ext = path.extension().and_then(|e| e.to_str());
        if let (true, Some(ext)) = (name_ok, ext) {
            if let Some((fmt, n)) = is_numbered_extension(ext) {
                if fmt == formatted {
                    files.push((n, path));
                }
            }
        }
    }

    files.sort();
    Ok(files.into_iter().map(|(_, p)| p).collect())
}

/// find_data_files picks between the unified data file and the numbered
/// sequence of a run. If both exist the one whose last file is newer wins.
pub(crate) fn find_data_files(base: &Path, formatted: bool) -> Result<DataFiles> {
    let unified = with_extension(base, if formatted { "FUNSMRY" } else { "UNSMRY" });
    let numbered = numbered_files(base, formatted)?;

    let data = match (unified.is_file(), numbered.last()) {
        (true, Some(last)) => {
            if is_newer(last, &unified)? {
                DataFiles::Numbered(numbered)
            } else {
                DataFiles::Unified(unified)
            }
        }
        (true, None) => DataFiles::Unified(unified),
        (false, Some(_)) => DataFiles::Numbered(numbered),
        (false, None) => {
            return Err(EclError::Format(format!(
                "no summary data files found for {}",
                base.display()
            )))
        }
    };

    debug!("{}: using {:?}", base.display(), data);
    Ok(data)
}

/// restart_base resolves a predecessor name relative to the directory of
/// the header that names it.
pub(crate) fn restart_base(header: &SummaryHeader, name: &str) -> PathBuf {
    let name = Path::new(name);
    if name.is_absolute() {
        return base_of(name);
    }
    match header.path.parent() {
        Some(dir) => base_of(&dir.join(name)),
        None => base_of(name),
    }
}

/// discover_chain loads the header of `base` and, when asked to, the headers
/// of every run it restarts from. The result is ordered oldest first.
pub(crate) fn discover_chain(
    base: &Path,
    layout: FormatLayout,
    include_restarts: bool,
) -> Result<Vec<SummaryHeader>> {
    let mut chain = vec![SummaryHeader::load(find_header(base)?, layout)?];

    while include_restarts {
        let current = &chain[chain.len() - 1];
        let name = match &current.restart {
            Some(name) => name.clone(),
            None => break,
        };

        let predecessor = restart_base(current, &name);
        let path = find_header(&predecessor).map_err(|_| {
            EclError::Format(format!(
                "{} restarts from {}, which has no summary header",
                current.path.display(),
                predecessor.display()
            ))
        })?;
        if chain.iter().any(|h| h.path == path) {
            warn!("restart chain loops back to {}", path.display());
            break;
        }

        chain.push(SummaryHeader::load(&path, layout)?);
    }

    chain.reverse();
    info!(
        "{}: {} run(s) in restart chain",
        base.display(),
        chain.len()
    );
    Ok(chain)
}
