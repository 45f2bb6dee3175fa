use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// modified returns the last modification time of `path`.
pub fn modified(path: impl AsRef<Path>) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}

/// is_newer reports whether `a` was modified strictly later than `b`.
pub fn is_newer(a: impl AsRef<Path>, b: impl AsRef<Path>) -> io::Result<bool> {
    Ok(modified(a)? > modified(b)?)
}
