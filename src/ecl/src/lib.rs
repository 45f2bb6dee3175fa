#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate tracing;

mod error;
pub mod file;
pub mod record;
pub mod summary;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{EclError, Result};
