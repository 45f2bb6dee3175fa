pub mod fs;
pub mod glob;
pub mod time;
