pub mod common;
pub mod path;
