//! Local-I/O helpers shared by the upload and download pipelines.

pub mod digest;
pub mod fs;
