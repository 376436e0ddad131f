//! Upload pipeline: strategy selection, single-shot and multi-part
//! uploaders, completion polling, cross-provider materialization
//! (spec components F-J).

pub mod multipart;
pub mod orchestrator;
pub mod parent;
pub mod poller;
pub mod single;
pub mod source;
pub mod strategy;

pub use source::UploadSource;
pub use strategy::{put, PutRequest};
