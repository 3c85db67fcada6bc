//! # Hashmirror
//! Keeps a local copy of a release bundle in step with its `hashes.json`
//! manifest and serves that copy over HTTP.

pub mod cli;
pub mod report;
pub mod server;
