//! Shared types for hashmirror: the remote manifest, endpoint pair,
//! digest algorithms, configuration and the progress events a sync pass
//! emits.

pub mod config;
pub mod error;
pub mod hash;
pub mod manifest;
pub mod protocol;

pub use error::MirrorError;
