//! CLI command implementations.

pub mod calibrate;
pub mod common;
pub mod init;
pub mod rb;
pub mod show;
pub mod version;
