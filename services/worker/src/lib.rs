//! SDR Worker Library Crate
//!
//! Configuration, the worker launcher, the console room transport and the
//! agent entry points. The binaries in `bin/` are thin wrappers around this
//! library.

pub mod cli;
pub mod config;
pub mod console;
pub mod entrypoints;
pub mod job;
