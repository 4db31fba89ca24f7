//! High-level operations.
//!
//! This module contains the pipeline behind the Gantry commands.

pub mod resolve;

pub use resolve::{resolve, resolve_with, ResolveOptions};
