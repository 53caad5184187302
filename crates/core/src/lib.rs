//! Dram Core - Shared catalog types.
//!
//! This crate provides the types used across all Dram components:
//! - `catalog` - Catalog resolution engine (cache, sources, search, varieties)
//! - `cli` - Command-line tools for inspecting the catalog
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no async runtime. This keeps it lightweight and allows it to be used
//! anywhere.
//!
//! # Modules
//!
//! - [`types`] - The catalog item record and its classification enums
//! - [`text`] - Diacritic-insensitive normalization and slug generation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod text;
pub mod types;

pub use text::{normalize, slugify, words};
pub use types::*;
