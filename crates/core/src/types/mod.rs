//! Core types for Dram.
//!
//! This module provides the catalog record and its classification enums.

pub mod item;

pub use item::{CatalogItem, Category, ParseCategoryError, Style};
