//! Core library for the check-meta plugin
//!
//! This crate provides:
//! - The metadata value model
//! - Comparison of an actual metadata value against an expected one
//! - The on-disk compare-value cache used as fallback
//! - The end-to-end check driven by a pluggable metadata fetcher

pub mod cache;
pub mod check;
pub mod compare;
pub mod error;
pub mod status;
pub mod value;

pub use cache::{cache_file, load_cache, plugin_work_dir, save_cache, CacheRecord};
pub use check::{fetch_value, ExpectationSource, MetaCheck, MetadataFetcher};
pub use compare::{check_value, CompareOptions, Expectation, NumberOperator};
pub use error::{CacheError, FetchError};
pub use status::{CheckResult, CheckStatus};
pub use value::{MetaValue, UnsupportedValue};
