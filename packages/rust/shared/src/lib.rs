//! Shared types, error model, and configuration for autoresearch.
//!
//! This crate is the foundation depended on by all other autoresearch crates.
//! It provides:
//! - [`ResearchError`]: the unified error type
//! - Domain types ([`ResultSet`], [`Scalar`], [`Entry`], [`DecodedResults`])
//! - Configuration ([`AppConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, CompletionConfig, DefaultsConfig, FetchConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, validate_api_key,
};
pub use error::{ResearchError, Result};
pub use types::{
    CategoryValue, DecodedResults, Entry, FieldMap, Fields, ITEM_TAG, ROOT_TAG, ResultSet, Scalar,
};
