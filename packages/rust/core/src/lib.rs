//! Research orchestration and presentation for autoresearch.
//!
//! This crate ties together source determination, fetching, completion and
//! XML encoding into one end-to-end workflow ([`pipeline::run_research`]),
//! and renders decoded documents for display or download.

pub mod download;
pub mod pipeline;
pub mod view;
