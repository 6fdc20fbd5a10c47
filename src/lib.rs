//! mocksmith generates Swift mock implementations from annotated protocol
//! and class declarations.
//!
//! The pipeline scans source trees, parses declarations with tree-sitter on
//! a bounded worker pool, reconciles duplicates across files, and renders
//! deterministic mock classes with call counters, stub handlers, and
//! optional argument-history capture.

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod merge;
pub mod model;
pub mod parsing;
pub mod pipeline;
pub mod render;

pub use config::Settings;
pub use error::{GenerateError, GenerateResult};
pub use pipeline::{GenerateReport, Generator};
