//! Viewer for memory usage reports: a flat list of files and their
//! datablocks, browsed as a folder tree with search and sortable tables.

pub mod aggregate;
pub mod args;
pub mod config;
pub mod error;
pub mod expand_state;
pub mod filter;
pub mod format;
pub mod render;
pub mod report;
pub mod sort;
pub mod state;
pub mod tree;

pub use error::{ReportError, Result};
pub use report::MemoryReport;
pub use state::{Action, ViewerState};
