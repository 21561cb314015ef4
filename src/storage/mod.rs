//! File system storage operations
//!
//! Input files are newline-delimited JSON, read lazily one line at a time.

mod lines;

pub use lines::LineReader;
