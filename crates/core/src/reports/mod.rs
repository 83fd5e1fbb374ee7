//! Settlement book reporting.

pub mod book;

pub use book::{summarize_book, BookSummary};
