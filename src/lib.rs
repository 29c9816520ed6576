//! subscrape: collects subreddit post metrics within a date window and writes CSV or JSON.

pub mod cli;
pub mod config;
pub mod export;
pub mod listing;
pub mod model;

// Re-exports for CLI and consumers.
pub use export::{write_records, ExportError, OutputFormat};
pub use listing::{
    walk_window, FetchError, Fetcher, HttpTransport, ListingTarget, PageSource, RetryPolicy,
    StopReason, WalkOptions, WalkOutcome,
};
pub use model::{DateWindow, Record};
