//! Date-window walk over a reverse-chronological listing.
//!
//! Pages are fetched strictly one after another; the cursor for the next page comes
//! from the last post of the current one. The walk stops on the first of: fetch
//! failure, a post older than the window, no derivable cursor, or the page ceiling.
//! Records gathered before a stop are always returned.

use crate::listing::error::FetchError;
use crate::listing::fetcher::PageSource;
use crate::listing::page::Page;
use crate::model::{Cursor, DateWindow, Placement, Record};
use std::fmt;
use tracing::{debug, error, info};

/// Why a walk ended.
#[derive(Debug, Clone, PartialEq)]
pub enum StopReason {
    /// Empty page or no cursor on the last post.
    Exhausted,
    /// A post older than the window start was seen.
    CrossedWindow,
    /// `max_pages` pages were processed.
    PageLimit,
    /// The fetcher gave up on a page.
    FetchFailed(FetchError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Exhausted => f.write_str("listing exhausted"),
            StopReason::CrossedWindow => f.write_str("reached posts older than the window"),
            StopReason::PageLimit => f.write_str("page limit reached"),
            StopReason::FetchFailed(e) => write!(f, "fetch failed: {}", e),
        }
    }
}

/// Result of one walk. `records` keeps listing order (newest first).
#[derive(Debug, Clone, PartialEq)]
pub struct WalkOutcome {
    pub records: Vec<Record>,
    pub pages: u32,
    pub stop: StopReason,
}

impl WalkOutcome {
    pub fn failure(&self) -> Option<&FetchError> {
        match &self.stop {
            StopReason::FetchFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// What one page contributed.
#[derive(Debug, Clone, PartialEq)]
pub struct PageScan {
    pub admitted: Vec<Record>,
    /// Newer-than-window posts passed over.
    pub skipped: usize,
    /// Identifier of the last post looked at.
    pub next_cursor: Option<Cursor>,
    /// A post older than the window start ended the scan.
    pub crossed: bool,
}

/// Walk limits and progress hook. Progress receives (pages fetched, records kept).
#[derive(Default)]
pub struct WalkOptions<'a> {
    pub max_pages: Option<u32>,
    pub progress: Option<&'a dyn Fn(u32, usize)>,
}

/// Filter one page against the window.
pub fn scan_page(page: &Page, window: &DateWindow) -> PageScan {
    let mut scan = PageScan {
        admitted: Vec::new(),
        skipped: 0,
        next_cursor: None,
        crossed: false,
    };
    for post in page.posts() {
        scan.next_cursor = post.cursor();
        match window.place(post.date()) {
            Placement::Inside => scan.admitted.push(post.to_record()),
            Placement::After => scan.skipped += 1,
            Placement::Before => {
                scan.crossed = true;
                break;
            }
        }
    }
    scan
}

/// Walk the listing from its newest page until the window is covered.
pub fn walk_window<S: PageSource + ?Sized>(
    source: &mut S,
    window: &DateWindow,
    options: &WalkOptions<'_>,
) -> WalkOutcome {
    let mut records: Vec<Record> = Vec::new();
    let mut pages = 0u32;
    let mut cursor: Option<Cursor> = None;

    let stop = loop {
        if options.max_pages.is_some_and(|max| pages >= max) {
            break StopReason::PageLimit;
        }
        let page = match source.fetch_page(cursor.as_ref()) {
            Ok(page) => page,
            Err(e) => {
                error!(pages, records = records.len(), error = %e, "stopping walk after fetch failure");
                break StopReason::FetchFailed(e);
            }
        };
        pages += 1;

        let scan = scan_page(&page, window);
        debug!(
            page = pages,
            posts = page.len(),
            listing_after = page.listing_after().unwrap_or(""),
            "scanned listing page"
        );
        let admitted = scan.admitted.len();
        records.extend(scan.admitted);
        info!(
            page = pages,
            admitted,
            skipped = scan.skipped,
            total = records.len(),
            "page processed"
        );
        if let Some(progress) = options.progress {
            progress(pages, records.len());
        }

        if scan.crossed {
            break StopReason::CrossedWindow;
        }
        match scan.next_cursor {
            Some(next) => cursor = Some(next),
            None => break StopReason::Exhausted,
        }
    };

    info!(pages, records = records.len(), stop = %stop, "walk finished");
    WalkOutcome {
        records,
        pages,
        stop,
    }
}
