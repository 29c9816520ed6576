//! Listing retrieval: target URL construction, HTTP transport, retrying fetcher,
//! page decoding, and the date-window walker.

mod client;
mod error;
mod fetcher;
mod page;
mod walker;

#[cfg(test)]
pub(crate) mod test_support;

pub use client::{HttpTransport, HttpTransportBuilder, RawResponse, Transport};
pub use error::{AttemptError, FetchError, ListingError, TransportError, TransportErrorKind};
pub use fetcher::{Fetcher, PageSource, RetryPolicy};
pub use page::{Page, RawPost};
pub use walker::{scan_page, walk_window, PageScan, StopReason, WalkOptions, WalkOutcome};

use crate::model::Cursor;
use reqwest::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";
/// Largest page size the listing API honours.
pub const MAX_PAGE_LIMIT: u32 = 100;
const MAX_SUBREDDIT_LEN: usize = 21;

/// One subreddit's `new` listing on a given API host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingTarget {
    base: Url,
    subreddit: String,
    limit: u32,
}

impl ListingTarget {
    /// `limit` is clamped to 1..=100.
    pub fn new(base_url: &str, subreddit: &str, limit: u32) -> Result<Self, ListingError> {
        let base = parse_base_url(base_url)?;
        let subreddit = normalize_subreddit(subreddit)?;
        Ok(Self {
            base,
            subreddit,
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        })
    }

    pub fn subreddit(&self) -> &str {
        &self.subreddit
    }

    /// `{base}/r/{subreddit}/new.json?sort=new&limit={limit}[&after={cursor}]`
    pub fn page_url(&self, cursor: Option<&Cursor>) -> String {
        let mut url = self.base.clone();
        let prefix = self.base.path().trim_end_matches('/');
        url.set_path(&format!("{}/r/{}/new.json", prefix, self.subreddit));
        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("sort", "new")
                .append_pair("limit", &self.limit.to_string());
            if let Some(cursor) = cursor {
                query.append_pair("after", cursor.as_str());
            }
        }
        url.to_string()
    }
}

/// Require an absolute http(s) URL with a host.
pub fn parse_base_url(input: &str) -> Result<Url, ListingError> {
    let url = Url::parse(input.trim()).map_err(|e| ListingError::InvalidBaseUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ListingError::InvalidBaseUrl {
            input: input.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }
    if url.host_str().is_none() {
        return Err(ListingError::InvalidBaseUrl {
            input: input.to_string(),
            reason: "URL has no host".to_string(),
        });
    }
    Ok(url)
}

/// Accepts `name`, `r/name` or `/r/name/`; names are 1-21 ASCII letters, digits or `_`.
pub fn normalize_subreddit(input: &str) -> Result<String, ListingError> {
    let trimmed = input.trim().trim_start_matches('/');
    let name = trimmed
        .strip_prefix("r/")
        .unwrap_or(trimmed)
        .trim_end_matches('/');
    let invalid = |reason: &str| ListingError::InvalidSubreddit {
        name: input.to_string(),
        reason: reason.to_string(),
    };
    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_SUBREDDIT_LEN {
        return Err(invalid("longer than 21 characters"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("only letters, digits and '_' are allowed"));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_without_cursor() -> Result<(), ListingError> {
        let target = ListingTarget::new(DEFAULT_BASE_URL, "emacs", 100)?;
        assert_eq!(
            target.page_url(None),
            "https://www.reddit.com/r/emacs/new.json?sort=new&limit=100"
        );
        Ok(())
    }

    #[test]
    fn page_url_with_cursor() -> Result<(), ListingError> {
        let target = ListingTarget::new(DEFAULT_BASE_URL, "rust", 100)?;
        let cursor = Cursor::new("t3_1abcde");
        assert_eq!(
            target.page_url(cursor.as_ref()),
            "https://www.reddit.com/r/rust/new.json?sort=new&limit=100&after=t3_1abcde"
        );
        Ok(())
    }

    #[test]
    fn page_url_keeps_base_path_and_clamps_limit() -> Result<(), ListingError> {
        let target = ListingTarget::new("http://localhost:8080/mirror/", "emacs", 500)?;
        assert_eq!(
            target.page_url(None),
            "http://localhost:8080/mirror/r/emacs/new.json?sort=new&limit=100"
        );
        let small = ListingTarget::new(DEFAULT_BASE_URL, "emacs", 0)?;
        assert!(small.page_url(None).ends_with("limit=1"));
        Ok(())
    }

    #[test]
    fn normalize_subreddit_accepts_prefixed_forms() -> Result<(), ListingError> {
        assert_eq!(normalize_subreddit("emacs")?, "emacs");
        assert_eq!(normalize_subreddit("r/emacs")?, "emacs");
        assert_eq!(normalize_subreddit("/r/emacs/")?, "emacs");
        assert_eq!(normalize_subreddit(" Ask_Reddit ")?, "Ask_Reddit");
        Ok(())
    }

    #[test]
    fn normalize_subreddit_rejects_bad_names() {
        assert!(normalize_subreddit("").is_err());
        assert!(normalize_subreddit("r/").is_err());
        assert!(normalize_subreddit("has space").is_err());
        assert!(normalize_subreddit("emacs?after=x").is_err());
        assert!(normalize_subreddit("a_name_that_is_far_too_long").is_err());
    }

    #[test]
    fn base_url_must_be_http() {
        assert!(parse_base_url("https://www.reddit.com").is_ok());
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }
}
