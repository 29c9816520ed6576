//! Scripted doubles for fetcher and walker tests.

use crate::listing::client::{RawResponse, Transport};
use crate::listing::error::{AttemptError, FetchError, TransportError, TransportErrorKind};
use crate::listing::fetcher::PageSource;
use crate::listing::page::{Page, RawPost};
use crate::model::Cursor;
use std::collections::VecDeque;

pub(crate) fn ok_body(body: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse {
        status: 200,
        body: body.to_string(),
    })
}

/// Replays queued responses in order; once the script runs out every call is refused.
pub(crate) struct ScriptedTransport {
    script: VecDeque<Result<RawResponse, TransportError>>,
    requests: Vec<String>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            script: script.into(),
            requests: Vec::new(),
        }
    }

    pub(crate) fn requests(&self) -> &[String] {
        &self.requests
    }
}

impl Transport for ScriptedTransport {
    fn get(&mut self, url: &str) -> Result<RawResponse, TransportError> {
        self.requests.push(url.to_string());
        self.script.pop_front().unwrap_or_else(|| {
            Err(TransportError::new(
                TransportErrorKind::Connect,
                "script exhausted",
            ))
        })
    }
}

/// Serves pre-built pages; records the cursor of every call.
pub(crate) struct ScriptedPages {
    pages: VecDeque<Result<Page, FetchError>>,
    pub(crate) cursors: Vec<Option<String>>,
}

impl ScriptedPages {
    pub(crate) fn new(pages: Vec<Result<Page, FetchError>>) -> Self {
        Self {
            pages: pages.into(),
            cursors: Vec::new(),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.cursors.len()
    }
}

impl PageSource for ScriptedPages {
    fn fetch_page(&mut self, cursor: Option<&Cursor>) -> Result<Page, FetchError> {
        self.cursors.push(cursor.map(|c| c.as_str().to_string()));
        self.pages
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

/// A post named `name` created at noon UTC on `date` (`YYYY-MM-DD`).
pub(crate) fn post(name: &str, date: &str) -> RawPost {
    let day = crate::model::parse_date(date).unwrap();
    let noon = day.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
    RawPost {
        name: Some(name.to_string()),
        created_utc: noon as f64,
        ups: 10,
        downs: 0,
        upvote_ratio: 0.9,
        num_comments: 3,
        title: Some(format!("post {}", name)),
        subreddit_subscribers: 100,
    }
}

pub(crate) fn exhausted() -> FetchError {
    FetchError::Exhausted {
        url: "https://www.reddit.com/r/test/new.json?sort=new&limit=100".into(),
        attempts: 5,
        last: AttemptError::Status { status: 503 },
    }
}
