//! Wire shape of one listing response and record extraction from it.
//!
//! Missing or null `data` or `children` decodes as an empty page, and a null post
//! attribute takes its default. A body that is not a JSON object, or whose fields
//! have the wrong type, is malformed and the fetch is retried.

use crate::model::{date_of, engagement_ratio, Cursor, Record};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

/// One decoded listing response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Page {
    #[serde(deserialize_with = "null_as_default")]
    data: ListingData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ListingData {
    #[serde(deserialize_with = "null_as_default")]
    children: Vec<Child>,
    /// Listing-supplied next token. Only logged; the cursor comes from the posts.
    after: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Child {
    #[serde(deserialize_with = "null_as_default")]
    data: RawPost,
}

/// Post attributes as the API returns them. Every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawPost {
    pub name: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub created_utc: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub ups: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub downs: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub upvote_ratio: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub num_comments: u64,
    pub title: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub subreddit_subscribers: u64,
}

impl Page {
    /// Decode a response body. The root must be a JSON object.
    pub fn from_json(body: &str) -> Result<Self, serde_json::Error> {
        let value: serde_json::Value = serde_json::from_str(body)?;
        if !value.is_object() {
            return Err(serde_json::Error::custom(format!(
                "expected a listing object, found {}",
                json_kind(&value)
            )));
        }
        serde_json::from_value(value)
    }

    /// Build a page from posts, newest first.
    pub fn from_posts(posts: Vec<RawPost>) -> Self {
        Self {
            data: ListingData {
                children: posts.into_iter().map(|data| Child { data }).collect(),
                after: None,
            },
        }
    }

    pub fn posts(&self) -> impl Iterator<Item = &RawPost> {
        self.data.children.iter().map(|c| &c.data)
    }

    pub fn len(&self) -> usize {
        self.data.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.children.is_empty()
    }

    pub fn listing_after(&self) -> Option<&str> {
        self.data.after.as_deref()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Present-but-null fields decode like missing ones.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl RawPost {
    /// Creation date as a UTC calendar day.
    pub fn date(&self) -> chrono::NaiveDate {
        date_of(self.created_utc)
    }

    pub fn cursor(&self) -> Option<Cursor> {
        self.name.clone().and_then(Cursor::new)
    }

    /// Extract the exported metrics.
    pub fn to_record(&self) -> Record {
        Record {
            identifier: self.name.clone().unwrap_or_default(),
            ups: self.ups,
            downs: self.downs,
            upvote_ratio: self.upvote_ratio,
            num_comments: self.num_comments,
            subreddit_subscribers: self.subreddit_subscribers,
            engagement_ratio: engagement_ratio(self.ups, self.subreddit_subscribers),
            title_length: self.title.as_deref().map_or(0, |t| t.chars().count()),
            time: self.date(),
        }
    }
}
