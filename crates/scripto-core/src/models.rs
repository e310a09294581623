//! Data models for Scripto
//!
//! Wire types for catalog items, change requests, vote counters and
//! analytics, plus the client-side search query and tag coloring.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// A stored script and its metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogItem {
    /// Opaque identifier assigned by the server
    pub id: String,
    /// Original filename (empty for manual entries)
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub title: String,
    /// Language tag (e.g. "python")
    #[serde(default)]
    pub language: String,
    /// Comma-delimited tags
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub description: String,
    /// Explanatory text
    #[serde(default)]
    pub how_it_works: String,
    #[serde(default)]
    pub category: String,
    /// Raw script content
    #[serde(default)]
    pub script_content: String,
    /// When the script was uploaded
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub upload_time: Option<DateTime<Utc>>,
}

impl CatalogItem {
    /// Tags in display order, trimmed, empty entries dropped
    pub fn tag_list(&self) -> Vec<&str> {
        split_tags(&self.tags)
    }
}

/// Payload for manual script entry
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewScript {
    pub title: String,
    pub language: String,
    /// Comma-delimited tags
    pub tags: String,
    pub description: String,
    pub how_it_works: String,
    pub category: String,
    pub script_content: String,
}

/// A user-submitted request for a script that does not exist yet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeRequest {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Comma-delimited tags
    #[serde(default)]
    pub tags: Option<String>,
    /// Once true, never goes back to false
    #[serde(default)]
    pub is_fulfilled: bool,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub request_time: Option<DateTime<Utc>>,
}

impl ChangeRequest {
    pub fn tag_list(&self) -> Vec<&str> {
        self.tags.as_deref().map(split_tags).unwrap_or_default()
    }

    /// Mark the request fulfilled (monotonic)
    pub fn mark_fulfilled(&mut self) {
        self.is_fulfilled = true;
    }
}

/// Payload for a new change request
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NewChangeRequest {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<String>,
}

/// Like counter as returned by like/unlike/get-likes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeCount {
    pub script_id: String,
    pub like_count: u64,
}

/// Downvote counter as returned by downvote/undo/get-downvotes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DownvoteCount {
    pub script_id: String,
    pub downvote_count: u64,
}

/// Both counters, as returned by the set-vote endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteTally {
    pub script_id: String,
    pub like_count: u64,
    pub downvote_count: u64,
}

/// The viewer's vote as sent to the set-vote endpoint
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Like,
    Dislike,
    None,
}

/// Result of a successful downvote
///
/// The server deletes a script once it collects enough downvotes and answers
/// with a `{detail}` message instead of a counter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum DownvoteOutcome {
    Counted(DownvoteCount),
    Removed { detail: String },
}

/// Aggregate catalog statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Analytics {
    pub total_scripts: u64,
    pub total_likes: u64,
    #[serde(default)]
    pub most_liked_script: Option<CatalogItem>,
    /// Uploads in the last 24 hours
    pub recent_uploads: u64,
    /// Scripts with at least one like
    pub trending_scripts: u64,
}

/// Reply to an upload: only the id is guaranteed
#[derive(Debug, Clone, Deserialize)]
pub struct UploadReceipt {
    pub id: String,
    #[serde(default)]
    pub filename: Option<String>,
}

/// Reply to a fulfill call
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FulfillReceipt {
    pub message: String,
}

/// Searchable fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    Language,
    Tags,
    Category,
}

impl SearchField {
    pub const ALL: [SearchField; 4] = [
        SearchField::Title,
        SearchField::Language,
        SearchField::Tags,
        SearchField::Category,
    ];

    /// Query parameter name
    pub fn name(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::Language => "language",
            SearchField::Tags => "tags",
            SearchField::Category => "category",
        }
    }
}

impl std::str::FromStr for SearchField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SearchField::ALL
            .into_iter()
            .find(|f| f.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown search field '{}'. Use title, language, tags or category.",
                    s.trim()
                )
            })
    }
}

/// Filter values for a catalog search
///
/// Values are passed to the server unmodified; matching and case policy are
/// the server's business. Empty values are left out of the request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub category: String,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter
    pub fn with(mut self, field: SearchField, value: impl Into<String>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: SearchField, value: impl Into<String>) {
        let value = value.into();
        match field {
            SearchField::Title => self.title = value,
            SearchField::Language => self.language = value,
            SearchField::Tags => self.tags = value,
            SearchField::Category => self.category = value,
        }
    }

    pub fn get(&self, field: SearchField) -> &str {
        match field {
            SearchField::Title => &self.title,
            SearchField::Language => &self.language,
            SearchField::Tags => &self.tags,
            SearchField::Category => &self.category,
        }
    }

    /// Apply a `field=value` assignment (an empty value clears the field)
    pub fn apply_assignment(&mut self, input: &str) -> Result<(), String> {
        let (field, value) = input
            .split_once('=')
            .ok_or_else(|| format!("Expected field=value, got '{}'", input))?;
        let field: SearchField = field.parse()?;
        self.set(field, value);
        Ok(())
    }

    /// Non-empty filters as query parameters
    pub fn params(&self) -> Vec<(&'static str, &str)> {
        SearchField::ALL
            .into_iter()
            .map(|f| (f.name(), self.get(f)))
            .filter(|(_, v)| !v.is_empty())
            .collect()
    }

    /// True when no filter is set
    pub fn is_empty(&self) -> bool {
        self.params().is_empty()
    }
}

/// Fixed tag palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagColor {
    Red,
    Green,
    Blue,
    Yellow,
    Purple,
    Pink,
    Indigo,
    Teal,
}

impl TagColor {
    pub const PALETTE: [TagColor; 8] = [
        TagColor::Red,
        TagColor::Green,
        TagColor::Blue,
        TagColor::Yellow,
        TagColor::Purple,
        TagColor::Pink,
        TagColor::Indigo,
        TagColor::Teal,
    ];

    /// Stable color for a tag: FNV-1a of the trimmed tag, modulo the palette
    pub fn for_tag(tag: &str) -> Self {
        const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const FNV_PRIME: u64 = 0x0100_0000_01b3;

        let hash = tag.trim().bytes().fold(FNV_OFFSET, |hash, byte| {
            (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
        });
        Self::PALETTE[(hash % Self::PALETTE.len() as u64) as usize]
    }

    /// ANSI foreground escape for terminal rendering
    pub fn ansi(self) -> &'static str {
        match self {
            TagColor::Red => "\x1b[31m",
            TagColor::Green => "\x1b[32m",
            TagColor::Blue => "\x1b[34m",
            TagColor::Yellow => "\x1b[33m",
            TagColor::Purple => "\x1b[35m",
            TagColor::Pink => "\x1b[95m",
            TagColor::Indigo => "\x1b[94m",
            TagColor::Teal => "\x1b[36m",
        }
    }
}

/// Split a comma-delimited tag string, keeping display order
pub fn split_tags(tags: &str) -> Vec<&str> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Accept RFC 3339 timestamps as well as the naive ISO form the server emits
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_timestamp))
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
