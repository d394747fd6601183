//! Content variant payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::ContentAuthor;

// ---------------------------------------------------------------------------
// Thread
// ---------------------------------------------------------------------------

/// Author of a thread as exported by the holon network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadAuthor {
    #[serde(default)]
    pub identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A full thread record. Takes precedence over [`ThreadData`] when present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<ThreadAuthor>,
    #[serde(default, alias = "image_urls", alias = "imageURLs")]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub actions: Vec<String>,
    /// RFC 3339 string; unparsable values are treated as absent.
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Lightweight thread description used by most fixtures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadData {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_alias: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// A reply inside a thread.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    #[serde(default)]
    pub author_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_alias: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread: Option<ThreadRecord>,
    #[serde(default)]
    pub thread_data: ThreadData,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ThreadMessage>,
}

impl ThreadContent {
    pub fn title(&self) -> &str {
        match &self.thread {
            Some(t) => &t.title,
            None => &self.thread_data.title,
        }
    }

    pub fn body(&self) -> &str {
        match &self.thread {
            Some(t) => &t.content,
            None => &self.thread_data.content,
        }
    }

    pub fn image_urls(&self) -> &[String] {
        match &self.thread {
            Some(t) => &t.image_urls,
            None => &self.thread_data.image_urls,
        }
    }

    pub fn author(&self) -> ContentAuthor {
        if let Some(author) = self.thread.as_ref().and_then(|t| t.author.as_ref()) {
            return ContentAuthor {
                identity: author.identity.clone(),
                alias: author.alias.clone(),
                ..Default::default()
            };
        }
        ContentAuthor {
            identity: self.thread_data.author_name.clone(),
            alias: self.thread_data.author_alias.clone(),
            ..Default::default()
        }
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let from_record = self
            .thread
            .as_ref()
            .and_then(|t| t.created_at.as_deref())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        from_record.or(self.thread_data.created_at)
    }
}

// ---------------------------------------------------------------------------
// Chat message
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatMessageContent {
    #[serde(default)]
    pub message_id: String,
    #[serde(default)]
    pub content: String,
    /// Legacy field; preferred over `content` when non-empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,
    #[serde(default)]
    pub author: ContentAuthor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chat_context: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl ChatMessageContent {
    pub fn message_text(&self) -> &str {
        if self.text.is_empty() {
            &self.content
        } else {
            &self.text
        }
    }
}

// ---------------------------------------------------------------------------
// Email
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmailContent {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub from: ContentAuthor,
    #[serde(default)]
    pub to: Vec<ContentAuthor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cc: Vec<ContentAuthor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub priority: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl EmailContent {
    /// `high` and `urgent` priorities bypass the keyword cascade.
    pub fn is_priority(&self) -> bool {
        matches!(
            self.priority.to_lowercase().as_str(),
            "high" | "urgent"
        )
    }
}

// ---------------------------------------------------------------------------
// Social post
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SocialPostContent {
    #[serde(default)]
    pub post_id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author: ContentAuthor,
    /// `twitter`, `linkedin`, `instagram`, ...
    #[serde(default)]
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub shares: u64,
    #[serde(default)]
    pub comments: u64,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl SocialPostContent {
    pub fn total_engagement(&self) -> u64 {
        self.likes
            .saturating_add(self.shares)
            .saturating_add(self.comments)
    }
}

// ---------------------------------------------------------------------------
// News article
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsArticleContent {
    #[serde(default)]
    pub article_id: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: ContentAuthor,
    #[serde(default)]
    pub publication: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub image_urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

// ---------------------------------------------------------------------------
// Generic
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenericContent {
    #[serde(default)]
    pub content_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author: ContentAuthor,
    /// `article`, `blog_post`, `document`, ...
    #[serde(default)]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}
