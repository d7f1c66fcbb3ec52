//! Documents as returned by the content repository

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single content-repository record (one blog post)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: String,

    /// Unique identifier, used as the route parameter
    pub uid: String,

    /// Custom type name ("posts")
    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default, with = "timestamp")]
    pub first_publication_date: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp")]
    pub last_publication_date: Option<DateTime<Utc>>,

    pub data: PostData,
}

/// The custom fields of a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostData {
    pub title: String,

    #[serde(default)]
    pub subtitle: Option<String>,

    pub author: String,

    /// Absent when the query only fetched listing fields
    #[serde(default)]
    pub banner: Option<Banner>,

    #[serde(default)]
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    /// Empty when the image field was left blank
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub alt: Option<String>,
}

/// A titled section of a post
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub heading: String,
    #[serde(default)]
    pub body: Vec<RichTextNode>,
}

/// One rich-text node (a paragraph, a heading, a list item, ...)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RichTextNode {
    #[serde(rename = "type", default)]
    pub kind: NodeKind,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub spans: Vec<Span>,

    /// Image source for `image` nodes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oembed: Option<Oembed>,
}

impl RichTextNode {
    /// A plain paragraph
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    #[default]
    #[serde(rename = "paragraph")]
    Paragraph,
    #[serde(rename = "heading1")]
    Heading1,
    #[serde(rename = "heading2")]
    Heading2,
    #[serde(rename = "heading3")]
    Heading3,
    #[serde(rename = "heading4")]
    Heading4,
    #[serde(rename = "heading5")]
    Heading5,
    #[serde(rename = "heading6")]
    Heading6,
    #[serde(rename = "preformatted")]
    Preformatted,
    #[serde(rename = "list-item")]
    ListItem,
    #[serde(rename = "o-list-item")]
    OrderedListItem,
    #[serde(rename = "image")]
    Image,
    #[serde(rename = "embed")]
    Embed,
}

/// Inline formatting over a character range of a node's text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "type")]
    pub kind: SpanKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<SpanData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpanKind {
    Strong,
    Em,
    Hyperlink,
    Label,
}

/// Payload of hyperlink and label spans
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanData {
    #[serde(default)]
    pub link_type: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(rename = "type", default)]
    pub doc_type: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    /// Label name
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Oembed {
    #[serde(default)]
    pub html: Option<String>,
    #[serde(default)]
    pub embed_url: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

/// Prismic timestamps come as `2021-05-19T12:00:00+0000`; fixtures use RFC 3339
mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
            .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f%z"))
            .ok()
            .map(|d| d.with_timezone(&Utc))
    }

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(date) => serializer.serialize_str(&date.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => parse(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", s))),
        }
    }
}
