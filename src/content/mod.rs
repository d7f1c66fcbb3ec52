//! Content module - documents, reading time, rich text and fetching

mod document;
pub mod fetcher;
pub mod reading_time;
pub mod rich_text;

pub use document::{
    Banner, ContentBlock, Document, NodeKind, Oembed, PostData, RichTextNode, Span, SpanData,
    SpanKind,
};
pub use reading_time::{reading_time, reading_time_at, word_count, WORDS_PER_MINUTE};
pub use rich_text::{PrismicHtml, RichTextRenderer, Sanitized};
