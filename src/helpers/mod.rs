//! Helper functions shared by the renderers
//!
//! Date formatting, HTML escaping and URL building used by templates,
//! the rich-text serializer and the server.

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use self::url::*;
