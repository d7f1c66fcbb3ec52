//! Configuration module

mod site;

pub use site::SiteConfig;
pub use site::ContentConfig;
pub use site::ContentSource;
pub use site::FallbackMode;
pub use site::ListingConfig;
pub use site::PathsConfig;
pub use site::ReadingConfig;
pub use site::RichTextConfig;
pub use site::ServerConfig;
pub use site::{ACCESS_TOKEN_ENV, ENDPOINT_ENV};
