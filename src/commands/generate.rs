//! Generate static files

use anyhow::Result;

use crate::generator::{GenerateSummary, Generator};
use crate::Blog;

/// Render the site into the public directory
///
/// With `all_posts`, every post in the repository is written instead of
/// only the enumerated paths.
pub async fn run(blog: &Blog, all_posts: bool) -> Result<GenerateSummary> {
    let start = std::time::Instant::now();

    let generator = Generator::new(blog, blog.client()?)?;
    let summary = generator
        .generate(&blog.public_dir, &blog.static_dir, all_posts)
        .await?;

    tracing::info!(
        "Generated {} listing pages and {} posts in {:.2}s",
        summary.listing_pages,
        summary.posts,
        start.elapsed().as_secs_f64()
    );
    if summary.failed > 0 {
        tracing::warn!("{} posts failed to render", summary.failed);
    }

    Ok(summary)
}
