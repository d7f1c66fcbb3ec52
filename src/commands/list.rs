//! List repository content

use anyhow::Result;

use crate::content::{fetcher, reading_time_at};
use crate::helpers::format_in_timezone;
use crate::Blog;

/// Print every post with its publication date and reading time
pub async fn run(blog: &Blog) -> Result<()> {
    let client = blog.client()?;
    let config = &blog.config;
    let names = blog.i18n.date_names();

    let uids = fetcher::fetch_all_paths(client.as_ref(), config).await?;
    println!("Posts ({}):", uids.len());

    for uid in uids {
        let post = fetcher::fetch_post(client.as_ref(), config, &uid).await?;
        let date = post
            .first_publication_date
            .map(|d| format_in_timezone(&d, &config.date_format, &names, &config.timezone))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {} - {} [{}] {} min",
            date,
            post.data.title,
            post.uid,
            reading_time_at(&post.data.content, config.reading.words_per_minute)
        );
    }

    Ok(())
}
