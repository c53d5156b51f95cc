use std::time::Duration;

use log::debug;
use scraper::{Html, Selector};

use crate::models::NewsItem;
use crate::sources::SCRAPE_BLOCKED_SOURCES;

const ARTICLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Best-effort representative image for every curated item still lacking one.
///
/// Strictly optional: any network or parse failure leaves `image` unset and
/// the viewer rotates default imagery instead. Sources on the block list are
/// skipped outright because their links lead to redirect pages, not
/// articles.
pub async fn enrich_articles(client: &reqwest::Client, items: &mut [NewsItem]) {
    for item in items.iter_mut() {
        if item.image.is_some() {
            continue;
        }
        if SCRAPE_BLOCKED_SOURCES.contains(&item.source.as_str()) {
            continue;
        }
        item.image = fetch_article_image(client, &item.link).await;
        debug!(
            "og:image for {}: {}",
            item.link,
            item.image.as_deref().unwrap_or("none")
        );
    }
}

/// GET the article page and scan it for a usable meta image.
pub async fn fetch_article_image(client: &reqwest::Client, url: &str) -> Option<String> {
    let response = client
        .get(url)
        .timeout(ARTICLE_TIMEOUT)
        .send()
        .await
        .ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.text().await.ok()?;
    extract_page_image(&body)
}

/// Open Graph image first, Twitter card image second, regardless of the
/// order the tags appear in the document.
fn extract_page_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let meta = Selector::parse("meta").unwrap();

    let mut og_image = None;
    let mut twitter_image = None;
    for tag in document.select(&meta) {
        let content = match tag.value().attr("content") {
            Some(content) if !content.trim().is_empty() => content.trim(),
            _ => continue,
        };
        if og_image.is_none() && tag.value().attr("property") == Some("og:image") {
            og_image = Some(content.to_string());
        } else if twitter_image.is_none() && tag.value().attr("name") == Some("twitter:image") {
            twitter_image = Some(content.to_string());
        }
    }
    og_image.or(twitter_image)
}
