use std::collections::HashSet;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use log::{info, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::dates::parse_rss_date;
use crate::models::NewsItem;
use crate::sources::{matches_keywords, SourceDescriptor, RSS_SOURCES};
use crate::utils::{is_english_text, strip_html, truncate_chars};

/// Hard cap on raw `<item>` elements considered per source, regardless of
/// how large the feed is.
const MAX_RAW_ITEMS: usize = 30;
const DESCRIPTION_LIMIT: usize = 500;
const SOURCE_PAUSE: Duration = Duration::from_secs(1);
const FEED_ACCEPT: &str = "application/rss+xml, application/xml, text/xml, */*;q=0.9";

/// One `<item>` as it appears on the wire, before normalization.
#[derive(Debug, Default)]
struct RawItem {
    title: String,
    link: String,
    pub_date: String,
    description: String,
    enclosure_url: Option<String>,
    enclosure_type: Option<String>,
    media_url: Option<String>,
}

/// Pull apart an RSS body into raw items.
///
/// Event-based so that attribute-carrying elements (`enclosure`,
/// `media:content`) are read directly; text and CDATA payloads are both
/// honored.
fn parse_feed(xml: &str) -> Result<Vec<RawItem>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut current = RawItem::default();
    let mut in_item = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match name.as_str() {
                    "item" => {
                        in_item = true;
                        current = RawItem::default();
                    }
                    "enclosure" if in_item => {
                        for attr in e.attributes().flatten() {
                            let value = attr.unescape_value().unwrap_or_default().into_owned();
                            match attr.key.as_ref() {
                                b"url" => current.enclosure_url = Some(value),
                                b"type" => current.enclosure_type = Some(value),
                                _ => {}
                            }
                        }
                    }
                    "media:content" if in_item => {
                        for attr in e.attributes().flatten() {
                            if attr.key.as_ref() == b"url" {
                                current.media_url =
                                    Some(attr.unescape_value().unwrap_or_default().into_owned());
                            }
                        }
                    }
                    _ => current_tag = name,
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    items.push(std::mem::take(&mut current));
                }
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.unescape().unwrap_or_default().into_owned();
                    append_field(&mut current, &current_tag, text);
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    append_field(&mut current, &current_tag, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }

    Ok(items)
}

fn append_field(item: &mut RawItem, tag: &str, text: String) {
    match tag {
        "title" => item.title.push_str(&text),
        "link" => item.link.push_str(&text),
        "pubDate" => item.pub_date.push_str(&text),
        "description" => item.description.push_str(&text),
        _ => {}
    }
}

/// The calendar days a fetched item may carry and still belong to this run:
/// the target day plus the following day (upstream feeds skew a few hours),
/// and optionally the preceding day.
fn accepted_dates(target_date: &str, include_previous_day: bool) -> Vec<String> {
    let mut accepted = vec![target_date.to_string()];
    if let Ok(day) = NaiveDate::parse_from_str(target_date, "%Y-%m-%d") {
        if let Some(next) = day.checked_add_days(Days::new(1)) {
            accepted.push(next.format("%Y-%m-%d").to_string());
        }
        if include_previous_day {
            if let Some(prev) = day.checked_sub_days(Days::new(1)) {
                accepted.push(prev.format("%Y-%m-%d").to_string());
            }
        }
    }
    accepted
}

/// Image priority: image-typed enclosure, then the first `<img src>` inside
/// the description markup, then a media-namespace content url.
fn pick_image(raw: &RawItem) -> Option<String> {
    if let (Some(url), Some(mime)) = (&raw.enclosure_url, &raw.enclosure_type) {
        if mime.starts_with("image") && !url.is_empty() {
            return Some(url.clone());
        }
    }
    let img_src = Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap();
    if let Some(captures) = img_src.captures(&raw.description) {
        return Some(captures[1].to_string());
    }
    raw.media_url.clone().filter(|url| !url.is_empty())
}

/// Normalize the raw items of one source into [`NewsItem`]s for the run.
///
/// Drops items without a link, with an unparseable or out-of-window date, or
/// failing the source's keyword filter; deduplicates by link within the
/// source (first occurrence wins).
fn items_from_feed(
    xml: &str,
    source: &SourceDescriptor,
    target_date: &str,
    include_previous_day: bool,
) -> Vec<NewsItem> {
    let raw_items = match parse_feed(xml) {
        Ok(items) => items,
        Err(e) => {
            warn!("XML parse error in {}: {e}", source.name);
            return Vec::new();
        }
    };

    let accepted = accepted_dates(target_date, include_previous_day);
    let mut seen_links: HashSet<String> = HashSet::new();
    let mut news = Vec::new();

    for raw in raw_items.into_iter().take(MAX_RAW_ITEMS) {
        let link = raw.link.trim().to_string();
        if link.is_empty() || !seen_links.insert(link.clone()) {
            continue;
        }

        let date = match parse_rss_date(&raw.pub_date, source.source) {
            Some(date) if accepted.contains(&date) => date,
            _ => continue,
        };

        let title = if raw.title.trim().is_empty() {
            "No Title".to_string()
        } else {
            raw.title.trim().to_string()
        };

        let description = truncate_chars(&strip_html(&raw.description), DESCRIPTION_LIMIT);
        if !matches_keywords(source.keywords, &title, &description) {
            continue;
        }

        let image = pick_image(&raw);
        let is_english = is_english_text(&title);

        news.push(NewsItem {
            title,
            link,
            date,
            source: source.source.to_string(),
            description,
            image,
            is_english,
            original_title: None,
            original_summary: None,
            translated_title: None,
            summary: None,
            category_keyword: None,
            category: None,
        });
    }

    news
}

/// Fetch and normalize one source. Network and parse failures degrade to an
/// empty list with a warning; nothing here aborts the run.
pub async fn fetch_rss_news(
    client: &reqwest::Client,
    source: &SourceDescriptor,
    target_date: &str,
    include_previous_day: bool,
) -> Vec<NewsItem> {
    let response = match client
        .get(source.url)
        .header("Accept", FEED_ACCEPT)
        .timeout(Duration::from_secs(30))
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!("error fetching {}: {e}", source.name);
            return Vec::new();
        }
    };

    if !response.status().is_success() {
        warn!("HTTP {} from {}", response.status(), source.name);
        return Vec::new();
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            warn!("error reading body from {}: {e}", source.name);
            return Vec::new();
        }
    };
    if body.trim().is_empty() {
        return Vec::new();
    }

    items_from_feed(body.trim(), source, target_date, include_previous_day)
}

/// Run the whole registry for one target day.
///
/// Links already present anywhere in the retained window are dropped per
/// source; a second pass deduplicates across sources, first occurrence in
/// fetch order winning. Pauses briefly between sources.
pub async fn fetch_all_news(
    client: &reqwest::Client,
    target_date: &str,
    existing_links: &HashSet<String>,
    include_previous_day: bool,
) -> Vec<NewsItem> {
    let mut all_news = Vec::new();

    for source in RSS_SOURCES {
        let fetched = fetch_rss_news(client, source, target_date, include_previous_day).await;
        let found = fetched.len();
        let fresh: Vec<NewsItem> = fetched
            .into_iter()
            .filter(|item| !existing_links.contains(&item.link))
            .collect();
        info!("  {}: {} new articles (found {})", source.name, fresh.len(), found);
        all_news.extend(fresh);
        tokio::time::sleep(SOURCE_PAUSE).await;
    }

    let mut seen = HashSet::new();
    all_news
        .into_iter()
        .filter(|item| seen.insert(item.link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SOURCE: SourceDescriptor = SourceDescriptor {
        name: "Test Feed",
        url: "https://example.com/feed.xml",
        source: "TestSource",
        keywords: &[],
    };

    // 04:00 GMT lands at 13:00 KST on the same calendar day.
    const TARGET: &str = "2025-06-03";

    fn feed(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:media="http://search.yahoo.com/mrss/">
  <channel>
    <title>Test</title>
    {items}
  </channel>
</rss>"#
        )
    }

    #[test]
    fn parses_items_with_enclosure_image() {
        let xml = feed(
            r#"<item>
      <title>First story</title>
      <link>https://example.com/1</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
      <description>&lt;p&gt;Body text&lt;/p&gt;</description>
      <enclosure url="https://example.com/1.jpg" type="image/jpeg"/>
    </item>"#,
        );
        let items = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "First story");
        assert_eq!(items[0].date, TARGET);
        assert_eq!(items[0].description, "Body text");
        assert_eq!(items[0].image.as_deref(), Some("https://example.com/1.jpg"));
        assert!(items[0].is_english);
    }

    #[test]
    fn non_image_enclosure_falls_back_to_description_img() {
        let xml = feed(
            r#"<item>
      <title>Podcast episode</title>
      <link>https://example.com/2</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
      <description><![CDATA[<img src="https://example.com/cover.png" alt=""/> new episode]]></description>
      <enclosure url="https://example.com/audio.mp3" type="audio/mpeg"/>
    </item>"#,
        );
        let items = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].image.as_deref(), Some("https://example.com/cover.png"));
    }

    #[test]
    fn media_content_is_the_last_resort() {
        let xml = feed(
            r#"<item>
      <title>Media item</title>
      <link>https://example.com/3</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
      <description>plain text only</description>
      <media:content url="https://example.com/media.jpg" medium="image"/>
    </item>"#,
        );
        let items = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(items[0].image.as_deref(), Some("https://example.com/media.jpg"));
    }

    #[test]
    fn linkless_items_and_duplicates_are_dropped() {
        let xml = feed(
            r#"<item>
      <title>No link here</title>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Kept</title>
      <link>https://example.com/4</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
    </item>
    <item>
      <title>Duplicate of kept</title>
      <link>https://example.com/4</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
    </item>"#,
        );
        let items = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Kept");
    }

    #[test]
    fn unparseable_dates_exclude_the_item() {
        let xml = feed(
            r#"<item>
      <title>Bad date</title>
      <link>https://example.com/5</link>
      <pubDate>sometime last week</pubDate>
    </item>"#,
        );
        assert!(items_from_feed(&xml, &TEST_SOURCE, TARGET, false).is_empty());
    }

    #[test]
    fn next_day_is_accepted_previous_day_needs_the_flag() {
        let xml = feed(
            r#"<item>
      <title>Tomorrow</title>
      <link>https://example.com/6</link>
      <pubDate>2025-06-04 08:00:00</pubDate>
    </item>
    <item>
      <title>Yesterday</title>
      <link>https://example.com/7</link>
      <pubDate>2025-06-02 08:00:00</pubDate>
    </item>"#,
        );
        let without_flag = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(without_flag.len(), 1);
        assert_eq!(without_flag[0].title, "Tomorrow");

        let with_flag = items_from_feed(&xml, &TEST_SOURCE, TARGET, true);
        assert_eq!(with_flag.len(), 2);
    }

    #[test]
    fn missing_title_gets_the_placeholder() {
        let xml = feed(
            r#"<item>
      <link>https://example.com/8</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
    </item>"#,
        );
        let items = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(items[0].title, "No Title");
    }

    #[test]
    fn raw_item_cap_limits_oversized_feeds() {
        let mut blocks = String::new();
        for i in 0..40 {
            blocks.push_str(&format!(
                r#"<item>
      <title>Story {i}</title>
      <link>https://example.com/bulk/{i}</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
    </item>
    "#
            ));
        }
        let items = items_from_feed(&feed(&blocks), &TEST_SOURCE, TARGET, false);
        assert_eq!(items.len(), MAX_RAW_ITEMS);
    }

    #[test]
    fn keyword_filter_applies_to_title_and_description() {
        let filtered_source = SourceDescriptor {
            keywords: &["machine learning"],
            ..TEST_SOURCE
        };
        let xml = feed(
            r#"<item>
      <title>Cafeteria menu updated</title>
      <link>https://example.com/9</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
      <description>nothing relevant</description>
    </item>
    <item>
      <title>New curriculum</title>
      <link>https://example.com/10</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
      <description>A machine learning elective arrives</description>
    </item>"#,
        );
        let items = items_from_feed(&xml, &filtered_source, TARGET, false);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link, "https://example.com/10");
    }

    #[test]
    fn description_is_stripped_and_truncated() {
        let long_body = format!("<b>{}</b>", "x".repeat(600));
        let xml = feed(&format!(
            r#"<item>
      <title>Long one</title>
      <link>https://example.com/11</link>
      <pubDate>Tue, 03 Jun 2025 04:00:00 GMT</pubDate>
      <description><![CDATA[{long_body}]]></description>
    </item>"#
        ));
        let items = items_from_feed(&xml, &TEST_SOURCE, TARGET, false);
        assert_eq!(items[0].description.chars().count(), DESCRIPTION_LIMIT);
        assert!(!items[0].description.contains('<'));
    }

    #[test]
    fn malformed_xml_degrades_to_empty() {
        let items = items_from_feed("<rss><channel><item><title>oops", &TEST_SOURCE, TARGET, false);
        assert!(items.is_empty());
    }

    #[test]
    fn accepted_dates_window() {
        assert_eq!(accepted_dates("2025-06-03", false), vec!["2025-06-03", "2025-06-04"]);
        assert_eq!(
            accepted_dates("2025-06-03", true),
            vec!["2025-06-03", "2025-06-04", "2025-06-02"]
        );
        // month boundary
        assert_eq!(accepted_dates("2025-06-30", false), vec!["2025-06-30", "2025-07-01"]);
    }
}
