use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::dates::now_kst_timestamp;
use crate::models::NewsStore;

/// Render the whole window into one self-contained page.
///
/// The template is presentation-only; this side just flattens the store into
/// inline JSON (each item stamped with its day's date, window order
/// preserved so the newest day scrolls first) and fills the date dropdown.
pub fn generate_html(store: &NewsStore) -> Result<String> {
    let mut flat = Vec::new();
    for day in &store.dates {
        for item in &day.news {
            let mut entry = item.clone();
            entry.date = day.date.clone();
            flat.push(entry);
        }
    }

    let date_options: String = store
        .dates
        .iter()
        .map(|day| format!(r#"<option value="{0}">{0}</option>"#, day.date))
        .collect();

    let news_json = serde_json::to_string(&flat).context("failed to serialize flattened news")?;

    Ok(include_str!("../assets/viewer.html")
        .replace("__UPDATE_TIME__", &now_kst_timestamp())
        .replace("__DATE_OPTIONS__", &date_options)
        .replace("__NEWS_JSON__", &news_json))
}

pub fn write_html(store: &NewsStore, path: &Path) -> Result<()> {
    let html = generate_html(store)?;
    fs::write(path, html).with_context(|| format!("failed to write {}", path.display()))?;
    info!("rendered viewer at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DayRecord, NewsItem};

    fn store_with_two_days() -> NewsStore {
        let item = |link: &str, date: &str| NewsItem {
            title: format!("기사 {link}"),
            link: link.to_string(),
            date: date.to_string(),
            source: "AI타임스".to_string(),
            description: "요약".to_string(),
            image: None,
            is_english: false,
            original_title: None,
            original_summary: None,
            translated_title: None,
            summary: Some("• 핵심".to_string()),
            category_keyword: None,
            category: None,
        };
        NewsStore {
            dates: vec![
                DayRecord {
                    date: "2025-06-03".to_string(),
                    update_time: "2025-06-03 06:00:00".to_string(),
                    news: vec![item("https://example.com/a", "2025-06-03")],
                },
                DayRecord {
                    date: "2025-06-02".to_string(),
                    update_time: "2025-06-02 06:00:00".to_string(),
                    news: vec![item("https://example.com/b", "2025-06-02")],
                },
            ],
        }
    }

    #[test]
    fn html_embeds_flattened_news_and_date_options() {
        let html = generate_html(&store_with_two_days()).unwrap();
        assert!(html.contains(r#"<option value="2025-06-03">2025-06-03</option>"#));
        assert!(html.contains(r#"<option value="2025-06-02">2025-06-02</option>"#));
        assert!(html.contains("https://example.com/a"));
        assert!(html.contains("https://example.com/b"));
        assert!(!html.contains("__NEWS_JSON__"));
        assert!(!html.contains("__DATE_OPTIONS__"));
        assert!(!html.contains("__UPDATE_TIME__"));
    }

    #[test]
    fn flattened_items_are_stamped_with_their_days_date() {
        let mut store = store_with_two_days();
        // a stale per-item date must be overridden by the day record's key
        store.dates[1].news[0].date = "1999-01-01".to_string();
        let html = generate_html(&store).unwrap();
        assert!(!html.contains("1999-01-01"));
    }
}
