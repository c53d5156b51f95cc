use serde::{Deserialize, Serialize};

/// Category tag that separates trending-model entries from ordinary news.
pub const MODEL_TREND_CATEGORY: &str = "model";

/// One aggregated news (or trending-model) entry.
///
/// Created by the feed fetcher, mutated in place through curation, enrichment
/// and summarization, then frozen once merged into a [`DayRecord`]. The
/// optional fields are filled by later pipeline stages and omitted from the
/// store JSON while unset, so old store files keep round-tripping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    /// Unique key for deduplication across the whole retained window.
    pub link: String,
    /// Canonical `YYYY-MM-DD` day string in KST.
    pub date: String,
    pub source: String,
    /// HTML-stripped excerpt, at most 500 characters.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_english: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl NewsItem {
    pub fn is_model_trend(&self) -> bool {
        self.category.as_deref() == Some(MODEL_TREND_CATEGORY)
    }
}

/// All items collected for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: String,
    pub update_time: String,
    pub news: Vec<NewsItem>,
}

/// The persisted rolling window, newest day first after maintenance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsStore {
    pub dates: Vec<DayRecord>,
}
