use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use log::{info, warn};

use crate::models::{DayRecord, NewsItem, NewsStore};

/// Maximum number of distinct days retained; older days are dropped, not
/// archived.
pub const MAX_WINDOW_DAYS: usize = 10;

impl NewsStore {
    /// Read the store from disk. A missing file or malformed JSON yields an
    /// empty store; corruption must not kill the nightly run.
    pub fn load(path: &Path) -> NewsStore {
        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(store) => store,
                Err(e) => {
                    warn!("malformed store at {}: {e}; starting empty", path.display());
                    NewsStore::default()
                }
            },
            Err(_) => {
                info!("no store at {}; starting empty", path.display());
                NewsStore::default()
            }
        }
    }

    /// Write the whole structure back, human-readable.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize store")?;
        fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
    }

    /// Trim to the [`MAX_WINDOW_DAYS`] most recent dates, newest first.
    /// Lexicographic comparison is sufficient for canonical `YYYY-MM-DD`.
    pub fn maintain_window(&mut self) {
        self.dates.sort_by(|a, b| b.date.cmp(&a.date));
        self.dates.truncate(MAX_WINDOW_DAYS);
    }

    /// Every link anywhere in the retained window; the global dedup set a
    /// fetch cycle starts from.
    pub fn existing_links(&self) -> HashSet<String> {
        self.dates
            .iter()
            .flat_map(|day| day.news.iter())
            .filter(|item| !item.link.is_empty())
            .map(|item| item.link.clone())
            .collect()
    }

    /// Merge freshly summarized news into a day: new items first, then
    /// whatever the day already held (model items included — the news
    /// pipeline never rewrites them).
    pub fn merge_news(&mut self, date: &str, update_time: String, new_items: Vec<NewsItem>) {
        match self.dates.iter_mut().find(|day| day.date == date) {
            Some(record) => {
                let mut news = new_items;
                news.append(&mut record.news);
                record.news = news;
                record.update_time = update_time;
            }
            None => self.dates.push(DayRecord {
                date: date.to_string(),
                update_time,
                news: new_items,
            }),
        }
    }

    /// Merge trending-model items into a day: existing non-model items stay
    /// in front, the fresh model items follow. With `replace_existing` (the
    /// today's-run case) the day's previous model items are superseded;
    /// otherwise they are appended last.
    pub fn merge_model_items(
        &mut self,
        date: &str,
        update_time: String,
        new_models: Vec<NewsItem>,
        replace_existing: bool,
    ) {
        match self.dates.iter_mut().find(|day| day.date == date) {
            Some(record) => {
                let (old_models, others): (Vec<NewsItem>, Vec<NewsItem>) = record
                    .news
                    .drain(..)
                    .partition(|item| item.is_model_trend());
                let mut news = others;
                news.extend(new_models);
                if !replace_existing {
                    news.extend(old_models);
                }
                record.news = news;
                record.update_time = update_time;
            }
            None => self.dates.push(DayRecord {
                date: date.to_string(),
                update_time,
                news: new_models,
            }),
        }
    }
}
