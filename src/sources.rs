use crate::models::NewsItem;

/// Immutable feed descriptor. `source` is the canonical label used for
/// priority ranking, enrichment block-listing and the viewer badge; `name`
/// is only for logs.
#[derive(Debug, Clone, Copy)]
pub struct SourceDescriptor {
    pub name: &'static str,
    pub url: &'static str,
    pub source: &'static str,
    /// Phrase filter: an item passes when ANY phrase matches, where a phrase
    /// matches when ALL of its space-separated tokens occur in the item's
    /// title+description (case-insensitive). Empty slice = no filtering.
    pub keywords: &'static [&'static str],
}

pub const RSS_SOURCES: &[SourceDescriptor] = &[
    // edtech, domestic + international
    SourceDescriptor {
        name: "Google News (EdTech)",
        url: "https://news.google.com/rss/search?q=%EC%97%90%EB%93%80%ED%85%8C%ED%81%AC|AI%EA%B5%90%EC%9C%A1|%EB%94%94%EC%A7%80%ED%84%B8%EA%B5%90%EA%B3%BC%EC%84%9C&hl=ko&gl=KR&ceid=KR:ko",
        source: "에듀테크 검색",
        keywords: &[],
    },
    SourceDescriptor {
        name: "EdSurge",
        url: "https://www.edsurge.com/articles_rss",
        source: "EdSurge",
        keywords: &[],
    },
    SourceDescriptor {
        name: "eSchool News",
        url: "https://www.eschoolnews.com/feed/",
        source: "eSchoolNews",
        keywords: &["AI", "artificial intelligence", "machine learning", "chatgpt"],
    },
    // domestic AI/IT trade press
    SourceDescriptor {
        name: "AI Times",
        url: "https://cdn.aitimes.com/rss/gn_rss_allArticle.xml",
        source: "AI타임스",
        keywords: &[],
    },
    SourceDescriptor {
        name: "ITWorld Korea",
        url: "https://www.itworld.co.kr/feed/",
        source: "ITWorld",
        keywords: &["AI", "인공지능", "LLM", "생성형"],
    },
    // international AI research and investment
    SourceDescriptor {
        name: "OpenAI News",
        url: "https://openai.com/news/rss.xml",
        source: "OpenAI",
        keywords: &[],
    },
    SourceDescriptor {
        name: "TechCrunch AI",
        url: "https://techcrunch.com/category/artificial-intelligence/feed/",
        source: "TechCrunch",
        keywords: &[],
    },
    // open-source model trend feed
    SourceDescriptor {
        name: "HuggingFace Trending",
        url: "https://zernel.github.io/huggingface-trending-feed/feed.xml",
        source: "HuggingFace",
        keywords: &[],
    },
];

/// Sources whose article links point at redirect/interstitial pages and
/// cannot be scraped for an og:image directly.
pub const SCRAPE_BLOCKED_SOURCES: &[&str] = &["에듀테크 검색"];

const UNRANKED: u32 = 99;

/// Fixed display ranking: domestic AI press first, then the edtech search
/// feed, then ITWorld, then model news; everything else keeps fetch order
/// at the back.
pub fn source_priority(source: &str) -> u32 {
    match source {
        "AI타임스" => 0,
        "에듀테크 검색" => 1,
        "ITWorld" => 2,
        "HuggingFace" => 3,
        _ => UNRANKED,
    }
}

/// Stable sort by [`source_priority`]; ties keep their relative input order.
pub fn sort_by_source_priority(mut items: Vec<NewsItem>) -> Vec<NewsItem> {
    items.sort_by_key(|item| source_priority(&item.source));
    items
}

/// Keyword filter semantics documented on [`SourceDescriptor::keywords`].
pub fn matches_keywords(keywords: &[&str], title: &str, description: &str) -> bool {
    if keywords.is_empty() {
        return true;
    }
    let haystack = format!("{title} {description}").to_lowercase();
    keywords.iter().any(|phrase| {
        phrase
            .split_whitespace()
            .all(|token| haystack.contains(&token.to_lowercase()))
    })
}
