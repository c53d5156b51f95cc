use std::collections::HashMap;
use std::time::Duration;

use log::{info, warn};

use crate::glm::GlmClient;
use crate::models::NewsItem;
use crate::sources::sort_by_source_priority;
use crate::utils::truncate_chars;

/// The day's shortlist size; lists at or under this skip the LLM entirely.
pub const MAX_CURATED: usize = 30;
const MAX_PER_SOURCE: usize = 20;
const MAX_SAMPLE: usize = 100;
const EXCERPT_LIMIT: usize = 200;
const CURATION_TIMEOUT: Duration = Duration::from_secs(60);

const CURATION_SYSTEM: &str = "당신은 AI 및 에듀테크 뉴스 큐레이터입니다. 중복 제거와 중요 기사 선별에 능숙합니다. 반드시 숫자만 출력하세요.";

/// Reduce the day's candidates to the top [`MAX_CURATED`] by importance.
///
/// Small inputs pass through priority-sorted. Larger ones are sampled evenly
/// across sources and sent to the LLM, which answers with comma-separated
/// 1-based indices into the sample. Every failure mode — HTTP error, junk
/// reply, too few valid indices — falls back to the first 30 of the
/// original list, priority-sorted, so reruns on the same input are
/// deterministic.
pub async fn curate_news(glm: &GlmClient, items: Vec<NewsItem>) -> Vec<NewsItem> {
    if items.is_empty() {
        return items;
    }
    if items.len() <= MAX_CURATED {
        return sort_by_source_priority(items);
    }

    let sampled = sample_by_source(&items);
    let prompt = build_curation_prompt(&sampled);

    match glm
        .chat(CURATION_SYSTEM, &prompt, 500, 0.3, CURATION_TIMEOUT)
        .await
    {
        Ok(content) => {
            let indices = parse_index_reply(&content, sampled.len());
            if indices.len() >= MAX_CURATED {
                let curated: Vec<NewsItem> = indices[..MAX_CURATED]
                    .iter()
                    .map(|&i| sampled[i].clone())
                    .collect();
                info!("  curated: {} -> {} articles", items.len(), curated.len());
                return sort_by_source_priority(curated);
            }
            warn!(
                "  curation returned only {} valid indices, using first {MAX_CURATED}",
                indices.len()
            );
        }
        Err(e) => warn!("  curation error: {e:#}, using first {MAX_CURATED}"),
    }

    fallback_curation(items)
}

/// Deterministic degradation path: first 30 of the untouched candidate list.
fn fallback_curation(items: Vec<NewsItem>) -> Vec<NewsItem> {
    sort_by_source_priority(items.into_iter().take(MAX_CURATED).collect())
}

/// Source-balanced sample: at most [`MAX_PER_SOURCE`] per source in
/// first-seen source order, capped at [`MAX_SAMPLE`] overall so the prompt
/// stays inside the token budget.
fn sample_by_source(items: &[NewsItem]) -> Vec<NewsItem> {
    let mut source_order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<&NewsItem>> = HashMap::new();
    for item in items {
        let bucket = grouped.entry(item.source.as_str()).or_default();
        if bucket.is_empty() {
            source_order.push(item.source.as_str());
        }
        bucket.push(item);
    }

    let mut sampled = Vec::new();
    for source in source_order {
        sampled.extend(
            grouped[source]
                .iter()
                .take(MAX_PER_SOURCE)
                .map(|item| (*item).clone()),
        );
    }
    sampled.truncate(MAX_SAMPLE);
    sampled
}

fn build_curation_prompt(sampled: &[NewsItem]) -> String {
    let mut blocks = Vec::with_capacity(sampled.len());
    for (idx, item) in sampled.iter().enumerate() {
        blocks.push(format!(
            "=== 기사 {} ===\n제목: {}\n출처: {}\n본문요약: {}",
            idx + 1,
            item.title,
            item.source,
            truncate_chars(&item.description, EXCERPT_LIMIT)
        ));
    }

    format!(
        "다음 {count}개의 AI/에듀테크 뉴스 기사를 분석하여 큐레이션해주세요.\n\n\
{blocks}\n\n\
큐레이션 요구사항:\n\
1. 중복되거나 비슷한 내용의 기사는 제거하세요.\n\
2. AI 및 에듀테크 분야에서 가장 중요하고 영향력 있는 상위 {top}개 기사만 선별하세요.\n\
3. 선별 기준: 기술적 혁신성, 시장 영향력, 사용자 관련성, 뉴스 가치 등을 고려하세요.\n\n\
출력 형식 (숫자로만 답변, 쉼표로 구분):\n\
1,3,5,7,10,12,15,18,20,22,25,28,30,32,35,38,40,42,45,48,50,52,55,58,60,62,65,68,70,72\n\n\
반드시 1부터 {count} 사이의 숫자 {top}개만 출력하고, 다른 설명 없이 숫자만 쉼표로 구분해주세요.",
        count = sampled.len(),
        top = MAX_CURATED,
        blocks = blocks.join("\n\n")
    )
}

/// Parse a comma-separated index reply into 0-based positions.
///
/// Tokens that are not integers, or fall outside `[1, sample_size]`, are
/// skipped individually; order and repeats are preserved as returned.
fn parse_index_reply(content: &str, sample_size: usize) -> Vec<usize> {
    content
        .split(',')
        .filter_map(|token| token.trim().parse::<usize>().ok())
        .filter(|&n| n >= 1 && n <= sample_size)
        .map(|n| n - 1)
        .collect()
}
