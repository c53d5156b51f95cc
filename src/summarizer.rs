use std::time::Duration;

use log::{info, warn};
use regex::Regex;

use crate::glm::GlmClient;
use crate::models::NewsItem;
use crate::utils::truncate_chars;

const BATCH_SIZE: usize = 10;
const MAX_ATTEMPTS: usize = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);
const BATCH_PAUSE: Duration = Duration::from_secs(2);
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(120);
const ORIGINAL_SUMMARY_LIMIT: usize = 300;

/// Shown when a parsed section carries no 요약 block at all.
pub const SUMMARY_PLACEHOLDER: &str = "전체 기사 내용은 링크를 확인하세요.";

const SUMMARY_SYSTEM: &str = "당신은 한국 IT 뉴스 에디터입니다. 모든 응답은 한국어로 작성하세요.";

/// Snapshot pre-translation fields and install the degradation defaults.
///
/// `original_title`/`original_summary` preserve what the feed said before the
/// LLM rewrites `title`; `summary` starts as the truncated description so a
/// batch that exhausts its retries still renders something useful.
pub fn prepare_for_summary(items: &mut [NewsItem]) {
    for item in items.iter_mut() {
        let excerpt = truncate_chars(&item.description, ORIGINAL_SUMMARY_LIMIT);
        item.original_title = Some(item.title.clone());
        item.original_summary = Some(excerpt.clone());
        item.summary = Some(excerpt);
    }
}

/// Translate, summarize and tag the curated items, ten per LLM call.
///
/// Each batch gets up to [`MAX_ATTEMPTS`] tries with a fixed backoff; a batch
/// that never succeeds keeps the fallback fields installed by
/// [`prepare_for_summary`]. Failures never propagate.
pub async fn summarize_batches(glm: &GlmClient, items: &mut [NewsItem]) {
    let batch_count = items.len().div_ceil(BATCH_SIZE);

    for (batch_no, chunk) in items.chunks_mut(BATCH_SIZE).enumerate() {
        let prompt = build_batch_prompt(chunk);
        let mut applied = false;

        for attempt in 1..=MAX_ATTEMPTS {
            match glm
                .chat(SUMMARY_SYSTEM, &prompt, 2000, 0.7, SUMMARY_TIMEOUT)
                .await
            {
                Ok(content) => {
                    apply_batch_response(chunk, &content);
                    info!("  batch {}/{batch_count}: API success", batch_no + 1);
                    applied = true;
                    break;
                }
                Err(e) => {
                    warn!(
                        "  batch {}/{batch_count} attempt {attempt}/{MAX_ATTEMPTS}: {e:#}",
                        batch_no + 1
                    );
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        if !applied {
            warn!(
                "  batch {}/{batch_count}: giving up, keeping description summaries",
                batch_no + 1
            );
        }
        tokio::time::sleep(BATCH_PAUSE).await;
    }
}

fn build_batch_prompt(batch: &[NewsItem]) -> String {
    let mut blocks = Vec::with_capacity(batch.len());
    for (idx, item) in batch.iter().enumerate() {
        let title = item.original_title.as_deref().unwrap_or(&item.title);
        let excerpt = item
            .original_summary
            .clone()
            .unwrap_or_else(|| truncate_chars(&item.description, ORIGINAL_SUMMARY_LIMIT));
        let language = if item.is_english { "EN" } else { "KO" };
        blocks.push(format!(
            "=== 기사 {} ===\n제목: {title}\n원본언어: {language}\n본문요약: {excerpt}",
            idx + 1
        ));
    }

    format!(
        "다음 {count}개 기사를 한국어로 처리해주세요.\n\n\
{blocks}\n\n\
처리 요구사항:\n\
1. 영문 기사는 제목과 본문 요약을 모두 자연스러운 한국어로 번역하세요.\n\
2. 각 기사의 핵심을 불렛 포인트(•) 4개로 구조화하여 요약하세요. 줄글보다 빠르게 파악할 수 있도록 각 핵심은 명확하고 간결하게 작성하세요.\n\
3. 기사의 핵심 키워드 1개를 추출하세요 (최대 5자).\n\n\
출력 형식:\n\
=== 기사 1 ===\n\
번역된 제목: [영문인 경우 한국어 제목, 한글인 경우 기존 제목]\n\
요약: • 첫 번째 핵심 내용 (20자 내외)\n\
• 두 번째 핵심 내용 (20자 내외)\n\
• 세 번째 핵심 내용 (20자 내외)\n\
• 네 번째 핵심 내용 (20자 내외)\n\
키워드: [핵심 키워드]\n\n\
=== 기사 2 ===\n\
...\n\
(순서대로 답변)\n\n\
반드시 한국어로 답변하고, 모든 기사를 순서대로 처리해주세요.",
        count = batch.len(),
        blocks = blocks.join("\n\n")
    )
}

/// Apply one batch response back onto the batch, keyed by the 1-based
/// section numbers the prompt established.
///
/// Each section's fields are matched independently, so one malformed section
/// never blocks the rest: a present 번역된 제목 overwrites `title`, a section
/// without 요약 gets [`SUMMARY_PLACEHOLDER`], and 키워드 stays unset when
/// absent.
fn apply_batch_response(batch: &mut [NewsItem], response: &str) {
    let marker = Regex::new(r"===\s*기사\s*(\d+)\s*===").unwrap();
    let title_re = Regex::new(r"번역된\s*제목:\s*(.+)").unwrap();
    let summary_re = Regex::new(r"(?s)요약:\s*(.+?)(?:키워드:|$)").unwrap();
    let keyword_line = Regex::new(r"(?m)^\s*키워드:.*$").unwrap();
    let keyword_re = Regex::new(r"키워드:\s*(.+)").unwrap();

    // (1-based item number, end of the marker, start of the next marker)
    let markers: Vec<(usize, usize, usize)> = {
        let hits: Vec<(usize, usize, usize)> = marker
            .captures_iter(response)
            .filter_map(|c| {
                let idx: usize = c.get(1)?.as_str().parse().ok()?;
                let whole = c.get(0)?;
                Some((idx, whole.end(), whole.start()))
            })
            .collect();
        hits.iter()
            .enumerate()
            .map(|(i, &(idx, end, _))| {
                let next_start = hits.get(i + 1).map(|h| h.2).unwrap_or(response.len());
                (idx, end, next_start)
            })
            .collect()
    };

    for (idx, section_start, section_end) in markers {
        if idx == 0 || idx > batch.len() {
            continue;
        }
        let section = &response[section_start..section_end];
        let item = &mut batch[idx - 1];

        if let Some(captures) = title_re.captures(section) {
            let title = captures[1].trim();
            if !title.is_empty() {
                item.translated_title = Some(title.to_string());
            }
        }

        match summary_re.captures(section) {
            Some(captures) => {
                // a stray 키워드 line inside the capture is noise, not summary
                let text = keyword_line.replace_all(captures[1].trim(), "");
                let text = text.trim();
                item.summary = if text.is_empty() {
                    Some(SUMMARY_PLACEHOLDER.to_string())
                } else {
                    Some(text.to_string())
                };
            }
            None => item.summary = Some(SUMMARY_PLACEHOLDER.to_string()),
        }

        if let Some(captures) = keyword_re.captures(section) {
            let keyword = captures[1].trim();
            if !keyword.is_empty() {
                item.category_keyword = Some(keyword.to_string());
            }
        }

        if let Some(title) = &item.translated_title {
            item.title = title.clone();
        }
    }
}
