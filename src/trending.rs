use std::collections::HashSet;
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use serde::Deserialize;
use url::Url;

use crate::glm::GlmClient;
use crate::models::{NewsItem, MODEL_TREND_CATEGORY};
use crate::utils::{is_english_text, strip_html, truncate_chars};

const HUB_BASE_URL: &str = "https://huggingface.co";
const TRENDING_LIMIT: usize = 20;
const MODEL_PAUSE: Duration = Duration::from_secs(1);
const README_TIMEOUT: Duration = Duration::from_secs(15);
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(60);
const BULLET_COUNT: usize = 4;

/// Rotating fallbacks for models whose cards carry no usable image.
const DEFAULT_IMAGES: &[&str] = &[
    "https://images.unsplash.com/photo-1677442136019-21780ecad995?w=1920&q=80",
    "https://images.unsplash.com/photo-1620712943543-bcc4688e7485?w=1920&q=80",
    "https://images.unsplash.com/photo-1555255707-c07966088b7b?w=1920&q=80",
    "https://images.unsplash.com/photo-1676299081847-c3c644878e36?w=1920&q=80",
    "https://images.unsplash.com/photo-1485827404703-89b55fcc595e?w=1920&q=80",
];

/// Card images that are themselves "missing image" assets.
const KNOWN_MISSING_IMAGE_MARKERS: &[&str] = &["no-image", "placeholder"];

const TREND_SYSTEM: &str = "당신은 한국 IT 뉴스 에디터입니다. 모든 응답은 한국어로 작성하세요.";

#[derive(Debug, Clone, Deserialize)]
pub struct HubModel {
    pub id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub pipeline_tag: Option<String>,
    #[serde(default)]
    pub downloads: Option<u64>,
    #[serde(default)]
    pub likes: Option<u64>,
}

pub fn model_link(model_id: &str) -> String {
    format!("{HUB_BASE_URL}/{model_id}")
}

async fn fetch_trending_models(client: &reqwest::Client) -> anyhow::Result<Vec<HubModel>> {
    let response = client
        .get(format!("{HUB_BASE_URL}/api/models"))
        .query(&[
            ("sort", "trendingScore"),
            ("direction", "-1"),
            ("limit", &TRENDING_LIMIT.to_string()),
        ])
        .timeout(Duration::from_secs(30))
        .send()
        .await?;
    if !response.status().is_success() {
        anyhow::bail!("model listing returned HTTP {}", response.status());
    }
    Ok(response.json().await?)
}

/// Fetch the model card body; `None` on any failure, including gated repos
/// that answer 401/403.
async fn fetch_model_readme(client: &reqwest::Client, model_id: &str) -> Option<String> {
    let url = format!("{HUB_BASE_URL}/{model_id}/raw/main/README.md");
    let response = client
        .get(&url)
        .timeout(README_TIMEOUT)
        .send()
        .await
        .ok()?;
    let status = response.status();
    if status.as_u16() == 401 || status.as_u16() == 403 {
        debug!("model card for {model_id} is gated (HTTP {status})");
        return None;
    }
    if !status.is_success() {
        return None;
    }
    response.text().await.ok()
}

/// First embedded image in a model card: markdown image syntax, then an
/// `<img>` tag. Relative paths resolve against the model's resource root.
fn extract_readme_image(readme: &str, model_id: &str) -> Option<String> {
    let markdown_image = Regex::new(r"!\[[^\]]*\]\(\s*([^)\s]+)").unwrap();
    let html_image = Regex::new(r#"<img[^>]+src=["']([^"']+)["']"#).unwrap();

    let raw = markdown_image
        .captures(readme)
        .or_else(|| html_image.captures(readme))
        .map(|captures| captures[1].to_string())?;

    if KNOWN_MISSING_IMAGE_MARKERS
        .iter()
        .any(|marker| raw.contains(marker))
    {
        return None;
    }

    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw);
    }
    let root = Url::parse(&format!("{HUB_BASE_URL}/{model_id}/resolve/main/")).ok()?;
    root.join(raw.trim_start_matches("./"))
        .ok()
        .map(|resolved| resolved.to_string())
}

fn default_image_for(position: usize) -> String {
    DEFAULT_IMAGES[position % DEFAULT_IMAGES.len()].to_string()
}

/// Minimal description for gated models, synthesized from listing metadata.
fn metadata_description(model: &HubModel) -> String {
    let mut parts = Vec::new();
    if let Some(pipeline) = &model.pipeline_tag {
        parts.push(format!("파이프라인: {pipeline}"));
    }
    if !model.tags.is_empty() {
        let shown: Vec<&str> = model.tags.iter().map(String::as_str).take(5).collect();
        parts.push(format!("태그: {}", shown.join(", ")));
    }
    if let Some(downloads) = model.downloads {
        parts.push(format!("다운로드 {downloads}회"));
    }
    if let Some(likes) = model.likes {
        parts.push(format!("좋아요 {likes}개"));
    }
    if parts.is_empty() {
        format!("{} 모델 정보는 링크를 확인하세요.", model.id)
    } else {
        format!("{} · {}", model.id, parts.join(" · "))
    }
}

fn build_summary_prompt(model: &HubModel, context: &str) -> String {
    format!(
        "다음 Hugging Face 트렌딩 모델을 분석해주세요.\n\n\
모델: {id}\n\
정보: {context}\n\n\
이 모델의 특징과 의미를 핵심 불렛 4개로 요약하세요. 각 불렛은 20자 내외의 한국어 문장으로 작성하세요.\n\n\
출력 형식 (JSON 문자열 배열로만 답변, 다른 설명 없이):\n\
[\"첫 번째 핵심\", \"두 번째 핵심\", \"세 번째 핵심\", \"네 번째 핵심\"]",
        id = model.id
    )
}

/// Parse the model-summary reply into exactly [`BULLET_COUNT`] lines.
///
/// Preferred shape is a JSON string array; failing that, bullet-ish lines
/// are harvested from the raw text. Anything short of four lines counts as
/// failure and the caller falls back to the placeholder.
fn parse_bullet_summary(content: &str) -> Option<Vec<String>> {
    if let (Some(start), Some(end)) = (content.find('['), content.rfind(']')) {
        if start < end {
            if let Ok(bullets) = serde_json::from_str::<Vec<String>>(&content[start..=end]) {
                let bullets: Vec<String> = bullets
                    .into_iter()
                    .map(|line| line.trim().to_string())
                    .filter(|line| !line.is_empty())
                    .take(BULLET_COUNT)
                    .collect();
                if bullets.len() == BULLET_COUNT {
                    return Some(bullets);
                }
            }
        }
    }

    let lines: Vec<String> = content
        .lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['•', '-', '*'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty() && !line.starts_with('['))
        .take(BULLET_COUNT)
        .collect();
    if lines.len() == BULLET_COUNT {
        Some(lines)
    } else {
        None
    }
}

/// Deterministic last-resort summary derived from the model id alone.
fn placeholder_summary(model_id: &str) -> Vec<String> {
    vec![
        format!("{model_id} 모델이 트렌딩에 올랐습니다."),
        "모델 카드에서 상세 스펙을 확인할 수 있습니다.".to_string(),
        "라이선스와 사용 조건은 저장소를 참고하세요.".to_string(),
        "자세한 내용은 링크를 확인하세요.".to_string(),
    ]
}

fn join_bullets(bullets: &[String]) -> String {
    bullets
        .iter()
        .map(|line| format!("• {}", line.trim_start_matches('•').trim()))
        .collect::<Vec<String>>()
        .join("\n")
}

/// The trend pipeline: fetch the trending page, build one model-trend item
/// per model not already present in the window.
pub async fn fetch_trending_model_news(
    client: &reqwest::Client,
    glm: &GlmClient,
    existing_links: &HashSet<String>,
    date: &str,
) -> Vec<NewsItem> {
    let models = match fetch_trending_models(client).await {
        Ok(models) => models,
        Err(e) => {
            warn!("error fetching trending models: {e:#}");
            return Vec::new();
        }
    };
    info!("  HuggingFace trending: {} models listed", models.len());

    let mut items = Vec::new();
    for (position, model) in models.iter().enumerate() {
        let link = model_link(&model.id);
        if existing_links.contains(&link) {
            continue;
        }

        let readme = fetch_model_readme(client, &model.id).await;
        let (description, image) = match &readme {
            Some(text) => (
                truncate_chars(&strip_html(text), 500),
                extract_readme_image(text, &model.id),
            ),
            None => (metadata_description(model), None),
        };
        let image = image.unwrap_or_else(|| default_image_for(position));

        let context = truncate_chars(&description, 300);
        let bullets = match glm
            .chat(
                TREND_SYSTEM,
                &build_summary_prompt(model, &context),
                500,
                0.5,
                SUMMARY_TIMEOUT,
            )
            .await
        {
            Ok(content) => {
                parse_bullet_summary(&content).unwrap_or_else(|| placeholder_summary(&model.id))
            }
            Err(e) => {
                warn!("  summary error for {}: {e:#}", model.id);
                placeholder_summary(&model.id)
            }
        };

        items.push(NewsItem {
            title: model.id.clone(),
            link,
            date: date.to_string(),
            source: "HuggingFace".to_string(),
            description,
            image: Some(image),
            is_english: is_english_text(&model.id),
            original_title: Some(model.id.clone()),
            original_summary: Some(context),
            translated_title: None,
            summary: Some(join_bullets(&bullets)),
            category_keyword: model
                .pipeline_tag
                .as_ref()
                .map(|tag| truncate_chars(tag, 5)),
            category: Some(MODEL_TREND_CATEGORY.to_string()),
        });

        tokio::time::sleep(MODEL_PAUSE).await;
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(id: &str) -> HubModel {
        HubModel {
            id: id.to_string(),
            tags: vec!["text-generation".to_string(), "ko".to_string()],
            pipeline_tag: Some("text-generation".to_string()),
            downloads: Some(12345),
            likes: Some(678),
        }
    }

    #[test]
    fn markdown_image_wins_over_html() {
        let readme = r#"# Model
<img src="https://cdn.example.com/html.png">
![banner](https://cdn.example.com/md.png)
"#;
        // markdown syntax is checked first even when the html tag appears earlier
        assert_eq!(
            extract_readme_image(readme, "org/model").as_deref(),
            Some("https://cdn.example.com/md.png")
        );
    }

    #[test]
    fn html_image_is_the_fallback() {
        let readme = r#"intro text <img width="400" src="https://cdn.example.com/only.png"/>"#;
        assert_eq!(
            extract_readme_image(readme, "org/model").as_deref(),
            Some("https://cdn.example.com/only.png")
        );
    }

    #[test]
    fn relative_paths_resolve_against_the_model_root() {
        let readme = "![cover](./assets/cover.png)";
        assert_eq!(
            extract_readme_image(readme, "org/model").as_deref(),
            Some("https://huggingface.co/org/model/resolve/main/assets/cover.png")
        );
    }

    #[test]
    fn known_missing_assets_are_rejected() {
        let readme = "![x](https://cdn.example.com/no-image.png)";
        assert_eq!(extract_readme_image(readme, "org/model"), None);
        assert_eq!(extract_readme_image("no images here", "org/model"), None);
    }

    #[test]
    fn json_array_summary_parses() {
        let content = r#"["첫 번째", "두 번째", "세 번째", "네 번째"]"#;
        let bullets = parse_bullet_summary(content).unwrap();
        assert_eq!(bullets.len(), 4);
        assert_eq!(bullets[0], "첫 번째");
    }

    #[test]
    fn json_array_embedded_in_prose_parses() {
        let content = "요청하신 요약입니다:\n[\"a\", \"b\", \"c\", \"d\"]\n이상입니다.";
        assert_eq!(parse_bullet_summary(content).unwrap(), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn bullet_lines_are_the_heuristic_fallback() {
        let content = "• 모델 공개\n- 성능 개선\n* 한국어 지원\n• 오픈 라이선스";
        let bullets = parse_bullet_summary(content).unwrap();
        assert_eq!(bullets, vec!["모델 공개", "성능 개선", "한국어 지원", "오픈 라이선스"]);
    }

    #[test]
    fn short_replies_fail_to_parse() {
        assert_eq!(parse_bullet_summary("[\"하나\", \"둘\"]"), None);
        assert_eq!(parse_bullet_summary(""), None);
    }

    #[test]
    fn placeholder_summary_is_deterministic_and_four_lines() {
        let a = placeholder_summary("org/model");
        let b = placeholder_summary("org/model");
        assert_eq!(a, b);
        assert_eq!(a.len(), BULLET_COUNT);
        assert!(a[0].contains("org/model"));
    }

    #[test]
    fn join_bullets_prefixes_each_line() {
        let joined = join_bullets(&["하나".to_string(), "• 둘".to_string()]);
        assert_eq!(joined, "• 하나\n• 둘");
    }

    #[test]
    fn default_images_rotate_by_position() {
        assert_eq!(default_image_for(0), DEFAULT_IMAGES[0]);
        assert_eq!(default_image_for(DEFAULT_IMAGES.len() + 2), DEFAULT_IMAGES[2]);
    }

    #[test]
    fn metadata_description_summarizes_listing_fields() {
        let description = metadata_description(&model("org/gated"));
        assert!(description.contains("org/gated"));
        assert!(description.contains("파이프라인: text-generation"));
        assert!(description.contains("다운로드 12345회"));
    }

    #[test]
    fn model_link_is_derived_from_the_id() {
        assert_eq!(model_link("org/name"), "https://huggingface.co/org/name");
    }

    #[test]
    fn listing_json_deserializes_with_missing_fields() {
        let raw = r#"[{"id": "org/a", "tags": ["x"]}, {"id": "org/b", "downloads": 5}]"#;
        let models: Vec<HubModel> = serde_json::from_str(raw).unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[1].id, "org/b");
        assert!(models[0].pipeline_tag.is_none());
    }
}
