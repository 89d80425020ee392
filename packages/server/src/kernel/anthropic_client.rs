use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{BaseLlm, EnrichmentRequest, EnrichmentResult, MenuItem};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const MODEL: &str = "claude-sonnet-4-6-20250514";

/// Anthropic Messages API client for classification and menu vision
pub struct AnthropicClient {
    api_key: String,
    client: reqwest::Client,
}

/// Anthropic API response
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MenuExtraction {
    #[serde(default)]
    items: Vec<MenuItem>,
}

impl AnthropicClient {
    pub fn new(api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { api_key, client })
    }

    async fn complete(&self, body: serde_json::Value) -> Result<String> {
        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .context("Failed to send Anthropic request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Anthropic API error {}: {}", status, body);
        }

        let messages_response: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic response")?;

        let text = messages_response
            .content
            .into_iter()
            .find_map(|block| block.text)
            .context("Anthropic response contained no text block")?;

        Ok(text)
    }
}

fn classification_prompt(request: &EnrichmentRequest) -> String {
    let taxonomy_lines: Vec<String> = request
        .taxonomy
        .iter()
        .map(|t| format!("- {} ({}): {}", t.slug, t.dimension, t.label))
        .collect();

    let reviews = if request.review_texts.is_empty() {
        "(no reviews available)".to_string()
    } else {
        request
            .review_texts
            .iter()
            .map(|r| format!("- {r}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        r#"You are classifying a coffee shop for a cafe directory.

Shop name: {name}
Address: {address}

Customer reviews:
{reviews}

Available tags (only select from this list):
{taxonomy}

Select the tags supported by the reviews, write a 2-3 sentence summary of the
shop's character, and score how suitable the shop is for working, resting, and
socializing (each 0.0 to 1.0).

Return ONLY a JSON object with this structure:
{{"tags": [{{"slug": "...", "confidence": 0.0}}], "summary": "...", "confidence": 0.0, "mode_scores": {{"work": 0.0, "rest": 0.0, "social": 0.0}}}}"#,
        name = request.name,
        address = request.address.as_deref().unwrap_or("(unknown)"),
        reviews = reviews,
        taxonomy = taxonomy_lines.join("\n"),
    )
}

const MENU_PROMPT: &str = r#"This image is a photo of a cafe menu. Extract every legible menu item.

Return ONLY a JSON object with this structure:
{"items": [{"name": "...", "price": "...", "category": "..."}]}

Omit price or category when they are not visible. If the image is not a menu or
nothing is legible, return {"items": []}."#;

/// Extract a JSON payload from an LLM response that may wrap it in markdown
/// code fences or surrounding prose.
fn extract_json(response: &str) -> String {
    let trimmed = response.trim();

    if let Some(start) = trimmed.find("```json") {
        if let Some(end) = trimmed[start + 7..].find("```") {
            return trimmed[start + 7..start + 7 + end].trim().to_string();
        }
    }

    if let Some(obj_start) = trimmed.find('{') {
        if let Some(obj_end) = trimmed.rfind('}') {
            if obj_end > obj_start {
                return trimmed[obj_start..=obj_end].to_string();
            }
        }
    }

    trimmed.to_string()
}

#[async_trait]
impl BaseLlm for AnthropicClient {
    async fn classify_shop(&self, request: &EnrichmentRequest) -> Result<EnrichmentResult> {
        let body = json!({
            "model": MODEL,
            "max_tokens": 1024,
            "messages": [
                {"role": "user", "content": classification_prompt(request)}
            ]
        });

        let text = self.complete(body).await?;
        let result: EnrichmentResult = serde_json::from_str(&extract_json(&text))
            .context("Failed to parse classification JSON")?;

        tracing::info!(
            tag_count = result.tags.len(),
            confidence = result.confidence,
            "Shop classified"
        );

        Ok(result)
    }

    async fn extract_menu(&self, image_url: &str) -> Result<Vec<MenuItem>> {
        let body = json!({
            "model": MODEL,
            "max_tokens": 2048,
            "messages": [
                {"role": "user", "content": [
                    {"type": "image", "source": {"type": "url", "url": image_url}},
                    {"type": "text", "text": MENU_PROMPT}
                ]}
            ]
        });

        let text = self.complete(body).await?;
        let extraction: MenuExtraction = serde_json::from_str(&extract_json(&text))
            .context("Failed to parse menu extraction JSON")?;

        tracing::info!(item_count = extraction.items.len(), "Menu extracted");

        Ok(extraction.items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::TaxonomyEntry;

    #[test]
    fn extract_json_handles_bare_object() {
        let input = r#"{"items": []}"#;
        assert_eq!(extract_json(input), r#"{"items": []}"#);
    }

    #[test]
    fn extract_json_strips_code_fence() {
        let input = "```json\n{\"items\": []}\n```";
        assert_eq!(extract_json(input), r#"{"items": []}"#);
    }

    #[test]
    fn extract_json_finds_object_in_prose() {
        let input = "Here is the result:\n{\"summary\": \"ok\"} hope that helps";
        assert_eq!(extract_json(input), r#"{"summary": "ok"}"#);
    }

    #[test]
    fn classification_prompt_lists_taxonomy_and_reviews() {
        let request = EnrichmentRequest {
            name: "Kopi Corner".to_string(),
            address: Some("Taipei".to_string()),
            review_texts: vec!["Great pour over".to_string()],
            taxonomy: vec![TaxonomyEntry {
                slug: "pour-over".to_string(),
                dimension: "coffee".to_string(),
                label: "Pour over".to_string(),
            }],
        };

        let prompt = classification_prompt(&request);
        assert!(prompt.contains("Kopi Corner"));
        assert!(prompt.contains("pour-over (coffee)"));
        assert!(prompt.contains("Great pour over"));
    }

    #[test]
    fn classification_prompt_handles_missing_reviews() {
        let request = EnrichmentRequest {
            name: "Quiet Beans".to_string(),
            address: None,
            review_texts: vec![],
            taxonomy: vec![],
        };

        let prompt = classification_prompt(&request);
        assert!(prompt.contains("(no reviews available)"));
        assert!(prompt.contains("(unknown)"));
    }

    #[test]
    fn menu_extraction_tolerates_missing_fields() {
        let parsed: MenuExtraction =
            serde_json::from_str(r#"{"items": [{"name": "Latte"}]}"#).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].name, "Latte");
        assert!(parsed.items[0].price.is_none());
    }
}
