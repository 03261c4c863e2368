use std::num::NonZeroU32;
use std::sync::Arc;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::assistant::Assistant;
use crate::config::AssistantConfig;
use crate::error::AssistantError;
use crate::model::PriceBar;

const PROVIDER: &str = "gemini";
const FALLBACK_REQUESTS_PER_MINUTE: NonZeroU32 = nonzero!(30u32);

pub struct GeminiAssistant {
    client: reqwest::Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
    base_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
    symbol: String,
}

impl GeminiAssistant {
    pub fn new(config: &AssistantConfig, symbol: &str, api_key: Option<String>) -> Self {
        let per_minute =
            NonZeroU32::new(config.requests_per_minute).unwrap_or(FALLBACK_REQUESTS_PER_MINUTE);
        Self {
            client: reqwest::Client::new(),
            rate_limiter: Arc::new(RateLimiter::direct(Quota::per_minute(per_minute))),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            model: config.model.clone(),
            api_key: api_key.filter(|key| !key.is_empty()),
            api_key_env: config.api_key_env.clone(),
            symbol: symbol.to_owned(),
        }
    }

    /// Build an assistant whose credential comes from the process
    /// environment under the configured variable name.
    pub fn from_env(config: &AssistantConfig, symbol: &str) -> Self {
        let api_key = std::env::var(&config.api_key_env).ok();
        Self::new(config, symbol, api_key)
    }

    fn missing_key_message(&self) -> String {
        format!(
            "Gemini API key not found. Set the {} environment variable.",
            self.api_key_env
        )
    }
}

impl Assistant for GeminiAssistant {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn answer(
        &self,
        question: &str,
        sample: Option<&PriceBar>,
    ) -> BoxFuture<'_, Result<String, Report<AssistantError>>> {
        let question = question.to_owned();
        let sample = sample.cloned();
        Box::pin(async move {
            let Some(api_key) = &self.api_key else {
                return Ok(self.missing_key_message());
            };

            // Wait for rate limiter before making the request
            self.rate_limiter.until_ready().await;

            let url = format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            );
            let prompt = build_prompt(&self.symbol, &question, sample.as_ref());
            let body = GenerateRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            };

            let response = self
                .client
                .post(&url)
                .query(&[("key", api_key.as_str())])
                .json(&body)
                .send()
                .await
                .change_context(AssistantError::Request {
                    provider: PROVIDER.into(),
                })?;

            if !response.status().is_success() {
                return Err(Report::new(AssistantError::Request {
                    provider: PROVIDER.into(),
                })
                .attach(format!("HTTP status: {}", response.status())));
            }

            let decoded: GenerateResponse =
                response
                    .json()
                    .await
                    .change_context(AssistantError::ResponseParse {
                        provider: PROVIDER.into(),
                    })?;

            let text = answer_text(decoded).ok_or_else(|| {
                Report::new(AssistantError::EmptyAnswer {
                    provider: PROVIDER.into(),
                })
            })?;

            info!(model = %self.model, answer_chars = text.len(), "gemini answer received");

            Ok(text)
        })
    }
}

/// Static context naming the symbol and column set, one example row, then
/// the user's question.
fn build_prompt(symbol: &str, question: &str, sample: Option<&PriceBar>) -> String {
    let mut prompt = format!(
        "You are a financial data assistant. The user is asking about {symbol} stock data \
         with the following columns: timestamp, direction, Support, Resistance, open, high, \
         low, close, volume.\n"
    );
    if let Some(bar) = sample {
        prompt.push_str(&format!("Example row:\n{}\n", bar.describe()));
    }
    prompt.push_str("Answer the user's question using the data provided.\n");
    prompt.push_str(&format!("User question: {question}"));
    prompt
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

fn answer_text(response: GenerateResponse) -> Option<String> {
    let parts = response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts;
    let text = parts
        .into_iter()
        .map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");
    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    fn sample_bar() -> PriceBar {
        PriceBar {
            timestamp: "2024-01-01".into(),
            open: 100.0,
            high: 110.0,
            low: 95.0,
            close: 105.0,
            volume: 1_000_000.0,
            direction: Direction::Long,
            support: vec![90.0, 95.0],
            resistance: vec![110.0, 115.0],
        }
    }

    #[tokio::test]
    async fn missing_key_returns_fallback_without_calling_api() {
        // base_url points nowhere reachable; a request attempt would error.
        let config = AssistantConfig {
            base_url: "http://127.0.0.1:1".into(),
            ..AssistantConfig::default()
        };
        let assistant = GeminiAssistant::new(&config, "TSLA", None);

        let answer = assistant.answer("what is this?", None).await.unwrap();
        assert_eq!(
            answer,
            "Gemini API key not found. Set the GEMINI_API_KEY environment variable."
        );
    }

    #[tokio::test]
    async fn empty_key_treated_as_missing() {
        let config = AssistantConfig::default();
        let assistant = GeminiAssistant::new(&config, "TSLA", Some(String::new()));

        let answer = assistant.answer("anything", None).await.unwrap();
        assert!(answer.starts_with("Gemini API key not found"));
    }

    #[test]
    fn prompt_contains_symbol_sample_and_question() {
        let bar = sample_bar();
        let prompt = build_prompt("TSLA", "When was the last LONG signal?", Some(&bar));
        assert!(prompt.contains("TSLA stock data"));
        assert!(prompt.contains("Example row:"));
        assert!(prompt.contains("2024-01-01"));
        assert!(prompt.ends_with("User question: When was the last LONG signal?"));
    }

    #[test]
    fn prompt_without_sample_skips_example_row() {
        let prompt = build_prompt("TSLA", "hi", None);
        assert!(!prompt.contains("Example row:"));
    }

    #[test]
    fn answer_text_joins_candidate_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"The last "},{"text":"LONG was 2024-01-01."}]}}]}"#,
        )
        .unwrap();
        assert_eq!(
            answer_text(response).unwrap(),
            "The last LONG was 2024-01-01."
        );
    }

    #[test]
    fn answer_text_empty_response_is_none() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(answer_text(response).is_none());
    }

    /// Integration test: requires network access and a real key.
    /// Run with `cargo test -- --ignored`
    #[tokio::test]
    #[ignore]
    async fn integration_answer() {
        let config = AssistantConfig::default();
        let assistant = GeminiAssistant::from_env(&config, "TSLA");
        let answer = assistant
            .answer("Reply with the word pong.", Some(&sample_bar()))
            .await
            .unwrap();
        assert!(!answer.is_empty());
    }
}
