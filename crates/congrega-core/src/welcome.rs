//! Welcome messages for new visitors
//!
//! Generated by the Gemini text API when an API key is configured. Any
//! failure is swallowed and replaced by a fixed fallback greeting.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::GenerationError;

/// Default generative model
pub const DEFAULT_WELCOME_MODEL: &str = "gemini-2.5-flash";

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Request timeout in seconds
const GENERATE_TIMEOUT: u64 = 15;

/// Produces a welcome text for a visitor
#[async_trait]
pub trait WelcomeGenerator: Send + Sync {
    async fn generate(&self, name: &str) -> Result<String, GenerationError>;
}

/// Greeting used whenever generation fails
pub fn fallback_message(name: &str) -> String {
    format!(
        "Bem-vindo(a), {}! Que a sua visita seja abençoada. (Mensagem de fallback)",
        name
    )
}

/// Generate a welcome message, falling back to the fixed greeting on error
pub async fn welcome_message(generator: &dyn WelcomeGenerator, name: &str) -> String {
    match generator.generate(name).await {
        Ok(text) => text,
        Err(GenerationError::MissingApiKey) => fallback_message(name),
        Err(e) => {
            warn!("Welcome message generation failed: {}", e);
            fallback_message(name)
        }
    }
}

fn prompt(name: &str) -> String {
    format!(
        "Gere uma mensagem de boas-vindas curta, calorosa e amigável para um visitante de \
         igreja chamado {}. A mensagem deve ser convidativa e expressar alegria por sua \
         presença. Mantenha o tom pessoal e não excessivamente formal. Fale em português do Brasil.",
        name
    )
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    /// Text of the first candidate, trimmed; `None` if empty
    fn text(&self) -> Option<String> {
        let candidate = self.candidates.first()?;
        let text: String = candidate
            .content
            .parts
            .iter()
            .map(|p| p.text.as_str())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

/// Gemini `generateContent` client
pub struct GeminiWelcome {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiWelcome {
    pub fn new(api_key: Option<String>, model: impl Into<String>) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(GENERATE_TIMEOUT))
            .user_agent("congrega/0.3")
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            model: model.into(),
            base_url: API_BASE.to_string(),
        })
    }

    /// Point the client at another API host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl WelcomeGenerator for GeminiWelcome {
    async fn generate(&self, name: &str) -> Result<String, GenerationError> {
        let api_key = self.api_key.as_deref().ok_or(GenerationError::MissingApiKey)?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt(name) }],
            }],
        };

        let response: GenerateResponse = self
            .client
            .post(self.endpoint())
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        response.text().ok_or(GenerationError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingGenerator;

    #[async_trait]
    impl WelcomeGenerator for FailingGenerator {
        async fn generate(&self, _name: &str) -> Result<String, GenerationError> {
            Err(GenerationError::EmptyResponse)
        }
    }

    struct FixedGenerator;

    #[async_trait]
    impl WelcomeGenerator for FixedGenerator {
        async fn generate(&self, name: &str) -> Result<String, GenerationError> {
            Ok(format!("Olá, {}!", name))
        }
    }

    #[tokio::test]
    async fn test_failure_uses_fallback() {
        let text = welcome_message(&FailingGenerator, "Ana").await;
        assert_eq!(
            text,
            "Bem-vindo(a), Ana! Que a sua visita seja abençoada. (Mensagem de fallback)"
        );
    }

    #[tokio::test]
    async fn test_generated_text_is_used() {
        assert_eq!(welcome_message(&FixedGenerator, "Ana").await, "Olá, Ana!");
    }

    #[tokio::test]
    async fn test_missing_key_falls_back_without_request() {
        let gemini = GeminiWelcome::new(None, DEFAULT_WELCOME_MODEL).unwrap();
        assert!(matches!(
            gemini.generate("Ana").await,
            Err(GenerationError::MissingApiKey)
        ));
        assert!(welcome_message(&gemini, "Ana").await.contains("Ana"));
    }

    #[test]
    fn test_endpoint() {
        let gemini = GeminiWelcome::new(Some("k".to_string()), "gemini-2.5-flash")
            .unwrap()
            .with_base_url("http://localhost:8080/");
        assert_eq!(
            gemini.endpoint(),
            "http://localhost:8080/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_response_text() {
        let json = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "  Seja bem-vindo, "}, {"text": "Ana!\n"}]}}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.text().as_deref(), Some("Seja bem-vindo, Ana!"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert!(empty.text().is_none());
    }
}
