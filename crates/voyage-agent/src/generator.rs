//! Reply generation through Gemini

use async_trait::async_trait;
use voyage_core::config::GeneratorConfig;
use voyage_core::{Result, VoyageError};

use crate::transport::{build_client, network_error, read_json};
use crate::types::{GenerateContentRequest, GenerateContentResponse};

/// Produces a reply for a prompt using the account's AI credential
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Generate reply text; an empty reply is an error
    async fn generate(&self, credential: &str, prompt: &str) -> Result<String>;
}

/// Gemini `generateContent` client
///
/// Generation goes out directly, not through the account proxy.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    base_url: String,
    model: String,
}

impl GeminiGenerator {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.base_url.clone(), config.model.clone())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

impl Default for GeminiGenerator {
    fn default() -> Self {
        Self::from_config(&GeneratorConfig::default())
    }
}

#[async_trait]
impl ReplyGenerator for GeminiGenerator {
    async fn generate(&self, credential: &str, prompt: &str) -> Result<String> {
        tracing::debug!("Generating reply with {} ({} chars)", self.model, prompt.len());

        let client = build_client(None)?;
        let response = client
            .post(self.endpoint())
            .header("x-goog-api-key", credential)
            .json(&GenerateContentRequest::from_prompt(prompt))
            .send()
            .await
            .map_err(|e| network_error("Gemini generateContent", e))?;

        let body: GenerateContentResponse = read_json(response).await?;
        body.text()
            .ok_or_else(|| VoyageError::Generation("Empty response from model".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint() {
        let generator = GeminiGenerator::new("https://gl.example.com/", "gemini-2.0-flash");
        assert_eq!(
            generator.endpoint(),
            "https://gl.example.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_default_model() {
        assert_eq!(GeminiGenerator::default().model(), "gemini-2.0-flash");
    }
}
