use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use log::debug;
use reqwest::Client;

use crate::config::DEFAULT_MODEL;
use crate::error::{LedgerError, Result};
use crate::llm::types::*;
use crate::llm::vision::VisionModel;
use crate::schema::ReportImage;

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(LedgerError::Configuration(
                "Gemini API key required".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            api_key,
            base_url: GEMINI_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends the instruction and the inline image, returning the model's text.
    pub async fn generate_from_image(
        &self,
        instruction: &str,
        image: &ReportImage,
    ) -> Result<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::Text {
                    text: instruction.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: image.mime_type.clone(),
                        data: STANDARD.encode(&image.bytes),
                    },
                },
            ])],
            generation_config: Some(GenerationConfig { temperature: 0.0 }),
        };

        debug!(
            "Sending {} ({} bytes) to {}",
            image.name,
            image.bytes.len(),
            self.model
        );

        let res = self.client.post(&url).json(&payload).send().await?;
        let status = res.status();

        if !status.is_success() {
            let err_text = res.text().await?;
            return Err(LedgerError::Inference(format!(
                "Gemini API Error (status {}): {}",
                status, err_text
            )));
        }

        let body: GenerateContentResponse = res.json().await?;

        let parts = body
            .candidates
            .ok_or_else(|| LedgerError::Inference("No candidates returned".to_string()))?
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| LedgerError::Inference("Empty candidates list".to_string()))?
            .parts;

        let text: Vec<String> = parts
            .into_iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text),
                Part::InlineData { .. } => None,
            })
            .collect();

        if text.is_empty() {
            return Err(LedgerError::Inference(
                "Model returned non-text content".to_string(),
            ));
        }
        Ok(text.join(""))
    }
}

#[async_trait]
impl VisionModel for GeminiClient {
    async fn describe(&self, instruction: &str, image: &ReportImage) -> Result<String> {
        self.generate_from_image(instruction, image).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_is_a_configuration_error() {
        assert!(matches!(
            GeminiClient::new("  ".to_string()),
            Err(LedgerError::Configuration(_))
        ));
    }

    #[test]
    fn test_request_serializes_inline_image() {
        let payload = GenerateContentRequest {
            contents: vec![Content::user(vec![
                Part::Text {
                    text: "read".to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "image/jpeg".to_string(),
                        data: STANDARD.encode([1u8, 2, 3]),
                    },
                },
            ])],
            generation_config: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["contents"][0]["parts"][0]["text"], "read");
        assert_eq!(
            json["contents"][0]["parts"][1]["inlineData"]["mimeType"],
            "image/jpeg"
        );
        assert_eq!(json["contents"][0]["parts"][1]["inlineData"]["data"], "AQID");
        assert!(json.get("generationConfig").is_none());
    }
}
