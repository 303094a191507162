use super::{ChatMessage, LLMConfig, LLMProvider, LLMResponse, ResponseSchema, LLM};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
/// API key header. The key must stay out of request URLs, which appear in reqwest errors.
const GEMINI_KEY_HEADER: &str = "x-goog-api-key";
const LMSTUDIO_CHAT_URL: &str = "http://localhost:1234/v1/chat/completions";

fn build_client(config: &LLMConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .build()?;
    Ok(client)
}

/// Request body shared by the OpenAI-compatible chat completion endpoints.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
}

impl ChatCompletionRequest {
    fn new(config: &LLMConfig, messages: Vec<ChatMessage>, schema: Option<&ResponseSchema>) -> Self {
        let response_format = schema.map(|schema| {
            serde_json::json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema.name,
                    "schema": schema.with_object_root(),
                },
            })
        });

        Self {
            model: config.model.clone(),
            messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            response_format,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
    usage: Option<ChatCompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionUsage {
    total_tokens: u32,
}

async fn read_chat_completion(response: reqwest::Response, label: &str) -> Result<LLMResponse> {
    if !response.status().is_success() {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        return Err(anyhow!("{} API error {}: {}", label, status, text));
    }

    let completion: ChatCompletionResponse = response.json().await?;

    let content = completion
        .choices
        .first()
        .ok_or_else(|| anyhow!("No response from {}", label))?
        .message
        .content
        .clone();

    Ok(LLMResponse {
        content,
        tokens_used: completion.usage.map(|u| u.total_tokens),
    })
}

/// LMStudio provider implementation
pub struct LMStudioProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl LMStudioProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(LMSTUDIO_CHAT_URL)
    }
}

#[async_trait]
impl LLM for LMStudioProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse> {
        let endpoint = self.endpoint();
        let request = ChatCompletionRequest::new(&self.config, messages, schema);

        debug!("Sending request to LMStudio at {}", endpoint);

        let response = self.client.post(endpoint).json(&request).send().await?;
        read_chat_completion(response, "LMStudio").await
    }

    async fn is_available(&self) -> bool {
        let models_endpoint = self.endpoint().replace("/chat/completions", "/models");

        match self.client.get(&models_endpoint).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::LMStudio
    }
}

/// Gemini provider implementation
pub struct GeminiProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    temperature: f32,
    #[serde(rename = "responseMimeType", skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(rename = "responseSchema", skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiUsage {
    #[serde(rename = "totalTokenCount")]
    total_token_count: u32,
}

impl GeminiProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("Gemini API key required"));
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn api_base(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(GEMINI_API_BASE)
    }

    fn build_request(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&ResponseSchema>,
    ) -> GeminiRequest {
        let (system, conversation): (Vec<_>, Vec<_>) =
            messages.into_iter().partition(|msg| msg.role == "system");

        let system_instruction = if system.is_empty() {
            None
        } else {
            let text = system
                .into_iter()
                .map(|msg| msg.content)
                .collect::<Vec<_>>()
                .join("\n\n");
            Some(GeminiContent {
                role: None,
                parts: vec![GeminiPart { text }],
            })
        };

        let contents = conversation
            .into_iter()
            .map(|msg| GeminiContent {
                role: Some(if msg.role == "assistant" { "model".to_string() } else { msg.role }),
                parts: vec![GeminiPart { text: msg.content }],
            })
            .collect();

        GeminiRequest {
            system_instruction,
            contents,
            generation_config: GeminiGenerationConfig {
                max_output_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
                response_mime_type: schema.map(|_| "application/json".to_string()),
                response_schema: schema.map(ResponseSchema::to_gemini),
            },
        }
    }
}

impl GeminiProvider {
    fn generate_content(&self, request: &GeminiRequest) -> Result<reqwest::RequestBuilder> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("Gemini API key not configured"))?;

        let url = format!("{}/models/{}:generateContent", self.api_base(), self.config.model);
        Ok(self
            .client
            .post(url)
            .header(GEMINI_KEY_HEADER, api_key)
            .json(request))
    }
}

#[async_trait]
impl LLM for GeminiProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse> {
        let request = self.build_request(messages, schema);

        debug!("Sending request to Gemini API (model {})", self.config.model);

        let response = self.generate_content(&request)?.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GeminiResponse = response.json().await?;

        let content = gemini_response
            .candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<String>()
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| anyhow!("No response from Gemini"))?;

        Ok(LLMResponse {
            content,
            tokens_used: gemini_response.usage_metadata.map(|u| u.total_token_count),
        })
    }

    async fn is_available(&self) -> bool {
        if let Some(api_key) = &self.config.api_key {
            let url = format!("{}/models", self.api_base());

            match self.client.get(&url).header(GEMINI_KEY_HEADER, api_key).send().await {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            }
        } else {
            false
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::Gemini
    }
}

/// OpenAI provider implementation
pub struct OpenAIProvider {
    config: LLMConfig,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(config: LLMConfig) -> Result<Self> {
        if config.api_key.is_none() {
            return Err(anyhow!("OpenAI API key required"));
        }

        let client = build_client(&config)?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> &str {
        self.config.endpoint.as_deref().unwrap_or(OPENAI_CHAT_URL)
    }
}

#[async_trait]
impl LLM for OpenAIProvider {
    async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        schema: Option<&ResponseSchema>,
    ) -> Result<LLMResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .ok_or_else(|| anyhow!("OpenAI API key not configured"))?;

        let request = ChatCompletionRequest::new(&self.config, messages, schema);

        debug!("Sending request to OpenAI API");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await?;

        read_chat_completion(response, "OpenAI").await
    }

    async fn is_available(&self) -> bool {
        if let Some(api_key) = &self.config.api_key {
            let url = self.endpoint().replace("/chat/completions", "/models");

            match self
                .client
                .get(&url)
                .header("Authorization", format!("Bearer {}", api_key))
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(_) => false,
            }
        } else {
            false
        }
    }

    fn provider_type(&self) -> LLMProvider {
        LLMProvider::OpenAI
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn gemini_config() -> LLMConfig {
        LLMConfig {
            api_key: Some("test-key".to_string()),
            ..LLMConfig::default()
        }
    }

    #[test]
    fn test_cloud_providers_require_api_key() {
        let config = LLMConfig::default();
        assert!(GeminiProvider::new(config.clone()).is_err());
        assert!(OpenAIProvider::new(config.clone()).is_err());
        assert!(LMStudioProvider::new(config).is_ok());
    }

    #[test]
    fn test_gemini_request_moves_system_prompt() {
        let provider = GeminiProvider::new(gemini_config()).unwrap();
        let schema = ResponseSchema::new("videos", json!({ "type": "array" }));
        let request = provider.build_request(
            vec![ChatMessage::system("find videos"), ChatMessage::user("https://x.test")],
            Some(&schema),
        );

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "find videos");
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "ARRAY");
    }

    #[test]
    fn test_gemini_key_stays_out_of_the_url() {
        let provider = GeminiProvider::new(gemini_config()).unwrap();
        let body = provider.build_request(vec![ChatMessage::user("hi")], None);
        let request = provider.generate_content(&body).unwrap().build().unwrap();

        assert_eq!(request.url().query(), None);
        assert!(!request.url().as_str().contains("test-key"));
        assert!(request.url().path().ends_with("/models/gemini-2.5-flash:generateContent"));
        assert_eq!(request.headers()[GEMINI_KEY_HEADER], "test-key");
    }

    #[test]
    fn test_gemini_request_without_schema_omits_json_mode() {
        let provider = GeminiProvider::new(gemini_config()).unwrap();
        let request = provider.build_request(vec![ChatMessage::user("hi")], None);

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("responseSchema").is_none());
    }

    #[test]
    fn test_chat_completion_wraps_array_schema() {
        let schema = ResponseSchema::new("videos", json!({ "type": "array" }));
        let request =
            ChatCompletionRequest::new(&LLMConfig::default(), vec![ChatMessage::user("hi")], Some(&schema));

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["schema"]["type"], "object");
    }
}
