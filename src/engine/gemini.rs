use super::{prompt, DesignGenerator, GenerationError};
use crate::model::{ApiConfig, GeneratedResult, GenerationRequest};
use serde::Deserialize;
use serde_json::json;

/// Client for the Gemini `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    cfg: ApiConfig,
}

impl GeminiClient {
    pub fn new(cfg: &ApiConfig) -> Result<Self, GenerationError> {
        if cfg.api_key.trim().is_empty() {
            return Err(GenerationError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .build()?;
        Ok(Self {
            http,
            cfg: cfg.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.cfg.base_url.trim_end_matches('/'),
            self.cfg.model
        )
    }

    fn request_body(&self, req: &GenerationRequest) -> serde_json::Value {
        let lang = &self.cfg.description_language;
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt::user_text(req) }]
            }],
            "systemInstruction": {
                "parts": [{ "text": prompt::system_instruction(req, lang) }]
            },
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": prompt::response_schema(lang),
                "thinkingConfig": { "thinkingBudget": self.cfg.thinking_budget }
            }
        })
    }
}

impl DesignGenerator for GeminiClient {
    async fn generate(&self, req: GenerationRequest) -> Result<GeneratedResult, GenerationError> {
        let url = self.endpoint();
        tracing::info!(model = %self.cfg.model, mode = ?req.mode, "sending generation request");

        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.cfg.api_key)
            .json(&self.request_body(&req))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        tracing::debug!(%status, bytes = body.len(), "generation response received");

        if !status.is_success() {
            return Err(GenerationError::Api {
                status: status.as_u16(),
                message: api_error_message(&body),
            });
        }

        let text = extract_text(&body)?;
        parse_result(&text)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

/// Concatenate the answer text of the first candidate, skipping thought summaries.
pub(crate) fn extract_text(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(body).map_err(GenerationError::InvalidResponse)?;
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .filter(|p| !p.thought)
                .filter_map(|p| p.text)
                .collect()
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Parse the model's JSON answer, tolerating a Markdown code fence around it.
pub(crate) fn parse_result(text: &str) -> Result<GeneratedResult, GenerationError> {
    let trimmed = text.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed);
    serde_json::from_str(unfenced.trim()).map_err(GenerationError::InvalidResponse)
}

fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppMode, GeneratorSettings};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn cfg(key: &str) -> ApiConfig {
        ApiConfig {
            base_url: "https://example.invalid/".into(),
            model: "gemini-test".into(),
            api_key: key.into(),
            timeout: Duration::from_secs(5),
            thinking_budget: 2048,
            description_language: "English".into(),
            user_agent: "lasercraft-cli/test".into(),
        }
    }

    #[test]
    fn missing_key_is_rejected() {
        assert!(matches!(
            GeminiClient::new(&cfg("  ")),
            Err(GenerationError::MissingApiKey)
        ));
    }

    #[test]
    fn endpoint_and_body_shape() {
        let client = GeminiClient::new(&cfg("k")).unwrap();
        assert_eq!(
            client.endpoint(),
            "https://example.invalid/v1beta/models/gemini-test:generateContent"
        );
        let req = GenerationRequest {
            prompt: "coaster".into(),
            mode: AppMode::TwoD,
            settings: GeneratorSettings::default(),
        };
        let body = client.request_body(&req);
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Create a design: coaster");
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(
            body["generationConfig"]["thinkingConfig"]["thinkingBudget"],
            2048
        );
        assert!(body["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("#FF0000"));
    }

    #[test]
    fn extracts_answer_text_without_thoughts() {
        let body = r#"{"candidates":[{"content":{"parts":[
            {"text":"thinking...","thought":true},
            {"text":"{\"svgContent\":\"<svg/>\","},
            {"text":"\"description\":\"d\",\"width\":\"1mm\",\"height\":\"2mm\"}"}
        ]}}]}"#;
        let text = extract_text(body).unwrap();
        let result = parse_result(&text).unwrap();
        assert_eq!(result.svg_content, "<svg/>");
        assert_eq!(result.width, "1mm");
    }

    #[test]
    fn empty_candidates_is_empty_response() {
        assert!(matches!(
            extract_text(r#"{"candidates":[]}"#),
            Err(GenerationError::EmptyResponse)
        ));
        assert!(matches!(
            extract_text(r#"{"candidates":[{"content":{"parts":[{"text":"  "}]}}]}"#),
            Err(GenerationError::EmptyResponse)
        ));
    }

    #[test]
    fn fenced_json_is_accepted() {
        let text = "```json\n{\"svgContent\":\"<svg/>\",\"description\":\"d\",\"width\":\"1\",\"height\":\"2\"}\n```";
        assert_eq!(parse_result(text).unwrap().height, "2");
    }

    #[test]
    fn shape_mismatch_is_invalid_response() {
        assert!(matches!(
            parse_result(r#"{"svg":"<svg/>"}"#),
            Err(GenerationError::InvalidResponse(_))
        ));
    }

    #[test]
    fn api_error_message_prefers_error_field() {
        assert_eq!(
            api_error_message(r#"{"error":{"code":400,"message":"API key not valid"}}"#),
            "API key not valid"
        );
        assert_eq!(api_error_message("gateway down"), "gateway down");
    }
}
