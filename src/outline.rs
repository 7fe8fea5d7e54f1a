//! Remote outline/import service.
//!
//! Turns pasted spreadsheet text into a subject hierarchy and drafts Markdown
//! lesson outlines. The hierarchy comes back as loosely shaped JSON, so it goes
//! through [`parse_import_payload`] before the catalog ever sees it.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{ImportedLesson, ImportedModule, ImportedSubject};
use crate::config::GeminiConfig;

pub const DEFAULT_SUBJECT_NAME: &str = "Môn học mới";
pub const DEFAULT_LESSON_NAME: &str = "Bài học mới";

#[derive(Debug, Error)]
pub enum OutlineError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Gemini API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("API key not found in environment variable {0}")]
    MissingApiKey(String),
    #[error("Response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Expected a JSON array of subjects")]
    NotAList,
    #[error("Subject entry {0} is not a JSON object")]
    InvalidEntry(usize),
    #[error("Model returned no text")]
    EmptyResponse,
    #[error("The request stopped unexpectedly")]
    Interrupted,
}

/// Anything that can turn raw text into an import or draft a lesson outline
pub trait OutlineService: Send + Sync {
    /// Parse pasted sheet data into a subject hierarchy
    fn parse_sheet(&self, raw_text: &str) -> Result<Vec<ImportedSubject>, OutlineError>;

    /// Draft a Markdown outline for one lesson
    fn lesson_outline(&self, subject: &str, topic: &str) -> Result<String, OutlineError>;
}

/// Parse an import payload leniently.
///
/// Markdown code fences around the JSON are ignored. The top level must be an
/// array of objects; every field below that is optional and falls back to a
/// default when missing, blank, or of the wrong type.
pub fn parse_import_payload(raw: &str) -> Result<Vec<ImportedSubject>, OutlineError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))?;
    let Value::Array(entries) = value else {
        return Err(OutlineError::NotAList);
    };

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            let object = entry.as_object().ok_or(OutlineError::InvalidEntry(index))?;
            Ok(ImportedSubject {
                name: string_field(object.get("name"))
                    .unwrap_or_else(|| DEFAULT_SUBJECT_NAME.to_string()),
                icon: string_field(object.get("icon")),
                modules: objects(object.get("modules")).map(parse_module).collect(),
            })
        })
        .collect()
}

fn parse_module(object: &serde_json::Map<String, Value>) -> ImportedModule {
    ImportedModule {
        name: string_field(object.get("name")),
        lessons: objects(object.get("lessons"))
            .map(|lesson| ImportedLesson {
                name: string_field(lesson.get("name"))
                    .unwrap_or_else(|| DEFAULT_LESSON_NAME.to_string()),
                url: string_field(lesson.get("url")),
            })
            .collect(),
    }
}

/// Trimmed non-empty string, or `None`
fn string_field(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Object elements of an optional array; anything else is skipped
fn objects(value: Option<&Value>) -> impl Iterator<Item = &serde_json::Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string (```json)
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Offline service: the pasted text already is the JSON payload
#[derive(Debug, Default, Clone)]
pub struct JsonOutlineService;

impl OutlineService for JsonOutlineService {
    fn parse_sheet(&self, raw_text: &str) -> Result<Vec<ImportedSubject>, OutlineError> {
        parse_import_payload(raw_text)
    }

    fn lesson_outline(&self, subject: &str, topic: &str) -> Result<String, OutlineError> {
        Ok(format!(
            "# {topic}\n\n*Môn: {subject}*\n\n## Mục tiêu bài học\n\n- \n\n## Hoạt động chính\n\n- \n\n## Nội dung slide\n\n1. \n2. \n3. \n4. \n5. \n"
        ))
    }
}

/// Blocking client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
    import_model: String,
    outline_model: String,
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

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client from config, reading the API key from the configured
    /// environment variable
    pub fn from_config(config: &GeminiConfig) -> Result<Self, OutlineError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| OutlineError::MissingApiKey(config.api_key_env.clone()))?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            import_model: config.import_model.clone(),
            outline_model: config.outline_model.clone(),
        })
    }

    fn generate(&self, model: &str, prompt: &str, generation_config: Value) -> Result<String, OutlineError> {
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        tracing::info!(model, prompt_chars = prompt.chars().count(), "calling Gemini");
        let response = self
            .client
            .post(format!("{}/models/{}:generateContent", self.endpoint, model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()?;

        let response = Self::ensure_success(response)?;
        let parsed: GenerateResponse = response.json()?;
        let text: String = parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        if text.trim().is_empty() {
            return Err(OutlineError::EmptyResponse);
        }
        Ok(text)
    }

    fn ensure_success(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, OutlineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            tracing::warn!(status = status.as_u16(), "Gemini request failed");
            return Err(OutlineError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }
}

impl OutlineService for GeminiClient {
    fn parse_sheet(&self, raw_text: &str) -> Result<Vec<ImportedSubject>, OutlineError> {
        let text = self.generate(
            &self.import_model,
            &sheet_prompt(raw_text),
            serde_json::json!({ "responseMimeType": "application/json" }),
        )?;
        parse_import_payload(&text)
    }

    fn lesson_outline(&self, subject: &str, topic: &str) -> Result<String, OutlineError> {
        self.generate(
            &self.outline_model,
            &outline_prompt(subject, topic),
            serde_json::json!({ "temperature": 0.7 }),
        )
    }
}

fn outline_prompt(subject: &str, topic: &str) -> String {
    format!(
        "Tạo một đề cương giáo án cho môn {subject} với chủ đề: \"{topic}\".\n\
         Đề cương nên bao gồm mục tiêu bài học, các hoạt động chính và nội dung cho 5 slide cơ bản.\n\
         Trả về kết quả bằng tiếng Việt, định dạng Markdown."
    )
}

fn sheet_prompt(raw_text: &str) -> String {
    format!(
        r#"Bạn là một chuyên gia xử lý dữ liệu giáo dục. Tôi cung cấp dữ liệu copy từ Google Sheet.
Nhiệm vụ: Phân tích thành cấu trúc 3 cấp: Môn học -> Các Học phần (Danh mục con) -> Các Bài học & Link.

Dữ liệu:
"""
{raw_text}
"""

Yêu cầu JSON:
Array<{{
  "name": string, // Tên môn học
  "icon": string, // Icon FA phù hợp
  "modules": Array<{{
    "name": string, // Tên học phần (nếu sheet không có, hãy tự nhóm hoặc đặt là "Chung")
    "lessons": Array<{{
      "name": string,
      "url": string
    }}>
  }}>
}}>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_applies_defaults_field_by_field() {
        let subjects = parse_import_payload(
            r#"[{"name": "Lý", "modules": [{"lessons": [{"name": "L1"}, {"url": "http://x"}]}]}, {"icon": 3}]"#,
        )
        .unwrap();

        assert_eq!(subjects.len(), 2);
        assert_eq!(subjects[0].name, "Lý");
        assert_eq!(subjects[0].icon, None);
        let module = &subjects[0].modules[0];
        assert_eq!(module.name, None);
        assert_eq!(module.lessons[0].name, "L1");
        assert_eq!(module.lessons[0].url, None);
        assert_eq!(module.lessons[1].name, DEFAULT_LESSON_NAME);
        assert_eq!(module.lessons[1].url.as_deref(), Some("http://x"));
        assert_eq!(subjects[1].name, DEFAULT_SUBJECT_NAME);
        assert!(subjects[1].modules.is_empty());
    }

    #[test]
    fn test_payload_strips_code_fences() {
        let raw = "```json\n[{\"name\": \"Hóa\", \"icon\": \"fa-flask\"}]\n```";
        let subjects = parse_import_payload(raw).unwrap();
        assert_eq!(subjects[0].icon.as_deref(), Some("fa-flask"));
    }

    #[test]
    fn test_payload_rejects_non_list() {
        assert!(matches!(
            parse_import_payload(r#"{"name": "Lý"}"#),
            Err(OutlineError::NotAList)
        ));
        assert!(matches!(
            parse_import_payload("not json"),
            Err(OutlineError::InvalidJson(_))
        ));
        assert!(matches!(
            parse_import_payload(r#"[{"name": "ok"}, "oops"]"#),
            Err(OutlineError::InvalidEntry(1))
        ));
    }

    #[test]
    fn test_payload_skips_malformed_children() {
        let subjects =
            parse_import_payload(r#"[{"name": "Văn", "modules": [42, {"name": " Thơ ", "lessons": "none"}]}]"#)
                .unwrap();
        assert_eq!(subjects[0].modules.len(), 1);
        assert_eq!(subjects[0].modules[0].name.as_deref(), Some("Thơ"));
        assert!(subjects[0].modules[0].lessons.is_empty());
    }

    #[test]
    fn test_json_service_drafts_outline_skeleton() {
        let outline = JsonOutlineService.lesson_outline("Toán", "Phương trình").unwrap();
        assert!(outline.starts_with("# Phương trình"));
        assert!(outline.contains("Mục tiêu bài học"));
    }

    #[test]
    fn test_sheet_prompt_embeds_data() {
        let prompt = sheet_prompt("Toán\tBài 1\thttp://a");
        assert!(prompt.contains("Toán\tBài 1\thttp://a"));
        assert!(prompt.contains("\"modules\": Array<{"));
    }

    #[test]
    fn test_missing_api_key_is_reported() {
        let config = GeminiConfig {
            api_key_env: "EDUPLAN_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..GeminiConfig::default()
        };
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(OutlineError::MissingApiKey(var)) if var == "EDUPLAN_TEST_KEY_THAT_IS_NEVER_SET"
        ));
    }
}
