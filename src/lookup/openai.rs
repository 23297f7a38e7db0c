use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::types::Position;
use crate::lookup::{transport_error, LookupError, ProviderKind, SeriesInfo, SeriesLookup};

pub const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const USER_AGENT: &str = concat!("series-matcher/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const SYSTEM_PROMPT: &str = "You are a librarian who knows book series and their reading order. \
Answer with JSON only, never with explanations.";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchema,
}

#[derive(Debug, Serialize)]
struct JsonSchema {
    name: &'static str,
    strict: bool,
    schema: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Structured answer the model is constrained to
#[derive(Debug, Deserialize)]
struct SeriesAnswer {
    series_name: Option<String>,
    #[serde(alias = "series_index")]
    position: Option<String>,
}

/// Series lookup through an OpenAI chat model
pub struct OpenAiLookup {
    client: reqwest::blocking::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl std::fmt::Debug for OpenAiLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiLookup")
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl OpenAiLookup {
    /// Create a client for the given key and model.
    ///
    /// # Errors
    ///
    /// Returns `LookupError::Network` if the HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LookupError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LookupError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: model.into(),
            endpoint: OPENAI_CHAT_URL.to_string(),
        })
    }

    /// Point the client at a different chat-completions endpoint
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request_body(&self, title: &str, author: Option<&str>) -> ChatRequest {
        let schema = serde_json::json!({
            "type": "object",
            "properties": {
                "series_name": { "type": ["string", "null"] },
                "position": { "type": ["string", "null"] }
            },
            "required": ["series_name", "position"],
            "additionalProperties": false
        });

        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(title, author),
                },
            ],
            temperature: 0.1,
            max_tokens: 200,
            response_format: ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchema {
                    name: "series_membership",
                    strict: true,
                    schema,
                },
            },
        }
    }
}

impl SeriesLookup for OpenAiLookup {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AiSemantic
    }

    fn lookup(&self, title: &str, author: Option<&str>) -> Result<Option<SeriesInfo>, LookupError> {
        debug!(title = %title, model = %self.model, "Querying chat model for series");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request_body(title, author))
            .send()
            .map_err(|e| transport_error(&e))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            let error_text = response.text().unwrap_or_default();
            return Err(LookupError::Api(status.as_u16(), error_text));
        }

        let chat: ChatResponse = response
            .json()
            .map_err(|e| LookupError::Malformed(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LookupError::Malformed("response has no message content".to_string()))?;

        parse_answer(&content)
    }
}

/// User prompt asking for the series of one book
fn build_prompt(title: &str, author: Option<&str>) -> String {
    let by_author = author.map(|a| format!(" by {a}")).unwrap_or_default();
    format!(
        r#"Does the book "{title}"{by_author} belong to a series?

Reply with a JSON object with two fields:
- "series_name": the exact name of the series, or null for a standalone book
- "position": the book's number in the series as a digit string such as "1" or "10",
  "Companion" for books set in the series that are not part of the numbered
  sequence (short story collections, graphic novels, guides), or null if unknown

Examples:
- "Stormbreaker" by Anthony Horowitz -> {{"series_name": "Alex Rider", "position": "1"}}
- "Alex Rider: Secret Weapon" -> {{"series_name": "Alex Rider", "position": "Companion"}}
- "The Stand" by Stephen King -> {{"series_name": null, "position": null}}"#
    )
}

/// Interpret the model's message content.
///
/// A null or blank series name means "no series". A position that is neither
/// a digit string nor `Companion` is dropped while the series is kept.
///
/// # Errors
///
/// Returns `LookupError::Malformed` if the content is not the expected JSON object.
pub fn parse_answer(content: &str) -> Result<Option<SeriesInfo>, LookupError> {
    let json = strip_code_fence(content);
    let answer: SeriesAnswer =
        serde_json::from_str(json).map_err(|e| LookupError::Malformed(format!("{e}: {content}")))?;

    let Some(name) = answer
        .series_name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
    else {
        return Ok(None);
    };

    let position = answer.position.as_deref().and_then(|token| {
        let parsed = Position::parse(token);
        if parsed.is_none() {
            debug!(token = %token, "Ignoring unrecognized series position");
        }
        parsed
    });

    Ok(Some(SeriesInfo { name, position }))
}

/// Models sometimes wrap JSON in a markdown fence despite instructions
fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}
