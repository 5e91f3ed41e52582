//! Wire types for the generateContent protocol

use serde::{Deserialize, Serialize};

/// One text segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
}

/// A list of parts (system instruction or user turn)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

impl Content {
    /// Content holding a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
        }
    }
}

/// Sampling and output-format settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    pub response_mime_type: String,
}

/// Request body for `models/{model}:generateContent`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationSettings,
}

impl GenerateContentRequest {
    pub fn new(
        system_instruction: &str,
        user_text: &str,
        temperature: f32,
        response_mime_type: &str,
    ) -> Self {
        Self {
            system_instruction: Content::text(system_instruction),
            contents: vec![Content::text(user_text)],
            generation_config: GenerationSettings {
                temperature,
                response_mime_type: response_mime_type.to_string(),
            },
        }
    }
}

/// JSON pointer to the first candidate's first text segment
pub const CANDIDATE_TEXT_POINTER: &str = "/candidates/0/content/parts/0/text";

/// Pull the candidate text out of a response body
pub fn extract_candidate_text(body: &serde_json::Value) -> Option<&str> {
    body.pointer(CANDIDATE_TEXT_POINTER)
        .and_then(|text| text.as_str())
}
