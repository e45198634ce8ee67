use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::GenericImageView;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;

use super::{AnalysisError, AnalysisResult};
use crate::config::AnalysisConfig;

/// Longest edge of the payload sent to the vision service, in pixels.
pub const MAX_PAYLOAD_DIMENSION: u32 = 1024;
/// JPEG quality used when re-encoding the payload.
pub const PAYLOAD_JPEG_QUALITY: u8 = 80;

/// A vision service that can analyze one photo. Implementations are
/// blocking; the coordinator supplies the threading.
pub trait VisionProvider: Send + Sync {
    fn analyze_image(&self, image_path: &Path) -> Result<AnalysisResult, AnalysisError>;

    /// Provider name for display and logging.
    fn provider_name(&self) -> &'static str;
}

/// Load an image and shrink it for upload: the longest edge is bounded
/// to `max_dimension` with aspect ratio preserved, the result is
/// re-encoded as JPEG at [`PAYLOAD_JPEG_QUALITY`], and returned
/// base64-encoded along with its MIME type. Images already within
/// bounds are re-encoded but never upscaled.
pub fn encode_image_payload(
    image_path: &Path,
    max_dimension: u32,
) -> Result<(String, &'static str), AnalysisError> {
    let img = image::open(image_path).map_err(|e| {
        AnalysisError::ImagePreparation(format!("{}: {}", image_path.display(), e))
    })?;

    let (width, height) = img.dimensions();
    let img = if width > max_dimension || height > max_dimension {
        img.resize(
            max_dimension,
            max_dimension,
            image::imageops::FilterType::Triangle,
        )
    } else {
        img
    };

    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, PAYLOAD_JPEG_QUALITY);
    img.write_with_encoder(encoder)
        .map_err(|e| AnalysisError::ImagePreparation(format!("JPEG encode failed: {}", e)))?;

    Ok((BASE64.encode(buf.into_inner()), "image/jpeg"))
}

// ============================================================================
// Gemini provider
// ============================================================================

pub struct GeminiProvider {
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
    #[serde(rename = "responseSchema")]
    response_schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiProvider {
    pub fn new(config: &AnalysisConfig, api_key: &str) -> Self {
        Self {
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.to_string(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl VisionProvider for GeminiProvider {
    fn analyze_image(&self, image_path: &Path) -> Result<AnalysisResult, AnalysisError> {
        let (base64_image, mime_type) = encode_image_payload(image_path, MAX_PAYLOAD_DIMENSION)?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_type.to_string(),
                            data: base64_image,
                        },
                    },
                    Part::Text {
                        text: analysis_prompt().to_string(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
                response_schema: analysis_response_schema(),
            },
        };

        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        let response = agent
            .post(&url)
            .set("Content-Type", "application/json")
            .set("x-goog-api-key", &self.api_key)
            .send_json(&request)
            .map_err(|e| AnalysisError::Transport(e.to_string()))?;

        let body: GenerateContentResponse = response
            .into_json()
            .map_err(|e| AnalysisError::MalformedResponse(format!("invalid response body: {}", e)))?;

        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|c| c.parts.first())
            .and_then(|p| p.text.clone())
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("response contained no text".to_string())
            })?;

        parse_analysis_text(&text)
    }

    fn provider_name(&self) -> &'static str {
        "Gemini"
    }
}

fn analysis_prompt() -> &'static str {
    "Analyze this image for a photo management application.\n\
     1. Provide 5-10 precise, searchable tags (keywords) describing the content, \
     mood, and technical aspects (e.g., \"landscape\", \"low-light\", \"bokeh\").\n\
     2. Write a concise 1-sentence description.\n\
     3. Suggest a technical rating from 1 to 5 based on composition, focus, and \
     exposure (1=poor, 5=professional)."
}

fn analysis_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "tags": {
                "type": "ARRAY",
                "items": { "type": "STRING" },
                "description": "List of relevant tags"
            },
            "description": {
                "type": "STRING",
                "description": "Short description of the photo"
            },
            "ratingSuggestion": {
                "type": "INTEGER",
                "description": "Suggested rating 1-5"
            }
        },
        "required": ["tags", "description", "ratingSuggestion"]
    })
}

/// Parse the model's JSON payload, unfencing a markdown code block if
/// one slipped through despite the JSON response mode.
fn parse_analysis_text(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let json = extract_json(text);
    serde_json::from_str(&json).map_err(|e| {
        AnalysisError::MalformedResponse(format!("{}; response was: {}", e, text))
    })
}

/// Extract JSON from a string that might contain markdown code blocks
fn extract_json(content: &str) -> String {
    let trimmed = content.trim();

    if trimmed.starts_with("```") {
        if let Some(start) = trimmed.find('\n') {
            let after_first_line = &trimmed[start + 1..];
            if let Some(end) = after_first_line.rfind("```") {
                return after_first_line[..end].trim().to_string();
            }
        }
    }

    trimmed.to_string()
}
