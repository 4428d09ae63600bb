use crate::config::toml_config::TipsConfig;
use crate::domain::ports::TipsProvider;
use crate::utils::error::{ConsoleError, Result};
use crate::utils::validation::validate_required_field;
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// `generateContent` client that asks for de-escalation techniques.
pub struct GeminiTipsClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl GeminiTipsClient {
    pub fn new(config: &TipsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.resolved_api_key(),
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn prompt(transcript: &str) -> String {
        format!(
            "You are an expert crisis counselor. Based on this emergency call transcript, \
             generate 3 to 5 specific, actionable de-escalation techniques the operator can use \
             right now. Make them concise and practical. Respond as a JSON array of strings.\
             \n\nTranscript: \"{}\"",
            transcript
        )
    }

    /// Pulls the first `[...]` span out of free-form model text.
    pub fn parse_tips(text: &str) -> Result<Vec<String>> {
        let re = Regex::new(r"(?s)\[.*\]").map_err(|e| ConsoleError::ExternalServiceFailure {
            message: format!("tips pattern: {}", e),
        })?;

        let Some(found) = re.find(text) else {
            return Ok(Vec::new());
        };

        serde_json::from_str(found.as_str()).map_err(|e| ConsoleError::ExternalServiceFailure {
            message: format!("unparsable tips array: {}", e),
        })
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl TipsProvider for GeminiTipsClient {
    async fn tips(&self, transcript: &str) -> Result<Vec<String>> {
        let api_key = validate_required_field("tips.api_key", &self.api_key).map_err(|_| {
            ConsoleError::ExternalServiceFailure {
                message: "text-completion API key is not configured".to_string(),
            }
        })?;

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart {
                    text: Self::prompt(transcript),
                }],
            }],
        };

        tracing::debug!("Requesting de-escalation tips from {}", self.url());
        let response = self
            .client
            .post(self.url())
            .query(&[("key", api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        tracing::debug!("Tips response status: {}", response.status());
        if !response.status().is_success() {
            return Err(ConsoleError::ExternalServiceFailure {
                message: format!("text-completion service returned {}", response.status()),
            });
        }

        let body: GenerateResponse = response.json().await?;
        let text = body
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .and_then(|part| part.text)
            .ok_or_else(|| ConsoleError::ExternalServiceFailure {
                message: "response had no candidate text".to_string(),
            })?;

        Self::parse_tips(&text)
    }
}
