use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::config::LlmRuntimeConfig;
use super::prompt::{MATCH_SYSTEM_PROMPT, MEETING_SYSTEM_PROMPT, match_prompt, meeting_prompt};
use super::response::{extract_json_object, match_result_from_payload, meeting_plan_from_payload};
use super::{AiUnavailable, CompatibilityScorer};
use crate::Profile;
use crate::matching::MatchResult;
use crate::matching::meetings::MeetingPlan;

pub const USER_AGENT: &str = concat!("nm-common/", env!("CARGO_PKG_VERSION"));

const MAX_ERROR_BODY: usize = 200;
const MEETING_TEMPERATURE: f32 = 0.4;
const MEETING_MAX_TOKENS: u32 = 1500;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client (Groq by default).
#[derive(Debug, Clone)]
pub struct HttpCompatibilityScorer {
    client: Client,
    config: LlmRuntimeConfig,
}

impl HttpCompatibilityScorer {
    pub fn new(config: LlmRuntimeConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmRuntimeConfig {
        &self.config
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error) -> AiUnavailable {
        if error.is_timeout() {
            return AiUnavailable::Timeout(self.config.timeout);
        }
        AiUnavailable::Transport(error.to_string())
    }

    /// Send one chat completion and return the parsed JSON object plus the model that answered.
    async fn complete(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<(serde_json::Map<String, serde_json::Value>, String), AiUnavailable> {
        if !self.config.is_usable() {
            return Err(AiUnavailable::Disabled);
        }

        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(AiUnavailable::RateLimited);
        }
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|idx| text.is_char_boundary(*idx))
                    .unwrap_or(0);
                text.truncate(cut);
            }
            return Err(AiUnavailable::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let raw = response
            .bytes()
            .await
            .map_err(|err| self.convert_reqwest_error(&err))?;
        let parsed: ChatResponse = serde_json::from_slice(&raw)
            .map_err(|err| AiUnavailable::Malformed(format!("completion envelope: {err}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiUnavailable::Malformed("completion has no content".into()))?;

        let model = parsed.model.unwrap_or_else(|| self.config.model.clone());
        debug!(%model, content_len = content.len(), "AI completion received");

        Ok((extract_json_object(&content)?, model))
    }
}

#[async_trait]
impl CompatibilityScorer for HttpCompatibilityScorer {
    fn name(&self) -> &str {
        &self.config.provider
    }

    #[instrument(skip_all, fields(requester = %requester.user_id, candidate = %candidate.user_id))]
    async fn score(
        &self,
        requester: &Profile,
        candidate: &Profile,
    ) -> Result<MatchResult, AiUnavailable> {
        let prompt = match_prompt(requester, candidate);
        let (payload, model) = self
            .complete(
                MATCH_SYSTEM_PROMPT,
                &prompt,
                self.config.temperature,
                self.config.max_tokens,
            )
            .await?;
        Ok(match_result_from_payload(&payload, &model))
    }

    #[instrument(skip_all, fields(participants = participants.len()))]
    async fn suggest_meetings(
        &self,
        participants: &[&Profile],
    ) -> Result<MeetingPlan, AiUnavailable> {
        let prompt = meeting_prompt(participants);
        let (payload, _) = self
            .complete(
                MEETING_SYSTEM_PROMPT,
                &prompt,
                MEETING_TEMPERATURE,
                MEETING_MAX_TOKENS,
            )
            .await?;
        meeting_plan_from_payload(&payload)
    }
}
