use std::{sync::RwLock, time::Duration};

use reqwest::Client;
use serde_json::{json, Value};

use crate::{
    config::Config,
    error::AppError,
    models::ai::{ChatMessage, HomeworkRequest, LearningReportRequest, PromptConfig},
};

/// A chat history longer than this is truncated to its most recent entries
/// before forwarding.
const CHAT_HISTORY_LIMIT: usize = 10;

const PLACEHOLDER_KEY: &str = "your_api_key_here";

/// Stateless passthrough to the external chat-completion provider. The
/// credential is runtime-replaceable from the admin console; requests read
/// it fresh on every call.
pub struct AiService {
    client: Client,
    endpoint: String,
    model: String,
    api_key: RwLock<Option<String>>,
}

impl AiService {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ai_timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.ai_endpoint.clone(),
            model: config.ai_model.clone(),
            api_key: RwLock::new(config.ai_api_key.clone()),
        })
    }

    pub fn set_api_key(&self, key: String) {
        let mut guard = self.api_key.write().expect("api key lock poisoned");
        *guard = Some(key);
    }

    /// Redacted form for display: first 8 and last 4 characters.
    pub fn masked_key(&self) -> Option<String> {
        let guard = self.api_key.read().expect("api key lock poisoned");
        guard
            .as_deref()
            .filter(|k| *k != PLACEHOLDER_KEY)
            .map(|k| {
                if k.len() > 12 {
                    format!("{}****{}", &k[..8], &k[k.len() - 4..])
                } else {
                    "****".to_string()
                }
            })
    }

    fn current_key(&self) -> Result<String, AppError> {
        let guard = self.api_key.read().expect("api key lock poisoned");
        match guard.as_deref() {
            Some(key) if key != PLACEHOLDER_KEY => Ok(key.to_string()),
            _ => Err(AppError::UpstreamUnavailable),
        }
    }

    /// Forward one request and return the single completion string. No
    /// retry, no streaming.
    pub async fn chat_completion(
        &self,
        messages: Vec<Value>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AppError> {
        let api_key = self.current_key()?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&json!({
                "model": self.model,
                "messages": messages,
                "max_tokens": max_tokens,
                "temperature": temperature,
            }))
            .send()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("AI provider error {status}: {body}");
            return Err(AppError::UpstreamError(status.as_u16()));
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;
        let reply = data["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("The assistant has no answer right now. Please try again later.")
            .to_string();
        Ok(reply)
    }

    /// Minimal round trip used by the admin console to verify the
    /// credential.
    pub async fn probe(&self) -> Result<(), AppError> {
        self.chat_completion(vec![json!({"role": "user", "content": "hello"})], 10, 0.0)
            .await
            .map(|_| ())
    }
}

/// Homework help accepts a text question, a photographed problem, or both;
/// an image switches the user turn to the provider's vision payload shape.
pub fn homework_messages(
    config: &PromptConfig,
    req: &HomeworkRequest,
) -> Result<Vec<Value>, AppError> {
    let question = req.question.as_deref().filter(|q| !q.trim().is_empty());
    let image = req.image.as_deref().filter(|i| !i.is_empty());
    if question.is_none() && image.is_none() {
        return Err(AppError::validation("Provide a question or a problem image"));
    }

    let mut messages = vec![json!({"role": "system", "content": config.system_prompt})];
    match image {
        Some(image) => {
            messages.push(json!({
                "role": "user",
                "content": [
                    {
                        "type": "image_url",
                        "image_url": { "url": format!("data:image/jpeg;base64,{image}") },
                    },
                    {
                        "type": "text",
                        "text": question.unwrap_or("Please walk me through how to solve this problem"),
                    },
                ],
            }));
        }
        None => {
            messages.push(json!({"role": "user", "content": question}));
        }
    }
    Ok(messages)
}

pub fn learning_report_messages(
    config: &PromptConfig,
    req: &LearningReportRequest,
) -> Result<Vec<Value>, AppError> {
    if req.grade.trim().is_empty() || req.subjects.is_empty() {
        return Err(AppError::validation("Grade and subjects are required"));
    }
    let content = format!(
        "Please write a learning report from the following details:\n\
         - Grade: {}\n\
         - Subjects: {}\n\
         - Strengths: {}\n\
         - Areas to improve: {}\n\
         - Daily study hours: {}\n\
         - Goals: {}",
        req.grade,
        req.subjects.join(", "),
        req.strengths.as_deref().unwrap_or("not given"),
        req.weaknesses.as_deref().unwrap_or("not given"),
        req.study_hours.as_deref().unwrap_or("not given"),
        req.goals.as_deref().unwrap_or("not given"),
    );
    Ok(vec![
        json!({"role": "system", "content": config.system_prompt}),
        json!({"role": "user", "content": content}),
    ])
}

/// Conversation passthrough: system prompt plus the most recent history.
pub fn chat_messages(
    config: &PromptConfig,
    history: &[ChatMessage],
) -> Result<Vec<Value>, AppError> {
    if history.is_empty() {
        return Err(AppError::validation("Provide at least one chat message"));
    }
    let recent = &history[history.len().saturating_sub(CHAT_HISTORY_LIMIT)..];
    let mut messages = vec![json!({"role": "system", "content": config.system_prompt})];
    messages.extend(
        recent
            .iter()
            .map(|m| json!({"role": m.role, "content": m.content})),
    );
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::prompts::default_prompts;
    use crate::models::ai::AiFeature;

    fn config() -> PromptConfig {
        default_prompts().remove(&AiFeature::Chat).unwrap()
    }

    #[test]
    fn chat_history_is_truncated_to_recent_entries() {
        let history: Vec<ChatMessage> = (0..25)
            .map(|i| ChatMessage {
                role: "user".into(),
                content: format!("message {i}"),
            })
            .collect();
        let messages = chat_messages(&config(), &history).unwrap();
        // system prompt + the last 10 turns
        assert_eq!(messages.len(), 11);
        assert_eq!(messages[1]["content"], "message 15");
        assert_eq!(messages[10]["content"], "message 24");
    }

    #[test]
    fn empty_chat_history_is_rejected() {
        assert!(matches!(
            chat_messages(&config(), &[]),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn homework_requires_question_or_image() {
        let req = HomeworkRequest {
            question: None,
            image: None,
        };
        assert!(matches!(
            homework_messages(&config(), &req),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn homework_image_uses_vision_payload() {
        let req = HomeworkRequest {
            question: Some("What is 2 + 2?".into()),
            image: Some("aGVsbG8=".into()),
        };
        let messages = homework_messages(&config(), &req).unwrap();
        assert_eq!(messages.len(), 2);
        let content = &messages[1]["content"];
        assert!(content.is_array());
        assert_eq!(content[0]["type"], "image_url");
        assert_eq!(
            content[0]["image_url"]["url"],
            "data:image/jpeg;base64,aGVsbG8="
        );
        assert_eq!(content[1]["text"], "What is 2 + 2?");
    }

    #[test]
    fn learning_report_requires_grade_and_subjects() {
        let req = LearningReportRequest {
            grade: "".into(),
            subjects: vec!["math".into()],
            strengths: None,
            weaknesses: None,
            study_hours: None,
            goals: None,
        };
        assert!(matches!(
            learning_report_messages(&config(), &req),
            Err(AppError::Validation(_))
        ));
    }
}
