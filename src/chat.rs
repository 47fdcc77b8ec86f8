use chrono::{SecondsFormat, Utc};
use reqwest::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::types::{ChatMessage, ChatRequest};
use crate::{ChatClient, Error, Result};

impl ChatClient {
    /// Posts one user turn to `thread_id` and returns the reply text.
    ///
    /// Once the service answers with a 2xx status this never fails on the body's shape: if no
    /// known reply field is present the raw body is returned instead.
    pub async fn send_chat(&self, session_token: &str, thread_id: Uuid, prompt: &str) -> Result<String> {
        let config = self.config();
        let body = ChatRequest {
            id: thread_id.to_string(),
            title: "",
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            sources: Vec::new(),
            model: &config.model,
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            language: &config.language,
        };

        let request = self
            .request(Method::POST, "chat", Some(session_token))?
            .json(&body);
        let (status_code, text) = Self::send(request).await?;
        if !status_code.is_success() {
            return Err(Error::from_dispatch(status_code, text));
        }

        Ok(extract_reply(text))
    }
}

fn extract_reply(body: String) -> String {
    let Ok(value) = serde_json::from_str::<Value>(&body) else {
        return body;
    };

    value
        .pointer("/choices/0/message")
        .and_then(message_text)
        .or_else(|| value.get("message").and_then(message_text))
        .unwrap_or(body)
}

fn message_text(message: &Value) -> Option<String> {
    match message {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => fields
            .get("content")
            .and_then(Value::as_str)
            .map(str::to_owned),
        _ => None,
    }
}
