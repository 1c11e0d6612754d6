//! Z.AI chat completions client (OpenAI-compatible wire format).

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_API_URL: &str = "https://api.z.ai/api/paas/v4/chat/completions";

/// A single system + user exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Anything that can answer a [`CompletionRequest`] with text.
pub trait Completion: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> impl Future<Output = Result<String, Error>> + Send;
}

pub struct Client {
    api_key: String,
    model: String,
    url: String,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: [ApiMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl Client {
    pub fn new(api_key: String, model: String, url: Option<String>, timeout: Duration) -> Result<Self, Error> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(e.to_string()))?;

        Ok(Self {
            api_key,
            model,
            url: url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            http,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: [
                ApiMessage { role: "system", content: &request.system },
                ApiMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
        }
    }
}

impl Completion for Client {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, Error> {
        debug!(model = %self.model, temperature = request.temperature, "Z.AI completion request");

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(Error::Api { status: status.as_u16(), body });
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<String, Error> {
    let parsed: ApiResponse = serde_json::from_str(body).map_err(|e| Error::Parse(e.to_string()))?;
    let choice = parsed.choices.into_iter().next().ok_or(Error::Empty)?;

    if choice.finish_reason.as_deref() == Some("sensitive") {
        return Err(Error::Filtered);
    }

    match choice.message.content {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(Error::Empty),
    }
}

#[derive(Debug)]
pub enum Error {
    Http(String),
    Api { status: u16, body: String },
    Parse(String),
    Empty,
    /// The provider's content filter stopped the completion.
    Filtered,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Http(e) => write!(f, "HTTP error: {e}"),
            Error::Api { status, body } => write!(f, "API error: {status}: {body}"),
            Error::Parse(e) => write!(f, "Parse error: {e}"),
            Error::Empty => write!(f, "Empty response"),
            Error::Filtered => write!(f, "Response blocked by content filter"),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> Client {
        Client::new(
            "key".to_string(),
            "glm-4.5-flash".to_string(),
            None,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let client = client();
        let request = CompletionRequest {
            system: "be precise".to_string(),
            user: "translate: hi".to_string(),
            temperature: 0.3,
            max_tokens: 4000,
        };
        let json = serde_json::to_value(client.body(&request)).unwrap();

        assert_eq!(json["model"], "glm-4.5-flash");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][0]["content"], "be precise");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "translate: hi");
        assert_eq!(json["max_tokens"], 4000);
        assert_eq!(json["stream"], false);
        assert!((json["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_default_url() {
        assert_eq!(client().url, DEFAULT_API_URL);
    }

    #[test]
    fn test_parse_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Xin chào"},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_response(body).unwrap(), "Xin chào");
    }

    #[test]
    fn test_parse_sensitive() {
        let body = r#"{"choices":[{"message":{"content":""},"finish_reason":"sensitive"}]}"#;
        assert!(matches!(parse_response(body), Err(Error::Filtered)));
    }

    #[test]
    fn test_parse_empty() {
        assert!(matches!(parse_response(r#"{"choices":[]}"#), Err(Error::Empty)));
        assert!(matches!(
            parse_response(r#"{"choices":[{"message":{"content":null},"finish_reason":"stop"}]}"#),
            Err(Error::Empty)
        ));
        assert!(matches!(
            parse_response(r#"{"choices":[{"message":{"content":"  \n"}}]}"#),
            Err(Error::Empty)
        ));
    }

    #[test]
    fn test_parse_garbage() {
        assert!(matches!(parse_response("<html>502</html>"), Err(Error::Parse(_))));
    }
}
