use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::AssistantConfig;

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("OPENAI_API_KEY is not set")]
    MissingApiKey,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("endpoint answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response body: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ReplyMessage>,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Pulls the first reply out of a chat-completion body. A body without a
/// `choices` array is an error; an empty reply is `None`.
pub fn parse_reply(body: &str) -> Result<Option<String>, AssistantError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    Ok(response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.is_empty()))
}

pub struct ChatClient {
    http: reqwest::Client,
    config: AssistantConfig,
}

impl ChatClient {
    pub fn new(config: AssistantConfig) -> Result<Self, AssistantError> {
        let http = reqwest::Client::builder().build()?;
        Ok(Self::with_http(config, http))
    }

    pub fn with_http(config: AssistantConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Sends `prompt` as the only user message. One attempt, no timeout.
    pub async fn complete(&self, prompt: &str) -> Result<Option<String>, AssistantError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(AssistantError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
        };

        info!("sending chat completion to {}", self.config.endpoint);
        let response = self
            .http
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        debug!("chat completion answered {status} with {} bytes", body.len());
        if !status.is_success() {
            return Err(AssistantError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_reply(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    #[test]
    fn parses_first_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"}},{"message":{"content":"ignored"}}]}"#;
        assert_eq!(parse_reply(body).unwrap(), Some("Hello".to_string()));
    }

    #[test]
    fn empty_choices_mean_no_reply() {
        assert_eq!(parse_reply(r#"{"choices":[]}"#).unwrap(), None);
        assert_eq!(parse_reply(r#"{"choices":[{}]}"#).unwrap(), None);
        assert_eq!(
            parse_reply(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap(),
            None
        );
        assert_eq!(
            parse_reply(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap(),
            None
        );
    }

    #[test]
    fn body_without_choices_is_an_error() {
        let body = r#"{"error":{"message":"Incorrect API key provided"}}"#;
        assert!(matches!(parse_reply(body), Err(AssistantError::Parse(_))));
        assert!(matches!(parse_reply("not json"), Err(AssistantError::Parse(_))));
    }

    #[test]
    fn request_body_has_single_user_message() {
        let request = ChatRequest {
            model: "gpt-4",
            messages: [ChatMessage {
                role: "user",
                content: "Say hi",
            }],
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "gpt-4",
                "messages": [{ "role": "user", "content": "Say hi" }]
            })
        );
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf);
            if let Some(header_end) = text.find("\r\n\r\n") {
                let length = text[..header_end]
                    .lines()
                    .filter_map(|line| line.split_once(':'))
                    .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
                    .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + length {
                    break;
                }
            }
        }
        String::from_utf8(buf).unwrap()
    }

    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;
            request
        });
        (format!("http://{addr}/v1/chat/completions"), handle)
    }

    fn client_for(endpoint: String, api_key: Option<&str>) -> ChatClient {
        let config = AssistantConfig {
            api_key: api_key.map(str::to_string),
            endpoint,
            ..AssistantConfig::default()
        };
        let http = reqwest::Client::builder().no_proxy().build().unwrap();
        ChatClient::with_http(config, http)
    }

    #[tokio::test]
    async fn posts_prompt_with_bearer_token() {
        let (endpoint, server) =
            serve_once("200 OK", r#"{"choices":[{"message":{"content":"Hello"}}]}"#).await;
        let client = client_for(endpoint, Some("test-key"));

        let reply = client.complete("Say hi").await.unwrap();
        assert_eq!(reply, Some("Hello".to_string()));

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /v1/chat/completions "));
        assert!(request
            .to_ascii_lowercase()
            .contains("authorization: bearer test-key"));
        assert!(request.contains(r#""messages":[{"role":"user","content":"Say hi"}]"#));
        assert!(request.contains(r#""model":"gpt-4""#));
    }

    #[tokio::test]
    async fn error_status_is_reported() {
        let (endpoint, server) =
            serve_once("401 Unauthorized", r#"{"error":{"message":"bad key"}}"#).await;
        let client = client_for(endpoint, Some("wrong"));

        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, AssistantError::Status { status: 401, .. }));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn missing_key_fails_without_a_request() {
        let client = client_for("http://127.0.0.1:9/unused".to_string(), None);
        assert!(!client.has_api_key());
        assert!(matches!(
            client.complete("hi").await,
            Err(AssistantError::MissingApiKey)
        ));
    }
}
