use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, Lines};
use tracing::warn;

use crate::application::EventStream;
use crate::connector::adapter::sse::{response_lines, streaming_http_client, trim_line};
use crate::domain::{ChatError, ContentPart, Message, Provider, Role, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const MAX_COMPLETION_TOKENS: u32 = 4096;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// Chat Completions API request payload.
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
    max_completion_tokens: u32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: Vec<ApiContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize)]
struct ImageUrl {
    url: String,
    detail: &'static str,
}

/// Minimal subset of a streamed completion chunk we care about.
#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Deserialize, Default)]
struct Delta {
    content: Option<String>,
}

/// Streaming client for the OpenAI Chat Completions API.
///
/// Sends the whole conversation with `stream: true` and parses the
/// `data: `-framed response incrementally. Override the base URL to target
/// any compatible server.
pub struct OpenAiChatClient {
    client: reqwest::Client,
    url: String,
}

impl OpenAiChatClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{}", base.trim_end_matches('/'), COMPLETIONS_PATH);
        Self {
            client: streaming_http_client(),
            url,
        }
    }

    /// Open a streaming completion for `messages`.
    ///
    /// A non-200 status drains the body and surfaces it as
    /// [`ChatError::Api`]; the body is never parsed as an event stream.
    pub async fn stream(
        &self,
        messages: &[Message],
        model: &str,
        api_key: &str,
    ) -> Result<EventStream, ChatError> {
        let request = Self::api_request(messages, model);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("OpenAiChatClient: API returned {status}: {body}");
            return Err(ChatError::api(Provider::OpenAi, status.as_u16(), body));
        }

        Ok(Self::events(response_lines(response)))
    }

    fn api_request<'a>(messages: &'a [Message], model: &'a str) -> ApiRequest<'a> {
        let messages = messages
            .iter()
            .map(|message| {
                let role = match message.role() {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                };
                let content = message
                    .parts()
                    .iter()
                    .map(|part| match part {
                        ContentPart::Text(text) => ApiContentPart::Text { text },
                        ContentPart::Image { data, mime_type } => ApiContentPart::ImageUrl {
                            image_url: ImageUrl {
                                url: format!("data:{mime_type};base64,{}", BASE64.encode(data)),
                                detail: "low",
                            },
                        },
                    })
                    .collect();
                ApiMessage { role, content }
            })
            .collect();

        ApiRequest {
            model,
            messages,
            stream: true,
            max_completion_tokens: MAX_COMPLETION_TOKENS,
        }
    }

    /// Classify one response line.
    ///
    /// Only `data: `-prefixed lines carry payloads; `[DONE]` ends the
    /// stream, a chunk with `choices[0].delta.content` yields that text, and
    /// everything else (pings, empty deltas, malformed JSON) is ignored so a
    /// single bad frame never aborts the stream.
    fn parse_stream_line(line: &str) -> StreamEvent {
        let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
            return StreamEvent::Ignore;
        };
        if payload == DONE_MARKER {
            return StreamEvent::Done;
        }
        match serde_json::from_str::<StreamChunk>(payload) {
            Ok(chunk) => chunk
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.delta.content)
                .map(StreamEvent::Content)
                .unwrap_or(StreamEvent::Ignore),
            Err(_) => StreamEvent::Ignore,
        }
    }

    fn events<R>(lines: Lines<R>) -> EventStream
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Box::pin(stream::try_unfold(
            (lines, false),
            |(mut lines, finished)| async move {
                if finished {
                    return Ok(None);
                }
                loop {
                    let line = match lines.next_line().await {
                        Ok(Some(line)) => line,
                        Ok(None) => return Ok(None),
                        Err(e) => return Err(ChatError::from(e)),
                    };
                    match Self::parse_stream_line(trim_line(&line)) {
                        StreamEvent::Ignore => continue,
                        StreamEvent::Done => {
                            return Ok(Some((StreamEvent::Done, (lines, true))));
                        }
                        event => return Ok(Some((event, (lines, false)))),
                    }
                }
            },
        ))
    }
}

impl Default for OpenAiChatClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use tokio::io::AsyncBufReadExt;

    use super::*;

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::system("System prompt"),
            Message::user(vec![
                ContentPart::image(vec![0x01, 0x02, 0x03], "image/png").unwrap(),
                ContentPart::text("Question"),
            ]),
        ]
    }

    #[test]
    fn request_contains_all_messages_and_stream_flag() {
        let messages = sample_messages();
        let request = OpenAiChatClient::api_request(&messages, "gpt-5-nano-2025-08-07");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-5-nano-2025-08-07");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_completion_tokens"], 4096);
        assert_eq!(json["messages"].as_array().unwrap().len(), messages.len());
    }

    #[test]
    fn request_encodes_image_as_data_url() {
        let messages = sample_messages();
        let request = OpenAiChatClient::api_request(&messages, "gpt-5-nano-2025-08-07");
        let json = serde_json::to_value(&request).unwrap();

        let user = &json["messages"][1];
        assert_eq!(user["role"], "user");

        let content = user["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "image_url");
        let url = content[0]["image_url"]["url"].as_str().unwrap();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(content[0]["image_url"]["detail"], "low");
        assert_eq!(content[1]["type"], "text");
        assert_eq!(content[1]["text"], "Question");
    }

    #[test]
    fn system_role_is_inlined() {
        let messages = sample_messages();
        let request = OpenAiChatClient::api_request(&messages, "m");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert!(json.get("system").is_none());
    }

    #[test]
    fn parse_stream_line_extracts_content() {
        let line = r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#;
        assert_eq!(
            OpenAiChatClient::parse_stream_line(line),
            StreamEvent::content("Hello")
        );
    }

    #[test]
    fn parse_stream_line_detects_done() {
        assert_eq!(
            OpenAiChatClient::parse_stream_line("data: [DONE]"),
            StreamEvent::Done
        );
    }

    #[test]
    fn parse_stream_line_ignores_bad_frames() {
        assert_eq!(
            OpenAiChatClient::parse_stream_line("event: ping"),
            StreamEvent::Ignore
        );
        assert_eq!(
            OpenAiChatClient::parse_stream_line(r#"data: {"choices":[]}"#),
            StreamEvent::Ignore
        );
        assert_eq!(
            OpenAiChatClient::parse_stream_line("data: not-json"),
            StreamEvent::Ignore
        );
        assert_eq!(OpenAiChatClient::parse_stream_line(""), StreamEvent::Ignore);
    }

    #[tokio::test]
    async fn events_assemble_answer_in_order() {
        const BODY: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"Hello\"}}]}\n\
\n\
data: {\"choices\":[{\"delta\":{\"content\":\" world\"}}]}\n\
\n\
data: [DONE]\n";

        let lines = tokio::io::BufReader::new(BODY).lines();
        let events: Vec<_> = OpenAiChatClient::events(lines)
            .map(|event| event.unwrap())
            .collect()
            .await;

        let answer: String = events
            .iter()
            .filter_map(|event| match event {
                StreamEvent::Content(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(answer, "Hello world");
        assert_eq!(events.last(), Some(&StreamEvent::Done));
    }

    #[tokio::test]
    async fn events_end_on_eof_without_done() {
        const BODY: &[u8] = b"data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n";

        let lines = tokio::io::BufReader::new(BODY).lines();
        let events: Vec<_> = OpenAiChatClient::events(lines)
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(events, vec![StreamEvent::content("partial")]);
    }

    #[tokio::test]
    async fn events_stop_after_done() {
        const BODY: &[u8] = b"data: [DONE]\n\
data: {\"choices\":[{\"delta\":{\"content\":\"late\"}}]}\n";

        let lines = tokio::io::BufReader::new(BODY).lines();
        let events: Vec<_> = OpenAiChatClient::events(lines)
            .map(|event| event.unwrap())
            .collect()
            .await;

        assert_eq!(events, vec![StreamEvent::Done]);
    }
}
