use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, Lines};
use tracing::warn;

use crate::application::EventStream;
use crate::connector::adapter::sse::{response_lines, streaming_http_client, trim_line};
use crate::domain::{ChatError, ContentPart, Message, Provider, Role, StreamEvent};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const MESSAGES_PATH: &str = "/v1/messages";
const ANTHROPIC_API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;

const EVENT_PREFIX: &str = "event:";
const DATA_PREFIX: &str = "data:";
const DONE_MARKER: &str = "[DONE]";

const CONTENT_BLOCK_DELTA: &str = "content_block_delta";
const MESSAGE_STOP: &str = "message_stop";

/// Messages API request payload.
#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: Vec<ApiContentBlock<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ApiContentBlock<'a> {
    Text { text: &'a str },
    Image { source: ImageSource<'a> },
}

#[derive(Serialize)]
struct ImageSource<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    media_type: &'a str,
    data: String,
}

/// Minimal subset of a `content_block_delta` event we care about.
#[derive(Deserialize)]
struct ContentBlockDelta {
    delta: BlockDelta,
}

#[derive(Deserialize)]
struct BlockDelta {
    text: Option<String>,
}

/// Streaming client for the Anthropic Messages API.
///
/// System messages are hoisted out of the message list into the top-level
/// `system` field; the response is SSE with explicit `event:` types, parsed
/// incrementally. Override the base URL to target any compatible server.
pub struct AnthropicChatClient {
    client: reqwest::Client,
    url: String,
}

impl AnthropicChatClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base: String = base_url.into();
        let url = format!("{}{}", base.trim_end_matches('/'), MESSAGES_PATH);
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
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!("AnthropicChatClient: API returned {status}: {body}");
            return Err(ChatError::api(Provider::Anthropic, status.as_u16(), body));
        }

        Ok(Self::events(response_lines(response)))
    }

    fn api_request<'a>(messages: &'a [Message], model: &'a str) -> ApiRequest<'a> {
        let mut system_parts: Vec<String> = Vec::new();
        let mut api_messages = Vec::new();

        for message in messages {
            if message.role() == Role::System {
                system_parts.push(message.text_content());
                continue;
            }

            let role = match message.role() {
                Role::User => "user",
                _ => "assistant",
            };
            let content = message
                .parts()
                .iter()
                .map(|part| match part {
                    ContentPart::Text(text) => ApiContentBlock::Text { text },
                    ContentPart::Image { data, mime_type } => ApiContentBlock::Image {
                        source: ImageSource {
                            kind: "base64",
                            media_type: mime_type,
                            data: BASE64.encode(data),
                        },
                    },
                })
                .collect();
            api_messages.push(ApiMessage { role, content });
        }

        let system = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n"))
        };

        ApiRequest {
            model,
            max_tokens: MAX_TOKENS,
            system,
            messages: api_messages,
            stream: true,
        }
    }

    /// Classify one response line against the current SSE event type.
    ///
    /// `event:` lines update the type, blank lines end the event block and
    /// clear it. A `data:` payload is only read as content inside a
    /// `content_block_delta` block; `[DONE]` and `message_stop` end the
    /// stream; every other frame is ignored.
    fn parse_stream_line(event_type: &mut String, line: &str) -> StreamEvent {
        if let Some(rest) = line.strip_prefix(EVENT_PREFIX) {
            *event_type = rest.trim().to_string();
            return StreamEvent::Ignore;
        }
        if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
            let payload = rest.trim();
            if payload == DONE_MARKER {
                return StreamEvent::Done;
            }
            return match event_type.as_str() {
                CONTENT_BLOCK_DELTA => serde_json::from_str::<ContentBlockDelta>(payload)
                    .ok()
                    .and_then(|event| event.delta.text)
                    .map(StreamEvent::Content)
                    .unwrap_or(StreamEvent::Ignore),
                MESSAGE_STOP => StreamEvent::Done,
                _ => StreamEvent::Ignore,
            };
        }
        if line.is_empty() {
            event_type.clear();
        }
        StreamEvent::Ignore
    }

    fn events<R>(lines: Lines<R>) -> EventStream
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        Box::pin(stream::try_unfold(
            (lines, String::new(), false),
            |(mut lines, mut event_type, finished)| async move {
                if finished {
                    return Ok(None);
                }
                loop {
                    let line = match lines.next_line().await {
                        Ok(Some(line)) => line,
                        Ok(None) => return Ok(None),
                        Err(e) => return Err(ChatError::from(e)),
                    };
                    match Self::parse_stream_line(&mut event_type, trim_line(&line)) {
                        StreamEvent::Ignore => continue,
                        StreamEvent::Done => {
                            return Ok(Some((StreamEvent::Done, (lines, event_type, true))));
                        }
                        event => return Ok(Some((event, (lines, event_type, false)))),
                    }
                }
            },
        ))
    }
}

impl Default for AnthropicChatClient {
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
            Message::system("Be brief"),
            Message::user(vec![
                ContentPart::image(vec![0x01, 0x02], "image/png").unwrap(),
                ContentPart::text("Question"),
            ]),
            Message::assistant("Earlier answer"),
        ]
    }

    #[test]
    fn request_hoists_system_out_of_messages() {
        let messages = sample_messages();
        let request = AnthropicChatClient::api_request(&messages, "claude-sonnet-4-5");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["system"], "Be brief");
        assert_eq!(json["stream"], true);
        assert_eq!(json["max_tokens"], 4096);

        let wire_messages = json["messages"].as_array().unwrap();
        assert_eq!(wire_messages.len(), 2);
        assert_eq!(wire_messages[0]["role"], "user");
        assert_eq!(wire_messages[1]["role"], "assistant");
    }

    #[test]
    fn request_joins_multiple_system_messages() {
        let messages = vec![
            Message::system("First rule"),
            Message::system("Second rule"),
            Message::user(vec![ContentPart::text("Hi")]),
        ];
        let request = AnthropicChatClient::api_request(&messages, "m");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["system"], "First rule\nSecond rule");
    }

    #[test]
    fn request_omits_system_when_absent() {
        let messages = vec![Message::user(vec![ContentPart::text("Hi")])];
        let request = AnthropicChatClient::api_request(&messages, "m");
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("system").is_none());
    }

    #[test]
    fn request_encodes_image_as_base64_source() {
        let messages = sample_messages();
        let request = AnthropicChatClient::api_request(&messages, "m");
        let json = serde_json::to_value(&request).unwrap();

        let content = json["messages"][0]["content"].as_array().unwrap();
        assert_eq!(content[0]["type"], "image");
        assert_eq!(content[0]["source"]["type"], "base64");
        assert_eq!(content[0]["source"]["media_type"], "image/png");
        assert_eq!(content[0]["source"]["data"], BASE64.encode([0x01, 0x02]));
        assert_eq!(content[1]["type"], "text");
    }

    #[test]
    fn data_line_requires_content_block_delta_event() {
        let mut event_type = String::new();
        let payload = r#"data: {"delta":{"text":"Hello"}}"#;

        // Without the event type the payload yields nothing.
        assert_eq!(
            AnthropicChatClient::parse_stream_line(&mut event_type, payload),
            StreamEvent::Ignore
        );

        AnthropicChatClient::parse_stream_line(&mut event_type, "event: content_block_delta");
        assert_eq!(
            AnthropicChatClient::parse_stream_line(&mut event_type, payload),
            StreamEvent::content("Hello")
        );
    }

    #[test]
    fn blank_line_clears_event_type() {
        let mut event_type = String::new();
        AnthropicChatClient::parse_stream_line(&mut event_type, "event: content_block_delta");
        AnthropicChatClient::parse_stream_line(&mut event_type, "");

        assert_eq!(
            AnthropicChatClient::parse_stream_line(
                &mut event_type,
                r#"data: {"delta":{"text":"Hello"}}"#
            ),
            StreamEvent::Ignore
        );
    }

    #[test]
    fn done_marker_and_message_stop_terminate() {
        let mut event_type = String::new();
        assert_eq!(
            AnthropicChatClient::parse_stream_line(&mut event_type, "data: [DONE]"),
            StreamEvent::Done
        );

        AnthropicChatClient::parse_stream_line(&mut event_type, "event: message_stop");
        assert_eq!(
            AnthropicChatClient::parse_stream_line(&mut event_type, "data: {}"),
            StreamEvent::Done
        );
    }

    #[test]
    fn malformed_delta_payload_is_ignored() {
        let mut event_type = "content_block_delta".to_string();
        assert_eq!(
            AnthropicChatClient::parse_stream_line(&mut event_type, "data: not-json"),
            StreamEvent::Ignore
        );
        assert_eq!(
            AnthropicChatClient::parse_stream_line(&mut event_type, r#"data: {"delta":{}}"#),
            StreamEvent::Ignore
        );
    }

    #[tokio::test]
    async fn events_assemble_answer_across_event_blocks() {
        const BODY: &[u8] = b"event: message_start\n\
data: {\"type\":\"message_start\"}\n\
\n\
event: content_block_delta\n\
data: {\"delta\":{\"text\":\"Hello\"}}\n\
\n\
event: content_block_delta\n\
data: {\"delta\":{\"text\":\" world\"}}\n\
\n\
event: message_stop\n\
data: {}\n";

        let lines = tokio::io::BufReader::new(BODY).lines();
        let events: Vec<_> = AnthropicChatClient::events(lines)
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
}
