use std::time::Duration;

use futures_util::TryStreamExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;

/// HTTP client tuned for streaming responses: bound the connect phase, never
/// the overall request (an answer may stream for minutes).
pub(crate) fn streaming_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_default()
}

/// Turn a streaming response body into an incremental line reader.
///
/// Bytes are consumed chunk by chunk as they arrive; the body is never
/// buffered whole. Dropping the reader drops the response and closes the
/// connection.
pub(crate) fn response_lines(
    response: reqwest::Response,
) -> Lines<impl AsyncBufRead + Send + Unpin + 'static> {
    let body = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
    StreamReader::new(body).lines()
}

/// Strip an optional trailing carriage return; SSE lines may be
/// CRLF-terminated.
pub(crate) fn trim_line(line: &str) -> &str {
    line.trim_end_matches('\r')
}
