//! JSON-lines bridge over stdin/stdout.
//!
//! The host runtime writes one request per line and reads exactly one
//! response line back, in order:
//!
//! ```text
//! -> {"id": 1, "call": "mouseMoveABS", "args": [100, 200]}
//! <- {"id": 1, "result": null}
//! -> {"id": 2, "call": "mouseMoveABS", "args": [100]}
//! <- {"id": 2, "error": {"kind": "TypeError", "message": "Wrong number of arguments"}}
//! ```

use anyhow::{Context, Result};
use hid_input::Hid;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::exports;

#[derive(Debug, Deserialize)]
struct Request {
    #[serde(default)]
    id: Value,
    call: String,
    #[serde(default)]
    args: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct Response {
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: &'static str,
    message: String,
}

impl Response {
    fn error(id: Value, kind: &'static str, message: String) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorBody { kind, message }),
        }
    }
}

/// Handle one raw request line. Blank lines produce no response.
///
/// Anything that is not a request object, including invalid UTF-8, is
/// answered with a `SyntaxError` carrying whatever `id` could be read.
fn handle_line(hid: &mut Hid, line: &[u8]) -> Option<Response> {
    if line.trim_ascii().is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_slice(line) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("Malformed request: {e}");
            return Some(Response::error(Value::Null, "SyntaxError", e.to_string()));
        }
    };
    let id = value.get("id").cloned().unwrap_or_default();
    let request: Request = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(%id, "Invalid request: {e}");
            return Some(Response::error(id, "SyntaxError", e.to_string()));
        }
    };

    tracing::trace!(call = %request.call, args = request.args.len(), "Request");

    Some(match exports::call(hid, &request.call, &request.args) {
        Ok(result) => Response {
            id: request.id,
            result: Some(result),
            error: None,
        },
        Err(e) => {
            tracing::debug!(call = %request.call, kind = e.kind(), "Call rejected: {e}");
            Response::error(request.id, e.kind(), e.to_string())
        }
    })
}

/// Serve requests from `reader` until EOF, writing responses to `writer`.
///
/// Returns the number of requests answered.
///
/// # Errors
///
/// Returns an error if reading or writing the streams fails.
pub async fn serve<R, W>(hid: &mut Hid, mut reader: R, mut writer: W) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = Vec::new();
    let mut answered = 0;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .await
            .context("failed to read request")?;
        if read == 0 {
            break;
        }
        let Some(response) = handle_line(hid, &line) else {
            continue;
        };
        let mut out = serde_json::to_vec(&response).context("failed to encode response")?;
        out.push(b'\n');
        writer
            .write_all(&out)
            .await
            .context("failed to write response")?;
        writer.flush().await.context("failed to flush response")?;
        answered += 1;
    }

    tracing::info!(answered, "Input stream closed");
    Ok(answered)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::exports::tests::recording_hid;

    async fn run(input: impl AsRef<[u8]>) -> (Vec<Value>, Vec<String>) {
        let (mut hid, log) = recording_hid();
        let mut output = Vec::new();
        serve(&mut hid, input.as_ref(), &mut output).await.unwrap();
        let responses = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let calls = log.lock().unwrap().clone();
        (responses, calls)
    }

    #[tokio::test]
    async fn answers_each_request_in_order() {
        let input = concat!(
            r#"{"id": 1, "call": "mouseMoveABS", "args": [100, 200]}"#,
            "\n",
            r#"{"id": "two", "call": "mouseGetCurrentPosition"}"#,
            "\n",
        );
        let (responses, calls) = run(input).await;
        assert_eq!(
            responses,
            vec![
                json!({ "id": 1, "result": null }),
                json!({ "id": "two", "result": { "x": 100.0, "y": 200.0 } }),
            ]
        );
        assert_eq!(calls, vec!["warp 100 200".to_string()]);
    }

    #[tokio::test]
    async fn argument_errors_become_type_errors() {
        let input = r#"{"id": 7, "call": "mouseMoveABS", "args": [100]}"#;
        let (responses, calls) = run(input).await;
        assert_eq!(
            responses,
            vec![json!({
                "id": 7,
                "error": { "kind": "TypeError", "message": "Wrong number of arguments" }
            })]
        );
        assert!(calls.is_empty());
    }

    #[tokio::test]
    async fn malformed_lines_are_syntax_errors_and_blank_lines_skipped() {
        let input = "\n   \nnot json\n{\"call\": \"keyDown\", \"args\": [\"a\"]}\n";
        let (responses, calls) = run(input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[0]["error"]["kind"], "SyntaxError");
        assert_eq!(responses[1], json!({ "id": null, "result": null }));
        assert_eq!(calls, vec!["key a true".to_string()]);
    }

    #[tokio::test]
    async fn unknown_calls_are_reference_errors() {
        let (responses, _) = run(r#"{"id": 1, "call": "exit"}"#).await;
        assert_eq!(responses[0]["error"]["kind"], "ReferenceError");
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_end_the_session() {
        let mut input = b"{\"id\": 1, \"call\": \"keyDown\", \"args\": [\"\xff\"]}\n".to_vec();
        input.extend_from_slice(br#"{"id": 2, "call": "keyDown", "args": ["a"]}"#);
        input.push(b'\n');

        let (responses, calls) = run(input).await;
        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["error"]["kind"], "SyntaxError");
        assert_eq!(responses[1], json!({ "id": 2, "result": null }));
        assert_eq!(calls, vec!["key a true".to_string()]);
    }

    #[tokio::test]
    async fn missing_call_keeps_the_request_id() {
        let (responses, calls) = run(r#"{"id": 5, "args": [1, 2]}"#).await;
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], json!(5));
        assert_eq!(responses[0]["error"]["kind"], "SyntaxError");
        assert!(calls.is_empty());
    }
}
