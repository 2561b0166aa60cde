//! Tool-protocol Server
//!
//! Reads requests line by line and answers on a single writer task. Each
//! `tools/call` runs on its own task, so a long `speak` does not hold up
//! `list_voices` or `ping`.

use super::messages::*;
use crate::error::{VoiceError, VoiceResult};
use crate::tools::VoiceTools;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Requests larger than this are rejected unparsed.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

pub const INSTRUCTIONS: &str = "Local text-to-speech. Use `speak` to read a response aloud, \
`list_voices` to see the available voices and `set_default_voice` to change the voice \
used when `speak` is called without one.";

type Responder = mpsc::UnboundedSender<JsonRpcResponse>;

/// One newline-delimited unit of input
#[derive(Debug, PartialEq)]
enum Frame {
    Line(Vec<u8>),
    /// A line over the size limit; its bytes were discarded unread.
    Oversized(usize),
    Eof,
}

/// Server for the stdio tool protocol
pub struct McpServer {
    tools: Arc<VoiceTools>,
    info: ServerInfo,
}

impl McpServer {
    pub fn new(tools: Arc<VoiceTools>) -> Self {
        Self {
            tools,
            info: ServerInfo {
                name: "voice-tts".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        }
    }

    /// Serve on the process stdin/stdout until stdin closes.
    pub async fn serve_stdio(self) -> VoiceResult<()> {
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Serve until `reader` reaches EOF, then wait for in-flight calls.
    pub async fn serve<R, W>(self, reader: R, writer: W) -> VoiceResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        info!("🔌 Tool server listening on stdio");

        let mut reader = reader;
        loop {
            let bytes = match next_frame(&mut reader).await? {
                Frame::Eof => break,
                Frame::Line(bytes) => bytes,
                Frame::Oversized(len) => {
                    // DoS Protection: Message size limit
                    warn!("⚠️ Rejecting {} byte message", len);
                    respond(
                        &tx,
                        JsonRpcResponse::failure(
                            Value::Null,
                            error_codes::INVALID_REQUEST,
                            format!("Message exceeds {} bytes", MAX_MESSAGE_BYTES),
                        ),
                    );
                    continue;
                }
            };

            let line = match std::str::from_utf8(&bytes) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!("⚠️ Message is not UTF-8: {}", e);
                    respond(
                        &tx,
                        JsonRpcResponse::failure(
                            Value::Null,
                            error_codes::PARSE_ERROR,
                            format!("Message is not valid UTF-8: {}", e),
                        ),
                    );
                    continue;
                }
            };
            if line.is_empty() {
                continue;
            }

            match parse_request(line) {
                Ok(request) => self.dispatch(request, &tx),
                Err(response) => respond(&tx, response),
            }
        }

        info!("🔌 Input closed, finishing in-flight calls");
        drop(tx);
        writer_task.await??;
        Ok(())
    }

    fn dispatch(&self, request: JsonRpcRequest, tx: &Responder) {
        debug!("📨 Request: {}", request.method);

        let Some(id) = request.id else {
            debug!("Notification {} acknowledged", request.method);
            return;
        };

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => {
                JsonRpcResponse::success(id, json!({ "tools": VoiceTools::definitions() }))
            }
            "tools/call" => {
                let params = request
                    .params
                    .ok_or_else(|| "missing params".to_string())
                    .and_then(|p| {
                        serde_json::from_value::<CallToolParams>(p).map_err(|e| e.to_string())
                    });
                match params {
                    Ok(params) => {
                        let tools = self.tools.clone();
                        let tx = tx.clone();
                        tokio::spawn(async move {
                            let response = call_tool(&tools, id, params).await;
                            respond(&tx, response);
                        });
                        return;
                    }
                    Err(e) => JsonRpcResponse::failure(id, error_codes::INVALID_PARAMS, e),
                }
            }
            other => JsonRpcResponse::failure(
                id,
                error_codes::METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        };
        respond(tx, response);
    }

    fn initialize(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let requested = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(|v| v.as_str())
            .unwrap_or(PROTOCOL_VERSION);
        let agreed = if SUPPORTED_PROTOCOL_VERSIONS.contains(&requested) {
            requested
        } else {
            warn!(
                "⚠️ Client asked for protocol {}, offering {}",
                requested, PROTOCOL_VERSION
            );
            PROTOCOL_VERSION
        };
        info!("🤝 Client initialized (protocol {})", agreed);

        let result = InitializeResult {
            protocol_version: agreed.to_string(),
            capabilities: json!({ "tools": { "listChanged": false } }),
            server_info: self.info.clone(),
            instructions: INSTRUCTIONS.to_string(),
        };
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::failure(id, error_codes::INVALID_REQUEST, e.to_string()),
        }
    }
}

/// Read up to the next newline without buffering more than
/// `MAX_MESSAGE_BYTES` of it.
async fn next_frame<R>(reader: &mut R) -> std::io::Result<Frame>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let limit = MAX_MESSAGE_BYTES as u64 + 1;
    let read = (&mut *reader).take(limit).read_until(b'\n', &mut buf).await?;
    if read == 0 {
        return Ok(Frame::Eof);
    }
    if buf.last() == Some(&b'\n') || buf.len() <= MAX_MESSAGE_BYTES {
        return Ok(Frame::Line(buf));
    }

    // Over the limit: skip the rest of the line
    let mut skipped = buf.len();
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            break;
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(end) => {
                reader.consume(end + 1);
                skipped += end + 1;
                break;
            }
            None => {
                let len = available.len();
                reader.consume(len);
                skipped += len;
            }
        }
    }
    Ok(Frame::Oversized(skipped))
}

fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!("⚠️ Unparseable message: {}", e);
        JsonRpcResponse::failure(Value::Null, error_codes::PARSE_ERROR, e.to_string())
    })?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        warn!("⚠️ Invalid request: {}", e);
        JsonRpcResponse::failure(id, error_codes::INVALID_REQUEST, e.to_string())
    })
}

async fn call_tool(tools: &VoiceTools, id: Value, params: CallToolParams) -> JsonRpcResponse {
    let result = match tools.call(&params.name, params.arguments).await {
        Ok(text) => CallToolResult::text(text),
        Err(e @ (VoiceError::UnknownTool(_) | VoiceError::InvalidArguments(_))) => {
            return JsonRpcResponse::failure(id, error_codes::INVALID_PARAMS, e.to_string());
        }
        Err(e) => {
            error!("❌ Tool {} failed: {}", params.name, e);
            CallToolResult::error(e.to_string())
        }
    };
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::failure(id, error_codes::INVALID_REQUEST, e.to_string()),
    }
}

fn respond(tx: &Responder, response: JsonRpcResponse) {
    if tx.send(response).is_err() {
        warn!("Response writer gone, dropping response");
    }
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> VoiceResult<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let response_json = serde_json::to_string(&response)? + "\n";
        writer.write_all(response_json.as_bytes()).await?;
        writer.flush().await?;
    }
    Ok(())
}
