use clap::{Args, Subcommand};
use guardian_core::error::{GuardianError, ToolExecutionError};
use serde_json::{Map, Value, json};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use futures::future::{FutureExt, LocalBoxFuture, join_all};
use futures::stream::{FuturesUnordered, StreamExt};
use tracing::Instrument;
use uuid::Uuid;

pub mod client;
pub mod tools;
mod util;

#[cfg(test)]
mod test_support;

use client::{ClientConfig, GuardianClient};
use tools::ToolDispatcher;
use util::to_pretty_json;

const MCP_PROTOCOL_VERSION: &str = "2024-11-05";
const MCP_SERVER_NAME: &str = "guardian-intel-mcp";

#[derive(Subcommand, Clone, Debug)]
pub enum McpCommands {
    /// Run the Guardian Intel MCP server over stdio
    Serve(McpServeArgs),
    /// Probe the Guardian Intel API and print a readiness report
    Diagnose(McpDiagnoseArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct McpServeArgs {
    /// Skip the startup health probe
    #[arg(long)]
    pub skip_health_check: bool,
}

#[derive(Args, Clone, Debug, Default)]
pub struct McpDiagnoseArgs {
    /// Also run a full lookup for this address to verify the API key end to end
    #[arg(long)]
    pub probe_ip: Option<String>,
}

/// Connection settings resolved by the entry point (flags, env, .env).
#[derive(Clone, Debug)]
pub struct ConnectionSettings {
    pub api_url: String,
    pub api_key: Option<String>,
    pub auth_header: String,
}

impl ConnectionSettings {
    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.api_key.clone().unwrap_or_default())
            .with_base_url(self.api_url.clone())
            .with_auth_header(self.auth_header.clone())
    }
}

pub async fn run(settings: ConnectionSettings, command: McpCommands) -> i32 {
    let client = match GuardianClient::new(settings.client_config()) {
        Ok(client) => client,
        Err(err) => {
            let payload = json!({
                "error": err.code(),
                "message": err.to_string(),
                "docs_hint": "Set GUARDIAN_INTEL_API_KEY or pass --api-key.",
            });
            eprintln!("{}", to_pretty_json(&payload));
            return 1;
        }
    };

    match command {
        McpCommands::Serve(args) => {
            let server = McpServer::new(ToolDispatcher::new(client));
            if !args.skip_health_check {
                server.log_startup_health().await;
            }
            let result = server.serve_stdio().await;
            match result {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err,
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::Diagnose(args) => {
            let report = run_diagnostics(&client, &args).await;
            println!("{}", to_pretty_json(&report));
            client.close();
            if report.get("status").and_then(Value::as_str) == Some("ready") {
                0
            } else {
                2
            }
        }
    }
}

async fn run_diagnostics(client: &GuardianClient, args: &McpDiagnoseArgs) -> Value {
    let reachable = client.health_check().await;
    let mut report = json!({
        "status": if reachable { "ready" } else { "unreachable" },
        "server": MCP_SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "api_url": client.base_url(),
        "checked_at": chrono::Utc::now().to_rfc3339(),
        "tools": tools::tool_definitions().iter().map(|tool| tool.name).collect::<Vec<_>>(),
    });

    if let Some(ip) = &args.probe_ip {
        let probe = match client.lookup_ip(ip).await {
            Ok(result) => json!({
                "ok": true,
                "ip": result.ip,
                "classification": result.classification.as_str(),
            }),
            Err(err) => json!({
                "ok": false,
                "error": err.code(),
                "message": err.to_string(),
            }),
        };
        if probe["ok"] == false && reachable {
            report["status"] = json!("degraded");
        }
        report["probe"] = probe;
    }
    report
}

/// How a message arrived, so the reply can be written back the same way.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Framing {
    ContentLength,
    Line,
}

#[derive(Debug)]
struct Incoming {
    framing: Framing,
    payload: Result<Value, String>,
}

struct McpServer {
    dispatcher: ToolDispatcher,
    session_id: String,
}

impl McpServer {
    fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            dispatcher,
            session_id: format!("stdio-{}", Uuid::now_v7()),
        }
    }

    async fn log_startup_health(&self) {
        let base_url = self.dispatcher.client().base_url();
        if self.dispatcher.client().health_check().await {
            tracing::info!(%base_url, "Guardian Intel API reachable");
        } else {
            tracing::warn!(%base_url, "Guardian Intel API health check failed; serving anyway");
        }
    }

    async fn serve_stdio(self) -> Result<(), String> {
        let reader = BufReader::new(io::stdin());
        let writer = io::stdout();
        let span = tracing::info_span!("mcp_session", session_id = %self.session_id);
        let result = self.serve(reader, writer).instrument(span).await;
        self.dispatcher.shutdown();
        result
    }

    /// Requests are answered as they complete, so a stalled upstream call never
    /// holds back replies to messages read after it.
    async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), String>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!(
            server = MCP_SERVER_NAME,
            version = env!("CARGO_PKG_VERSION"),
            "MCP server ready"
        );

        let mut pending_read = Box::pin(next_message(reader));
        let mut reading = true;
        let mut in_flight: FuturesUnordered<LocalBoxFuture<'_, (Framing, Vec<Value>)>> =
            FuturesUnordered::new();

        loop {
            tokio::select! {
                biased;
                Some((framing, responses)) = in_flight.next(), if !in_flight.is_empty() => {
                    for response in responses {
                        write_message(&mut writer, &response, framing)
                            .await
                            .map_err(|e| format!("Failed to write MCP response: {e}"))?;
                    }
                }
                (reader, incoming) = &mut pending_read, if reading => {
                    match incoming.map_err(|e| format!("Failed to read MCP message: {e}"))? {
                        Some(incoming) => {
                            in_flight.push(self.respond(incoming).boxed_local());
                            pending_read = Box::pin(next_message(reader));
                        }
                        None => reading = false,
                    }
                }
                else => break,
            }
        }

        tracing::info!("stdin closed, shutting down");
        Ok(())
    }

    async fn respond(&self, incoming: Incoming) -> (Framing, Vec<Value>) {
        let responses = match incoming.payload {
            Ok(message) => self.handle_incoming_message(message).await,
            Err(reason) => vec![reply(Value::Null, Err(RpcError::parse_error(reason)))],
        };
        (incoming.framing, responses)
    }

    async fn handle_incoming_message(&self, incoming: Value) -> Vec<Value> {
        if let Some(batch) = incoming.as_array() {
            if batch.is_empty() {
                return vec![reply(
                    Value::Null,
                    Err(RpcError::invalid_request("Batch request must not be empty")),
                )];
            }
            // Batch items run concurrently; one failure never affects its siblings.
            let handled = join_all(
                batch.iter().map(|item| self.handle_single_message(item.clone())),
            )
            .await;
            return handled.into_iter().flatten().collect();
        }

        self.handle_single_message(incoming).await.into_iter().collect()
    }

    /// Answers one JSON-RPC message. Notifications and stray responses yield `None`.
    async fn handle_single_message(&self, incoming: Value) -> Option<Value> {
        let Value::Object(message) = incoming else {
            return Some(reply(
                Value::Null,
                Err(RpcError::invalid_request("Request must be a JSON object")),
            ));
        };
        let id = message.get("id").cloned();

        if message.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
            return Some(reply(
                id.unwrap_or(Value::Null),
                Err(RpcError::invalid_request("jsonrpc must be '2.0'")),
            ));
        }

        let method = match message.get("method").and_then(Value::as_str) {
            Some(method) => method,
            None => {
                tracing::debug!(?id, "dropping message without a method");
                return None;
            }
        };
        let Some(id) = id else {
            // notifications/initialized and friends carry no id and get no reply.
            tracing::debug!(method, "notification received");
            return None;
        };

        let params = message.get("params").cloned().unwrap_or(Value::Null);
        Some(reply(id, self.handle_request(method, params).await))
    }

    async fn handle_request(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize_payload()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.tools_list_payload()),
            "tools/call" => self.handle_tools_call(params).await,
            "resources/list" => Ok(json!({ "resources": [] })),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            _ => Err(RpcError::method_not_found(method)),
        }
    }

    fn initialize_payload(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            },
            "instructions": "Use lookup for a single IP address, tags_list to browse threat tags, tag_details to explain one tag, and tag_ips to page through addresses carrying a tag. Pass the snapshot from a tag_ips result back unchanged to keep paging consistent."
        })
    }

    fn tools_list_payload(&self) -> Value {
        let tools: Vec<Value> = self
            .dispatcher
            .list_operations()
            .into_iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "inputSchema": tool.input_schema,
                })
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn handle_tools_call(&self, params: Value) -> Result<Value, RpcError> {
        let params = params
            .as_object()
            .ok_or_else(|| RpcError::invalid_params("tools/call params must be an object"))?;

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::invalid_params("tools/call requires string field 'name'"))?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(RpcError::invalid_params(
                    "tools/call 'arguments' must be an object",
                ));
            }
        };

        let output = self
            .dispatcher
            .dispatch(name, &args)
            .await
            .map_err(RpcError::from_tool_error)?;

        Ok(json!({
            "content": [{
                "type": "text",
                "text": to_pretty_json(&output)
            }],
            "structuredContent": output,
            "isError": false
        }))
    }
}

#[derive(Debug)]
struct RpcError {
    code: i64,
    message: String,
    data: Option<Value>,
}

impl RpcError {
    fn parse_error(message: impl Into<String>) -> Self {
        Self {
            code: -32700,
            message: message.into(),
            data: None,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            code: -32600,
            message: message.into(),
            data: None,
        }
    }

    fn method_not_found(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Method not found: {method}"),
            data: None,
        }
    }

    fn invalid_params(message: impl Into<String>) -> Self {
        Self {
            code: -32602,
            message: message.into(),
            data: None,
        }
    }

    /// Classify on the structured error kind; the message text is passed through untouched.
    fn from_tool_error(err: ToolExecutionError) -> Self {
        let code = match err.kind() {
            Some(GuardianError::InvalidInput(_)) => -32602,
            Some(GuardianError::UnknownOperation(_)) => -32601,
            _ => -32603,
        };
        Self {
            code,
            message: err.to_string(),
            data: serde_json::to_value(err.to_payload()).ok(),
        }
    }
}

/// Wrap a handler outcome in the JSON-RPC 2.0 reply envelope.
fn reply(id: Value, outcome: Result<Value, RpcError>) -> Value {
    match outcome {
        Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
        Err(err) => {
            let mut error = json!({ "code": err.code, "message": err.message });
            if let Some(data) = err.data {
                error["data"] = data;
            }
            json!({ "jsonrpc": "2.0", "id": id, "error": error })
        }
    }
}

async fn next_message<R>(mut reader: R) -> (R, Result<Option<Incoming>, std::io::Error>)
where
    R: AsyncBufRead + Unpin,
{
    let incoming = read_message(&mut reader).await;
    (reader, incoming)
}

/// A `Name: value` line that can open a `Content-Length` header block.
fn is_header_line(line: &str) -> bool {
    line.split_once(':').is_some_and(|(name, _)| {
        !name.is_empty() && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

/// Read one message, either `Content-Length` framed or a single JSON line.
///
/// Returns `Ok(None)` on a clean EOF between messages. Malformed JSON, and any
/// stray line that is not a header, is reported in `Incoming::payload` so the
/// caller can answer with a parse error.
async fn read_message<R>(reader: &mut R) -> Result<Option<Incoming>, std::io::Error>
where
    R: AsyncBufRead + Unpin,
{
    let mut content_length: Option<usize> = None;
    let mut in_headers = false;

    loop {
        let mut line = String::new();
        let bytes_read = reader.read_line(&mut line).await?;
        if bytes_read == 0 {
            if !in_headers {
                return Ok(None);
            }
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Unexpected EOF while reading MCP headers",
            ));
        }

        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            if in_headers {
                break;
            }
            continue;
        }

        // Outside a header block anything that is not a header is a JSON line,
        // so garbage gets a parse error instead of derailing the framing.
        if !in_headers && !is_header_line(line) {
            return Ok(Some(Incoming {
                framing: Framing::Line,
                payload: serde_json::from_str(line).map_err(|e| format!("Invalid JSON payload: {e}")),
            }));
        }

        in_headers = true;
        if line.to_ascii_lowercase().starts_with("content-length:") {
            let raw_len = line
                .split_once(':')
                .map(|(_, right)| right.trim())
                .unwrap_or_default();
            let parsed = raw_len.parse::<usize>().map_err(|_| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Invalid Content-Length header",
                )
            })?;
            content_length = Some(parsed);
        }
    }

    let content_length = content_length.ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            "Missing Content-Length header",
        )
    })?;
    let mut payload = vec![0_u8; content_length];
    reader.read_exact(&mut payload).await?;

    Ok(Some(Incoming {
        framing: Framing::ContentLength,
        payload: serde_json::from_slice(&payload).map_err(|e| format!("Invalid JSON payload: {e}")),
    }))
}

async fn write_message<W>(writer: &mut W, value: &Value, framing: Framing) -> Result<(), std::io::Error>
where
    W: AsyncWrite + Unpin,
{
    let body = serde_json::to_vec(value).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Failed to serialize JSON: {e}"),
        )
    })?;
    match framing {
        Framing::ContentLength => {
            let header = format!(
                "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
                body.len()
            );
            writer.write_all(header.as_bytes()).await?;
            writer.write_all(&body).await?;
        }
        Framing::Line => {
            writer.write_all(&body).await?;
            writer.write_all(b"\n").await?;
        }
    }
    writer.flush().await?;
    Ok(())
}
