use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use lsp_types::{
    notification::{Exit, Initialized, Notification, PublishDiagnostics},
    request::{Initialize, Request, Shutdown},
    ClientCapabilities, InitializeParams, InitializeResult, InitializedParams,
    PublishDiagnosticsParams, ServerCapabilities, Uri, WorkspaceFolder,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{oneshot, Mutex, Notify};
use tokio::task::JoinHandle;

/// A JSON-RPC message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Response(JsonRpcResponse),
    Notification(JsonRpcNotification),
}

/// A JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Servers may use string ids for their own requests
    pub id: Value,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// A JSON-RPC notification (no response expected)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// A JSON-RPC error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Write one Content-Length framed message
pub async fn write_message<W, T>(writer: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
    T: Serialize,
{
    let json = serde_json::to_string(message).context("Serialization error")?;
    let content = format!("Content-Length: {}\r\n\r\n{}", json.len(), json);

    writer
        .write_all(content.as_bytes())
        .await
        .context("Failed to write message")?;
    writer.flush().await.context("Failed to flush message")?;

    tracing::trace!("Sent LSP message: {}", json);
    Ok(())
}

/// Read one Content-Length framed message; `None` at end of stream
pub async fn read_message<R>(reader: &mut R) -> anyhow::Result<Option<JsonRpcMessage>>
where
    R: AsyncBufRead + Unpin + ?Sized,
{
    let mut content_length: Option<usize> = None;

    loop {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .context("Failed to read header")?;
        if read == 0 {
            return Ok(None);
        }

        if line == "\r\n" || line == "\n" {
            break;
        }

        if let Some(value) = line.strip_prefix("Content-Length: ") {
            content_length = Some(value.trim().parse().context("Invalid Content-Length")?);
        }
    }

    let content_length = content_length.ok_or_else(|| anyhow!("Missing Content-Length header"))?;

    let mut content = vec![0u8; content_length];
    reader
        .read_exact(&mut content)
        .await
        .context("Failed to read content")?;

    let json = String::from_utf8(content).context("Invalid UTF-8")?;
    tracing::trace!("Received LSP message: {}", json);

    let message = serde_json::from_str(&json).context("Failed to deserialize message")?;
    Ok(Some(message))
}

/// Diagnostics last published for one document
#[derive(Debug, Clone)]
pub struct PublishedDiagnostics {
    /// Document version the server analyzed, when it reports one
    pub version: Option<i32>,
    /// Publish sequence number (see [`LspClient::publish_seq`])
    pub seq: u64,
    pub diagnostics: Vec<lsp_types::Diagnostic>,
}

type Writer = Box<dyn AsyncWrite + Send + Unpin>;

/// State shared between the client handle and its reader task
struct Shared {
    writer: Mutex<Writer>,
    pending: Mutex<HashMap<i64, oneshot::Sender<JsonRpcResponse>>>,
    diagnostics: Mutex<HashMap<String, PublishedDiagnostics>>,
    publish_seq: AtomicU64,
    published: Notify,
}

impl Shared {
    async fn send<T: Serialize>(&self, message: &T) -> anyhow::Result<()> {
        let mut writer = self.writer.lock().await;
        write_message(&mut *writer, message).await
    }

    async fn dispatch(&self, message: JsonRpcMessage) {
        match message {
            JsonRpcMessage::Response(response) => {
                let Some(id) = response.id.as_i64() else {
                    tracing::warn!("Response with unexpected id {}", response.id);
                    return;
                };
                match self.pending.lock().await.remove(&id) {
                    Some(tx) => {
                        // The requester may have timed out and gone away
                        let _ = tx.send(response);
                    }
                    None => tracing::debug!("Response for unknown request {}", id),
                }
            }
            JsonRpcMessage::Notification(notification) => self.handle_notification(notification).await,
            JsonRpcMessage::Request(request) => {
                // Configuration and registration requests: accept without acting
                tracing::debug!("Answering server request {} with null", request.method);
                let response = JsonRpcResponse {
                    jsonrpc: "2.0".to_string(),
                    id: request.id,
                    result: Some(Value::Null),
                    error: None,
                };
                if let Err(e) = self.send(&response).await {
                    tracing::warn!("Failed to answer server request: {:#}", e);
                }
            }
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        match notification.method.as_str() {
            PublishDiagnostics::METHOD => {
                let Some(params) = notification.params else {
                    return;
                };
                let params: PublishDiagnosticsParams = match serde_json::from_value(params) {
                    Ok(params) => params,
                    Err(e) => {
                        tracing::warn!("Failed to deserialize diagnostics: {}", e);
                        return;
                    }
                };

                tracing::debug!(
                    "Received {} diagnostics for {} (version {:?})",
                    params.diagnostics.len(),
                    params.uri.as_str(),
                    params.version
                );

                let seq = self.publish_seq.fetch_add(1, Ordering::SeqCst) + 1;
                self.diagnostics.lock().await.insert(
                    params.uri.as_str().to_string(),
                    PublishedDiagnostics {
                        version: params.version,
                        seq,
                        diagnostics: params.diagnostics,
                    },
                );
                self.published.notify_waiters();
            }
            "window/showMessage" | "window/logMessage" => {
                let Some(msg) = notification.params.as_ref().and_then(Value::as_object) else {
                    return;
                };
                let message_type = msg.get("type").and_then(|v| v.as_i64()).unwrap_or(0);
                let message = msg
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("(no message)");

                match message_type {
                    1 => tracing::error!("LSP: {}", message),
                    2 => tracing::warn!("LSP: {}", message),
                    3 => tracing::info!("LSP: {}", message),
                    4 => tracing::debug!("LSP: {}", message),
                    _ => tracing::trace!("LSP: {}", message),
                }
            }
            _ => {
                tracing::debug!("Unhandled notification: {}", notification.method);
            }
        }
    }

    /// Fail every outstanding request once the server is gone
    async fn close(&self) {
        let pending: Vec<_> = self.pending.lock().await.drain().collect();
        for (id, tx) in pending {
            let _ = tx.send(JsonRpcResponse {
                jsonrpc: "2.0".to_string(),
                id: Value::from(id),
                result: None,
                error: Some(JsonRpcError {
                    code: -32099,
                    message: "Language server connection closed".to_string(),
                    data: None,
                }),
            });
        }
        self.published.notify_waiters();
    }
}

/// Asynchronous JSON-RPC client for a language server.
///
/// A reader task owns the incoming half of the transport and routes
/// responses to the waiting request, so requests may be issued from
/// several tasks at once.
pub struct LspClient {
    shared: Arc<Shared>,
    next_id: AtomicI64,
    request_timeout: Duration,
    reader_task: JoinHandle<()>,
    capabilities: Option<ServerCapabilities>,
    /// Server process, when the client spawned one
    process: Option<Child>,
}

impl std::fmt::Debug for LspClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LspClient")
            .field("request_timeout", &self.request_timeout)
            .field("initialized", &self.capabilities.is_some())
            .finish_non_exhaustive()
    }
}

impl LspClient {
    /// Client over an arbitrary transport (a child's pipes, an in-process duplex)
    pub fn from_transport<R, W>(reader: R, writer: W, request_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let shared = Arc::new(Shared {
            writer: Mutex::new(Box::new(writer)),
            pending: Mutex::new(HashMap::new()),
            diagnostics: Mutex::new(HashMap::new()),
            publish_seq: AtomicU64::new(0),
            published: Notify::new(),
        });

        let reader_shared = shared.clone();
        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            loop {
                match read_message(&mut reader).await {
                    Ok(Some(message)) => reader_shared.dispatch(message).await,
                    Ok(None) => {
                        tracing::info!("Language server closed its output");
                        break;
                    }
                    Err(e) => {
                        tracing::error!("Language server transport error: {:#}", e);
                        break;
                    }
                }
            }
            reader_shared.close().await;
        });

        Self {
            shared,
            next_id: AtomicI64::new(0),
            request_timeout,
            reader_task,
            capabilities: None,
            process: None,
        }
    }

    /// Spawn a language server process and connect to its stdio
    pub fn spawn(command: &str, args: &[String], request_timeout: Duration) -> anyhow::Result<Self> {
        tracing::info!("Spawning LSP server: {} {:?}", command, args);

        let mut process = Command::new(command)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", command))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to get stdin"))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to get stdout"))?;

        if let Some(stderr) = process.stderr.take() {
            let name = command.to_string();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("{} stderr: {}", name, line);
                }
            });
        }

        let mut client = Self::from_transport(stdout, stdin, request_timeout);
        client.process = Some(process);
        Ok(client)
    }

    /// Run the initialize handshake
    pub async fn initialize(
        &mut self,
        root_uri: Option<Uri>,
        initialization_options: Option<Value>,
    ) -> anyhow::Result<InitializeResult> {
        tracing::info!("Initializing LSP server with root_uri: {:?}", root_uri);

        let workspace_folders = root_uri.as_ref().map(|uri| {
            vec![WorkspaceFolder {
                uri: uri.clone(),
                name: uri
                    .path()
                    .as_str()
                    .split('/')
                    .next_back()
                    .unwrap_or("workspace")
                    .to_string(),
            }]
        });

        let params = InitializeParams {
            process_id: Some(std::process::id()),
            capabilities: ClientCapabilities::default(),
            workspace_folders,
            initialization_options,
            ..Default::default()
        };

        let result = self.request::<Initialize>(params).await?;
        self.capabilities = Some(result.capabilities.clone());

        self.notify::<Initialized>(InitializedParams {}).await?;

        tracing::info!("LSP server initialized successfully");
        Ok(result)
    }

    pub fn capabilities(&self) -> Option<&ServerCapabilities> {
        self.capabilities.as_ref()
    }

    /// Send a typed request and wait for its response
    pub async fn request<R>(&self, params: R::Params) -> anyhow::Result<R::Result>
    where
        R: Request,
        R::Params: Serialize,
        R::Result: DeserializeOwned,
    {
        let value = self.send_request(R::METHOD, serde_json::to_value(params)?).await?;
        serde_json::from_value(value)
            .with_context(|| format!("Failed to deserialize {} response", R::METHOD))
    }

    /// Send a typed notification
    pub async fn notify<N>(&self, params: N::Params) -> anyhow::Result<()>
    where
        N: Notification,
        N::Params: Serialize,
    {
        self.send_notification(N::METHOD, Some(serde_json::to_value(params)?))
            .await
    }

    async fn send_request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(id, tx);

        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Value::from(id),
            method: method.to_string(),
            params: Some(params),
        };
        if let Err(e) = self.shared.send(&request).await {
            self.shared.pending.lock().await.remove(&id);
            return Err(e);
        }

        let response = match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => bail!("{} dropped without a response", method),
            Err(_) => {
                self.shared.pending.lock().await.remove(&id);
                bail!("{} timed out after {:?}", method, self.request_timeout);
            }
        };

        if let Some(error) = response.error {
            bail!("LSP error: {} (code {})", error.message, error.code);
        }
        Ok(response.result.unwrap_or(Value::Null))
    }

    async fn send_notification(&self, method: &str, params: Option<Value>) -> anyhow::Result<()> {
        let notification = JsonRpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        };
        self.shared.send(&notification).await
    }

    /// Sequence number of the latest diagnostics publish
    pub fn publish_seq(&self) -> u64 {
        self.shared.publish_seq.load(Ordering::SeqCst)
    }

    /// Latest published diagnostics for a document
    pub async fn published_diagnostics(&self, uri: &Uri) -> Option<PublishedDiagnostics> {
        self.shared.diagnostics.lock().await.get(uri.as_str()).cloned()
    }

    /// Wait until the server publishes diagnostics for `version` of `uri`.
    ///
    /// Servers that omit the version are matched by publish order instead: any
    /// publish newer than `since_seq` counts. `None` on timeout.
    pub async fn wait_for_diagnostics(
        &self,
        uri: &Uri,
        version: i32,
        since_seq: u64,
        timeout: Duration,
    ) -> Option<Vec<lsp_types::Diagnostic>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.shared.published.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(published) = self.published_diagnostics(uri).await {
                let current = match published.version {
                    Some(v) => v >= version,
                    None => published.seq > since_seq,
                };
                if current {
                    return Some(published.diagnostics);
                }
            }

            if self.reader_task.is_finished() {
                return None;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                tracing::debug!("No diagnostics for {} v{} within {:?}", uri.as_str(), version, timeout);
                return None;
            }
        }
    }

    /// Shutdown the language server
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if self.capabilities.is_none() {
            return Ok(());
        }

        tracing::info!("Shutting down LSP server");
        self.request::<Shutdown>(()).await?;
        self.notify::<Exit>(()).await?;
        self.capabilities = None;

        if let Some(mut process) = self.process.take() {
            if tokio::time::timeout(Duration::from_secs(1), process.wait())
                .await
                .is_err()
            {
                let _ = process.kill().await;
            }
        }
        Ok(())
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
