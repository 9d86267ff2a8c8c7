//! JSON-RPC 2.0 data source
//!
//! Requests and responses are single-line JSON objects over any byte stream:
//!
//! ```text
//! -> {"jsonrpc":"2.0","id":1,"method":"data.find","params":{"object":"orders","query":{}}}
//! <- {"jsonrpc":"2.0","id":1,"result":[{"id":"o1"}]}
//! ```
//!
//! [`serve`] is the matching server side: it answers the same methods from
//! any [`DataSource`], so one process can expose its data to another.

use async_trait::async_trait;
use formwork_core::data_source::{DataSource, DataSourceError, DataSourceResult, Query, Record};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf,
};
use tokio::sync::Mutex;

pub const METHOD_FIND: &str = "data.find";
pub const METHOD_FIND_ONE: &str = "data.findOne";
pub const METHOD_CREATE: &str = "data.create";
pub const METHOD_UPDATE: &str = "data.update";
pub const METHOD_DELETE: &str = "data.delete";

// Standard JSON-RPC error codes
pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Data source error codes
pub const OBJECT_NOT_FOUND: i32 = -32004;
pub const RECORD_NOT_FOUND: i32 = -32005;

/// Object-safe byte stream, so any transport fits behind one client type
pub trait RpcStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RpcStream for T {}

type BoxedStream = Box<dyn RpcStream>;

#[derive(Debug, Serialize)]
struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcError>,
}

struct Connection {
    reader: BufReader<ReadHalf<BoxedStream>>,
    writer: WriteHalf<BoxedStream>,
    // Bytes of a line not yet terminated; survives a call cut off by timeout
    pending: Vec<u8>,
}

/// Client side of the `data.*` protocol
pub struct RpcDataSource {
    // One request in flight at a time; responses are matched by id
    conn: Mutex<Connection>,
    next_id: AtomicU64,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for RpcDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcDataSource")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl RpcDataSource {
    /// Wrap an established stream
    pub fn new<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let boxed: BoxedStream = Box::new(stream);
        let (read, write) = tokio::io::split(boxed);
        Self {
            conn: Mutex::new(Connection {
                reader: BufReader::new(read),
                writer: write,
                pending: Vec::new(),
            }),
            next_id: AtomicU64::new(1),
            timeout: None,
        }
    }

    /// Connect over TCP to `host:port`
    pub async fn connect(address: &str) -> DataSourceResult<Self> {
        let stream = tokio::net::TcpStream::connect(address)
            .await
            .map_err(|e| DataSourceError::transport(format!("connect {}: {}", address, e)))?;
        tracing::info!(%address, "connected to rpc data source");
        Ok(Self::new(stream))
    }

    /// Fail calls that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send one request and wait for its response
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, CallError> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.round_trip(method, params))
                .await
                .map_err(|_| {
                    CallError::Data(DataSourceError::Timeout {
                        duration_ms: timeout.as_millis() as u64,
                    })
                })?,
            None => self.round_trip(method, params).await,
        }
    }

    async fn round_trip(&self, method: &str, params: Value) -> Result<Value, CallError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut line = serde_json::to_string(&Request {
            jsonrpc: "2.0",
            id,
            method,
            params,
        })
        .map_err(DataSourceError::from)?;
        line.push('\n');

        let mut guard = self.conn.lock().await;
        let conn = &mut *guard;
        conn.writer
            .write_all(line.as_bytes())
            .await
            .map_err(io_error)?;
        conn.writer.flush().await.map_err(io_error)?;

        loop {
            // read_until keeps partial input in `pending` when cancelled
            conn.reader
                .read_until(b'\n', &mut conn.pending)
                .await
                .map_err(io_error)?;
            if conn.pending.last() != Some(&b'\n') {
                return Err(DataSourceError::transport("connection closed by peer").into());
            }
            let buf = std::mem::take(&mut conn.pending);
            if buf.iter().all(u8::is_ascii_whitespace) {
                continue;
            }

            let response: Response =
                serde_json::from_slice(&buf).map_err(DataSourceError::from)?;
            // Notifications and responses to abandoned calls are skipped
            if response.id.as_ref().and_then(Value::as_u64) != Some(id) {
                tracing::debug!(
                    expected = id,
                    got = ?response.id,
                    "skipping unrelated rpc message"
                );
                continue;
            }

            if let Some(error) = response.error {
                return Err(CallError::Rpc(error));
            }
            return Ok(response.result.unwrap_or(Value::Null));
        }
    }

    async fn data_call(
        &self,
        object: &str,
        id: Option<&str>,
        method: &str,
        params: Value,
    ) -> DataSourceResult<Value> {
        self.call(method, params).await.map_err(|err| match err {
            CallError::Data(err) => err,
            CallError::Rpc(rpc) => rpc_to_data_error(rpc, object, id),
        })
    }
}

/// Failure of a single call: either the exchange broke or the peer answered
/// with an error object
#[derive(Debug)]
pub enum CallError {
    Data(DataSourceError),
    Rpc(RpcError),
}

impl From<DataSourceError> for CallError {
    fn from(err: DataSourceError) -> Self {
        CallError::Data(err)
    }
}

fn io_error(err: std::io::Error) -> CallError {
    CallError::Data(DataSourceError::transport(err.to_string()))
}

fn rpc_to_data_error(error: RpcError, object: &str, id: Option<&str>) -> DataSourceError {
    match (error.code, id) {
        (OBJECT_NOT_FOUND, _) => DataSourceError::NotFound(object.to_string()),
        (RECORD_NOT_FOUND, Some(id)) => DataSourceError::record_not_found(object, id),
        (code, _) => DataSourceError::backend(format!("{} (code {})", error.message, code)),
    }
}

fn expect_record(value: Value, method: &str) -> DataSourceResult<Record> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(DataSourceError::invalid_data(format!(
            "{} returned {} instead of a record",
            method, other
        ))),
    }
}

#[async_trait]
impl DataSource for RpcDataSource {
    async fn find(&self, object: &str, query: &Query) -> DataSourceResult<Vec<Record>> {
        let result = self
            .data_call(object, None, METHOD_FIND, json!({"object": object, "query": query}))
            .await?;
        match result {
            Value::Array(items) => items
                .into_iter()
                .map(|item| expect_record(item, METHOD_FIND))
                .collect(),
            other => Err(DataSourceError::invalid_data(format!(
                "{} returned {} instead of an array",
                METHOD_FIND, other
            ))),
        }
    }

    async fn find_one(&self, object: &str, id: &str) -> DataSourceResult<Option<Record>> {
        let result = self
            .data_call(object, Some(id), METHOD_FIND_ONE, json!({"object": object, "id": id}))
            .await;
        match result {
            Ok(Value::Null) | Err(DataSourceError::RecordNotFound { .. }) => Ok(None),
            Ok(value) => expect_record(value, METHOD_FIND_ONE).map(Some),
            Err(err) => Err(err),
        }
    }

    async fn create(&self, object: &str, data: Record) -> DataSourceResult<Record> {
        let result = self
            .data_call(object, None, METHOD_CREATE, json!({"object": object, "data": data}))
            .await?;
        expect_record(result, METHOD_CREATE)
    }

    async fn update(&self, object: &str, id: &str, patch: Record) -> DataSourceResult<Record> {
        let result = self
            .data_call(
                object,
                Some(id),
                METHOD_UPDATE,
                json!({"object": object, "id": id, "patch": patch}),
            )
            .await?;
        expect_record(result, METHOD_UPDATE)
    }

    async fn delete(&self, object: &str, id: &str) -> DataSourceResult<bool> {
        let result = self
            .data_call(object, Some(id), METHOD_DELETE, json!({"object": object, "id": id}))
            .await;
        match result {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(DataSourceError::RecordNotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    fn name(&self) -> &str {
        "rpc"
    }
}

// ---------------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct IncomingRequest {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Serialize)]
struct OutgoingResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl OutgoingResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DataParams {
    object: String,
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    query: Query,
    #[serde(default)]
    data: Record,
    #[serde(default)]
    patch: Record,
}

impl DataParams {
    fn id(&self) -> Result<String, (i32, String)> {
        match &self.id {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(Value::Number(n)) => Ok(n.to_string()),
            _ => Err((INVALID_PARAMS, "missing 'id'".to_string())),
        }
    }
}

fn error_code(err: &DataSourceError) -> i32 {
    match err {
        DataSourceError::NotFound(_) => OBJECT_NOT_FOUND,
        DataSourceError::RecordNotFound { .. } => RECORD_NOT_FOUND,
        _ => INTERNAL_ERROR,
    }
}

async fn dispatch(
    source: &dyn DataSource,
    method: &str,
    params: Value,
) -> Result<Value, (i32, String)> {
    let params: DataParams =
        serde_json::from_value(params).map_err(|e| (INVALID_PARAMS, e.to_string()))?;
    let object = params.object.as_str();
    let data_err = |e: DataSourceError| (error_code(&e), e.to_string());

    match method {
        METHOD_FIND => {
            let records = source.find(object, &params.query).await.map_err(data_err)?;
            Ok(Value::Array(records.into_iter().map(Value::Object).collect()))
        }
        METHOD_FIND_ONE => {
            let record = source.find_one(object, &params.id()?).await.map_err(data_err)?;
            Ok(record.map(Value::Object).unwrap_or(Value::Null))
        }
        METHOD_CREATE => {
            let created = source.create(object, params.data.clone()).await.map_err(data_err)?;
            Ok(Value::Object(created))
        }
        METHOD_UPDATE => {
            let updated = source
                .update(object, &params.id()?, params.patch.clone())
                .await
                .map_err(data_err)?;
            Ok(Value::Object(updated))
        }
        METHOD_DELETE => {
            let deleted = source.delete(object, &params.id()?).await.map_err(data_err)?;
            Ok(Value::Bool(deleted))
        }
        other => Err((METHOD_NOT_FOUND, format!("unknown method '{}'", other))),
    }
}

/// Answer `data.*` requests on `stream` from `source` until the peer hangs up
pub async fn serve<S>(stream: S, source: Arc<dyn DataSource>) -> std::io::Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin,
{
    let (read, mut writer) = tokio::io::split(stream);
    let mut lines = BufReader::new(read).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = match serde_json::from_str::<IncomingRequest>(&line) {
            Err(e) => Some(OutgoingResponse::error(Value::Null, PARSE_ERROR, e.to_string())),
            Ok(request) => {
                let outcome = dispatch(source.as_ref(), &request.method, request.params).await;
                // Requests without an id are notifications and get no reply
                request.id.map(|id| match outcome {
                    Ok(result) => OutgoingResponse::success(id, result),
                    Err((code, message)) => OutgoingResponse::error(id, code, message),
                })
            }
        };

        if let Some(response) = response {
            let mut out = serde_json::to_string(&response)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
            out.push('\n');
            writer.write_all(out.as_bytes()).await?;
            writer.flush().await?;
        }
    }
    tracing::debug!("rpc peer disconnected");
    Ok(())
}
