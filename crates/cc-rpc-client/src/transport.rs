//! Request transports shared by both chain clients.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{anyhow, bail, Context, Result};
use async_jsonrpc_client::{Output, Params, Transport, WsClient};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::UnixStream;
use tokio::sync::Mutex;

use crate::error::RpcRequestError;

/// Unwrap a JSON-RPC output into its result.
pub fn to_result<T: DeserializeOwned>(output: Output) -> Result<T> {
    match output {
        Output::Success(success) => {
            serde_json::from_value(success.result).context("parse rpc result")
        }
        Output::Failure(failure) => bail!("rpc error: {}", failure.error),
    }
}

/// Build named parameters from a JSON object literal.
pub fn named_params(value: Value) -> Option<Params> {
    match value {
        Value::Object(map) => Some(Params::Map(map)),
        Value::Null => None,
        _ => unreachable!("rpc parameters are objects"),
    }
}

/// One JSON-RPC request transport. Implementations must be safe to call
/// sequentially; the connector never issues concurrent requests on one
/// transport.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn request(&self, method: &str, params: Option<Params>) -> Result<Value>;
}

/// WS transport backed by `async-jsonrpc-client`.
pub struct WsTransport {
    client: WsClient,
    name: &'static str,
}

impl WsTransport {
    pub async fn connect(url: &str, name: &'static str) -> Result<Self> {
        let client = WsClient::new(url)
            .await
            .with_context(|| format!("connect {} at {}", name, url))?;
        Ok(WsTransport { client, name })
    }

    pub fn client(&self) -> &WsClient {
        &self.client
    }
}

#[async_trait]
impl RpcTransport for WsTransport {
    async fn request(&self, method: &str, params: Option<Params>) -> Result<Value> {
        let output = self
            .client
            .request(method, params)
            .await
            .map_err(|err| RpcRequestError::new(self.name, method, err))?;
        to_result(output)
    }
}

/// Newline-delimited JSON-RPC over a Unix socket.
///
/// The connection is opened lazily and re-opened after an I/O failure.
/// Requests are serialized through a mutex; responses arrive in order on
/// the socket, so the next line answers the request just written.
pub struct IpcTransport {
    path: PathBuf,
    stream: Mutex<Option<BufStream<UnixStream>>>,
    next_id: AtomicU64,
    name: &'static str,
}

impl IpcTransport {
    pub fn new<P: AsRef<Path>>(path: P, name: &'static str) -> Self {
        IpcTransport {
            path: path.as_ref().to_path_buf(),
            stream: Mutex::new(None),
            next_id: AtomicU64::new(1),
            name,
        }
    }

    async fn call(&self, method: &str, params: Option<Params>) -> Result<Output> {
        let mut guard = self.stream.lock().await;
        if guard.is_none() {
            let stream = UnixStream::connect(&self.path)
                .await
                .with_context(|| format!("connect ipc at {}", self.path.display()))?;
            *guard = Some(BufStream::new(stream));
        }
        let stream = guard.as_mut().expect("ipc stream connected");

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let result = async {
            let mut line = serde_json::to_vec(&request)?;
            line.push(b'\n');
            stream.write_all(&line).await?;
            stream.flush().await?;
            let mut response = String::new();
            let read = stream.read_line(&mut response).await?;
            if read == 0 {
                return Err(anyhow!("ipc connection closed"));
            }
            Ok(serde_json::from_str::<Output>(response.trim_end())?)
        }
        .await;
        if result.is_err() {
            // Drop the broken connection; the next call reconnects.
            *guard = None;
        }
        result
    }
}

#[async_trait]
impl RpcTransport for IpcTransport {
    async fn request(&self, method: &str, params: Option<Params>) -> Result<Value> {
        let output = self
            .call(method, params)
            .await
            .map_err(|err| RpcRequestError::new(self.name, method, err))?;
        to_result(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixListener;

    #[tokio::test]
    async fn ipc_round_trips_a_request() {
        let dir = std::env::temp_dir().join(format!("cc-ipc-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let socket = dir.join("node.sock");
        let _ = std::fs::remove_file(&socket);
        let listener = UnixListener::bind(&socket).unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read, mut write) = stream.into_split();
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            let request: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(request["method"], "system_getNodeInfo");
            let response = json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": { "chainId": "04000000" },
            });
            let mut bytes = serde_json::to_vec(&response).unwrap();
            bytes.push(b'\n');
            write.write_all(&bytes).await.unwrap();
        });

        let transport = IpcTransport::new(&socket, "receiving chain");
        let result = transport.request("system_getNodeInfo", None).await.unwrap();
        assert_eq!(result["chainId"], "04000000");
        server.await.unwrap();
        let _ = std::fs::remove_file(&socket);
    }

    #[test]
    fn named_params_accepts_objects_only() {
        assert!(named_params(json!({ "height": 3 })).is_some());
        assert!(named_params(Value::Null).is_none());
    }
}
