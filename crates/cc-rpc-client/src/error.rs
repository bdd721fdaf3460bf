use thiserror::Error;

/// Transport-level failure of one RPC call.
#[derive(Error, Debug)]
#[error("{client} error, method: {method} error: {source}")]
pub struct RpcRequestError {
    pub client: &'static str,
    pub method: String,
    pub source: anyhow::Error,
}

impl RpcRequestError {
    pub fn new<E: Into<anyhow::Error>>(client: &'static str, method: &str, source: E) -> Self {
        RpcRequestError {
            client,
            method: method.to_string(),
            source: source.into(),
        }
    }
}
