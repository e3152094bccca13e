use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use panel_core::contracts::InputMap;
use panel_core::contracts::RunFile;
use panel_core::contracts::RunSummary;
use panel_core::contracts::ToolRunResult;
use serde_json::Value;

use crate::error::BridgeError;

/// The RPC surface the panel drives. Every call is a suspension point; the
/// panel never issues two calls for the same task phase at once.
#[async_trait]
pub trait ToolBridge: Send + Sync {
    async fn fetch_tool_names(&self) -> Result<Vec<String>, BridgeError>;

    async fn run_tool(&self, name: &str, input: InputMap) -> Result<ToolRunResult, BridgeError>;

    async fn fetch_run_summaries(&self) -> Result<Vec<RunSummary>, BridgeError>;

    async fn fetch_run_files(&self, run_id: &str) -> Result<Vec<RunFile>, BridgeError>;

    async fn fetch_run_diagnostics(&self, run_id: &str) -> Result<Value, BridgeError>;

    /// Openable URL for a storage path, or `None` when it cannot be resolved.
    fn artifact_href(&self, path: &str) -> Option<String>;
}

/// Runs `call`, failing with [`BridgeError::Timeout`] once `deadline` passes.
/// Without a deadline the call may wait forever.
pub async fn with_deadline<T, F>(deadline: Option<Duration>, call: F) -> Result<T, BridgeError>
where
    F: Future<Output = Result<T, BridgeError>>,
{
    match deadline {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(BridgeError::Timeout(limit))),
        None => call.await,
    }
}
