use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;

use super::contracts::BridgeFailure;
use super::contracts::ToolRunResult;
use super::diff_model::DiffViewMode;
use super::diff_model::FoldKey;
use super::state::TaskId;
use super::tool_registry::ToolId;

#[derive(Debug, Clone)]
pub enum PanelAction {
    User(UserAction),
    Runtime(RuntimeAction),
}

#[derive(Debug, Clone)]
pub enum UserAction {
    LoadTools,
    SelectTool(ToolId),
    SetInput {
        key: String,
        value: Value,
    },
    ResetInputs,
    /// The host supplies the clock so the reducer stays deterministic.
    QueueTask {
        created_at: DateTime<Utc>,
    },
    Preview,
    Approve,
    ConfirmApply,
    CancelOverlay,
    RequestDeny,
    SubmitDeny {
        reason: Option<String>,
    },
    Retry,
    Back,
    SelectTask(TaskId),
    RemoveTask(TaskId),
    SetDiffMode(DiffViewMode),
    SelectDiff {
        path: String,
    },
    ToggleFold(FoldKey),
    CollapseAllFolds,
    ClearActivity,
}

#[derive(Debug, Clone)]
pub enum RuntimeAction {
    ToolNamesLoaded(Vec<String>),
    ToolNamesFailed(BridgeFailure),
    PlanSucceeded {
        task: TaskId,
        result: ToolRunResult,
    },
    PlanFailed {
        task: TaskId,
        failure: BridgeFailure,
    },
    ApplySucceeded {
        task: TaskId,
        result: ToolRunResult,
    },
    ApplyFailed {
        task: TaskId,
        failure: BridgeFailure,
    },
}

impl From<UserAction> for PanelAction {
    fn from(action: UserAction) -> Self {
        Self::User(action)
    }
}

impl From<RuntimeAction> for PanelAction {
    fn from(action: RuntimeAction) -> Self {
        Self::Runtime(action)
    }
}
