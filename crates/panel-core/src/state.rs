use std::collections::VecDeque;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;

use crate::artifacts::ArtifactLinker;
use crate::config::PanelConfig;
use crate::contracts::BridgeFailure;
use crate::contracts::Diff;
use crate::contracts::InputMap;
use crate::contracts::ToolRunResult;
use crate::diff_model::resolve_view_mode;
use crate::diff_model::DiffViewMode;
use crate::diff_model::FoldState;
use crate::error_catalog::ErrorPresentation;
use crate::tool_registry::ToolId;
use crate::tool_registry::ToolRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Queued,
    WaitingApproval,
    Running,
    Done,
    Denied,
}

impl TaskStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Queued => "Queued",
            Self::WaitingApproval => "Waiting approval",
            Self::Running => "Running",
            Self::Done => "Done",
            Self::Denied => "Denied",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    Plan,
    Apply,
}

impl TaskPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Apply => "apply",
        }
    }
}

/// One queued invocation of a tool.
///
/// `plan_in_flight` and `apply_in_flight` are never both set, and no call
/// for a phase is issued while its flag is set.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: TaskId,
    pub tool: ToolId,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub status: TaskStatus,
    pub inputs: InputMap,
    /// Payload of the last successful plan call; apply replays exactly this.
    pub plan_input: Option<InputMap>,
    /// Payload of the plan call currently in flight.
    pub pending_plan_input: Option<InputMap>,
    pub plan_result: Option<ToolRunResult>,
    pub apply_result: Option<ToolRunResult>,
    pub plan_error: Option<BridgeFailure>,
    pub apply_error: Option<BridgeFailure>,
    pub plan_in_flight: bool,
    pub apply_in_flight: bool,
    pub incident_id: Option<String>,
    pub telemetry_href: Option<String>,
    pub denied_reason: Option<String>,
    pub apply_supported: bool,
}

impl Task {
    pub fn new(
        id: TaskId,
        tool: ToolId,
        label: String,
        created_at: DateTime<Utc>,
        inputs: InputMap,
    ) -> Self {
        Self {
            id,
            tool,
            label,
            created_at,
            status: TaskStatus::Queued,
            inputs,
            plan_input: None,
            pending_plan_input: None,
            plan_result: None,
            apply_result: None,
            plan_error: None,
            apply_error: None,
            plan_in_flight: false,
            apply_in_flight: false,
            incident_id: None,
            telemetry_href: None,
            denied_reason: None,
            apply_supported: ToolRegistry::supports_apply(tool),
        }
    }

    pub fn in_flight(&self) -> bool {
        self.plan_in_flight || self.apply_in_flight
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskError {
    pub phase: TaskPhase,
    pub failure: BridgeFailure,
}

impl TaskError {
    pub fn presentation(&self) -> ErrorPresentation {
        ErrorPresentation::from_failure(&self.failure)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    Planning,
    Review,
    Executing,
    Summary,
    Error,
}

impl ViewPhase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Planning => "planning",
            Self::Review => "review",
            Self::Executing => "executing",
            Self::Summary => "summary",
            Self::Error => "error",
        }
    }
}

/// What the panel is showing. Always derived from the selected task.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveView {
    pub phase: ViewPhase,
    pub result: Option<ToolRunResult>,
    pub error: Option<TaskError>,
}

impl ActiveView {
    pub fn idle() -> Self {
        Self {
            phase: ViewPhase::Idle,
            result: None,
            error: None,
        }
    }

    pub fn diffs(&self) -> &[Diff] {
        self.result
            .as_ref()
            .map(ToolRunResult::diffs)
            .unwrap_or(&[])
    }
}

/// Priority, highest first: apply in flight, plan in flight, apply error,
/// plan error, then the task status.
pub fn derive_active_view(task: Option<&Task>) -> ActiveView {
    let Some(task) = task else {
        return ActiveView::idle();
    };

    let (phase, error) = if task.apply_in_flight {
        (ViewPhase::Executing, None)
    } else if task.plan_in_flight {
        (ViewPhase::Planning, None)
    } else if let Some(failure) = &task.apply_error {
        (
            ViewPhase::Error,
            Some(TaskError {
                phase: TaskPhase::Apply,
                failure: failure.clone(),
            }),
        )
    } else if let Some(failure) = &task.plan_error {
        (
            ViewPhase::Error,
            Some(TaskError {
                phase: TaskPhase::Plan,
                failure: failure.clone(),
            }),
        )
    } else {
        let phase = match task.status {
            TaskStatus::WaitingApproval => ViewPhase::Review,
            TaskStatus::Running => ViewPhase::Executing,
            TaskStatus::Done if task.apply_supported => ViewPhase::Summary,
            TaskStatus::Done => ViewPhase::Review,
            TaskStatus::Denied => ViewPhase::Summary,
            TaskStatus::Queued => ViewPhase::Idle,
        };
        (phase, None)
    };

    let result = match phase {
        ViewPhase::Summary => task
            .apply_result
            .clone()
            .or_else(|| task.plan_result.clone()),
        _ => task.plan_result.clone(),
    };

    ActiveView {
        phase,
        result,
        error,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelOverlay {
    None,
    ConfirmApply { task: TaskId },
    DenyReason { task: TaskId },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiffViewState {
    pub mode: DiffViewMode,
    pub selected_path: Option<String>,
    pub folds: FoldState,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCatalog {
    pub available: Vec<ToolId>,
    /// Names the bridge reported that this panel has no descriptor for.
    pub unrecognized: Vec<String>,
    pub loading: bool,
    pub loaded: bool,
    pub error: Option<BridgeFailure>,
}

impl ToolCatalog {
    pub fn is_selectable(&self, tool: ToolId) -> bool {
        !self.loaded || self.available.contains(&tool)
    }
}

/// Plan payload kept in memory alongside the task that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedPlanInput {
    pub task: TaskId,
    pub input: InputMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub seq: u64,
    pub level: LogLevel,
    pub task: Option<TaskId>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityLog {
    cap: usize,
    next_seq: u64,
    buf: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            cap,
            next_seq: 1,
            buf: VecDeque::with_capacity(cap),
        }
    }

    pub fn append(&mut self, level: LogLevel, task: Option<TaskId>, message: impl Into<String>) {
        let entry = ActivityEntry {
            seq: self.next_seq,
            level,
            task,
            message: message.into(),
        };
        self.next_seq += 1;

        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(entry);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
        self.next_seq = 1;
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.buf.iter()
    }

    pub fn for_task(&self, task: TaskId) -> impl Iterator<Item = &ActivityEntry> {
        self.buf.iter().filter(move |entry| entry.task == Some(task))
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PanelState {
    pub catalog: ToolCatalog,
    pub selected_tool: Option<ToolId>,
    pub form_inputs: InputMap,
    pub tasks: Vec<Task>,
    pub selected_task: Option<TaskId>,
    pub view: ActiveView,
    pub overlay: PanelOverlay,
    pub diff_view: DiffViewState,
    pub retained_plan_input: Option<RetainedPlanInput>,
    pub next_task_seq: u64,
    pub activity: ActivityLog,
    pub linker: ArtifactLinker,
}

impl PanelState {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            catalog: ToolCatalog::default(),
            selected_tool: None,
            form_inputs: InputMap::new(),
            tasks: Vec::new(),
            selected_task: None,
            view: ActiveView::idle(),
            overlay: PanelOverlay::None,
            diff_view: DiffViewState::default(),
            retained_plan_input: None,
            next_task_seq: 1,
            activity: ActivityLog::new(config.view.activity_log_capacity),
            linker: ArtifactLinker::new(config.bridge.artifact_base_url.clone()),
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    pub fn selected(&self) -> Option<&Task> {
        self.selected_task.and_then(|id| self.task(id))
    }

    /// The frozen plan payload for `task`: its own snapshot, else the
    /// retained in-memory one when it was captured for the same task.
    pub fn plan_input_for<'a>(&'a self, task: &'a Task) -> Option<&'a InputMap> {
        task.plan_input.as_ref().or_else(|| {
            self.retained_plan_input
                .as_ref()
                .filter(|retained| retained.task == task.id)
                .map(|retained| &retained.input)
        })
    }

    pub fn can_queue(&self) -> bool {
        self.selected_tool.is_some()
    }

    pub fn can_plan(&self) -> bool {
        let Some(task) = self.selected() else {
            return false;
        };
        !task.in_flight()
            && task.status != TaskStatus::Running
            && !matches!(self.view.phase, ViewPhase::Planning | ViewPhase::Executing)
    }

    pub fn can_approve(&self) -> bool {
        self.selected().is_some_and(|task| {
            task.plan_result.is_some()
                && task.status == TaskStatus::WaitingApproval
                && task.apply_supported
                && !task.in_flight()
        })
    }

    pub fn can_apply(&self) -> bool {
        self.can_approve()
            && self
                .selected()
                .is_some_and(|task| self.plan_input_for(task).is_some())
    }

    pub fn can_deny(&self) -> bool {
        self.selected().is_some_and(|task| {
            task.apply_supported
                && task.status == TaskStatus::WaitingApproval
                && !task.apply_in_flight
        })
    }

    pub fn can_retry(&self) -> bool {
        match self.view.error.as_ref().map(|error| error.phase) {
            Some(TaskPhase::Plan) => self.can_plan(),
            Some(TaskPhase::Apply) => self.can_apply(),
            None => false,
        }
    }

    pub fn active_diff(&self) -> Option<&Diff> {
        let diffs = self.view.diffs();
        self.diff_view
            .selected_path
            .as_deref()
            .and_then(|path| diffs.iter().find(|diff| diff.path == path))
            .or_else(|| diffs.first())
    }

    /// Mode the diff viewer renders in, with the reason when JSON is unavailable.
    pub fn effective_diff_mode(&self) -> (DiffViewMode, Option<&'static str>) {
        match self.active_diff() {
            Some(diff) => resolve_view_mode(self.diff_view.mode, diff),
            None => (self.diff_view.mode, None),
        }
    }
}
