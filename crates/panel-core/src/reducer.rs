use tracing::debug;
use tracing::warn;

use super::actions::PanelAction;
use super::actions::RuntimeAction;
use super::actions::UserAction;
use super::contracts::BridgeFailure;
use super::contracts::InputMap;
use super::contracts::ToolRunResult;
use super::state::derive_active_view;
use super::state::LogLevel;
use super::state::PanelOverlay;
use super::state::PanelState;
use super::state::RetainedPlanInput;
use super::state::Task;
use super::state::TaskId;
use super::state::TaskPhase;
use super::state::TaskStatus;
use super::tool_registry::ToolId;
use super::tool_registry::ToolRegistry;
use super::tool_registry::APPLY_PROPERTY;

/// One bridge `runTool` call the host must perform and report back on.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub task: TaskId,
    pub tool: ToolId,
    pub phase: TaskPhase,
    pub payload: InputMap,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelEffect {
    InvokeTool(ToolInvocation),
    FetchToolNames,
    RequestFrame,
}

pub fn reduce(state: &mut PanelState, action: PanelAction) -> Vec<PanelEffect> {
    match action {
        PanelAction::User(user) => reduce_user(state, user),
        PanelAction::Runtime(runtime) => {
            reduce_runtime(state, runtime);
            Vec::new()
        }
    }
}

fn reduce_user(state: &mut PanelState, action: UserAction) -> Vec<PanelEffect> {
    match action {
        UserAction::LoadTools => {
            state.catalog.loading = true;
            state.catalog.error = None;
            vec![PanelEffect::FetchToolNames, PanelEffect::RequestFrame]
        }
        UserAction::SelectTool(tool) => {
            if !state.catalog.is_selectable(tool) {
                debug!(tool = tool.as_str(), "tool not offered by the bridge");
                return Vec::new();
            }
            state.selected_tool = Some(tool);
            state.form_inputs = ToolRegistry::default_inputs(tool);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::SetInput { key, value } => {
            if key == APPLY_PROPERTY {
                return Vec::new();
            }
            let Some(tool) = state.selected_tool else {
                return Vec::new();
            };
            if ToolRegistry::get(tool).property(&key).is_none() {
                return Vec::new();
            }
            state.form_inputs.insert(key.clone(), value.clone());
            if let Some(id) = state.selected_task {
                if let Some(task) = state.task_mut(id) {
                    if task.tool == tool && !task.in_flight() {
                        task.inputs.insert(key, value);
                    }
                }
            }
            vec![PanelEffect::RequestFrame]
        }
        UserAction::ResetInputs => {
            let Some(tool) = state.selected_tool else {
                return Vec::new();
            };
            state.form_inputs = ToolRegistry::default_inputs(tool);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::QueueTask { created_at } => {
            let Some(tool) = state.selected_tool.filter(|_| state.can_queue()) else {
                return Vec::new();
            };
            let id = TaskId(state.next_task_seq);
            state.next_task_seq += 1;
            let label = format!("{} #{}", ToolRegistry::get(tool).label, id.0);
            let inputs = ToolRegistry::build_payload(&state.form_inputs, false);
            state
                .tasks
                .push(Task::new(id, tool, label, created_at, inputs));
            state.selected_task = Some(id);
            state.overlay = PanelOverlay::None;
            state
                .activity
                .append(LogLevel::Info, Some(id), format!("queued {}", tool.as_str()));
            refresh_view(state);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::Preview => start_plan(state),
        UserAction::Approve => {
            let Some(id) = state.selected_task.filter(|_| state.can_approve()) else {
                return Vec::new();
            };
            state.overlay = PanelOverlay::ConfirmApply { task: id };
            vec![PanelEffect::RequestFrame]
        }
        UserAction::ConfirmApply => {
            let PanelOverlay::ConfirmApply { task } = state.overlay else {
                return Vec::new();
            };
            if state.selected_task != Some(task) {
                state.overlay = PanelOverlay::None;
                return vec![PanelEffect::RequestFrame];
            }
            start_apply(state)
        }
        UserAction::CancelOverlay => {
            if state.overlay == PanelOverlay::None {
                return Vec::new();
            }
            state.overlay = PanelOverlay::None;
            vec![PanelEffect::RequestFrame]
        }
        UserAction::RequestDeny => {
            let Some(id) = state.selected_task.filter(|_| state.can_deny()) else {
                return Vec::new();
            };
            state.overlay = PanelOverlay::DenyReason { task: id };
            vec![PanelEffect::RequestFrame]
        }
        UserAction::SubmitDeny { reason } => {
            let PanelOverlay::DenyReason { task: id } = state.overlay else {
                return Vec::new();
            };
            if state.selected_task != Some(id) || !state.can_deny() {
                return Vec::new();
            }
            let reason = reason
                .map(|reason| reason.trim().to_string())
                .filter(|reason| !reason.is_empty());
            let Some(task) = state.task_mut(id) else {
                return Vec::new();
            };
            task.status = TaskStatus::Denied;
            task.plan_in_flight = false;
            task.apply_in_flight = false;
            task.pending_plan_input = None;
            task.plan_error = None;
            task.apply_error = None;
            task.denied_reason = reason.clone();
            state.overlay = PanelOverlay::None;
            let message = match reason {
                Some(reason) => format!("denied: {reason}"),
                None => "denied".to_string(),
            };
            state.activity.append(LogLevel::Info, Some(id), message);
            refresh_view(state);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::Retry => match state.view.error.as_ref().map(|error| error.phase) {
            Some(TaskPhase::Plan) => start_plan(state),
            Some(TaskPhase::Apply) => start_apply(state),
            None => Vec::new(),
        },
        UserAction::Back => {
            let Some(phase) = state.view.error.as_ref().map(|error| error.phase) else {
                return Vec::new();
            };
            let Some(id) = state.selected_task else {
                return Vec::new();
            };
            if let Some(task) = state.task_mut(id) {
                match phase {
                    TaskPhase::Plan => task.plan_error = None,
                    TaskPhase::Apply => task.apply_error = None,
                }
            }
            refresh_view(state);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::SelectTask(id) => {
            let Some(task) = state.task(id) else {
                return Vec::new();
            };
            let tool = task.tool;
            let inputs = task.inputs.clone();
            state.selected_task = Some(id);
            state.selected_tool = Some(tool);
            state.form_inputs = inputs;
            state.overlay = PanelOverlay::None;
            refresh_view(state);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::RemoveTask(id) => {
            let Some(index) = state.tasks.iter().position(|task| task.id == id) else {
                return Vec::new();
            };
            state.tasks.remove(index);
            if state
                .retained_plan_input
                .as_ref()
                .is_some_and(|retained| retained.task == id)
            {
                state.retained_plan_input = None;
            }
            if matches!(
                state.overlay,
                PanelOverlay::ConfirmApply { task } | PanelOverlay::DenyReason { task } if task == id
            ) {
                state.overlay = PanelOverlay::None;
            }
            if state.selected_task == Some(id) {
                state.selected_task = state.tasks.last().map(|task| task.id);
                if let Some((tool, inputs)) = state
                    .selected()
                    .map(|task| (task.tool, task.inputs.clone()))
                {
                    state.selected_tool = Some(tool);
                    state.form_inputs = inputs;
                }
            }
            state.activity.append(LogLevel::Info, Some(id), "removed");
            refresh_view(state);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::SetDiffMode(mode) => {
            state.diff_view.mode = mode;
            vec![PanelEffect::RequestFrame]
        }
        UserAction::SelectDiff { path } => {
            if state.view.diffs().iter().all(|diff| diff.path != path) {
                return Vec::new();
            }
            state.diff_view.selected_path = Some(path);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::ToggleFold(key) => {
            state.diff_view.folds.toggle(key);
            vec![PanelEffect::RequestFrame]
        }
        UserAction::CollapseAllFolds => {
            state.diff_view.folds.collapse_all();
            vec![PanelEffect::RequestFrame]
        }
        UserAction::ClearActivity => {
            state.activity.clear();
            vec![PanelEffect::RequestFrame]
        }
    }
}

fn start_plan(state: &mut PanelState) -> Vec<PanelEffect> {
    if !state.can_plan() {
        debug!("plan refused by guard");
        return Vec::new();
    }
    let Some(id) = state.selected_task else {
        return Vec::new();
    };
    let Some(task) = state.task_mut(id) else {
        return Vec::new();
    };

    let payload = ToolRegistry::build_payload(&task.inputs, false);
    task.status = TaskStatus::Queued;
    task.plan_in_flight = true;
    task.pending_plan_input = Some(payload.clone());
    task.plan_result = None;
    task.apply_result = None;
    task.plan_error = None;
    task.apply_error = None;
    task.denied_reason = None;
    task.incident_id = None;
    task.telemetry_href = None;
    let tool = task.tool;

    state.overlay = PanelOverlay::None;
    state
        .activity
        .append(LogLevel::Info, Some(id), format!("plan {}", tool.as_str()));
    debug!(task = %id, tool = tool.as_str(), "plan dispatched");
    refresh_view(state);

    vec![
        PanelEffect::InvokeTool(ToolInvocation {
            task: id,
            tool,
            phase: TaskPhase::Plan,
            payload,
        }),
        PanelEffect::RequestFrame,
    ]
}

fn start_apply(state: &mut PanelState) -> Vec<PanelEffect> {
    if !state.can_apply() {
        debug!("apply refused by guard");
        return Vec::new();
    }
    let Some(id) = state.selected_task else {
        return Vec::new();
    };
    let Some(input) = state
        .selected()
        .and_then(|task| state.plan_input_for(task))
        .cloned()
    else {
        return Vec::new();
    };
    let Some(task) = state.task_mut(id) else {
        return Vec::new();
    };

    let payload = ToolRegistry::build_payload(&input, true);
    task.status = TaskStatus::Running;
    task.apply_in_flight = true;
    task.apply_result = None;
    task.apply_error = None;
    let tool = task.tool;

    state.overlay = PanelOverlay::None;
    state
        .activity
        .append(LogLevel::Info, Some(id), format!("apply {}", tool.as_str()));
    debug!(task = %id, tool = tool.as_str(), "apply dispatched");
    refresh_view(state);

    vec![
        PanelEffect::InvokeTool(ToolInvocation {
            task: id,
            tool,
            phase: TaskPhase::Apply,
            payload,
        }),
        PanelEffect::RequestFrame,
    ]
}

fn reduce_runtime(state: &mut PanelState, action: RuntimeAction) {
    match action {
        RuntimeAction::ToolNamesLoaded(names) => {
            let mut available = Vec::new();
            let mut unrecognized = Vec::new();
            for name in names {
                match ToolId::parse(&name) {
                    Some(id) if !available.contains(&id) => available.push(id),
                    Some(_) => {}
                    None => unrecognized.push(name),
                }
            }
            if !unrecognized.is_empty() {
                debug!(?unrecognized, "bridge offered tools without a descriptor");
            }
            state.catalog.available = available;
            state.catalog.unrecognized = unrecognized;
            state.catalog.loading = false;
            state.catalog.loaded = true;
            state.catalog.error = None;
        }
        RuntimeAction::ToolNamesFailed(failure) => {
            state.activity.append(
                LogLevel::Warn,
                None,
                format!("tool list unavailable: {}", failure.message),
            );
            state.catalog.loading = false;
            state.catalog.error = Some(failure);
        }
        RuntimeAction::PlanSucceeded { task, result } => finish_plan(state, task, Ok(result)),
        RuntimeAction::PlanFailed { task, failure } => finish_plan(state, task, Err(failure)),
        RuntimeAction::ApplySucceeded { task, result } => finish_apply(state, task, Ok(result)),
        RuntimeAction::ApplyFailed { task, failure } => finish_apply(state, task, Err(failure)),
    }
}

fn finish_plan(state: &mut PanelState, id: TaskId, outcome: Result<ToolRunResult, BridgeFailure>) {
    let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) else {
        warn!(task = %id, "plan completion for a removed task");
        state
            .activity
            .append(LogLevel::Warn, Some(id), "ignored plan completion for removed task");
        return;
    };
    if !task.plan_in_flight {
        warn!(task = %id, "stale plan completion");
        state
            .activity
            .append(LogLevel::Warn, Some(id), "ignored stale plan completion");
        return;
    }

    task.plan_in_flight = false;
    let sent = task.pending_plan_input.take();
    match outcome {
        Ok(result) => {
            task.incident_id = result.incident_id.clone();
            task.telemetry_href = result
                .diagnostics_path
                .as_deref()
                .and_then(|path| state.linker.href(path));
            task.plan_result = Some(result);
            if let Some(input) = sent {
                task.plan_input = Some(input.clone());
                state.retained_plan_input = Some(RetainedPlanInput { task: id, input });
            }
            task.status = if task.apply_supported {
                TaskStatus::WaitingApproval
            } else {
                TaskStatus::Done
            };
            let message = format!("plan ready, {}", task.status.label().to_lowercase());
            state.activity.append(LogLevel::Info, Some(id), message);
        }
        Err(failure) => {
            task.incident_id = failure.incident_id.clone();
            task.telemetry_href = failure
                .telemetry_href()
                .and_then(|href| state.linker.href(href));
            task.status = TaskStatus::Queued;
            state.activity.append(
                LogLevel::Error,
                Some(id),
                format!("plan failed: {}", failure.message),
            );
            task.plan_error = Some(failure);
        }
    }
    refresh_view(state);
}

fn finish_apply(
    state: &mut PanelState,
    id: TaskId,
    outcome: Result<ToolRunResult, BridgeFailure>,
) {
    let Some(task) = state.tasks.iter_mut().find(|task| task.id == id) else {
        warn!(task = %id, "apply completion for a removed task");
        state
            .activity
            .append(LogLevel::Warn, Some(id), "ignored apply completion for removed task");
        return;
    };
    if !task.apply_in_flight {
        warn!(task = %id, "stale apply completion");
        state
            .activity
            .append(LogLevel::Warn, Some(id), "ignored stale apply completion");
        return;
    }

    task.apply_in_flight = false;
    match outcome {
        Ok(result) => {
            if result.incident_id.is_some() {
                task.incident_id = result.incident_id.clone();
            }
            if let Some(href) = result
                .diagnostics_path
                .as_deref()
                .and_then(|path| state.linker.href(path))
            {
                task.telemetry_href = Some(href);
            }
            task.apply_result = Some(result);
            task.status = TaskStatus::Done;
            state.activity.append(LogLevel::Info, Some(id), "applied");
        }
        Err(failure) => {
            task.incident_id = failure.incident_id.clone().or(task.incident_id.take());
            if let Some(href) = failure
                .telemetry_href()
                .and_then(|href| state.linker.href(href))
            {
                task.telemetry_href = Some(href);
            }
            task.status = TaskStatus::WaitingApproval;
            state.activity.append(
                LogLevel::Error,
                Some(id),
                format!("apply failed: {}", failure.message),
            );
            task.apply_error = Some(failure);
        }
    }
    refresh_view(state);
}

fn refresh_view(state: &mut PanelState) {
    state.view = derive_active_view(state.selected());
    reconcile_selected_diff(state);
}

fn reconcile_selected_diff(state: &mut PanelState) {
    let diffs = state.view.diffs();
    if let Some(current) = state.diff_view.selected_path.as_deref() {
        if diffs.iter().any(|diff| diff.path == current) {
            return;
        }
    }
    state.diff_view.selected_path = diffs.first().map(|diff| diff.path.clone());
}

#[cfg(test)]
mod tests;
