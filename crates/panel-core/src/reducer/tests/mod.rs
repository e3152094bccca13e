use chrono::DateTime;
use chrono::TimeZone;
use chrono::Utc;
use pretty_assertions::assert_eq;

pub(super) use super::reduce;
pub(super) use super::PanelEffect;
pub(super) use super::ToolInvocation;
pub(super) use crate::actions::PanelAction;
pub(super) use crate::actions::RuntimeAction;
pub(super) use crate::actions::UserAction;
pub(super) use crate::config::PanelConfig;
pub(super) use crate::contracts::BridgeFailure;
pub(super) use crate::contracts::Diff;
pub(super) use crate::contracts::DiffHunk;
pub(super) use crate::contracts::DiffLine;
pub(super) use crate::contracts::DiffLineKind;
pub(super) use crate::contracts::PreviewPayload;
pub(super) use crate::contracts::ToolRunResult;
pub(super) use crate::state::derive_active_view;
pub(super) use crate::state::ActivityLog;
pub(super) use crate::state::LogLevel;
pub(super) use crate::state::PanelOverlay;
pub(super) use crate::state::PanelState;
pub(super) use crate::state::TaskId;
pub(super) use crate::state::TaskPhase;
pub(super) use crate::state::TaskStatus;
pub(super) use crate::state::ViewPhase;
pub(super) use crate::tool_registry::ToolId;


fn state() -> PanelState {
    PanelState::new(&PanelConfig::default())
}

fn at(minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0)
        .single()
        .expect("valid timestamp")
}

fn user(state: &mut PanelState, action: UserAction) -> Vec<PanelEffect> {
    let effects = reduce(state, PanelAction::User(action));
    assert_view_sync(state);
    effects
}

fn run_runtime(state: &mut PanelState, action: RuntimeAction) {
    let effects = reduce(state, PanelAction::Runtime(action));
    assert!(effects.is_empty());
    assert_view_sync(state);
}

fn queue(state: &mut PanelState, tool: ToolId) -> TaskId {
    user(state, UserAction::SelectTool(tool));
    user(
        state,
        UserAction::QueueTask {
            created_at: at(state.tasks.len() as u32),
        },
    );
    state.selected_task.expect("queued task is selected")
}

fn invocations(effects: &[PanelEffect]) -> Vec<&ToolInvocation> {
    effects
        .iter()
        .filter_map(|effect| match effect {
            PanelEffect::InvokeTool(invocation) => Some(invocation),
            _ => None,
        })
        .collect()
}

fn single_invocation(effects: &[PanelEffect]) -> ToolInvocation {
    let found = invocations(effects);
    assert_eq!(found.len(), 1, "expected one invocation in {effects:?}");
    found[0].clone()
}

fn diff(path: &str) -> Diff {
    Diff {
        path: path.to_string(),
        summary: None,
        hunks: vec![DiffHunk {
            header: "@@ -1,2 +1,2 @@".to_string(),
            lines: vec![
                DiffLine::new(DiffLineKind::Context, "{"),
                DiffLine::new(DiffLineKind::Remove, "  \"a\": 1"),
                DiffLine::new(DiffLineKind::Add, "  \"a\": 2"),
            ],
        }],
        structured: None,
    }
}

fn result_with(paths: &[&str]) -> ToolRunResult {
    ToolRunResult {
        preview: Some(PreviewPayload {
            diffs: paths.iter().map(|path| diff(path)).collect(),
        }),
        ..ToolRunResult::default()
    }
}

/// Queue `tool`, preview it and settle the plan call successfully.
fn planned(state: &mut PanelState, tool: ToolId, paths: &[&str]) -> TaskId {
    let id = queue(state, tool);
    let effects = user(state, UserAction::Preview);
    let invocation = single_invocation(&effects);
    assert_eq!(invocation.phase, TaskPhase::Plan);
    run_runtime(
        state,
        RuntimeAction::PlanSucceeded {
            task: id,
            result: result_with(paths),
        },
    );
    id
}

fn assert_view_sync(state: &PanelState) {
    assert_eq!(state.view, derive_active_view(state.selected()));
}
