//! Historical run browser.
//!
//! Lives beside the task queue and never touches it. Every fetch carries a
//! [`RequestToken`]; a response is only committed while its token is still
//! the current one for that slot, so a slow answer for a superseded run can
//! never overwrite what the newer selection shows.

use std::fmt;

use serde_json::Value;
use tracing::debug;

use crate::artifacts::ArtifactLinker;
use crate::artifacts::ArtifactRow;
use crate::config::PanelConfig;
use crate::contracts::BridgeFailure;
use crate::contracts::RunFile;
use crate::contracts::RunSummary;
use crate::platform::FocusId;
use crate::platform::TimerToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Loading and error state of one fetch, plus its last committed data.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchSlot<T> {
    pub token: Option<RequestToken>,
    pub data: Option<T>,
    pub error: Option<BridgeFailure>,
}

impl<T> Default for FetchSlot<T> {
    fn default() -> Self {
        Self {
            token: None,
            data: None,
            error: None,
        }
    }
}

impl<T> FetchSlot<T> {
    pub fn is_loading(&self) -> bool {
        self.token.is_some()
    }

    fn start(&mut self, token: RequestToken) {
        self.token = Some(token);
        self.data = None;
        self.error = None;
    }

    fn is_current(&self, token: RequestToken) -> bool {
        self.token == Some(token)
    }

    fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied,
    Failed,
}

impl CopyOutcome {
    pub fn label(self) -> &'static str {
        match self {
            Self::Copied => "Copied",
            Self::Failed => "Copy failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyFeedback {
    pub path: String,
    pub outcome: CopyOutcome,
    pub timer: TimerToken,
}

/// Modal run history picker. Focus stays inside `focusables` while open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryPicker {
    pub return_focus: Option<FocusId>,
    pub focusables: Vec<FocusId>,
    pub focused: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PickerKey {
    Tab,
    ShiftTab,
    Escape,
}

#[derive(Debug, Clone)]
pub enum BrowserAction {
    Mount,
    Unmount,
    Refresh {
        preserve_selection: bool,
    },
    RunsLoaded {
        token: RequestToken,
        runs: Vec<RunSummary>,
    },
    RunsFailed {
        token: RequestToken,
        failure: BridgeFailure,
    },
    SelectRun(String),
    FilesLoaded {
        token: RequestToken,
        run_id: String,
        files: Vec<RunFile>,
    },
    FilesFailed {
        token: RequestToken,
        run_id: String,
        failure: BridgeFailure,
    },
    DiagnosticsLoaded {
        token: RequestToken,
        run_id: String,
        payload: Value,
    },
    DiagnosticsFailed {
        token: RequestToken,
        run_id: String,
        failure: BridgeFailure,
    },
    /// Copy the sha256 of a file in the current listing.
    CopyHash {
        path: String,
    },
    CopyFinished {
        path: String,
        result: Result<(), String>,
    },
    TimerFired(TimerToken),
    OpenArtifact {
        path: String,
    },
    DismissNotice,
    OpenHistory {
        invoker: Option<FocusId>,
        focusables: Vec<FocusId>,
    },
    PickerKey(PickerKey),
    PickRun(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowserEffect {
    FetchRuns { token: RequestToken },
    FetchFiles { token: RequestToken, run_id: String },
    FetchDiagnostics { token: RequestToken, run_id: String },
    CopyToClipboard { path: String, text: String },
    ScheduleTimer { token: TimerToken, after_ms: u64 },
    CancelTimer(TimerToken),
    OpenUrl(String),
    FocusElement(FocusId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunBrowserState {
    pub mounted: bool,
    pub runs: FetchSlot<Vec<RunSummary>>,
    pub selected_run: Option<String>,
    pub files: FetchSlot<Vec<RunFile>>,
    pub diagnostics: FetchSlot<Value>,
    pub copy_feedback: Option<CopyFeedback>,
    pub picker: Option<HistoryPicker>,
    pub notice: Option<String>,
    pub linker: ArtifactLinker,
    copy_feedback_ms: u64,
    next_request: u64,
    next_timer: u64,
}

impl RunBrowserState {
    pub fn new(config: &PanelConfig) -> Self {
        Self {
            mounted: false,
            runs: FetchSlot::default(),
            selected_run: None,
            files: FetchSlot::default(),
            diagnostics: FetchSlot::default(),
            copy_feedback: None,
            picker: None,
            notice: None,
            linker: ArtifactLinker::new(config.bridge.artifact_base_url.clone()),
            copy_feedback_ms: config.view.copy_feedback_ms,
            next_request: 1,
            next_timer: 1,
        }
    }

    pub fn run_list(&self) -> &[RunSummary] {
        self.runs.data.as_deref().unwrap_or(&[])
    }

    pub fn selected_summary(&self) -> Option<&RunSummary> {
        let selected = self.selected_run.as_deref()?;
        self.run_list().iter().find(|run| run.id == selected)
    }

    pub fn file_rows(&self) -> Vec<ArtifactRow> {
        self.files
            .data
            .iter()
            .flatten()
            .map(|file| ArtifactRow::from_run_file(file, &self.linker))
            .collect()
    }

    fn request_token(&mut self) -> RequestToken {
        let token = RequestToken(self.next_request);
        self.next_request += 1;
        token
    }

    fn timer_token(&mut self) -> TimerToken {
        let token = TimerToken(self.next_timer);
        self.next_timer += 1;
        token
    }
}

pub fn reduce_browser(state: &mut RunBrowserState, action: BrowserAction) -> Vec<BrowserEffect> {
    match action {
        BrowserAction::Mount => {
            state.mounted = true;
            refresh(state, false)
        }
        BrowserAction::Unmount => {
            state.mounted = false;
            state.runs.token = None;
            state.files.token = None;
            state.diagnostics.token = None;
            state.picker = None;
            let mut effects = Vec::new();
            if let Some(feedback) = state.copy_feedback.take() {
                effects.push(BrowserEffect::CancelTimer(feedback.timer));
            }
            effects
        }
        BrowserAction::Refresh { preserve_selection } => refresh(state, preserve_selection),
        BrowserAction::RunsLoaded { token, runs } => {
            if !state.runs.is_current(token) {
                debug!(%token, "dropping stale run list");
                return Vec::new();
            }
            // A non-preserving refresh already cleared the selection.
            let keep = state
                .selected_run
                .as_ref()
                .filter(|selected| runs.iter().any(|run| &run.id == *selected))
                .cloned();
            state.runs.token = None;
            state.runs.data = Some(runs);
            state.runs.error = None;
            let next = keep.or_else(|| state.run_list().first().map(|run| run.id.clone()));
            match next {
                Some(run_id) => select_run(state, run_id),
                None => {
                    state.selected_run = None;
                    state.files.reset();
                    state.diagnostics.reset();
                    Vec::new()
                }
            }
        }
        BrowserAction::RunsFailed { token, failure } => {
            if state.runs.is_current(token) {
                state.runs.token = None;
                state.runs.error = Some(failure);
            }
            Vec::new()
        }
        BrowserAction::SelectRun(run_id) => {
            if state.run_list().iter().all(|run| run.id != run_id) {
                return Vec::new();
            }
            select_run(state, run_id)
        }
        BrowserAction::FilesLoaded {
            token,
            run_id,
            files,
        } => {
            if commit_allowed(&state.files, &state.selected_run, token, &run_id) {
                state.files.token = None;
                state.files.data = Some(files);
            } else {
                debug!(%token, run = %run_id, "dropping stale file listing");
            }
            Vec::new()
        }
        BrowserAction::FilesFailed {
            token,
            run_id,
            failure,
        } => {
            if commit_allowed(&state.files, &state.selected_run, token, &run_id) {
                state.files.token = None;
                state.files.error = Some(failure);
            }
            Vec::new()
        }
        BrowserAction::DiagnosticsLoaded {
            token,
            run_id,
            payload,
        } => {
            if commit_allowed(&state.diagnostics, &state.selected_run, token, &run_id) {
                state.diagnostics.token = None;
                state.diagnostics.data = Some(payload);
            } else {
                debug!(%token, run = %run_id, "dropping stale diagnostics");
            }
            Vec::new()
        }
        BrowserAction::DiagnosticsFailed {
            token,
            run_id,
            failure,
        } => {
            if commit_allowed(&state.diagnostics, &state.selected_run, token, &run_id) {
                state.diagnostics.token = None;
                state.diagnostics.error = Some(failure);
            }
            Vec::new()
        }
        BrowserAction::CopyHash { path } => {
            let sha = state
                .files
                .data
                .iter()
                .flatten()
                .find(|file| file.path == path)
                .and_then(|file| file.sha256.clone());
            match sha {
                Some(text) => vec![BrowserEffect::CopyToClipboard { path, text }],
                None => {
                    state.notice = Some(format!("No hash recorded for {path}"));
                    Vec::new()
                }
            }
        }
        BrowserAction::CopyFinished { path, result } => {
            if !state.mounted {
                return Vec::new();
            }
            let mut effects = Vec::new();
            if let Some(previous) = state.copy_feedback.take() {
                effects.push(BrowserEffect::CancelTimer(previous.timer));
            }
            let outcome = match result {
                Ok(()) => CopyOutcome::Copied,
                Err(reason) => {
                    debug!(%reason, "clipboard write failed");
                    CopyOutcome::Failed
                }
            };
            let timer = state.timer_token();
            state.copy_feedback = Some(CopyFeedback {
                path,
                outcome,
                timer,
            });
            effects.push(BrowserEffect::ScheduleTimer {
                token: timer,
                after_ms: state.copy_feedback_ms,
            });
            effects
        }
        BrowserAction::TimerFired(token) => {
            if state
                .copy_feedback
                .as_ref()
                .is_some_and(|feedback| feedback.timer == token)
            {
                state.copy_feedback = None;
            }
            Vec::new()
        }
        BrowserAction::OpenArtifact { path } => match state.linker.href(&path) {
            Some(url) => {
                state.notice = None;
                vec![BrowserEffect::OpenUrl(url)]
            }
            None => {
                state.notice = Some(format!("No viewer link available for {path}"));
                Vec::new()
            }
        },
        BrowserAction::DismissNotice => {
            state.notice = None;
            Vec::new()
        }
        BrowserAction::OpenHistory {
            invoker,
            focusables,
        } => {
            let first = focusables.first().copied();
            state.picker = Some(HistoryPicker {
                return_focus: invoker,
                focusables,
                focused: 0,
            });
            first.map(BrowserEffect::FocusElement).into_iter().collect()
        }
        BrowserAction::PickerKey(key) => {
            let Some(picker) = state.picker.as_mut() else {
                return Vec::new();
            };
            match key {
                PickerKey::Escape => close_picker(state),
                PickerKey::Tab | PickerKey::ShiftTab => {
                    let count = picker.focusables.len();
                    if count == 0 {
                        return Vec::new();
                    }
                    picker.focused = if key == PickerKey::Tab {
                        (picker.focused + 1) % count
                    } else {
                        (picker.focused + count - 1) % count
                    };
                    vec![BrowserEffect::FocusElement(
                        picker.focusables[picker.focused],
                    )]
                }
            }
        }
        BrowserAction::PickRun(run_id) => {
            let mut effects = close_picker(state);
            if state.run_list().iter().any(|run| run.id == run_id) {
                effects.extend(select_run(state, run_id));
            }
            effects
        }
    }
}

fn refresh(state: &mut RunBrowserState, preserve_selection: bool) -> Vec<BrowserEffect> {
    if !preserve_selection {
        state.selected_run = None;
    }
    let token = state.request_token();
    state.runs.token = Some(token);
    state.runs.error = None;
    vec![BrowserEffect::FetchRuns { token }]
}

fn select_run(state: &mut RunBrowserState, run_id: String) -> Vec<BrowserEffect> {
    let files = state.request_token();
    let diagnostics = state.request_token();
    state.files.start(files);
    state.diagnostics.start(diagnostics);
    state.selected_run = Some(run_id.clone());
    vec![
        BrowserEffect::FetchFiles {
            token: files,
            run_id: run_id.clone(),
        },
        BrowserEffect::FetchDiagnostics {
            token: diagnostics,
            run_id,
        },
    ]
}

fn commit_allowed<T>(
    slot: &FetchSlot<T>,
    selected: &Option<String>,
    token: RequestToken,
    run_id: &str,
) -> bool {
    slot.is_current(token) && selected.as_deref() == Some(run_id)
}

fn close_picker(state: &mut RunBrowserState) -> Vec<BrowserEffect> {
    match state.picker.take() {
        Some(picker) => picker
            .return_focus
            .map(BrowserEffect::FocusElement)
            .into_iter()
            .collect(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn browser() -> RunBrowserState {
        let mut config = PanelConfig::default();
        config.bridge.artifact_base_url = Some("http://artifacts.local".to_string());
        RunBrowserState::new(&config)
    }

    fn run(id: &str) -> RunSummary {
        RunSummary {
            id: id.to_string(),
            tool: Some("content_refresh".to_string()),
            created_at: None,
            status: Some("done".to_string()),
            file_count: Some(1),
        }
    }

    fn file(path: &str, sha: Option<&str>) -> RunFile {
        RunFile {
            path: path.to_string(),
            name: path.rsplit('/').next().unwrap_or(path).to_string(),
            purpose: None,
            sha256: sha.map(str::to_string),
            size_bytes: Some(10),
        }
    }

    fn runs_token(effects: &[BrowserEffect]) -> RequestToken {
        effects
            .iter()
            .find_map(|effect| match effect {
                BrowserEffect::FetchRuns { token } => Some(*token),
                _ => None,
            })
            .expect("run fetch")
    }

    fn files_token(effects: &[BrowserEffect]) -> (RequestToken, String) {
        effects
            .iter()
            .find_map(|effect| match effect {
                BrowserEffect::FetchFiles { token, run_id } => Some((*token, run_id.clone())),
                _ => None,
            })
            .expect("file fetch")
    }

    fn diagnostics_token(effects: &[BrowserEffect]) -> RequestToken {
        effects
            .iter()
            .find_map(|effect| match effect {
                BrowserEffect::FetchDiagnostics { token, .. } => Some(*token),
                _ => None,
            })
            .expect("diagnostics fetch")
    }

    fn mounted_with(state: &mut RunBrowserState, ids: &[&str]) -> Vec<BrowserEffect> {
        let effects = reduce_browser(state, BrowserAction::Mount);
        let token = runs_token(&effects);
        reduce_browser(
            state,
            BrowserAction::RunsLoaded {
                token,
                runs: ids.iter().map(|id| run(id)).collect(),
            },
        )
    }

    #[test]
    fn mount_selects_latest_run_and_fetches_both_panes() {
        let mut state = browser();
        let effects = mounted_with(&mut state, &["run-2", "run-1"]);
        assert_eq!(state.selected_run.as_deref(), Some("run-2"));
        let (_, run_id) = files_token(&effects);
        assert_eq!(run_id, "run-2");
        diagnostics_token(&effects);
        assert!(state.files.is_loading());
        assert!(state.diagnostics.is_loading());
    }

    #[test]
    fn refresh_can_preserve_a_still_present_selection() {
        let mut state = browser();
        mounted_with(&mut state, &["run-2", "run-1"]);
        reduce_browser(&mut state, BrowserAction::SelectRun("run-1".to_string()));

        let effects = reduce_browser(
            &mut state,
            BrowserAction::Refresh {
                preserve_selection: true,
            },
        );
        reduce_browser(
            &mut state,
            BrowserAction::RunsLoaded {
                token: runs_token(&effects),
                runs: vec![run("run-3"), run("run-2"), run("run-1")],
            },
        );
        assert_eq!(state.selected_run.as_deref(), Some("run-1"));

        let effects = reduce_browser(
            &mut state,
            BrowserAction::Refresh {
                preserve_selection: true,
            },
        );
        reduce_browser(
            &mut state,
            BrowserAction::RunsLoaded {
                token: runs_token(&effects),
                runs: vec![run("run-4")],
            },
        );
        assert_eq!(state.selected_run.as_deref(), Some("run-4"));
    }

    #[test]
    fn empty_run_list_clears_selection() {
        let mut state = browser();
        let effects = mounted_with(&mut state, &[]);
        assert!(effects.is_empty());
        assert_eq!(state.selected_run, None);
        assert!(!state.files.is_loading());
    }

    #[test]
    fn late_listing_for_previous_run_is_discarded() {
        let mut state = browser();
        let first = mounted_with(&mut state, &["run-a", "run-b"]);
        let (token_a, _) = files_token(&first);

        let second = reduce_browser(&mut state, BrowserAction::SelectRun("run-b".to_string()));
        let (token_b, run_b) = files_token(&second);
        assert_eq!(run_b, "run-b");

        reduce_browser(
            &mut state,
            BrowserAction::FilesLoaded {
                token: token_b,
                run_id: "run-b".to_string(),
                files: vec![file("b/out.json", Some("bbbb"))],
            },
        );
        reduce_browser(
            &mut state,
            BrowserAction::FilesLoaded {
                token: token_a,
                run_id: "run-a".to_string(),
                files: vec![file("a/out.json", Some("aaaa"))],
            },
        );

        let paths: Vec<&str> = state
            .files
            .data
            .iter()
            .flatten()
            .map(|file| file.path.as_str())
            .collect();
        assert_eq!(paths, vec!["b/out.json"]);
    }

    #[test]
    fn reselecting_same_run_supersedes_previous_fetch() {
        let mut state = browser();
        let first = mounted_with(&mut state, &["run-a"]);
        let (old_token, _) = files_token(&first);
        let again = reduce_browser(&mut state, BrowserAction::SelectRun("run-a".to_string()));
        let (new_token, _) = files_token(&again);
        assert_ne!(old_token, new_token);

        reduce_browser(
            &mut state,
            BrowserAction::FilesFailed {
                token: old_token,
                run_id: "run-a".to_string(),
                failure: BridgeFailure::new("late"),
            },
        );
        assert_eq!(state.files.error, None);
        assert!(state.files.is_loading());
    }

    #[test]
    fn files_and_diagnostics_settle_independently() {
        let mut state = browser();
        let effects = mounted_with(&mut state, &["run-a"]);
        let (files, _) = files_token(&effects);
        let diagnostics = diagnostics_token(&effects);

        reduce_browser(
            &mut state,
            BrowserAction::DiagnosticsFailed {
                token: diagnostics,
                run_id: "run-a".to_string(),
                failure: BridgeFailure::new("missing").with_status(404),
            },
        );
        assert!(state.files.is_loading());
        assert!(!state.diagnostics.is_loading());
        assert!(state.diagnostics.error.is_some());

        reduce_browser(
            &mut state,
            BrowserAction::FilesLoaded {
                token: files,
                run_id: "run-a".to_string(),
                files: vec![file("runs/a/out.json", Some("0123456789"))],
            },
        );
        let rows = state.file_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].short_sha.as_deref(), Some("01234567"));
        assert_eq!(
            rows[0].href.as_deref(),
            Some("http://artifacts.local/runs/a/out.json")
        );
    }

    #[test]
    fn stale_diagnostics_are_dropped() {
        let mut state = browser();
        let effects = mounted_with(&mut state, &["run-a", "run-b"]);
        let stale = diagnostics_token(&effects);
        reduce_browser(&mut state, BrowserAction::SelectRun("run-b".to_string()));
        reduce_browser(
            &mut state,
            BrowserAction::DiagnosticsLoaded {
                token: stale,
                run_id: "run-a".to_string(),
                payload: json!({"run": "a"}),
            },
        );
        assert_eq!(state.diagnostics.data, None);
    }

    fn loaded_with_file(state: &mut RunBrowserState) {
        let effects = mounted_with(state, &["run-a"]);
        let (token, _) = files_token(&effects);
        reduce_browser(
            state,
            BrowserAction::FilesLoaded {
                token,
                run_id: "run-a".to_string(),
                files: vec![file("runs/a/out.json", Some("abc123"))],
            },
        );
    }

    #[test]
    fn copy_feedback_reverts_after_its_timer() {
        let mut state = browser();
        loaded_with_file(&mut state);

        let effects = reduce_browser(
            &mut state,
            BrowserAction::CopyHash {
                path: "runs/a/out.json".to_string(),
            },
        );
        assert_eq!(
            effects,
            vec![BrowserEffect::CopyToClipboard {
                path: "runs/a/out.json".to_string(),
                text: "abc123".to_string(),
            }]
        );

        let effects = reduce_browser(
            &mut state,
            BrowserAction::CopyFinished {
                path: "runs/a/out.json".to_string(),
                result: Ok(()),
            },
        );
        let timer = TimerToken(1);
        assert_eq!(
            effects,
            vec![BrowserEffect::ScheduleTimer {
                token: timer,
                after_ms: 2_500,
            }]
        );
        assert_eq!(
            state.copy_feedback.as_ref().map(|feedback| feedback.outcome),
            Some(CopyOutcome::Copied)
        );

        reduce_browser(&mut state, BrowserAction::TimerFired(timer));
        assert_eq!(state.copy_feedback, None);
    }

    #[test]
    fn retriggered_copy_cancels_previous_timer() {
        let mut state = browser();
        loaded_with_file(&mut state);
        let finished = |result| BrowserAction::CopyFinished {
            path: "runs/a/out.json".to_string(),
            result,
        };

        reduce_browser(&mut state, finished(Ok(())));
        let effects = reduce_browser(&mut state, finished(Err("denied".to_string())));
        assert_eq!(
            effects,
            vec![
                BrowserEffect::CancelTimer(TimerToken(1)),
                BrowserEffect::ScheduleTimer {
                    token: TimerToken(2),
                    after_ms: 2_500,
                },
            ]
        );
        assert_eq!(
            state.copy_feedback.as_ref().map(|feedback| feedback.outcome.label()),
            Some("Copy failed")
        );

        // The superseded timer firing late leaves the new feedback alone.
        reduce_browser(&mut state, BrowserAction::TimerFired(TimerToken(1)));
        assert!(state.copy_feedback.is_some());
    }

    #[test]
    fn unmount_cancels_timer_and_ignores_late_responses() {
        let mut state = browser();
        let effects = mounted_with(&mut state, &["run-a"]);
        let (token, _) = files_token(&effects);
        reduce_browser(
            &mut state,
            BrowserAction::CopyFinished {
                path: "x".to_string(),
                result: Ok(()),
            },
        );

        let effects = reduce_browser(&mut state, BrowserAction::Unmount);
        assert_eq!(effects, vec![BrowserEffect::CancelTimer(TimerToken(1))]);
        assert_eq!(state.copy_feedback, None);

        reduce_browser(
            &mut state,
            BrowserAction::FilesLoaded {
                token,
                run_id: "run-a".to_string(),
                files: vec![file("late.json", None)],
            },
        );
        assert_eq!(state.files.data, None);
    }

    #[test]
    fn copy_without_hash_sets_notice() {
        let mut state = browser();
        let effects = mounted_with(&mut state, &["run-a"]);
        let (token, _) = files_token(&effects);
        reduce_browser(
            &mut state,
            BrowserAction::FilesLoaded {
                token,
                run_id: "run-a".to_string(),
                files: vec![file("plain.txt", None)],
            },
        );
        let effects = reduce_browser(
            &mut state,
            BrowserAction::CopyHash {
                path: "plain.txt".to_string(),
            },
        );
        assert!(effects.is_empty());
        assert!(state.notice.is_some());
    }

    #[test]
    fn history_picker_traps_and_restores_focus() {
        let mut state = browser();
        mounted_with(&mut state, &["run-a", "run-b"]);
        let invoker = FocusId(7);
        let items = vec![FocusId(20), FocusId(21), FocusId(22)];

        let effects = reduce_browser(
            &mut state,
            BrowserAction::OpenHistory {
                invoker: Some(invoker),
                focusables: items.clone(),
            },
        );
        assert_eq!(effects, vec![BrowserEffect::FocusElement(FocusId(20))]);

        let key = |state: &mut RunBrowserState, key| {
            reduce_browser(state, BrowserAction::PickerKey(key))
        };
        assert_eq!(
            key(&mut state, PickerKey::ShiftTab),
            vec![BrowserEffect::FocusElement(FocusId(22))]
        );
        assert_eq!(
            key(&mut state, PickerKey::Tab),
            vec![BrowserEffect::FocusElement(FocusId(20))]
        );
        assert_eq!(
            key(&mut state, PickerKey::Tab),
            vec![BrowserEffect::FocusElement(FocusId(21))]
        );
        assert_eq!(
            key(&mut state, PickerKey::Escape),
            vec![BrowserEffect::FocusElement(invoker)]
        );
        assert_eq!(state.picker, None);
        assert!(key(&mut state, PickerKey::Tab).is_empty());
    }

    #[test]
    fn picking_a_run_closes_picker_and_selects_it() {
        let mut state = browser();
        mounted_with(&mut state, &["run-a", "run-b"]);
        reduce_browser(
            &mut state,
            BrowserAction::OpenHistory {
                invoker: Some(FocusId(1)),
                focusables: vec![FocusId(2)],
            },
        );
        let effects = reduce_browser(&mut state, BrowserAction::PickRun("run-b".to_string()));
        assert_eq!(effects[0], BrowserEffect::FocusElement(FocusId(1)));
        assert_eq!(files_token(&effects).1, "run-b");
        assert_eq!(state.selected_run.as_deref(), Some("run-b"));
        assert_eq!(state.picker, None);
    }

    #[test]
    fn open_artifact_uses_linker_or_sets_notice() {
        let mut state = browser();
        let effects = reduce_browser(
            &mut state,
            BrowserAction::OpenArtifact {
                path: "runs/a/out.json".to_string(),
            },
        );
        assert_eq!(
            effects,
            vec![BrowserEffect::OpenUrl(
                "http://artifacts.local/runs/a/out.json".to_string()
            )]
        );

        let mut unlinked = RunBrowserState::new(&PanelConfig::default());
        let effects = reduce_browser(
            &mut unlinked,
            BrowserAction::OpenArtifact {
                path: "runs/a/out.json".to_string(),
            },
        );
        assert!(effects.is_empty());
        assert!(unlinked.notice.is_some());
    }
}
