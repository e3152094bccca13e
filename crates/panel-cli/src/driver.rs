//! Executes reducer effects against a bridge and feeds the outcomes back.
//!
//! Bridge calls run as tokio tasks and may complete in any order; the
//! reducers decide what a completion is still allowed to change.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use panel_bridge::with_deadline;
use panel_bridge::BridgeError;
use panel_bridge::ToolBridge;
use panel_core::contracts::ToolRunResult;
use panel_core::platform::Clipboard;
use panel_core::platform::FocusHost;
use panel_core::platform::TimerToken;
use panel_core::reduce;
use panel_core::run_browser::reduce_browser;
use panel_core::run_browser::BrowserAction;
use panel_core::run_browser::BrowserEffect;
use panel_core::run_browser::RunBrowserState;
use panel_core::PanelAction;
use panel_core::PanelConfig;
use panel_core::PanelEffect;
use panel_core::PanelState;
use panel_core::RuntimeAction;
use panel_core::TaskId;
use panel_core::TaskPhase;
use panel_core::ToolInvocation;
use tokio::task::AbortHandle;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::error;

use crate::host::HeadlessFocus;
use crate::host::SystemClipboard;

enum Completion {
    Panel(PanelAction),
    Browser(BrowserAction),
}

pub struct Driver {
    bridge: Arc<dyn ToolBridge>,
    call_timeout: Option<Duration>,
    clipboard: Box<dyn Clipboard + Send>,
    pub focus: HeadlessFocus,
    pub panel: PanelState,
    pub browser: RunBrowserState,
    /// URLs the browser asked to open, in order.
    pub opened: Vec<String>,
    frames: u64,
    calls: JoinSet<Completion>,
    timers: JoinSet<TimerToken>,
    timer_handles: HashMap<TimerToken, AbortHandle>,
}

impl Driver {
    pub fn new(bridge: Arc<dyn ToolBridge>, config: &PanelConfig) -> Self {
        Self {
            bridge,
            call_timeout: config.bridge.call_timeout_ms.map(Duration::from_millis),
            clipboard: Box::new(SystemClipboard),
            focus: HeadlessFocus::default(),
            panel: PanelState::new(config),
            browser: RunBrowserState::new(config),
            opened: Vec::new(),
            frames: 0,
            calls: JoinSet::new(),
            timers: JoinSet::new(),
            timer_handles: HashMap::new(),
        }
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn Clipboard + Send>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Frames the reducer asked for so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn pending_calls(&self) -> usize {
        self.calls.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.timer_handles.len()
    }

    pub fn dispatch(&mut self, action: impl Into<PanelAction>) {
        let effects = reduce(&mut self.panel, action.into());
        for effect in effects {
            match effect {
                PanelEffect::InvokeTool(invocation) => self.spawn_tool(invocation),
                PanelEffect::FetchToolNames => {
                    let bridge = Arc::clone(&self.bridge);
                    let deadline = self.call_timeout;
                    self.calls.spawn(async move {
                        let action = match with_deadline(deadline, bridge.fetch_tool_names()).await
                        {
                            Ok(names) => RuntimeAction::ToolNamesLoaded(names),
                            Err(err) => RuntimeAction::ToolNamesFailed(err.to_failure()),
                        };
                        Completion::Panel(action.into())
                    });
                }
                PanelEffect::RequestFrame => self.frames += 1,
            }
        }
    }

    pub fn dispatch_browser(&mut self, action: BrowserAction) {
        let mut queue = VecDeque::from([action]);
        while let Some(action) = queue.pop_front() {
            for effect in reduce_browser(&mut self.browser, action) {
                if let Some(follow_up) = self.run_browser_effect(effect) {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    /// Waits until no bridge call is outstanding, feeding every completion
    /// back through its reducer.
    pub async fn settle(&mut self) {
        while let Some(joined) = self.calls.join_next().await {
            match joined {
                Ok(Completion::Panel(action)) => self.dispatch(action),
                Ok(Completion::Browser(action)) => self.dispatch_browser(action),
                Err(err) => error!(%err, "bridge call task failed"),
            }
        }
    }

    /// Waits for every scheduled timer to fire. Cancelled timers are skipped.
    pub async fn run_timers(&mut self) {
        while let Some(joined) = self.timers.join_next().await {
            match joined {
                Ok(token) => {
                    self.timer_handles.remove(&token);
                    self.dispatch_browser(BrowserAction::TimerFired(token));
                }
                Err(err) if err.is_cancelled() => {}
                Err(err) => error!(%err, "timer task failed"),
            }
        }
    }

    fn spawn_tool(&mut self, invocation: ToolInvocation) {
        let ToolInvocation {
            task,
            tool,
            phase,
            payload,
        } = invocation;
        debug!(task = %task, tool = tool.as_str(), phase = phase.label(), "invoking tool");
        let bridge = Arc::clone(&self.bridge);
        let deadline = self.call_timeout;
        self.calls.spawn(async move {
            let result = with_deadline(deadline, bridge.run_tool(tool.as_str(), payload)).await;
            Completion::Panel(tool_completion(task, phase, result).into())
        });
    }

    fn run_browser_effect(&mut self, effect: BrowserEffect) -> Option<BrowserAction> {
        let bridge = Arc::clone(&self.bridge);
        let deadline = self.call_timeout;
        match effect {
            BrowserEffect::FetchRuns { token } => {
                self.calls.spawn(async move {
                    let action = match with_deadline(deadline, bridge.fetch_run_summaries()).await {
                        Ok(runs) => BrowserAction::RunsLoaded { token, runs },
                        Err(err) => BrowserAction::RunsFailed {
                            token,
                            failure: err.to_failure(),
                        },
                    };
                    Completion::Browser(action)
                });
                None
            }
            BrowserEffect::FetchFiles { token, run_id } => {
                self.calls.spawn(async move {
                    let result = with_deadline(deadline, bridge.fetch_run_files(&run_id)).await;
                    let action = match result {
                        Ok(files) => BrowserAction::FilesLoaded {
                            token,
                            run_id,
                            files,
                        },
                        Err(err) => BrowserAction::FilesFailed {
                            token,
                            run_id,
                            failure: err.to_failure(),
                        },
                    };
                    Completion::Browser(action)
                });
                None
            }
            BrowserEffect::FetchDiagnostics { token, run_id } => {
                self.calls.spawn(async move {
                    let result =
                        with_deadline(deadline, bridge.fetch_run_diagnostics(&run_id)).await;
                    let action = match result {
                        Ok(payload) => BrowserAction::DiagnosticsLoaded {
                            token,
                            run_id,
                            payload,
                        },
                        Err(err) => BrowserAction::DiagnosticsFailed {
                            token,
                            run_id,
                            failure: err.to_failure(),
                        },
                    };
                    Completion::Browser(action)
                });
                None
            }
            BrowserEffect::CopyToClipboard { path, text } => {
                let result = self.clipboard.write_text(&text);
                Some(BrowserAction::CopyFinished { path, result })
            }
            BrowserEffect::ScheduleTimer { token, after_ms } => {
                let handle = self.timers.spawn(async move {
                    tokio::time::sleep(Duration::from_millis(after_ms)).await;
                    token
                });
                self.timer_handles.insert(token, handle);
                None
            }
            BrowserEffect::CancelTimer(token) => {
                if let Some(handle) = self.timer_handles.remove(&token) {
                    handle.abort();
                }
                None
            }
            BrowserEffect::OpenUrl(url) => {
                self.opened.push(url);
                None
            }
            BrowserEffect::FocusElement(target) => {
                self.focus.focus(target);
                None
            }
        }
    }
}

fn tool_completion(
    task: TaskId,
    phase: TaskPhase,
    result: Result<ToolRunResult, BridgeError>,
) -> RuntimeAction {
    match (phase, result) {
        (TaskPhase::Plan, Ok(result)) => RuntimeAction::PlanSucceeded { task, result },
        (TaskPhase::Plan, Err(err)) => RuntimeAction::PlanFailed {
            task,
            failure: err.to_failure(),
        },
        (TaskPhase::Apply, Ok(result)) => RuntimeAction::ApplySucceeded { task, result },
        (TaskPhase::Apply, Err(err)) => RuntimeAction::ApplyFailed {
            task,
            failure: err.to_failure(),
        },
    }
}
