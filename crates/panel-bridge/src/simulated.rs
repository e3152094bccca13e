use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use panel_core::artifacts::ArtifactLinker;
use panel_core::contracts::ArtifactDescriptor;
use panel_core::contracts::Diff;
use panel_core::contracts::DiffHunk;
use panel_core::contracts::DiffLine;
use panel_core::contracts::DiffLineKind;
use panel_core::contracts::InputMap;
use panel_core::contracts::PreviewPayload;
use panel_core::contracts::RunFile;
use panel_core::contracts::RunSummary;
use panel_core::contracts::StructuredSnapshot;
use panel_core::contracts::ToolRunResult;
use panel_core::tool_registry::ToolId;
use panel_core::tool_registry::ToolRegistry;
use panel_core::tool_registry::APPLY_PROPERTY;
use serde_json::json;
use serde_json::Value;
use sha2::Digest;
use sha2::Sha256;
use tokio::sync::Mutex;
use tracing::debug;

use crate::bridge::ToolBridge;
use crate::error::BridgeError;

/// Which calls an injected failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureTarget {
    ToolNames,
    Plan(ToolId),
    Apply(ToolId),
    RunFiles,
    RunDiagnostics,
}

#[derive(Debug)]
struct StoredRun {
    summary: RunSummary,
    files: Vec<RunFile>,
    diagnostics: Value,
}

#[derive(Debug, Default)]
struct Ledger {
    next_run: u64,
    runs: Vec<StoredRun>,
    failures: VecDeque<(FailureTarget, BridgeError)>,
}

impl Ledger {
    fn take_failure(&mut self, target: FailureTarget) -> Option<BridgeError> {
        let index = self
            .failures
            .iter()
            .position(|(candidate, _)| *candidate == target)?;
        self.failures.remove(index).map(|(_, err)| err)
    }
}

/// In-memory bridge with deterministic previews. Every `run_tool` call is
/// recorded as a run so the history browser has something to show.
pub struct SimulatedBridge {
    tools: Vec<String>,
    linker: ArtifactLinker,
    latency: Duration,
    ledger: Mutex<Ledger>,
}

impl SimulatedBridge {
    pub fn new(base_url: Option<String>) -> Self {
        Self {
            tools: ToolRegistry::list()
                .iter()
                .map(|spec| spec.name.to_string())
                .collect(),
            linker: ArtifactLinker::new(base_url),
            latency: Duration::ZERO,
            ledger: Mutex::new(Ledger {
                next_run: 1,
                ..Ledger::default()
            }),
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Extra names reported by `fetch_tool_names`, e.g. tools this panel
    /// build has no descriptor for.
    pub fn with_extra_tools(mut self, names: &[&str]) -> Self {
        self.tools.extend(names.iter().map(|name| name.to_string()));
        self
    }

    /// The next call matching `target` fails with `err`.
    pub async fn fail_next(&self, target: FailureTarget, err: BridgeError) {
        self.ledger.lock().await.failures.push_back((target, err));
    }

    pub async fn run_count(&self) -> usize {
        self.ledger.lock().await.runs.len()
    }

    async fn pause(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }
}

#[async_trait]
impl ToolBridge for SimulatedBridge {
    async fn fetch_tool_names(&self) -> Result<Vec<String>, BridgeError> {
        self.pause().await;
        if let Some(err) = self.ledger.lock().await.take_failure(FailureTarget::ToolNames) {
            return Err(err);
        }
        Ok(self.tools.clone())
    }

    async fn run_tool(&self, name: &str, input: InputMap) -> Result<ToolRunResult, BridgeError> {
        self.pause().await;
        let Some(tool) = ToolId::parse(name) else {
            return Err(BridgeError::tool(
                format!("no tool named `{name}`"),
                "UNKNOWN_TOOL",
                404,
            ));
        };
        validate_input(tool, &input)?;

        let apply = input
            .get(APPLY_PROPERTY)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        if apply && !ToolRegistry::supports_apply(tool) {
            return Err(BridgeError::tool(
                format!("{name} is read-only"),
                "READ_ONLY_TOOL",
                403,
            ));
        }

        let mut ledger = self.ledger.lock().await;
        let target = if apply {
            FailureTarget::Apply(tool)
        } else {
            FailureTarget::Plan(tool)
        };
        if let Some(err) = ledger.take_failure(target) {
            return Err(err);
        }

        let run_id = format!("run-{}", ledger.next_run);
        ledger.next_run += 1;
        let mode = if apply { "apply" } else { "plan" };
        debug!(tool = name, run = %run_id, mode, "simulated tool run");

        let diffs = preview_diffs(tool, &input);
        let run_dir = format!("runs/{run_id}");
        let mut artifacts = vec![
            descriptor(&run_dir, "transcript.jsonl", "transcript", &input),
            descriptor(&run_dir, "bundle/index.json", "bundle index", &input),
            descriptor(&run_dir, "diagnostics.json", "diagnostics", &input),
        ];
        artifacts.extend(
            diffs
                .iter()
                .map(|diff| descriptor(&run_dir, &diff.path, "output", &input)),
        );

        let files: Vec<RunFile> = artifacts
            .iter()
            .map(|artifact| RunFile {
                path: artifact.path.clone(),
                name: artifact.name.clone(),
                purpose: artifact.purpose.clone(),
                sha256: artifact.sha256.clone(),
                size_bytes: artifact.size_bytes,
            })
            .collect();
        let diagnostics = json!({
            "runId": run_id,
            "tool": name,
            "mode": mode,
            "latencyMs": self.latency.as_millis() as u64,
            "input": Value::Object(input.clone()),
            "diffCount": diffs.len(),
        });
        ledger.runs.push(StoredRun {
            summary: RunSummary {
                id: run_id.clone(),
                tool: Some(name.to_string()),
                created_at: Some(Utc::now()),
                status: Some(if apply { "applied" } else { "planned" }.to_string()),
                file_count: Some(files.len() as u32),
            },
            files,
            diagnostics,
        });

        Ok(ToolRunResult {
            artifacts: artifacts.iter().map(|artifact| artifact.path.clone()).collect(),
            artifacts_detail: artifacts,
            transcript_path: Some(format!("{run_dir}/transcript.jsonl")),
            bundle_index_path: Some(format!("{run_dir}/bundle/index.json")),
            diagnostics_path: Some(format!("{run_dir}/diagnostics.json")),
            preview: Some(PreviewPayload { diffs }),
            incident_id: None,
        })
    }

    async fn fetch_run_summaries(&self) -> Result<Vec<RunSummary>, BridgeError> {
        self.pause().await;
        let ledger = self.ledger.lock().await;
        Ok(ledger
            .runs
            .iter()
            .rev()
            .map(|run| run.summary.clone())
            .collect())
    }

    async fn fetch_run_files(&self, run_id: &str) -> Result<Vec<RunFile>, BridgeError> {
        self.pause().await;
        let mut ledger = self.ledger.lock().await;
        if let Some(err) = ledger.take_failure(FailureTarget::RunFiles) {
            return Err(err);
        }
        ledger
            .runs
            .iter()
            .find(|run| run.summary.id == run_id)
            .map(|run| run.files.clone())
            .ok_or_else(|| BridgeError::tool(format!("no run `{run_id}`"), "NOT_FOUND", 404))
    }

    async fn fetch_run_diagnostics(&self, run_id: &str) -> Result<Value, BridgeError> {
        self.pause().await;
        let mut ledger = self.ledger.lock().await;
        if let Some(err) = ledger.take_failure(FailureTarget::RunDiagnostics) {
            return Err(err);
        }
        ledger
            .runs
            .iter()
            .find(|run| run.summary.id == run_id)
            .map(|run| run.diagnostics.clone())
            .ok_or_else(|| BridgeError::tool(format!("no run `{run_id}`"), "NOT_FOUND", 404))
    }

    fn artifact_href(&self, path: &str) -> Option<String> {
        self.linker.href(path)
    }
}

fn validate_input(tool: ToolId, input: &InputMap) -> Result<(), BridgeError> {
    let spec = ToolRegistry::get(tool);
    for key in input.keys() {
        if spec.property(key).is_none() {
            return Err(BridgeError::tool(
                format!("{} does not accept `{key}`", spec.name),
                "SCHEMA_INPUT",
                400,
            ));
        }
    }
    Ok(())
}

fn string_input<'a>(input: &'a InputMap, key: &str, fallback: &'a str) -> &'a str {
    input
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback)
}

fn list_input(input: &InputMap, key: &str) -> Vec<String> {
    input
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn preview_diffs(tool: ToolId, input: &InputMap) -> Vec<Diff> {
    match tool {
        ToolId::ContentRefresh => {
            let collection = string_input(input, "collection", "docs");
            let mut locales = list_input(input, "locales");
            if locales.is_empty() {
                locales.push("en-US".to_string());
            }
            let drafts = input
                .get("includeDrafts")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            let before = json!({
                "collection": collection,
                "locales": ["en-US"],
                "entries": [
                    {"slug": "getting-started", "title": "Getting started", "status": "published"},
                    {"slug": "install", "title": "Install", "status": "published"},
                    {"slug": "theming", "title": "Theming", "status": "published"},
                ],
                "includeDrafts": false,
            });
            let mut entries = vec![
                json!({"slug": "getting-started", "title": "Getting started", "status": "published"}),
                json!({"slug": "install", "title": "Installation", "status": "published"}),
                json!({"slug": "theming", "title": "Theming", "status": "published"}),
            ];
            if drafts {
                entries.push(json!({"slug": "roadmap", "title": "Roadmap", "status": "draft"}));
            }
            let after = json!({
                "collection": collection,
                "locales": locales,
                "entries": entries,
                "includeDrafts": drafts,
            });
            vec![structured_diff(
                format!("content/{collection}.json"),
                before,
                after,
            )]
        }
        ToolId::BillingPlanSync => {
            let currency = string_input(input, "currency", "USD");
            let round_to = input.get("roundTo").and_then(Value::as_f64).unwrap_or(0.01);
            let price = |amount: f64| round_price(amount, round_to);
            let before = json!({
                "currency": "USD",
                "plans": {
                    "starter": {"monthly": 9.0, "seats": 1},
                    "team": {"monthly": 29.0, "seats": 10},
                    "legacy": {"monthly": 19.0, "seats": 5},
                },
            });
            let after = json!({
                "currency": currency,
                "plans": {
                    "starter": {"monthly": price(9.0), "seats": 1},
                    "team": {"monthly": price(32.5), "seats": 10},
                    "enterprise": {"monthly": price(99.99), "seats": 100},
                },
            });
            vec![structured_diff("billing/plans.json".to_string(), before, after)]
        }
        ToolId::BrandTokenUpdate => {
            let theme = string_input(input, "theme", "light");
            let mut scopes = list_input(input, "scopes");
            if scopes.is_empty() {
                scopes.push("color".to_string());
            }
            let before = json!({
                "color": {"primary": "#1f6feb", "accent": "#8250df", "surface": "#ffffff"},
                "typography": {"body": "Inter 14/20", "heading": "Inter 20/28"},
                "spacing": {"sm": 4, "md": 8, "lg": 16},
                "radius": {"sm": 2, "md": 4},
            });
            let mut after = before.clone();
            for scope in &scopes {
                match scope.as_str() {
                    "color" => after["color"]["primary"] = json!("#0969da"),
                    "typography" => after["typography"]["body"] = json!("Inter 15/22"),
                    "spacing" => after["spacing"]["xl"] = json!(32),
                    "radius" => after["radius"]["lg"] = json!(8),
                    _ => {}
                }
            }
            vec![structured_diff(format!("tokens/{theme}.json"), before, after)]
        }
        ToolId::ChangelogDraft => {
            let since = string_input(input, "since", "last release");
            let labels = list_input(input, "labels");
            let released: Vec<String> = [
                "## 2.3.0",
                "",
                "- Tabs: keyboard navigation",
                "- Tooltip: respect reduced motion",
                "- Table: sticky header",
                "- Menu: typeahead",
                "- Badge: new `subtle` tone",
                "- Avatar: initials fallback",
            ]
            .iter()
            .map(|line| line.to_string())
            .collect();

            let mut before = vec!["# Changelog".to_string(), String::new()];
            before.extend(released.iter().cloned());

            let mut after = vec![
                "# Changelog".to_string(),
                String::new(),
                format!("## Unreleased (since {since})"),
                String::new(),
                "- Button: add `loading` state".to_string(),
                "- Dialog: trap focus while open".to_string(),
            ];
            after.extend(labels.iter().map(|label| format!("- Label `{label}` included")));
            after.push(String::new());
            after.extend(released);
            vec![text_diff("CHANGELOG.md".to_string(), &before, &after)]
        }
        ToolId::StoryAudit => Vec::new(),
        ToolId::TokenDriftReport => {
            let threshold = input
                .get("threshold")
                .and_then(Value::as_f64)
                .unwrap_or(0.05);
            let before = vec![
                "# Token drift".to_string(),
                String::new(),
                "No report yet.".to_string(),
            ];
            let after = vec![
                "# Token drift".to_string(),
                String::new(),
                format!("Threshold: {threshold}"),
                "- Card.padding uses 12px (spacing.md is 8px)".to_string(),
                "- Alert.color uses #d73a49 (no matching token)".to_string(),
            ];
            vec![text_diff("reports/token-drift.md".to_string(), &before, &after)]
        }
    }
}

fn round_price(amount: f64, step: f64) -> f64 {
    if step <= 0.0 || !step.is_finite() {
        return amount;
    }
    let rounded = (amount / step).round() * step;
    (rounded * 100.0).round() / 100.0
}

fn structured_diff(path: String, before: Value, after: Value) -> Diff {
    let lines = |value: &Value| -> Vec<String> {
        serde_json::to_string_pretty(value)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    };
    let mut diff = text_diff(path, &lines(&before), &lines(&after));
    diff.structured = Some(StructuredSnapshot::Json {
        before: Some(before),
        after: Some(after),
    });
    diff
}

/// Single-hunk line diff over the longest common subsequence.
fn text_diff(path: String, before: &[String], after: &[String]) -> Diff {
    let (n, m) = (before.len(), after.len());
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if before[i] == after[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut lines = Vec::with_capacity(n.max(m));
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && before[i] == after[j] {
            lines.push(DiffLine::new(DiffLineKind::Context, before[i].as_str()));
            i += 1;
            j += 1;
        } else if j < m && (i == n || lcs[i][j + 1] >= lcs[i + 1][j]) {
            lines.push(DiffLine::new(DiffLineKind::Add, after[j].as_str()));
            j += 1;
        } else {
            lines.push(DiffLine::new(DiffLineKind::Remove, before[i].as_str()));
            i += 1;
        }
    }

    let hunks = if lines.iter().all(|line| line.kind == DiffLineKind::Context) {
        Vec::new()
    } else {
        vec![DiffHunk {
            header: format!("@@ -1,{n} +1,{m} @@"),
            lines,
        }]
    };
    Diff {
        path,
        summary: None,
        hunks,
        structured: None,
    }
}

fn descriptor(run_dir: &str, relative: &str, purpose: &str, input: &InputMap) -> ArtifactDescriptor {
    let path = format!("{run_dir}/{relative}");
    let seed = format!("{path}:{}", Value::Object(input.clone()));
    ArtifactDescriptor {
        name: relative.rsplit('/').next().unwrap_or(relative).to_string(),
        sha256: Some(simulated_digest(&seed)),
        size_bytes: Some(256 + (seed.len() as u64 * 7) % 4096),
        purpose: Some(purpose.to_string()),
        path,
    }
}

/// SHA-256 hex of the seed, so identical inputs give identical digests.
fn simulated_digest(seed: &str) -> String {
    format!("{:x}", Sha256::digest(seed.as_bytes()))
}
