use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

/// Input payload of a tool invocation, keyed by schema property name.
pub type InputMap = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffLineKind {
    Context,
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffLine {
    #[serde(rename = "type")]
    pub kind: DiffLineKind,
    pub value: String,
}

impl DiffLine {
    pub fn new(kind: DiffLineKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffHunk {
    pub header: String,
    #[serde(default)]
    pub lines: Vec<DiffLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DiffSummary {
    pub additions: u32,
    pub deletions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StructuredSnapshot {
    Json {
        #[serde(default)]
        before: Option<Value>,
        #[serde(default)]
        after: Option<Value>,
    },
}

/// One file-level change proposed by a plan. Never mutated after it arrives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diff {
    pub path: String,
    #[serde(default)]
    pub summary: Option<DiffSummary>,
    #[serde(default)]
    pub hunks: Vec<DiffHunk>,
    #[serde(default)]
    pub structured: Option<StructuredSnapshot>,
}

impl Diff {
    /// Reported summary, or one counted from the hunks when the tool left it out.
    pub fn counted_summary(&self) -> DiffSummary {
        if let Some(summary) = self.summary {
            return summary;
        }
        let mut summary = DiffSummary::default();
        for line in self.hunks.iter().flat_map(|hunk| hunk.lines.iter()) {
            match line.kind {
                DiffLineKind::Add => summary.additions += 1,
                DiffLineKind::Remove => summary.deletions += 1,
                DiffLineKind::Context => {}
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDescriptor {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviewPayload {
    #[serde(default)]
    pub diffs: Vec<Diff>,
}

/// Successful result of a `runTool` call, for either the plan or the apply phase.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRunResult {
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub artifacts_detail: Vec<ArtifactDescriptor>,
    #[serde(default)]
    pub transcript_path: Option<String>,
    #[serde(default)]
    pub bundle_index_path: Option<String>,
    #[serde(default)]
    pub diagnostics_path: Option<String>,
    #[serde(default)]
    pub preview: Option<PreviewPayload>,
    #[serde(default)]
    pub incident_id: Option<String>,
}

impl ToolRunResult {
    pub fn diffs(&self) -> &[Diff] {
        self.preview
            .as_ref()
            .map(|preview| preview.diffs.as_slice())
            .unwrap_or(&[])
    }
}

/// A failed bridge call, carried as data through the reducer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeFailure {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub incident_id: Option<String>,
    #[serde(default)]
    pub details: Option<Value>,
}

impl BridgeFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_incident(mut self, incident_id: impl Into<String>) -> Self {
        self.incident_id = Some(incident_id.into());
        self
    }

    pub fn telemetry_href(&self) -> Option<&str> {
        self.details
            .as_ref()
            .and_then(|details| details.get("telemetryHref"))
            .and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub id: String,
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub file_count: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFile {
    pub path: String,
    pub name: String,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub sha256: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn tool_run_result_reads_bridge_payload() {
        let raw = json!({
            "artifacts": ["out/brand.json"],
            "artifactsDetail": [
                {"path": "out/brand.json", "name": "brand.json", "sha256": "ABCDEF0123456789", "sizeBytes": 2048}
            ],
            "diagnosticsPath": "runs/7/diagnostics.json",
            "preview": {
                "diffs": [{
                    "path": "tokens/brand.json",
                    "hunks": [{"header": "@@ -1,2 +1,2 @@", "lines": [
                        {"type": "context", "value": "{"},
                        {"type": "remove", "value": "  \"primary\": \"#000\""},
                        {"type": "add", "value": "  \"primary\": \"#111\""}
                    ]}],
                    "structured": {"type": "json", "before": {"primary": "#000"}, "after": {"primary": "#111"}}
                }]
            },
            "incidentId": "inc-9"
        });

        let result: ToolRunResult = serde_json::from_value(raw).expect("decode");
        assert_eq!(result.artifacts_detail[0].size_bytes, Some(2048));
        assert_eq!(result.diffs().len(), 1);
        assert_eq!(
            result.diffs()[0].counted_summary(),
            DiffSummary {
                additions: 1,
                deletions: 1
            }
        );
        assert!(matches!(
            result.diffs()[0].structured,
            Some(StructuredSnapshot::Json { .. })
        ));
        assert_eq!(result.incident_id.as_deref(), Some("inc-9"));
    }

    #[test]
    fn failure_exposes_telemetry_link_from_details() {
        let failure = BridgeFailure {
            details: Some(json!({"telemetryHref": "https://telemetry.local/inc-1"})),
            ..BridgeFailure::new("boom")
        };
        assert_eq!(
            failure.telemetry_href(),
            Some("https://telemetry.local/inc-1")
        );
        assert_eq!(BridgeFailure::new("boom").telemetry_href(), None);
    }
}
