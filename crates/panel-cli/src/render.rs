//! Plain-text rendering of panel and run browser state.

use panel_core::artifacts::ArtifactRow;
use panel_core::config::ViewConfig;
use panel_core::contracts::BridgeFailure;
use panel_core::contracts::Diff;
use panel_core::contracts::DiffLineKind;
use panel_core::diff_model::json_model;
use panel_core::diff_model::split_model;
use panel_core::diff_model::unified_model;
use panel_core::diff_model::DiffViewMode;
use panel_core::diff_model::FoldState;
use panel_core::diff_model::SplitCell;
use panel_core::diff_model::SplitRow;
use panel_core::diff_model::UnifiedItem;
use panel_core::error_catalog::ErrorPresentation;
use panel_core::json_diff::JsonChange;
use panel_core::run_browser::RunBrowserState;
use panel_core::virtual_list::VirtualList;
use panel_core::PanelState;
use panel_core::ToolCatalog;
use panel_core::ToolRegistry;

const SPLIT_COLUMN: usize = 36;
const ACTIVITY_TAIL: usize = 8;

pub fn render_tools(catalog: &ToolCatalog) -> String {
    let mut lines = Vec::new();
    if let Some(failure) = &catalog.error {
        lines.push(render_failure(failure));
    }
    for spec in ToolRegistry::list() {
        if !catalog.is_selectable(spec.id) {
            continue;
        }
        let mode = if ToolRegistry::supports_apply(spec.id) {
            "apply"
        } else {
            "dry-run"
        };
        lines.push(format!("{:<20} {:<8} {}", spec.name, mode, spec.label));
        let inputs: Vec<&str> = spec
            .editable_properties()
            .map(|property| property.name)
            .collect();
        if !inputs.is_empty() {
            lines.push(format!("{:<20} inputs: {}", "", inputs.join(", ")));
        }
    }
    for name in &catalog.unrecognized {
        lines.push(format!("{name:<20} unavailable in this panel"));
    }
    lines.join("\n")
}

pub fn render_error(presentation: &ErrorPresentation) -> String {
    let descriptor = presentation.descriptor;
    let mut lines = vec![
        format!("{}: {}", descriptor.severity.label(), descriptor.title),
        format!("  {}", presentation.message),
        format!("  {}", descriptor.description),
        format!("  {}", descriptor.guidance),
    ];
    if let Some(metadata) = presentation.metadata_line() {
        lines.push(format!("  {metadata}"));
    }
    lines.join("\n")
}

fn render_failure(failure: &BridgeFailure) -> String {
    render_error(&ErrorPresentation::from_failure(failure))
}

/// The selected task: header, error or result, artifacts and recent activity.
pub fn render_panel(state: &PanelState, view: &ViewConfig) -> String {
    let Some(task) = state.selected() else {
        return "no task selected".to_string();
    };
    let mut lines = vec![format!(
        "{}  {}  [{}]  {}",
        task.id,
        task.label,
        task.status.label(),
        state.view.phase.label()
    )];
    if let Some(reason) = &task.denied_reason {
        lines.push(format!("denied: {reason}"));
    }
    if let Some(error) = &state.view.error {
        lines.push(format!("{} failed", error.phase.label()));
        lines.push(render_error(&error.presentation()));
    }

    if let Some(result) = &state.view.result {
        let diffs = result.diffs();
        if diffs.is_empty() {
            lines.push("no changes proposed".to_string());
        } else {
            lines.push(String::new());
            let selected = state.active_diff().map(|diff| diff.path.as_str());
            let rows = diffs
                .iter()
                .map(|diff| {
                    let summary = diff.counted_summary();
                    let marker = if Some(diff.path.as_str()) == selected {
                        '*'
                    } else {
                        ' '
                    };
                    format!(
                        "{marker} {:<40} +{} -{}",
                        diff.path, summary.additions, summary.deletions
                    )
                })
                .collect();
            lines.extend(windowed(rows, view.compact_threshold, view));
        }

        if let Some(diff) = state.active_diff() {
            let (mode, reason) = state.effective_diff_mode();
            lines.push(String::new());
            lines.push(format!("{} ({})", diff.path, mode.label()));
            if let Some(reason) = reason {
                lines.push(reason.to_string());
            }
            lines.extend(render_diff(diff, mode, &state.diff_view.folds));
        }

        let artifacts: Vec<ArtifactRow> = result
            .artifacts_detail
            .iter()
            .map(|artifact| ArtifactRow::from_descriptor(artifact, &state.linker))
            .collect();
        if !artifacts.is_empty() {
            lines.push(String::new());
            lines.push("artifacts".to_string());
            lines.extend(windowed(
                artifacts.iter().map(artifact_line).collect(),
                view.compact_threshold,
                view,
            ));
        }
    }

    if let Some(href) = &task.telemetry_href {
        lines.push(format!("telemetry: {href}"));
    }
    if let Some(incident) = &task.incident_id {
        lines.push(format!("incident: {incident}"));
    }

    let activity: Vec<String> = state
        .activity
        .for_task(task.id)
        .map(|entry| format!("  #{} {:<5} {}", entry.seq, entry.level.label(), entry.message))
        .collect();
    if !activity.is_empty() {
        lines.push(String::new());
        lines.push("activity".to_string());
        let skip = activity.len().saturating_sub(ACTIVITY_TAIL);
        lines.extend(activity.into_iter().skip(skip));
    }
    lines.join("\n")
}

pub fn render_diff(diff: &Diff, mode: DiffViewMode, folds: &FoldState) -> Vec<String> {
    match mode {
        DiffViewMode::Unified => unified_model(diff, folds)
            .iter()
            .map(unified_line)
            .collect(),
        DiffViewMode::Split => split_model(diff, folds).iter().map(split_line).collect(),
        DiffViewMode::Json => json_model(diff)
            .iter()
            .map(|row| {
                let sign = match row.change {
                    JsonChange::Added => '+',
                    JsonChange::Removed => '-',
                    JsonChange::Changed => '~',
                    JsonChange::Unchanged => ' ',
                };
                format!("{sign} {}{}: {}", "  ".repeat(row.depth), row.key, row.summary)
            })
            .collect(),
    }
}

fn sign(kind: DiffLineKind) -> char {
    match kind {
        DiffLineKind::Add => '+',
        DiffLineKind::Remove => '-',
        DiffLineKind::Context => ' ',
    }
}

fn line_number(line: Option<u32>) -> String {
    line.map(|line| line.to_string()).unwrap_or_default()
}

fn unified_line(item: &UnifiedItem) -> String {
    match item {
        UnifiedItem::Header { text, .. } => text.clone(),
        UnifiedItem::Line {
            kind,
            text,
            old_line,
            new_line,
            ..
        } => format!(
            "{:>4} {:>4} {}{}",
            line_number(*old_line),
            line_number(*new_line),
            sign(*kind),
            text
        ),
        UnifiedItem::Fold { hidden, .. } => format!("{:>10} {hidden} unchanged lines", "⋯"),
    }
}

fn split_cell(cell: &Option<SplitCell>) -> (String, String) {
    match cell {
        Some(cell) => (line_number(cell.line), cell.text.clone()),
        None => (String::new(), String::new()),
    }
}

fn split_line(row: &SplitRow) -> String {
    match row {
        SplitRow::Header { text, .. } => text.clone(),
        SplitRow::Line {
            kind, left, right, ..
        } => {
            let (old, left) = split_cell(left);
            let (new, right) = split_cell(right);
            format!(
                "{old:>4} {left:<width$.width$} {} {new:>4} {right}",
                sign(*kind),
                width = SPLIT_COLUMN
            )
        }
        SplitRow::Fold { hidden, .. } => format!("{:>10} {hidden} unchanged lines", "⋯"),
    }
}

fn artifact_line(row: &ArtifactRow) -> String {
    let mut line = format!(
        "  {:<24} {:<8} {:>9}  {}",
        row.name,
        row.short_sha.as_deref().unwrap_or("-"),
        row.size.as_deref().unwrap_or("-"),
        row.href.as_deref().unwrap_or(&row.path)
    );
    if let Some(purpose) = &row.purpose {
        line.push_str(&format!("  ({purpose})"));
    }
    line
}

/// Applies the list windowing rules to pre-rendered rows. A terminal never
/// scrolls, so only the first window is shown plus a count of the rest.
fn windowed(rows: Vec<String>, threshold: usize, view: &ViewConfig) -> Vec<String> {
    let list = VirtualList::new(view.row_height, threshold)
        .with_overscan(view.overscan)
        .with_default_viewport_height(view.default_viewport_height);
    let total = rows.len();
    let window = list.window(total);
    let end = window.range.end;
    let mut shown: Vec<String> = rows
        .into_iter()
        .skip(window.range.start)
        .take(window.range.len())
        .collect();
    if window.virtualized && end < total {
        shown.push(format!("  … {} more", total - end));
    }
    shown
}

pub fn render_runs(browser: &RunBrowserState, view: &ViewConfig) -> String {
    let mut lines = Vec::new();
    if let Some(failure) = &browser.runs.error {
        lines.push(render_failure(failure));
    }
    let runs = browser.run_list();
    if runs.is_empty() && browser.runs.error.is_none() {
        lines.push("no runs recorded".to_string());
    }
    for run in runs {
        let marker = if browser.selected_run.as_deref() == Some(run.id.as_str()) {
            '*'
        } else {
            ' '
        };
        let created = run
            .created_at
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        let files = run
            .file_count
            .map(|count| format!("{count} files"))
            .unwrap_or_default();
        lines.push(format!(
            "{marker} {:<8} {:<20} {:<8} {:<19} {}",
            run.id,
            run.tool.as_deref().unwrap_or("-"),
            run.status.as_deref().unwrap_or("-"),
            created,
            files
        ));
    }

    if let Some(selected) = browser.selected_summary() {
        lines.push(String::new());
        lines.push(format!("files of {}", selected.id));
        if let Some(failure) = &browser.files.error {
            lines.push(render_failure(failure));
        }
        let rows: Vec<String> = browser.file_rows().iter().map(artifact_line).collect();
        lines.extend(windowed(rows, view.file_listing_threshold, view));

        lines.push(String::new());
        lines.push("diagnostics".to_string());
        if let Some(failure) = &browser.diagnostics.error {
            lines.push(render_failure(failure));
        }
        if let Some(payload) = &browser.diagnostics.data {
            match serde_json::to_string_pretty(payload) {
                Ok(pretty) => lines.extend(pretty.lines().map(|line| format!("  {line}"))),
                Err(err) => lines.push(format!("  unreadable diagnostics: {err}")),
            }
        }
    }

    if let Some(feedback) = &browser.copy_feedback {
        lines.push(format!("{}: {}", feedback.outcome.label(), feedback.path));
    }
    if let Some(notice) = &browser.notice {
        lines.push(notice.clone());
    }
    lines.join("\n")
}
