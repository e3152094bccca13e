use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::contracts::Diff;
use crate::contracts::DiffHunk;
use crate::contracts::DiffLineKind;
use crate::contracts::StructuredSnapshot;
use crate::json_diff::diff_json;
use crate::json_diff::JsonDiffRow;

/// Context runs at least this long collapse into a single fold.
pub const FOLD_THRESHOLD: usize = 6;

pub const JSON_UNAVAILABLE_REASON: &str =
    "This diff has no structured JSON snapshot, showing the line diff instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffViewMode {
    #[default]
    Unified,
    Split,
    Json,
}

impl DiffViewMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Unified => "unified",
            Self::Split => "split",
            Self::Json => "json",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "unified" | "u" => Some(Self::Unified),
            "split" | "s" | "side-by-side" => Some(Self::Split),
            "json" | "j" | "tree" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Effective mode for `diff`, with the reason when JSON had to fall back.
pub fn resolve_view_mode(
    requested: DiffViewMode,
    diff: &Diff,
) -> (DiffViewMode, Option<&'static str>) {
    match (requested, &diff.structured) {
        (DiffViewMode::Json, Some(StructuredSnapshot::Json { .. })) => (DiffViewMode::Json, None),
        (DiffViewMode::Json, None) => (DiffViewMode::Unified, Some(JSON_UNAVAILABLE_REASON)),
        (mode, _) => (mode, None),
    }
}

/// Identifies one foldable context block: hunk index plus the block's ordinal
/// among the foldable blocks of that hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FoldKey {
    pub hunk: usize,
    pub block: usize,
}

/// Expanded folds. Every block starts collapsed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FoldState {
    expanded: BTreeSet<FoldKey>,
}

impl FoldState {
    pub fn is_expanded(&self, key: FoldKey) -> bool {
        self.expanded.contains(&key)
    }

    pub fn toggle(&mut self, key: FoldKey) {
        if !self.expanded.remove(&key) {
            self.expanded.insert(key);
        }
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnifiedItem {
    Header {
        hunk: usize,
        text: String,
    },
    Line {
        hunk: usize,
        kind: DiffLineKind,
        text: String,
        old_line: Option<u32>,
        new_line: Option<u32>,
        fold: Option<FoldKey>,
    },
    Fold {
        key: FoldKey,
        hidden: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitCell {
    pub line: Option<u32>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplitRow {
    Header {
        hunk: usize,
        text: String,
    },
    Line {
        hunk: usize,
        kind: DiffLineKind,
        left: Option<SplitCell>,
        right: Option<SplitCell>,
        fold: Option<FoldKey>,
    },
    Fold {
        key: FoldKey,
        hidden: usize,
    },
}

/// Old/new start lines from a `@@ -a,b +c,d @@` header.
pub fn parse_hunk_header(header: &str) -> Option<(u32, u32)> {
    static HEADER: OnceLock<Option<Regex>> = OnceLock::new();
    let re = HEADER
        .get_or_init(|| Regex::new(r"^@@ -(\d+)(?:,\d+)? \+(\d+)(?:,\d+)? @@").ok())
        .as_ref()?;
    let captures = re.captures(header.trim_start())?;
    let old = captures.get(1)?.as_str().parse().ok()?;
    let new = captures.get(2)?.as_str().parse().ok()?;
    Some((old, new))
}

/// Segment of one hunk: a single line, or a run of context lines long enough to fold.
enum Segment {
    Line(usize),
    FoldableRun { start: usize, len: usize, block: usize },
}

fn segments(hunk: &DiffHunk) -> Vec<Segment> {
    let mut out = Vec::new();
    let mut block = 0;
    let mut idx = 0;
    let lines = &hunk.lines;
    while idx < lines.len() {
        if lines[idx].kind != DiffLineKind::Context {
            out.push(Segment::Line(idx));
            idx += 1;
            continue;
        }
        let start = idx;
        while idx < lines.len() && lines[idx].kind == DiffLineKind::Context {
            idx += 1;
        }
        let len = idx - start;
        if len >= FOLD_THRESHOLD {
            out.push(Segment::FoldableRun { start, len, block });
            block += 1;
        } else {
            out.extend((start..idx).map(Segment::Line));
        }
    }
    out
}

/// Old/new line numbers for every line of the hunk, in order.
fn number_lines(hunk: &DiffHunk) -> Vec<(Option<u32>, Option<u32>)> {
    let Some((mut old, mut new)) = parse_hunk_header(&hunk.header) else {
        return vec![(None, None); hunk.lines.len()];
    };
    hunk.lines
        .iter()
        .map(|line| match line.kind {
            DiffLineKind::Context => {
                let numbers = (Some(old), Some(new));
                old += 1;
                new += 1;
                numbers
            }
            DiffLineKind::Remove => {
                let numbers = (Some(old), None);
                old += 1;
                numbers
            }
            DiffLineKind::Add => {
                let numbers = (None, Some(new));
                new += 1;
                numbers
            }
        })
        .collect()
}

pub fn unified_model(diff: &Diff, folds: &FoldState) -> Vec<UnifiedItem> {
    let mut items = Vec::new();
    for (hunk_idx, hunk) in diff.hunks.iter().enumerate() {
        items.push(UnifiedItem::Header {
            hunk: hunk_idx,
            text: hunk.header.clone(),
        });
        let numbers = number_lines(hunk);
        let line_item = |idx: usize, fold: Option<FoldKey>| {
            let line = &hunk.lines[idx];
            UnifiedItem::Line {
                hunk: hunk_idx,
                kind: line.kind,
                text: line.value.clone(),
                old_line: numbers[idx].0,
                new_line: numbers[idx].1,
                fold,
            }
        };
        for segment in segments(hunk) {
            match segment {
                Segment::Line(idx) => items.push(line_item(idx, None)),
                Segment::FoldableRun { start, len, block } => {
                    let key = FoldKey {
                        hunk: hunk_idx,
                        block,
                    };
                    if folds.is_expanded(key) {
                        items.extend((start..start + len).map(|idx| line_item(idx, Some(key))));
                    } else {
                        items.push(UnifiedItem::Fold { key, hidden: len });
                    }
                }
            }
        }
    }
    items
}

pub fn split_model(diff: &Diff, folds: &FoldState) -> Vec<SplitRow> {
    let mut rows = Vec::new();
    for (hunk_idx, hunk) in diff.hunks.iter().enumerate() {
        rows.push(SplitRow::Header {
            hunk: hunk_idx,
            text: hunk.header.clone(),
        });
        let numbers = number_lines(hunk);
        let line_row = |idx: usize, fold: Option<FoldKey>| {
            let line = &hunk.lines[idx];
            let (old_line, new_line) = numbers[idx];
            let left = SplitCell {
                line: old_line,
                text: line.value.clone(),
            };
            let right = SplitCell {
                line: new_line,
                text: line.value.clone(),
            };
            let (left, right) = match line.kind {
                DiffLineKind::Add => (None, Some(right)),
                DiffLineKind::Remove => (Some(left), None),
                DiffLineKind::Context => (Some(left), Some(right)),
            };
            SplitRow::Line {
                hunk: hunk_idx,
                kind: line.kind,
                left,
                right,
                fold,
            }
        };
        for segment in segments(hunk) {
            match segment {
                Segment::Line(idx) => rows.push(line_row(idx, None)),
                Segment::FoldableRun { start, len, block } => {
                    let key = FoldKey {
                        hunk: hunk_idx,
                        block,
                    };
                    if folds.is_expanded(key) {
                        rows.extend((start..start + len).map(|idx| line_row(idx, Some(key))));
                    } else {
                        rows.push(SplitRow::Fold { key, hidden: len });
                    }
                }
            }
        }
    }
    rows
}

/// Empty when the diff carries no structured JSON snapshot.
pub fn json_model(diff: &Diff) -> Vec<JsonDiffRow> {
    match &diff.structured {
        Some(StructuredSnapshot::Json { before, after }) => diff_json(before.as_ref(), after.as_ref()),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::contracts::DiffLine;

    fn hunk(header: &str, lines: &[(DiffLineKind, &str)]) -> DiffHunk {
        DiffHunk {
            header: header.to_string(),
            lines: lines
                .iter()
                .map(|(kind, value)| DiffLine::new(*kind, *value))
                .collect(),
        }
    }

    fn diff(hunks: Vec<DiffHunk>) -> Diff {
        Diff {
            path: "tokens/brand.json".to_string(),
            summary: None,
            hunks,
            structured: None,
        }
    }

    fn context_run(n: usize) -> Vec<(DiffLineKind, String)> {
        (0..n)
            .map(|idx| (DiffLineKind::Context, format!("ctx {idx}")))
            .collect()
    }

    fn hunk_with_context(n: usize) -> DiffHunk {
        let mut lines = vec![(DiffLineKind::Remove, "old".to_string())];
        lines.extend(context_run(n));
        lines.push((DiffLineKind::Add, "new".to_string()));
        DiffHunk {
            header: "@@ -1,1 +1,1 @@".to_string(),
            lines: lines
                .into_iter()
                .map(|(kind, value)| DiffLine::new(kind, value))
                .collect(),
        }
    }

    fn unified_counts(items: &[UnifiedItem]) -> (usize, usize) {
        let folds = items
            .iter()
            .filter(|item| matches!(item, UnifiedItem::Fold { .. }))
            .count();
        let context = items
            .iter()
            .filter(|item| {
                matches!(
                    item,
                    UnifiedItem::Line {
                        kind: DiffLineKind::Context,
                        ..
                    }
                )
            })
            .count();
        (folds, context)
    }

    fn split_counts(rows: &[SplitRow]) -> (usize, usize) {
        let folds = rows
            .iter()
            .filter(|row| matches!(row, SplitRow::Fold { .. }))
            .count();
        let context = rows
            .iter()
            .filter(|row| {
                matches!(
                    row,
                    SplitRow::Line {
                        kind: DiffLineKind::Context,
                        ..
                    }
                )
            })
            .count();
        (folds, context)
    }

    #[test]
    fn empty_diff_yields_empty_models() {
        let diff = diff(Vec::new());
        let folds = FoldState::default();
        assert!(unified_model(&diff, &folds).is_empty());
        assert!(split_model(&diff, &folds).is_empty());
        assert!(json_model(&diff).is_empty());
    }

    #[test]
    fn short_context_runs_never_fold() {
        let diff = diff(vec![hunk_with_context(FOLD_THRESHOLD - 1)]);
        let items = unified_model(&diff, &FoldState::default());
        assert_eq!(unified_counts(&items), (0, FOLD_THRESHOLD - 1));
    }

    #[test]
    fn fold_toggle_round_trips_for_every_long_run() {
        for n in FOLD_THRESHOLD..FOLD_THRESHOLD + 10 {
            let diff = diff(vec![hunk_with_context(n)]);
            let key = FoldKey { hunk: 0, block: 0 };
            let mut folds = FoldState::default();

            let collapsed_unified = unified_model(&diff, &folds);
            let collapsed_split = split_model(&diff, &folds);
            assert_eq!(unified_counts(&collapsed_unified), (1, 0));
            assert_eq!(split_counts(&collapsed_split), (1, 0));
            assert!(collapsed_unified.contains(&UnifiedItem::Fold { key, hidden: n }));

            folds.toggle(key);
            assert_eq!(unified_counts(&unified_model(&diff, &folds)), (0, n));
            assert_eq!(split_counts(&split_model(&diff, &folds)), (0, n));

            folds.toggle(key);
            assert_eq!(unified_model(&diff, &folds), collapsed_unified);
            assert_eq!(split_model(&diff, &folds), collapsed_split);
        }
    }

    #[test]
    fn fold_keys_are_per_hunk_and_block() {
        let mut lines = context_run(7);
        lines.push((DiffLineKind::Add, "added".to_string()));
        lines.extend(context_run(8));
        let first = DiffHunk {
            header: "@@ -1,15 +1,16 @@".to_string(),
            lines: lines
                .into_iter()
                .map(|(kind, value)| DiffLine::new(kind, value))
                .collect(),
        };
        let diff = diff(vec![first, hunk_with_context(6)]);

        let mut folds = FoldState::default();
        folds.toggle(FoldKey { hunk: 0, block: 1 });
        let items = unified_model(&diff, &folds);
        let fold_keys: Vec<FoldKey> = items
            .iter()
            .filter_map(|item| match item {
                UnifiedItem::Fold { key, .. } => Some(*key),
                _ => None,
            })
            .collect();
        assert_eq!(
            fold_keys,
            vec![FoldKey { hunk: 0, block: 0 }, FoldKey { hunk: 1, block: 0 }]
        );
        assert_eq!(unified_counts(&items).1, 8);
    }

    #[test]
    fn split_rows_place_changes_on_their_side() {
        let diff = diff(vec![hunk(
            "@@ -10,2 +10,2 @@",
            &[
                (DiffLineKind::Context, "same"),
                (DiffLineKind::Remove, "gone"),
                (DiffLineKind::Add, "fresh"),
            ],
        )]);
        let rows = split_model(&diff, &FoldState::default());
        assert_eq!(
            rows,
            vec![
                SplitRow::Header {
                    hunk: 0,
                    text: "@@ -10,2 +10,2 @@".to_string()
                },
                SplitRow::Line {
                    hunk: 0,
                    kind: DiffLineKind::Context,
                    left: Some(SplitCell {
                        line: Some(10),
                        text: "same".to_string()
                    }),
                    right: Some(SplitCell {
                        line: Some(10),
                        text: "same".to_string()
                    }),
                    fold: None,
                },
                SplitRow::Line {
                    hunk: 0,
                    kind: DiffLineKind::Remove,
                    left: Some(SplitCell {
                        line: Some(11),
                        text: "gone".to_string()
                    }),
                    right: None,
                    fold: None,
                },
                SplitRow::Line {
                    hunk: 0,
                    kind: DiffLineKind::Add,
                    left: None,
                    right: Some(SplitCell {
                        line: Some(11),
                        text: "fresh".to_string()
                    }),
                    fold: None,
                },
            ]
        );
    }

    #[test]
    fn unparsable_header_leaves_lines_unnumbered() {
        assert_eq!(parse_hunk_header("@@ -3 +4,2 @@ fn main"), Some((3, 4)));
        assert_eq!(parse_hunk_header("@@"), None);

        let diff = diff(vec![hunk("@@", &[(DiffLineKind::Add, "x")])]);
        let items = unified_model(&diff, &FoldState::default());
        assert!(matches!(
            items[1],
            UnifiedItem::Line {
                old_line: None,
                new_line: None,
                ..
            }
        ));
    }

    #[test]
    fn json_mode_falls_back_without_structured_snapshot() {
        let plain = diff(Vec::new());
        assert_eq!(
            resolve_view_mode(DiffViewMode::Json, &plain),
            (DiffViewMode::Unified, Some(JSON_UNAVAILABLE_REASON))
        );
        assert_eq!(
            resolve_view_mode(DiffViewMode::Split, &plain),
            (DiffViewMode::Split, None)
        );

        let structured = Diff {
            structured: Some(StructuredSnapshot::Json {
                before: Some(json!({"a": 1})),
                after: Some(json!({"a": 2})),
            }),
            ..plain
        };
        assert_eq!(
            resolve_view_mode(DiffViewMode::Json, &structured),
            (DiffViewMode::Json, None)
        );
        assert_eq!(json_model(&structured).len(), 1);
    }
}
