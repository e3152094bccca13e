use std::ops::Range;

use crate::platform::ViewportMetrics;

pub const DEFAULT_OVERSCAN: usize = 6;
/// Tables of diffs and artifacts window above this many rows.
pub const COMPACT_THRESHOLD: usize = 12;
/// Run file listings window above this many rows.
pub const FILE_LISTING_THRESHOLD: usize = 200;
pub const DEFAULT_VIEWPORT_HEIGHT: f64 = 320.0;

/// `[start, end)` of the rows to render for the given scroll state.
pub fn visible_range(
    item_count: usize,
    row_height: f64,
    scroll_top: f64,
    viewport_height: f64,
    overscan: usize,
) -> Range<usize> {
    if item_count == 0 {
        return 0..0;
    }
    if !(row_height.is_finite() && row_height > 0.0) {
        return 0..item_count;
    }
    let scroll_top = if scroll_top.is_finite() {
        scroll_top.max(0.0)
    } else {
        0.0
    };
    let viewport_height = if viewport_height.is_finite() {
        viewport_height.max(0.0)
    } else {
        0.0
    };

    let first = to_index((scroll_top / row_height).floor());
    let last = to_index(((scroll_top + viewport_height) / row_height).ceil());
    let start = first.saturating_sub(overscan).min(item_count);
    let end = last.saturating_add(overscan).min(item_count);
    start..end.max(start)
}

fn to_index(value: f64) -> usize {
    if value >= usize::MAX as f64 {
        usize::MAX
    } else {
        value as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionedRow {
    pub index: usize,
    pub offset: f64,
}

/// What to render for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ListWindow {
    pub range: Range<usize>,
    /// Height of the scroll canvas; keeps native scrollbar proportions right.
    pub canvas_height: f64,
    pub virtualized: bool,
}

impl ListWindow {
    pub fn rows(&self, row_height: f64) -> impl Iterator<Item = PositionedRow> + '_ {
        let virtualized = self.virtualized;
        self.range.clone().map(move |index| PositionedRow {
            index,
            offset: if virtualized {
                index as f64 * row_height
            } else {
                0.0
            },
        })
    }
}

/// Scroll and size tracking for one fixed-row-height list.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualList {
    row_height: f64,
    overscan: usize,
    threshold: usize,
    default_viewport_height: f64,
    scroll_top: f64,
    measured_height: Option<f64>,
}

impl VirtualList {
    pub fn new(row_height: f64, threshold: usize) -> Self {
        Self {
            row_height,
            overscan: DEFAULT_OVERSCAN,
            threshold,
            default_viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            scroll_top: 0.0,
            measured_height: None,
        }
    }

    pub fn with_overscan(mut self, overscan: usize) -> Self {
        self.overscan = overscan;
        self
    }

    pub fn with_default_viewport_height(mut self, height: f64) -> Self {
        self.default_viewport_height = height;
        self
    }

    pub fn row_height(&self) -> f64 {
        self.row_height
    }

    /// Applied synchronously on every scroll event.
    pub fn on_scroll(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }

    /// Applied on every container resize notification.
    pub fn on_resize(&mut self, height: f64) {
        self.measured_height = (height.is_finite() && height > 0.0).then_some(height);
    }

    pub fn sync(&mut self, metrics: &dyn ViewportMetrics) {
        self.on_scroll(metrics.scroll_top());
        match metrics.viewport_height() {
            Some(height) => self.on_resize(height),
            None => self.measured_height = None,
        }
    }

    pub fn viewport_height(&self) -> f64 {
        self.measured_height.unwrap_or(self.default_viewport_height)
    }

    pub fn window(&self, item_count: usize) -> ListWindow {
        if item_count <= self.threshold {
            return ListWindow {
                range: 0..item_count,
                canvas_height: item_count as f64 * self.row_height,
                virtualized: false,
            };
        }
        ListWindow {
            range: visible_range(
                item_count,
                self.row_height,
                self.scroll_top,
                self.viewport_height(),
                self.overscan,
            ),
            canvas_height: item_count as f64 * self.row_height,
            virtualized: true,
        }
    }
}
