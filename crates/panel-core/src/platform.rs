//! Host capabilities the panel needs but does not own.
//!
//! Hosts (a browser shell, the CLI driver, tests) implement these traits;
//! the core only ever sees the snapshots they report.

use std::fmt;

/// Live size and scroll position of a scrollable container.
pub trait ViewportMetrics {
    /// Rendered height, or `None` before the first layout.
    fn viewport_height(&self) -> Option<f64>;
    fn scroll_top(&self) -> f64;
}

pub trait Clipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FocusId(pub u64);

pub trait FocusHost {
    fn active_element(&self) -> Option<FocusId>;
    fn focus(&mut self, target: FocusId);
}

/// Handle of a scheduled host timer. Expiry reports echo the token so a
/// superseded timer can be recognized and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerToken(pub u64);

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Fixed metrics, handy for headless hosts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaticViewport {
    pub height: Option<f64>,
    pub scroll_top: f64,
}

impl ViewportMetrics for StaticViewport {
    fn viewport_height(&self) -> Option<f64> {
        self.height
    }

    fn scroll_top(&self) -> f64 {
        self.scroll_top
    }
}
