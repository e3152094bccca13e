use serde::{Deserialize, Serialize};

use crate::virtual_list::COMPACT_THRESHOLD;
use crate::virtual_list::DEFAULT_OVERSCAN;
use crate::virtual_list::DEFAULT_VIEWPORT_HEIGHT;
use crate::virtual_list::FILE_LISTING_THRESHOLD;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct PanelConfig {
    pub bridge: BridgeConfig,
    pub view: ViewConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct BridgeConfig {
    pub artifact_base_url: Option<String>,
    pub simulated_latency_ms: u64,
    /// Deadline the host applies to each bridge call. No deadline when unset.
    pub call_timeout_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub row_height: f64,
    pub default_viewport_height: f64,
    pub overscan: usize,
    pub compact_threshold: usize,
    pub file_listing_threshold: usize,
    pub copy_feedback_ms: u64,
    pub activity_log_capacity: usize,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            row_height: 24.0,
            default_viewport_height: DEFAULT_VIEWPORT_HEIGHT,
            overscan: DEFAULT_OVERSCAN,
            compact_threshold: COMPACT_THRESHOLD,
            file_listing_threshold: FILE_LISTING_THRESHOLD,
            copy_feedback_ms: 2_500,
            activity_log_capacity: 500,
        }
    }
}
