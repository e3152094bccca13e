pub mod actions;
pub mod artifacts;
pub mod config;
pub mod contracts;
pub mod diff_model;
pub mod error_catalog;
pub mod json_diff;
pub mod platform;
pub mod reducer;
pub mod run_browser;
pub mod state;
pub mod tool_registry;
pub mod virtual_list;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub use config::PanelConfig;
pub use contracts::*;
pub use tool_registry::ToolId;
pub use tool_registry::ToolRegistry;
