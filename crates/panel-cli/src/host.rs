//! Terminal implementations of the panel's platform ports.

use panel_core::platform::Clipboard;
use panel_core::platform::FocusHost;
use panel_core::platform::FocusId;

/// System clipboard through `arboard`. Opened per write; headless sessions
/// without a display report the failure instead of panicking.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), String> {
        let mut clipboard = arboard::Clipboard::new().map_err(|err| err.to_string())?;
        clipboard
            .set_text(text.to_string())
            .map_err(|err| err.to_string())
    }
}

/// Remembers the last focus request; a terminal has no focus ring.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessFocus {
    active: Option<FocusId>,
    pub history: Vec<FocusId>,
}

impl FocusHost for HeadlessFocus {
    fn active_element(&self) -> Option<FocusId> {
        self.active
    }

    fn focus(&mut self, target: FocusId) {
        self.active = Some(target);
        self.history.push(target);
    }
}
