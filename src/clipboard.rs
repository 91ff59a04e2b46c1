//! Clipboard
//!
//! Copies are kept in a process-wide buffer and forwarded to the system
//! clipboard through arboard when one is reachable. Without a system
//! clipboard (headless sessions, CI) the local copy still works.

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::window::Window;

#[derive(Default)]
struct ClipboardState {
    /// Last text copied by this process.
    contents: Option<String>,
    /// System clipboard (lazily initialized)
    system: Option<arboard::Clipboard>,
    /// Set once arboard failed to initialize, so we stop retrying.
    unavailable: bool,
}

impl ClipboardState {
    fn system(&mut self) -> Option<&mut arboard::Clipboard> {
        if self.system.is_none() && !self.unavailable {
            match arboard::Clipboard::new() {
                Ok(clip) => self.system = Some(clip),
                Err(e) => {
                    log::debug!("system clipboard unavailable: {}", e);
                    self.unavailable = true;
                }
            }
        }
        self.system.as_mut()
    }
}

static CLIPBOARD: Lazy<Mutex<ClipboardState>> = Lazy::new(|| Mutex::new(ClipboardState::default()));

/// Copy `text` to the clipboard.
pub fn copy_to_clipboard(text: &str) {
    let mut state = CLIPBOARD.lock();
    state.contents = Some(text.to_string());
    if let Some(system) = state.system() {
        if let Err(e) = system.set_text(text.to_string()) {
            log::warn!("failed to set system clipboard: {}", e);
        }
    }
}

/// The last text copied by this process, if any.
pub fn clipboard_contents() -> Option<String> {
    CLIPBOARD.lock().contents.clone()
}

impl Window {
    pub fn copy_to_clipboard(&self, text: &str) {
        log::debug!("window `{}`: copy {} bytes", self.title, text.len());
        copy_to_clipboard(text);
    }
}
