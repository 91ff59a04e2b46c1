//! Toolkit instance and run loop
//!
//! A [`Toolkit`] owns the platform and at most one [`Window`]. The run loop is
//! stopped through a shared [`LoopControl`]; the window's default close
//! behavior stops it, and application code may stop it at any time.

use std::cell::Cell;
use std::rc::Rc;

use crate::config::WindowOptions;
use crate::error::{Error, Result};
use crate::platform::headless::HeadlessPlatform;
use crate::platform::native::WinitPlatform;
use crate::platform::Platform;
use crate::window::Window;

// =============================================================================
// Loop Control
// =============================================================================

/// Shared stop flag for a run loop.
#[derive(Debug, Clone, Default)]
pub struct LoopControl(Rc<Cell<bool>>);

impl LoopControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.set(true);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.get()
    }

    /// Clear the stop flag so the loop can run again.
    pub fn reset(&self) {
        self.0.set(false);
    }
}

// =============================================================================
// Toolkit
// =============================================================================

pub struct Toolkit {
    // Dropped before the platform that created it.
    window: Option<Window>,
    platform: Box<dyn Platform>,
    run_loop: LoopControl,
}

impl Toolkit {
    pub fn new(platform: Box<dyn Platform>) -> Self {
        Self {
            window: None,
            platform,
            run_loop: LoopControl::new(),
        }
    }

    /// A toolkit on the headless platform.
    pub fn headless(platform: HeadlessPlatform) -> Self {
        Self::new(Box::new(platform))
    }

    /// A toolkit on the native windowing system.
    pub fn native() -> Result<Self> {
        Ok(Self::new(Box::new(WinitPlatform::new()?)))
    }

    /// Open the toolkit's window.
    ///
    /// On failure nothing stays allocated and the toolkit can try again.
    pub fn open_window(&mut self, options: &WindowOptions) -> Result<&mut Window> {
        if self.window.is_some() {
            return Err(Error::WindowAlreadyOpen);
        }
        let window = Window::open(self.platform.as_mut(), options, self.run_loop.clone())?;
        Ok(self.window.insert(window))
    }

    pub fn window(&self) -> Option<&Window> {
        self.window.as_ref()
    }

    pub fn window_mut(&mut self) -> Option<&mut Window> {
        self.window.as_mut()
    }

    /// Destroy the window and its whole tree.
    pub fn close_window(&mut self) {
        self.window = None;
    }

    /// Run until the loop is stopped. Returns immediately without a window.
    pub fn run(&mut self) -> Result<()> {
        let Some(window) = self.window.as_mut() else {
            log::warn!("run called without an open window");
            return Ok(());
        };
        self.run_loop.reset();
        self.platform.run(window, &self.run_loop)
    }

    pub fn stop(&self) {
        self.run_loop.stop();
    }

    pub fn run_loop(&self) -> &LoopControl {
        &self.run_loop
    }
}
