//! Headless platform
//!
//! Opens "windows" backed by a [`SoftwareBackend`] and runs the event loop
//! over a scripted queue of [`PlatformEvent`]s. Used by the tests and for
//! rendering without a display.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::config::WindowOptions;
use crate::error::{Error, Result};
use crate::gpu::software::SoftwareBackend;
use crate::toolkit::LoopControl;
use crate::window::Window;

use super::{Dpi, NativeWindow, Platform, PlatformEvent, PlatformWindow};

struct HeadlessWindow {
    open_windows: Rc<Cell<usize>>,
    closed: bool,
}

impl NativeWindow for HeadlessWindow {
    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.open_windows.set(self.open_windows.get().saturating_sub(1));
        }
    }

    fn request_redraw(&self) {}
}

#[derive(Default)]
pub struct HeadlessPlatform {
    dpi: Dpi,
    fail_after: Option<usize>,
    failing_open: bool,
    events: VecDeque<PlatformEvent>,
    open_windows: Rc<Cell<usize>>,
    live_resources: Rc<Cell<usize>>,
}

impl HeadlessPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dpi(mut self, x: f32, y: f32) -> Self {
        self.dpi = Dpi { x, y };
        self
    }

    /// Backends handed out from now on allow `n` resource creations, then fail.
    pub fn fail_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Make [`Platform::open`] itself fail.
    pub fn failing_open(mut self) -> Self {
        self.failing_open = true;
        self
    }

    pub fn with_events(mut self, events: impl IntoIterator<Item = PlatformEvent>) -> Self {
        self.events.extend(events);
        self
    }

    pub fn push_event(&mut self, event: PlatformEvent) {
        self.events.push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Number of windows opened and not yet closed.
    pub fn open_windows(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.open_windows)
    }

    /// Live GPU objects across every backend this platform handed out.
    pub fn live_resources(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.live_resources)
    }
}

impl Platform for HeadlessPlatform {
    fn open(&mut self, options: &WindowOptions) -> Result<PlatformWindow> {
        if self.failing_open {
            return Err(Error::Platform("headless platform configured to fail".to_string()));
        }
        if options.parent.is_some() {
            log::debug!("headless platform ignores parent window handle");
        }

        let mut backend =
            SoftwareBackend::new(options.width, options.height).with_live_counter(Rc::clone(&self.live_resources));
        if let Some(n) = self.fail_after {
            backend.fail_after(n);
        }

        self.open_windows.set(self.open_windows.get() + 1);
        let native = HeadlessWindow {
            open_windows: Rc::clone(&self.open_windows),
            closed: false,
        };

        Ok(PlatformWindow {
            native: Box::new(native),
            backend: Box::new(backend),
            dpi: self.dpi,
        })
    }

    fn run(&mut self, window: &mut Window, run_loop: &LoopControl) -> Result<()> {
        if !window.is_attached() {
            window.reinit();
        }
        while !run_loop.is_stopped() {
            let Some(event) = self.events.pop_front() else {
                log::debug!("headless event queue drained");
                break;
            };
            window.handle_platform_event(event);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_close_track_window_count() {
        let mut platform = HeadlessPlatform::new();
        let open = platform.open_windows();
        let mut pw = platform.open(&WindowOptions::new(10, 10)).expect("open");
        assert_eq!(open.get(), 1);
        pw.native.close();
        pw.native.close();
        assert_eq!(open.get(), 0);
    }

    #[test]
    fn test_failing_open() {
        let mut platform = HeadlessPlatform::new().failing_open();
        assert!(matches!(platform.open(&WindowOptions::default()), Err(Error::Platform(_))));
        assert_eq!(platform.open_windows().get(), 0);
    }

    #[test]
    fn test_run_stops_when_loop_stopped() {
        let mut platform = HeadlessPlatform::new().with_events([
            PlatformEvent::CloseRequested,
            PlatformEvent::Redraw,
        ]);
        let run_loop = LoopControl::new();
        let mut window = Window::open(&mut platform, &WindowOptions::new(32, 32), run_loop.clone()).expect("window");

        platform.run(&mut window, &run_loop).expect("run");

        assert!(run_loop.is_stopped());
        assert_eq!(platform.pending_events(), 1);
        assert!(window.is_attached());
    }
}
