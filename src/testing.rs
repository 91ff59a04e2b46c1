//! Shared test fixtures.

use crate::config::{RenderMode, WindowOptions};
use crate::platform::headless::HeadlessPlatform;
use crate::toolkit::LoopControl;
use crate::window::Window;

/// An attached 640x480 window on the headless platform.
pub fn headless_window() -> Window {
    let mut platform = HeadlessPlatform::new();
    let options = WindowOptions::new(640, 480).render_mode(RenderMode::Software);
    let mut window = Window::open(&mut platform, &options, LoopControl::new()).expect("headless window");
    window.reinit();
    window
}
