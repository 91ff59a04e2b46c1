//! Platform layer
//!
//! A [`Platform`] opens native windows and runs the event loop. It talks to
//! the widget core in raw [`PlatformEvent`]s, which the window translates into
//! dispatched [`Event`](crate::event::Event)s.

use crate::config::WindowOptions;
use crate::error::Result;
use crate::event::{Keysym, Modifiers, MouseButton};
use crate::geom::Point;
use crate::gpu::GpuBackend;
use crate::toolkit::LoopControl;
use crate::window::Window;

pub mod headless;
pub mod native;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dpi {
    pub x: f32,
    pub y: f32,
}

impl Default for Dpi {
    fn default() -> Self {
        Dpi { x: 96.0, y: 96.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Raw input and window notifications, in window pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformEvent {
    CloseRequested,
    Resized { width: u32, height: u32 },
    DpiChanged(Dpi),
    CursorMoved(Point),
    CursorLeft,
    MouseInput { button: MouseButton, state: ButtonState },
    Wheel { delta: Point },
    Key {
        keysym: Keysym,
        modifiers: Modifiers,
        character: Option<char>,
        state: ButtonState,
    },
    /// The platform wants a frame.
    Redraw,
}

/// The native side of an open window.
pub trait NativeWindow {
    fn close(&mut self);
    fn request_redraw(&self);
}

/// What [`Platform::open`] hands back.
pub struct PlatformWindow {
    pub native: Box<dyn NativeWindow>,
    pub backend: Box<dyn GpuBackend>,
    pub dpi: Dpi,
}

pub trait Platform {
    fn open(&mut self, options: &WindowOptions) -> Result<PlatformWindow>;

    /// Deliver events to `window` until `run_loop` is stopped.
    fn run(&mut self, window: &mut Window, run_loop: &LoopControl) -> Result<()>;
}
