//! trellis: a GPU-backed widget toolkit core
//!
//! Elements live in an arena owned by their [`Window`] and are addressed by
//! [`ElementId`]. Each element carries a [`Behaviors`] table (draw, event,
//! recalc, attach, layout, size, teardown) and a registry of per-event-type
//! handlers. Events are dispatched at an element and bubble toward the root
//! until something claims them; key events detour through the focused
//! element first.
//!
//! Layout runs on taffy, text is measured with cosmic-text, and drawing goes
//! through a small [`GpuBackend`] trait with a wgpu implementation for real
//! windows and a software framebuffer for tests and headless use.
//!
//! ```no_run
//! use trellis::{widgets::button, AddPosition, EventType, Toolkit, WindowOptions};
//!
//! let mut toolkit = Toolkit::native()?;
//! let window = toolkit.open_window(&WindowOptions::new(320, 200).title("hello"))?;
//! let root = window.root();
//! let ok = button::new(window, Some("OK"));
//! window.add_child(root, ok, AddPosition::Tail);
//! window.register_handler(ok, EventType::ButtonClick, |win, _, _| win.run_loop().stop());
//! toolkit.run()?;
//! # Ok::<(), trellis::Error>(())
//! ```

pub mod clipboard;
pub mod config;
pub mod dispatch;
pub mod element;
pub mod error;
pub mod event;
pub mod font;
pub mod geom;
pub mod gpu;
pub mod handler;
pub mod input;
pub mod layout;
pub mod platform;
pub mod style;
pub mod toolkit;
pub mod tree;
pub mod widgets;
pub mod window;

#[cfg(test)]
mod testing;

pub use clipboard::{clipboard_contents, copy_to_clipboard};
pub use config::{RenderMode, WindowOptions};
pub use element::{AddPosition, Behaviors, Direction, DrawState, Element, ElementId};
pub use error::{Error, Result};
pub use event::{Event, EventSource, EventType, KeyEvent, Keysym, Modifiers, MouseButton, MouseEvent, Payload};
pub use geom::{Point, Rect, Size};
pub use gpu::GpuBackend;
pub use handler::EventCallback;
pub use platform::{Platform, PlatformEvent};
pub use style::{Color, Stylesheet};
pub use toolkit::{LoopControl, Toolkit};
pub use window::Window;
