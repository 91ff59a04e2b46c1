//! Native platform on winit
//!
//! Opens real windows through winit and renders them with the wgpu backend
//! (or the software backend when asked to). The event loop translates winit
//! window events into [`PlatformEvent`]s for the window.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use winit::application::ApplicationHandler;
use winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::platform::run_on_demand::EventLoopExtRunOnDemand;
use winit::window::WindowId;

use crate::config::{RenderMode, WindowOptions};
use crate::error::{Error, Result};
use crate::event::{Keysym, Modifiers, MouseButton};
use crate::geom::Point;
use crate::gpu::software::SoftwareBackend;
use crate::gpu::wgpu_backend::WgpuBackend;
use crate::gpu::GpuBackend;
use crate::toolkit::LoopControl;
use crate::window::Window;

use super::{ButtonState, Dpi, NativeWindow, Platform, PlatformEvent, PlatformWindow};

/// Logical DPI at a scale factor of 1.0.
const BASE_DPI: f32 = 96.0;
/// Pixels per wheel "line" when the platform reports pixel deltas.
const PIXELS_PER_LINE: f32 = 20.0;

// =============================================================================
// Native Window
// =============================================================================

/// Id of the window the event loop should serve. Cleared when that window
/// closes, including when its construction unwinds.
type OpenWindowId = Rc<Cell<Option<WindowId>>>;

struct WinitWindow {
    window: Option<Arc<winit::window::Window>>,
    open_id: OpenWindowId,
}

impl NativeWindow for WinitWindow {
    fn close(&mut self) {
        self.open_id.set(None);
        if let Some(window) = self.window.take() {
            window.set_visible(false);
            log::debug!("native window {:?} closed", window.id());
        }
    }

    fn request_redraw(&self) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

// =============================================================================
// Platform
// =============================================================================

pub struct WinitPlatform {
    event_loop: EventLoop<()>,
    window_id: OpenWindowId,
}

impl WinitPlatform {
    pub fn new() -> Result<Self> {
        let event_loop = EventLoop::new().map_err(|e| Error::EventLoop(e.to_string()))?;
        event_loop.set_control_flow(ControlFlow::Wait);
        Ok(Self {
            event_loop,
            window_id: Rc::new(Cell::new(None)),
        })
    }
}

impl Platform for WinitPlatform {
    fn open(&mut self, options: &WindowOptions) -> Result<PlatformWindow> {
        if options.parent.is_some() {
            log::warn!("embedding into a parent window is not supported here, opening a top-level window");
        }

        let attrs = winit::window::WindowAttributes::default()
            .with_title(options.title.clone())
            .with_inner_size(winit::dpi::PhysicalSize::new(options.width, options.height));

        // The window has to exist before the loop runs so the tree can be
        // built against it.
        #[allow(deprecated)]
        let window = self
            .event_loop
            .create_window(attrs)
            .map_err(|e| Error::Platform(e.to_string()))?;
        let window = Arc::new(window);
        let scale = window.scale_factor() as f32;
        let dpi = Dpi {
            x: BASE_DPI * scale,
            y: BASE_DPI * scale,
        };

        let backend: Box<dyn GpuBackend> = match options.render_mode {
            RenderMode::Gpu => match WgpuBackend::new(Arc::clone(&window), options.width, options.height) {
                Ok(backend) => Box::new(backend),
                Err(e) => {
                    window.set_visible(false);
                    return Err(e);
                }
            },
            RenderMode::Software => {
                log::warn!("software rendering selected, frames are not shown on screen");
                Box::new(SoftwareBackend::new(options.width, options.height))
            }
        };

        self.window_id.set(Some(window.id()));
        log::info!("native window {:?} opened", window.id());

        Ok(PlatformWindow {
            native: Box::new(WinitWindow {
                window: Some(window),
                open_id: Rc::clone(&self.window_id),
            }),
            backend,
            dpi,
        })
    }

    fn run(&mut self, window: &mut Window, run_loop: &LoopControl) -> Result<()> {
        let Some(window_id) = self.window_id.get() else {
            return Err(Error::EventLoop("no native window is open".to_string()));
        };
        let mut app = App {
            window,
            window_id,
            run_loop,
            modifiers: Modifiers::NONE,
        };
        self.event_loop
            .run_app_on_demand(&mut app)
            .map_err(|e| Error::EventLoop(e.to_string()))
    }
}

// =============================================================================
// Event Loop
// =============================================================================

struct App<'a> {
    window: &'a mut Window,
    window_id: WindowId,
    run_loop: &'a LoopControl,
    modifiers: Modifiers,
}

impl App<'_> {
    fn feed(&mut self, event_loop: &ActiveEventLoop, event: PlatformEvent) {
        self.window.handle_platform_event(event);
        if self.run_loop.is_stopped() {
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for App<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.run_loop.is_stopped() {
            event_loop.exit();
            return;
        }
        if !self.window.is_attached() {
            self.window.reinit();
        }
        self.window.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        if window_id != self.window_id {
            return;
        }

        let translated = match event {
            WindowEvent::CloseRequested => Some(PlatformEvent::CloseRequested),
            WindowEvent::Resized(size) => Some(PlatformEvent::Resized {
                width: size.width,
                height: size.height,
            }),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                let dpi = BASE_DPI * scale_factor as f32;
                Some(PlatformEvent::DpiChanged(Dpi { x: dpi, y: dpi }))
            }
            WindowEvent::CursorMoved { position, .. } => {
                Some(PlatformEvent::CursorMoved(Point::new(position.x as f32, position.y as f32)))
            }
            WindowEvent::CursorLeft { .. } => Some(PlatformEvent::CursorLeft),
            WindowEvent::MouseInput { state, button, .. } => Some(PlatformEvent::MouseInput {
                button: translate_button(button),
                state: translate_state(state),
            }),
            WindowEvent::MouseWheel { delta, .. } => {
                let delta = match delta {
                    MouseScrollDelta::LineDelta(x, y) => Point::new(x, y),
                    MouseScrollDelta::PixelDelta(p) => {
                        Point::new(p.x as f32 / PIXELS_PER_LINE, p.y as f32 / PIXELS_PER_LINE)
                    }
                };
                Some(PlatformEvent::Wheel { delta })
            }
            WindowEvent::ModifiersChanged(mods) => {
                self.modifiers = translate_modifiers(mods.state());
                None
            }
            WindowEvent::KeyboardInput { event, .. } => Some(PlatformEvent::Key {
                keysym: translate_key(&event.logical_key),
                modifiers: self.modifiers,
                character: event.text.as_ref().and_then(|t| t.chars().next()),
                state: translate_state(event.state),
            }),
            WindowEvent::RedrawRequested => Some(PlatformEvent::Redraw),
            _ => None,
        };

        if let Some(event) = translated {
            self.feed(event_loop, event);
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.run_loop.is_stopped() {
            event_loop.exit();
            return;
        }
        self.window.request_redraw();
    }
}

// =============================================================================
// Translation
// =============================================================================

fn translate_state(state: ElementState) -> ButtonState {
    match state {
        ElementState::Pressed => ButtonState::Pressed,
        ElementState::Released => ButtonState::Released,
    }
}

fn translate_button(button: winit::event::MouseButton) -> MouseButton {
    match button {
        winit::event::MouseButton::Left => MouseButton::Button1,
        winit::event::MouseButton::Middle => MouseButton::Button2,
        winit::event::MouseButton::Right => MouseButton::Button3,
        winit::event::MouseButton::Back => MouseButton::Other(8),
        winit::event::MouseButton::Forward => MouseButton::Other(9),
        winit::event::MouseButton::Other(n) => MouseButton::Other(n),
    }
}

fn translate_modifiers(state: ModifiersState) -> Modifiers {
    let mut mods = Modifiers::NONE;
    if state.shift_key() {
        mods.insert(Modifiers::SHIFT);
    }
    if state.control_key() {
        mods.insert(Modifiers::CTRL);
    }
    if state.alt_key() {
        mods.insert(Modifiers::ALT);
    }
    if state.super_key() {
        mods.insert(Modifiers::SUPER);
    }
    mods
}

fn translate_key(key: &Key) -> Keysym {
    match key {
        Key::Named(named) => match named {
            NamedKey::Enter => Keysym::Enter,
            NamedKey::Escape => Keysym::Escape,
            NamedKey::Tab => Keysym::Tab,
            NamedKey::Backspace => Keysym::Backspace,
            NamedKey::Delete => Keysym::Delete,
            NamedKey::ArrowLeft => Keysym::Left,
            NamedKey::ArrowRight => Keysym::Right,
            NamedKey::ArrowUp => Keysym::Up,
            NamedKey::ArrowDown => Keysym::Down,
            NamedKey::Home => Keysym::Home,
            NamedKey::End => Keysym::End,
            NamedKey::PageUp => Keysym::PageUp,
            NamedKey::PageDown => Keysym::PageDown,
            NamedKey::Space => Keysym::Char(' '),
            _ => Keysym::Unknown,
        },
        Key::Character(s) => s.chars().next().map_or(Keysym::Unknown, Keysym::Char),
        _ => Keysym::Unknown,
    }
}
