//! The window: root of the element tree
//!
//! A [`Window`] is both the arena that owns every element and the root
//! element itself (its id is [`Window::root`]). It holds the focus and hover
//! targets, the frame dirty flag, the GPU backend with the shared
//! [`WindowResources`], the font manager, the type registry and the
//! stylesheet.
//!
//! Lifecycle: [`Window::open`] acquires the platform window, GPU resources
//! and font manager in that order; any failure releases what was already
//! acquired, in reverse, and returns the error. The window starts unattached
//! and becomes attached on the first [`Window::reinit`]. Dropping the window
//! tears the tree down children-first, frees the GPU resources and closes the
//! platform window.

use std::collections::HashMap;

use taffy::TaffyTree;

use crate::config::WindowOptions;
use crate::dispatch;
use crate::element::{Behaviors, Direction, Element, ElementId, TypeRegistry};
use crate::error::Result;
use crate::event::{Event, EventType, Payload};
use crate::font::FontManager;
use crate::geom::{Rect, Size};
use crate::gpu::software::SoftwareBackend;
use crate::gpu::{GpuBackend, WindowResources};
use crate::input::PointerState;
use crate::platform::{Dpi, NativeWindow, Platform};
use crate::style::{self, Color, PropertyKind, Stylesheet};
use crate::toolkit::LoopControl;

// =============================================================================
// Window Behaviors
// =============================================================================

pub const WINDOW_BEHAVIORS: Behaviors = Behaviors {
    type_name: "trellis.window",
    on_event: window_on_event,
    attach: window_attach,
    ..Behaviors::BASE
};

/// Close requests stop the run loop unless a handler claims them; key events
/// go to the focused element first.
fn window_on_event(window: &mut Window, id: ElementId, event: &Event) -> bool {
    match event.ty {
        EventType::WindowClose => {
            if !dispatch::handle(window, id, event) {
                log::info!("window close not vetoed, stopping run loop");
                window.run_loop.stop();
            }
            true
        }
        EventType::KeyPress | EventType::KeyRelease => {
            if let Some(focus) = window.focus {
                if focus != id && window.contains(focus) && dispatch::deliver(window, focus, event) {
                    return true;
                }
            }
            (Behaviors::BASE.on_event)(window, id, event)
        }
        _ => (Behaviors::BASE.on_event)(window, id, event),
    }
}

fn window_attach(window: &mut Window, id: ElementId, parent: Option<ElementId>) {
    (Behaviors::BASE.attach)(window, id, parent);
    log::info!("window `{}` attached ({}x{})", window.title, window.width, window.height);
}

// =============================================================================
// Window
// =============================================================================

pub struct Window {
    pub(crate) elements: HashMap<ElementId, Element>,
    pub(crate) next_handle: usize,
    pub(crate) root: ElementId,
    pub(crate) focus: Option<ElementId>,
    pub(crate) hover: Option<ElementId>,
    /// Something changed since the last frame.
    pub(crate) dirty: bool,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) title: String,
    pub(crate) resources: WindowResources,
    pub(crate) backend: Box<dyn GpuBackend>,
    pub(crate) fonts: FontManager,
    pub(crate) types: TypeRegistry,
    pub(crate) stylesheet: Stylesheet,
    pub(crate) layout_tree: TaffyTree<()>,
    pub(crate) pointer: PointerState,
    pub(crate) native: Box<dyn NativeWindow>,
    pub(crate) run_loop: LoopControl,
}

impl Window {
    /// Open a platform window and set up everything the widget tree needs.
    pub fn open(platform: &mut dyn Platform, options: &WindowOptions, run_loop: LoopControl) -> Result<Window> {
        debug_assert!(options.width > 0 && options.height > 0);

        let platform_window = platform.open(options)?;
        let mut native = platform_window.native;
        let mut backend = platform_window.backend;
        let dpi = platform_window.dpi;
        log::debug!("window `{}`: platform window open", options.title);

        let resources = match WindowResources::create(backend.as_mut()) {
            Ok(resources) => resources,
            Err(e) => {
                native.close();
                return Err(e);
            }
        };

        let fonts = match FontManager::init(dpi.x, dpi.y) {
            Ok(fonts) => fonts,
            Err(e) => {
                resources.release(backend.as_mut());
                native.close();
                return Err(e);
            }
        };

        let mut window = Window {
            elements: HashMap::new(),
            next_handle: 1,
            root: ElementId(0),
            focus: None,
            hover: None,
            dirty: true,
            width: options.width,
            height: options.height,
            title: options.title.clone(),
            resources,
            backend,
            fonts,
            types: TypeRegistry::new(),
            stylesheet: options.stylesheet.clone(),
            layout_tree: TaffyTree::new(),
            pointer: PointerState::default(),
            native,
            run_loop,
        };
        window.root = window.create_element(WINDOW_BEHAVIORS);

        log::info!("window `{}` opened ({}x{}, dpi {:?})", window.title, window.width, window.height, dpi);
        Ok(window)
    }

    // =========================================================================
    // Frame
    // =========================================================================

    /// Draw one frame. Does nothing until the window is attached.
    pub fn draw(&mut self) {
        if !self.is_attached() {
            return;
        }
        let root = self.root;
        let size = Size::new(self.width as f32, self.height as f32);

        self.backend.set_viewport(self.width, self.height);
        dispatch::dispatch(self, root, &Event::genuine(EventType::FrameStart, Payload::Frame { size }));

        let clear = style::query_property(self, root, "background-color", PropertyKind::Color, true)
            .and_then(|p| p.as_color())
            .unwrap_or(Color::BLACK);
        self.backend.set_scissor(Rect::new(0.0, 0.0, size.w, size.h));
        self.backend.clear(clear);

        if let Some(draw) = self.behaviors(root).map(|b| b.draw) {
            let state = self.draw_state_of(root);
            draw(self, root, state);
        }
        self.dirty = false;

        dispatch::dispatch(self, root, &Event::genuine(EventType::FrameEnd, Payload::Frame { size }));
    }

    /// Hand the finished frame to the display.
    pub fn present(&mut self) {
        self.backend.present();
    }

    /// Ask the platform for a redraw if anything changed.
    pub fn request_redraw(&self) {
        if self.dirty {
            self.native.request_redraw();
        }
    }

    /// Reset geometry, attach on first use and reflow the whole tree.
    ///
    /// Called on first show, resize and DPI change.
    pub fn reinit(&mut self) {
        let root = self.root;
        let (w, h) = (self.width as f32, self.height as f32);
        if let Some(elem) = self.element_mut(root) {
            elem.rect = Rect::new(0.0, 0.0, w, h);
        }
        self.backend.set_scissor(Rect::new(0.0, 0.0, w, h));

        if !self.is_attached() {
            if let Some(attach) = self.behaviors(root).map(|b| b.attach) {
                attach(self, root, None);
            }
        }
        self.trigger_reflow(root, root, Direction::Leafward);
    }

    // =========================================================================
    // Focus
    // =========================================================================

    /// Move keyboard focus to `target`.
    ///
    /// The new target receives `Focus` before the old one receives `Unfocus`.
    /// Both are delivered directly, without bubbling. Refocusing the current
    /// target does nothing.
    pub fn focus_element(&mut self, target: Option<ElementId>) {
        if self.focus == target {
            return;
        }
        let previous = self.focus;

        if let Some(t) = target {
            dispatch::deliver(self, t, &Event::new(EventType::Focus));
        }
        if let Some(prev) = previous.filter(|p| self.contains(*p)) {
            dispatch::deliver(self, prev, &Event::new(EventType::Unfocus));
        }

        self.focus = target.filter(|t| self.contains(*t));
        for id in [previous, self.focus].into_iter().flatten() {
            self.mark_dirty(id);
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> ElementId {
        self.root
    }

    pub fn focus(&self) -> Option<ElementId> {
        self.focus
    }

    pub fn hover(&self) -> Option<ElementId> {
        self.hover
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_attached(&self) -> bool {
        self.element(self.root).map_or(false, |e| e.is_attached())
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn dpi(&self) -> Dpi {
        let (x, y) = self.fonts.dpi();
        Dpi { x, y }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn resources(&self) -> &WindowResources {
        &self.resources
    }

    pub fn backend(&self) -> &dyn GpuBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn GpuBackend {
        self.backend.as_mut()
    }

    /// The software backend, when the window renders through one.
    pub fn software_backend(&self) -> Option<&SoftwareBackend> {
        self.backend.as_any().downcast_ref::<SoftwareBackend>()
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontManager {
        &mut self.fonts
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn run_loop(&self) -> &LoopControl {
        &self.run_loop
    }
}

impl Drop for Window {
    fn drop(&mut self) {
        let root = self.root;
        self.focus = None;
        self.hover = None;
        self.release_subtree(root);

        // Removed or never-inserted subtrees still belong to this window.
        let mut loose: Vec<ElementId> = self
            .elements
            .values()
            .filter(|e| e.parent.is_none())
            .map(|e| e.id)
            .collect();
        loose.sort_by_key(|id| id.0);
        for id in loose {
            self.release_subtree(id);
        }

        self.resources.release(self.backend.as_mut());
        self.native.close();
        log::info!("window `{}` closed", self.title);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::AddPosition;
    use crate::gpu::software::Command;
    use crate::testing::headless_window;
    use std::cell::RefCell;
    use std::rc::Rc;

    // =========================================================================
    // Focus
    // =========================================================================

    fn focus_log(window: &mut Window, ids: &[ElementId]) -> Rc<RefCell<Vec<(EventType, ElementId)>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        for &id in ids {
            for ty in [EventType::Focus, EventType::Unfocus] {
                let log = Rc::clone(&log);
                window.register_handler(id, ty, move |_, me, ev| log.borrow_mut().push((ev.ty, me)));
            }
        }
        log
    }

    #[test]
    fn test_focus_delivers_focus_before_unfocus() {
        let mut window = headless_window();
        let root = window.root();
        let a = window.create_element(Behaviors::BASE);
        let b = window.create_element(Behaviors::BASE);
        window.add_child(root, a, AddPosition::Tail);
        window.add_child(root, b, AddPosition::Tail);
        let log = focus_log(&mut window, &[a, b]);

        window.focus_element(Some(a));
        window.focus_element(Some(b));

        assert_eq!(
            *log.borrow(),
            vec![
                (EventType::Focus, a),
                (EventType::Focus, b),
                (EventType::Unfocus, a)
            ]
        );
        assert_eq!(window.focus(), Some(b));
    }

    #[test]
    fn test_refocus_emits_nothing() {
        let mut window = headless_window();
        let root = window.root();
        let a = window.create_element(Behaviors::BASE);
        window.add_child(root, a, AddPosition::Tail);
        let log = focus_log(&mut window, &[a]);

        window.focus_element(Some(a));
        window.focus_element(Some(a));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_focus_events_do_not_bubble() {
        let mut window = headless_window();
        let root = window.root();
        let parent = window.create_element(Behaviors::BASE);
        let child = window.create_element(Behaviors::BASE);
        window.add_child(root, parent, AddPosition::Tail);
        window.add_child(parent, child, AddPosition::Tail);
        let log = focus_log(&mut window, &[parent]);

        window.focus_element(Some(child));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_key_events_go_to_focus_first() {
        let mut window = headless_window();
        let root = window.root();
        let a = window.create_element(Behaviors::BASE);
        window.add_child(root, a, AddPosition::Tail);
        let hits = Rc::new(RefCell::new(Vec::new()));
        for id in [root, a] {
            let hits = Rc::clone(&hits);
            window.register_handler(id, EventType::KeyPress, move |_, me, _| hits.borrow_mut().push(me));
        }

        window.dispatch_simple(root, EventType::KeyPress);
        window.focus_element(Some(a));
        let claimed = window.dispatch_simple(root, EventType::KeyPress);

        assert_eq!(*hits.borrow(), vec![root, a]);
        assert_eq!(claimed, root);
    }

    // =========================================================================
    // Frame
    // =========================================================================

    #[test]
    fn test_draw_is_noop_before_attach() {
        let mut platform = crate::platform::headless::HeadlessPlatform::new();
        let options = WindowOptions::new(32, 32);
        let mut window = Window::open(&mut platform, &options, LoopControl::new()).expect("window");
        window.draw();
        let commands = window.software_backend().map(|b| b.commands().len());
        assert_eq!(commands, Some(0));
        assert!(window.is_dirty());
    }

    #[test]
    fn test_frame_bracket_and_clear_color() {
        let mut window = headless_window();
        let root = window.root();
        let frames = Rc::new(RefCell::new(Vec::new()));
        for ty in [EventType::FrameStart, EventType::FrameEnd] {
            let frames = Rc::clone(&frames);
            window.register_handler(root, ty, move |win, _, ev| {
                let draws = win.software_backend().map_or(0, |b| {
                    b.commands().iter().filter(|c| matches!(c, Command::Clear(_))).count()
                });
                frames.borrow_mut().push((ev.ty, draws));
            });
        }

        window.draw();

        assert_eq!(
            *frames.borrow(),
            vec![(EventType::FrameStart, 0), (EventType::FrameEnd, 1)]
        );
        assert!(!window.is_dirty());
        assert_eq!(
            window.software_backend().and_then(|b| b.sample(5, 5)),
            Some(Color::rgb(0x202020).into())
        );
    }

    #[test]
    fn test_draw_clears_dirty_even_when_clean() {
        let mut window = headless_window();
        window.draw();
        window.draw();
        assert!(!window.is_dirty());
        let clears = window
            .software_backend()
            .map_or(0, |b| b.commands().iter().filter(|c| matches!(c, Command::Clear(_))).count());
        assert_eq!(clears, 2);
    }

    #[test]
    fn test_reinit_tracks_new_size() {
        let mut window = headless_window();
        window.width = 200;
        window.height = 100;
        window.reinit();
        let rect = window.element(window.root()).map(|e| e.rect);
        assert_eq!(rect, Some(Rect::new(0.0, 0.0, 200.0, 100.0)));
    }
}
