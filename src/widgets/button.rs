//! Button: a filled box around a label that turns a primary click into
//! [`EventType::ButtonClick`].
//!
//! The box is drawn from a per-button vertex buffer cached on attach and on
//! every recalc. Background colors come from the stylesheet for the current
//! draw state. Pressing the button focuses it.

use crate::dispatch;
use crate::element::{Behaviors, Direction, DrawState, ElementId};
use crate::event::{Event, EventType, MouseButton, Payload};
use crate::gpu::{BufferId, DrawCall, Primitive};
use crate::layout;
use crate::style::{self, Color, PropertyKind};
use crate::window::Window;

use super::label;

/// Smallest size a button takes, whatever its label.
pub const BUTTON_MIN_SIZE: (f32, f32) = (70.0, 26.0);

const BACKGROUND_FALLBACK: u32 = 0x404F3C;

#[derive(Debug, Clone)]
pub struct ButtonData {
    pub label: ElementId,
    vbo: Option<BufferId>,
}

impl ButtonData {
    pub fn vbo(&self) -> Option<BufferId> {
        self.vbo
    }
}

pub const BUTTON_BEHAVIORS: Behaviors = Behaviors {
    type_name: "trellis.widgets.button",
    draw: button_draw,
    on_event: button_on_event,
    recalc: button_recalc,
    attach: button_attach,
    layout: layout::hpack_center,
    size: layout::size_hfit_children,
    teardown: button_teardown,
    ..Behaviors::BASE
};

// =============================================================================
// Behaviors
// =============================================================================

fn button_draw(window: &mut Window, id: ElementId, state: DrawState) {
    if let Some(vbo) = window.data::<ButtonData>(id).and_then(|d| d.vbo) {
        let color = window
            .query_color(id, state, "background-color", false)
            .unwrap_or_else(|| Color::rgb(BACKGROUND_FALLBACK));
        let resources = *window.resources();
        window.backend_mut().draw(&DrawCall {
            shader: resources.shaders.default,
            vertices: vbo,
            indices: resources.ibos.quad_solid,
            primitive: Primitive::TriangleStrip,
            color,
        });
    }
    (Behaviors::BASE.draw)(window, id, state);
}

fn button_on_event(window: &mut Window, id: ElementId, event: &Event) -> bool {
    match event.ty {
        EventType::MouseDown => {
            window.focus_element(Some(id));
            window.mark_dirty(id);
            false
        }
        EventType::MouseEnter | EventType::MouseUp | EventType::MouseLeave | EventType::DragDrop => {
            window.mark_dirty(id);
            false
        }
        EventType::DragStart => true,
        EventType::MouseClick => match event.mouse() {
            Some(mouse) if mouse.button == MouseButton::Button1 => {
                let origin = window.element(id).map(|e| e.rect.origin()).unwrap_or_default();
                let mut local = *mouse;
                local.cursor = mouse.cursor.offset_from(origin);
                let click = event.retyped(EventType::ButtonClick).with_payload(Payload::Mouse(local));
                dispatch::handle(window, id, &click)
            }
            _ => false,
        },
        _ => (Behaviors::BASE.on_event)(window, id, event),
    }
}

fn button_recalc(window: &mut Window, id: ElementId, instigator: ElementId, direction: Direction) {
    (Behaviors::BASE.recalc)(window, id, instigator, direction);
    cache_to_vbo(window, id);
}

fn button_attach(window: &mut Window, id: ElementId, parent: Option<ElementId>) {
    (Behaviors::BASE.attach)(window, id, parent);

    let pad = style::query_property(window, id, "padding", PropertyKind::Length, false)
        .and_then(|p| p.as_length())
        .unwrap_or(0.0);
    if let Some(elem) = window.element_mut(id) {
        elem.outer_pad = pad;
    }

    // A button re-added after removal keeps the buffer it already has.
    let has_vbo = window.data::<ButtonData>(id).map_or(true, |d| d.vbo.is_some());
    if !has_vbo {
        match window.backend_mut().create_vertex_buffer("button") {
            Ok(vbo) => {
                if let Some(data) = window.data_mut::<ButtonData>(id) {
                    data.vbo = Some(vbo);
                }
            }
            Err(e) => log::error!("button {:?}: {}", id, e),
        }
    }

    cache_to_vbo(window, id);
}

fn button_teardown(window: &mut Window, id: ElementId) {
    let vbo = window.data_mut::<ButtonData>(id).and_then(|d| d.vbo.take());
    if let Some(vbo) = vbo {
        window.backend_mut().free_buffer(vbo);
    }
    (Behaviors::BASE.teardown)(window, id);
}

fn cache_to_vbo(window: &mut Window, id: ElementId) {
    let Some(vbo) = window.data::<ButtonData>(id).and_then(|d| d.vbo) else {
        return;
    };
    let Some(rect) = window.element(id).map(|e| e.rect) else {
        return;
    };
    window.backend_mut().upload_vertices(vbo, &rect.corners());
}

// =============================================================================
// Public API
// =============================================================================

/// Create a button with an optional label.
pub fn new(window: &mut Window, text: Option<&str>) -> ElementId {
    let label = label::new(window, text.unwrap_or(""));
    let id = window.create_element_with_data(BUTTON_BEHAVIORS, ButtonData { label, vbo: None });
    if let Some(elem) = window.element_mut(id) {
        elem.min_size = crate::geom::Size::new(BUTTON_MIN_SIZE.0, BUTTON_MIN_SIZE.1);
    }
    window.add_child(id, label, crate::element::AddPosition::Head);
    id
}

pub fn set_label(window: &mut Window, id: ElementId, text: &str) {
    if let Some(label) = window.data::<ButtonData>(id).map(|d| d.label) {
        label::set_text(window, label, text);
    }
}

pub fn label(window: &Window, id: ElementId) -> Option<&str> {
    let label = window.data::<ButtonData>(id)?.label;
    label::text(window, label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::AddPosition;
    use crate::geom::{Point, Rect};
    use crate::gpu::software::Command;
    use crate::platform::{ButtonState, PlatformEvent};
    use crate::testing::headless_window;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn attached_button(window: &mut Window) -> ElementId {
        let root = window.root();
        let button = new(window, None);
        window.add_child(root, button, AddPosition::Tail);
        button
    }

    // =========================================================================
    // Construction
    // =========================================================================

    #[test]
    fn test_button_has_label_child_and_min_size() {
        let mut window = headless_window();
        let button = attached_button(&mut window);

        let label_id = window.data::<ButtonData>(button).map(|d| d.label);
        assert_eq!(window.children(button).first().copied(), label_id);
        assert_eq!(label(&window, button), Some(""));
        assert_eq!(window.element(button).map(|e| e.rect), Some(Rect::new(0.0, 0.0, 70.0, 26.0)));
        assert_eq!(window.element(button).map(|e| e.outer_pad), Some(5.0));
    }

    #[test]
    fn test_vertex_buffer_lives_with_the_button() {
        let mut window = headless_window();
        let live = window.software_backend().map(|b| b.live_counter()).expect("software backend");
        let before = live.get();

        let button = attached_button(&mut window);
        assert!(window.data::<ButtonData>(button).and_then(|d| d.vbo()).is_some());
        assert_eq!(live.get(), before + 1);

        window.destroy_element(button);
        assert_eq!(live.get(), before);
    }

    #[test]
    fn test_reattached_button_reuses_its_buffer() {
        let mut window = headless_window();
        let root = window.root();
        let live = window.software_backend().map(|b| b.live_counter()).expect("software backend");
        let button = attached_button(&mut window);
        let first = window.data::<ButtonData>(button).and_then(|d| d.vbo());

        window.remove_child(root, button);
        window.add_child(root, button, AddPosition::Tail);

        assert_eq!(window.data::<ButtonData>(button).and_then(|d| d.vbo()), first);
        let before_destroy = live.get();
        window.destroy_element(button);
        assert_eq!(live.get(), before_destroy - 1);
    }

    // =========================================================================
    // Drawing
    // =========================================================================

    #[test]
    fn test_draw_uses_state_color() {
        let mut window = headless_window();
        let button = attached_button(&mut window);

        window.draw();
        let normal = window.software_backend().and_then(|b| b.sample(10, 10));
        assert_eq!(normal, Some(Color::rgb(0x404F3C).into()));

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 10.0)));
        assert_eq!(window.hover(), Some(button));
        window.draw();
        let hover = window.software_backend().and_then(|b| b.sample(10, 10));
        assert_eq!(hover, Some(Color::rgb(0x5C704C).into()));

        let draws = window
            .software_backend()
            .map_or(0, |b| b.commands().iter().filter(|c| matches!(c, Command::Draw(_))).count());
        assert_eq!(draws, 2);
    }

    // =========================================================================
    // Events
    // =========================================================================

    #[test]
    fn test_press_focuses_button() {
        let mut window = headless_window();
        let button = attached_button(&mut window);
        window.draw();

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 10.0)));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Pressed,
        });

        assert_eq!(window.focus(), Some(button));
        assert!(window.is_dirty());
    }

    #[test]
    fn test_primary_click_becomes_local_button_click() {
        let mut window = headless_window();
        let root = window.root();
        let spacer = window.create_element(Behaviors::BASE);
        if let Some(elem) = window.element_mut(spacer) {
            elem.min_size = crate::geom::Size::new(10.0, 30.0);
        }
        window.add_child(root, spacer, AddPosition::Head);
        let button = attached_button(&mut window);
        assert_eq!(window.element(button).map(|e| e.rect.origin()), Some(Point::new(0.0, 30.0)));

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        window.register_handler(button, EventType::ButtonClick, move |_, _, ev| {
            if let Some(m) = ev.mouse() {
                sink.borrow_mut().push(m.cursor);
            }
        });

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(12.0, 40.0)));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Pressed,
        });
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Released,
        });

        assert_eq!(*seen.borrow(), vec![Point::new(12.0, 10.0)]);
    }

    #[test]
    fn test_drag_start_is_claimed() {
        let mut window = headless_window();
        let button = attached_button(&mut window);
        let claimer = window.dispatch_simple(button, EventType::DragStart);
        assert_eq!(claimer, button);
    }
}
