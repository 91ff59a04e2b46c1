//! Platform input translation
//!
//! Turns raw [`PlatformEvent`]s into dispatched events: hover tracking with
//! enter/leave, press and release with hit testing, click and drag synthesis,
//! wheel, keys, close requests, resize and DPI changes, and redraws.

use std::time::{Duration, Instant};

use crate::dispatch;
use crate::element::ElementId;
use crate::event::{DragEvent, Event, EventType, KeyEvent, MouseButton, MouseEvent, Payload};
use crate::geom::{Point, Size};
use crate::platform::{ButtonState, PlatformEvent};
use crate::window::Window;

/// Cursor travel, in pixels, before a press turns into a drag.
pub const DRAG_THRESHOLD: f32 = 4.0;
/// Maximum gap between clicks that still counts as a multi-click.
pub const MULTI_CLICK_INTERVAL: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, Copy)]
struct Press {
    button: MouseButton,
    target: ElementId,
    start: Point,
    dragging: bool,
}

#[derive(Debug, Clone, Copy)]
struct LastClick {
    target: ElementId,
    button: MouseButton,
    at: Instant,
    count: u32,
}

/// Pointer bookkeeping between platform events.
#[derive(Debug, Default)]
pub struct PointerState {
    cursor: Point,
    press: Option<Press>,
    last_click: Option<LastClick>,
}

impl PointerState {
    pub fn cursor(&self) -> Point {
        self.cursor
    }

    pub fn is_dragging(&self) -> bool {
        self.press.map_or(false, |p| p.dragging)
    }

    /// Drop any reference to the given elements.
    pub(crate) fn forget(&mut self, ids: &[ElementId]) {
        if self.press.map_or(false, |p| ids.contains(&p.target)) {
            self.press = None;
        }
        if self.last_click.map_or(false, |c| ids.contains(&c.target)) {
            self.last_click = None;
        }
    }

    fn click_number(&mut self, target: ElementId, button: MouseButton, now: Instant) -> u32 {
        let count = match self.last_click {
            Some(last)
                if last.target == target
                    && last.button == button
                    && now.duration_since(last.at) <= MULTI_CLICK_INTERVAL =>
            {
                last.count + 1
            }
            _ => 1,
        };
        self.last_click = Some(LastClick {
            target,
            button,
            at: now,
            count,
        });
        count
    }
}

impl Window {
    /// Deepest element under `point` that accepts pointer events.
    pub fn element_at(&self, point: Point) -> Option<ElementId> {
        self.hit_test(self.root, point)
    }

    fn hit_test(&self, id: ElementId, point: Point) -> Option<ElementId> {
        let element = self.element(id)?;
        if !element.rect.contains(point) {
            return None;
        }
        for &child in element.children.iter().rev() {
            if let Some(hit) = self.hit_test(child, point) {
                return Some(hit);
            }
        }
        element.pointer_events.then_some(id)
    }

    /// Feed one platform event into the window.
    pub fn handle_platform_event(&mut self, event: PlatformEvent) {
        let root = self.root;
        match event {
            PlatformEvent::CloseRequested => {
                let size = Size::new(self.width as f32, self.height as f32);
                dispatch::dispatch(self, root, &Event::genuine(EventType::WindowClose, Payload::Window { size }));
            }
            PlatformEvent::Resized { width, height } => {
                if width == 0 || height == 0 {
                    log::debug!("ignoring resize to {}x{}", width, height);
                    return;
                }
                self.width = width;
                self.height = height;
                self.reinit();
            }
            PlatformEvent::DpiChanged(dpi) => {
                self.fonts.set_dpi(dpi.x, dpi.y);
                crate::widgets::label::remeasure_attached(self);
                self.reinit();
            }
            PlatformEvent::CursorMoved(point) => self.cursor_moved(point),
            PlatformEvent::CursorLeft => self.set_hover(None),
            PlatformEvent::MouseInput { button, state } => match state {
                ButtonState::Pressed => self.mouse_pressed(button),
                ButtonState::Released => self.mouse_released(button),
            },
            PlatformEvent::Wheel { delta } => {
                let cursor = self.pointer.cursor;
                let target = self.element_at(cursor).unwrap_or(root);
                dispatch::dispatch(self, target, &Event::genuine(EventType::MouseWheel, Payload::Wheel { delta, cursor }));
            }
            PlatformEvent::Key {
                keysym,
                modifiers,
                character,
                state,
            } => {
                let ty = match state {
                    ButtonState::Pressed => EventType::KeyPress,
                    ButtonState::Released => EventType::KeyRelease,
                };
                let key = KeyEvent {
                    keysym,
                    modifiers,
                    character,
                };
                dispatch::dispatch(self, root, &Event::genuine(ty, Payload::Key(key)));
            }
            PlatformEvent::Redraw => {
                self.draw();
                self.present();
            }
        }
    }

    fn mouse_event(&self, ty: EventType, button: MouseButton, click_number: u32) -> Event {
        Event::genuine(
            ty,
            Payload::Mouse(MouseEvent {
                button,
                cursor: self.pointer.cursor,
                click_number,
            }),
        )
    }

    fn set_hover(&mut self, target: Option<ElementId>) {
        if self.hover == target {
            return;
        }
        let previous = self.hover;
        self.hover = target;

        if let Some(prev) = previous.filter(|p| self.contains(*p)) {
            let ev = self.mouse_event(EventType::MouseLeave, MouseButton::Button1, 0);
            dispatch::deliver(self, prev, &ev);
        }
        if let Some(next) = target {
            let ev = self.mouse_event(EventType::MouseEnter, MouseButton::Button1, 0);
            dispatch::deliver(self, next, &ev);
        }
    }

    fn cursor_moved(&mut self, point: Point) {
        self.pointer.cursor = point;

        if let Some(mut press) = self.pointer.press {
            if !self.contains(press.target) {
                self.pointer.press = None;
            } else {
                let drag = Event::genuine(
                    EventType::DragStart,
                    Payload::Drag(DragEvent {
                        button: press.button,
                        start: press.start,
                        cursor: point,
                        origin: Some(press.target),
                    }),
                );
                if !press.dragging && point.distance_to(press.start) > DRAG_THRESHOLD {
                    press.dragging = true;
                    self.pointer.press = Some(press);
                    dispatch::dispatch(self, press.target, &drag);
                } else if press.dragging {
                    dispatch::dispatch(self, press.target, &drag.retyped(EventType::DragMotion));
                }
            }
        }

        let hit = self.element_at(point);
        self.set_hover(hit);
    }

    fn mouse_pressed(&mut self, button: MouseButton) {
        let root = self.root;
        let cursor = self.pointer.cursor;
        let target = self.element_at(cursor).unwrap_or(root);
        self.pointer.press = Some(Press {
            button,
            target,
            start: cursor,
            dragging: false,
        });
        let ev = self.mouse_event(EventType::MouseDown, button, 1);
        dispatch::dispatch(self, target, &ev);
    }

    fn mouse_released(&mut self, button: MouseButton) {
        let root = self.root;
        let cursor = self.pointer.cursor;
        let target = self.element_at(cursor).unwrap_or(root);

        let up = self.mouse_event(EventType::MouseUp, button, 1);
        dispatch::dispatch(self, target, &up);

        let Some(press) = self.pointer.press.take() else {
            return;
        };
        if press.button != button {
            // A different button went up; keep tracking the original press.
            self.pointer.press = Some(press);
            return;
        }

        if press.dragging {
            let drop = Event::genuine(
                EventType::DragDrop,
                Payload::Drag(DragEvent {
                    button,
                    start: press.start,
                    cursor,
                    origin: Some(press.target),
                }),
            );
            if self.contains(target) {
                dispatch::dispatch(self, target, &drop);
            }
        } else if press.target == target && self.contains(target) {
            let click_number = self.pointer.click_number(target, button, Instant::now());
            let click = self.mouse_event(EventType::MouseClick, button, click_number);
            dispatch::dispatch(self, target, &click);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AddPosition, Behaviors};
    use crate::geom::Rect;
    use crate::testing::headless_window;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<(EventType, ElementId)>>>;

    fn boxed(window: &mut Window, parent: ElementId, w: f32, h: f32) -> ElementId {
        let id = window.create_element(Behaviors::BASE);
        if let Some(elem) = window.element_mut(id) {
            elem.min_size = Size::new(w, h);
        }
        window.add_child(parent, id, AddPosition::Tail);
        id
    }

    fn record(window: &mut Window, id: ElementId, types: &[EventType]) -> Log {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        for &ty in types {
            let log = Rc::clone(&log);
            window.register_handler(id, ty, move |_, me, ev| log.borrow_mut().push((ev.ty, me)));
        }
        log
    }

    fn press_release(window: &mut Window, at: Point, button: MouseButton) {
        window.handle_platform_event(PlatformEvent::CursorMoved(at));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button,
            state: ButtonState::Pressed,
        });
        window.handle_platform_event(PlatformEvent::MouseInput {
            button,
            state: ButtonState::Released,
        });
    }

    // =========================================================================
    // Hit testing
    // =========================================================================

    #[test]
    fn test_element_at_returns_deepest() {
        let mut window = headless_window();
        let root = window.root();
        let outer = boxed(&mut window, root, 100.0, 100.0);
        let inner = boxed(&mut window, outer, 20.0, 20.0);

        assert_eq!(window.element_at(Point::new(5.0, 5.0)), Some(inner));
        assert_eq!(window.element_at(Point::new(50.0, 50.0)), Some(outer));
        assert_eq!(window.element_at(Point::new(300.0, 300.0)), Some(root));
        assert_eq!(window.element_at(Point::new(-1.0, 5.0)), None);
    }

    #[test]
    fn test_hit_test_skips_elements_without_pointer_events() {
        let mut window = headless_window();
        let root = window.root();
        let outer = boxed(&mut window, root, 100.0, 100.0);
        let inner = boxed(&mut window, outer, 20.0, 20.0);
        if let Some(elem) = window.element_mut(inner) {
            elem.pointer_events = false;
        }
        assert_eq!(window.element_at(Point::new(5.0, 5.0)), Some(outer));
    }

    // =========================================================================
    // Hover, clicks, drags
    // =========================================================================

    #[test]
    fn test_hover_enter_and_leave() {
        let mut window = headless_window();
        let root = window.root();
        let a = boxed(&mut window, root, 50.0, 50.0);
        let log = record(&mut window, a, &[EventType::MouseEnter, EventType::MouseLeave]);

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 10.0)));
        assert_eq!(window.hover(), Some(a));
        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(20.0, 10.0)));
        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(200.0, 10.0)));
        assert_eq!(window.hover(), Some(root));

        assert_eq!(
            *log.borrow(),
            vec![(EventType::MouseEnter, a), (EventType::MouseLeave, a)]
        );
    }

    #[test]
    fn test_press_release_synthesizes_click() {
        let mut window = headless_window();
        let root = window.root();
        let a = boxed(&mut window, root, 50.0, 50.0);
        let log = record(
            &mut window,
            a,
            &[EventType::MouseDown, EventType::MouseUp, EventType::MouseClick],
        );

        press_release(&mut window, Point::new(10.0, 10.0), MouseButton::Button1);

        assert_eq!(
            *log.borrow(),
            vec![
                (EventType::MouseDown, a),
                (EventType::MouseUp, a),
                (EventType::MouseClick, a)
            ]
        );
    }

    #[test]
    fn test_release_elsewhere_is_not_a_click() {
        let mut window = headless_window();
        let root = window.root();
        let a = boxed(&mut window, root, 50.0, 50.0);
        let log = record(&mut window, a, &[EventType::MouseClick]);

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 10.0)));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Pressed,
        });
        // Jump straight outside; more than the drag threshold, so it drags.
        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 300.0)));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Released,
        });
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_drag_start_motion_drop() {
        let mut window = headless_window();
        let root = window.root();
        let a = boxed(&mut window, root, 100.0, 100.0);
        let log = record(
            &mut window,
            a,
            &[EventType::DragStart, EventType::DragMotion, EventType::DragDrop],
        );

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 10.0)));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Pressed,
        });
        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(12.0, 10.0)));
        assert!(log.borrow().is_empty());
        assert!(!window.pointer.is_dragging());

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(30.0, 10.0)));
        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(40.0, 10.0)));
        window.handle_platform_event(PlatformEvent::MouseInput {
            button: MouseButton::Button1,
            state: ButtonState::Released,
        });

        assert_eq!(
            *log.borrow(),
            vec![
                (EventType::DragStart, a),
                (EventType::DragMotion, a),
                (EventType::DragDrop, a)
            ]
        );
        assert!(!window.pointer.is_dragging());
    }

    #[test]
    fn test_double_click_counts() {
        let mut window = headless_window();
        let root = window.root();
        let a = boxed(&mut window, root, 50.0, 50.0);
        let counts = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&counts);
        window.register_handler(a, EventType::MouseClick, move |_, _, ev| {
            if let Some(m) = ev.mouse() {
                sink.borrow_mut().push(m.click_number);
            }
        });

        press_release(&mut window, Point::new(10.0, 10.0), MouseButton::Button1);
        press_release(&mut window, Point::new(10.0, 10.0), MouseButton::Button1);
        assert_eq!(*counts.borrow(), vec![1, 2]);
    }

    // =========================================================================
    // Window events
    // =========================================================================

    #[test]
    fn test_resize_reflows_root() {
        let mut window = headless_window();
        window.handle_platform_event(PlatformEvent::Resized { width: 320, height: 240 });
        let rect = window.element(window.root()).map(|e| e.rect);
        assert_eq!(rect, Some(Rect::new(0.0, 0.0, 320.0, 240.0)));

        window.handle_platform_event(PlatformEvent::Resized { width: 0, height: 0 });
        assert_eq!(window.size(), (320, 240));
    }

    #[test]
    fn test_wheel_goes_to_element_under_cursor() {
        let mut window = headless_window();
        let root = window.root();
        let a = boxed(&mut window, root, 50.0, 50.0);
        let log = record(&mut window, a, &[EventType::MouseWheel]);

        window.handle_platform_event(PlatformEvent::CursorMoved(Point::new(10.0, 10.0)));
        window.handle_platform_event(PlatformEvent::Wheel {
            delta: Point::new(0.0, -1.0),
        });
        assert_eq!(*log.borrow(), vec![(EventType::MouseWheel, a)]);
    }

    #[test]
    fn test_redraw_draws_and_presents() {
        let mut window = headless_window();
        window.handle_platform_event(PlatformEvent::Redraw);
        assert_eq!(window.software_backend().map(|b| b.presented_frames()), Some(1));
        assert!(!window.is_dirty());
    }
}
