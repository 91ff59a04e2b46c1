//! Event dispatch
//!
//! [`dispatch`] offers an event to its target through the target's `on_event`
//! behavior. If the target does not claim it, the event is offered to the
//! parent, then the grandparent, and so on. Dispatch stops at the first
//! element that claims the event, or at the root, and returns that element.
//! Delivery only ever moves rootward: siblings and descendants never see an
//! event dispatched at another element.

use crate::element::ElementId;
use crate::event::{Event, EventType};
use crate::window::Window;

/// Run the handler registered on `target` for `event.ty`, if there is one.
///
/// Returns whether a handler was found (and therefore ran). The callback is
/// cloned out of the registry before it runs, so it may freely register or
/// unregister handlers on any element, including itself.
pub fn handle(window: &mut Window, target: ElementId, event: &Event) -> bool {
    let callback = match window
        .element(target)
        .and_then(|elem| elem.handlers.lookup(event.ty))
    {
        Some(handler) => handler.callback(),
        None => return false,
    };

    callback(window, target, event);
    true
}

/// Offer `event` to `target` alone, without bubbling. Returns whether it was
/// claimed.
pub fn deliver(window: &mut Window, target: ElementId, event: &Event) -> bool {
    let Some(on_event) = window.behaviors(target).map(|b| b.on_event) else {
        log::debug!("deliver: {:?} to dead element {:?}", event.ty, target);
        return false;
    };
    on_event(window, target, event)
}

/// Deliver `event` at `target` and bubble it toward the root until claimed.
///
/// Returns the element that claimed the event, or the root if nobody did.
pub fn dispatch(window: &mut Window, target: ElementId, event: &Event) -> ElementId {
    debug_assert!(window.contains(target), "dispatch to dead element {:?}", target);

    let mut current = target;
    loop {
        // Remember the parent in case a handler destroys `current`.
        let parent_before = window.parent(current);

        if deliver(window, current, event) {
            return current;
        }

        let parent = if window.contains(current) {
            window.parent(current)
        } else {
            parent_before
        };

        match parent {
            Some(p) if window.contains(p) => current = p,
            _ => return current,
        }
    }
}

/// Dispatch a payload-free synthetic event of type `ty` at `target`.
pub fn dispatch_simple(window: &mut Window, target: ElementId, ty: EventType) -> ElementId {
    dispatch(window, target, &Event::new(ty))
}

impl Window {
    /// See [`dispatch`].
    pub fn dispatch(&mut self, target: ElementId, event: &Event) -> ElementId {
        dispatch(self, target, event)
    }

    /// See [`dispatch_simple`].
    pub fn dispatch_simple(&mut self, target: ElementId, ty: EventType) -> ElementId {
        dispatch_simple(self, target, ty)
    }

    /// See [`deliver`].
    pub fn deliver(&mut self, target: ElementId, event: &Event) -> bool {
        deliver(self, target, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{AddPosition, Behaviors};
    use crate::testing::headless_window;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// root → a → b → c, all plain elements, attached.
    fn chain(window: &mut Window) -> (ElementId, ElementId, ElementId) {
        let root = window.root();
        let a = window.create_element(Behaviors::BASE);
        let b = window.create_element(Behaviors::BASE);
        let c = window.create_element(Behaviors::BASE);
        window.add_child(root, a, AddPosition::Tail);
        window.add_child(a, b, AddPosition::Tail);
        window.add_child(b, c, AddPosition::Tail);
        (a, b, c)
    }

    /// Record every delivery attempt by overriding `on_event` on the element.
    fn recording_event(window: &mut Window, id: ElementId, event: &Event) -> bool {
        if let Some(log) = window.data::<Rc<RefCell<Vec<ElementId>>>>(id).cloned() {
            log.borrow_mut().push(id);
        }
        (Behaviors::BASE.on_event)(window, id, event)
    }

    #[test]
    fn test_unclaimed_event_returns_root() {
        let mut window = headless_window();
        let (_, _, c) = chain(&mut window);
        let handled = window.dispatch_simple(c, EventType::User(1));
        assert_eq!(handled, window.root());
    }

    #[test]
    fn test_dispatch_stops_at_first_claimer() {
        let mut window = headless_window();
        let (a, b, c) = chain(&mut window);
        let hits = Rc::new(RefCell::new(Vec::new()));

        for id in [a, b] {
            let hits = Rc::clone(&hits);
            window.register_handler(id, EventType::User(1), move |_, me, _| {
                hits.borrow_mut().push(me);
            });
        }

        let handled = window.dispatch_simple(c, EventType::User(1));
        assert_eq!(handled, b);
        assert_eq!(*hits.borrow(), vec![b]);
    }

    #[test]
    fn test_dispatch_visits_ancestor_chain_in_order() {
        let mut window = headless_window();
        let log: Rc<RefCell<Vec<ElementId>>> = Rc::new(RefCell::new(Vec::new()));

        let root = window.root();
        let mut behaviors = Behaviors::BASE;
        behaviors.on_event = recording_event;

        let a = window.create_element_with_data(behaviors, Rc::clone(&log));
        let sibling = window.create_element_with_data(behaviors, Rc::clone(&log));
        let b = window.create_element_with_data(behaviors, Rc::clone(&log));
        let leaf_sibling = window.create_element_with_data(behaviors, Rc::clone(&log));
        window.add_child(root, a, AddPosition::Tail);
        window.add_child(root, sibling, AddPosition::Tail);
        window.add_child(a, b, AddPosition::Tail);
        window.add_child(a, leaf_sibling, AddPosition::Tail);

        let handled = window.dispatch_simple(b, EventType::User(9));

        assert_eq!(handled, root);
        // The root uses window behaviors and is not recorded.
        assert_eq!(*log.borrow(), vec![b, a]);
    }

    #[test]
    fn test_deliver_does_not_bubble() {
        let mut window = headless_window();
        let (a, _, c) = chain(&mut window);
        let hit = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hit);
        window.register_handler(a, EventType::User(2), move |_, _, _| {
            *counter.borrow_mut() += 1;
        });

        assert!(!window.deliver(c, &Event::new(EventType::User(2))));
        assert_eq!(*hit.borrow(), 0);
    }

    #[test]
    fn test_second_registration_is_the_one_invoked() {
        let mut window = headless_window();
        let (a, _, _) = chain(&mut window);
        let calls = Rc::new(RefCell::new(Vec::new()));

        let first = Rc::clone(&calls);
        window.register_handler(a, EventType::User(4), move |_, _, _| {
            first.borrow_mut().push("first");
        });
        let second = Rc::clone(&calls);
        window.register_handler(a, EventType::User(4), move |_, _, _| {
            second.borrow_mut().push("second");
        });

        window.dispatch_simple(a, EventType::User(4));
        assert_eq!(*calls.borrow(), vec!["second"]);
        assert_eq!(window.element(a).map(|e| e.handlers.len()), Some(1));
    }

    #[test]
    fn test_callback_may_unregister_itself() {
        let mut window = headless_window();
        let (a, _, c) = chain(&mut window);
        let calls = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&calls);
        window.register_handler(a, EventType::User(5), move |win, me, _| {
            *counter.borrow_mut() += 1;
            win.unregister_handler(me, EventType::User(5));
        });

        // First dispatch is claimed by `a`, which removes its own handler.
        assert_eq!(window.dispatch_simple(c, EventType::User(5)), a);
        // Second dispatch finds no handler and falls through to the root.
        assert_eq!(window.dispatch_simple(c, EventType::User(5)), window.root());
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_callback_may_replace_itself() {
        let mut window = headless_window();
        let (a, _, _) = chain(&mut window);
        let calls = Rc::new(RefCell::new(Vec::new()));

        let outer = Rc::clone(&calls);
        window.register_handler(a, EventType::User(6), move |win, me, _| {
            outer.borrow_mut().push("original");
            let inner = Rc::clone(&outer);
            win.register_handler(me, EventType::User(6), move |_, _, _| {
                inner.borrow_mut().push("replacement");
            });
        });

        window.dispatch_simple(a, EventType::User(6));
        window.dispatch_simple(a, EventType::User(6));
        assert_eq!(*calls.borrow(), vec!["original", "replacement"]);
    }

    #[test]
    fn test_handler_may_redispatch_derived_event() {
        let mut window = headless_window();
        let (a, _, c) = chain(&mut window);
        let seen = Rc::new(RefCell::new(Vec::new()));

        window.register_handler(c, EventType::User(10), move |win, me, ev| {
            win.dispatch(me, &ev.retyped(EventType::User(11)));
        });
        let log = Rc::clone(&seen);
        window.register_handler(a, EventType::User(11), move |_, me, _| {
            log.borrow_mut().push(me);
        });

        assert_eq!(window.dispatch_simple(c, EventType::User(10)), c);
        assert_eq!(*seen.borrow(), vec![a]);
    }

    fn self_destroying_event(window: &mut Window, id: ElementId, _: &Event) -> bool {
        window.destroy_element(id);
        false
    }

    #[test]
    fn test_dispatch_continues_to_parent_after_target_destroys_itself() {
        let mut window = headless_window();
        let (_, b, _) = chain(&mut window);

        let mut behaviors = Behaviors::BASE;
        behaviors.on_event = self_destroying_event;
        let doomed = window.create_element(behaviors);
        window.add_child(b, doomed, AddPosition::Tail);

        let hits = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&hits);
        window.register_handler(b, EventType::User(13), move |_, _, _| {
            *counter.borrow_mut() += 1;
        });

        assert_eq!(window.dispatch_simple(doomed, EventType::User(13)), b);
        assert!(!window.contains(doomed));
        assert_eq!(*hits.borrow(), 1);
    }
}
