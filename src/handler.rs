//! Per-element handler registry
//!
//! Each element keeps a short ordered list of `(event type, callback)` pairs.
//! There is at most one entry per event type: registering a type that is
//! already present replaces the callback in place, otherwise the entry is
//! appended. Lists stay tiny (a handful of event types per widget), so lookup
//! is a linear scan over a `Vec` rather than a map.

use std::fmt;
use std::rc::Rc;

use crate::element::ElementId;
use crate::event::{Event, EventType};
use crate::window::Window;

/// Callback invoked when an element handles an event.
///
/// Context the callback needs is captured by the closure. Callbacks receive
/// the window mutably so they can re-dispatch, move focus, or edit the tree.
pub type EventCallback = Rc<dyn Fn(&mut Window, ElementId, &Event)>;

#[derive(Clone)]
pub struct Handler {
    pub event_type: EventType,
    callback: EventCallback,
}

impl Handler {
    /// A cheap clone of the callback, detached from the registry.
    pub fn callback(&self) -> EventCallback {
        Rc::clone(&self.callback)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    handlers: Vec<Handler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry for `event_type` if present, otherwise append one.
    pub fn register(&mut self, event_type: EventType, callback: EventCallback) {
        match self.handlers.iter_mut().find(|h| h.event_type == event_type) {
            Some(existing) => existing.callback = callback,
            None => self.handlers.push(Handler {
                event_type,
                callback,
            }),
        }
    }

    /// Remove the entry for `event_type`. Absent entries are ignored.
    pub fn unregister(&mut self, event_type: EventType) {
        if let Some(pos) = self.handlers.iter().position(|h| h.event_type == event_type) {
            self.handlers.remove(pos);
        }
    }

    pub fn lookup(&self, event_type: EventType) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.event_type == event_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registered event types, in registration order.
    pub fn event_types(&self) -> impl Iterator<Item = EventType> + '_ {
        self.handlers.iter().map(|h| h.event_type)
    }
}

// =============================================================================
// Window-level registration API
// =============================================================================

impl Window {
    /// Attach `callback` to `element` for events of `event_type`.
    ///
    /// A second registration for the same type replaces the first.
    pub fn register_handler<F>(&mut self, element: ElementId, event_type: EventType, callback: F)
    where
        F: Fn(&mut Window, ElementId, &Event) + 'static,
    {
        match self.element_mut(element) {
            Some(elem) => elem.handlers.register(event_type, Rc::new(callback)),
            None => {
                debug_assert!(false, "register_handler on dead element {:?}", element);
                log::error!("register_handler: no element {:?}", element);
            }
        }
    }

    /// Drop the handler for `event_type` on `element`; a no-op when none is set.
    pub fn unregister_handler(&mut self, element: ElementId, event_type: EventType) {
        if let Some(elem) = self.element_mut(element) {
            elem.handlers.unregister(event_type);
        }
    }
}
