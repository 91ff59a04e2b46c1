//! Event model
//!
//! An [`Event`] is a tagged record: an [`EventType`] plus a [`Payload`] that
//! carries the type-specific data. Events are `Copy` and immutable once
//! dispatched; code that wants to re-target an event (a button translating a
//! click into its own coordinate space, for instance) builds a derived event
//! and dispatches that instead.

use crate::element::ElementId;
use crate::geom::{Point, Size};

// =============================================================================
// Event Types
// =============================================================================

/// Every kind of event the core knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// The platform asked for the window to close.
    WindowClose,
    /// Emitted at the root right before a frame is drawn.
    FrameStart,
    /// Emitted at the root right after a frame is drawn.
    FrameEnd,

    MouseEnter,
    MouseLeave,
    MouseDown,
    MouseUp,
    /// Press and release on the same element without dragging.
    MouseClick,
    MouseWheel,

    DragStart,
    DragMotion,
    DragDrop,

    KeyPress,
    KeyRelease,

    /// Delivered directly (never bubbled) to an element gaining focus.
    Focus,
    /// Delivered directly (never bubbled) to an element losing focus.
    Unfocus,

    /// A button was activated; cursor is in the button's local coordinates.
    ButtonClick,

    /// Application-defined event types.
    User(u32),
}

/// Where an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventSource {
    /// Produced by the platform layer or the frame driver.
    Genuine,
    /// Constructed by application or widget code.
    #[default]
    Synthetic,
}

// =============================================================================
// Payloads
// =============================================================================

/// Mouse buttons, numbered the way X11 numbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Primary (usually left) button.
    Button1,
    /// Middle button.
    Button2,
    /// Secondary (usually right) button.
    Button3,
    Other(u16),
}

/// Keyboard modifier flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(u8);

impl Modifiers {
    pub const NONE: Modifiers = Modifiers(0);
    pub const SHIFT: Modifiers = Modifiers(1);
    pub const CTRL: Modifiers = Modifiers(2);
    pub const ALT: Modifiers = Modifiers(4);
    pub const SUPER: Modifiers = Modifiers(8);

    pub fn contains(self, other: Modifiers) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Modifiers) {
        self.0 |= other.0;
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Logical key identity, independent of keyboard layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keysym {
    Char(char),
    Enter,
    Escape,
    Tab,
    Backspace,
    Delete,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub cursor: Point,
    pub click_number: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragEvent {
    pub button: MouseButton,
    /// Where the press that started the drag happened.
    pub start: Point,
    pub cursor: Point,
    /// Element the drag started on.
    pub origin: Option<ElementId>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyEvent {
    pub keysym: Keysym,
    pub modifiers: Modifiers,
    /// Text produced by the key press, if any.
    pub character: Option<char>,
}

/// Type-specific event data.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Payload {
    #[default]
    None,
    Mouse(MouseEvent),
    Wheel { delta: Point, cursor: Point },
    Drag(DragEvent),
    Key(KeyEvent),
    Window { size: Size },
    Frame { size: Size },
}

// =============================================================================
// Event
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Event {
    pub ty: EventType,
    pub source: EventSource,
    pub payload: Payload,
}

impl Event {
    /// A synthetic event with no payload.
    pub fn new(ty: EventType) -> Self {
        Self {
            ty,
            source: EventSource::Synthetic,
            payload: Payload::None,
        }
    }

    /// An event originating from the platform layer or frame driver.
    pub fn genuine(ty: EventType, payload: Payload) -> Self {
        Self {
            ty,
            source: EventSource::Genuine,
            payload,
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }

    /// Same source and payload under a different type.
    pub fn retyped(&self, ty: EventType) -> Self {
        Self { ty, ..*self }
    }

    pub fn mouse(&self) -> Option<&MouseEvent> {
        match &self.payload {
            Payload::Mouse(m) => Some(m),
            _ => None,
        }
    }

    pub fn key(&self) -> Option<&KeyEvent> {
        match &self.payload {
            Payload::Key(k) => Some(k),
            _ => None,
        }
    }
}
