//! Element model
//!
//! Every node in the widget tree is an [`Element`] stored in the window's
//! arena and addressed by an [`ElementId`]. What an element *does* is decided
//! by its [`Behaviors`] table: a small `Copy` struct of function pointers.
//! Widget kinds start from [`Behaviors::BASE`], overwrite the slots they care
//! about, and call the base slot explicitly when they want the default on top
//! of their own work.
//!
//! Parent, window, focus and hover links are all plain ids into the arena, so
//! nothing in the tree holds a reference to anything else.

use std::any::Any;
use std::fmt;

use once_cell::unsync::OnceCell;
use taffy::NodeId;

use crate::dispatch;
use crate::event::Event;
use crate::geom::{Rect, Size};
use crate::handler::HandlerRegistry;
use crate::layout;
use crate::style::{self, ResolvedStyle};
use crate::window::Window;

// =============================================================================
// Handles & Enums
// =============================================================================

/// Handle to an element in a window's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub(crate) usize);

/// Visual state an element is asked to draw itself in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawState {
    Normal,
    Hover,
    Focus,
}

/// Which way a reflow travels through the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the changed element down into its descendants.
    Leafward,
    /// Up to the window, which then reflows everything.
    Rootward,
}

/// Where [`Window::add_child`](crate::window::Window::add_child) inserts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddPosition {
    Head,
    Tail,
}

/// Interned widget type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeRef(pub(crate) u32);

// =============================================================================
// Behavior Table
// =============================================================================

pub type DrawFn = fn(&mut Window, ElementId, DrawState);
pub type EventFn = fn(&mut Window, ElementId, &Event) -> bool;
pub type RecalcFn = fn(&mut Window, ElementId, ElementId, Direction);
pub type AttachFn = fn(&mut Window, ElementId, Option<ElementId>);
pub type MarkDirtyFn = fn(&mut Window, ElementId);
pub type LayoutFn = fn(&mut taffy::Style);
pub type SizeFn = fn(&Element, &mut taffy::Style);
pub type TeardownFn = fn(&mut Window, ElementId);

/// Per-kind behavior slots.
#[derive(Clone, Copy)]
pub struct Behaviors {
    /// Dotted name used for type interning and stylesheet matching.
    pub type_name: &'static str,
    pub draw: DrawFn,
    /// Returns whether the event was claimed.
    pub on_event: EventFn,
    /// Recompute geometry-dependent state after a layout pass. The second
    /// argument is the element that started the reflow.
    pub recalc: RecalcFn,
    /// Called once per attachment, with the new parent (`None` for the root).
    pub attach: AttachFn,
    pub mark_dirty: MarkDirtyFn,
    /// How children are arranged.
    pub layout: LayoutFn,
    /// How the element sizes itself within its parent.
    pub size: SizeFn,
    /// Release widget resources right before the element is freed.
    pub teardown: TeardownFn,
}

impl Behaviors {
    pub const BASE: Behaviors = Behaviors {
        type_name: "trellis.element",
        draw: base_draw,
        on_event: base_on_event,
        recalc: base_recalc,
        attach: base_attach,
        mark_dirty: base_mark_dirty,
        layout: layout::vpack_top,
        size: layout::size_self,
        teardown: base_teardown,
    };
}

impl Default for Behaviors {
    fn default() -> Self {
        Self::BASE
    }
}

impl fmt::Debug for Behaviors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Behaviors")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Element
// =============================================================================

/// A node in the widget tree.
#[derive(Debug)]
pub struct Element {
    pub(crate) id: ElementId,
    /// Absolute rectangle in window coordinates, written by reflow.
    pub rect: Rect,
    pub min_size: Size,
    /// Padding between the element's edge and its children.
    pub outer_pad: f32,
    pub behaviors: Behaviors,
    pub(crate) children: Vec<ElementId>,
    pub(crate) parent: Option<ElementId>,
    /// Root id of the window this element is attached to.
    pub(crate) window: Option<ElementId>,
    pub dirty: bool,
    /// Whether hit testing may stop at this element. Children are still
    /// tested when this is off.
    pub pointer_events: bool,
    pub(crate) type_ref: OnceCell<TypeRef>,
    pub style: ResolvedStyle,
    pub handlers: HandlerRegistry,
    pub(crate) layout_node: Option<NodeId>,
    pub(crate) data: Option<Box<dyn Any>>,
}

impl Element {
    pub(crate) fn new(id: ElementId, behaviors: Behaviors, layout_node: Option<NodeId>) -> Self {
        Self {
            id,
            rect: Rect::default(),
            min_size: Size::default(),
            outer_pad: 0.0,
            behaviors,
            children: Vec::new(),
            parent: None,
            window: None,
            dirty: true,
            pointer_events: true,
            type_ref: OnceCell::new(),
            style: ResolvedStyle::default(),
            handlers: HandlerRegistry::new(),
            layout_node,
            data: None,
        }
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn is_attached(&self) -> bool {
        self.window.is_some()
    }

    /// The interned type, once the element has been attached.
    pub fn type_ref(&self) -> Option<TypeRef> {
        self.type_ref.get().copied()
    }
}

// =============================================================================
// Type Registry
// =============================================================================

/// Interns widget type names so elements can compare types cheaply.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    names: Vec<&'static str>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, name: &'static str) -> TypeRef {
        if let Some(pos) = self.names.iter().position(|n| *n == name) {
            return TypeRef(pos as u32);
        }
        self.names.push(name);
        TypeRef((self.names.len() - 1) as u32)
    }

    pub fn name(&self, type_ref: TypeRef) -> Option<&'static str> {
        self.names.get(type_ref.0 as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

// =============================================================================
// Base Behaviors
// =============================================================================

/// Draw every child in its current visual state, then clear the dirty flag.
pub fn base_draw(window: &mut Window, id: ElementId, _state: DrawState) {
    let children = window.children(id).to_vec();
    for child in children {
        let Some(draw) = window.behaviors(child).map(|b| b.draw) else {
            continue;
        };
        let state = window.draw_state_of(child);
        draw(window, child, state);
    }
    if let Some(elem) = window.element_mut(id) {
        elem.dirty = false;
    }
}

/// Consult the element's handler registry.
pub fn base_on_event(window: &mut Window, id: ElementId, event: &Event) -> bool {
    dispatch::handle(window, id, event)
}

pub fn base_recalc(window: &mut Window, id: ElementId, _instigator: ElementId, _dir: Direction) {
    if let Some(mark_dirty) = window.behaviors(id).map(|b| b.mark_dirty) {
        mark_dirty(window, id);
    }
}

/// Link the element into its parent's window, resolve its type and style,
/// then attach its children.
pub fn base_attach(window: &mut Window, id: ElementId, parent: Option<ElementId>) {
    let root = window.root();
    let type_name = match window.element(id) {
        Some(elem) => {
            if elem.is_attached() {
                debug_assert!(false, "attach on already attached element {:?}", id);
                log::warn!("base_attach: {:?} is already attached", id);
                return;
            }
            elem.behaviors.type_name
        }
        None => return,
    };

    let type_ref = window.types.intern(type_name);
    if let Some(elem) = window.element_mut(id) {
        if parent.is_some() {
            elem.parent = parent;
        }
        elem.window = Some(root);
        let _ = elem.type_ref.get_or_init(|| type_ref);
    }

    style::resolve(window, id);

    let children = window.children(id).to_vec();
    for child in children {
        if let Some(attach) = window.behaviors(child).map(|b| b.attach) {
            attach(window, child, Some(id));
        }
    }
}

/// Flag the element, and the window's frame if the element is attached.
pub fn base_mark_dirty(window: &mut Window, id: ElementId) {
    let attached = match window.element_mut(id) {
        Some(elem) => {
            elem.dirty = true;
            elem.is_attached()
        }
        None => false,
    };
    if attached {
        window.dirty = true;
    }
}

pub fn base_teardown(_window: &mut Window, _id: ElementId) {}

impl Window {
    /// Visual state the element should be drawn in right now.
    pub fn draw_state_of(&self, id: ElementId) -> DrawState {
        if self.focus == Some(id) {
            DrawState::Focus
        } else if self.hover == Some(id) {
            DrawState::Hover
        } else {
            DrawState::Normal
        }
    }

    /// Run the element's `mark_dirty` behavior.
    pub fn mark_dirty(&mut self, id: ElementId) {
        if let Some(mark_dirty) = self.behaviors(id).map(|b| b.mark_dirty) {
            mark_dirty(self, id);
        }
    }
}
