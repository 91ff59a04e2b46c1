//! Panel: a plain container that fills its parent.

use crate::element::{Behaviors, Direction, ElementId, LayoutFn};
use crate::layout;
use crate::window::Window;

pub const PANEL_BEHAVIORS: Behaviors = Behaviors {
    type_name: "trellis.widgets.panel",
    size: layout::size_fill,
    ..Behaviors::BASE
};

pub fn new(window: &mut Window) -> ElementId {
    window.create_element(PANEL_BEHAVIORS)
}

/// Change how the panel arranges its children.
pub fn set_layout(window: &mut Window, id: ElementId, layout: LayoutFn) {
    let attached = match window.element_mut(id) {
        Some(elem) => {
            elem.behaviors.layout = layout;
            elem.is_attached()
        }
        None => return,
    };
    if attached {
        window.trigger_reflow(id, id, Direction::Leafward);
    }
}
