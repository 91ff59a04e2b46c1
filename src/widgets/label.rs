//! Label: a line of text whose minimum size is the measured text.
//!
//! Labels are transparent to hit testing, so pointer events land on the
//! widget that contains them.

use crate::element::{Behaviors, Direction, ElementId};
use crate::window::Window;

#[derive(Debug, Clone, Default)]
pub struct LabelData {
    pub text: String,
}

pub const LABEL_BEHAVIORS: Behaviors = Behaviors {
    type_name: "trellis.widgets.label",
    attach: label_attach,
    ..Behaviors::BASE
};

fn label_attach(window: &mut Window, id: ElementId, parent: Option<ElementId>) {
    (Behaviors::BASE.attach)(window, id, parent);
    measure(window, id);
}

fn measure(window: &mut Window, id: ElementId) {
    let Some(text) = window.data::<LabelData>(id).map(|d| d.text.clone()) else {
        return;
    };
    let size = window.fonts.measure(&text);
    if let Some(elem) = window.element_mut(id) {
        elem.min_size = size;
    }
}

/// Re-measure every attached label, e.g. after the font metrics changed.
/// Callers reflow afterwards.
pub(crate) fn remeasure_attached(window: &mut Window) {
    let labels: Vec<ElementId> = window
        .subtree(window.root())
        .into_iter()
        .filter(|&id| window.data::<LabelData>(id).is_some())
        .collect();
    for id in labels {
        measure(window, id);
    }
}

pub fn new(window: &mut Window, text: &str) -> ElementId {
    let id = window.create_element_with_data(LABEL_BEHAVIORS, LabelData { text: text.to_string() });
    if let Some(elem) = window.element_mut(id) {
        elem.pointer_events = false;
    }
    id
}

pub fn text(window: &Window, id: ElementId) -> Option<&str> {
    window.data::<LabelData>(id).map(|d| d.text.as_str())
}

/// Replace the text. An attached label is re-measured and the window reflows.
pub fn set_text(window: &mut Window, id: ElementId, text: &str) {
    let Some(data) = window.data_mut::<LabelData>(id) else {
        log::warn!("set_text: {:?} is not a label", id);
        return;
    };
    data.text = text.to_string();

    if window.element(id).map_or(false, |e| e.is_attached()) {
        measure(window, id);
        window.trigger_reflow(id, id, Direction::Rootward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::AddPosition;
    use crate::geom::{Point, Size};
    use crate::platform::{Dpi, PlatformEvent};
    use crate::testing::headless_window;

    #[test]
    fn test_label_keeps_text_and_type() {
        let mut window = headless_window();
        let root = window.root();
        let label = new(&mut window, "");
        window.add_child(root, label, AddPosition::Tail);

        assert_eq!(text(&window, label), Some(""));
        let type_name = window
            .element(label)
            .and_then(|e| e.type_ref())
            .and_then(|t| window.types().name(t));
        assert_eq!(type_name, Some("trellis.widgets.label"));
        assert_eq!(window.element(label).map(|e| e.min_size), Some(Size::default()));
    }

    #[test]
    fn test_set_text_on_detached_label_only_stores() {
        let mut window = headless_window();
        let label = new(&mut window, "a");
        set_text(&mut window, label, "");
        assert_eq!(text(&window, label), Some(""));
        assert_eq!(window.element(label).map(|e| e.is_attached()), Some(false));
    }

    #[test]
    fn test_dpi_change_remeasures_labels() {
        let mut window = headless_window();
        let root = window.root();
        let label = new(&mut window, "hi");
        window.add_child(root, label, AddPosition::Tail);
        window.reinit();
        // 16px font, 19.2px line.
        assert_eq!(window.element(label).map(|e| e.min_size.h), Some(20.0));

        window.handle_platform_event(PlatformEvent::DpiChanged(Dpi { x: 192.0, y: 192.0 }));

        // 32px font, 38.4px line.
        assert_eq!(window.element(label).map(|e| e.min_size.h), Some(39.0));
        let height = window.element(label).map_or(0.0, |e| e.rect.h);
        assert!(height >= 39.0, "laid out at {}", height);
    }

    #[test]
    fn test_label_is_transparent_to_hit_testing() {
        let mut window = headless_window();
        let root = window.root();
        let label = new(&mut window, "");
        window.add_child(root, label, AddPosition::Tail);
        // Empty text measures to nothing; give it a box to land on.
        if let Some(elem) = window.element_mut(label) {
            elem.min_size = Size::new(50.0, 20.0);
        }
        window.reinit();

        assert_eq!(window.element_at(Point::new(5.0, 5.0)), Some(root));
    }
}
