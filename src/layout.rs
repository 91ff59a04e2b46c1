//! Layout strategies and reflow
//!
//! Each element contributes a flexbox style to the window's taffy tree. The
//! style is composed from three sources: the element's outer padding, its
//! `size` strategy (how it sizes itself inside its parent) and its `layout`
//! strategy (how it arranges its own children). A reflow rebuilds those
//! styles, lets taffy compute the window, copies the results back into
//! absolute element rectangles and then runs `recalc` over the affected
//! subtree.

use taffy::prelude::length;

use crate::element::{Direction, Element, ElementId};
use crate::geom::{Point, Rect};
use crate::window::Window;

// =============================================================================
// Layout Strategies
// =============================================================================

/// Stack children vertically from the top edge, left aligned.
pub fn vpack_top(style: &mut taffy::Style) {
    style.flex_direction = taffy::FlexDirection::Column;
    style.justify_content = Some(taffy::JustifyContent::FlexStart);
    style.align_items = Some(taffy::AlignItems::FlexStart);
}

/// Stack children vertically, centered on both axes.
pub fn vpack_center(style: &mut taffy::Style) {
    style.flex_direction = taffy::FlexDirection::Column;
    style.justify_content = Some(taffy::JustifyContent::Center);
    style.align_items = Some(taffy::AlignItems::Center);
}

/// Lay children out in a row from the left edge, vertically centered.
pub fn hpack_left(style: &mut taffy::Style) {
    style.flex_direction = taffy::FlexDirection::Row;
    style.justify_content = Some(taffy::JustifyContent::FlexStart);
    style.align_items = Some(taffy::AlignItems::Center);
}

/// Lay children out in a row, centered on both axes.
pub fn hpack_center(style: &mut taffy::Style) {
    style.flex_direction = taffy::FlexDirection::Row;
    style.justify_content = Some(taffy::JustifyContent::Center);
    style.align_items = Some(taffy::AlignItems::Center);
}

// =============================================================================
// Size Strategies
// =============================================================================

/// Never smaller than the element's own minimum size.
pub fn size_self(elem: &Element, style: &mut taffy::Style) {
    style.min_size = taffy::Size {
        width: length(elem.min_size.w),
        height: length(elem.min_size.h),
    };
}

/// Wide enough for the children plus padding, never below the minimum size.
pub fn size_hfit_children(elem: &Element, style: &mut taffy::Style) {
    size_self(elem, style);
    style.size.width = taffy::Dimension::Auto;
    style.flex_shrink = 0.0;
}

/// Take all space the parent offers.
pub fn size_fill(elem: &Element, style: &mut taffy::Style) {
    size_self(elem, style);
    style.flex_grow = 1.0;
    style.align_self = Some(taffy::AlignSelf::Stretch);
}

/// Flex style for an element, before window-level overrides.
pub fn element_style(elem: &Element) -> taffy::Style {
    let pad = length(elem.outer_pad);
    let mut style = taffy::Style {
        display: taffy::Display::Flex,
        padding: taffy::Rect {
            left: pad,
            right: pad,
            top: pad,
            bottom: pad,
        },
        ..Default::default()
    };
    (elem.behaviors.size)(elem, &mut style);
    (elem.behaviors.layout)(&mut style);
    style
}

// =============================================================================
// Reflow
// =============================================================================

impl Window {
    /// Recompute layout and notify elements of their new geometry.
    ///
    /// `Leafward` recalcs `element` and its descendants. `Rootward` restarts
    /// from the window root so that every ancestor sees the change too.
    /// Nothing happens while the window is unattached.
    pub fn trigger_reflow(&mut self, element: ElementId, instigator: ElementId, direction: Direction) {
        let root = self.root;
        if !self.element(root).map_or(false, |r| r.is_attached()) {
            return;
        }
        let start = match direction {
            Direction::Leafward => element,
            Direction::Rootward => root,
        };
        if !self.element(start).map_or(false, |e| e.is_attached()) {
            log::debug!("trigger_reflow: {:?} is not attached", start);
            return;
        }

        self.compute_layout();

        for id in self.subtree(start) {
            if let Some(recalc) = self.behaviors(id).map(|b| b.recalc) {
                recalc(self, id, instigator, Direction::Leafward);
            }
        }
        self.mark_dirty(root);
    }

    /// Sync element styles into taffy, solve, and write absolute rects back.
    fn compute_layout(&mut self) {
        let root = self.root;
        let ids = self.subtree(root);

        for &id in &ids {
            let Some(elem) = self.elements.get(&id) else {
                continue;
            };
            let Some(node) = elem.layout_node else {
                continue;
            };
            let mut style = element_style(elem);
            if id == root {
                style.size = taffy::Size {
                    width: length(self.width as f32),
                    height: length(self.height as f32),
                };
            }
            if let Err(e) = self.layout_tree.set_style(node, style) {
                log::debug!("compute_layout: set_style failed for {:?}: {:?}", id, e);
            }
        }

        let Some(root_node) = self.elements.get(&root).and_then(|e| e.layout_node) else {
            return;
        };
        let available_space = taffy::Size {
            width: taffy::AvailableSpace::Definite(self.width as f32),
            height: taffy::AvailableSpace::Definite(self.height as f32),
        };
        if let Err(e) = self.layout_tree.compute_layout(root_node, available_space) {
            log::warn!("compute_layout: taffy failed: {:?}", e);
            return;
        }

        // Parents come before children in `ids`, so parent rects are final
        // by the time a child is placed.
        for &id in &ids {
            let origin = match self.parent(id).and_then(|p| self.elements.get(&p)) {
                Some(parent) => parent.rect.origin(),
                None => Point::default(),
            };
            let Some(layout) = self.get_layout(id) else {
                continue;
            };
            if let Some(elem) = self.elements.get_mut(&id) {
                elem.rect = Rect::new(
                    origin.x + layout.location.x,
                    origin.y + layout.location.y,
                    layout.size.width,
                    layout.size.height,
                );
            }
        }
    }

    fn get_layout(&self, id: ElementId) -> Option<taffy::Layout> {
        let node = self.elements.get(&id)?.layout_node?;
        self.layout_tree.layout(node).ok().copied()
    }
}
