//! Tree construction and mutation
//!
//! Elements are created detached. Inserting one under an attached parent runs
//! its `attach` behavior (and its subtree's), then reflows the window.
//! Removing or destroying a subtree first forgets any focus, hover or pointer
//! state that pointed into it, so no stale id survives in the window.

use std::any::Any;

use crate::element::{AddPosition, Behaviors, Direction, Element, ElementId};
use crate::window::Window;

// =============================================================================
// Creation
// =============================================================================

impl Window {
    /// Create a detached element with the given behaviors.
    pub fn create_element(&mut self, behaviors: Behaviors) -> ElementId {
        let id = ElementId(self.next_handle);
        self.next_handle += 1;

        let layout_node = match self.layout_tree.new_leaf(taffy::Style::default()) {
            Ok(node) => Some(node),
            Err(e) => {
                log::error!("create_element: taffy leaf for {:?} failed: {:?}", id, e);
                None
            }
        };

        self.elements.insert(id, Element::new(id, behaviors, layout_node));
        log::debug!("create_element: {:?} ({})", id, behaviors.type_name);
        id
    }

    /// Create a detached element carrying widget data of type `T`.
    pub fn create_element_with_data<T: Any>(&mut self, behaviors: Behaviors, data: T) -> ElementId {
        let id = self.create_element(behaviors);
        if let Some(elem) = self.elements.get_mut(&id) {
            elem.data = Some(Box::new(data));
        }
        id
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Insert `child` under `parent`.
    ///
    /// When `parent` is attached the child subtree is attached as well and the
    /// window reflows.
    pub fn add_child(&mut self, parent: ElementId, child: ElementId, position: AddPosition) {
        if parent == child || !self.contains(parent) {
            debug_assert!(false, "add_child: bad parent {:?} for {:?}", parent, child);
            log::warn!("add_child: bad parent {:?} for {:?}", parent, child);
            return;
        }
        match self.elements.get(&child) {
            Some(elem) if elem.parent.is_none() && child != self.root => {}
            _ => {
                debug_assert!(false, "add_child: {:?} already has a parent", child);
                log::warn!("add_child: {:?} is not a free element", child);
                return;
            }
        }

        let (parent_node, parent_attached) = match self.elements.get_mut(&parent) {
            Some(p) => {
                match position {
                    AddPosition::Head => p.children.insert(0, child),
                    AddPosition::Tail => p.children.push(child),
                }
                (p.layout_node, p.is_attached())
            }
            None => return,
        };
        let child_node = self.elements.get_mut(&child).and_then(|c| {
            c.parent = Some(parent);
            c.layout_node
        });

        if let (Some(pn), Some(cn)) = (parent_node, child_node) {
            let linked = match position {
                AddPosition::Head => self.layout_tree.insert_child_at_index(pn, 0, cn),
                AddPosition::Tail => self.layout_tree.add_child(pn, cn),
            };
            if let Err(e) = linked {
                log::debug!("add_child: taffy link {:?} -> {:?} failed: {:?}", parent, child, e);
            }
        }

        if parent_attached {
            if let Some(attach) = self.behaviors(child).map(|b| b.attach) {
                attach(self, child, Some(parent));
            }
            self.trigger_reflow(child, child, Direction::Rootward);
        }
    }

    /// Detach `child` (and its subtree) from `parent`. The subtree stays alive
    /// and can be inserted elsewhere.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) {
        if self.parent(child) != Some(parent) {
            debug_assert!(false, "remove_child: {:?} is not a child of {:?}", child, parent);
            log::warn!("remove_child: {:?} is not a child of {:?}", child, parent);
            return;
        }

        let subtree = self.subtree(child);
        self.forget(&subtree);
        self.unlink(parent, child);
        for id in &subtree {
            if let Some(elem) = self.elements.get_mut(id) {
                elem.window = None;
            }
        }

        if self.element(parent).map_or(false, |p| p.is_attached()) {
            self.trigger_reflow(parent, parent, Direction::Rootward);
        }
    }

    /// Tear down `id` and its whole subtree, children first.
    pub fn destroy_element(&mut self, id: ElementId) {
        if id == self.root {
            debug_assert!(false, "destroy_element: the root is released with the window");
            log::warn!("destroy_element: refusing to destroy the window root");
            return;
        }
        if !self.contains(id) {
            log::debug!("destroy_element: {:?} already gone", id);
            return;
        }

        let subtree = self.subtree(id);
        self.forget(&subtree);

        let parent = self.parent(id);
        if let Some(parent) = parent {
            self.unlink(parent, id);
        }

        self.release_subtree(id);

        if let Some(parent) = parent {
            if self.element(parent).map_or(false, |p| p.is_attached()) {
                self.trigger_reflow(parent, parent, Direction::Rootward);
            }
        }
    }

    /// Post-order release: teardown behavior, layout node, arena slot.
    pub(crate) fn release_subtree(&mut self, id: ElementId) {
        let children = self.children(id).to_vec();
        for child in children {
            self.release_subtree(child);
        }

        if let Some(teardown) = self.behaviors(id).map(|b| b.teardown) {
            teardown(self, id);
        }

        if let Some(elem) = self.elements.remove(&id) {
            if let Some(node) = elem.layout_node {
                if let Err(e) = self.layout_tree.remove(node) {
                    log::debug!("release_subtree: taffy remove failed for {:?}: {:?}", id, e);
                }
            }
        }
    }

    fn unlink(&mut self, parent: ElementId, child: ElementId) {
        let parent_node = self.elements.get_mut(&parent).and_then(|p| {
            p.children.retain(|c| *c != child);
            p.layout_node
        });
        let child_node = self.elements.get_mut(&child).and_then(|c| {
            c.parent = None;
            c.layout_node
        });
        if let (Some(pn), Some(cn)) = (parent_node, child_node) {
            if let Err(e) = self.layout_tree.remove_child(pn, cn) {
                log::debug!("unlink: taffy unlink {:?} -> {:?} failed: {:?}", parent, child, e);
            }
        }
    }

    /// Drop focus, hover and pointer references into `ids` without delivering
    /// any events.
    fn forget(&mut self, ids: &[ElementId]) {
        if self.focus.map_or(false, |f| ids.contains(&f)) {
            log::debug!("forget: clearing focus {:?}", self.focus);
            self.focus = None;
        }
        if self.hover.map_or(false, |h| ids.contains(&h)) {
            self.hover = None;
        }
        self.pointer.forget(ids);
    }

    /// `id` and all its descendants, parents before children.
    pub fn subtree(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if !self.contains(current) {
                continue;
            }
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn element_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    /// Children of `id` in order; empty for unknown ids.
    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.elements.get(&id).map_or(&[], |e| e.children.as_slice())
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.elements.get(&id).and_then(|e| e.parent)
    }

    pub fn behaviors(&self, id: ElementId) -> Option<Behaviors> {
        self.elements.get(&id).map(|e| e.behaviors)
    }

    /// Widget data attached at creation, if it is a `T`.
    pub fn data<T: Any>(&self, id: ElementId) -> Option<&T> {
        self.elements
            .get(&id)
            .and_then(|e| e.data.as_ref())
            .and_then(|d| d.downcast_ref::<T>())
    }

    pub fn data_mut<T: Any>(&mut self, id: ElementId) -> Option<&mut T> {
        self.elements
            .get_mut(&id)
            .and_then(|e| e.data.as_mut())
            .and_then(|d| d.downcast_mut::<T>())
    }

    pub fn element_count(&self) -> usize {
        self.elements.len()
    }
}
