//! Arena-based component storage with hierarchical invalidation.
//!
//! Components live in a dense array for cache-friendly update and render
//! walks, with a sparse map from stable [`ComponentId`] handles to dense
//! slots. Generational indices catch stale handles to reallocated slots.
//!
//! The tree is also where validation flags become hierarchical: descending
//! flags (transform, tint, view-projection, styles) cascade to descendants,
//! while layout invalidation bubbles to ancestors, stopping early at
//! already-dirty nodes.

use crate::component::Component;
use crate::geom::Vec2;
use crate::render_context::ComputedContext;
use crate::renderer::{GlState, GraphicsApi};
use crate::validation::ValidationFlags;

/// Flags that cascade from a node down to its descendants.
pub const CASCADE_FLAGS: ValidationFlags = ValidationFlags::TRANSFORM
    .union(ValidationFlags::COLOR_TINT)
    .union(ValidationFlags::VIEW_PROJECTION)
    .union(ValidationFlags::STYLES)
    .union(ValidationFlags::HIERARCHY_DESCENDING);

/// Flags that bubble from a node up to its ancestors.
pub const BUBBLE_FLAGS: ValidationFlags =
    ValidationFlags::LAYOUT.union(ValidationFlags::HIERARCHY_ASCENDING);

/// Stable handle to a component in the tree.
///
/// `index` addresses a sparse slot (reusable after removal) and `generation`
/// detects reuse, so a handle kept across a removal can never alias the
/// slot's next occupant.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ComponentId {
    index: u32,
    generation: u32,
}

impl ComponentId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

struct SparseEntry {
    dense_index: usize,
    generation: u32,
}

struct Node {
    component: Component,
    parent: Option<ComponentId>,
    children: Vec<ComponentId>,
    active: bool,
    /// Back-pointer for swap-remove fixup.
    sparse_index: u32,
}

pub struct ComponentTree {
    dense: Vec<Node>,
    sparse: Vec<Option<SparseEntry>>,
    free_indices: Vec<u32>,
}

impl Default for ComponentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ComponentTree {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Store a component and return its handle. The component starts
    /// detached and inactive; attach it with [`ComponentTree::add_child`]
    /// or [`ComponentTree::activate`].
    pub fn register(&mut self, component: Component) -> ComponentId {
        let (sparse_index, generation) = if let Some(idx) = self.free_indices.pop() {
            let old_gen = self.sparse[idx as usize]
                .as_ref()
                .map(|e| e.generation)
                .unwrap_or(0);
            (idx, old_gen.wrapping_add(1))
        } else {
            let idx = self.sparse.len() as u32;
            self.sparse.push(None);
            (idx, 0)
        };

        let dense_index = self.dense.len();
        let id = ComponentId::new(sparse_index, generation);
        self.dense.push(Node {
            component,
            parent: None,
            children: Vec::new(),
            active: false,
            sparse_index,
        });
        self.sparse[sparse_index as usize] = Some(SparseEntry {
            dense_index,
            generation,
        });
        id
    }

    /// Remove a component and its whole subtree.
    pub fn unregister(&mut self, id: ComponentId) {
        for child in self.children(id) {
            self.unregister(child);
        }
        let Some(dense_index) = self.dense_index(id) else {
            return;
        };

        if let Some(parent_id) = self.dense[dense_index].parent {
            if let Some(parent_dense) = self.dense_index(parent_id) {
                self.dense[parent_dense].children.retain(|&c| c != id);
                self.invalidate(parent_id, ValidationFlags::LAYOUT);
            }
        }

        let last_dense_index = self.dense.len() - 1;
        self.dense.swap_remove(dense_index);
        if dense_index != last_dense_index && !self.dense.is_empty() {
            let moved_sparse_idx = self.dense[dense_index].sparse_index;
            if let Some(entry) = self.sparse[moved_sparse_idx as usize].as_mut() {
                entry.dense_index = dense_index;
            }
        }

        self.sparse[id.index as usize] = None;
        self.free_indices.push(id.index);
    }

    fn dense_index(&self, id: ComponentId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == id.generation)
            .map(|e| e.dense_index)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.dense_index(id).map(|idx| &self.dense[idx].component)
    }

    pub fn component_mut(&mut self, id: ComponentId) -> Option<&mut Component> {
        self.dense_index(id)
            .map(|idx| &mut self.dense[idx].component)
    }

    pub fn parent(&self, id: ComponentId) -> Option<ComponentId> {
        self.dense_index(id).and_then(|idx| self.dense[idx].parent)
    }

    pub fn children(&self, id: ComponentId) -> Vec<ComponentId> {
        self.dense_index(id)
            .map(|idx| self.dense[idx].children.clone())
            .unwrap_or_default()
    }

    pub fn is_active(&self, id: ComponentId) -> bool {
        self.dense_index(id)
            .map(|idx| self.dense[idx].active)
            .unwrap_or(false)
    }

    pub fn component_count(&self) -> usize {
        self.dense.len()
    }

    /// Attach `child` under `parent`.
    ///
    /// The parent's layout is invalidated (bubbling), the child inherits the
    /// parent's cascading state, and the child subtree activates when the
    /// parent is active.
    pub fn add_child(&mut self, parent: ComponentId, child: ComponentId) {
        let Some(child_dense) = self.dense_index(child) else {
            return;
        };
        let Some(parent_dense) = self.dense_index(parent) else {
            return;
        };
        debug_assert!(self.dense[child_dense].parent.is_none(), "child already attached");
        self.dense[child_dense].parent = Some(parent);
        if !self.dense[parent_dense].children.contains(&child) {
            self.dense[parent_dense].children.push(child);
        }
        self.invalidate(parent, ValidationFlags::LAYOUT);
        self.invalidate(child, CASCADE_FLAGS);
        if self.dense[parent_dense].active {
            self.activate(child);
        }
    }

    /// Detach `child` from its parent without removing it from the arena.
    pub fn remove_child(&mut self, child: ComponentId) {
        let Some(child_dense) = self.dense_index(child) else {
            return;
        };
        let Some(parent) = self.dense[child_dense].parent.take() else {
            return;
        };
        if let Some(parent_dense) = self.dense_index(parent) {
            self.dense[parent_dense].children.retain(|&c| c != child);
        }
        self.invalidate(parent, ValidationFlags::LAYOUT);
        self.deactivate(child);
    }

    /// Activate a subtree: every node starts participating in update and
    /// render walks, with all state dirty.
    pub fn activate(&mut self, id: ComponentId) {
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        if !self.dense[idx].active {
            self.dense[idx].active = true;
            self.dense[idx].component.invalidate(ValidationFlags::ALL);
        }
        for child in self.children(id) {
            self.activate(child);
        }
    }

    pub fn deactivate(&mut self, id: ComponentId) {
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        self.dense[idx].active = false;
        for child in self.children(id) {
            self.deactivate(child);
        }
    }

    /// Invalidate flags on a node with hierarchical semantics: cascading
    /// flags propagate to descendants, bubbling flags to ancestors.
    ///
    /// Propagation in either direction stops early at a node where nothing
    /// newly invalidates, since its subtree or ancestor chain must already
    /// be dirty from the earlier pass.
    pub fn invalidate(&mut self, id: ComponentId, flags: ValidationFlags) {
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        let changed = self.dense[idx].component.invalidate(flags);

        let down = flags & CASCADE_FLAGS;
        if !down.is_empty() && !(changed & CASCADE_FLAGS).is_empty() {
            for child in self.children(id) {
                self.invalidate_descendants(child, down);
            }
        }

        let up = flags & BUBBLE_FLAGS;
        if !up.is_empty() && !(changed & BUBBLE_FLAGS).is_empty() {
            let mut current = self.parent(id);
            while let Some(ancestor) = current {
                let Some(aidx) = self.dense_index(ancestor) else {
                    break;
                };
                let newly = self.dense[aidx].component.invalidate(up);
                if (newly & BUBBLE_FLAGS).is_empty() {
                    break;
                }
                current = self.parent(ancestor);
            }
        }
    }

    fn invalidate_descendants(&mut self, id: ComponentId, flags: ValidationFlags) {
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        let changed = self.dense[idx].component.invalidate(flags);
        if (changed & flags).is_empty() {
            return;
        }
        for child in self.children(id) {
            self.invalidate_descendants(child, flags);
        }
    }

    /// Validate a subtree top-down, feeding each node's computed context
    /// into its children.
    pub fn update(&mut self, root: ComponentId, context: &ComputedContext) {
        self.update_node(root, context);
    }

    fn update_node(&mut self, id: ComponentId, parent_context: &ComputedContext) {
        let Some(idx) = self.dense_index(id) else {
            return;
        };
        if !self.dense[idx].active {
            return;
        }
        self.dense[idx].component.update(parent_context);
        let snapshot = self.dense[idx].component.computed_context().clone();
        for child in self.children(id) {
            self.update_node(child, &snapshot);
        }
    }

    /// Draw a subtree in painter's order (parents under children, siblings
    /// in attach order). Invisible nodes hide their whole subtree. Returns
    /// the number of components actually drawn.
    pub fn render<A: GraphicsApi>(&mut self, root: ComponentId, gl: &mut GlState<A>) -> usize {
        let Some(idx) = self.dense_index(root) else {
            return 0;
        };
        if !self.dense[idx].active || !self.dense[idx].component.visible() {
            return 0;
        }
        let mut drawn = usize::from(self.dense[idx].component.draw(gl));
        for child in self.children(root) {
            drawn += self.render(child, gl);
        }
        drawn
    }

    /// Find the front-most interactive component under a canvas point.
    ///
    /// Walks in reverse paint order so later-drawn siblings win; a node with
    /// interactivity `None` blocks its whole subtree.
    pub fn hit_test(&mut self, root: ComponentId, canvas: Vec2) -> Option<ComponentId> {
        use crate::component::InteractivityMode;

        let idx = self.dense_index(root)?;
        if !self.dense[idx].active || !self.dense[idx].component.visible() {
            return None;
        }
        if self.dense[idx].component.interactivity() == InteractivityMode::None {
            return None;
        }
        for child in self.children(root).into_iter().rev() {
            if let Some(hit) = self.hit_test(child, canvas) {
                return Some(hit);
            }
        }
        let idx = self.dense_index(root)?;
        if self.dense[idx].component.contains_canvas_point(canvas) {
            Some(root)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::color::Color;
    use crate::component::InteractivityMode;
    use crate::geom::{Rect, Vec3};
    use crate::renderer::gl_state::tests::RecordingApi;

    fn sized(width: f32, height: f32) -> Component {
        let mut c = Component::new();
        c.set_size(Vec2::new(width, height));
        c
    }

    fn root_context() -> ComputedContext {
        ComputedContext::root(&Camera::orthographic(800.0, 600.0))
    }

    #[test]
    fn test_register_unregister() {
        let mut tree = ComponentTree::new();
        let id = tree.register(Component::new());
        assert!(tree.contains(id));
        tree.unregister(id);
        assert!(!tree.contains(id));
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut tree = ComponentTree::new();
        let id1 = tree.register(Component::new());
        tree.unregister(id1);
        let id2 = tree.register(Component::new());

        assert!(!tree.contains(id1));
        assert!(tree.contains(id2));
        assert_eq!(id1.index, id2.index);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn test_swap_remove_keeps_other_handles_valid() {
        let mut tree = ComponentTree::new();
        let id1 = tree.register(Component::new());
        let id2 = tree.register(Component::new());
        let id3 = tree.register(Component::new());

        tree.unregister(id1);
        assert!(!tree.contains(id1));
        assert!(tree.component(id2).is_some());
        assert!(tree.component(id3).is_some());
    }

    #[test]
    fn test_unregister_removes_subtree() {
        let mut tree = ComponentTree::new();
        let parent = tree.register(Component::new());
        let child = tree.register(Component::new());
        tree.add_child(parent, child);

        tree.unregister(parent);
        assert!(!tree.contains(child));
        assert_eq!(tree.component_count(), 0);
    }

    #[test]
    fn test_attach_activates_under_active_parent() {
        let mut tree = ComponentTree::new();
        let root = tree.register(Component::new());
        tree.activate(root);

        let child = tree.register(Component::new());
        assert!(!tree.is_active(child));
        tree.add_child(root, child);
        assert!(tree.is_active(child));

        tree.remove_child(child);
        assert!(!tree.is_active(child));
    }

    #[test]
    fn test_transform_invalidation_cascades_down() {
        let mut tree = ComponentTree::new();
        let root = tree.register(sized(100.0, 100.0));
        let child = tree.register(sized(50.0, 50.0));
        let grandchild = tree.register(sized(10.0, 10.0));
        tree.add_child(root, child);
        tree.add_child(child, grandchild);
        tree.activate(root);
        tree.update(root, &root_context());
        assert!(tree.component(grandchild).unwrap().is_valid(ValidationFlags::TRANSFORM));

        tree.invalidate(root, ValidationFlags::TRANSFORM);
        assert!(!tree.component(child).unwrap().is_valid(ValidationFlags::TRANSFORM));
        assert!(!tree
            .component(grandchild)
            .unwrap()
            .is_valid(ValidationFlags::TRANSFORM));
    }

    #[test]
    fn test_layout_invalidation_bubbles_up() {
        let mut tree = ComponentTree::new();
        let root = tree.register(sized(100.0, 100.0));
        let child = tree.register(sized(50.0, 50.0));
        tree.add_child(root, child);
        tree.activate(root);
        tree.update(root, &root_context());

        tree.invalidate(child, ValidationFlags::LAYOUT);
        assert!(!tree.component(root).unwrap().is_valid(ValidationFlags::LAYOUT));
        // Transform chains are untouched by a layout bubble.
        assert!(tree.component(root).unwrap().is_valid(ValidationFlags::TRANSFORM));
    }

    #[test]
    fn test_update_composes_contexts_down_the_tree() {
        let mut tree = ComponentTree::new();
        let root = tree.register(sized(800.0, 600.0));
        let child = tree.register(sized(100.0, 100.0));
        let grandchild = tree.register(sized(10.0, 10.0));
        tree.add_child(root, child);
        tree.add_child(child, grandchild);
        tree.activate(root);

        tree.component_mut(child)
            .unwrap()
            .set_position(Vec3::new(100.0, 0.0, 0.0));
        tree.component_mut(grandchild)
            .unwrap()
            .set_position(Vec3::new(0.0, 50.0, 0.0));
        tree.update(root, &root_context());

        let region = tree.component_mut(grandchild).unwrap().draw_region();
        assert!((region.x - 100.0).abs() < 1e-3);
        assert!((region.y - 50.0).abs() < 1e-3);
    }

    #[test]
    fn test_update_leaves_tree_fully_valid() {
        let mut tree = ComponentTree::new();
        let root = tree.register(sized(800.0, 600.0));
        let child = tree.register(sized(100.0, 100.0));
        tree.add_child(root, child);
        tree.activate(root);
        tree.update(root, &root_context());

        assert_eq!(
            tree.component(root).unwrap().invalid_flags(),
            ValidationFlags::empty()
        );
        assert_eq!(
            tree.component(child).unwrap().invalid_flags(),
            ValidationFlags::empty()
        );
    }

    #[test]
    fn test_render_skips_invisible_subtree() {
        let mut tree = ComponentTree::new();
        let mut root = sized(800.0, 600.0);
        root.set_background_color(Color::BLACK);
        let root = tree.register(root);
        let mut child = sized(100.0, 100.0);
        child.set_background_color(Color::BLACK);
        let child = tree.register(child);
        tree.add_child(root, child);
        tree.activate(root);
        tree.update(root, &root_context());

        let mut gl = GlState::new(RecordingApi::default());
        assert_eq!(tree.render(root, &mut gl), 2);

        tree.component_mut(root).unwrap().set_visible(false);
        assert_eq!(tree.render(root, &mut gl), 0);
    }

    #[test]
    fn test_hit_test_prefers_topmost_sibling() {
        let mut tree = ComponentTree::new();
        let root = tree.register(sized(800.0, 600.0));
        let below = tree.register(sized(100.0, 100.0));
        let above = tree.register(sized(100.0, 100.0));
        tree.add_child(root, below);
        tree.add_child(root, above);
        tree.activate(root);
        tree.update(root, &root_context());

        assert_eq!(tree.hit_test(root, Vec2::new(50.0, 50.0)), Some(above));

        tree.component_mut(above)
            .unwrap()
            .set_interactivity(InteractivityMode::None);
        assert_eq!(tree.hit_test(root, Vec2::new(50.0, 50.0)), Some(below));
    }

    #[test]
    fn test_clipping_parent_limits_child_draw_region() {
        let mut tree = ComponentTree::new();
        let mut clipper = sized(100.0, 100.0);
        clipper.set_clips_children(true);
        let parent = tree.register(clipper);
        let child = tree.register(sized(500.0, 500.0));
        tree.add_child(parent, child);
        tree.activate(parent);
        tree.update(parent, &root_context());

        let region = tree.component_mut(child).unwrap().draw_region();
        assert!((region.x).abs() < 1e-2);
        assert!((region.y).abs() < 1e-2);
        assert!((region.width - 100.0).abs() < 1e-2);
        assert!((region.height - 100.0).abs() < 1e-2);
    }
}
