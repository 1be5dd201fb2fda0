//! The root frame driver: owns the component tree, the active camera, and
//! the GPU state cache, and turns them into per-frame update and render
//! passes.

use crate::camera::Camera;
use crate::color::Color;
use crate::component::{Component, InteractivityMode};
use crate::geom::{Rect, Vec2};
use crate::render_context::ComputedContext;
use crate::renderer::{GlState, GraphicsApi};
use crate::tree::{ComponentId, ComponentTree};
use crate::validation::ValidationFlags;

pub struct Stage<A: GraphicsApi> {
    tree: ComponentTree,
    camera: Camera,
    gl: GlState<A>,
    root: ComponentId,
    clear_color: Color,
}

impl<A: GraphicsApi> Stage<A> {
    pub fn new(api: A, width: f32, height: f32) -> Self {
        let mut tree = ComponentTree::new();
        let mut root_component = Component::new();
        root_component.set_size(Vec2::new(width, height));
        // The root is a pass-through container: hits land on children only.
        root_component.set_interactivity(InteractivityMode::ChildrenOnly);
        let root = tree.register(root_component);
        tree.activate(root);

        let mut gl = GlState::new(api);
        gl.set_viewport(Rect::from_size(width, height));

        Self {
            tree,
            camera: Camera::orthographic(width, height),
            gl,
            root,
            clear_color: Color::BLACK,
        }
    }

    pub fn root(&self) -> ComponentId {
        self.root
    }

    pub fn tree(&self) -> &ComponentTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut ComponentTree {
        &mut self.tree
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn gl(&mut self) -> &mut GlState<A> {
        &mut self.gl
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// Replace the stage camera. The whole tree re-derives its
    /// view-projection state on the next update.
    pub fn set_camera(&mut self, camera: Camera) {
        self.camera = camera;
        self.tree
            .invalidate(self.root, ValidationFlags::VIEW_PROJECTION);
    }

    /// Attach a component under the stage root.
    pub fn add_child(&mut self, id: ComponentId) {
        self.tree.add_child(self.root, id);
    }

    /// Window resize hook. Resizes the camera, the GL viewport, and the root
    /// component, and dirties everything derived from the canvas size. This
    /// is the only place canvas dimensions enter the system; nothing polls
    /// the window per frame.
    pub fn set_window_size(&mut self, width: f32, height: f32) {
        if self.camera.viewport() == Vec2::new(width, height) {
            return;
        }
        log::debug!("stage resized to {width}x{height}");
        self.camera.set_viewport(width, height);
        self.gl.set_viewport(Rect::from_size(width, height));
        if let Some(root) = self.tree.component_mut(self.root) {
            root.set_size(Vec2::new(width, height));
        }
        self.tree.invalidate(
            self.root,
            ValidationFlags::VIEW_PROJECTION | ValidationFlags::LAYOUT,
        );
    }

    /// Validate the whole tree against the current camera.
    pub fn update(&mut self) {
        let context = ComputedContext::root(&self.camera);
        self.tree.update(self.root, &context);
    }

    /// Clear, draw the tree in painter's order, and flush the batch.
    /// Returns the number of components drawn.
    pub fn render(&mut self) -> usize {
        self.gl.clear(self.clear_color);
        let drawn = self.tree.render(self.root, &mut self.gl);
        self.gl.flush();
        drawn
    }

    /// Front-most interactive component under a canvas point.
    pub fn hit_test(&mut self, canvas: Vec2) -> Option<ComponentId> {
        self.tree.hit_test(self.root, canvas)
    }
}
