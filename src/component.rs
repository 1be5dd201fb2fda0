//! A concrete component: local properties, the standard validation wiring,
//! and a quad draw through the batching renderer.
//!
//! Components are composed, not subclassed: custom behavior registers extra
//! validation nodes (flags from bit 16 up) next to the standard set.

use crate::camera::Camera;
use crate::color::Color;
use crate::geom::{Rect, Vec2, Vec3};
use crate::render_context::{ComputedContext, RenderContext};
use crate::renderer::{BatchState, BlendMode, DrawMode, GlState, GraphicsApi, TextureId, Vertex};
use crate::transform::Transform;
use crate::validation::{GraphError, ValidationFlags, ValidationGraph};

/// How a component participates in hit testing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractivityMode {
    /// This component and its children receive interaction.
    #[default]
    All,
    /// Neither this component nor its children receive interaction.
    None,
    /// Children receive interaction; this component itself does not.
    ChildrenOnly,
}

/// The mutable state validators operate on.
///
/// Split out of [`Component`] so the validation graph and the state it
/// mutates can be borrowed disjointly.
pub struct ComponentState {
    position: Vec3,
    rotation: Vec3,
    scale: Vec3,
    origin: Vec3,
    size: Vec2,
    color_tint: Color,
    background_color: Color,
    texture: Option<TextureId>,
    blend_mode: BlendMode,
    clips_children: bool,
    visible: bool,
    interactivity: InteractivityMode,
    render: RenderContext,
    // Validator outputs.
    bounds: Rect,
    vertices: [Vertex; 4],
    draw_region: Rect,
}

impl ComponentState {
    fn new(parent: ComputedContext) -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            origin: Vec3::ZERO,
            size: Vec2::ZERO,
            color_tint: Color::WHITE,
            background_color: Color::TRANSPARENT,
            texture: None,
            blend_mode: BlendMode::Normal,
            clips_children: false,
            visible: true,
            interactivity: InteractivityMode::All,
            render: RenderContext::new(parent),
            bounds: Rect::EMPTY,
            vertices: [Vertex::new([0.0; 3], [0.0; 4], [0.0; 2]); 4],
            draw_region: Rect::EMPTY,
        }
    }
}

/// Flags recomputed whenever the inherited parent context changes.
pub const INHERITED_FLAGS: ValidationFlags = ValidationFlags::TRANSFORM
    .union(ValidationFlags::COLOR_TINT)
    .union(ValidationFlags::VIEW_PROJECTION)
    .union(ValidationFlags::STYLES);

pub struct Component {
    graph: ValidationGraph<ComponentState>,
    state: ComponentState,
}

impl Default for Component {
    fn default() -> Self {
        Self::new()
    }
}

impl Component {
    /// A component wired with the standard validation nodes. The parent
    /// context starts as a placeholder root and is replaced on first attach.
    pub fn new() -> Self {
        let mut graph = ValidationGraph::new();
        register_standard_nodes(&mut graph)
            .expect("standard validation wiring is fixed and acyclic");
        Self {
            graph,
            state: ComponentState::new(ComputedContext::root(&Camera::orthographic(1.0, 1.0))),
        }
    }

    /// Register a custom validation node (flags from
    /// [`ValidationFlags::custom`]) alongside the standard set.
    pub fn add_validation_node(
        &mut self,
        flag: ValidationFlags,
        dependencies: ValidationFlags,
        dependents: ValidationFlags,
        validator: Box<dyn FnMut(&mut ValidationGraph<ComponentState>, &mut ComponentState)>,
    ) -> Result<(), GraphError> {
        self.graph.add_node(flag, dependencies, dependents, true, validator)
    }

    pub fn invalidate(&mut self, flags: ValidationFlags) -> ValidationFlags {
        self.graph.invalidate(flags)
    }

    pub fn validate(&mut self, flags: ValidationFlags) -> ValidationFlags {
        self.graph.validate(flags, &mut self.state)
    }

    pub fn invalid_flags(&self) -> ValidationFlags {
        self.graph.invalid_flags()
    }

    pub fn is_valid(&self, flag: ValidationFlags) -> bool {
        self.graph.is_valid(flag)
    }

    // Property setters. Each invalidates exactly the flag whose validator
    // consumes the property; downstream flags follow through the graph.

    pub fn set_position(&mut self, position: Vec3) {
        if self.state.position != position {
            self.state.position = position;
            self.graph.invalidate(ValidationFlags::TRANSFORM);
        }
    }

    pub fn set_rotation(&mut self, rotation: Vec3) {
        if self.state.rotation != rotation {
            self.state.rotation = rotation;
            self.graph.invalidate(ValidationFlags::TRANSFORM);
        }
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        if self.state.scale != scale {
            self.state.scale = scale;
            self.graph.invalidate(ValidationFlags::TRANSFORM);
        }
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        if self.state.origin != origin {
            self.state.origin = origin;
            self.graph.invalidate(ValidationFlags::TRANSFORM);
        }
    }

    pub fn set_size(&mut self, size: Vec2) {
        if self.state.size != size {
            self.state.size = size;
            self.graph.invalidate(ValidationFlags::LAYOUT);
        }
    }

    pub fn set_color_tint(&mut self, tint: Color) {
        if self.state.color_tint != tint {
            self.state.color_tint = tint;
            self.graph.invalidate(ValidationFlags::COLOR_TINT);
        }
    }

    pub fn set_background_color(&mut self, color: Color) {
        if self.state.background_color != color {
            self.state.background_color = color;
            self.graph.invalidate(ValidationFlags::COLOR_TINT);
        }
    }

    pub fn set_texture(&mut self, texture: Option<TextureId>) {
        self.state.texture = texture;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.state.blend_mode = blend_mode;
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.state.visible = visible;
    }

    pub fn set_clips_children(&mut self, clips: bool) {
        if self.state.clips_children != clips {
            self.state.clips_children = clips;
            self.graph.invalidate(ValidationFlags::DRAW_REGION);
        }
    }

    pub fn set_interactivity(&mut self, mode: InteractivityMode) {
        if self.state.interactivity != mode {
            self.state.interactivity = mode;
            self.graph.invalidate(ValidationFlags::INTERACTIVITY_MODE);
        }
    }

    /// Route this subtree through its own camera, or `None` to inherit.
    pub fn set_camera_override(&mut self, camera: Option<Camera>) {
        self.state.render.camera_override = camera;
        self.graph.invalidate(ValidationFlags::VIEW_PROJECTION);
    }

    /// Replace the composed model transform wholesale, or `None` to restore
    /// parent-times-local composition.
    pub fn set_model_transform_override(&mut self, transform: Option<Transform>) {
        self.state.render.model_transform_override = transform;
        self.graph.invalidate(ValidationFlags::TRANSFORM);
    }

    /// Install a fresh parent context snapshot and dirty every inherited
    /// flag. Called by the tree's update walk after the parent validated.
    pub fn set_parent_context(&mut self, parent: ComputedContext) {
        self.state.render.set_parent(parent);
        self.graph.invalidate(INHERITED_FLAGS);
    }

    pub fn position(&self) -> Vec3 {
        self.state.position
    }

    pub fn size(&self) -> Vec2 {
        self.state.size
    }

    pub fn visible(&self) -> bool {
        self.state.visible
    }

    pub fn interactivity(&self) -> InteractivityMode {
        self.state.interactivity
    }

    /// Validated local bounds.
    pub fn bounds(&mut self) -> Rect {
        self.validate(ValidationFlags::LAYOUT);
        self.state.bounds
    }

    /// Validated canvas-space draw region (bounds projected to canvas,
    /// intersected with the clip region).
    pub fn draw_region(&mut self) -> Rect {
        self.validate(ValidationFlags::DRAW_REGION);
        self.state.draw_region
    }

    /// Validated computed context, as children inherit it.
    pub fn computed_context(&mut self) -> &ComputedContext {
        self.validate(INHERITED_FLAGS | ValidationFlags::DRAW_REGION);
        self.state.render.computed()
    }

    /// Bring every flag up to date against the given parent context.
    pub fn update(&mut self, parent: &ComputedContext) {
        if self.state.render.parent() != parent {
            self.set_parent_context(parent.clone());
        }
        self.validate(ValidationFlags::ALL);
    }

    /// Hit test a canvas point against the validated local bounds.
    pub fn contains_canvas_point(&mut self, canvas: Vec2) -> bool {
        if !self.state.visible
            || matches!(
                self.state.interactivity,
                InteractivityMode::None | InteractivityMode::ChildrenOnly
            )
        {
            return false;
        }
        self.validate(ValidationFlags::LAYOUT | INHERITED_FLAGS);
        let mut local = Vec2::ZERO;
        self.state.render.canvas_to_local(canvas, &mut local)
            && self.state.bounds.contains(local.x, local.y)
    }

    /// Draw the component's background quad. Returns false when the draw was
    /// skipped (invisible, fully transparent, or culled by the draw region).
    pub fn draw<A: GraphicsApi>(&mut self, gl: &mut GlState<A>) -> bool {
        self.validate(ValidationFlags::ALL);
        let state = &self.state;
        if !state.visible || state.background_color.a <= 0.0 {
            return false;
        }
        if state.draw_region.is_empty() {
            return false;
        }

        let computed = state.render.computed();
        gl.set_camera(&computed.view, &computed.projection);
        let full_canvas = Rect::from_size(computed.canvas_size.x, computed.canvas_size.y);
        if computed.clip_region == full_canvas {
            gl.set_scissor(None);
        } else {
            gl.set_scissor(Some(computed.clip_region));
        }

        let texture = state.texture.unwrap_or_else(|| gl.white_pixel());
        gl.batch_begin(BatchState {
            texture,
            blend_mode: state.blend_mode,
            premultiplied_alpha: false,
            draw_mode: DrawMode::Triangles,
        });
        gl.put_quad(state.vertices);
        true
    }
}

fn register_standard_nodes(
    graph: &mut ValidationGraph<ComponentState>,
) -> Result<(), GraphError> {
    use ValidationFlags as F;

    // Anchor node for style-driven custom flags; resolving styles has no
    // intrinsic work here.
    graph.add_node(F::STYLES, F::empty(), F::empty(), false, Box::new(|_, _| {}))?;

    graph.add_node(
        F::LAYOUT,
        F::STYLES,
        F::empty(),
        true,
        Box::new(|_, s| {
            s.bounds = Rect::from_size(s.size.x, s.size.y);
        }),
    )?;

    graph.add_node(
        F::TRANSFORM,
        F::empty(),
        F::empty(),
        true,
        Box::new(|_, s| {
            s.render.model_transform_local =
                Transform::trs(s.position, s.rotation, s.scale, s.origin);
            s.render.update_model_transform();
        }),
    )?;

    graph.add_node(
        F::COLOR_TINT,
        F::STYLES,
        F::empty(),
        true,
        Box::new(|_, s| {
            s.render.color_tint_local = s.color_tint;
            s.render.update_color_tint();
        }),
    )?;

    graph.add_node(
        F::INTERACTIVITY_MODE,
        F::empty(),
        F::empty(),
        true,
        Box::new(|_, _| {}),
    )?;

    graph.add_node(
        F::VIEW_PROJECTION,
        F::empty(),
        F::empty(),
        true,
        Box::new(|_, s| {
            s.render.update_view_projection();
        }),
    )?;

    graph.add_node(
        F::VERTICES_GLOBAL,
        F::TRANSFORM | F::LAYOUT | F::COLOR_TINT,
        F::empty(),
        true,
        Box::new(|_, s| {
            let model = &s.render.computed().model;
            let tint = s
                .background_color
                .tinted_by(s.render.computed().color_tint)
                .to_array();
            let b = s.bounds;
            let corner = |x: f32, y: f32, u: f32, v: f32| {
                let p = model.transform_point(Vec3::new(x, y, 0.0));
                Vertex::new([p.x, p.y, p.z], tint, [u, v])
            };
            s.vertices = [
                corner(b.x, b.y, 0.0, 0.0),
                corner(b.right(), b.y, 1.0, 0.0),
                corner(b.x, b.bottom(), 0.0, 1.0),
                corner(b.right(), b.bottom(), 1.0, 1.0),
            ];
        }),
    )?;

    graph.add_node(
        F::DRAW_REGION,
        F::TRANSFORM | F::VIEW_PROJECTION | F::LAYOUT,
        F::empty(),
        true,
        Box::new(|_, s| {
            s.render.clip_region_local = s.clips_children.then_some(s.bounds);
            s.render.update_clip_region();
            let canvas_bounds = s.render.local_rect_to_canvas(&s.bounds);
            s.draw_region = canvas_bounds.intersection(&s.render.computed().clip_region);
        }),
    )?;

    Ok(())
}
