//! Cascading render state: the effective model transform, clip rectangle, and
//! color tint for a node, composed from inherited parent state plus local
//! values and overrides. Also the coordinate conversions (canvas, local,
//! global, NDC) that layer on top of that state.
//!
//! Parent state is handed down as a [`ComputedContext`] value snapshot taken
//! after the parent finished validating, so contexts hold no back-pointers
//! into the tree.

use crate::camera::Camera;
use crate::color::Color;
use crate::geom::{Box3, Ray, Rect, Vec2, Vec3};
use crate::transform::Transform;

/// The fully resolved render state of one node, as seen by its children.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedContext {
    pub model: Transform,
    pub view: Transform,
    pub projection: Transform,
    pub view_projection: Transform,
    pub view_projection_inverse: Transform,
    pub clip_region: Rect,
    pub color_tint: Color,
    pub canvas_size: Vec2,
}

impl ComputedContext {
    /// The root of the cascade: identity model, the active camera's matrices,
    /// the full canvas as clip region, and a white tint.
    pub fn root(camera: &Camera) -> Self {
        let viewport = camera.viewport();
        Self {
            model: Transform::IDENTITY,
            view: *camera.view(),
            projection: *camera.projection(),
            view_projection: *camera.view_projection(),
            view_projection_inverse: *camera.view_projection_inverse(),
            clip_region: Rect::from_size(viewport.x, viewport.y),
            color_tint: Color::WHITE,
            canvas_size: viewport,
        }
    }
}

/// Per-node overlay over a parent [`ComputedContext`].
///
/// Local fields and override slots are plain public data; the component's
/// validators call the `update_*` methods when the corresponding flag is
/// validated, and everything downstream reads [`RenderContext::computed`].
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    parent: ComputedContext,
    /// Local TRS matrix, composed onto the parent's model transform.
    pub model_transform_local: Transform,
    /// Replaces the composed model transform entirely when set.
    pub model_transform_override: Option<Transform>,
    /// Renders this subtree with an independent camera when set.
    pub camera_override: Option<Camera>,
    /// Local-space clip rectangle, intersected with the inherited region.
    pub clip_region_local: Option<Rect>,
    /// Replaces the computed clip region entirely when set.
    pub clip_region_override: Option<Rect>,
    /// Remaps NDC to a sub-region of the canvas when set (e.g. a viewport
    /// component rendering into a panel rather than the whole window).
    pub canvas_region_override: Option<Rect>,
    pub color_tint_local: Color,
    computed: ComputedContext,
}

impl RenderContext {
    pub fn new(parent: ComputedContext) -> Self {
        let computed = parent.clone();
        Self {
            parent,
            model_transform_local: Transform::IDENTITY,
            model_transform_override: None,
            camera_override: None,
            clip_region_local: None,
            clip_region_override: None,
            canvas_region_override: None,
            color_tint_local: Color::WHITE,
            computed,
        }
    }

    /// Install a fresh parent snapshot. The caller re-validates the affected
    /// flags afterwards; this does not recompute anything by itself.
    pub fn set_parent(&mut self, parent: ComputedContext) {
        self.parent = parent;
    }

    pub fn parent(&self) -> &ComputedContext {
        &self.parent
    }

    pub fn computed(&self) -> &ComputedContext {
        &self.computed
    }

    /// Recompute the model transform: the override verbatim when set,
    /// otherwise parent model times local TRS.
    pub fn update_model_transform(&mut self) {
        self.computed.model = match self.model_transform_override {
            Some(over) => over,
            None => self.parent.model.then(&self.model_transform_local),
        };
    }

    /// Recompute the camera-derived matrices: inherited from the parent
    /// unless a camera override routes this subtree through its own camera.
    pub fn update_view_projection(&mut self) {
        match &self.camera_override {
            Some(camera) => {
                self.computed.view = *camera.view();
                self.computed.projection = *camera.projection();
                self.computed.view_projection = *camera.view_projection();
                self.computed.view_projection_inverse = *camera.view_projection_inverse();
                self.computed.canvas_size = camera.viewport();
            }
            None => {
                self.computed.view = self.parent.view;
                self.computed.projection = self.parent.projection;
                self.computed.view_projection = self.parent.view_projection;
                self.computed.view_projection_inverse = self.parent.view_projection_inverse;
                self.computed.canvas_size = self.parent.canvas_size;
            }
        }
    }

    /// Recompute the tint: parent times local, clamped per channel.
    pub fn update_color_tint(&mut self) {
        self.computed.color_tint = self.color_tint_local.tinted_by(self.parent.color_tint);
    }

    /// Recompute the clip region. The inherited region only ever shrinks: a
    /// local clip rectangle is mapped to canvas space and intersected with
    /// the parent's region. Requires the model and view-projection transforms
    /// to be up to date.
    pub fn update_clip_region(&mut self) {
        if let Some(over) = self.clip_region_override {
            self.computed.clip_region = over;
            return;
        }
        self.computed.clip_region = match self.clip_region_local {
            Some(local) => {
                let canvas = self.local_rect_to_canvas(&local);
                self.parent.clip_region.intersection(&canvas)
            }
            None => self.parent.clip_region,
        };
    }

    /// Recompute everything in dependency order. Convenience for tests and
    /// for non-graph-driven callers.
    pub fn update_all(&mut self) {
        self.update_model_transform();
        self.update_view_projection();
        self.update_color_tint();
        self.update_clip_region();
    }

    fn canvas_region(&self) -> Rect {
        self.canvas_region_override.unwrap_or_else(|| {
            Rect::from_size(self.computed.canvas_size.x, self.computed.canvas_size.y)
        })
    }

    fn ndc_to_canvas(&self, ndc: Vec3) -> Vec2 {
        let region = self.canvas_region();
        Vec2::new(
            region.x + (ndc.x + 1.0) * 0.5 * region.width,
            region.y + (1.0 - ndc.y) * 0.5 * region.height,
        )
    }

    fn canvas_to_ndc(&self, canvas: Vec2, ndc_z: f32) -> Vec3 {
        let region = self.canvas_region();
        Vec3::new(
            (canvas.x - region.x) / region.width * 2.0 - 1.0,
            1.0 - (canvas.y - region.y) / region.height * 2.0,
            ndc_z,
        )
    }

    /// Build the global-space pick ray under a canvas point by unprojecting
    /// it at the near and far NDC depths.
    ///
    /// Returns false (leaving `out` untouched) when either unprojection
    /// degenerates (w=0).
    pub fn global_ray_from_canvas(&self, canvas: Vec2, out: &mut Ray) -> bool {
        let inv = &self.computed.view_projection_inverse;
        let mut near = Vec3::ZERO;
        let mut far = Vec3::ZERO;
        if !inv.project(self.canvas_to_ndc(canvas, -1.0), &mut near)
            || !inv.project(self.canvas_to_ndc(canvas, 1.0), &mut far)
        {
            return false;
        }
        out.origin = near;
        out.direction = far.sub(near);
        true
    }

    /// Convert a canvas point to this node's local coordinates by casting
    /// the pick ray into local space and intersecting the local z=0 plane.
    ///
    /// Returns false (leaving `out` untouched) when the ray is parallel to
    /// the plane, i.e. the node is viewed edge-on. Callers on the
    /// pointer-move hot path reuse `out` across queries.
    pub fn canvas_to_local(&self, canvas: Vec2, out: &mut Vec2) -> bool {
        let mut ray = Ray::new(Vec3::ZERO, Vec3::ZERO);
        if !self.global_ray_from_canvas(canvas, &mut ray) {
            return false;
        }
        let model_inverse = self.computed.model.inverse();
        let local_ray = Ray::new(
            model_inverse.transform_point(ray.origin),
            model_inverse.transform_direction(ray.direction),
        );
        local_ray.intersects_z_plane(out)
    }

    /// Project a local point to canvas coordinates. Returns false (leaving
    /// `out` untouched) when the point projects behind the eye (w=0).
    pub fn local_to_canvas(&self, local: Vec3, out: &mut Vec2) -> bool {
        let global = self.computed.model.transform_point(local);
        let mut ndc = Vec3::ZERO;
        if !self.computed.view_projection.project(global, &mut ndc) {
            return false;
        }
        *out = self.ndc_to_canvas(ndc);
        true
    }

    /// Canvas-space axis-aligned bounds of a local rectangle.
    ///
    /// All four corners are projected individually: under rotation or skew
    /// the extremes need not come from the min/max corner pair.
    pub fn local_rect_to_canvas(&self, rect: &Rect) -> Rect {
        let corners = [
            Vec3::new(rect.x, rect.y, 0.0),
            Vec3::new(rect.right(), rect.y, 0.0),
            Vec3::new(rect.x, rect.bottom(), 0.0),
            Vec3::new(rect.right(), rect.bottom(), 0.0),
        ];
        self.projected_bounds(&corners)
    }

    /// Canvas-space axis-aligned bounds of a local box, for bounds with
    /// non-zero depth. Projects all eight corners.
    pub fn local_box_to_canvas(&self, bounds: &Box3) -> Rect {
        self.projected_bounds(&bounds.corners())
    }

    fn projected_bounds(&self, corners: &[Vec3]) -> Rect {
        let mut points = [Vec2::ZERO; 8];
        let mut count = 0;
        let mut canvas = Vec2::ZERO;
        for &corner in corners {
            if self.local_to_canvas(corner, &mut canvas) {
                points[count] = canvas;
                count += 1;
            }
        }
        Rect::bounding(&points[..count])
    }
}
