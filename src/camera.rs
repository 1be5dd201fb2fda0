//! Cameras producing the view/projection matrices that the render context
//! cascade inherits (or overrides for an independent subtree).

use crate::geom::Vec2;
use crate::transform::Transform;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Projection {
    Orthographic,
    Perspective { fov_y: f32, near: f32, far: f32 },
}

/// A camera sized to a canvas in device pixels (y-down).
///
/// The default orthographic camera maps canvas coordinates directly to NDC,
/// which is what 2D UI rendering wants. A perspective camera positions the
/// eye so the canvas plane (z=0) exactly fills the view, letting components
/// rotate in depth without changing their at-rest size.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    view: Transform,
    projection: Transform,
    view_projection: Transform,
    view_projection_inverse: Transform,
    viewport: Vec2,
    kind: Projection,
}

impl Camera {
    pub fn orthographic(width: f32, height: f32) -> Self {
        let mut camera = Self {
            view: Transform::IDENTITY,
            projection: Transform::IDENTITY,
            view_projection: Transform::IDENTITY,
            view_projection_inverse: Transform::IDENTITY,
            viewport: Vec2::new(width, height),
            kind: Projection::Orthographic,
        };
        camera.rebuild();
        camera
    }

    pub fn perspective(fov_y: f32, width: f32, height: f32) -> Self {
        let mut camera = Self {
            view: Transform::IDENTITY,
            projection: Transform::IDENTITY,
            view_projection: Transform::IDENTITY,
            view_projection_inverse: Transform::IDENTITY,
            viewport: Vec2::new(width, height),
            kind: Projection::Perspective {
                fov_y,
                near: 1.0,
                far: 10_000.0,
            },
        };
        camera.rebuild();
        camera
    }

    /// Resize the camera to a new canvas. Called from the window-resize
    /// invalidation hook, never polled per frame.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if self.viewport == Vec2::new(width, height) {
            return;
        }
        log::debug!("camera viewport resized to {width}x{height}");
        self.viewport = Vec2::new(width, height);
        self.rebuild();
    }

    fn rebuild(&mut self) {
        let w = self.viewport.x.max(1.0);
        let h = self.viewport.y.max(1.0);
        match self.kind {
            Projection::Orthographic => {
                self.view = Transform::IDENTITY;
                self.projection = Transform::orthographic(0.0, w, h, 0.0, -1000.0, 1000.0);
            }
            Projection::Perspective { fov_y, near, far } => {
                // Eye distance so the z=0 canvas plane fills the frustum.
                let distance = (h * 0.5) / (fov_y * 0.5).tan();
                self.view = Transform::translate(0.0, 0.0, -distance)
                    .then(&Transform::scale(1.0, -1.0, 1.0))
                    .then(&Transform::translate(-w * 0.5, -h * 0.5, 0.0));
                self.projection = Transform::perspective(fov_y, w / h, near, far);
            }
        }
        self.view_projection = self.projection.then(&self.view);
        self.view_projection_inverse = self.view_projection.inverse();
    }

    pub fn view(&self) -> &Transform {
        &self.view
    }

    pub fn projection(&self) -> &Transform {
        &self.projection
    }

    pub fn view_projection(&self) -> &Transform {
        &self.view_projection
    }

    pub fn view_projection_inverse(&self) -> &Transform {
        &self.view_projection_inverse
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }
}
