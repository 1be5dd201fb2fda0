//! Trellis: a retained-mode UI component core.
//!
//! The crate is built around three ideas:
//!
//! - A [`validation::ValidationGraph`] per component tracks which categories
//!   of derived state (layout, transform, tint, ...) are stale, cascades
//!   invalidation along declared dependencies, and revalidates everything in
//!   one forward pass.
//! - A [`render_context::RenderContext`] per component composes local
//!   transform/clip/tint state with an inherited parent snapshot, and hosts
//!   the canvas/local/global coordinate conversions used for picking.
//! - A [`renderer::ShaderBatch`] merges consecutive draws that share GPU
//!   state into single draw calls behind a change-tracking
//!   [`renderer::GlState`] cache.
//!
//! [`stage::Stage`] ties them together into per-frame update and render
//! passes over an arena [`tree::ComponentTree`].

pub mod camera;
pub mod color;
pub mod component;
pub mod geom;
pub mod render_context;
pub mod renderer;
pub mod stage;
pub mod transform;
pub mod tree;
pub mod validation;

pub mod prelude {
    pub use crate::camera::Camera;
    pub use crate::color::Color;
    pub use crate::component::{Component, InteractivityMode};
    pub use crate::geom::{Box3, Ray, Rect, Vec2, Vec3};
    pub use crate::render_context::{ComputedContext, RenderContext};
    pub use crate::renderer::{
        BatchMode, BatchState, BlendMode, DrawMode, GlState, GraphicsApi, ShaderBatch, TextureId,
        Vertex,
    };
    pub use crate::stage::Stage;
    pub use crate::transform::Transform;
    pub use crate::tree::{ComponentId, ComponentTree};
    pub use crate::validation::{GraphError, ValidationFlags, ValidationGraph};
}
