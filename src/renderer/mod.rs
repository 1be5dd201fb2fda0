//! Batched rendering over an abstract graphics driver.

pub mod batch;
pub mod gl_state;
pub mod vertex;

pub use batch::{BatchMode, BatchState, DrawElementsCall, ShaderBatch};
pub use gl_state::{FramebufferStatus, GlState, GraphicsApi, GraphicsError};
pub use vertex::Vertex;

/// Opaque driver handle to a registered texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// Opaque driver handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub u32);

/// Opaque driver handle to an offscreen framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(pub u32);

/// Primitive topology of a draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawMode {
    Points,
    Lines,
    Triangles,
}

impl DrawMode {
    /// Indices per primitive, used by the batch's divisibility assertions.
    pub fn primitive_size(&self) -> usize {
        match self {
            DrawMode::Points => 1,
            DrawMode::Lines => 2,
            DrawMode::Triangles => 3,
        }
    }
}

/// Fragment blending configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendMode {
    /// Blending disabled; fragments overwrite.
    None,
    /// Standard source-over alpha blending.
    Normal,
    Additive,
    Multiply,
}
