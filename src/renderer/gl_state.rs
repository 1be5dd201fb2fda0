//! Change-tracking wrapper over the raw graphics driver.
//!
//! [`GlState`] caches every piece of mutable GPU state it manages and elides
//! setter calls that would not change anything. Every real change flushes the
//! shared batch first, so buffered vertices always render with the state that
//! was current when they were pushed.

use thiserror::Error;

use crate::color::Color;
use crate::geom::Rect;
use crate::transform::Transform;

use super::batch::{BatchMode, BatchState, ShaderBatch};
use super::vertex::Vertex;
use super::{BlendMode, DrawMode, FramebufferId, ProgramId, TextureId};

/// Result of a framebuffer completeness check, mirroring the driver's
/// status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FramebufferStatus {
    Complete,
    IncompleteAttachment,
    IncompleteDimensions,
    MissingAttachment,
    Unsupported,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GraphicsError {
    #[error("framebuffer incomplete: {0:?}")]
    FramebufferIncomplete(FramebufferStatus),
}

/// The raw driver boundary. One implementation per platform backend; tests
/// use a call-recording double.
pub trait GraphicsApi {
    fn use_program(&mut self, program: ProgramId);
    fn bind_texture(&mut self, unit: u32, texture: TextureId);
    fn set_blend_mode(&mut self, blend_mode: BlendMode, premultiplied_alpha: bool);
    fn set_scissor(&mut self, region: Option<Rect>);
    fn set_viewport(&mut self, region: Rect);
    fn bind_framebuffer(&mut self, framebuffer: Option<FramebufferId>);
    fn set_camera_uniforms(&mut self, view: [[f32; 4]; 4], projection: [[f32; 4]; 4]);
    fn upload_vertices(&mut self, bytes: &[u8]);
    fn upload_indices(&mut self, bytes: &[u8]);
    fn draw_elements(&mut self, draw_mode: DrawMode, offset: usize, count: usize);
    fn register_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureId;
    fn create_framebuffer(&mut self, width: u32, height: u32) -> FramebufferId;
    fn framebuffer_status(&mut self, framebuffer: FramebufferId) -> FramebufferStatus;
    fn clear(&mut self, color: Color);
}

/// Texture units tracked by the cache.
const TEXTURE_UNITS: usize = 8;

pub struct GlState<A: GraphicsApi> {
    api: A,
    batch: ShaderBatch,
    program: Option<ProgramId>,
    textures: [Option<TextureId>; TEXTURE_UNITS],
    blend: Option<(BlendMode, bool)>,
    scissor: Option<Option<Rect>>,
    viewport: Option<Rect>,
    framebuffer: Option<Option<FramebufferId>>,
    camera: Option<(Transform, Transform)>,
    change_count: u64,
    white_pixel: TextureId,
}

impl<A: GraphicsApi> GlState<A> {
    pub fn new(mut api: A) -> Self {
        // The fallback texture for untextured geometry: a single white texel,
        // so color comes entirely from the vertex tint.
        let white_pixel = api.register_texture(1, 1, &[0xFF, 0xFF, 0xFF, 0xFF]);
        Self {
            api,
            batch: ShaderBatch::new(BatchMode::Dynamic),
            program: None,
            textures: [None; TEXTURE_UNITS],
            blend: None,
            scissor: None,
            viewport: None,
            framebuffer: None,
            camera: None,
            change_count: 0,
            white_pixel,
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    /// Total real state changes issued since creation. Redundant setter
    /// calls do not count; a per-frame delta of this is the number the
    /// batching exists to keep small.
    pub fn change_count(&self) -> u64 {
        self.change_count
    }

    /// The 1x1 white fallback texture, bound for untextured quads.
    pub fn white_pixel(&self) -> TextureId {
        self.white_pixel
    }

    pub fn set_program(&mut self, program: ProgramId) {
        if self.program == Some(program) {
            return;
        }
        self.flush_batch();
        self.api.use_program(program);
        self.program = Some(program);
        self.change_count += 1;
    }

    pub fn set_texture(&mut self, unit: u32, texture: TextureId) {
        let slot = unit as usize;
        debug_assert!(slot < TEXTURE_UNITS);
        if self.textures[slot] == Some(texture) {
            return;
        }
        self.flush_batch();
        // The flush may itself have bound unit 0 through the batch.
        if self.textures[slot] == Some(texture) {
            return;
        }
        self.api.bind_texture(unit, texture);
        self.textures[slot] = Some(texture);
        self.change_count += 1;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode, premultiplied_alpha: bool) {
        if self.blend == Some((blend_mode, premultiplied_alpha)) {
            return;
        }
        self.flush_batch();
        if self.blend == Some((blend_mode, premultiplied_alpha)) {
            return;
        }
        self.api.set_blend_mode(blend_mode, premultiplied_alpha);
        self.blend = Some((blend_mode, premultiplied_alpha));
        self.change_count += 1;
    }

    /// Set or disable the scissor region. `None` disables scissoring.
    pub fn set_scissor(&mut self, region: Option<Rect>) {
        if self.scissor == Some(region) {
            return;
        }
        self.flush_batch();
        self.api.set_scissor(region);
        self.scissor = Some(region);
        self.change_count += 1;
    }

    pub fn set_viewport(&mut self, region: Rect) {
        if self.viewport == Some(region) {
            return;
        }
        self.flush_batch();
        self.api.set_viewport(region);
        self.viewport = Some(region);
        self.change_count += 1;
    }

    /// Bind a framebuffer, or `None` for the default (window) target.
    pub fn set_framebuffer(&mut self, framebuffer: Option<FramebufferId>) {
        if self.framebuffer == Some(framebuffer) {
            return;
        }
        self.flush_batch();
        self.api.bind_framebuffer(framebuffer);
        self.framebuffer = Some(framebuffer);
        self.change_count += 1;
    }

    pub fn set_camera(&mut self, view: &Transform, projection: &Transform) {
        if self
            .camera
            .as_ref()
            .is_some_and(|(v, p)| v == view && p == projection)
        {
            return;
        }
        self.flush_batch();
        self.api.set_camera_uniforms(view.rows(), projection.rows());
        self.camera = Some((*view, *projection));
        self.change_count += 1;
    }

    /// Create a framebuffer and verify it is renderable.
    pub fn create_framebuffer(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<FramebufferId, GraphicsError> {
        let framebuffer = self.api.create_framebuffer(width, height);
        match self.api.framebuffer_status(framebuffer) {
            FramebufferStatus::Complete => Ok(framebuffer),
            status => {
                log::warn!("framebuffer {width}x{height} incomplete: {status:?}");
                Err(GraphicsError::FramebufferIncomplete(status))
            }
        }
    }

    pub fn register_texture(&mut self, width: u32, height: u32, rgba: &[u8]) -> TextureId {
        debug_assert_eq!(rgba.len(), (width * height * 4) as usize);
        self.api.register_texture(width, height, rgba)
    }

    pub fn clear(&mut self, color: Color) {
        self.flush_batch();
        self.api.clear(color);
    }

    /// Flush the shared batch and absorb whatever state its draw calls left
    /// bound on the driver, so the cache keeps mirroring actual GPU state.
    fn flush_batch(&mut self) {
        if let Some(state) = self.batch.flush(&mut self.api) {
            self.absorb_batch_state(state);
        }
    }

    fn absorb_batch_state(&mut self, state: BatchState) {
        self.textures[0] = Some(state.texture);
        self.blend = Some((state.blend_mode, state.premultiplied_alpha));
    }

    // Batch facade. Components render exclusively through these so the
    // state cache always sees the batch it must flush.

    pub fn batch_begin(&mut self, state: BatchState) {
        if let Some(rendered_with) = self.batch.begin(state, &mut self.api) {
            self.absorb_batch_state(rendered_with);
        }
    }

    pub fn put_vertex(&mut self, vertex: Vertex) {
        self.batch.put_vertex(vertex);
    }

    pub fn put_index(&mut self, index: u16) {
        self.batch.put_index(index);
    }

    pub fn put_quad(&mut self, corners: [Vertex; 4]) {
        self.batch.put_quad(corners);
    }

    pub fn next_index(&self) -> u16 {
        self.batch.next_index()
    }

    pub fn flush(&mut self) {
        self.flush_batch();
    }
}
