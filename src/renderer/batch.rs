//! Draw-call batching.
//!
//! A [`ShaderBatch`] accumulates vertices and 16-bit indices across
//! consecutive draws that share GPU state, splitting into a new
//! [`DrawElementsCall`] only when the state actually changes or the buffer
//! nears the index-addressing limit.

use super::gl_state::GraphicsApi;
use super::vertex::Vertex;
use super::{BlendMode, DrawMode, TextureId};

/// Vertices addressable by a u16 index buffer.
pub const MAX_VERTICES: usize = 65_536;

/// Proactive flush point: splitting at 75% capacity avoids ever hitting the
/// u16 limit mid-primitive.
pub const FLUSH_VERTEX_THRESHOLD: usize = MAX_VERTICES / 4 * 3;

/// The GPU state one draw call renders with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchState {
    pub texture: TextureId,
    pub blend_mode: BlendMode,
    pub premultiplied_alpha: bool,
    pub draw_mode: DrawMode,
}

/// One contiguous range of the shared index buffer plus the state to bind
/// before drawing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawElementsCall {
    pub state: BatchState,
    /// Offset into the index buffer, in indices.
    pub offset: usize,
    pub count: usize,
}

/// Whether a flush renders immediately or only records call boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchMode {
    /// `flush` uploads, issues the recorded calls in order, and clears the
    /// buffers for reuse. The per-frame UI batch runs in this mode.
    Dynamic,
    /// `flush` only finalizes the call boundary; the owner uploads once and
    /// replays [`ShaderBatch::calls`] itself (cached geometry).
    Static,
}

pub struct ShaderBatch {
    mode: BatchMode,
    vertices: Vec<Vertex>,
    indices: Vec<u16>,
    calls: Vec<DrawElementsCall>,
    state: Option<BatchState>,
    /// Index-buffer position where the pending call began.
    call_start: usize,
}

impl ShaderBatch {
    pub fn new(mode: BatchMode) -> Self {
        Self {
            mode,
            vertices: Vec::new(),
            indices: Vec::new(),
            calls: Vec::new(),
            state: None,
            call_start: 0,
        }
    }

    pub fn mode(&self) -> BatchMode {
        self.mode
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn index_count(&self) -> usize {
        self.indices.len()
    }

    pub fn calls(&self) -> &[DrawElementsCall] {
        &self.calls
    }

    /// Declare the state the next vertices render with.
    ///
    /// A no-op when `state` matches the current one and the buffer is below
    /// [`FLUSH_VERTEX_THRESHOLD`]; otherwise the pending range is flushed and
    /// a new call opens with `state`. Returns what the flush returned (see
    /// [`ShaderBatch::flush`]).
    pub fn begin(&mut self, state: BatchState, api: &mut dyn GraphicsApi) -> Option<BatchState> {
        if self.state == Some(state) && self.vertices.len() < FLUSH_VERTEX_THRESHOLD {
            return None;
        }
        if self.state.is_some() && self.vertices.len() >= FLUSH_VERTEX_THRESHOLD {
            log::debug!(
                "batch split at {} vertices (capacity threshold)",
                self.vertices.len()
            );
        }
        let rendered_with = self.flush(api);
        self.state = Some(state);
        rendered_with
    }

    /// The index the next pushed vertex will get.
    pub fn next_index(&self) -> u16 {
        debug_assert!(self.vertices.len() < MAX_VERTICES);
        self.vertices.len() as u16
    }

    pub fn put_vertex(&mut self, vertex: Vertex) {
        debug_assert!(self.state.is_some(), "put_vertex before begin");
        debug_assert!(self.vertices.len() < MAX_VERTICES);
        self.vertices.push(vertex);
    }

    pub fn put_index(&mut self, index: u16) {
        debug_assert!(self.state.is_some(), "put_index before begin");
        debug_assert!(
            (index as usize) < self.vertices.len(),
            "index {index} references an unwritten vertex"
        );
        self.indices.push(index);
    }

    /// Push a quad as four vertices and six indices (two triangles).
    /// Corners are ordered top-left, top-right, bottom-left, bottom-right.
    pub fn put_quad(&mut self, corners: [Vertex; 4]) {
        let base = self.next_index();
        for v in corners {
            self.put_vertex(v);
        }
        for i in [0u16, 2, 1, 1, 2, 3] {
            self.put_index(base + i);
        }
    }

    /// Finalize the pending index range into a [`DrawElementsCall`].
    ///
    /// In [`BatchMode::Dynamic`] this also uploads both buffers, issues every
    /// recorded call in order, and clears everything for reuse. Returns the
    /// state of the last call issued to the driver (or `None` when nothing
    /// rendered) so an owner tracking driver state can stay in sync with the
    /// binds made here.
    pub fn flush(&mut self, api: &mut dyn GraphicsApi) -> Option<BatchState> {
        let count = self.indices.len() - self.call_start;
        if count > 0 && !self.vertices.is_empty() {
            if let Some(state) = self.state {
                debug_assert_eq!(
                    count % state.draw_mode.primitive_size(),
                    0,
                    "index count {} is not a whole number of {:?} primitives",
                    count,
                    state.draw_mode
                );
                self.calls.push(DrawElementsCall {
                    state,
                    offset: self.call_start,
                    count,
                });
                self.call_start = self.indices.len();
            }
        }
        if self.mode == BatchMode::Dynamic {
            let rendered_with = self.upload_and_render(api);
            self.clear();
            rendered_with
        } else {
            None
        }
    }

    /// Upload the buffers and issue the recorded calls. Called from `flush`
    /// in dynamic mode; static owners call it explicitly. Returns the state
    /// of the last call issued.
    pub fn upload_and_render(&self, api: &mut dyn GraphicsApi) -> Option<BatchState> {
        if self.calls.is_empty() {
            return None;
        }
        api.upload_vertices(bytemuck::cast_slice(&self.vertices));
        api.upload_indices(bytemuck::cast_slice(&self.indices));
        for call in &self.calls {
            api.bind_texture(0, call.state.texture);
            api.set_blend_mode(call.state.blend_mode, call.state.premultiplied_alpha);
            api.draw_elements(call.state.draw_mode, call.offset, call.count);
        }
        self.calls.last().map(|c| c.state)
    }

    /// Drop all buffered data and recorded calls, keeping allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.indices.clear();
        self.calls.clear();
        self.call_start = 0;
    }
}
