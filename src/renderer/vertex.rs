//! The vertex format shared by every batched draw call.

/// A single batched vertex: global-space position, premultipliable color
/// tint, and texture coordinates.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color_tint: [f32; 4],
    pub uv: [f32; 2],
}

/// One attribute of the vertex layout, described for the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    pub components: u32,
    /// Byte offset from the start of the vertex.
    pub offset: u32,
    pub shader_location: u32,
}

impl Vertex {
    pub const STRIDE: usize = std::mem::size_of::<Vertex>();

    pub const ATTRIBUTES: [VertexAttribute; 3] = [
        // position
        VertexAttribute {
            components: 3,
            offset: 0,
            shader_location: 0,
        },
        // color_tint
        VertexAttribute {
            components: 4,
            offset: 12,
            shader_location: 1,
        },
        // uv
        VertexAttribute {
            components: 2,
            offset: 28,
            shader_location: 2,
        },
    ];

    pub fn new(position: [f32; 3], color_tint: [f32; 4], uv: [f32; 2]) -> Self {
        Self {
            position,
            color_tint,
            uv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_is_tightly_packed() {
        assert_eq!(Vertex::STRIDE, 36);
        let mut expected_offset = 0;
        for attr in Vertex::ATTRIBUTES {
            assert_eq!(attr.offset, expected_offset);
            expected_offset += attr.components * 4;
        }
        assert_eq!(expected_offset as usize, Vertex::STRIDE);
    }

    #[test]
    fn test_cast_slice_matches_layout() {
        let v = Vertex::new([1.0, 2.0, 3.0], [0.1, 0.2, 0.3, 0.4], [0.5, 0.6]);
        let bytes: &[u8] = bytemuck::cast_slice(std::slice::from_ref(&v));
        assert_eq!(bytes.len(), Vertex::STRIDE);
        let floats: &[f32] = bytemuck::cast_slice(bytes);
        assert_eq!(floats[0], 1.0);
        assert_eq!(floats[3], 0.1);
        assert_eq!(floats[7], 0.5);
    }
}
