//! Vertex data structures for chunk surfaces.
//!
//! This module defines the vertex format handed to the external renderer and
//! physics collaborators.

use cgmath::{Point3, Vector3};

/// Per-face metadata carried by every vertex of the face.
///
/// A custom shader uses it to pick the atlas sub-texture, tile it across a
/// merged quad and draw cracks for damaged blocks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FaceMetadata {
    /// Index of the face's sub-texture in the atlas.
    pub texture_index: u32,
    /// Number of texture repeats along the quad's first edge.
    pub uv_scale_x: u32,
    /// Number of texture repeats along the quad's second edge.
    pub uv_scale_y: u32,
    /// Accumulated damage of the block, 0..=31.
    pub damage: u32,
}

impl FaceMetadata {
    pub fn to_array(self) -> [u32; 4] {
        [self.texture_index, self.uv_scale_x, self.uv_scale_y, self.damage]
    }
}

/// A vertex of a chunk surface.
///
/// # Memory Layout
/// - Position: [f32; 3] (12 bytes)
/// - Normal: [f32; 3] (12 bytes)
/// - Texture Coordinates: [f32; 2] (8 bytes)
/// - Metadata: [u32; 4] (16 bytes)
///
/// Total size: 48 bytes
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    /// Position in chunk-local space
    pub position: [f32; 3],
    /// Flat face normal
    pub normal: [f32; 3],
    /// UV coordinates in texture repeats (a 3×2 quad spans 0..3 × 0..2)
    pub uv: [f32; 2],
    /// `[texture_index, uv_scale_x, uv_scale_y, damage]`
    pub metadata: [u32; 4],
}

impl Vertex {
    /// Creates a new vertex.
    ///
    /// # Arguments
    /// * `position` - Position in chunk-local space
    /// * `normal` - Unit face normal
    /// * `uv` - Texture coordinates in repeats
    /// * `metadata` - Face metadata shared by all vertices of the face
    pub fn new(position: Point3<f32>, normal: Vector3<f32>, uv: [f32; 2], metadata: FaceMetadata) -> Self {
        Vertex {
            position: position.into(),
            normal: normal.into(),
            uv,
            metadata: metadata.to_array(),
        }
    }

    pub fn position(&self) -> Point3<f32> {
        Point3::from(self.position)
    }

    /// Metadata encoded as a colour with each channel scaled by 1/255, for
    /// renderers that can only pass it through a vertex colour attribute.
    pub fn legacy_color(&self) -> [f32; 4] {
        self.metadata.map(|channel| channel as f32 / 255.0)
    }
}
