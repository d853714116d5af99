//! SMPL mesh frames and face topology
//!
//! A frame is one timestep of vertex positions, flattened as x,y,z triples.
//! The topology is the triangle connectivity shared by every frame of the rig.

use crate::{CoreError, Result};
use glam::Vec3;
use std::sync::Arc;

/// Number of vertices in the SMPL body mesh
pub const SMPL_VERTEX_COUNT: usize = 6890;

/// Coordinates per vertex (x, y, z)
pub const FLOATS_PER_VERTEX: usize = 3;

/// Floats expected in one decoded frame
pub const EXPECTED_FLOATS: usize = SMPL_VERTEX_COUNT * FLOATS_PER_VERTEX;

/// One timestep of decoded vertex positions
///
/// Immutable once created; clones share the same allocation.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshFrame {
    data: Arc<[f32]>,
}

impl MeshFrame {
    /// Wrap decoded floats as a frame
    pub fn new(data: Vec<f32>) -> Self {
        Self { data: data.into() }
    }

    /// Number of floats in the frame
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the frame holds no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of complete vertices (trailing partial triples are ignored)
    pub fn vertex_count(&self) -> usize {
        self.data.len() / FLOATS_PER_VERTEX
    }

    /// Raw float slice in x,y,z order
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Position of vertex `index`
    pub fn vertex(&self, index: usize) -> Option<Vec3> {
        let base = index.checked_mul(FLOATS_PER_VERTEX)?;
        let xyz = self.data.get(base..base + FLOATS_PER_VERTEX)?;
        Some(Vec3::new(xyz[0], xyz[1], xyz[2]))
    }

    /// Iterate over all complete vertex positions
    pub fn vertices(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.data
            .chunks_exact(FLOATS_PER_VERTEX)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
    }

    /// Whether the frame matches the SMPL vertex layout
    pub fn has_expected_length(&self) -> bool {
        self.data.len() == EXPECTED_FLOATS
    }
}

impl From<Vec<f32>> for MeshFrame {
    fn from(data: Vec<f32>) -> Self {
        Self::new(data)
    }
}

/// Triangle connectivity of the mesh rig
///
/// Every consecutive triple of indices names one face.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshTopology {
    indices: Arc<[u32]>,
}

impl MeshTopology {
    /// Build from a list of faces, flattening them in order
    pub fn from_faces(faces: &[[u32; 3]]) -> Self {
        let indices: Vec<u32> = faces.iter().flatten().copied().collect();
        Self {
            indices: indices.into(),
        }
    }

    /// Build from a face list whose entries may have any length
    ///
    /// This is the shape the backend returns; every entry must be a triple.
    pub fn from_nested(faces: &[Vec<u32>]) -> Result<Self> {
        let mut indices = Vec::with_capacity(faces.len() * 3);
        for (i, face) in faces.iter().enumerate() {
            if face.len() != 3 {
                return Err(CoreError::InvalidTopology(format!(
                    "face {} has {} indices, expected 3",
                    i,
                    face.len()
                )));
            }
            indices.extend_from_slice(face);
        }
        Ok(Self {
            indices: indices.into(),
        })
    }

    /// Build from an already flattened index list
    pub fn from_flat(indices: Vec<u32>) -> Result<Self> {
        if indices.len() % 3 != 0 {
            return Err(CoreError::InvalidTopology(format!(
                "{} indices is not a multiple of 3",
                indices.len()
            )));
        }
        Ok(Self {
            indices: indices.into(),
        })
    }

    /// Flat index list
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of triangles
    pub fn face_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Iterate over faces
    pub fn faces(&self) -> impl Iterator<Item = [u32; 3]> + '_ {
        self.indices.chunks_exact(3).map(|f| [f[0], f[1], f[2]])
    }

    /// Largest vertex index referenced
    pub fn max_index(&self) -> Option<u32> {
        self.indices.iter().copied().max()
    }

    /// Whether there are no faces
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expected_floats() {
        assert_eq!(EXPECTED_FLOATS, 20670);
    }

    #[test]
    fn test_frame_vertex_access() {
        let frame = MeshFrame::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(frame.len(), 7);
        assert_eq!(frame.vertex_count(), 2);
        assert_eq!(frame.vertex(1), Some(Vec3::new(4.0, 5.0, 6.0)));
        assert_eq!(frame.vertex(2), None);
        assert_eq!(frame.vertices().count(), 2);
        assert!(!frame.has_expected_length());
    }

    #[test]
    fn test_frame_clone_shares_data() {
        let frame = MeshFrame::new(vec![0.0; EXPECTED_FLOATS]);
        let copy = frame.clone();
        assert!(std::ptr::eq(frame.as_slice(), copy.as_slice()));
        assert!(copy.has_expected_length());
    }

    #[test]
    fn test_topology_flattening() {
        let topo = MeshTopology::from_faces(&[[0, 1, 2], [2, 3, 0]]);
        assert_eq!(topo.indices(), &[0, 1, 2, 2, 3, 0]);
        assert_eq!(topo.face_count(), 2);
        assert_eq!(topo.max_index(), Some(3));
        assert_eq!(topo.faces().nth(1), Some([2, 3, 0]));
    }

    #[test]
    fn test_topology_rejects_non_triangles() {
        let err = MeshTopology::from_nested(&[vec![0, 1, 2], vec![3, 4]]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTopology(_)));

        assert!(MeshTopology::from_flat(vec![0, 1]).is_err());
        assert!(MeshTopology::from_flat(vec![]).unwrap().is_empty());
    }
}
