//! CPU-side SMPL geometry
//!
//! Index data depends only on the topology and is built once. Positions and
//! normals are rewritten for every frame.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Quat, Vec3};
use replay_core::{MeshFrame, MeshTopology, RenderMode};
use std::collections::HashSet;
use std::f32::consts::PI;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Amplitude of the idle sway around Y, in radians
pub const SWAY_AMPLITUDE: f32 = 0.1;

/// Angular frequency of the idle sway, in radians per second
pub const SWAY_SPEED: f32 = 0.2;

/// Source of index revisions, shared by every geometry so a rebuilt
/// geometry never repeats a revision a buffer cache has already seen
static NEXT_INDEX_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_index_revision() -> u64 {
    NEXT_INDEX_REVISION.fetch_add(1, Ordering::Relaxed)
}

/// Vertex format for mesh rendering (matches smpl_mesh.wgsl)
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct GpuVertex {
    /// Model-space position
    pub position: [f32; 3],
    /// Unit normal, zero for vertices without faces
    pub normal: [f32; 3],
}

impl GpuVertex {
    /// Vertex from glam vectors
    pub fn new(position: Vec3, normal: Vec3) -> Self {
        Self {
            position: position.to_array(),
            normal: normal.to_array(),
        }
    }

    /// Position as a vector
    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    /// Normal as a vector
    pub fn normal(&self) -> Vec3 {
        Vec3::from_array(self.normal)
    }
}

/// Sphere enclosing every vertex of a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Centre in model space
    pub center: Vec3,
    /// Distance to the furthest vertex
    pub radius: f32,
}

impl BoundingSphere {
    /// Sphere around the bounding box center of `points`
    pub fn from_points(points: &[GpuVertex]) -> Option<Self> {
        let first = points.first()?.position();
        let (min, max) = points.iter().fold((first, first), |(min, max), v| {
            let p = v.position();
            (min.min(p), max.max(p))
        });
        let center = (min + max) * 0.5;
        let radius = points
            .iter()
            .map(|v| center.distance_squared(v.position()))
            .fold(0.0f32, f32::max)
            .sqrt();
        Some(Self { center, radius })
    }
}

/// Renderable geometry of the SMPL body
#[derive(Debug, Clone, Default)]
pub struct SmplGeometry {
    topology_triangles: Vec<u32>,
    topology_edges: Vec<u32>,
    triangles: Vec<u32>,
    edges: Vec<u32>,
    vertices: Vec<GpuVertex>,
    bounding_sphere: Option<BoundingSphere>,
    index_revision: u64,
    position_revision: u64,
}

impl SmplGeometry {
    /// Geometry for `topology`; without one only points can be drawn
    pub fn new(topology: Option<&MeshTopology>) -> Self {
        let (triangles, edges) = match topology {
            Some(topology) => (topology.indices().to_vec(), unique_edges(topology)),
            None => (Vec::new(), Vec::new()),
        };
        debug!(
            "Built geometry: {} triangles, {} edges",
            triangles.len() / 3,
            edges.len() / 2
        );

        Self {
            triangles: triangles.clone(),
            edges: edges.clone(),
            topology_triangles: triangles,
            topology_edges: edges,
            index_revision: next_index_revision(),
            ..Default::default()
        }
    }

    /// Whether face data is present
    pub fn has_topology(&self) -> bool {
        !self.topology_triangles.is_empty()
    }

    /// Mode that can actually be drawn for `requested`
    pub fn effective_mode(&self, requested: RenderMode) -> RenderMode {
        if requested.needs_topology() && !self.has_topology() {
            RenderMode::Points
        } else {
            requested
        }
    }

    /// Replace positions with `frame` and recompute normals and bounds
    pub fn update_positions(&mut self, frame: &MeshFrame) {
        let previous_count = self.vertices.len();

        self.vertices.clear();
        self.vertices
            .extend(frame.vertices().map(|p| GpuVertex::new(p, Vec3::ZERO)));

        if self.vertices.len() != previous_count {
            self.rebuild_indices();
        }

        compute_vertex_normals(&mut self.vertices, &self.triangles);
        self.bounding_sphere = BoundingSphere::from_points(&self.vertices);
        self.position_revision += 1;
    }

    /// Drop every triangle and edge that references a missing vertex
    fn rebuild_indices(&mut self) {
        let count = self.vertices.len() as u32;

        self.triangles = self
            .topology_triangles
            .chunks_exact(3)
            .filter(|face| face.iter().all(|&i| i < count))
            .flatten()
            .copied()
            .collect();
        self.edges = self
            .topology_edges
            .chunks_exact(2)
            .filter(|edge| edge.iter().all(|&i| i < count))
            .flatten()
            .copied()
            .collect();

        let skipped = (self.topology_triangles.len() - self.triangles.len()) / 3;
        if skipped > 0 {
            warn!(
                "Skipping {} faces that reference vertices beyond {}",
                skipped, count
            );
        }
        self.index_revision = next_index_revision();
    }

    /// Current vertices with normals
    pub fn vertices(&self) -> &[GpuVertex] {
        &self.vertices
    }

    /// Triangle list indices valid for the current frame
    pub fn triangle_indices(&self) -> &[u32] {
        &self.triangles
    }

    /// Line list indices, one entry per shared edge
    pub fn edge_indices(&self) -> &[u32] {
        &self.edges
    }

    /// Vertices in the current frame
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Bounds of the current frame, `None` before the first one
    pub fn bounding_sphere(&self) -> Option<BoundingSphere> {
        self.bounding_sphere
    }

    /// Changes whenever the index lists change; unique across geometries
    pub fn index_revision(&self) -> u64 {
        self.index_revision
    }

    /// Bumped on every position update
    pub fn position_revision(&self) -> u64 {
        self.position_revision
    }
}

/// Each undirected edge of `topology` once, in first-seen order
fn unique_edges(topology: &MeshTopology) -> Vec<u32> {
    let mut seen = HashSet::with_capacity(topology.face_count() * 3 / 2);
    let mut edges = Vec::with_capacity(topology.face_count() * 3);
    for [a, b, c] in topology.faces() {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            if seen.insert((u.min(v), u.max(v))) {
                edges.push(u);
                edges.push(v);
            }
        }
    }
    edges
}

/// Area-weighted vertex normals over a triangle list
///
/// The unnormalised face cross product has a length of twice the face area,
/// so summing it weights each face by its area. Vertices with no faces get a
/// zero normal.
pub fn compute_vertex_normals(vertices: &mut [GpuVertex], triangles: &[u32]) {
    let mut accum = vec![Vec3::ZERO; vertices.len()];

    for face in triangles.chunks_exact(3) {
        let [a, b, c] = [face[0] as usize, face[1] as usize, face[2] as usize];
        let (Some(pa), Some(pb), Some(pc)) = (vertices.get(a), vertices.get(b), vertices.get(c))
        else {
            continue;
        };
        let (pa, pb, pc) = (pa.position(), pb.position(), pc.position());
        let weighted = (pb - pa).cross(pc - pa);
        accum[a] += weighted;
        accum[b] += weighted;
        accum[c] += weighted;
    }

    for (vertex, normal) in vertices.iter_mut().zip(accum) {
        vertex.normal = normal.normalize_or_zero().to_array();
    }
}

/// Idle sway angle around Y after `elapsed_secs`
pub fn idle_sway(elapsed_secs: f32) -> f32 {
    (elapsed_secs * SWAY_SPEED).sin() * SWAY_AMPLITUDE
}

/// Body orientation: the capture space is upside down, plus the idle sway
pub fn model_rotation(elapsed_secs: f32) -> Quat {
    Quat::from_rotation_x(PI) * Quat::from_rotation_y(idle_sway(elapsed_secs))
}

/// Model matrix for the body at `elapsed_secs`
pub fn model_matrix(elapsed_secs: f32) -> Mat4 {
    Mat4::from_quat(model_rotation(elapsed_secs))
}
