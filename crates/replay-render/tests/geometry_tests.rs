use glam::{Quat, Vec3};
use replay_core::{MeshFrame, MeshTopology, RenderMode};
use replay_render::geometry::{compute_vertex_normals, idle_sway, model_matrix, model_rotation};
use replay_render::{GpuVertex, OrbitCamera, SmplGeometry};
use std::f32::consts::PI;

fn frame(points: &[[f32; 3]]) -> MeshFrame {
    MeshFrame::new(points.iter().flatten().copied().collect())
}

/// Unit square in the XY plane, split along the 0-2 diagonal
fn square() -> (MeshTopology, MeshFrame) {
    let topology = MeshTopology::from_faces(&[[0, 1, 2], [0, 2, 3]]);
    let frame = frame(&[
        [0.0, 0.0, 0.0],
        [1.0, 0.0, 0.0],
        [1.0, 1.0, 0.0],
        [0.0, 1.0, 0.0],
    ]);
    (topology, frame)
}

#[test]
fn test_flat_surface_normals_face_out_of_plane() {
    let (topology, frame) = square();
    let mut geometry = SmplGeometry::new(Some(&topology));
    geometry.update_positions(&frame);

    for vertex in geometry.vertices() {
        assert!(vertex.normal().distance(Vec3::Z) < 1e-6);
    }
}

#[test]
fn test_normals_are_area_weighted() {
    // Vertex 0 is shared by a large face in the XY plane and a small one in the XZ plane
    let mut vertices: Vec<GpuVertex> = [
        [0.0, 0.0, 0.0],
        [4.0, 0.0, 0.0],
        [0.0, 4.0, 0.0],
        [0.0, 0.0, -1.0],
        [1.0, 0.0, 0.0],
    ]
    .iter()
    .map(|p| GpuVertex::new(Vec3::from_array(*p), Vec3::ZERO))
    .collect();
    compute_vertex_normals(&mut vertices, &[0, 1, 2, 0, 3, 4]);

    let shared = vertices[0].normal();
    assert!((shared.length() - 1.0).abs() < 1e-5);
    // Area 8 against area 0.5: the large face dominates
    assert!(shared.z > 0.99);
    assert!(shared.y < 0.0);
}

#[test]
fn test_vertices_without_faces_get_zero_normals() {
    let mut vertices = vec![GpuVertex::new(Vec3::ONE, Vec3::X); 2];
    compute_vertex_normals(&mut vertices, &[]);
    assert!(vertices.iter().all(|v| v.normal() == Vec3::ZERO));
}

#[test]
fn test_positions_update_keeps_index_buffers() {
    let (topology, first) = square();
    let mut geometry = SmplGeometry::new(Some(&topology));
    geometry.update_positions(&first);
    let revision = geometry.index_revision();

    let moved = frame(&[
        [0.0, 0.0, 1.0],
        [1.0, 0.0, 1.0],
        [1.0, 1.0, 1.0],
        [0.0, 1.0, 1.0],
    ]);
    geometry.update_positions(&moved);

    assert_eq!(geometry.index_revision(), revision);
    assert_eq!(geometry.position_revision(), 2);
    assert_eq!(geometry.vertices()[2].position(), Vec3::new(1.0, 1.0, 1.0));
}

#[test]
fn test_late_topology_gets_a_fresh_index_revision() {
    let (topology, frame) = square();

    let mut points_only = SmplGeometry::new(None);
    points_only.update_positions(&frame);

    let mut with_faces = SmplGeometry::new(Some(&topology));
    with_faces.update_positions(&frame);

    // A buffer cache keyed on the old revision must see the new index lists
    assert_ne!(with_faces.index_revision(), points_only.index_revision());
    assert!(points_only.triangle_indices().is_empty());
    assert_eq!(with_faces.triangle_indices().len(), 6);
}

#[test]
fn test_out_of_range_faces_are_skipped() {
    let (topology, _) = square();
    let mut geometry = SmplGeometry::new(Some(&topology));
    // Only vertices 0..3 exist, so the second face cannot be drawn
    geometry.update_positions(&frame(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0]]));

    assert_eq!(geometry.triangle_indices(), &[0, 1, 2]);
    assert!(geometry.edge_indices().iter().all(|&i| i < 3));
    assert_eq!(geometry.edge_indices().len(), 3 * 2);
}

#[test]
fn test_missing_topology_falls_back_to_points() {
    let (_, frame) = square();
    let mut geometry = SmplGeometry::new(None);
    geometry.update_positions(&frame);

    assert!(!geometry.has_topology());
    assert!(geometry.triangle_indices().is_empty());
    assert_eq!(geometry.vertex_count(), 4);
    assert_eq!(geometry.effective_mode(RenderMode::Solid), RenderMode::Points);
    assert_eq!(geometry.effective_mode(RenderMode::Wireframe), RenderMode::Points);
    assert_eq!(geometry.effective_mode(RenderMode::Points), RenderMode::Points);

    let (topology, _) = square();
    let full = SmplGeometry::new(Some(&topology));
    assert_eq!(full.effective_mode(RenderMode::Wireframe), RenderMode::Wireframe);
}

#[test]
fn test_bounding_sphere_follows_frame() {
    let (topology, frame) = square();
    let mut geometry = SmplGeometry::new(Some(&topology));
    assert!(geometry.bounding_sphere().is_none());

    geometry.update_positions(&frame);
    let sphere = geometry.bounding_sphere().unwrap();
    assert!(sphere.center.distance(Vec3::new(0.5, 0.5, 0.0)) < 1e-6);
    assert!((sphere.radius - 0.5f32.sqrt()).abs() < 1e-6);
}

#[test]
fn test_model_is_flipped_upside_down() {
    // At t = 0 there is no sway, only the half turn around X
    assert_eq!(idle_sway(0.0), 0.0);
    let rotated = model_matrix(0.0).transform_vector3(Vec3::Y);
    assert!(rotated.distance(-Vec3::Y) < 1e-6);

    let expected = Quat::from_rotation_x(PI);
    assert!(model_rotation(0.0).abs_diff_eq(expected, 1e-6));
}

#[test]
fn test_idle_sway_is_bounded() {
    for step in 0..200 {
        let t = step as f32 * 0.37;
        assert!(idle_sway(t).abs() <= 0.1 + f32::EPSILON);
    }
    // Peak after a quarter period of sin(0.2 t)
    let peak = idle_sway(PI / 2.0 / 0.2);
    assert!((peak - 0.1).abs() < 1e-5);
}

#[test]
fn test_camera_defaults() {
    let camera = OrbitCamera::default();
    assert!(camera.position().distance(Vec3::new(0.0, 1.0, 3.0)) < 1e-4);
    assert_eq!(camera.target, Vec3::new(0.0, 0.8, 0.0));
    assert_eq!(camera.fov_y_deg, 50.0);
}

#[test]
fn test_camera_zoom_is_clamped() {
    let mut camera = OrbitCamera::default();
    camera.zoom(100.0);
    assert_eq!(camera.distance(), 1.0);
    camera.zoom(-100.0);
    assert_eq!(camera.distance(), 10.0);
}

#[test]
fn test_camera_orbit_keeps_distance() {
    let mut camera = OrbitCamera::default();
    let distance = camera.distance();
    camera.orbit(1.2, 0.4);
    assert!((camera.position().distance(camera.target) - distance).abs() < 1e-4);

    // Pitch stops short of the pole
    camera.orbit(0.0, 10.0);
    assert!(camera.position().y - camera.target.y < distance);

    camera.reset();
    assert_eq!(camera, OrbitCamera::default());
}

#[test]
fn test_camera_pan_moves_target() {
    let mut camera = OrbitCamera::default();
    let before = camera.position() - camera.target;
    camera.pan(0.1, 0.0);
    assert_ne!(camera.target, Vec3::new(0.0, 0.8, 0.0));
    // The eye moves with the target
    assert!((camera.position() - camera.target).distance(before) < 1e-5);
}

#[test]
fn test_target_projects_to_screen_center() {
    let camera = OrbitCamera::default();
    let clip = camera.view_projection(16.0 / 9.0) * camera.target.extend(1.0);
    let ndc = clip.truncate() / clip.w;
    assert!(ndc.x.abs() < 1e-5);
    assert!(ndc.y.abs() < 1e-5);
    assert!((0.0..=1.0).contains(&ndc.z));
}
