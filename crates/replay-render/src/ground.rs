//! Ground reference drawn under the body
//!
//! A square floor slightly below `y = 0` with a line grid on top, both in
//! world space.

use glam::Vec3;

use crate::geometry::GpuVertex;

/// Edge length of the floor square
pub const FLOOR_SIZE: f32 = 10.0;

/// Floor height, just under the grid so the lines stay visible
pub const FLOOR_HEIGHT: f32 = -0.01;

/// Edge length of the grid
pub const GRID_SIZE: f32 = 4.0;

/// Cells along each grid edge
pub const GRID_DIVISIONS: u32 = 20;

/// Line list for a `size` x `size` grid on the `y = 0` plane
pub fn grid_lines(size: f32, divisions: u32) -> Vec<GpuVertex> {
    let divisions = divisions.max(1);
    let half = size * 0.5;
    let step = size / divisions as f32;

    let mut vertices = Vec::with_capacity((divisions as usize + 1) * 4);
    for i in 0..=divisions {
        let offset = -half + step * i as f32;
        for (start, end) in [
            (Vec3::new(offset, 0.0, -half), Vec3::new(offset, 0.0, half)),
            (Vec3::new(-half, 0.0, offset), Vec3::new(half, 0.0, offset)),
        ] {
            vertices.push(GpuVertex::new(start, Vec3::Y));
            vertices.push(GpuVertex::new(end, Vec3::Y));
        }
    }
    vertices
}

/// Two triangles covering a `size` x `size` square at `height`
pub fn floor_quad(size: f32, height: f32) -> Vec<GpuVertex> {
    let half = size * 0.5;
    let corners = [
        Vec3::new(-half, height, -half),
        Vec3::new(half, height, -half),
        Vec3::new(half, height, half),
        Vec3::new(-half, height, half),
    ];
    [0, 2, 1, 0, 3, 2]
        .iter()
        .map(|&i| GpuVertex::new(corners[i], Vec3::Y))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_line_count_and_extent() {
        let lines = grid_lines(GRID_SIZE, GRID_DIVISIONS);
        // 21 lines in each direction, two vertices per line
        assert_eq!(lines.len(), 84);
        let within = |c: f32| c.abs() <= 2.0 + 1e-5;
        assert!(lines
            .iter()
            .all(|v| v.position[1] == 0.0 && within(v.position[0]) && within(v.position[2])));
        assert!(lines.iter().any(|v| v.position == [-2.0, 0.0, -2.0]));
        assert!(lines.iter().any(|v| v.position == [2.0, 0.0, 2.0]));
    }

    #[test]
    fn test_floor_sits_under_grid() {
        let floor = floor_quad(FLOOR_SIZE, FLOOR_HEIGHT);
        assert_eq!(floor.len(), 6);
        assert!(floor.iter().all(|v| v.position[1] < 0.0));
        assert!(floor.iter().all(|v| v.position[0].abs() == 5.0));
    }
}
