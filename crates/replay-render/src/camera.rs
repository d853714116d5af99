//! Orbit camera around the athlete

use glam::{Mat4, Vec3};

/// Point the camera looks at, roughly the body's centre of mass
pub const DEFAULT_TARGET: Vec3 = Vec3::new(0.0, 0.8, 0.0);

/// Initial eye position
pub const DEFAULT_POSITION: Vec3 = Vec3::new(0.0, 1.0, 3.0);

/// Vertical field of view in degrees
pub const DEFAULT_FOV_DEG: f32 = 50.0;

/// Closest zoom, in metres from the target
pub const MIN_DISTANCE: f32 = 1.0;
/// Furthest zoom, in metres from the target
pub const MAX_DISTANCE: f32 = 10.0;

const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;
const ZOOM_STEP: f32 = 0.9;

/// Camera orbiting a target at a clamped distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitCamera {
    /// Point orbited and looked at
    pub target: Vec3,
    distance: f32,
    /// Rotation around the vertical axis, radians
    yaw: f32,
    /// Elevation above the horizontal plane, radians
    pitch: f32,
    /// Vertical field of view in degrees
    pub fov_y_deg: f32,
    /// Near clip distance
    pub near: f32,
    /// Far clip distance
    pub far: f32,
}

impl OrbitCamera {
    /// Camera at `position` looking at `target`
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        let offset = position - target;
        let distance = offset.length().clamp(MIN_DISTANCE, MAX_DISTANCE);
        let yaw = offset.x.atan2(offset.z);
        let pitch = (offset.y / offset.length().max(f32::EPSILON))
            .clamp(-1.0, 1.0)
            .asin()
            .clamp(-PITCH_LIMIT, PITCH_LIMIT);

        Self {
            target,
            distance,
            yaw,
            pitch,
            fov_y_deg: DEFAULT_FOV_DEG,
            near: 0.01,
            far: 100.0,
        }
    }

    /// Eye position
    pub fn position(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.yaw.sin_cos();
        let (sin_pitch, cos_pitch) = self.pitch.sin_cos();
        self.target
            + self.distance * Vec3::new(cos_pitch * sin_yaw, sin_pitch, cos_pitch * cos_yaw)
    }

    /// Distance from the eye to the target
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Rotate around the target by the given angles in radians
    pub fn orbit(&mut self, delta_yaw: f32, delta_pitch: f32) {
        self.yaw += delta_yaw;
        self.pitch = (self.pitch + delta_pitch).clamp(-PITCH_LIMIT, PITCH_LIMIT);
    }

    /// Move closer (positive steps) or further away
    pub fn zoom(&mut self, steps: f32) {
        self.distance = (self.distance * ZOOM_STEP.powf(steps)).clamp(MIN_DISTANCE, MAX_DISTANCE);
    }

    /// Shift camera and target in the view plane, scaled by distance
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        self.target += (right * -dx + up * dy) * self.distance;
    }

    /// Right-handed world to view transform
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    /// Perspective projection for a target of the given aspect ratio
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            aspect.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }

    /// Combined projection * view
    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Back to the initial framing
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::looking_at(DEFAULT_POSITION, DEFAULT_TARGET)
    }
}
