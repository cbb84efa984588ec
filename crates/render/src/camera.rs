use glam::{Mat4, Vec3};
use meshview_common::CameraConfig;
use meshview_input::MoveDirection;

/// Pitch stays strictly inside (-90, 90) degrees so the look-at basis never
/// degenerates.
pub const PITCH_LIMIT_DEGREES: f32 = 89.0;

/// First-person fly camera. Angles are in degrees.
///
/// The basis vectors are recomputed after every orientation change, so the
/// getters never return stale values.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,
    front: Vec3,
    right: Vec3,
    up: Vec3,
    speed: f32,
    sensitivity: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        let mut camera = Self {
            position,
            yaw,
            pitch: pitch.clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES),
            front: Vec3::NEG_Z,
            right: Vec3::X,
            up: Vec3::Y,
            speed: 2.5,
            sensitivity: 0.1,
        };
        camera.update_basis();
        camera
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.position, config.yaw, config.pitch)
            .with_speed(config.speed)
            .with_sensitivity(config.sensitivity)
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_sensitivity(mut self, sensitivity: f32) -> Self {
        self.sensitivity = sensitivity;
        self
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn front(&self) -> Vec3 {
        self.front
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn sensitivity(&self) -> f32 {
        self.sensitivity
    }

    /// Rotate by a pointer delta in pixels. Positive `dy` looks up.
    pub fn look(&mut self, dx: f32, dy: f32) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        // Wrapping keeps yaw small so precision does not drift in long sessions.
        self.yaw = (self.yaw + dx * self.sensitivity).rem_euclid(360.0);
        self.pitch = (self.pitch + dy * self.sensitivity)
            .clamp(-PITCH_LIMIT_DEGREES, PITCH_LIMIT_DEGREES);
        self.update_basis();
    }

    /// Translate along one axis for `dt` seconds.
    pub fn move_in(&mut self, direction: MoveDirection, dt: f32) {
        let step = self.speed * dt;
        match direction {
            MoveDirection::Forward => self.position += self.front * step,
            MoveDirection::Backward => self.position -= self.front * step,
            MoveDirection::Left => self.position -= self.right * step,
            MoveDirection::Right => self.position += self.right * step,
            MoveDirection::Up => self.position.y += step,
            MoveDirection::Down => self.position.y -= step,
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.position + self.front, Vec3::Y)
    }

    fn update_basis(&mut self) {
        let (yaw, pitch) = (self.yaw.to_radians(), self.pitch.to_radians());
        self.front = Vec3::new(
            yaw.cos() * pitch.cos(),
            pitch.sin(),
            yaw.sin() * pitch.cos(),
        )
        .normalize();
        self.right = self.front.cross(Vec3::Y).normalize();
        self.up = self.right.cross(self.front).normalize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use meshview_input::MouseLook;

    #[test]
    fn default_camera_matches_config() {
        let cam = Camera::default();
        assert_eq!(cam.position(), Vec3::new(1.7, 1.3, 4.0));
        assert_eq!(cam.yaw(), 240.0);
        assert_eq!(cam.pitch(), -15.0);
        assert!(!cam.view_matrix().col(0).x.is_nan());
    }

    #[test]
    fn basis_is_orthonormal() {
        let cam = Camera::new(Vec3::ZERO, 33.0, 47.0);
        assert_relative_eq!(cam.front().length(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(cam.right().length(), 1.0, epsilon = 1e-5);
        assert_relative_eq!(cam.front().dot(cam.right()), 0.0, epsilon = 1e-5);
        assert_relative_eq!(cam.front().dot(cam.up()), 0.0, epsilon = 1e-5);
    }

    #[test]
    fn yaw_minus_90_looks_down_negative_z() {
        let cam = Camera::new(Vec3::ZERO, -90.0, 0.0);
        assert_relative_eq!(cam.front().z, -1.0, epsilon = 1e-6);
        assert_relative_eq!(cam.right().x, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn pitch_stays_clamped_for_any_input() {
        let mut cam = Camera::default();
        for dy in [1.0e6, -3.0e7, 899.0, -899.0, f32::MAX, f32::MIN, 1.0e30] {
            cam.look(0.0, dy);
            assert!(cam.pitch() > -90.0 && cam.pitch() < 90.0, "pitch {}", cam.pitch());
            assert!(cam.pitch().abs() <= PITCH_LIMIT_DEGREES);
        }
        cam.look(0.0, f32::NAN);
        assert!(cam.pitch().is_finite());
    }

    #[test]
    fn look_while_disabled_changes_nothing() {
        let mut cam = Camera::default();
        let before = cam.clone();
        let mut mouse = MouseLook::new(glam::Vec2::new(100.0, 100.0));

        for pos in [(150.0, 80.0), (300.0, 10.0), (0.0, 500.0)] {
            if let Some(delta) = mouse.cursor_moved(glam::Vec2::new(pos.0, pos.1)) {
                cam.look(delta.x, delta.y);
            }
        }
        assert_eq!(cam, before);
        assert_eq!(mouse.last_position(), glam::Vec2::new(0.0, 500.0));
    }

    #[test]
    fn view_matrix_is_pure() {
        let cam = Camera::new(Vec3::new(1.0, 2.0, 3.0), 10.0, 20.0);
        let first = cam.view_matrix();
        let second = cam.view_matrix();
        assert_eq!(first, second);
        assert_eq!(cam, Camera::new(Vec3::new(1.0, 2.0, 3.0), 10.0, 20.0));
    }

    #[test]
    fn movement_scales_with_speed_and_dt() {
        let mut cam = Camera::new(Vec3::ZERO, -90.0, 0.0).with_speed(2.0);
        cam.move_in(MoveDirection::Forward, 0.5);
        assert_relative_eq!(cam.position().z, -1.0, epsilon = 1e-6);
        cam.move_in(MoveDirection::Right, 0.25);
        assert_relative_eq!(cam.position().x, 0.5, epsilon = 1e-6);
    }

    #[test]
    fn vertical_movement_uses_world_up() {
        let mut cam = Camera::new(Vec3::ZERO, 0.0, 60.0);
        cam.move_in(MoveDirection::Up, 1.0);
        assert_eq!(cam.position(), Vec3::new(0.0, 2.5, 0.0));
        cam.move_in(MoveDirection::Down, 1.0);
        assert_eq!(cam.position(), Vec3::ZERO);
    }
}
